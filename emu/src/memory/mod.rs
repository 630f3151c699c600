//! # Memory Interface
//!
//! The core never owns storage. It computes effective addresses and calls
//! through [`Memory`]; instruction words come in through [`Fetch`]. Both are
//! little-endian and byte addressed.
//!
//! [`FlatMemory`](flat_memory::FlatMemory) is a plain byte array that
//! implements both and is what the shell and the tests run against.

pub mod flat_memory;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Size of a single load or store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Width {
    /// A u8 value, zero-extended on load.
    Byte,

    /// A u32 value.
    Word,
}

impl Width {
    #[must_use]
    pub const fn bytes(self) -> u32 {
        match self {
            Self::Byte => 1,
            Self::Word => 4,
        }
    }
}

impl From<bool> for Width {
    /// The B bit of a single data transfer: set means byte.
    fn from(byte: bool) -> Self {
        if byte { Self::Byte } else { Self::Word }
    }
}

/// Why a memory access was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MemoryError {
    #[error("address 0x{address:08X} (+{len} bytes) is outside of memory")]
    OutOfBounds { address: u32, len: u32 },
}

/// Data side of the memory bus, used by LDR/STR/LDRB/STRB.
pub trait Memory {
    fn load(&self, address: u32, width: Width) -> Result<u32, MemoryError>;

    /// For [`Width::Byte`] only the low 8 bits of `value` are written.
    fn store(&mut self, address: u32, width: Width, value: u32) -> Result<(), MemoryError>;
}

/// Instruction side of the memory bus.
pub trait Fetch {
    fn fetch(&self, program_counter: u32) -> Result<u32, MemoryError>;
}

impl<M: Memory> Fetch for M {
    fn fetch(&self, program_counter: u32) -> Result<u32, MemoryError> {
        self.load(program_counter, Width::Word)
    }
}
