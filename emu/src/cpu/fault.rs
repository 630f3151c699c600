use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::memory::MemoryError;

/// Why an instruction could not be executed.
///
/// A fault never touches the architectural state: the caller keeps the state
/// it passed in, and with it the address of the faulting instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Fault {
    /// The word sets bits that are reserved or undefined in its class.
    #[error("decode fault at 0x{address:08X}: 0x{op_code:08X}, {kind}")]
    Decode {
        address: u32,
        op_code: u32,
        kind: DecodeFaultKind,
    },

    /// A legal encoding that this core does not implement.
    #[error("unsupported encoding at 0x{address:08X}: 0x{op_code:08X}, {kind}")]
    UnsupportedEncoding {
        address: u32,
        op_code: u32,
        kind: UnsupportedKind,
    },

    /// A fetch, load or store was rejected by the memory. `op_code` is
    /// `None` when it is the fetch itself that failed.
    #[error("memory fault at 0x{address:08X}{}", op_code_suffix(.op_code))]
    Memory {
        address: u32,
        op_code: Option<u32>,
        #[source]
        source: MemoryError,
    },
}

fn op_code_suffix(op_code: &Option<u32>) -> String {
    op_code.map_or_else(String::new, |o| format!(" (0x{o:08X})"))
}

impl Fault {
    /// Address of the instruction that faulted.
    #[must_use]
    pub const fn address(&self) -> u32 {
        match self {
            Self::Decode { address, .. }
            | Self::UnsupportedEncoding { address, .. }
            | Self::Memory { address, .. } => *address,
        }
    }
}

/// Reserved or undefined bit patterns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum DecodeFaultKind {
    /// Bit 7 set in a register-shifted-by-register operand 2.
    #[error("bit 7 must be clear when the shift amount is a register")]
    ReservedShiftBit,

    /// Bits 7-4 read `1001` but the rest is not a multiply, long multiply or
    /// swap.
    #[error("undefined multiply extension")]
    UndefinedMultiply,

    /// Register offset with bit 4 set, the architecture's undefined
    /// instruction space.
    #[error("undefined instruction")]
    UndefinedTransfer,
}

/// Legal ARMv4 encodings outside of the implemented subset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum UnsupportedKind {
    #[error("multiply long")]
    MultiplyLong,

    #[error("swap")]
    Swap,

    /// Post-indexed single data transfer.
    #[error("post-indexed addressing")]
    PostIndexed,

    #[error("base register write-back")]
    WriteBack,

    #[error("block data transfer")]
    BlockTransfer,

    #[error("coprocessor instruction")]
    Coprocessor,

    /// R15 where the architecture leaves the result unpredictable.
    #[error("R15 is not allowed as an operand here")]
    ProgramCounterOperand,

    /// S=1 with R15 as the destination restores the CPSR from an SPSR,
    /// which this core does not have.
    #[error("flag-setting write to R15")]
    SetFlagsToProgramCounter,
}

/// Rejection from the decoder, before it is tagged with an address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    Fault(DecodeFaultKind),
    Unsupported(UnsupportedKind),
}

impl DecodeError {
    #[must_use]
    pub const fn at(self, address: u32, op_code: u32) -> Fault {
        match self {
            Self::Fault(kind) => Fault::Decode {
                address,
                op_code,
                kind,
            },
            Self::Unsupported(kind) => Fault::UnsupportedEncoding {
                address,
                op_code,
                kind,
            },
        }
    }
}

impl From<DecodeFaultKind> for DecodeError {
    fn from(kind: DecodeFaultKind) -> Self {
        Self::Fault(kind)
    }
}

impl From<UnsupportedKind> for DecodeError {
    fn from(kind: UnsupportedKind) -> Self {
        Self::Unsupported(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn messages() {
        let fault = DecodeError::from(UnsupportedKind::Swap).at(0x100, 0xE100_0090);
        assert_eq!(
            fault.to_string(),
            "unsupported encoding at 0x00000100: 0xE1000090, swap"
        );
        assert_eq!(fault.address(), 0x100);

        let fault = Fault::Memory {
            address: 0x8,
            op_code: Some(0xE591_0000),
            source: MemoryError::OutOfBounds {
                address: 0x4000,
                len: 4,
            },
        };
        assert_eq!(fault.to_string(), "memory fault at 0x00000008 (0xE5910000)");

        let fault = Fault::Memory {
            address: 0x8,
            op_code: None,
            source: MemoryError::OutOfBounds { address: 0x8, len: 4 },
        };
        assert_eq!(fault.to_string(), "memory fault at 0x00000008");
    }
}
