//! An instruction-level simulator for a 32-bit ARMv4-style core.
//!
//! ```
//! use emu::cpu::arm_cpu::{Cpu, HaltOnSwi, RunConfig, StopReason};
//! use emu::memory::flat_memory::FlatMemory;
//!
//! let mut memory = FlatMemory::new(0, 0x100);
//! // MOV R0, #42 ; SWI 0
//! memory.write_words(0, &[0xE3A0_002A, 0xEF00_0000]).unwrap();
//!
//! let mut cpu = Cpu::new(0);
//! let summary = cpu.run(&mut memory, &mut HaltOnSwi, &RunConfig::default()).unwrap();
//!
//! assert_eq!(summary.reason, StopReason::Halted { comment: 0 });
//! assert_eq!(cpu.state().registers.register_at(0), 42);
//! ```

#[allow(clippy::cast_possible_truncation)]
#[allow(clippy::cast_sign_loss)]
#[allow(clippy::cast_possible_wrap)]
mod bitwise;

pub mod cpu;
pub mod memory;
