//! # ARM core
//!
//! Decode, condition gate, barrel shifter, handlers and state commit for a
//! 32-bit ARMv4-style instruction stream. Everything runs in one mode with
//! one register bank: no Thumb, no banked registers, no exceptions other
//! than the SWI trap.

pub mod arm;

#[allow(clippy::module_name_repetitions)]
pub mod arm_cpu;
pub mod condition;
pub mod fault;
pub mod psr;
pub mod registers;
pub mod state;
