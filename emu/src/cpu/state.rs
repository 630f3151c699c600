//! # Architectural State
//!
//! A snapshot of the visible machine: the register file and the CPSR.
//! Execution never edits a snapshot in place. Handlers read the current one
//! and describe their effects as a [`Delta`]; [`ArchState::commit`] applies
//! the delta to a copy, which becomes the next state. Every operand an
//! instruction reads therefore comes from the same snapshot, whatever the
//! instruction writes.

use serde::{Deserialize, Serialize};

use crate::cpu::psr::{Flags, Psr};
use crate::cpu::registers::{REG_LR, REG_PROGRAM_COUNTER, Registers};

/// Registers and CPSR as seen by one instruction.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchState {
    pub registers: Registers,
    pub cpsr: Psr,
}

impl ArchState {
    /// All registers and flags zero, PC at `entry`.
    #[must_use]
    pub fn new(entry: u32) -> Self {
        let mut state = Self::default();
        state.registers.set_program_counter(entry);
        state
    }

    /// Address of the instruction being executed.
    #[must_use]
    pub const fn program_counter(&self) -> u32 {
        self.registers.program_counter()
    }

    /// Value of `reg` as an operand. R15 reads two instructions ahead of the
    /// one executing.
    #[must_use]
    pub const fn operand(&self, reg: usize) -> u32 {
        if reg == REG_PROGRAM_COUNTER {
            self.registers.program_counter().wrapping_add(8)
        } else {
            self.registers.register_at(reg)
        }
    }

    /// The state after an instruction whose condition failed.
    #[must_use]
    pub fn skip(&self) -> Self {
        let mut next = *self;
        next.registers.advance_program_counter(4);
        next
    }

    /// Builds the next state from this one and the effects of one
    /// instruction. Nothing else writes architectural state.
    #[must_use]
    pub fn commit(&self, delta: &Delta) -> Self {
        let mut next = *self;
        let mut jump = delta.jump;

        if let Some((reg, value)) = delta.destination {
            if reg == REG_PROGRAM_COUNTER {
                jump = Some(value);
            } else {
                next.registers.set_register_at(reg, value);
            }
        }

        if let Some(return_address) = delta.link {
            next.registers.set_register_at(REG_LR, return_address);
        }

        if let Some(flags) = delta.flags {
            next.cpsr.set_flags(flags);
        }

        match jump {
            // Instructions are word aligned, the low bits of a target are dropped.
            Some(target) => next.registers.set_program_counter(target & !0b11),
            None => next.registers.advance_program_counter(4),
        }

        next
    }
}

impl std::fmt::Display for ArchState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (idx, value) in self.registers.as_array().iter().enumerate() {
            let name = match idx {
                13 => "SP".to_string(),
                14 => "LR".to_string(),
                15 => "PC".to_string(),
                _ => format!("R{idx}"),
            };
            let separator = if idx % 4 == 3 { "\n" } else { "  " };
            write!(f, "{name:>3}: 0x{value:08X}{separator}")?;
        }
        write!(f, "CPSR: {}", self.cpsr)
    }
}

/// Everything one instruction changes, gathered before any of it is applied.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delta {
    /// Register result. Writing R15 is a jump.
    pub destination: Option<(usize, u32)>,

    /// Return address for LR.
    pub link: Option<u32>,

    /// New N, Z, C and V, written together.
    pub flags: Option<Flags>,

    /// Branch target. Without one the PC moves to the next word.
    pub jump: Option<u32>,

    /// Comment field of a software interrupt.
    pub trap: Option<u32>,
}
