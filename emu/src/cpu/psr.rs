//! # Current Program Status Register
//!
//! ```text
//! 31 30 29 28 27                       0
//! ┌──┬──┬──┬──┬──────────────────────────┐
//! │N │Z │C │V │ Reserved (mode, state...) │
//! └──┴──┴──┴──┴──────────────────────────┘
//! ```
//!
//! Only the condition flags are modeled. The low bits are kept as they are
//! so a snapshot round-trips, but nothing in the core reads or writes them:
//! the simulator runs in a single flat mode.

use serde::{Deserialize, Serialize};

use crate::bitwise::Bits;
use crate::cpu::condition::Condition;

/// Program Status Register, wrapping the raw `u32`.
///
/// # Example
///
/// ```
/// use emu::cpu::psr::Psr;
///
/// let mut cpsr = Psr::default();
///
/// cpsr.set_zero_flag(true);
/// assert!(cpsr.zero_flag());
///
/// cpsr.set_carry_flag(true);
/// assert_eq!(u32::from(cpsr), 0x6000_0000);
/// ```
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Psr(u32);

impl Psr {
    /// Whether an instruction carrying `cond` executes with these flags.
    #[must_use]
    pub fn can_execute(self, cond: Condition) -> bool {
        use Condition::{AL, CC, CS, EQ, GE, GT, HI, LE, LS, LT, MI, NE, NV, PL, VC, VS};
        match cond {
            EQ => self.zero_flag(),                         // Equal (Z=1)
            NE => !self.zero_flag(),                        // Not equal (Z=0)
            CS => self.carry_flag(),                        // Unsigned higher or same (C=1)
            CC => !self.carry_flag(),                       // Unsigned lower (C=0)
            MI => self.sign_flag(),                         // Negative (N=1)
            PL => !self.sign_flag(),                        // Positive or zero (N=0)
            VS => self.overflow_flag(),                     // Overflow (V=1)
            VC => !self.overflow_flag(),                    // No overflow (V=0)
            HI => self.carry_flag() && !self.zero_flag(),   // Unsigned higher (C=1 and Z=0)
            LS => !self.carry_flag() || self.zero_flag(),   // Unsigned lower or same (C=0 or Z=1)
            GE => self.sign_flag() == self.overflow_flag(), // Greater or equal (N=V)
            LT => self.sign_flag() != self.overflow_flag(), // Less than (N<>V)
            // Greater than (Z=0 and N=V)
            GT => !self.zero_flag() && (self.sign_flag() == self.overflow_flag()),
            // Less or equal (Z=1 or N<>V)
            LE => self.zero_flag() || (self.sign_flag() != self.overflow_flag()),
            AL => true,
            NV => false,
        }
    }

    /// N => Bit 31, (0=Not Signed, 1=Signed)
    #[must_use]
    pub fn sign_flag(self) -> bool {
        self.0.get_bit(31)
    }

    /// Z => Bit 30, (0=Not Zero, 1=Zero)
    #[must_use]
    pub fn zero_flag(self) -> bool {
        self.0.get_bit(30)
    }

    /// C => Bit 29, (0=Borrow/No Carry, 1=Carry/No Borrow)
    #[must_use]
    pub fn carry_flag(self) -> bool {
        self.0.get_bit(29)
    }

    /// V => Bit 28, (0=No Overflow, 1=Overflow)
    #[must_use]
    pub fn overflow_flag(self) -> bool {
        self.0.get_bit(28)
    }

    pub fn set_sign_flag(&mut self, value: bool) {
        self.0.set_bit(31, value);
    }

    pub fn set_zero_flag(&mut self, value: bool) {
        self.0.set_bit(30, value);
    }

    pub fn set_carry_flag(&mut self, value: bool) {
        self.0.set_bit(29, value);
    }

    pub fn set_overflow_flag(&mut self, value: bool) {
        self.0.set_bit(28, value);
    }

    /// The four condition flags as a value.
    #[must_use]
    pub fn flags(self) -> Flags {
        Flags {
            sign: self.sign_flag(),
            zero: self.zero_flag(),
            carry: self.carry_flag(),
            overflow: self.overflow_flag(),
        }
    }

    /// Writes N, Z, C and V together.
    pub fn set_flags(&mut self, flags: Flags) {
        self.set_sign_flag(flags.sign);
        self.set_zero_flag(flags.zero);
        self.set_carry_flag(flags.carry);
        self.set_overflow_flag(flags.overflow);
    }
}

impl From<u32> for Psr {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl From<Psr> for u32 {
    fn from(p: Psr) -> Self {
        p.0
    }
}

impl std::fmt::Display for Psr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (0x{:08X})", self.flags(), self.0)
    }
}

/// The N/Z/C/V condition flags.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flags {
    pub sign: bool,
    pub zero: bool,
    pub carry: bool,
    pub overflow: bool,
}

impl Flags {
    /// N and Z from `result`, with the given carry and overflow.
    #[must_use]
    pub const fn from_result(result: u32, carry: bool, overflow: bool) -> Self {
        Self {
            sign: result >> 31 == 1,
            zero: result == 0,
            carry,
            overflow,
        }
    }
}

impl std::fmt::Display for Flags {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let flag = |on: bool, c: char| if on { c } else { '-' };
        write!(
            f,
            "{}{}{}{}",
            flag(self.sign, 'N'),
            flag(self.zero, 'Z'),
            flag(self.carry, 'C'),
            flag(self.overflow, 'V'),
        )
    }
}
