//! # Barrel Shifter
//!
//! Resolves operand 2 to a value and a carry-out. Every data-processing
//! handler, the standalone shift mnemonics and register-offset transfers go
//! through here.
//!
//! Amounts come from two places and the encodings differ:
//!
//! - **Immediate** (bits 11-7): 0..=31, where 0 is special for everything but
//!   LSL (`LSR #0` means `LSR #32`, `ASR #0` means `ASR #32`, `ROR #0` is RRX).
//! - **Register** (bottom byte of Rs): 0..=255 taken literally. 0 leaves both
//!   the value and the carry untouched.

use serde::{Deserialize, Serialize};

use crate::bitwise::Bits;
use crate::cpu::arm::fields::ShiftKind;

/// Operand 2 after the barrel shifter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operand2Value {
    pub value: u32,

    /// Shifter carry-out, or the current C flag when nothing was shifted out.
    pub carry: bool,
}

impl Operand2Value {
    #[must_use]
    pub const fn new(value: u32, carry: bool) -> Self {
        Self { value, carry }
    }
}

/// Shifts `rm` by a literal `amount`, with the carry-out the architecture
/// defines for it. This is the register-specified form: `amount` is the
/// bottom byte of Rs.
#[must_use]
pub fn shift(kind: ShiftKind, amount: u32, rm: u32, carry: bool) -> Operand2Value {
    if amount == 0 {
        return Operand2Value::new(rm, carry);
    }

    match kind {
        ShiftKind::Lsl => match amount {
            1..=31 => Operand2Value::new(rm << amount, rm.get_bit((32 - amount) as u8)),
            32 => Operand2Value::new(0, rm.get_bit(0)),
            _ => Operand2Value::new(0, false),
        },
        ShiftKind::Lsr => match amount {
            1..=31 => Operand2Value::new(rm >> amount, rm.get_bit((amount - 1) as u8)),
            32 => Operand2Value::new(0, rm.get_bit(31)),
            _ => Operand2Value::new(0, false),
        },
        ShiftKind::Asr => match amount {
            1..=31 => Operand2Value::new(
                ((rm as i32) >> amount) as u32,
                rm.get_bit((amount - 1) as u8),
            ),
            // Every bit is a copy of the sign now, carry included.
            _ => Operand2Value::new(((rm as i32) >> 31) as u32, rm.get_bit(31)),
        },
        ShiftKind::Ror => match amount % 32 {
            0 => Operand2Value::new(rm, rm.get_bit(31)),
            rotation => {
                Operand2Value::new(rm.rotate_right(rotation), rm.get_bit((rotation - 1) as u8))
            }
        },
    }
}

/// Shifts `rm` by the 5-bit immediate amount of an instruction.
#[must_use]
pub fn shift_by_immediate(kind: ShiftKind, amount: u32, rm: u32, carry: bool) -> Operand2Value {
    debug_assert!(amount < 32);
    match (kind, amount) {
        (ShiftKind::Lsr | ShiftKind::Asr, 0) => shift(kind, 32, rm, carry),
        // RRX: a 33-bit rotation through the carry flag.
        (ShiftKind::Ror, 0) => {
            Operand2Value::new((rm >> 1) | (u32::from(carry) << 31), rm.get_bit(0))
        }
        _ => shift(kind, amount, rm, carry),
    }
}

/// The 8-bit immediate rotated right by twice the 4-bit rotate field.
#[must_use]
pub fn rotated_immediate(rotate: u32, immediate: u32, carry: bool) -> Operand2Value {
    let value = immediate.rotate_right(rotate * 2);
    let carry = if rotate == 0 { carry } else { value.get_bit(31) };

    Operand2Value::new(value, carry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const RM: u32 = 0b1000_0000_0000_0000_0000_0000_0000_0011;

    #[test]
    fn lsl() {
        assert_eq!(shift(ShiftKind::Lsl, 0, RM, true), Operand2Value::new(RM, true));
        assert_eq!(shift(ShiftKind::Lsl, 1, RM, false), Operand2Value::new(0b110, true));
        assert_eq!(
            shift(ShiftKind::Lsl, 31, RM, false),
            Operand2Value::new(0x8000_0000, true)
        );
        assert_eq!(shift(ShiftKind::Lsl, 32, RM, false), Operand2Value::new(0, true));
        assert_eq!(shift(ShiftKind::Lsl, 33, RM, true), Operand2Value::new(0, false));
        assert_eq!(shift(ShiftKind::Lsl, 200, RM, true), Operand2Value::new(0, false));
    }

    #[test]
    fn lsr() {
        assert_eq!(
            shift(ShiftKind::Lsr, 1, RM, false),
            Operand2Value::new(0x4000_0001, true)
        );
        assert_eq!(shift(ShiftKind::Lsr, 31, RM, false), Operand2Value::new(1, false));
        assert_eq!(shift(ShiftKind::Lsr, 32, RM, false), Operand2Value::new(0, true));
        assert_eq!(shift(ShiftKind::Lsr, 33, RM, true), Operand2Value::new(0, false));

        // LSR #0 encodes LSR #32.
        assert_eq!(
            shift_by_immediate(ShiftKind::Lsr, 0, RM, false),
            Operand2Value::new(0, true)
        );
        assert_eq!(
            shift_by_immediate(ShiftKind::Lsr, 0, 0x7FFF_FFFF, true),
            Operand2Value::new(0, false)
        );
    }

    #[test]
    fn asr_replicates_sign() {
        assert_eq!(
            shift(ShiftKind::Asr, 1, RM, false),
            Operand2Value::new(0xC000_0001, true)
        );
        assert_eq!(
            shift(ShiftKind::Asr, 4, 0x8000_0000, false),
            Operand2Value::new(0xF800_0000, false)
        );
        assert_eq!(
            shift(ShiftKind::Asr, 31, RM, false),
            Operand2Value::new(0xFFFF_FFFF, false)
        );
        assert_eq!(
            shift(ShiftKind::Asr, 4, 0x7000_00F8, true),
            Operand2Value::new(0x0700_000F, true)
        );
        assert_eq!(
            shift(ShiftKind::Asr, 32, RM, false),
            Operand2Value::new(0xFFFF_FFFF, true)
        );
        assert_eq!(
            shift(ShiftKind::Asr, 100, 0x7FFF_FFFF, true),
            Operand2Value::new(0, false)
        );

        // ASR #0 encodes ASR #32.
        assert_eq!(
            shift_by_immediate(ShiftKind::Asr, 0, RM, false),
            Operand2Value::new(0xFFFF_FFFF, true)
        );
        assert_eq!(
            shift_by_immediate(ShiftKind::Asr, 0, 0x4000_0000, true),
            Operand2Value::new(0, false)
        );
    }

    #[test]
    fn ror() {
        assert_eq!(
            shift(ShiftKind::Ror, 1, RM, false),
            Operand2Value::new(0xC000_0001, true)
        );
        assert_eq!(
            shift(ShiftKind::Ror, 31, RM, false),
            Operand2Value::new(0x0000_0007, false)
        );
        assert_eq!(shift(ShiftKind::Ror, 32, RM, false), Operand2Value::new(RM, true));
        assert_eq!(shift(ShiftKind::Ror, 64, 0x1, true), Operand2Value::new(0x1, false));
        // 36 behaves as 4.
        assert_eq!(
            shift(ShiftKind::Ror, 36, 0x0000_00F8, false),
            Operand2Value::new(0x8000_000F, true)
        );
    }

    #[test]
    fn rrx() {
        assert_eq!(
            shift_by_immediate(ShiftKind::Ror, 0, RM, false),
            Operand2Value::new(0x4000_0001, true)
        );
        assert_eq!(
            shift_by_immediate(ShiftKind::Ror, 0, 0b10, true),
            Operand2Value::new(0x8000_0001, false)
        );
    }

    #[test]
    fn immediate_amount_zero_lsl_keeps_carry() {
        assert_eq!(
            shift_by_immediate(ShiftKind::Lsl, 0, RM, true),
            Operand2Value::new(RM, true)
        );
        assert_eq!(
            shift_by_immediate(ShiftKind::Lsl, 0, RM, false),
            Operand2Value::new(RM, false)
        );
    }

    #[test]
    fn register_amount_zero_keeps_value_and_carry() {
        for kind in [ShiftKind::Lsl, ShiftKind::Lsr, ShiftKind::Asr, ShiftKind::Ror] {
            assert_eq!(shift(kind, 0, RM, true), Operand2Value::new(RM, true));
            assert_eq!(shift(kind, 0, RM, false), Operand2Value::new(RM, false));
        }
    }

    #[test]
    fn carry_is_the_last_bit_shifted_out() {
        let value = 0xA5C3_0F96_u32;
        for amount in 1..32_u32 {
            let wide = u64::from(value);
            let lsl = shift(ShiftKind::Lsl, amount, value, false);
            assert_eq!(lsl.carry, (wide << amount) >> 32 & 1 == 1, "LSL #{amount}");

            let lsr = shift(ShiftKind::Lsr, amount, value, false);
            assert_eq!(lsr.carry, (value >> (amount - 1)) & 1 == 1, "LSR #{amount}");
            assert_eq!(lsr.value, value >> amount);

            let asr = shift(ShiftKind::Asr, amount, value, false);
            assert_eq!(asr.value, ((value as i32) >> amount) as u32);
            assert_eq!(asr.carry, lsr.carry);

            let ror = shift(ShiftKind::Ror, amount, value, false);
            assert_eq!(ror.value, value.rotate_right(amount));
            assert_eq!(ror.carry, ror.value >> 31 == 1, "ROR #{amount}");
        }
    }

    #[test]
    fn immediate_rotation() {
        // 0xFF ror 8 = 0xFF000000
        assert_eq!(
            rotated_immediate(4, 0xFF, false),
            Operand2Value::new(0xFF00_0000, true)
        );
        // 0x3F ror 2 = 0xC000000F
        assert_eq!(
            rotated_immediate(1, 0x3F, false),
            Operand2Value::new(0xC000_000F, true)
        );
        assert_eq!(
            rotated_immediate(15, 0x01, true),
            Operand2Value::new(0x0000_0004, false)
        );
        assert_eq!(rotated_immediate(0, 0xAB, true), Operand2Value::new(0xAB, true));
    }
}
