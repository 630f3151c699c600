use std::fmt::Display;

use crate::cpu::psr::Flags;

/// The 4-bit `cmd` field of a data-processing instruction.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum AluInstruction {
    And = 0x0,
    Eor = 0x1,
    Sub = 0x2,
    Rsb = 0x3,
    Add = 0x4,
    Adc = 0x5,
    Sbc = 0x6,
    Rsc = 0x7,
    Tst = 0x8,
    Teq = 0x9,
    Cmp = 0xA,
    Cmn = 0xB,
    Orr = 0xC,
    Mov = 0xD,
    Bic = 0xE,
    Mvn = 0xF,
}

impl Display for AluInstruction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::And => f.write_str("AND"),
            Self::Eor => f.write_str("EOR"),
            Self::Sub => f.write_str("SUB"),
            Self::Rsb => f.write_str("RSB"),
            Self::Add => f.write_str("ADD"),
            Self::Adc => f.write_str("ADC"),
            Self::Sbc => f.write_str("SBC"),
            Self::Rsc => f.write_str("RSC"),
            Self::Tst => f.write_str("TST"),
            Self::Teq => f.write_str("TEQ"),
            Self::Cmp => f.write_str("CMP"),
            Self::Cmn => f.write_str("CMN"),
            Self::Orr => f.write_str("ORR"),
            Self::Mov => f.write_str("MOV"),
            Self::Bic => f.write_str("BIC"),
            Self::Mvn => f.write_str("MVN"),
        }
    }
}

impl From<u32> for AluInstruction {
    fn from(alu_op_code: u32) -> Self {
        use AluInstruction::{
            Adc, Add, And, Bic, Cmn, Cmp, Eor, Mov, Mvn, Orr, Rsb, Rsc, Sbc, Sub, Teq, Tst,
        };
        match alu_op_code & 0xF {
            0x0 => And,
            0x1 => Eor,
            0x2 => Sub,
            0x3 => Rsb,
            0x4 => Add,
            0x5 => Adc,
            0x6 => Sbc,
            0x7 => Rsc,
            0x8 => Tst,
            0x9 => Teq,
            0xA => Cmp,
            0xB => Cmn,
            0xC => Orr,
            0xD => Mov,
            0xE => Bic,
            _ => Mvn,
        }
    }
}

impl AluInstruction {
    /// TST, TEQ, CMP and CMN only set flags and have no destination.
    #[must_use]
    pub const fn is_comparison(self) -> bool {
        matches!(self, Self::Tst | Self::Teq | Self::Cmp | Self::Cmn)
    }

    /// MOV and MVN ignore Rn.
    #[must_use]
    pub const fn is_move(self) -> bool {
        matches!(self, Self::Mov | Self::Mvn)
    }
}

/// Output of an adder pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ArithmeticOpResult {
    pub result: u32,
    pub carry: bool,
    pub overflow: bool,
}

impl ArithmeticOpResult {
    /// All four flags as an arithmetic instruction with S=1 writes them.
    #[must_use]
    pub const fn flags(&self) -> Flags {
        Flags::from_result(self.result, self.carry, self.overflow)
    }
}

/// `first_op + second_op + carry_in` in one 33-bit addition.
#[must_use]
pub fn add_with_carry(first_op: u32, second_op: u32, carry_in: bool) -> ArithmeticOpResult {
    let wide = u64::from(first_op) + u64::from(second_op) + u64::from(carry_in);
    let result = wide as u32;

    ArithmeticOpResult {
        result,
        carry: wide >> 32 != 0,
        // Both operands agree on the sign and the result does not.
        overflow: ((first_op ^ result) & (second_op ^ result)) >> 31 == 1,
    }
}

/// `first_op - second_op - !carry_in`. Carry is set when nothing was
/// borrowed, so SUB and CMP pass `true`.
#[must_use]
pub fn sub_with_carry(first_op: u32, second_op: u32, carry_in: bool) -> ArithmeticOpResult {
    add_with_carry(first_op, !second_op, carry_in)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn alu_from_cmd_field() {
        assert_eq!(AluInstruction::from(0x4), AluInstruction::Add);
        assert_eq!(AluInstruction::from(0xA), AluInstruction::Cmp);
        assert_eq!(AluInstruction::from(0x1F), AluInstruction::Mvn);
        assert!(AluInstruction::Teq.is_comparison());
        assert!(!AluInstruction::Mov.is_comparison());
        assert!(AluInstruction::Mvn.is_move());
    }

    #[test]
    fn add_signed_overflow() {
        assert_eq!(
            add_with_carry(0x7FFF_FFFF, 1, false),
            ArithmeticOpResult {
                result: 0x8000_0000,
                carry: false,
                overflow: true,
            }
        );
        assert_eq!(
            add_with_carry(0x8000_0000, 0x8000_0000, false),
            ArithmeticOpResult {
                result: 0,
                carry: true,
                overflow: true,
            }
        );
    }

    #[test]
    fn add_unsigned_carry() {
        let r = add_with_carry(0xFFFF_FFFF, 1, false);
        assert_eq!(r.result, 0);
        assert!(r.carry);
        assert!(!r.overflow);
        assert_eq!(r.flags().to_string(), "-ZC-");
    }

    #[test]
    fn add_carry_in() {
        let r = add_with_carry(0xFFFF_FFFF, 0, true);
        assert_eq!(r.result, 0);
        assert!(r.carry);

        let r = add_with_carry(0x7FFF_FFFF, 0, true);
        assert_eq!(r.result, 0x8000_0000);
        assert!(r.overflow);
    }

    #[test]
    fn sub_carry_means_no_borrow() {
        let r = sub_with_carry(5, 3, true);
        assert_eq!(r.result, 2);
        assert!(r.carry);
        assert!(!r.overflow);

        let r = sub_with_carry(3, 5, true);
        assert_eq!(r.result, 0xFFFF_FFFE);
        assert!(!r.carry);
        assert_eq!(r.flags().to_string(), "N---");

        let r = sub_with_carry(7, 7, true);
        assert_eq!(r.flags().to_string(), "-ZC-");
    }

    #[test]
    fn sub_signed_overflow() {
        let r = sub_with_carry(0x8000_0000, 1, true);
        assert_eq!(r.result, 0x7FFF_FFFF);
        assert!(r.carry);
        assert!(r.overflow);

        let r = sub_with_carry(0x7FFF_FFFF, 0xFFFF_FFFF, true);
        assert_eq!(r.result, 0x8000_0000);
        assert!(!r.carry);
        assert!(r.overflow);
    }

    #[test]
    fn sub_borrow_in() {
        // SBC with C clear subtracts one more.
        assert_eq!(sub_with_carry(10, 3, false).result, 6);
        let r = sub_with_carry(0, 0, false);
        assert_eq!(r.result, 0xFFFF_FFFF);
        assert!(!r.carry);
    }
}
