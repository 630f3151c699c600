//! # Field Decoder
//!
//! Splits a 32-bit instruction word into its named fields. This step never
//! fails: which of the fields mean something, and whether the combination is
//! legal, is decided later by [`Instruction::decode`](super::instructions::Instruction::decode).
//!
//! ```text
//! 31  28 27 26 25 24    21 20 19  16 15  12 11                    0
//! ┌─────┬─────┬──┬────────┬──┬──────┬──────┬───────────────────────┐
//! │cond │class│I │  cmd   │S │  Rd  │  Rn  │       operand 2       │
//! └─────┴─────┴──┴────────┴──┴──────┴──────┴───────────────────────┘
//! ```
//!
//! The destination sits in bits 19-16 and the first operand in bits 15-12
//! for every class, multiply and single data transfer included.

use serde::{Deserialize, Serialize};

use crate::bitwise::Bits;
use crate::cpu::condition::Condition;
use crate::cpu::fault::DecodeFaultKind;

/// Bits 27-26 of the instruction word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OpcodeClass {
    /// `00`: data processing, shifts and multiply.
    DataProcessing,

    /// `01`: LDR, STR, LDRB, STRB.
    SingleDataTransfer,

    /// `10`: B and BL.
    Branch,

    /// `11`: software interrupt.
    Supervisor,
}

impl From<u32> for OpcodeClass {
    fn from(value: u32) -> Self {
        match value & 0b11 {
            0b00 => Self::DataProcessing,
            0b01 => Self::SingleDataTransfer,
            0b10 => Self::Branch,
            _ => Self::Supervisor,
        }
    }
}

/// Shift type held in bits 6-5 of a register operand 2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShiftKind {
    Lsl,
    Lsr,
    Asr,
    Ror,
}

impl From<u32> for ShiftKind {
    fn from(value: u32) -> Self {
        match value & 0b11 {
            0b00 => Self::Lsl,
            0b01 => Self::Lsr,
            0b10 => Self::Asr,
            _ => Self::Ror,
        }
    }
}

impl std::fmt::Display for ShiftKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Lsl => f.write_str("LSL"),
            Self::Lsr => f.write_str("LSR"),
            Self::Asr => f.write_str("ASR"),
            Self::Ror => f.write_str("ROR"),
        }
    }
}

/// Where a register operand takes its shift amount from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShiftAmount {
    /// Bits 11-7.
    Immediate(u32),

    /// Bottom byte of the register in bits 11-8.
    Register(usize),
}

/// The 12-bit operand 2 field, structured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operand2 {
    /// 8-bit immediate rotated right by `2 * rotate`.
    Immediate { rotate: u32, immediate: u32 },

    /// Rm run through the barrel shifter.
    Register {
        rm: usize,
        kind: ShiftKind,
        amount: ShiftAmount,
    },
}

impl Operand2 {
    /// Interprets the low 12 bits of `field` as a data-processing operand 2.
    #[must_use]
    pub fn from_field(field: u32, immediate: bool) -> Self {
        if immediate {
            return Self::Immediate {
                rotate: field.get_bits(8..=11),
                immediate: field.get_bits(0..=7),
            };
        }

        let amount = if field.get_bit(4) {
            ShiftAmount::Register(field.get_bits(8..=11) as usize)
        } else {
            ShiftAmount::Immediate(field.get_bits(7..=11))
        };

        Self::Register {
            rm: field.get_bits(0..=3) as usize,
            kind: ShiftKind::from(field.get_bits(5..=6)),
            amount,
        }
    }

    /// `Rm, LSL #0`: the register passes through unchanged.
    #[must_use]
    pub const fn is_plain_register(&self) -> bool {
        matches!(
            self,
            Self::Register {
                kind: ShiftKind::Lsl,
                amount: ShiftAmount::Immediate(0),
                ..
            }
        )
    }
}

/// The named fields of one instruction word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodedInstruction {
    /// The raw word these fields were taken from.
    pub op_code: u32,
    pub condition: Condition,
    pub class: OpcodeClass,

    /// Bit 25.
    pub immediate: bool,

    /// Bits 24-21.
    pub command: u32,

    /// Bit 20.
    pub set_flags: bool,

    /// Bits 19-16.
    pub rd: usize,

    /// Bits 15-12.
    pub rn: usize,

    /// Bits 11-0.
    pub operand2: u32,
}

impl From<u32> for DecodedInstruction {
    fn from(op_code: u32) -> Self {
        Self {
            op_code,
            condition: Condition::from(op_code.get_bits(28..=31)),
            class: OpcodeClass::from(op_code.get_bits(26..=27)),
            immediate: op_code.get_bit(25),
            command: op_code.get_bits(21..=24),
            set_flags: op_code.get_bit(20),
            rd: op_code.get_bits(16..=19) as usize,
            rn: op_code.get_bits(12..=15) as usize,
            operand2: op_code.get_bits(0..=11),
        }
    }
}

impl DecodedInstruction {
    /// Operand 2 for the data-processing class.
    #[must_use]
    pub fn data_operand(&self) -> Operand2 {
        Operand2::from_field(self.operand2, self.immediate)
    }

    /// Offset of a single data transfer. The I bit is inverted here compared
    /// to data processing: clear means a 12-bit unsigned immediate, set means
    /// a register shifted by an immediate amount.
    ///
    /// # Errors
    ///
    /// [`DecodeFaultKind::UndefinedTransfer`] for a register offset with
    /// bit 4 set: transfers never shift by a register.
    pub fn transfer_offset(&self) -> Result<TransferOffset, DecodeFaultKind> {
        if !self.immediate {
            return Ok(TransferOffset::Immediate(self.operand2));
        }

        match Operand2::from_field(self.operand2, false) {
            Operand2::Register {
                rm,
                kind,
                amount: ShiftAmount::Immediate(amount),
            } => Ok(TransferOffset::Register { rm, kind, amount }),
            _ => Err(DecodeFaultKind::UndefinedTransfer),
        }
    }

    /// Bit 24 of a single data transfer: offset added before the access.
    #[must_use]
    pub fn pre_indexed(&self) -> bool {
        self.op_code.get_bit(24)
    }

    /// Bit 23 of a single data transfer: offset is added, not subtracted.
    #[must_use]
    pub fn offset_up(&self) -> bool {
        self.op_code.get_bit(23)
    }

    /// Bit 22 of a single data transfer: byte instead of word.
    #[must_use]
    pub fn byte_transfer(&self) -> bool {
        self.op_code.get_bit(22)
    }

    /// Bit 21 of a single data transfer: write the address back into Rn.
    #[must_use]
    pub fn write_back(&self) -> bool {
        self.op_code.get_bit(21)
    }

    /// Bit 20 of a single data transfer: load instead of store.
    #[must_use]
    pub fn load(&self) -> bool {
        self.op_code.get_bit(20)
    }

    /// Bit 24 of a branch: store the return address in LR.
    #[must_use]
    pub fn link(&self) -> bool {
        self.op_code.get_bit(24)
    }

    /// Signed 24-bit word offset of a branch, in bytes.
    #[must_use]
    pub fn branch_offset(&self) -> u32 {
        self.op_code.get_bits(0..=23).sign_extended(24) << 2
    }

    /// Bits 23-0 of a software interrupt, ignored by the core and handed to
    /// the trap handler.
    #[must_use]
    pub fn comment(&self) -> u32 {
        self.op_code.get_bits(0..=23)
    }

    /// Bit 21 of a multiply: add Rn to the product.
    #[must_use]
    pub fn accumulate(&self) -> bool {
        self.op_code.get_bit(21)
    }

    /// Bits 11-8 of a multiply.
    #[must_use]
    pub fn rs(&self) -> usize {
        self.op_code.get_bits(8..=11) as usize
    }

    /// Bits 3-0, Rm of a multiply or of a register operand.
    #[must_use]
    pub fn rm(&self) -> usize {
        self.op_code.get_bits(0..=3) as usize
    }
}

/// Offset of LDR/STR/LDRB/STRB before its sign is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransferOffset {
    Immediate(u32),
    Register {
        rm: usize,
        kind: ShiftKind,
        amount: u32,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn decode_every_field() {
        // cond=1010 class=00 I=1 cmd=0100 S=1 Rd=0011 Rn=0101 op2=0xABC
        let op_code: u32 = 0b1010_00_1_0100_1_0011_0101_1010_1011_1100;
        let decoded = DecodedInstruction::from(op_code);

        assert_eq!(
            decoded,
            DecodedInstruction {
                op_code,
                condition: Condition::GE,
                class: OpcodeClass::DataProcessing,
                immediate: true,
                command: 0b0100,
                set_flags: true,
                rd: 3,
                rn: 5,
                operand2: 0xABC,
            }
        );
    }

    #[test]
    fn decode_class() {
        assert_eq!(
            DecodedInstruction::from(0xE400_0000).class,
            OpcodeClass::SingleDataTransfer
        );
        assert_eq!(DecodedInstruction::from(0xEA00_0000).class, OpcodeClass::Branch);
        assert_eq!(
            DecodedInstruction::from(0xEF00_0000).class,
            OpcodeClass::Supervisor
        );
    }

    #[test]
    fn operand2_immediate() {
        assert_eq!(
            Operand2::from_field(0x4FF, true),
            Operand2::Immediate {
                rotate: 4,
                immediate: 0xFF
            }
        );
    }

    #[test]
    fn operand2_register_shifted_by_immediate() {
        // R2, ASR #17
        let field = (17 << 7) | (0b10 << 5) | 2;
        assert_eq!(
            Operand2::from_field(field, false),
            Operand2::Register {
                rm: 2,
                kind: ShiftKind::Asr,
                amount: ShiftAmount::Immediate(17),
            }
        );
        assert!(!Operand2::from_field(field, false).is_plain_register());
        assert!(Operand2::from_field(7, false).is_plain_register());
    }

    #[test]
    fn operand2_register_shifted_by_register() {
        // R14, ROR R9
        let field = (9 << 8) | (0b11 << 5) | (1 << 4) | 14;
        assert_eq!(
            Operand2::from_field(field, false),
            Operand2::Register {
                rm: 14,
                kind: ShiftKind::Ror,
                amount: ShiftAmount::Register(9),
            }
        );
    }

    #[test]
    fn branch_offset_is_sign_extended_and_scaled() {
        assert_eq!(DecodedInstruction::from(0xEB00_0004).branch_offset(), 16);
        assert_eq!(
            DecodedInstruction::from(0xEAFF_FFFE).branch_offset() as i32,
            -8
        );
        assert!(DecodedInstruction::from(0xEB00_0004).link());
        assert!(!DecodedInstruction::from(0xEA00_0004).link());
    }

    #[test]
    fn transfer_offset_inverts_immediate_bit() {
        // I=0: plain 12-bit offset.
        let decoded = DecodedInstruction::from(0xE580_0FFF);
        assert_eq!(decoded.transfer_offset(), Ok(TransferOffset::Immediate(0xFFF)));
        assert!(decoded.pre_indexed());
        assert!(decoded.offset_up());
        assert!(!decoded.byte_transfer());
        assert!(!decoded.load());

        // I=1: R3, LSL #2
        let decoded = DecodedInstruction::from(0xE790_0103);
        assert_eq!(
            decoded.transfer_offset(),
            Ok(TransferOffset::Register {
                rm: 3,
                kind: ShiftKind::Lsl,
                amount: 2,
            })
        );
        assert!(decoded.load());
    }

    #[test]
    fn transfer_offset_shifted_by_register_is_undefined() {
        // LDR R0, [R1, R3, LSL R2]: bit 4 set in a register offset.
        let decoded = DecodedInstruction::from(0xE790_1213);
        assert_eq!(
            decoded.transfer_offset(),
            Err(DecodeFaultKind::UndefinedTransfer)
        );
    }

    #[test]
    fn multiply_registers() {
        // MLA with Rd=1, Rn=2, Rs=3, Rm=4
        let decoded = DecodedInstruction::from(0xE021_2394);
        assert!(decoded.accumulate());
        assert_eq!(decoded.rd, 1);
        assert_eq!(decoded.rn, 2);
        assert_eq!(decoded.rs(), 3);
        assert_eq!(decoded.rm(), 4);
    }

    #[test]
    fn comment_is_low_24_bits() {
        assert_eq!(DecodedInstruction::from(0xEF12_3456).comment(), 0x12_3456);
    }
}
