//! # Opcode classification
//!
//! Turns a [`DecodedInstruction`] into one of the closed set of [`Opcode`]s,
//! or explains why it cannot. Legality checks happen here, once, so that
//! handlers only ever see encodings they know how to execute.
//!
//! | Class | Opcodes                                                     |
//! |-------|-------------------------------------------------------------|
//! | `00`  | AND..MVN, the LSL/LSR/ASR/ROR forms of MOV, MUL, MLA        |
//! | `01`  | LDR, STR, LDRB, STRB (pre-indexed, no write-back)           |
//! | `10`  | B, BL                                                       |
//! | `11`  | SWI                                                         |

use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::bitwise::Bits;
use crate::cpu::arm::alu::AluInstruction;
use crate::cpu::arm::fields::{
    DecodedInstruction, OpcodeClass, Operand2, ShiftAmount, ShiftKind, TransferOffset,
};
use crate::cpu::fault::{DecodeError, DecodeFaultKind, UnsupportedKind};
use crate::cpu::registers::REG_PROGRAM_COUNTER;

/// Every operation the core can execute. Each one has exactly one handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Opcode {
    And,
    Eor,
    Sub,
    Rsb,
    Add,
    Adc,
    Sbc,
    Rsc,
    Tst,
    Teq,
    Cmp,
    Cmn,
    Orr,
    Mov,
    Bic,
    Mvn,
    Lsl,
    Lsr,
    Asr,
    Ror,
    B,
    Bl,
    Ldr,
    Str,
    Ldrb,
    Strb,
    Mul,
    Mla,
    Swi,
}

impl Opcode {
    /// Every variant, in declaration order.
    pub const ALL: [Self; 29] = [
        Self::And,
        Self::Eor,
        Self::Sub,
        Self::Rsb,
        Self::Add,
        Self::Adc,
        Self::Sbc,
        Self::Rsc,
        Self::Tst,
        Self::Teq,
        Self::Cmp,
        Self::Cmn,
        Self::Orr,
        Self::Mov,
        Self::Bic,
        Self::Mvn,
        Self::Lsl,
        Self::Lsr,
        Self::Asr,
        Self::Ror,
        Self::B,
        Self::Bl,
        Self::Ldr,
        Self::Str,
        Self::Ldrb,
        Self::Strb,
        Self::Mul,
        Self::Mla,
        Self::Swi,
    ];
}

impl From<AluInstruction> for Opcode {
    fn from(alu: AluInstruction) -> Self {
        match alu {
            AluInstruction::And => Self::And,
            AluInstruction::Eor => Self::Eor,
            AluInstruction::Sub => Self::Sub,
            AluInstruction::Rsb => Self::Rsb,
            AluInstruction::Add => Self::Add,
            AluInstruction::Adc => Self::Adc,
            AluInstruction::Sbc => Self::Sbc,
            AluInstruction::Rsc => Self::Rsc,
            AluInstruction::Tst => Self::Tst,
            AluInstruction::Teq => Self::Teq,
            AluInstruction::Cmp => Self::Cmp,
            AluInstruction::Cmn => Self::Cmn,
            AluInstruction::Orr => Self::Orr,
            AluInstruction::Mov => Self::Mov,
            AluInstruction::Bic => Self::Bic,
            AluInstruction::Mvn => Self::Mvn,
        }
    }
}

impl From<ShiftKind> for Opcode {
    fn from(kind: ShiftKind) -> Self {
        match kind {
            ShiftKind::Lsl => Self::Lsl,
            ShiftKind::Lsr => Self::Lsr,
            ShiftKind::Asr => Self::Asr,
            ShiftKind::Ror => Self::Ror,
        }
    }
}

impl Display for Opcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mnemonic = format!("{self:?}").to_uppercase();
        f.write_str(&mnemonic)
    }
}

/// A classified instruction: its fields plus the opcode they select.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instruction {
    pub decoded: DecodedInstruction,
    pub opcode: Opcode,
}

impl Instruction {
    /// Maps the fields of a word to an [`Opcode`], rejecting reserved and
    /// unimplemented encodings.
    ///
    /// # Errors
    ///
    /// [`DecodeError::Fault`] for reserved or undefined bit patterns,
    /// [`DecodeError::Unsupported`] for legal encodings outside the subset.
    pub fn decode(decoded: DecodedInstruction) -> Result<Self, DecodeError> {
        let opcode = match decoded.class {
            OpcodeClass::DataProcessing => decode_data_processing(&decoded)?,
            OpcodeClass::SingleDataTransfer => decode_single_data_transfer(&decoded)?,
            OpcodeClass::Branch => {
                if !decoded.immediate {
                    return Err(UnsupportedKind::BlockTransfer.into());
                }
                if decoded.link() { Opcode::Bl } else { Opcode::B }
            }
            OpcodeClass::Supervisor => {
                if decoded.op_code.get_bits(24..=27) != 0b1111 {
                    return Err(UnsupportedKind::Coprocessor.into());
                }
                Opcode::Swi
            }
        };

        Ok(Self { decoded, opcode })
    }
}

impl TryFrom<u32> for Instruction {
    type Error = DecodeError;

    fn try_from(op_code: u32) -> Result<Self, Self::Error> {
        Self::decode(DecodedInstruction::from(op_code))
    }
}

fn decode_data_processing(decoded: &DecodedInstruction) -> Result<Opcode, DecodeError> {
    let op_code = decoded.op_code;

    // Bit 7 and bit 4 both set is not a shifted register.
    if !decoded.immediate && op_code.get_bit(4) && op_code.get_bit(7) {
        return decode_multiply_space(decoded);
    }

    // Comparisons write the flags whatever the S bit says.
    let alu = AluInstruction::from(decoded.command);

    let operand = decoded.data_operand();
    if let Operand2::Register {
        rm,
        amount: ShiftAmount::Register(rs),
        ..
    } = operand
    {
        let reads_rn = !alu.is_move();
        let writes_rd = !alu.is_comparison();
        if rm == REG_PROGRAM_COUNTER
            || rs == REG_PROGRAM_COUNTER
            || (reads_rn && decoded.rn == REG_PROGRAM_COUNTER)
            || (writes_rd && decoded.rd == REG_PROGRAM_COUNTER)
        {
            return Err(UnsupportedKind::ProgramCounterOperand.into());
        }
    }

    if decoded.set_flags && !alu.is_comparison() && decoded.rd == REG_PROGRAM_COUNTER {
        return Err(UnsupportedKind::SetFlagsToProgramCounter.into());
    }

    Ok(match (alu, operand) {
        (AluInstruction::Mov, Operand2::Register { kind, .. }) if !operand.is_plain_register() => {
            Opcode::from(kind)
        }
        _ => Opcode::from(alu),
    })
}

/// Class `00`, register operand, bits 7 and 4 set.
fn decode_multiply_space(decoded: &DecodedInstruction) -> Result<Opcode, DecodeError> {
    let op_code = decoded.op_code;

    // Bits 6-5 non-zero encode LDRH/STRH/LDRSB/LDRSH, which this core treats
    // as a register shift with bit 7 set.
    if op_code.get_bits(5..=6) != 0 {
        return Err(DecodeFaultKind::ReservedShiftBit.into());
    }

    match op_code.get_bits(22..=27) {
        0b00_0000 => {
            let registers = [decoded.rd, decoded.rs(), decoded.rm()];
            if registers.contains(&REG_PROGRAM_COUNTER)
                || (decoded.accumulate() && decoded.rn == REG_PROGRAM_COUNTER)
            {
                return Err(UnsupportedKind::ProgramCounterOperand.into());
            }
            Ok(if decoded.accumulate() {
                Opcode::Mla
            } else {
                Opcode::Mul
            })
        }
        0b00_0010 | 0b00_0011 => Err(UnsupportedKind::MultiplyLong.into()),
        0b00_0100 | 0b00_0101
            if op_code.get_bits(20..=21) == 0 && op_code.get_bits(8..=11) == 0 =>
        {
            Err(UnsupportedKind::Swap.into())
        }
        _ => Err(DecodeFaultKind::UndefinedMultiply.into()),
    }
}

fn decode_single_data_transfer(decoded: &DecodedInstruction) -> Result<Opcode, DecodeError> {
    let offset = decoded.transfer_offset()?;
    if !decoded.pre_indexed() {
        return Err(UnsupportedKind::PostIndexed.into());
    }
    if decoded.write_back() {
        return Err(UnsupportedKind::WriteBack.into());
    }

    if let TransferOffset::Register { rm, .. } = offset
        && rm == REG_PROGRAM_COUNTER
    {
        return Err(UnsupportedKind::ProgramCounterOperand.into());
    }

    let opcode = match (decoded.load(), decoded.byte_transfer()) {
        (true, false) => Opcode::Ldr,
        (false, false) => Opcode::Str,
        (true, true) => Opcode::Ldrb,
        (false, true) => Opcode::Strb,
    };

    // Only a word load may target the PC, it is a jump.
    if decoded.rd == REG_PROGRAM_COUNTER && opcode != Opcode::Ldr {
        return Err(UnsupportedKind::ProgramCounterOperand.into());
    }

    Ok(opcode)
}

impl Display for Operand2 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {
            Self::Immediate { rotate, immediate } => {
                write!(f, "#0x{:X}", immediate.rotate_right(rotate * 2))
            }
            Self::Register { rm, kind, amount } => {
                write!(f, "R{rm}")?;
                match amount {
                    ShiftAmount::Immediate(0) if kind == ShiftKind::Lsl => Ok(()),
                    ShiftAmount::Immediate(0) if kind == ShiftKind::Ror => f.write_str(", RRX"),
                    ShiftAmount::Immediate(0) => write!(f, ", {kind} #32"),
                    ShiftAmount::Immediate(amount) => write!(f, ", {kind} #{amount}"),
                    ShiftAmount::Register(rs) => write!(f, ", {kind} R{rs}"),
                }
            }
        }
    }
}

impl Display for Instruction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let d = &self.decoded;
        let condition = d.condition;
        let opcode = self.opcode;
        let set_string = if d.set_flags { "S" } else { "" };

        match opcode {
            Opcode::Tst | Opcode::Teq | Opcode::Cmp | Opcode::Cmn => {
                write!(f, "{opcode}{condition} R{}, {}", d.rn, d.data_operand())
            }
            Opcode::Mov | Opcode::Mvn => {
                write!(f, "{opcode}{condition}{set_string} R{}, {}", d.rd, d.data_operand())
            }
            Opcode::Lsl | Opcode::Lsr | Opcode::Asr | Opcode::Ror => {
                let Operand2::Register { rm, amount, kind } = d.data_operand() else {
                    return write!(f, "MOV{condition}{set_string} R{}, {}", d.rd, d.data_operand());
                };
                let rd = d.rd;
                match amount {
                    ShiftAmount::Immediate(0) if kind == ShiftKind::Ror => {
                        write!(f, "RRX{condition}{set_string} R{rd}, R{rm}")
                    }
                    ShiftAmount::Immediate(0) => {
                        write!(f, "{opcode}{condition}{set_string} R{rd}, R{rm}, #32")
                    }
                    ShiftAmount::Immediate(amount) => {
                        write!(f, "{opcode}{condition}{set_string} R{rd}, R{rm}, #{amount}")
                    }
                    ShiftAmount::Register(rs) => {
                        write!(f, "{opcode}{condition}{set_string} R{rd}, R{rm}, R{rs}")
                    }
                }
            }
            Opcode::And
            | Opcode::Eor
            | Opcode::Sub
            | Opcode::Rsb
            | Opcode::Add
            | Opcode::Adc
            | Opcode::Sbc
            | Opcode::Rsc
            | Opcode::Orr
            | Opcode::Bic => write!(
                f,
                "{opcode}{condition}{set_string} R{}, R{}, {}",
                d.rd,
                d.rn,
                d.data_operand()
            ),
            Opcode::B | Opcode::Bl => {
                // Relative to the instruction address + 8.
                write!(f, "{opcode}{condition} #{}", d.branch_offset() as i32)
            }
            Opcode::Ldr | Opcode::Str | Opcode::Ldrb | Opcode::Strb => {
                let op = if d.load() { "LDR" } else { "STR" };
                let b = if d.byte_transfer() { "B" } else { "" };
                let sign = if d.offset_up() { "" } else { "-" };
                let offset = match d.transfer_offset() {
                    Ok(TransferOffset::Immediate(0)) => String::new(),
                    Ok(TransferOffset::Immediate(offset)) => format!(", #{sign}0x{offset:X}"),
                    Err(kind) => format!(", <{kind}>"),
                    Ok(TransferOffset::Register { rm, kind, amount }) => {
                        let shifted = Operand2::Register {
                            rm,
                            kind,
                            amount: ShiftAmount::Immediate(amount),
                        };
                        format!(", {sign}{shifted}")
                    }
                };

                write!(f, "{op}{condition}{b} R{}, [R{}{offset}]", d.rd, d.rn)
            }
            Opcode::Mul => write!(
                f,
                "MUL{condition}{set_string} R{}, R{}, R{}",
                d.rd,
                d.rm(),
                d.rs()
            ),
            Opcode::Mla => write!(
                f,
                "MLA{condition}{set_string} R{}, R{}, R{}, R{}",
                d.rd,
                d.rm(),
                d.rs(),
                d.rn
            ),
            Opcode::Swi => write!(f, "SWI{condition} 0x{:06X}", d.comment()),
        }
    }
}
