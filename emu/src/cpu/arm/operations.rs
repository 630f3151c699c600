//! # Opcode handlers
//!
//! One handler per [`Opcode`], all with the same signature. A handler reads
//! the current [`ArchState`], the classified instruction and the resolved
//! operand 2, and returns the [`Delta`] it wants committed. Only loads and
//! stores touch the memory.

use crate::cpu::arm::alu::{ArithmeticOpResult, add_with_carry, sub_with_carry};
use crate::cpu::arm::fields::{OpcodeClass, Operand2, ShiftAmount, TransferOffset};
use crate::cpu::arm::instructions::{Instruction, Opcode};
use crate::cpu::arm::shifter::{Operand2Value, rotated_immediate, shift, shift_by_immediate};
use crate::cpu::fault::{DecodeError, Fault};
use crate::cpu::psr::Flags;
use crate::cpu::state::{ArchState, Delta};
use crate::memory::{Memory, MemoryError, Width};

pub const SIZE_OF_INSTRUCTION: u32 = 4;

/// What a handler gets to look at.
pub struct Context<'a> {
    pub state: &'a ArchState,
    pub instruction: &'a Instruction,
    pub operand2: Operand2Value,
}

impl Context<'_> {
    fn memory_fault(&self, source: MemoryError) -> Fault {
        Fault::Memory {
            address: self.state.program_counter(),
            op_code: Some(self.instruction.decoded.op_code),
            source,
        }
    }

    /// Value of Rn.
    fn first_operand(&self) -> u32 {
        self.state.operand(self.instruction.decoded.rn)
    }
}

pub type Handler = fn(&Context<'_>, &mut dyn Memory) -> Result<Delta, Fault>;

/// The dispatch table.
#[must_use]
pub const fn handler(opcode: Opcode) -> Handler {
    match opcode {
        Opcode::And => and,
        Opcode::Eor => eor,
        Opcode::Sub => sub,
        Opcode::Rsb => rsb,
        Opcode::Add => add,
        Opcode::Adc => adc,
        Opcode::Sbc => sbc,
        Opcode::Rsc => rsc,
        Opcode::Tst => tst,
        Opcode::Teq => teq,
        Opcode::Cmp => cmp,
        Opcode::Cmn => cmn,
        Opcode::Orr => orr,
        Opcode::Mov => mov,
        Opcode::Bic => bic,
        Opcode::Mvn => mvn,
        Opcode::Lsl | Opcode::Lsr | Opcode::Asr | Opcode::Ror => shift_move,
        Opcode::B => b,
        Opcode::Bl => bl,
        Opcode::Ldr | Opcode::Ldrb => load,
        Opcode::Str | Opcode::Strb => store,
        Opcode::Mul => mul,
        Opcode::Mla => mla,
        Opcode::Swi => swi,
    }
}

/// Runs operand 2 through the barrel shifter, or through whatever stands
/// in for it in the instruction's class.
///
/// # Errors
///
/// [`DecodeError`] when the offset of a single data transfer is undefined.
/// [`Instruction::decode`] already rejects those words.
pub fn resolve_operand2(
    state: &ArchState,
    instruction: &Instruction,
) -> Result<Operand2Value, DecodeError> {
    let decoded = &instruction.decoded;
    let carry = state.cpsr.carry_flag();

    Ok(match (decoded.class, instruction.opcode) {
        (OpcodeClass::DataProcessing, Opcode::Mul | Opcode::Mla) => {
            Operand2Value::new(0, carry)
        }
        (OpcodeClass::DataProcessing, _) => match decoded.data_operand() {
            Operand2::Immediate { rotate, immediate } => {
                rotated_immediate(rotate, immediate, carry)
            }
            Operand2::Register {
                rm,
                kind,
                amount: ShiftAmount::Immediate(amount),
            } => shift_by_immediate(kind, amount, state.operand(rm), carry),
            Operand2::Register {
                rm,
                kind,
                amount: ShiftAmount::Register(rs),
            } => shift(kind, state.operand(rs) & 0xFF, state.operand(rm), carry),
        },
        (OpcodeClass::SingleDataTransfer, _) => match decoded.transfer_offset()? {
            TransferOffset::Immediate(offset) => Operand2Value::new(offset, carry),
            TransferOffset::Register { rm, kind, amount } => {
                shift_by_immediate(kind, amount, state.operand(rm), carry)
            }
        },
        (OpcodeClass::Branch, _) => Operand2Value::new(decoded.branch_offset(), carry),
        (OpcodeClass::Supervisor, _) => Operand2Value::new(decoded.comment(), carry),
    })
}

/// AND, EOR, ORR, BIC, MOV, MVN and the shifts. C comes from the shifter, V
/// is kept.
fn logical(ctx: &Context<'_>, result: u32) -> Delta {
    let decoded = &ctx.instruction.decoded;
    let flags = decoded.set_flags.then(|| {
        Flags::from_result(result, ctx.operand2.carry, ctx.state.cpsr.overflow_flag())
    });

    Delta {
        destination: Some((decoded.rd, result)),
        flags,
        ..Default::default()
    }
}

fn arithmetic(ctx: &Context<'_>, op_result: ArithmeticOpResult) -> Delta {
    let decoded = &ctx.instruction.decoded;

    Delta {
        destination: Some((decoded.rd, op_result.result)),
        flags: decoded.set_flags.then(|| op_result.flags()),
        ..Default::default()
    }
}

/// TST and TEQ: flags only.
fn test(ctx: &Context<'_>, result: u32) -> Delta {
    Delta {
        flags: Some(Flags::from_result(
            result,
            ctx.operand2.carry,
            ctx.state.cpsr.overflow_flag(),
        )),
        ..Default::default()
    }
}

/// CMP and CMN: flags only.
fn compare(op_result: ArithmeticOpResult) -> Delta {
    Delta {
        flags: Some(op_result.flags()),
        ..Default::default()
    }
}

fn and(ctx: &Context<'_>, _: &mut dyn Memory) -> Result<Delta, Fault> {
    Ok(logical(ctx, ctx.first_operand() & ctx.operand2.value))
}

fn eor(ctx: &Context<'_>, _: &mut dyn Memory) -> Result<Delta, Fault> {
    Ok(logical(ctx, ctx.first_operand() ^ ctx.operand2.value))
}

fn orr(ctx: &Context<'_>, _: &mut dyn Memory) -> Result<Delta, Fault> {
    Ok(logical(ctx, ctx.first_operand() | ctx.operand2.value))
}

fn bic(ctx: &Context<'_>, _: &mut dyn Memory) -> Result<Delta, Fault> {
    Ok(logical(ctx, ctx.first_operand() & !ctx.operand2.value))
}

fn mov(ctx: &Context<'_>, _: &mut dyn Memory) -> Result<Delta, Fault> {
    Ok(logical(ctx, ctx.operand2.value))
}

fn mvn(ctx: &Context<'_>, _: &mut dyn Memory) -> Result<Delta, Fault> {
    Ok(logical(ctx, !ctx.operand2.value))
}

/// LSL, LSR, ASR, ROR: the shifter already did the work.
fn shift_move(ctx: &Context<'_>, _: &mut dyn Memory) -> Result<Delta, Fault> {
    Ok(logical(ctx, ctx.operand2.value))
}

fn add(ctx: &Context<'_>, _: &mut dyn Memory) -> Result<Delta, Fault> {
    Ok(arithmetic(
        ctx,
        add_with_carry(ctx.first_operand(), ctx.operand2.value, false),
    ))
}

fn adc(ctx: &Context<'_>, _: &mut dyn Memory) -> Result<Delta, Fault> {
    Ok(arithmetic(
        ctx,
        add_with_carry(
            ctx.first_operand(),
            ctx.operand2.value,
            ctx.state.cpsr.carry_flag(),
        ),
    ))
}

fn sub(ctx: &Context<'_>, _: &mut dyn Memory) -> Result<Delta, Fault> {
    Ok(arithmetic(
        ctx,
        sub_with_carry(ctx.first_operand(), ctx.operand2.value, true),
    ))
}

fn sbc(ctx: &Context<'_>, _: &mut dyn Memory) -> Result<Delta, Fault> {
    Ok(arithmetic(
        ctx,
        sub_with_carry(
            ctx.first_operand(),
            ctx.operand2.value,
            ctx.state.cpsr.carry_flag(),
        ),
    ))
}

fn rsb(ctx: &Context<'_>, _: &mut dyn Memory) -> Result<Delta, Fault> {
    Ok(arithmetic(
        ctx,
        sub_with_carry(ctx.operand2.value, ctx.first_operand(), true),
    ))
}

fn rsc(ctx: &Context<'_>, _: &mut dyn Memory) -> Result<Delta, Fault> {
    Ok(arithmetic(
        ctx,
        sub_with_carry(
            ctx.operand2.value,
            ctx.first_operand(),
            ctx.state.cpsr.carry_flag(),
        ),
    ))
}

fn tst(ctx: &Context<'_>, _: &mut dyn Memory) -> Result<Delta, Fault> {
    Ok(test(ctx, ctx.first_operand() & ctx.operand2.value))
}

fn teq(ctx: &Context<'_>, _: &mut dyn Memory) -> Result<Delta, Fault> {
    Ok(test(ctx, ctx.first_operand() ^ ctx.operand2.value))
}

fn cmp(ctx: &Context<'_>, _: &mut dyn Memory) -> Result<Delta, Fault> {
    Ok(compare(sub_with_carry(
        ctx.first_operand(),
        ctx.operand2.value,
        true,
    )))
}

fn cmn(ctx: &Context<'_>, _: &mut dyn Memory) -> Result<Delta, Fault> {
    Ok(compare(add_with_carry(
        ctx.first_operand(),
        ctx.operand2.value,
        false,
    )))
}

/// Branch targets are relative to the PC as read by the instruction, which
/// is 8 bytes ahead.
fn branch_target(ctx: &Context<'_>) -> u32 {
    ctx.state
        .program_counter()
        .wrapping_add(8)
        .wrapping_add(ctx.operand2.value)
}

fn b(ctx: &Context<'_>, _: &mut dyn Memory) -> Result<Delta, Fault> {
    Ok(Delta {
        jump: Some(branch_target(ctx)),
        ..Default::default()
    })
}

fn bl(ctx: &Context<'_>, _: &mut dyn Memory) -> Result<Delta, Fault> {
    Ok(Delta {
        link: Some(
            ctx.state
                .program_counter()
                .wrapping_add(SIZE_OF_INSTRUCTION),
        ),
        jump: Some(branch_target(ctx)),
        ..Default::default()
    })
}

/// Rn plus or minus the offset, depending on the U bit.
fn effective_address(ctx: &Context<'_>) -> u32 {
    let base = ctx.first_operand();
    let offset = ctx.operand2.value;

    if ctx.instruction.decoded.offset_up() {
        base.wrapping_add(offset)
    } else {
        base.wrapping_sub(offset)
    }
}

/// LDR and LDRB. Bytes are zero-extended.
fn load(ctx: &Context<'_>, memory: &mut dyn Memory) -> Result<Delta, Fault> {
    let width = Width::from(ctx.instruction.decoded.byte_transfer());
    let address = effective_address(ctx);
    let value = memory
        .load(address, width)
        .map_err(|source| ctx.memory_fault(source))?;

    tracing::trace!("load 0x{value:08X} from 0x{address:08X}");

    Ok(Delta {
        destination: Some((ctx.instruction.decoded.rd, value)),
        ..Default::default()
    })
}

/// STR and STRB. A byte store writes the low byte of Rd.
fn store(ctx: &Context<'_>, memory: &mut dyn Memory) -> Result<Delta, Fault> {
    let width = Width::from(ctx.instruction.decoded.byte_transfer());
    let address = effective_address(ctx);
    let value = ctx.state.operand(ctx.instruction.decoded.rd);
    memory
        .store(address, width, value)
        .map_err(|source| ctx.memory_fault(source))?;

    tracing::trace!("store 0x{value:08X} to 0x{address:08X}");

    Ok(Delta::default())
}

/// MUL and MLA keep the low 32 bits. With S set only N and Z change.
fn multiply(ctx: &Context<'_>, accumulate: u32) -> Delta {
    let decoded = &ctx.instruction.decoded;
    let cpsr = ctx.state.cpsr;

    let result = ctx
        .state
        .operand(decoded.rm())
        .wrapping_mul(ctx.state.operand(decoded.rs()))
        .wrapping_add(accumulate);

    Delta {
        destination: Some((decoded.rd, result)),
        flags: decoded
            .set_flags
            .then(|| Flags::from_result(result, cpsr.carry_flag(), cpsr.overflow_flag())),
        ..Default::default()
    }
}

fn mul(ctx: &Context<'_>, _: &mut dyn Memory) -> Result<Delta, Fault> {
    Ok(multiply(ctx, 0))
}

fn mla(ctx: &Context<'_>, _: &mut dyn Memory) -> Result<Delta, Fault> {
    Ok(multiply(ctx, ctx.first_operand()))
}

/// SWI only raises the trap, handling it is up to the caller.
fn swi(ctx: &Context<'_>, _: &mut dyn Memory) -> Result<Delta, Fault> {
    Ok(Delta {
        trap: Some(ctx.operand2.value),
        ..Default::default()
    })
}
