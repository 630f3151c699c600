//! # Execution engine
//!
//! [`execute_one`] is the whole core: decode, condition gate, operand 2,
//! handler, commit. It is a pure function of the current state, the word
//! and the memory.
//!
//! [`Cpu`] wraps it in the usual fetch loop, keeps the current state between
//! instructions and hands software interrupts to a [`TrapHandler`].

use serde::{Deserialize, Serialize};

use crate::cpu::arm::fields::DecodedInstruction;
use crate::cpu::arm::instructions::{Instruction, Opcode};
use crate::cpu::arm::operations::{Context, handler, resolve_operand2};
use crate::cpu::fault::{DecodeError, Fault};
use crate::cpu::state::ArchState;
use crate::memory::{Fetch, Memory};

/// What happened to the instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    Executed(Opcode),

    /// The condition did not hold.
    Skipped,

    /// SWI with its 24-bit comment.
    SoftwareInterrupt(u32),
}

/// Result of [`execute_one`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
    /// The state after the instruction.
    pub state: ArchState,
    pub outcome: Outcome,
}

/// Executes the instruction word `op_code` against `current`.
///
/// `current` is never modified. On success the returned state is the one
/// the next instruction sees; on a fault there is no next state and the
/// caller still holds the one the instruction started from.
///
/// # Errors
///
/// A [`Fault`] when the word is reserved or outside of the implemented
/// subset, or when a load or store is rejected by `memory`. A word whose
/// condition fails never faults.
pub fn execute_one(
    current: &ArchState,
    op_code: u32,
    memory: &mut dyn Memory,
) -> Result<Step, Fault> {
    let pc = current.program_counter();
    let decoded = DecodedInstruction::from(op_code);

    if !current.cpsr.can_execute(decoded.condition) {
        tracing::trace!(
            "0x{pc:08X}: 0x{op_code:08X} skipped, {:?} does not hold",
            decoded.condition
        );
        return Ok(Step {
            state: current.skip(),
            outcome: Outcome::Skipped,
        });
    }

    let to_fault = |e: DecodeError| {
        let fault = e.at(pc, op_code);
        tracing::debug!("{fault}");
        fault
    };

    let instruction = Instruction::decode(decoded).map_err(to_fault)?;

    tracing::trace!("0x{pc:08X}: {instruction}");

    let ctx = Context {
        state: current,
        instruction: &instruction,
        operand2: resolve_operand2(current, &instruction).map_err(to_fault)?,
    };
    let delta = handler(instruction.opcode)(&ctx, memory)
        .inspect_err(|fault| tracing::debug!("{fault}"))?;

    let outcome = delta
        .trap
        .map_or(Outcome::Executed(instruction.opcode), Outcome::SoftwareInterrupt);

    Ok(Step {
        state: current.commit(&delta),
        outcome,
    })
}

/// What to do after a software interrupt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrapAction {
    /// Go on with the instruction after the SWI.
    Resume,

    /// Stop the run loop.
    Halt,
}

/// Receives SWIs. The core itself gives them no meaning.
pub trait TrapHandler {
    /// `state` is the state after the SWI, PC already on the next word.
    fn software_interrupt(&mut self, comment: u32, state: &ArchState) -> TrapAction;
}

/// Stops at the first SWI, whatever its comment.
#[derive(Debug, Default, Clone, Copy)]
pub struct HaltOnSwi;

impl TrapHandler for HaltOnSwi {
    fn software_interrupt(&mut self, _comment: u32, _state: &ArchState) -> TrapAction {
        TrapAction::Halt
    }
}

/// Limits for [`Cpu::run`].
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Instructions to execute before giving up. `None` runs until a halt.
    pub max_steps: Option<u64>,

    /// Stop before executing any of these addresses.
    pub breakpoints: Vec<u32>,
}

/// Why [`Cpu::run`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopReason {
    /// A trap handler asked to halt on this SWI.
    Halted { comment: u32 },

    /// The PC reached a breakpoint. The instruction there has not run.
    Breakpoint { address: u32 },

    /// [`RunConfig::max_steps`] instructions were executed.
    StepLimit,
}

/// Outcome of [`Cpu::run`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Instructions executed by this run, skipped ones included.
    pub steps: u64,
    pub reason: StopReason,
}

/// An ARM core and its current state.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cpu {
    state: ArchState,
    cycles: u64,
}

impl Cpu {
    #[must_use]
    pub fn new(entry: u32) -> Self {
        Self::from_state(ArchState::new(entry))
    }

    #[must_use]
    pub const fn from_state(state: ArchState) -> Self {
        Self { state, cycles: 0 }
    }

    #[must_use]
    pub const fn state(&self) -> &ArchState {
        &self.state
    }

    /// Instructions executed since the core was created.
    #[must_use]
    pub const fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Fetches and executes one instruction.
    ///
    /// Returns `Some` when a trap handler asked to halt.
    ///
    /// # Errors
    ///
    /// The [`Fault`] of the instruction, or a memory fault when the fetch
    /// itself fails. The state is left on the faulting instruction.
    pub fn step<M, T>(&mut self, memory: &mut M, traps: &mut T) -> Result<Option<StopReason>, Fault>
    where
        M: Memory,
        T: TrapHandler + ?Sized,
    {
        let pc = self.state.program_counter();
        let op_code = memory.fetch(pc).map_err(|source| Fault::Memory {
            address: pc,
            op_code: None,
            source,
        })?;

        let step = execute_one(&self.state, op_code, memory)?;
        self.state = step.state;
        self.cycles += 1;

        if let Outcome::SoftwareInterrupt(comment) = step.outcome {
            tracing::debug!("SWI 0x{comment:06X} at 0x{pc:08X}");
            if traps.software_interrupt(comment, &self.state) == TrapAction::Halt {
                return Ok(Some(StopReason::Halted { comment }));
            }
        }

        Ok(None)
    }

    /// Steps until a trap handler halts, a breakpoint is reached or the
    /// step limit runs out. A breakpoint on the very first instruction is
    /// ignored so that a run can resume from one.
    ///
    /// # Errors
    ///
    /// The first [`Fault`], see [`Cpu::step`].
    pub fn run<M, T>(
        &mut self,
        memory: &mut M,
        traps: &mut T,
        config: &RunConfig,
    ) -> Result<RunSummary, Fault>
    where
        M: Memory,
        T: TrapHandler + ?Sized,
    {
        let mut steps = 0;

        loop {
            if config.max_steps.is_some_and(|max| steps >= max) {
                return Ok(RunSummary {
                    steps,
                    reason: StopReason::StepLimit,
                });
            }

            let pc = self.state.program_counter();
            if steps > 0 && config.breakpoints.contains(&pc) {
                tracing::info!("breakpoint at 0x{pc:08X}");
                return Ok(RunSummary {
                    steps,
                    reason: StopReason::Breakpoint { address: pc },
                });
            }

            let stop = self.step(memory, traps)?;
            steps += 1;

            if let Some(reason) = stop {
                return Ok(RunSummary { steps, reason });
            }
        }
    }
}
