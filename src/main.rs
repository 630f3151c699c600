mod loader;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use serde::Serialize;
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

use emu::cpu::arm::instructions::{Instruction, Opcode};
use emu::cpu::arm_cpu::{Cpu, HaltOnSwi, RunConfig, RunSummary, StopReason};
use emu::cpu::registers::REG_SP;
use emu::cpu::state::ArchState;
use emu::memory::flat_memory::FlatMemory;

use crate::loader::{ProgramFormat, load_program, parse_u32};

const EXIT_CONFIG_ERROR: u8 = 1;
const EXIT_FAULT: u8 = 2;
const EXIT_STEP_LIMIT: u8 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum DumpFormat {
    Text,
    Json,
    None,
}

#[derive(Parser, Debug)]
#[command(author, version, about = "ARMv4 instruction-level simulator", long_about = None)]
struct Cli {
    /// Program image to load
    program: PathBuf,

    /// Format of the program image
    #[arg(short, long, value_enum, default_value = "hex")]
    format: ProgramFormat,

    /// Address the image is loaded at, also the start of memory
    #[arg(long, value_parser = parse_u32, default_value = "0")]
    base: u32,

    /// First instruction to execute (default: the load address)
    #[arg(long, value_parser = parse_u32)]
    entry: Option<u32>,

    /// Size of memory in bytes. SP starts at its top.
    #[arg(long, value_parser = parse_u32, default_value = "0x10000")]
    memory_size: u32,

    /// Maximum number of instructions to execute
    #[arg(long)]
    max_steps: Option<u64>,

    /// Breakpoint PC address (repeatable)
    #[arg(long, value_parser = parse_u32)]
    breakpoint: Vec<u32>,

    /// How to print the registers and flags once the run stops
    #[arg(long, value_enum, default_value = "text")]
    dump: DumpFormat,

    /// Print the disassembly of the image instead of running it
    #[arg(long)]
    disassemble: bool,

    /// Log every executed instruction (overrides RUST_LOG)
    #[arg(short, long)]
    trace: bool,

    /// Also write the log to this file
    #[arg(long)]
    log_file: Option<PathBuf>,
}

/// What `--dump json` prints.
#[derive(Serialize)]
struct Report<'a> {
    state: &'a ArchState,
    flags: String,
    steps: u64,
    stop: Option<StopReason>,
    fault: Option<String>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let _guard = match init_tracing(cli.trace, cli.log_file.as_deref()) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("{e:#}");
            return ExitCode::from(EXIT_CONFIG_ERROR);
        }
    };

    match run(&cli) {
        Ok(code) => code,
        Err(e) => {
            error!("{e:#}");
            ExitCode::from(EXIT_CONFIG_ERROR)
        }
    }
}

/// Logs go to stderr, and to `log_file` through a non-blocking writer. The
/// returned guard flushes the file when dropped.
fn init_tracing(trace: bool, log_file: Option<&Path>) -> anyhow::Result<Option<WorkerGuard>> {
    let filter = if trace {
        EnvFilter::new("trace")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    let stderr = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    let Some(path) = log_file else {
        tracing_subscriber::registry()
            .with(filter)
            .with(stderr)
            .try_init()?;
        return Ok(None);
    };

    let file_name = path
        .file_name()
        .with_context(|| format!("{} is not a file path", path.display()))?;
    let directory = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let (writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::never(directory, file_name));
    let file = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_writer(writer);

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr)
        .with(file)
        .try_init()?;

    Ok(Some(guard))
}

fn run(cli: &Cli) -> anyhow::Result<ExitCode> {
    let image = load_program(&cli.program, cli.format)?;

    if cli.disassemble {
        print_disassembly(cli.base, &image);
        return Ok(ExitCode::SUCCESS);
    }

    let mut memory = FlatMemory::new(cli.base, cli.memory_size as usize);
    memory
        .write_bytes(cli.base, &image)
        .context("program does not fit in memory")?;

    let entry = cli.entry.unwrap_or(cli.base);
    let mut state = ArchState::new(entry);
    state
        .registers
        .set_register_at(REG_SP, cli.base.wrapping_add(cli.memory_size));

    info!(
        "loaded {} bytes at 0x{:08X}, entry 0x{entry:08X}",
        image.len(),
        cli.base
    );

    let mut cpu = Cpu::from_state(state);
    let config = RunConfig {
        max_steps: cli.max_steps,
        breakpoints: cli.breakpoint.clone(),
    };

    let (code, summary, fault) = match cpu.run(&mut memory, &mut HaltOnSwi, &config) {
        Ok(summary) => {
            info!("stopped after {} steps: {:?}", summary.steps, summary.reason);
            let code = match summary.reason {
                StopReason::StepLimit => {
                    warn!("step limit reached");
                    ExitCode::from(EXIT_STEP_LIMIT)
                }
                StopReason::Halted { .. } | StopReason::Breakpoint { .. } => ExitCode::SUCCESS,
            };
            (code, Some(summary), None)
        }
        Err(fault) => {
            error!("{fault}");
            (ExitCode::from(EXIT_FAULT), None, Some(fault.to_string()))
        }
    };

    dump(cli.dump, cpu.state(), cpu.cycles(), summary, fault)?;

    Ok(code)
}

fn print_disassembly(base: u32, image: &[u8]) {
    for (idx, chunk) in image.chunks(4).enumerate() {
        let mut bytes = [0; 4];
        bytes[..chunk.len()].copy_from_slice(chunk);
        let op_code = u32::from_le_bytes(bytes);
        let address = base.wrapping_add((idx * 4) as u32);

        match Instruction::try_from(op_code) {
            Ok(instruction) if matches!(instruction.opcode, Opcode::B | Opcode::Bl) => {
                let target = address
                    .wrapping_add(8)
                    .wrapping_add(instruction.decoded.branch_offset());
                println!("0x{address:08X}: {op_code:08X}  {instruction}  ; 0x{target:08X}");
            }
            Ok(instruction) => println!("0x{address:08X}: {op_code:08X}  {instruction}"),
            Err(e) => println!("0x{address:08X}: {op_code:08X}  <{}>", e.at(address, op_code)),
        }
    }
}

fn dump(
    format: DumpFormat,
    state: &ArchState,
    steps: u64,
    summary: Option<RunSummary>,
    fault: Option<String>,
) -> anyhow::Result<()> {
    match format {
        DumpFormat::None => {}
        DumpFormat::Text => println!("{state}"),
        DumpFormat::Json => {
            let report = Report {
                state,
                flags: state.cpsr.flags().to_string(),
                steps,
                stop: summary.map(|s| s.reason),
                fault,
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}
