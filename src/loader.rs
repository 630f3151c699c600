//! Reads a program image from disk.
//!
//! Two formats are accepted:
//!
//! - `hex`: one 32-bit word per line, with or without a `0x` prefix.
//!   Anything after `#` or `;` is a comment, blank lines are ignored.
//! - `bin`: raw little-endian bytes, copied as they are.

use std::path::Path;

use anyhow::{Context, bail};
use clap::ValueEnum;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ProgramFormat {
    Hex,
    Bin,
}

/// Loads `path` and returns its bytes in memory order.
pub fn load_program(path: &Path, format: ProgramFormat) -> anyhow::Result<Vec<u8>> {
    match format {
        ProgramFormat::Bin => {
            std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))
        }
        ProgramFormat::Hex => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            let words = parse_hex(&text).with_context(|| format!("in {}", path.display()))?;
            Ok(words.iter().flat_map(|w| w.to_le_bytes()).collect())
        }
    }
}

/// Parses the `hex` format into words.
pub fn parse_hex(text: &str) -> anyhow::Result<Vec<u32>> {
    let mut words = Vec::new();

    for (idx, line) in text.lines().enumerate() {
        let line = line
            .split(['#', ';'])
            .next()
            .unwrap_or_default()
            .trim();
        if line.is_empty() {
            continue;
        }

        let digits = line
            .strip_prefix("0x")
            .or_else(|| line.strip_prefix("0X"))
            .unwrap_or(line)
            .replace('_', "");
        if digits.len() > 8 {
            bail!("line {}: '{line}' does not fit in 32 bits", idx + 1);
        }

        let word = u32::from_str_radix(&digits, 16)
            .with_context(|| format!("line {}: '{line}' is not a hex word", idx + 1))?;
        words.push(word);
    }

    Ok(words)
}

/// Accepts `0x`-prefixed hex or plain decimal.
pub fn parse_u32(s: &str) -> Result<u32, String> {
    let trimmed = s.trim();
    if let Some(hex) = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        u32::from_str_radix(hex, 16).map_err(|e| format!("invalid hex value '{s}': {e}"))
    } else {
        trimmed
            .parse()
            .map_err(|e| format!("invalid value '{s}': {e}"))
    }
}
