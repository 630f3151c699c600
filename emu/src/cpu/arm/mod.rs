//! # ARM Instruction Set (32-bit)
//!
//! Every instruction is conditional and goes through the same pipeline:
//!
//! ```text
//! word ─► fields ─► condition gate ─► instructions ─► shifter ─► operations ─► commit
//! ```
//!
//! ## Instruction Categories
//!
//! | Bits 27-25 | Category              | Examples                    |
//! |------------|-----------------------|-----------------------------|
//! | 00x        | Data Processing       | AND, ADD, CMP, MOV, LSL     |
//! | 000        | Multiply              | MUL, MLA                    |
//! | 01x        | Single Data Transfer  | LDR, STR, LDRB, STRB        |
//! | 101        | Branch                | B, BL                       |
//! | 1111       | Software Interrupt    | SWI                         |
//!
//! ## Submodules
//!
//! - [`fields`] - Field decoder
//! - [`instructions`] - Opcode classification and disassembly
//! - [`shifter`] - Barrel shifter
//! - [`alu`] - Adder and flag results
//! - [`operations`] - Dispatch table and handlers

pub mod alu;

#[cfg(test)]
pub(crate) mod asm;

#[allow(clippy::cast_possible_truncation)]
pub mod fields;

#[allow(clippy::similar_names)]
#[allow(clippy::cast_possible_wrap)]
pub mod instructions;

#[allow(clippy::similar_names)]
pub mod operations;

#[allow(clippy::cast_possible_truncation)]
#[allow(clippy::cast_sign_loss)]
#[allow(clippy::cast_possible_wrap)]
pub mod shifter;
