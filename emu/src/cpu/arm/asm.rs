//! Encoders for building instruction words in tests.

pub const EQ: u32 = 0x0;
pub const NE: u32 = 0x1;
pub const AL: u32 = 0xE;
pub const NV: u32 = 0xF;

pub const AND: u32 = 0x0;
pub const EOR: u32 = 0x1;
pub const SUB: u32 = 0x2;
pub const RSB: u32 = 0x3;
pub const ADD: u32 = 0x4;
pub const ADC: u32 = 0x5;
pub const SBC: u32 = 0x6;
pub const RSC: u32 = 0x7;
pub const TST: u32 = 0x8;
pub const TEQ: u32 = 0x9;
pub const CMP: u32 = 0xA;
pub const CMN: u32 = 0xB;
pub const ORR: u32 = 0xC;
pub const MOV: u32 = 0xD;
pub const BIC: u32 = 0xE;
pub const MVN: u32 = 0xF;

pub const LSL: u32 = 0b00;
pub const LSR: u32 = 0b01;
pub const ASR: u32 = 0b10;
pub const ROR: u32 = 0b11;

/// Data processing with a register operand 2 (I=0).
pub const fn data_processing(cond: u32, cmd: u32, s: bool, rd: u32, rn: u32, op2: u32) -> u32 {
    (cond << 28) | (cmd << 21) | ((s as u32) << 20) | (rd << 16) | (rn << 12) | (op2 & 0xFFF)
}

/// Data processing with a rotated 8-bit immediate (I=1).
pub const fn data_processing_immediate(
    cond: u32,
    cmd: u32,
    s: bool,
    rd: u32,
    rn: u32,
    rotate: u32,
    imm8: u32,
) -> u32 {
    data_processing(cond, cmd, s, rd, rn, imm(rotate, imm8)) | (1 << 25)
}

pub const fn reg(rm: u32) -> u32 {
    rm
}

pub const fn imm(rotate: u32, imm8: u32) -> u32 {
    (rotate << 8) | (imm8 & 0xFF)
}

pub const fn shift_imm(rm: u32, kind: u32, amount: u32) -> u32 {
    (amount << 7) | (kind << 5) | rm
}

pub const fn shift_reg(rm: u32, kind: u32, rs: u32) -> u32 {
    (rs << 8) | (kind << 5) | (1 << 4) | rm
}

pub const fn branch(cond: u32, link: bool, imm24: u32) -> u32 {
    (cond << 28) | (0b101 << 25) | ((link as u32) << 24) | (imm24 & 0x00FF_FFFF)
}

/// Pre-indexed LDR/STR/LDRB/STRB with a 12-bit immediate offset.
pub const fn transfer(
    cond: u32,
    load: bool,
    byte: bool,
    up: bool,
    rd: u32,
    rn: u32,
    offset: u32,
) -> u32 {
    (cond << 28)
        | (0b01 << 26)
        | (1 << 24)
        | ((up as u32) << 23)
        | ((byte as u32) << 22)
        | ((load as u32) << 20)
        | (rd << 16)
        | (rn << 12)
        | (offset & 0xFFF)
}

/// Pre-indexed LDR/STR/LDRB/STRB with a shifted register offset.
pub const fn transfer_register(
    cond: u32,
    load: bool,
    byte: bool,
    up: bool,
    rd: u32,
    rn: u32,
    op2: u32,
) -> u32 {
    transfer(cond, load, byte, up, rd, rn, op2) | (1 << 25)
}

pub const fn multiply(
    cond: u32,
    accumulate: bool,
    s: bool,
    rd: u32,
    rn: u32,
    rs: u32,
    rm: u32,
) -> u32 {
    (cond << 28)
        | ((accumulate as u32) << 21)
        | ((s as u32) << 20)
        | (rd << 16)
        | (rn << 12)
        | (rs << 8)
        | (0b1001 << 4)
        | rm
}

pub const fn swi(cond: u32, comment: u32) -> u32 {
    (cond << 28) | (0b1111 << 24) | (comment & 0x00FF_FFFF)
}
