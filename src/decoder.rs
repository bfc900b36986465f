use serde::{Deserialize, Serialize};

pub const OPCODE_SHIFT: u32 = 24;
pub const REG_SHIFT: u32 = 20;
pub const OUT_REG_SHIFT: u32 = 16;
pub const REG_MASK: u32 = 0xF;
pub const RI_MASK: u32 = 0xF_FFFF; // 20 bits
pub const RM_MASK: u32 = 0xF_FFFF; // 20 bits
pub const RR_MASK: u32 = 0xFFFF; // 16 bits

pub const RI_MIN: i64 = -(1 << 19);
pub const RI_MAX: i64 = (1 << 19) - 1;
pub const RM_MAX: i64 = (1 << 20) - 1;
pub const RR_MIN: i64 = -(1 << 15);
pub const RR_MAX: i64 = (1 << 15) - 1;
pub const REG_MAX: i64 = REG_MASK as i64;

/// Instruction word layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Format {
    /// register, signed 20-bit immediate
    Ri,
    /// register, unsigned 20-bit address
    Rm,
    /// two registers, signed 16-bit immediate
    Rr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Op {
    Addi,
    Lc,
    Push,
    Pop,
    Syscall,
    Calli,
    Jmp,
    Jne,
    Jeq,
    Jle,
    Jl,
    Jge,
    Jg,
    Ret,
    Mov,
    Mul,
    Loadr,
}

impl Op {
    pub fn format(self) -> Format {
        match self {
            Op::Addi | Op::Lc | Op::Push | Op::Pop | Op::Syscall => Format::Ri,
            Op::Calli
            | Op::Jmp
            | Op::Jne
            | Op::Jeq
            | Op::Jle
            | Op::Jl
            | Op::Jge
            | Op::Jg
            | Op::Ret => Format::Rm,
            Op::Mov | Op::Mul | Op::Loadr => Format::Rr,
        }
    }
}

/// Operand fields of one instruction word, by layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operands {
    Ri { reg: u8, value: i32 },
    Rm { reg: u8, value: u32 },
    Rr { in_reg: u8, out_reg: u8, value: i32 },
}

impl Operands {
    pub fn format(&self) -> Format {
        match self {
            Operands::Ri { .. } => Format::Ri,
            Operands::Rm { .. } => Format::Rm,
            Operands::Rr { .. } => Format::Rr,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decoded {
    pub op: Op,
    pub opcode: u8,
    pub operands: Operands,
}

pub trait Decoder {
    fn decode(&self, word: u32) -> Option<Decoded>;
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("`{field}` = {value} outside {min}..={max}")]
pub struct FieldError {
    pub field: &'static str,
    pub value: i64,
    pub min: i64,
    pub max: i64,
}

#[inline]
fn sign_ext(v: u32, bits: u32) -> i32 {
    let s = 32 - bits;
    ((v << s) as i32) >> s
}

pub fn opcode_of(word: u32) -> u8 {
    (word >> OPCODE_SHIFT) as u8
}

/// Splits the low 24 bits of `word` according to `format`. Total: every
/// word decodes.
pub fn decode_operands(word: u32, format: Format) -> Operands {
    let reg = ((word >> REG_SHIFT) & REG_MASK) as u8;
    match format {
        Format::Ri => Operands::Ri {
            reg,
            value: sign_ext(word & RI_MASK, 20),
        },
        Format::Rm => Operands::Rm {
            reg,
            value: word & RM_MASK,
        },
        Format::Rr => Operands::Rr {
            in_reg: reg,
            out_reg: ((word >> OUT_REG_SHIFT) & REG_MASK) as u8,
            value: sign_ext(word & RR_MASK, 16),
        },
    }
}

fn check(field: &'static str, value: i64, min: i64, max: i64) -> Result<(), FieldError> {
    if value < min || value > max {
        return Err(FieldError { field, value, min, max });
    }
    Ok(())
}

/// Packs `opcode` and `operands` into a word. Inverse of [`decode_operands`].
pub fn encode(opcode: u8, operands: &Operands) -> Result<u32, FieldError> {
    let op = (opcode as u32) << OPCODE_SHIFT;
    match *operands {
        Operands::Ri { reg, value } => {
            check("reg", reg as i64, 0, REG_MAX)?;
            check("value", value as i64, RI_MIN, RI_MAX)?;
            Ok(op | (reg as u32) << REG_SHIFT | (value as u32 & RI_MASK))
        }
        Operands::Rm { reg, value } => {
            check("reg", reg as i64, 0, REG_MAX)?;
            check("value", value as i64, 0, RM_MAX)?;
            Ok(op | (reg as u32) << REG_SHIFT | value)
        }
        Operands::Rr {
            in_reg,
            out_reg,
            value,
        } => {
            check("in_reg", in_reg as i64, 0, REG_MAX)?;
            check("out_reg", out_reg as i64, 0, REG_MAX)?;
            check("value", value as i64, RR_MIN, RR_MAX)?;
            Ok(op
                | (in_reg as u32) << REG_SHIFT
                | (out_reg as u32) << OUT_REG_SHIFT
                | (value as u32 & RR_MASK))
        }
    }
}
