use std::borrow::Cow;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::decoder::{decode_operands, opcode_of, Decoded, Decoder, Format, Op};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstrDesc {
    pub op: Op,
    pub mnemonic: Cow<'static, str>,
    pub opcode: u8,
}

impl InstrDesc {
    pub fn format(&self) -> Format {
        self.op.format()
    }
}

const fn desc(op: Op, mnemonic: &'static str, opcode: u8) -> InstrDesc {
    InstrDesc {
        op,
        mnemonic: Cow::Borrowed(mnemonic),
        opcode,
    }
}

pub const TABLE: &[InstrDesc] = &[
    desc(Op::Syscall, "syscall", 1),
    desc(Op::Addi, "addi", 3),
    desc(Op::Mul, "mul", 6),
    desc(Op::Lc, "lc", 12),
    desc(Op::Mov, "mov", 24),
    desc(Op::Push, "push", 38),
    desc(Op::Pop, "pop", 39),
    desc(Op::Calli, "calli", 41),
    desc(Op::Ret, "ret", 42),
    desc(Op::Jmp, "jmp", 46),
    desc(Op::Jne, "jne", 47),
    desc(Op::Jeq, "jeq", 48),
    desc(Op::Jle, "jle", 49),
    desc(Op::Jl, "jl", 50),
    desc(Op::Jge, "jge", 51),
    desc(Op::Jg, "jg", 52),
    desc(Op::Loadr, "loadr", 68),
];

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum TableError {
    #[error("mnemonic `{0}` bound twice")]
    DuplicateMnemonic(String),
    #[error("opcode {0} bound twice")]
    DuplicateOpcode(u8),
    #[error("`{0}` is an assembler directive, not a mnemonic")]
    ReservedMnemonic(String),
}

/// Directive keywords the assembler claims before looking up mnemonics.
pub const RESERVED: &[&str] = &["end", "word"];

/// Both lookups over one instruction set: mnemonic for the assembler,
/// opcode for dispatch.
#[derive(Debug, Clone)]
pub struct CommandTable {
    descs: Vec<InstrDesc>,
    by_mnemonic: HashMap<String, usize>,
    by_opcode: HashMap<u8, usize>,
}

impl CommandTable {
    pub fn new(descs: Vec<InstrDesc>) -> Result<Self, TableError> {
        let mut by_mnemonic = HashMap::with_capacity(descs.len());
        let mut by_opcode = HashMap::with_capacity(descs.len());
        for (i, d) in descs.iter().enumerate() {
            let key = d.mnemonic.to_ascii_lowercase();
            if RESERVED.contains(&key.as_str()) {
                return Err(TableError::ReservedMnemonic(d.mnemonic.to_string()));
            }
            if by_mnemonic.insert(key, i).is_some() {
                return Err(TableError::DuplicateMnemonic(d.mnemonic.to_string()));
            }
            if by_opcode.insert(d.opcode, i).is_some() {
                return Err(TableError::DuplicateOpcode(d.opcode));
            }
        }
        Ok(Self {
            descs,
            by_mnemonic,
            by_opcode,
        })
    }

    /// Case-insensitive.
    pub fn by_mnemonic(&self, mnemonic: &str) -> Option<&InstrDesc> {
        self.by_mnemonic
            .get(&mnemonic.to_ascii_lowercase())
            .map(|&i| &self.descs[i])
    }

    pub fn by_opcode(&self, opcode: u8) -> Option<&InstrDesc> {
        self.by_opcode.get(&opcode).map(|&i| &self.descs[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &InstrDesc> {
        self.descs.iter()
    }
}

impl Default for CommandTable {
    fn default() -> Self {
        Self::new(TABLE.to_vec()).expect("built-in table has unique bindings")
    }
}

impl Decoder for CommandTable {
    fn decode(&self, word: u32) -> Option<Decoded> {
        let opcode = opcode_of(word);
        let d = self.by_opcode(opcode)?;
        Some(Decoded {
            op: d.op,
            opcode,
            operands: decode_operands(word, d.format()),
        })
    }
}
