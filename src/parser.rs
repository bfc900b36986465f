//! Line-oriented assembler.
//!
//! Each instruction line becomes exactly one word. Besides mnemonics the
//! source may contain:
//!
//! * `; comment` to end of line,
//! * `name:` labels, alone or in front of an instruction,
//! * `end <target>` naming the entry point (default 0),
//! * `word <number>` for a raw data word.
//!
//! Operands are separated by whitespace or commas. Registers are `r0`..`r15`
//! (`sp` is `r14`); numbers are decimal or `0x` hex with an optional `-`.

use std::collections::HashMap;

use tracing::debug;

use crate::cpu::SP;
use crate::decoder::{
    encode, FieldError, Format, Operands, REG_MAX, RI_MAX, RI_MIN, RM_MAX, RR_MAX, RR_MIN,
};
use crate::instructions::CommandTable;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("line {line}: {kind}")]
pub struct ParseError {
    /// 1-based
    pub line: usize,
    pub kind: ParseErrorKind,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseErrorKind {
    #[error("unknown mnemonic `{0}`")]
    UnknownMnemonic(String),
    #[error(transparent)]
    Field(#[from] FieldError),
    #[error("bad register `{0}`")]
    BadRegister(String),
    #[error("bad number `{0}`")]
    BadNumber(String),
    #[error("`{mnemonic}` takes {expected} operand(s), found {found}")]
    OperandCount {
        mnemonic: String,
        expected: &'static str,
        found: usize,
    },
    #[error("undefined label `{0}`")]
    UndefinedLabel(String),
    #[error("label `{0}` defined twice")]
    DuplicateLabel(String),
    #[error("bad label `{0}`")]
    BadLabel(String),
    #[error("entry point declared twice")]
    DuplicateEntry,
}

type Kind = ParseErrorKind;

/// A line that emits one word, kept until every label is known.
enum Item {
    Instr {
        line: usize,
        mnemonic: String,
        opcode: u8,
        format: Format,
        args: Vec<String>,
    },
    Word {
        value: u32,
    },
}

pub struct Parser<'t> {
    table: &'t CommandTable,
}

impl<'t> Parser<'t> {
    pub fn new(table: &'t CommandTable) -> Self {
        Self { table }
    }

    pub fn parse_source(&self, source: &str) -> Result<Vec<u32>, ParseError> {
        self.parse_program(source.lines())
    }

    /// Returns `[entry, word0, word1, ...]`, ready for `Processor::load_program`.
    pub fn parse_program<I, S>(&self, lines: I) -> Result<Vec<u32>, ParseError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut items = Vec::new();
        let mut labels: HashMap<String, u32> = HashMap::new();
        let mut entry: Option<(usize, String)> = None;

        for (idx, raw) in lines.into_iter().enumerate() {
            let line = idx + 1;
            let err = |kind| ParseError { line, kind };

            let mut text = raw.as_ref();
            if let Some(p) = text.find(';') {
                text = &text[..p];
            }
            let mut text = text.trim();
            while let Some((head, rest)) = text.split_once(':') {
                let name = head.trim();
                if !is_label(name) {
                    return Err(err(Kind::BadLabel(name.to_string())));
                }
                if labels.insert(name.to_string(), items.len() as u32).is_some() {
                    return Err(err(Kind::DuplicateLabel(name.to_string())));
                }
                text = rest.trim();
            }
            if text.is_empty() {
                continue;
            }

            let mut tokens = text
                .split(|c: char| c.is_whitespace() || c == ',')
                .filter(|t| !t.is_empty());
            let head = tokens.next().unwrap_or_default();
            let args: Vec<String> = tokens.map(str::to_string).collect();

            match head.to_ascii_lowercase().as_str() {
                "end" => {
                    let [target] = args.as_slice() else {
                        return Err(err(count("end", "1", args.len())));
                    };
                    if entry.is_some() {
                        return Err(err(Kind::DuplicateEntry));
                    }
                    entry = Some((line, target.clone()));
                }
                "word" => {
                    let [v] = args.as_slice() else {
                        return Err(err(count("word", "1", args.len())));
                    };
                    let v = fit("word", parse_num(v).map_err(err)?, i32::MIN as i64, u32::MAX as i64)
                        .map_err(err)?;
                    items.push(Item::Word { value: v as u32 });
                }
                _ => {
                    let desc = self
                        .table
                        .by_mnemonic(head)
                        .ok_or_else(|| err(Kind::UnknownMnemonic(head.to_string())))?;
                    items.push(Item::Instr {
                        line,
                        mnemonic: desc.mnemonic.to_string(),
                        opcode: desc.opcode,
                        format: desc.format(),
                        args,
                    });
                }
            }
        }

        let entry = match entry {
            Some((line, target)) => resolve_target(&target, &labels, "entry")
                .map_err(|kind| ParseError { line, kind })?,
            None => 0,
        };

        let mut program = Vec::with_capacity(items.len() + 1);
        program.push(entry);
        for item in &items {
            let word = match item {
                Item::Word { value } => *value,
                Item::Instr {
                    line,
                    mnemonic,
                    opcode,
                    format,
                    args,
                } => encode_instr(mnemonic, *opcode, *format, args, &labels)
                    .map_err(|kind| ParseError { line: *line, kind })?,
            };
            program.push(word);
        }
        debug!(words = items.len(), labels = labels.len(), entry, "parsed program");
        Ok(program)
    }
}

fn count(mnemonic: &str, expected: &'static str, found: usize) -> Kind {
    Kind::OperandCount {
        mnemonic: mnemonic.to_string(),
        expected,
        found,
    }
}

fn encode_instr(
    mnemonic: &str,
    opcode: u8,
    format: Format,
    args: &[String],
    labels: &HashMap<String, u32>,
) -> Result<u32, Kind> {
    let operands = match (format, args) {
        (Format::Ri, [reg]) => Operands::Ri {
            reg: parse_reg(reg)?,
            value: 0,
        },
        (Format::Ri, [reg, value]) => Operands::Ri {
            reg: parse_reg(reg)?,
            value: fit("value", parse_num(value)?, RI_MIN, RI_MAX)? as i32,
        },
        (Format::Ri, _) => return Err(count(mnemonic, "1-2", args.len())),
        (Format::Rm, []) => Operands::Rm { reg: 0, value: 0 },
        (Format::Rm, [target]) => Operands::Rm {
            reg: 0,
            value: resolve_target(target, labels, "value")?,
        },
        (Format::Rm, [reg, target]) => Operands::Rm {
            reg: parse_reg(reg)?,
            value: resolve_target(target, labels, "value")?,
        },
        (Format::Rm, _) => return Err(count(mnemonic, "0-2", args.len())),
        (Format::Rr, [in_reg, out_reg]) => Operands::Rr {
            in_reg: parse_reg(in_reg)?,
            out_reg: parse_reg(out_reg)?,
            value: 0,
        },
        (Format::Rr, [in_reg, out_reg, value]) => Operands::Rr {
            in_reg: parse_reg(in_reg)?,
            out_reg: parse_reg(out_reg)?,
            value: fit("value", parse_num(value)?, RR_MIN, RR_MAX)? as i32,
        },
        (Format::Rr, _) => return Err(count(mnemonic, "2-3", args.len())),
    };
    Ok(encode(opcode, &operands)?)
}

fn fit(field: &'static str, value: i64, min: i64, max: i64) -> Result<i64, Kind> {
    if value < min || value > max {
        return Err(FieldError {
            field,
            value,
            min,
            max,
        }
        .into());
    }
    Ok(value)
}

/// A number, or a label defined anywhere in the program.
fn resolve_target(
    tok: &str,
    labels: &HashMap<String, u32>,
    field: &'static str,
) -> Result<u32, Kind> {
    let value = if tok.starts_with(|c: char| c.is_ascii_digit() || c == '-' || c == '+') {
        parse_num(tok)?
    } else if is_label(tok) {
        *labels
            .get(tok)
            .ok_or_else(|| Kind::UndefinedLabel(tok.to_string()))? as i64
    } else {
        return Err(Kind::BadLabel(tok.to_string()));
    };
    Ok(fit(field, value, 0, RM_MAX)? as u32)
}

fn parse_reg(tok: &str) -> Result<u8, Kind> {
    let bad = || Kind::BadRegister(tok.to_string());
    if tok.eq_ignore_ascii_case("sp") {
        return Ok(SP as u8);
    }
    let n = tok.strip_prefix(['r', 'R']).ok_or_else(bad)?;
    // plain decimal, no sign or leading zero
    if n.is_empty()
        || !n.bytes().all(|b| b.is_ascii_digit())
        || (n.len() > 1 && n.starts_with('0'))
    {
        return Err(bad());
    }
    let idx = n.parse::<u8>().map_err(|_| bad())?;
    if idx as i64 > REG_MAX {
        return Err(bad());
    }
    Ok(idx)
}

fn parse_num(tok: &str) -> Result<i64, Kind> {
    let bad = || Kind::BadNumber(tok.to_string());
    let (neg, digits) = match tok.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, tok.strip_prefix('+').unwrap_or(tok)),
    };
    let (radix, body) = match digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        Some(hex) => (16, hex),
        None => (10, digits),
    };
    if body.is_empty() || !body.chars().all(|c| c.is_digit(radix)) {
        return Err(bad());
    }
    let magnitude = i64::from_str_radix(body, radix).map_err(|_| bad())?;
    Ok(if neg { -magnitude } else { magnitude })
}

fn is_label(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    (first.is_ascii_alphabetic() || first == '_' || first == '.')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
        && parse_reg(name).is_err()
}
