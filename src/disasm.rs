use crate::decoder::{Decoded, Decoder, Operands};
use crate::instructions::CommandTable;

/// Renders `d` in the assembler's own syntax.
pub fn fmt_decoded(d: &Decoded, table: &CommandTable) -> String {
    let mn = table
        .by_opcode(d.opcode)
        .map(|desc| &*desc.mnemonic)
        .unwrap_or("?");
    match d.operands {
        Operands::Ri { reg, value } => format!("{mn} r{reg} {value}"),
        Operands::Rm { reg: 0, value } => format!("{mn} {value}"),
        Operands::Rm { reg, value } => format!("{mn} r{reg} {value}"),
        Operands::Rr {
            in_reg,
            out_reg,
            value,
        } => format!("{mn} r{in_reg} r{out_reg} {value}"),
    }
}

/// Words with no registered opcode come out as `word` directives, so the
/// listing always reassembles to the same image.
pub fn fmt_word(word: u32, table: &CommandTable) -> String {
    match table.decode(word) {
        Some(d) => fmt_decoded(&d, table),
        None => format!("word {word:#010x}"),
    }
}

/// One line per word; address and raw word trail as a comment so the
/// listing still assembles.
pub fn listing(words: &[u32], table: &CommandTable) -> String {
    let mut out = String::new();
    for (addr, &w) in words.iter().enumerate() {
        let text = fmt_word(w, table);
        out.push_str(&format!("{text:<24}; {addr:#07x}  {w:#010x}\n"));
    }
    out
}
