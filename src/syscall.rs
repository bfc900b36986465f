use std::io::{BufRead, Write};

use anyhow::{anyhow, bail, Result};
use serde::{Deserialize, Serialize};

/// Numeric codes carried in the immediate of a `syscall` instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyscallCodes {
    pub exit: i32,
    pub scan_int: i32,
    pub print_int: i32,
    pub get_char: i32,
    pub put_char: i32,
}

impl Default for SyscallCodes {
    fn default() -> Self {
        Self {
            exit: 0,
            scan_int: 100,
            print_int: 102,
            get_char: 104,
            put_char: 105,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Syscall {
    Exit,
    ScanInt,
    PrintInt,
    GetChar,
    PutChar,
}

impl SyscallCodes {
    pub fn resolve(&self, code: i32) -> Option<Syscall> {
        match code {
            c if c == self.exit => Some(Syscall::Exit),
            c if c == self.scan_int => Some(Syscall::ScanInt),
            c if c == self.print_int => Some(Syscall::PrintInt),
            c if c == self.get_char => Some(Syscall::GetChar),
            c if c == self.put_char => Some(Syscall::PutChar),
            _ => None,
        }
    }
}

/// Character and integer I/O used by the syscall handler.
pub trait Console {
    fn read_int(&mut self) -> Result<i32>;
    /// `None` at end of input.
    fn read_char(&mut self) -> Result<Option<u8>>;
    fn print_int(&mut self, val: i32) -> Result<()>;
    fn write_char(&mut self, ch: u8) -> Result<()>;
}

pub struct StreamConsole<R, W> {
    input: R,
    output: W,
}

pub type StdConsole = StreamConsole<std::io::StdinLock<'static>, std::io::Stdout>;

impl StdConsole {
    pub fn stdio() -> Self {
        StreamConsole::new(std::io::stdin().lock(), std::io::stdout())
    }
}

impl<R: BufRead, W: Write> StreamConsole<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    pub fn output(&self) -> &W {
        &self.output
    }

    pub fn into_parts(self) -> (R, W) {
        (self.input, self.output)
    }

    fn peek(&mut self) -> Result<Option<u8>> {
        Ok(self.input.fill_buf()?.first().copied())
    }
}

impl<R: BufRead, W: Write> Console for StreamConsole<R, W> {
    fn read_int(&mut self) -> Result<i32> {
        while let Some(b) = self.peek()? {
            if !b.is_ascii_whitespace() {
                break;
            }
            self.input.consume(1);
        }
        let mut token = String::new();
        while let Some(b) = self.peek()? {
            if b.is_ascii_whitespace() {
                break;
            }
            token.push(b as char);
            self.input.consume(1);
        }
        if token.is_empty() {
            bail!("end of input while reading an integer");
        }
        token
            .parse::<i32>()
            .map_err(|e| anyhow!("bad integer input `{token}`: {e}"))
    }

    fn read_char(&mut self) -> Result<Option<u8>> {
        let b = self.peek()?;
        if b.is_some() {
            self.input.consume(1);
        }
        Ok(b)
    }

    fn print_int(&mut self, val: i32) -> Result<()> {
        write!(self.output, "{val}")?;
        self.output.flush()?;
        Ok(())
    }

    fn write_char(&mut self, ch: u8) -> Result<()> {
        self.output.write_all(&[ch])?;
        self.output.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_int_skips_whitespace_and_stops_at_separator() {
        let mut con = StreamConsole::new(&b"  -42\n17 x"[..], Vec::new());
        assert_eq!(con.read_int().unwrap(), -42);
        assert_eq!(con.read_char().unwrap(), Some(b'\n'));
        assert_eq!(con.read_int().unwrap(), 17);
        assert!(con.read_int().is_err());
    }

    #[test]
    fn read_char_reports_end_of_input() {
        let mut con = StreamConsole::new(&b"a"[..], Vec::new());
        assert_eq!(con.read_char().unwrap(), Some(b'a'));
        assert_eq!(con.read_char().unwrap(), None);
    }

    #[test]
    fn resolve_uses_configured_codes() {
        let codes = SyscallCodes {
            print_int: 7,
            ..SyscallCodes::default()
        };
        assert_eq!(codes.resolve(7), Some(Syscall::PrintInt));
        assert_eq!(codes.resolve(102), None);
        assert_eq!(codes.resolve(0), Some(Syscall::Exit));
    }
}
