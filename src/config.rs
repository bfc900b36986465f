use std::path::Path;

use anyhow::{ensure, Context, Result};
use serde::{Deserialize, Serialize};

use crate::instructions::{CommandTable, InstrDesc, TableError, TABLE};
use crate::syscall::SyscallCodes;

/// Words of memory; matches the reach of a 20-bit RM address.
pub const DEFAULT_MEMORY_SIZE: u32 = 1 << 20;

/// Static machine description consumed by the parser and the processor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MachineConfig {
    pub memory_size: u32,
    pub syscalls: SyscallCodes,
    pub commands: Vec<InstrDesc>,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            memory_size: DEFAULT_MEMORY_SIZE,
            syscalls: SyscallCodes::default(),
            commands: TABLE.to_vec(),
        }
    }
}

impl MachineConfig {
    pub fn from_json(text: &str) -> Result<Self> {
        let cfg: Self = serde_json::from_str(text)?;
        ensure!(cfg.memory_size > 0, "memory_size must be non-zero");
        cfg.command_table()?;
        Ok(cfg)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::from_json(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn command_table(&self) -> Result<CommandTable, TableError> {
        CommandTable::new(self.commands.clone())
    }
}
