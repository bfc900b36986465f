pub mod config;
pub mod cpu;
pub mod decoder;
pub mod disasm;
pub mod exec;
pub mod image;
pub mod instructions;
pub mod memory;
pub mod parser;
pub mod processor;
pub mod syscall;

pub use config::MachineConfig;
pub use cpu::{Cpu, Trap, SP};
pub use exec::{HaltReason, Step};
pub use instructions::CommandTable;
pub use memory::{Bus, WordMemory};
pub use parser::{ParseError, Parser};
pub use processor::{LoadError, Processor, State};
pub use syscall::{Console, StdConsole, StreamConsole};
