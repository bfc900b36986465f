use anyhow::Error;
use serde::{Deserialize, Serialize};

pub const NUM_REGISTERS: usize = 16;
/// Stack pointer register. The stack grows down from the top of memory.
pub const SP: usize = 14;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cpu {
    pub pc: u32,                    // Program Counter
    pub flags: i32,                 // Condition state for conditional jumps
    pub frame: u32,                 // Frame base, top of memory after reset
    pub regs: [u32; NUM_REGISTERS], // r0..r15, r14 = sp
}

#[derive(thiserror::Error, Debug)]
pub enum Trap {
    #[error("Invalid opcode {opcode} at {pc:#x}")]
    InvalidOpcode { pc: u32, opcode: u8 },
    #[error("Bus error at {pc:#x} accessing {addr:#x}: {source}")]
    Bus {
        pc: u32,
        addr: u32,
        #[source]
        source: Error,
    },
    #[error("Register r{reg} out of range at {pc:#x}")]
    Register { pc: u32, reg: usize },
    #[error("Console I/O failed at {pc:#x}: {source}")]
    Io {
        pc: u32,
        #[source]
        source: Error,
    },
    #[error("Step limit of {limit} reached")]
    StepLimit { limit: u64 },
    #[error("Processor is {state:?} and cannot execute")]
    NotRunnable { state: crate::processor::State },
}

impl Cpu {
    pub fn new(memory_size: u32) -> Self {
        let mut cpu = Self {
            pc: 0,
            flags: 0,
            frame: 0,
            regs: [0; NUM_REGISTERS],
        };
        cpu.reset(0, memory_size);
        cpu
    }

    pub fn reset(&mut self, entry: u32, memory_size: u32) {
        self.pc = entry;
        self.flags = 0;
        self.frame = memory_size.wrapping_sub(1);
        self.regs = [0; NUM_REGISTERS];
        self.regs[SP] = memory_size;
    }

    pub fn sp(&self) -> u32 {
        self.regs[SP]
    }

    /// Checked register read; `pc` is the faulting instruction address.
    pub fn reg(&self, idx: usize, pc: u32) -> Result<u32, Trap> {
        self.regs
            .get(idx)
            .copied()
            .ok_or(Trap::Register { pc, reg: idx })
    }

    pub fn set_reg(&mut self, idx: usize, val: u32, pc: u32) -> Result<(), Trap> {
        let slot = self
            .regs
            .get_mut(idx)
            .ok_or(Trap::Register { pc, reg: idx })?;
        *slot = val;
        Ok(())
    }
}
