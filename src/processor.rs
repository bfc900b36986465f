use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace};

use crate::config::MachineConfig;
use crate::cpu::{Cpu, Trap};
use crate::decoder::{opcode_of, Decoder};
use crate::disasm::fmt_decoded;
use crate::exec::{Env, Executor, HaltReason, IntExecutor, Step};
use crate::instructions::{CommandTable, TableError};
use crate::memory::{Bus, WordMemory};
use crate::syscall::{Console, StdConsole, SyscallCodes};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum State {
    /// Program loaded, nothing executed yet.
    Ready,
    Running,
    Halted,
    Faulted,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    #[error("program image is empty (missing entry word)")]
    Empty,
    #[error("program of {len} words does not fit in {size} words of memory")]
    TooLarge { len: usize, size: u32 },
    #[error("entry point {entry:#x} outside memory of {size:#x} words")]
    EntryOutOfRange { entry: u32, size: u32 },
}

/// Owns the register file, memory and console, and runs programs on them.
pub struct Processor<C = StdConsole, B = WordMemory, X = IntExecutor> {
    cpu: Cpu,
    bus: B,
    console: C,
    table: CommandTable,
    syscalls: SyscallCodes,
    exec: X,
    state: State,
    steps: u64,
}

impl<C: Console> Processor<C> {
    pub fn new(cfg: &MachineConfig, console: C) -> Result<Self, TableError> {
        Ok(Self::with_parts(
            WordMemory::new(cfg.memory_size),
            console,
            cfg.command_table()?,
            cfg.syscalls,
            IntExecutor,
        ))
    }
}

impl<C: Console, B: Bus, X: Executor> Processor<C, B, X> {
    pub fn with_parts(
        mut bus: B,
        console: C,
        table: CommandTable,
        syscalls: SyscallCodes,
        exec: X,
    ) -> Self {
        bus.clear();
        Self {
            cpu: Cpu::new(bus.size()),
            bus,
            console,
            table,
            syscalls,
            exec,
            state: State::Ready,
            steps: 0,
        }
    }

    /// Resets all machine state, then copies `program[1..]` to address 0 and
    /// points the program counter at `program[0]`.
    pub fn load_program(&mut self, program: &[u32]) -> Result<(), LoadError> {
        let size = self.bus.size();
        let (&entry, image) = program.split_first().ok_or(LoadError::Empty)?;
        if image.len() > size as usize {
            return Err(LoadError::TooLarge {
                len: image.len(),
                size,
            });
        }
        if entry >= size {
            return Err(LoadError::EntryOutOfRange { entry, size });
        }

        self.bus.clear();
        for (addr, &word) in image.iter().enumerate() {
            self.bus
                .write(addr as u32, word)
                .map_err(|_| LoadError::TooLarge {
                    len: image.len(),
                    size,
                })?;
        }
        self.cpu.reset(entry, size);
        self.state = State::Ready;
        self.steps = 0;
        debug!(entry, words = image.len(), "program loaded");
        Ok(())
    }

    /// Fetches, decodes and executes one instruction.
    pub fn exec(&mut self) -> Result<Step, Trap> {
        match self.state {
            State::Ready | State::Running => {}
            state => return Err(Trap::NotRunnable { state }),
        }
        match self.step() {
            Ok(step) => {
                self.steps += 1;
                self.state = match step {
                    Step::Continue => State::Running,
                    Step::Halt(reason) => {
                        info!(?reason, steps = self.steps, "halted");
                        State::Halted
                    }
                };
                Ok(step)
            }
            Err(trap) => {
                debug!(%trap, "faulted");
                self.state = State::Faulted;
                Err(trap)
            }
        }
    }

    fn step(&mut self) -> Result<Step, Trap> {
        let pc = self.cpu.pc;
        let word = self
            .bus
            .read(pc)
            .map_err(|source| Trap::Bus { pc, addr: pc, source })?;
        self.cpu.pc = pc.wrapping_add(1);
        let d = self.table.decode(word).ok_or(Trap::InvalidOpcode {
            pc,
            opcode: opcode_of(word),
        })?;
        trace!(pc, word = %format!("{word:#010x}"), insn = %fmt_decoded(&d, &self.table));
        let env = Env {
            bus: &mut self.bus,
            console: &mut self.console,
            syscalls: &self.syscalls,
        };
        self.exec.exec(&mut self.cpu, env, pc, d)
    }

    /// Runs until the program halts or faults.
    pub fn run(&mut self) -> Result<HaltReason, Trap> {
        loop {
            if let Step::Halt(reason) = self.exec()? {
                return Ok(reason);
            }
        }
    }

    /// Like [`run`](Self::run), but faults after `max_steps` instructions.
    pub fn run_with_limit(&mut self, max_steps: u64) -> Result<HaltReason, Trap> {
        for _ in 0..max_steps {
            if let Step::Halt(reason) = self.exec()? {
                return Ok(reason);
            }
        }
        self.state = State::Faulted;
        Err(Trap::StepLimit { limit: max_steps })
    }

    pub fn cpu(&self) -> &Cpu {
        &self.cpu
    }

    pub fn memory(&self) -> &B {
        &self.bus
    }

    pub fn console(&self) -> &C {
        &self.console
    }

    pub fn console_mut(&mut self) -> &mut C {
        &mut self.console
    }

    pub fn table(&self) -> &CommandTable {
        &self.table
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn flags(&self) -> i32 {
        self.cpu.flags
    }

    /// The default instruction set has no flag producer; comparison
    /// instructions supplied elsewhere set the condition through here.
    pub fn set_flags(&mut self, flags: i32) {
        self.cpu.flags = flags;
    }
}
