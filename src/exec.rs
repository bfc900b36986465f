use tracing::warn;

use crate::cpu::{Cpu, Trap, SP};
use crate::decoder::{Decoded, Op, Operands};
use crate::memory::Bus;
use crate::syscall::{Console, Syscall, SyscallCodes};

/// Outcome of one executed instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Continue,
    Halt(HaltReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HaltReason {
    /// The program asked to exit.
    Exit,
    /// The program issued a syscall code nobody handles.
    UnknownSyscall(i32),
}

/// Everything a handler may touch besides the register file.
pub struct Env<'a, B, C> {
    pub bus: &'a mut B,
    pub console: &'a mut C,
    pub syscalls: &'a SyscallCodes,
}

pub trait Executor {
    /// `pc` is the address `d` was fetched from; `cpu.pc` already points past it.
    fn exec<B: Bus, C: Console>(
        &self,
        cpu: &mut Cpu,
        env: Env<'_, B, C>,
        pc: u32,
        d: Decoded,
    ) -> Result<Step, Trap>;
}

fn load<B: Bus>(bus: &B, addr: u32, pc: u32) -> Result<u32, Trap> {
    bus.read(addr).map_err(|source| Trap::Bus { pc, addr, source })
}

fn store<B: Bus>(bus: &mut B, addr: u32, val: u32, pc: u32) -> Result<(), Trap> {
    bus.write(addr, val)
        .map_err(|source| Trap::Bus { pc, addr, source })
}

/// Push the return address and transfer control to `target`.
fn call<B: Bus>(cpu: &mut Cpu, bus: &mut B, target: u32, pc: u32) -> Result<(), Trap> {
    cpu.regs[SP] = cpu.regs[SP].wrapping_sub(1);
    store(bus, cpu.regs[SP], cpu.pc, pc)?;
    cpu.pc = target;
    Ok(())
}

pub struct IntExecutor;

impl IntExecutor {
    fn exec_ri<B: Bus, C: Console>(
        cpu: &mut Cpu,
        env: Env<'_, B, C>,
        pc: u32,
        d: Decoded,
        reg: usize,
        value: i32,
    ) -> Result<Step, Trap> {
        let imm = value as u32;
        match d.op {
            Op::Addi => {
                let v = cpu.reg(reg, pc)?.wrapping_add(imm);
                cpu.set_reg(reg, v, pc)?;
            }
            Op::Lc => cpu.set_reg(reg, imm, pc)?,
            Op::Push => {
                cpu.regs[SP] = cpu.regs[SP].wrapping_sub(1);
                let v = cpu.reg(reg, pc)?.wrapping_add(imm);
                store(env.bus, cpu.regs[SP], v, pc)?;
            }
            Op::Pop => {
                let v = load(env.bus, cpu.regs[SP], pc)?.wrapping_add(imm);
                cpu.set_reg(reg, v, pc)?;
                store(env.bus, cpu.regs[SP], 0, pc)?;
                cpu.regs[SP] = cpu.regs[SP].wrapping_add(1);
            }
            Op::Syscall => return Self::syscall(cpu, env, pc, reg, value),
            _ => return Err(Trap::InvalidOpcode { pc, opcode: d.opcode }),
        }
        Ok(Step::Continue)
    }

    fn exec_rm<B: Bus>(
        cpu: &mut Cpu,
        bus: &mut B,
        pc: u32,
        d: Decoded,
        value: u32,
    ) -> Result<Step, Trap> {
        let flags = cpu.flags;
        let taken = match d.op {
            Op::Calli | Op::Jmp => true,
            Op::Jne => flags != 0,
            Op::Jeq => flags == 0,
            Op::Jle => flags <= 0,
            Op::Jl => flags < 0,
            Op::Jge => flags >= 0,
            Op::Jg => flags > 0,
            Op::Ret => {
                cpu.pc = load(bus, cpu.regs[SP], pc)?;
                cpu.regs[SP] = cpu.regs[SP].wrapping_add(value).wrapping_add(1);
                return Ok(Step::Continue);
            }
            _ => return Err(Trap::InvalidOpcode { pc, opcode: d.opcode }),
        };
        if taken {
            call(cpu, bus, value, pc)?;
        }
        Ok(Step::Continue)
    }

    fn exec_rr<B: Bus>(
        cpu: &mut Cpu,
        bus: &mut B,
        pc: u32,
        d: Decoded,
        in_reg: usize,
        out_reg: usize,
        value: i32,
    ) -> Result<Step, Trap> {
        // out_reg_value + value
        let operand = cpu.reg(out_reg, pc)?.wrapping_add(value as u32);
        match d.op {
            Op::Mov => cpu.set_reg(in_reg, operand, pc)?,
            Op::Mul => {
                let hi = in_reg + 1;
                // check the high-word register before touching either
                cpu.reg(hi, pc)?;
                let a = cpu.reg(in_reg, pc)? as i32 as i64;
                let product = (a * operand as i32 as i64) as u64;
                cpu.set_reg(in_reg, product as u32, pc)?;
                cpu.set_reg(hi, (product >> 32) as u32, pc)?;
            }
            Op::Loadr => {
                let v = load(bus, operand, pc)?;
                cpu.set_reg(in_reg, v, pc)?;
            }
            _ => return Err(Trap::InvalidOpcode { pc, opcode: d.opcode }),
        }
        Ok(Step::Continue)
    }

    fn syscall<B: Bus, C: Console>(
        cpu: &mut Cpu,
        env: Env<'_, B, C>,
        pc: u32,
        reg: usize,
        code: i32,
    ) -> Result<Step, Trap> {
        let io = |source: anyhow::Error| Trap::Io { pc, source };
        match env.syscalls.resolve(code) {
            Some(Syscall::Exit) => return Ok(Step::Halt(HaltReason::Exit)),
            Some(Syscall::ScanInt) => {
                let v = env.console.read_int().map_err(io)?;
                cpu.set_reg(reg, v as u32, pc)?;
            }
            Some(Syscall::PrintInt) => {
                let v = cpu.reg(reg, pc)?;
                env.console.print_int(v as i32).map_err(io)?;
            }
            Some(Syscall::GetChar) => {
                let v = env
                    .console
                    .read_char()
                    .map_err(io)?
                    .map_or(u32::MAX, u32::from);
                cpu.set_reg(reg, v, pc)?;
            }
            Some(Syscall::PutChar) => {
                let v = cpu.reg(reg, pc)?;
                env.console.write_char(v as u8).map_err(io)?;
            }
            None => {
                warn!(pc, code, "no such syscall");
                return Ok(Step::Halt(HaltReason::UnknownSyscall(code)));
            }
        }
        Ok(Step::Continue)
    }
}

impl Executor for IntExecutor {
    fn exec<B: Bus, C: Console>(
        &self,
        cpu: &mut Cpu,
        env: Env<'_, B, C>,
        pc: u32,
        d: Decoded,
    ) -> Result<Step, Trap> {
        match d.operands {
            Operands::Ri { reg, value } => Self::exec_ri(cpu, env, pc, d, reg as usize, value),
            Operands::Rm { value, .. } => Self::exec_rm(cpu, env.bus, pc, d, value),
            Operands::Rr {
                in_reg,
                out_reg,
                value,
            } => Self::exec_rr(
                cpu,
                env.bus,
                pc,
                d,
                in_reg as usize,
                out_reg as usize,
                value,
            ),
        }
    }
}
