use anyhow::Result;
use serde::{Deserialize, Serialize};

pub trait Bus {
    /// Number of addressable words.
    fn size(&self) -> u32;
    fn read(&self, addr: u32) -> Result<u32>;
    fn write(&mut self, addr: u32, val: u32) -> Result<()>;
    /// Zero every word.
    fn clear(&mut self);
}

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("address {addr:#x} outside memory of {size:#x} words")]
pub struct OutOfBounds {
    pub addr: u32,
    pub size: u32,
}

/// Flat word-addressed memory shared by code and data.
#[derive(Clone, Serialize, Deserialize)]
pub struct WordMemory {
    pub mem: Vec<u32>,
}

impl WordMemory {
    pub fn new(size: u32) -> Self {
        Self {
            mem: vec![0; size as usize],
        }
    }

    fn slot(&self, addr: u32) -> Result<usize> {
        if (addr as usize) < self.mem.len() {
            Ok(addr as usize)
        } else {
            Err(OutOfBounds {
                addr,
                size: self.size(),
            }
            .into())
        }
    }
}

impl Bus for WordMemory {
    fn size(&self) -> u32 {
        self.mem.len() as u32
    }
    fn read(&self, addr: u32) -> Result<u32> {
        Ok(self.mem[self.slot(addr)?])
    }
    fn write(&mut self, addr: u32, val: u32) -> Result<()> {
        let i = self.slot(addr)?;
        self.mem[i] = val;
        Ok(())
    }
    fn clear(&mut self) {
        self.mem.fill(0);
    }
}
