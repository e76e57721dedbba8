use crate::fault::{Access, Fault};
use crate::memory::STACK_BASE;

/// Number of general purpose registers.
pub const REGISTER_COUNT: usize = 8;

/// Conventional register roles. Nothing stops a program from using these as
/// ordinary registers, but the opcodes below treat them specially.
pub struct Register;

impl Register {
    /// Interrupt mask. Bit `i` enables interrupt line `i`.
    pub const IM: u8 = 5;
    /// Interrupt status. Bit `i` is set while line `i` is pending.
    pub const IS: u8 = 6;
    /// Stack pointer.
    pub const SP: u8 = 7;
}

/// 8x 8-bit registers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Registers([u8; REGISTER_COUNT]);

impl Registers {
    pub fn new() -> Self {
        let mut regs = [0; REGISTER_COUNT];
        regs[Register::SP as usize] = STACK_BASE;
        Registers(regs)
    }

    pub fn get(&self, index: u8) -> Result<u8, Fault> {
        self.0
            .get(index as usize)
            .copied()
            .ok_or(Fault::OutOfRange(Access::Register(index)))
    }

    pub fn set(&mut self, index: u8, value: u8) -> Result<(), Fault> {
        let reg = self
            .0
            .get_mut(index as usize)
            .ok_or(Fault::OutOfRange(Access::Register(index)))?;
        *reg = value;
        Ok(())
    }

    /// Read one of the conventional registers. Cannot fail.
    pub fn sp(&self) -> u8 {
        self.0[Register::SP as usize]
    }

    pub fn set_sp(&mut self, value: u8) {
        self.0[Register::SP as usize] = value;
    }

    pub fn pending(&self) -> u8 {
        self.0[Register::IS as usize]
    }

    pub fn set_pending(&mut self, value: u8) {
        self.0[Register::IS as usize] = value;
    }

    pub fn mask(&self) -> u8 {
        self.0[Register::IM as usize]
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }
}

impl Default for Registers {
    fn default() -> Self {
        Self::new()
    }
}
