use crate::fault::Fault;
use crate::flag::Flag;
use crate::isa::{self, Instruction};
use crate::memory::{Memory, STACK_BASE};
use crate::registers::Registers;

/// Represents complete machine state during runtime.
#[derive(Clone)]
pub struct RunState {
    /// System memory, 256 bytes.
    mem: Memory,
    /// Program counter
    pc: u8,
    /// 8x 8-bit registers
    reg: Registers,
    /// Condition code
    flag: Flag,
    /// Set between interrupt dispatch and `IRET`; blocks nested dispatch.
    in_service: bool,
}

impl RunState {
    pub fn new() -> Self {
        RunState {
            mem: Memory::new(),
            pc: 0,
            reg: Registers::new(),
            flag: Flag::default(),
            in_service: false,
        }
    }

    /// Fresh machine with `program` copied to address 0.
    pub fn from_raw(program: &[u8]) -> Result<Self, Fault> {
        let mut state = Self::new();
        state.mem.load(program)?;
        Ok(state)
    }

    /// Fetch the instruction at PC.
    ///
    /// Operand bytes the opcode declares must lie inside memory. Trailing bytes it
    /// does not use read as zero once they fall past the end of memory.
    pub fn fetch(&self) -> Result<Instruction, Fault> {
        let pc = self.pc as usize;
        let opcode = self.mem.read(pc)?;
        let operands = isa::operand_count(opcode) as usize;
        let operand = |i: usize| -> Result<u8, Fault> {
            match self.mem.read(pc + i) {
                Err(_) if i > operands => Ok(0),
                result => result,
            }
        };
        Ok(Instruction::new(opcode, operand(1)?, operand(2)?))
    }

    pub fn push(&mut self, value: u8) -> Result<(), Fault> {
        let sp = self.reg.sp().checked_sub(1).ok_or(Fault::StackOverflow)?;
        self.mem.write(sp as usize, value)?;
        self.reg.set_sp(sp);
        Ok(())
    }

    pub fn pop(&mut self) -> Result<u8, Fault> {
        let sp = self.reg.sp();
        if sp >= STACK_BASE {
            return Err(Fault::StackUnderflow { sp });
        }
        let value = self.mem.read(sp as usize)?;
        self.reg.set_sp(sp + 1);
        Ok(value)
    }

    pub fn pc(&self) -> u8 {
        self.pc
    }

    pub fn pc_mut(&mut self) -> &mut u8 {
        &mut self.pc
    }

    pub fn reg(&self) -> &Registers {
        &self.reg
    }

    pub fn reg_mut(&mut self) -> &mut Registers {
        &mut self.reg
    }

    pub fn mem(&self) -> &Memory {
        &self.mem
    }

    pub fn mem_mut(&mut self) -> &mut Memory {
        &mut self.mem
    }

    pub fn flag(&self) -> Flag {
        self.flag
    }

    pub fn flag_mut(&mut self) -> &mut Flag {
        &mut self.flag
    }

    /// Registers and flag together, for the ALU.
    pub(crate) fn alu_parts(&mut self) -> (&mut Registers, &mut Flag) {
        (&mut self.reg, &mut self.flag)
    }

    pub fn in_service(&self) -> bool {
        self.in_service
    }

    pub(crate) fn set_in_service(&mut self, value: bool) {
        self.in_service = value;
    }
}

impl Default for RunState {
    fn default() -> Self {
        Self::new()
    }
}
