use crate::fault::{Access, Fault};

/// LS-8 can address 256 bytes of memory.
pub const MEMORY_SIZE: usize = 0x100;

// Memory map:
//   0x00-0x73  program, data, stack (grows down from STACK_BASE)
//   0x74-0xf3  free
//   0xf4       last key pressed
//   0xf5-0xf7  reserved
//   0xf8-0xff  interrupt vector table

/// Initial value of the stack pointer. Stack grows downward into program memory.
pub const STACK_BASE: u8 = 0x74;
/// Cell holding the character code of the last key pressed.
pub const KEYBOARD_CELL: u8 = 0xf4;
/// First slot of the interrupt vector table. Slot `i` holds the handler for line `i`.
pub const VECTOR_TABLE: u8 = 0xf8;

/// Flat, bounds-checked system memory.
#[derive(Clone)]
pub struct Memory {
    bytes: Box<[u8; MEMORY_SIZE]>,
}

impl Memory {
    pub fn new() -> Self {
        Memory {
            bytes: Box::new([0; MEMORY_SIZE]),
        }
    }

    /// Copy `program` into memory, starting at address 0.
    pub fn load(&mut self, program: &[u8]) -> Result<(), Fault> {
        if program.len() > MEMORY_SIZE {
            return Err(Fault::OutOfRange(Access::Memory(program.len() - 1)));
        }
        self.bytes[..program.len()].copy_from_slice(program);
        Ok(())
    }

    pub fn read(&self, address: usize) -> Result<u8, Fault> {
        self.bytes
            .get(address)
            .copied()
            .ok_or(Fault::OutOfRange(Access::Memory(address)))
    }

    pub fn write(&mut self, address: usize, value: u8) -> Result<(), Fault> {
        let cell = self
            .bytes
            .get_mut(address)
            .ok_or(Fault::OutOfRange(Access::Memory(address)))?;
        *cell = value;
        Ok(())
    }

    /// Read-only view of a range, clamped to the end of memory.
    pub fn slice(&self, address: usize, len: usize) -> &[u8] {
        let start = address.min(MEMORY_SIZE);
        let end = address.saturating_add(len).min(MEMORY_SIZE);
        &self.bytes[start..end]
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_zeroed() {
        let m = Memory::new();
        assert_eq!(m.slice(0, MEMORY_SIZE), &[0; MEMORY_SIZE]);
    }

    #[test]
    fn read_write() -> Result<(), Fault> {
        let mut m = Memory::new();
        m.write(0x10, 0xaa)?;
        m.write(0xff, 0x55)?;
        assert_eq!(m.read(0x10)?, 0xaa);
        assert_eq!(m.read(0xff)?, 0x55);
        Ok(())
    }

    #[test]
    fn out_of_range() {
        let mut m = Memory::new();
        assert_eq!(m.read(0x100), Err(Fault::OutOfRange(Access::Memory(0x100))));
        assert_eq!(
            m.write(0x101, 1),
            Err(Fault::OutOfRange(Access::Memory(0x101)))
        );
    }

    #[test]
    fn load_program() -> Result<(), Fault> {
        let mut m = Memory::new();
        m.load(&[0x82, 0x00, 0x0a, 0x01])?;
        assert_eq!(m.slice(0, 6), &[0x82, 0x00, 0x0a, 0x01, 0, 0]);
        assert!(m.load(&[0; MEMORY_SIZE + 1]).is_err());
        Ok(())
    }

    #[test]
    fn slice_clamped() {
        let m = Memory::new();
        assert_eq!(m.slice(0xfe, 8).len(), 2);
        assert!(m.slice(0x200, 8).is_empty());
    }

    #[test]
    fn mem_layout() {
        assert!(STACK_BASE < KEYBOARD_CELL);
        assert!(KEYBOARD_CELL < VECTOR_TABLE);
        assert_eq!(VECTOR_TABLE as usize + 8, MEMORY_SIZE);
    }
}
