use std::{error::Error, fmt};

/// A fatal condition raised while executing a program.
///
/// Every fault stops the run loop. The machine state is left exactly as it was
/// when the fault was raised, so it can be inspected afterwards.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Fault {
    /// Opcode is neither in the ALU family nor a known control/data instruction.
    UnsupportedInstruction { opcode: u8 },
    /// Opcode has the ALU bit set, but the ALU has no such operation.
    UnsupportedOperation { opcode: u8 },
    /// `DIV` with a zero divisor.
    DivisionByZero { register: u8 },
    /// Memory address or register index outside of the machine.
    OutOfRange(Access),
    /// Push with the stack pointer already at address 0.
    StackOverflow,
    /// Pop with the stack pointer at or above the stack base.
    StackUnderflow { sp: u8 },
}

/// What kind of access went out of range.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Access {
    Memory(usize),
    Register(u8),
}

impl Fault {
    /// Short diagnostic code, in the same shape as loader diagnostics.
    pub fn code(&self) -> &'static str {
        match self {
            Self::UnsupportedInstruction { .. } => "run::unsupported_instruction",
            Self::UnsupportedOperation { .. } => "run::unsupported_operation",
            Self::DivisionByZero { .. } => "run::division_by_zero",
            Self::OutOfRange(_) => "run::out_of_range",
            Self::StackOverflow => "run::stack_overflow",
            Self::StackUnderflow { .. } => "run::stack_underflow",
        }
    }
}

impl Error for Fault {}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedInstruction { opcode } => {
                write!(f, "Unsupported instruction 0b{:08b} (0x{:02x})", opcode, opcode)
            }
            Self::UnsupportedOperation { opcode } => {
                write!(f, "Unsupported ALU operation 0b{:08b} (0x{:02x})", opcode, opcode)
            }
            Self::DivisionByZero { register } => {
                write!(f, "Division by zero (divisor register R{})", register)
            }
            Self::OutOfRange(Access::Memory(address)) => {
                write!(f, "Memory address 0x{:x} is out of range", address)
            }
            Self::OutOfRange(Access::Register(index)) => {
                write!(f, "Register index {} is out of range", index)
            }
            Self::StackOverflow => write!(f, "Stack overflow (pushed past address 0x00)"),
            Self::StackUnderflow { sp } => {
                write!(f, "Stack underflow (popped with stack pointer at 0x{:02x})", sp)
            }
        }
    }
}
