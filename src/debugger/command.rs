use std::fmt;

use super::error::{CommandError, Usage};
use super::parse::ArgIter;
use crate::memory::MEMORY_SIZE;

/// Default amount of bytes shown by `memory`.
const DEFAULT_MEMORY_LEN: u32 = 16;
/// Default amount of instructions shown by `list`.
const DEFAULT_LIST_COUNT: u32 = 8;

#[derive(Debug, PartialEq)]
pub enum Command {
    Help,
    Step { count: u32 },
    Continue,
    Quit,
    Exit,
    BreakList,
    /// `None` means the current PC.
    BreakAdd { address: Option<u8> },
    BreakRemove { address: Option<u8> },
    Get { location: Location },
    Set { location: Location, value: u8 },
    Jump { address: u8 },
    Registers,
    Reset,
    Memory { address: u8, len: u16 },
    /// `None` means the current PC.
    List { address: Option<u8>, count: u16 },
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum CommandName {
    Help,
    Step,
    Continue,
    Quit,
    Exit,
    BreakList,
    BreakAdd,
    BreakRemove,
    Get,
    Set,
    Jump,
    Registers,
    Reset,
    Memory,
    List,
}

impl fmt::Display for CommandName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Help => write!(f, "help"),
            Self::Step => write!(f, "step"),
            Self::Continue => write!(f, "continue"),
            Self::Quit => write!(f, "quit"),
            Self::Exit => write!(f, "exit"),
            Self::BreakList => write!(f, "break list"),
            Self::BreakAdd => write!(f, "break add"),
            Self::BreakRemove => write!(f, "break remove"),
            Self::Get => write!(f, "get"),
            Self::Set => write!(f, "set"),
            Self::Jump => write!(f, "jump"),
            Self::Registers => write!(f, "registers"),
            Self::Reset => write!(f, "reset"),
            Self::Memory => write!(f, "memory"),
            Self::List => write!(f, "list"),
        }
    }
}

/// Register, PC, flag, interrupt latch or memory cell.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Location {
    Register(u8),
    ProgramCounter,
    Flag,
    /// Set while an interrupt handler runs.
    InService,
    Memory(u8),
}

impl TryFrom<&str> for Command {
    type Error = CommandError;

    fn try_from(line: &str) -> Result<Self, Self::Error> {
        let mut iter = ArgIter::from(line);
        let command = iter.get_command_name()?;
        Command::parse_arguments(command, &mut iter)
            .map_err(|problem| CommandError::Usage { command, problem })
    }
}

impl Command {
    fn parse_arguments(name: CommandName, iter: &mut ArgIter) -> Result<Self, Usage> {
        let command = match name {
            // Anything after `help` is ignored
            CommandName::Help => return Ok(Self::Help),

            CommandName::Continue => Self::Continue,
            CommandName::Exit => Self::Exit,
            CommandName::Quit => Self::Quit,
            CommandName::Registers => Self::Registers,
            CommandName::Reset => Self::Reset,
            CommandName::BreakList => Self::BreakList,

            CommandName::Step => Self::Step {
                count: iter.next_count("count", 1, u32::MAX)?,
            },
            CommandName::Get => Self::Get {
                location: iter.next_location("location")?,
            },
            CommandName::Set => Self::Set {
                location: iter.next_location("location")?,
                value: iter.next_integer("value", u8::MAX as u32)? as u8,
            },
            CommandName::Jump => Self::Jump {
                address: iter.next_address("address")?,
            },
            CommandName::BreakAdd => Self::BreakAdd {
                address: iter.next_optional_address("address")?,
            },
            CommandName::BreakRemove => Self::BreakRemove {
                address: iter.next_optional_address("address")?,
            },
            CommandName::Memory => Self::Memory {
                address: iter.next_address("address")?,
                len: iter.next_count("length", DEFAULT_MEMORY_LEN, MEMORY_SIZE as u32)? as u16,
            },
            CommandName::List => Self::List {
                address: iter.next_optional_address("address")?,
                count: iter.next_count("count", DEFAULT_LIST_COUNT, MEMORY_SIZE as u32)? as u16,
            },
        };
        iter.expect_end()?;
        Ok(command)
    }
}
