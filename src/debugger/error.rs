use std::{error::Error, fmt};

use super::command::CommandName;

/// Why a debugger command line was rejected.
#[derive(Debug, PartialEq)]
pub enum CommandError {
    /// First word names no command.
    Unknown(String),
    /// `break` without a known subcommand, or with none at all.
    BreakUsage(Option<String>),
    /// Known command, unusable arguments.
    Usage { command: CommandName, problem: Usage },
}

/// What is wrong with the arguments of a known command.
#[derive(Debug, PartialEq)]
pub enum Usage {
    /// Named argument is required but absent.
    Missing(&'static str),
    /// First word past the arguments the command takes.
    Unexpected(String),
    Value {
        argument: &'static str,
        word: String,
        problem: BadValue,
    },
}

/// Why one word cannot stand for the argument it was given as.
#[derive(Debug, PartialEq)]
pub enum BadValue {
    NotANumber,
    /// A register, PC, flag or latch where a number belongs.
    Found(&'static str),
    TooLarge { max: u32 },
    Zero,
    NoRegister,
}

impl Error for CommandError {}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown(word) => write!(f, "Not a command: `{word}`"),
            Self::BreakUsage(None) => {
                write!(f, "`break` needs one of `list`, `add` or `remove`")
            }
            Self::BreakUsage(Some(word)) => write!(f, "Not a `break` subcommand: `{word}`"),
            Self::Usage { command, problem } => write!(f, "`{command}`: {problem}"),
        }
    }
}

impl fmt::Display for Usage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing(argument) => write!(f, "missing {argument}"),
            Self::Unexpected(word) => write!(f, "unexpected `{word}`"),
            Self::Value {
                argument,
                word,
                problem,
            } => write!(f, "`{word}` is not a valid {argument}, {problem}"),
        }
    }
}

impl fmt::Display for BadValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotANumber => write!(f, "expected decimal, 0x hex or 0b binary"),
            Self::Found(kind) => write!(f, "expected a number, found {kind}"),
            Self::TooLarge { max } => write!(f, "maximum is {max}"),
            Self::Zero => write!(f, "must be greater than zero"),
            Self::NoRegister => write!(f, "registers are R0 to R7"),
        }
    }
}
