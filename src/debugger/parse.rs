use std::num::IntErrorKind;
use std::str::SplitWhitespace;

use super::command::{CommandName, Location};
use super::error::{BadValue, CommandError, Usage};
use crate::registers::{Register, REGISTER_COUNT};

/// A single parsed argument, before it is checked against what the command expects.
#[derive(Clone, Copy, Debug, PartialEq)]
enum Argument {
    Register(u8),
    ProgramCounter,
    Flag,
    InService,
    Integer(u32),
}

impl Argument {
    fn kind(&self) -> &'static str {
        match self {
            Argument::Register(_) => "a register",
            Argument::ProgramCounter => "the program counter",
            Argument::Flag => "the flag",
            Argument::InService => "the interrupt latch",
            Argument::Integer(_) => "a number",
        }
    }
}

#[derive(Clone, Copy, Debug)]
enum Radix {
    Binary = 2,
    Decimal = 10,
    Hex = 16,
}

/// Returns `true` if `name` matches any item of `candidates` (case insensitive).
fn matches(name: &str, candidates: &[&str]) -> bool {
    candidates
        .iter()
        .any(|candidate| name.eq_ignore_ascii_case(candidate))
}

/// Returns the first [`CommandName`] with a candidate matching `name` (case insensitive).
fn find_match(name: &str, commands: &[(CommandName, &[&str])]) -> Option<CommandName> {
    commands
        .iter()
        .find(|(_, candidates)| matches(name, candidates))
        .map(|(command, _)| *command)
}

/// Whitespace-separated words of a single command.
pub struct ArgIter<'a> {
    words: SplitWhitespace<'a>,
}

impl<'a> ArgIter<'a> {
    pub fn from(line: &'a str) -> Self {
        Self {
            words: line.split_whitespace(),
        }
    }

    /// Parse and consume command name.
    ///
    /// `break` takes its subcommand as part of the name, eg. `break add`.
    pub fn get_command_name(&mut self) -> Result<CommandName, CommandError> {
        let name = self.words.next().unwrap_or("");

        #[rustfmt::skip]
        let commands: &[(_, &[_])] = &[
            (CommandName::Help,        &["help", "--help", "h", "-h"]),
            (CommandName::Step,        &["step", "s"]),
            (CommandName::Continue,    &["continue", "cont", "c"]),
            (CommandName::Exit,        &["exit"]),
            (CommandName::Quit,        &["quit", "q"]),
            (CommandName::Registers,   &["registers", "reg", "r"]),
            (CommandName::Reset,       &["reset"]),
            (CommandName::Get,         &["get", "g"]),
            (CommandName::Set,         &["set"]),
            (CommandName::Jump,        &["jump", "j"]),
            (CommandName::Memory,      &["memory", "mem", "m"]),
            (CommandName::List,        &["list", "l"]),
            (CommandName::BreakList,   &["breaklist", "bl"]),
            (CommandName::BreakAdd,    &["breakadd", "ba"]),
            (CommandName::BreakRemove, &["breakremove", "br"]),
        ];
        #[rustfmt::skip]
        let break_subcommands: &[(_, &[_])] = &[
            (CommandName::BreakList,   &["list", "l"]),
            (CommandName::BreakAdd,    &["add", "a"]),
            (CommandName::BreakRemove, &["remove", "r"]),
        ];

        if let Some(command) = find_match(name, commands) {
            return Ok(command);
        }
        if !matches(name, &["break", "b"]) {
            return Err(CommandError::Unknown(name.to_string()));
        }
        match self.words.next() {
            None => Err(CommandError::BreakUsage(None)),
            Some(sub) => find_match(sub, break_subcommands)
                .ok_or_else(|| CommandError::BreakUsage(Some(sub.to_string()))),
        }
    }

    /// Next integer no larger than `max`, which must be present.
    pub fn next_integer(&mut self, argument: &'static str, max: u32) -> Result<u32, Usage> {
        self.next_optional_integer(argument, max)?
            .ok_or(Usage::Missing(argument))
    }

    /// Positive integer no larger than `max`, or `default` if absent.
    pub fn next_count(
        &mut self,
        argument: &'static str,
        default: u32,
        max: u32,
    ) -> Result<u32, Usage> {
        let Some((word, value)) = self.next_integer_word(argument, max)? else {
            return Ok(default);
        };
        if value == 0 {
            return Err(bad(argument, word, BadValue::Zero));
        }
        Ok(value)
    }

    pub fn next_address(&mut self, argument: &'static str) -> Result<u8, Usage> {
        self.next_integer(argument, u8::MAX as u32)
            .map(|value| value as u8)
    }

    /// `None` if there are no more words.
    pub fn next_optional_address(&mut self, argument: &'static str) -> Result<Option<u8>, Usage> {
        Ok(self
            .next_optional_integer(argument, u8::MAX as u32)?
            .map(|value| value as u8))
    }

    /// Register, PC, flag, interrupt latch or memory address.
    pub fn next_location(&mut self, argument: &'static str) -> Result<Location, Usage> {
        let Some((word, parsed)) = self.next_argument(argument)? else {
            return Err(Usage::Missing(argument));
        };
        Ok(match parsed {
            Argument::Register(index) => Location::Register(index),
            Argument::ProgramCounter => Location::ProgramCounter,
            Argument::Flag => Location::Flag,
            Argument::InService => Location::InService,
            Argument::Integer(address) => match u8::try_from(address) {
                Ok(address) => Location::Memory(address),
                Err(_) => {
                    let max = u8::MAX as u32;
                    return Err(bad(argument, word, BadValue::TooLarge { max }));
                }
            },
        })
    }

    /// Fails on the first word left over.
    pub fn expect_end(&mut self) -> Result<(), Usage> {
        match self.words.next() {
            None => Ok(()),
            Some(word) => Err(Usage::Unexpected(word.to_string())),
        }
    }

    fn next_optional_integer(
        &mut self,
        argument: &'static str,
        max: u32,
    ) -> Result<Option<u32>, Usage> {
        Ok(self
            .next_integer_word(argument, max)?
            .map(|(_, value)| value))
    }

    fn next_integer_word(
        &mut self,
        argument: &'static str,
        max: u32,
    ) -> Result<Option<(&'a str, u32)>, Usage> {
        match self.next_argument(argument)? {
            None => Ok(None),
            Some((word, Argument::Integer(value))) if value <= max => Ok(Some((word, value))),
            Some((word, Argument::Integer(_))) => {
                Err(bad(argument, word, BadValue::TooLarge { max }))
            }
            Some((word, other)) => Err(bad(argument, word, BadValue::Found(other.kind()))),
        }
    }

    fn next_argument(
        &mut self,
        argument: &'static str,
    ) -> Result<Option<(&'a str, Argument)>, Usage> {
        let Some(word) = self.words.next() else {
            return Ok(None);
        };
        parse_argument(word)
            .map(|parsed| Some((word, parsed)))
            .map_err(|problem| bad(argument, word, problem))
    }
}

fn bad(argument: &'static str, word: &str, problem: BadValue) -> Usage {
    Usage::Value {
        argument,
        word: word.to_string(),
        problem,
    }
}

fn parse_argument(word: &str) -> Result<Argument, BadValue> {
    #[rustfmt::skip]
    let named: &[(&str, Argument)] = &[
        ("pc",  Argument::ProgramCounter),
        ("fl",  Argument::Flag),
        ("isr", Argument::InService),
        ("sp",  Argument::Register(Register::SP)),
        ("is",  Argument::Register(Register::IS)),
        ("im",  Argument::Register(Register::IM)),
    ];
    if let Some((_, argument)) = named.iter().find(|(name, _)| word.eq_ignore_ascii_case(name)) {
        return Ok(*argument);
    }

    if let Some(index) = word.strip_prefix(['r', 'R']) {
        return match parse_integer(index) {
            Ok(index) if index < REGISTER_COUNT as u32 => Ok(Argument::Register(index as u8)),
            _ => Err(BadValue::NoRegister),
        };
    }

    parse_integer(word).map(Argument::Integer)
}

/// Decimal, `0x` hex or `0b` binary.
fn parse_integer(word: &str) -> Result<u32, BadValue> {
    let lower = word.to_ascii_lowercase();
    let (digits, radix) = if let Some(digits) = lower.strip_prefix("0x") {
        (digits, Radix::Hex)
    } else if let Some(digits) = lower.strip_prefix("0b") {
        (digits, Radix::Binary)
    } else {
        (lower.as_str(), Radix::Decimal)
    };
    if digits.is_empty() || digits.starts_with('+') {
        return Err(BadValue::NotANumber);
    }
    u32::from_str_radix(digits, radix as u32).map_err(|error| match error.kind() {
        IntErrorKind::PosOverflow => BadValue::TooLarge { max: u32::MAX },
        _ => BadValue::NotANumber,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integers() {
        assert_eq!(parse_integer("10"), Ok(10));
        assert_eq!(parse_integer("0x1F"), Ok(0x1f));
        assert_eq!(parse_integer("0b101"), Ok(5));
        assert_eq!(parse_integer("0x"), Err(BadValue::NotANumber));
        assert_eq!(parse_integer("12a"), Err(BadValue::NotANumber));
        assert_eq!(parse_integer("+1"), Err(BadValue::NotANumber));
        assert_eq!(parse_integer("-1"), Err(BadValue::NotANumber));
        assert_eq!(
            parse_integer("99999999999"),
            Err(BadValue::TooLarge { max: u32::MAX })
        );
    }

    #[test]
    fn arguments() {
        assert_eq!(parse_argument("r3"), Ok(Argument::Register(3)));
        assert_eq!(parse_argument("R7"), Ok(Argument::Register(7)));
        assert_eq!(parse_argument("SP"), Ok(Argument::Register(7)));
        assert_eq!(parse_argument("im"), Ok(Argument::Register(5)));
        assert_eq!(parse_argument("PC"), Ok(Argument::ProgramCounter));
        assert_eq!(parse_argument("fl"), Ok(Argument::Flag));
        assert_eq!(parse_argument("ISR"), Ok(Argument::InService));
        assert_eq!(parse_argument("0xf4"), Ok(Argument::Integer(0xf4)));
        assert_eq!(parse_argument("r8"), Err(BadValue::NoRegister));
        assert_eq!(parse_argument("rx"), Err(BadValue::NoRegister));
        assert_eq!(parse_argument("foo"), Err(BadValue::NotANumber));
    }

    #[test]
    fn command_names() {
        let name = |line| ArgIter::from(line).get_command_name();
        assert_eq!(name("step"), Ok(CommandName::Step));
        assert_eq!(name("C"), Ok(CommandName::Continue));
        assert_eq!(name("break add 4"), Ok(CommandName::BreakAdd));
        assert_eq!(name("b l"), Ok(CommandName::BreakList));
        assert_eq!(name("bl"), Ok(CommandName::BreakList));
        assert_eq!(name("break"), Err(CommandError::BreakUsage(None)));
        assert_eq!(
            name("break nothing"),
            Err(CommandError::BreakUsage(Some("nothing".to_string())))
        );
        assert_eq!(name("fly"), Err(CommandError::Unknown("fly".to_string())));
    }

    #[test]
    fn missing_and_leftover_words() {
        let mut iter = ArgIter::from("");
        assert_eq!(
            iter.next_location("location"),
            Err(Usage::Missing("location"))
        );

        let mut iter = ArgIter::from("r1 r2 r3");
        assert_eq!(iter.next_location("location"), Ok(Location::Register(1)));
        assert_eq!(iter.expect_end(), Err(Usage::Unexpected("r2".to_string())));
    }

    #[test]
    fn integer_bounds() {
        let mut iter = ArgIter::from("256 0 r1");
        assert_eq!(
            iter.next_address("address"),
            Err(bad("address", "256", BadValue::TooLarge { max: 255 }))
        );
        assert_eq!(
            iter.next_count("count", 1, 100),
            Err(bad("count", "0", BadValue::Zero))
        );
        assert_eq!(
            iter.next_integer("value", 255),
            Err(bad("value", "r1", BadValue::Found("a register")))
        );
        assert_eq!(iter.next_count("count", 8, 255), Ok(8));
    }
}
