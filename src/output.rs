use std::cell::RefCell;
use std::io::{self, Write};
use std::str::Chars;

use colored::{ColoredString, Colorize};

use crate::fault::Fault;
use crate::registers::{Register, REGISTER_COUNT};
use crate::state::RunState;

#[macro_export]
macro_rules! dprint {
    ( $cond:expr, $fmt:literal $($tt:tt)* ) => {{
        #[allow(unused_imports)]
        use $crate::output::Condition::*;
        $crate::output::print_debug($cond, &format!($fmt $($tt)*));
    }};
}

#[macro_export]
macro_rules! dprintln {
    ( $cond:expr ) => {{
        #[allow(unused_imports)]
        use $crate::output::Condition::*;
        $crate::output::print_debug($cond, "\n");
    }};
    ( $cond:expr, $fmt:literal $($tt:tt)* ) => {{
        #[allow(unused_imports)]
        use $crate::output::Condition::*;
        $crate::output::print_debug($cond, &format!(concat!($fmt, "\n") $($tt)*));
    }};
}

/// Whether a diagnostic line survives `--minimal`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Condition {
    Always,
    Sometimes,
}

thread_local! {
    static IS_MINIMAL: RefCell<bool> = const { RefCell::new(false) };
    static IS_LINE_START: RefCell<bool> = const { RefCell::new(true) };
}

/// May be called multiple times.
pub fn set_minimal(new_value: bool) -> bool {
    IS_MINIMAL.with(|value| value.replace(new_value))
}

pub fn is_minimal() -> bool {
    IS_MINIMAL.with(|value| *value.borrow())
}

fn set_line_start(new_value: bool) {
    IS_LINE_START.with(|value| *value.borrow_mut() = new_value);
}

fn is_line_start() -> bool {
    IS_LINE_START.with(|value| *value.borrow())
}

/// Write a diagnostic string to stderr.
///
/// Blue unless `--minimal`, in which case colors are stripped and
/// [`Condition::Sometimes`] output is dropped.
pub fn print_debug(condition: Condition, string: &str) {
    match (is_minimal(), condition) {
        (false, _) => eprint!("{}", ColoredString::from(string).blue()),
        (true, Condition::Always) => eprint_colorless(string),
        (true, Condition::Sometimes) => return,
    }
    if let Some(last) = Decolored::new(string).last() {
        set_line_start(last == '\n');
    }
}

/// Make sure the next diagnostic starts on its own line.
pub fn start_new_line() {
    if !is_line_start() {
        print_debug(Condition::Always, "\n");
    }
}

pub fn print_registers(state: &RunState) {
    let regs = state.reg().as_slice();
    if is_minimal() {
        for (i, value) in regs.iter().enumerate() {
            dprintln!(Always, "R{} {}", i, value);
        }
        dprintln!(Always, "PC {}", state.pc());
        dprintln!(Always, "FL {:03b}", state.flag().bits());
        dprintln!(Always, "ISR {}", state.in_service() as u8);
        return;
    }

    dprintln!(Always, "\x1b[2m┌───────────────────────────┐\x1b[0m");
    dprintln!(Always, "\x1b[2m│      \x1b[3mhex   int  char     \x1b[0m\x1b[2m │\x1b[0m");
    for (i, value) in regs.iter().enumerate() {
        dprintln!(
            Always,
            "\x1b[2m│\x1b[0m \x1b[1mR{}\x1b[0m  0x{:02x}  {:>3}  {}  {}    \x1b[2m│\x1b[0m",
            i,
            value,
            value,
            char_display(*value),
            match i as u8 {
                Register::IM => "IM",
                Register::IS => "IS",
                Register::SP => "SP",
                _ => "  ",
            }
        );
    }
    dprintln!(Always, "\x1b[2m│\x1b[0m{}\x1b[2m│\x1b[0m", control_row(state));
    dprintln!(Always, "\x1b[2m└───────────────────────────┘\x1b[0m");
}

/// PC, flag and interrupt latch, padded to the width of a register row.
fn control_row(state: &RunState) -> String {
    format!(
        " \x1b[1mPC\x1b[0m  0x{:02x}  \x1b[1mFL\x1b[0m  {}  \x1b[1mISR\x1b[0m {}",
        state.pc(),
        state.flag(),
        if state.in_service() { "yes" } else { "no " },
    )
}

/// Three-column printable form of a byte.
pub(crate) fn char_display(value: u8) -> String {
    match value {
        0x00 => "NUL".to_string(),
        0x08 => "BS ".to_string(),
        0x09 => "HT ".to_string(),
        0x0a => "LF ".to_string(),
        0x0d => "CR ".to_string(),
        0x1b => "ESC".to_string(),
        0x7f => "DEL".to_string(),
        0x20 => "[_]".to_string(),
        0x21..=0x7e => format!("{:<3}", value as char),
        _ => "\x1b[2m───\x1b[0m".to_string(),
    }
}

/// One-line machine state: PC, the three bytes at PC and every register.
pub fn trace_line(state: &RunState) -> String {
    let byte = |offset: usize| match state.mem().read(state.pc() as usize + offset) {
        Ok(value) => format!("{:02X}", value),
        Err(_) => "--".to_string(),
    };
    let mut line = format!(
        "TRACE: {:02X} | {} {} {} |",
        state.pc(),
        byte(0),
        byte(1),
        byte(2)
    );
    for i in 0..REGISTER_COUNT {
        line.push_str(&format!(" {:02X}", state.reg().as_slice()[i]));
    }
    line
}

pub fn print_trace(state: &RunState) {
    dprintln!(Always, "{}", trace_line(state));
}

/// Report a fault with enough machine state to diagnose it.
pub fn print_fault(state: &RunState, fault: &Fault) {
    start_new_line();
    dprintln!(Always, "{}", fault);
    print_trace(state);
    dprintln!(
        Always,
        "FL {:03b}  ISR {}",
        state.flag().bits(),
        state.in_service() as u8
    );
}

/// Program output, as written by `PRN` and `PRA`.
///
/// When the terminal is in raw mode, `\n` is expanded to `\r\n`.
pub struct Console<W: Write> {
    out: W,
    crlf: bool,
}

impl Console<io::Stdout> {
    pub fn stdout(crlf: bool) -> Self {
        Console::new(io::stdout(), crlf)
    }
}

impl<W: Write> Console<W> {
    pub fn new(out: W, crlf: bool) -> Self {
        Console { out, crlf }
    }

    /// Decimal value followed by a newline.
    pub fn print_decimal(&mut self, value: u8) -> io::Result<()> {
        write!(self.out, "{}", value)?;
        self.print_char('\n')
    }

    /// Single character, flushed immediately.
    pub fn print_char(&mut self, ch: char) -> io::Result<()> {
        if self.crlf && ch == '\n' {
            self.out.write_all(b"\r\n")?;
        } else {
            write!(self.out, "{}", ch)?;
        }
        self.out.flush()
    }

    pub fn get_ref(&self) -> &W {
        &self.out
    }
}

struct Decolored<'a> {
    chars: Chars<'a>,
}

impl<'a> Decolored<'a> {
    pub fn new(string: &'a str) -> Self {
        Self {
            chars: string.chars(),
        }
    }
}

impl<'a> Iterator for Decolored<'a> {
    type Item = char;
    fn next(&mut self) -> Option<Self::Item> {
        while let Some(ch) = self.chars.next() {
            // Skip everything between '\x1b' and 'm' (inclusive)
            if ch == '\x1b' {
                while self.chars.next().is_some_and(|ch| ch != 'm') {}
                continue;
            }
            return Some(ch);
        }
        None
    }
}

fn eprint_colorless(string: &str) {
    let string: String = Decolored::new(string).collect();
    eprint!("{}", string);
}
