use std::collections::VecDeque;
use std::io::{self, BufRead, IsTerminal, Write};
use std::mem;

use console::{Key, Term};

use super::DEBUGGER_COLOR;
use crate::dprintln;

/// Debugger commands, one at a time.
///
/// Input arrives in lines, and each line holds any number of `;`-separated
/// commands. Blank commands are skipped.
pub struct CommandSource {
    input: Input,
    pending: VecDeque<String>,
}

enum Input {
    /// `--command` argument, or stdin when it is piped.
    Script(Box<dyn BufRead>),
    Terminal(Prompt),
}

impl CommandSource {
    pub fn new(argument: Option<String>) -> Self {
        let input = match argument {
            Some(argument) => Input::Script(Box::new(io::Cursor::new(argument))),
            None if io::stdin().is_terminal() => Input::Terminal(Prompt::new()),
            None => Input::Script(Box::new(io::stdin().lock())),
        };
        Self {
            input,
            pending: VecDeque::new(),
        }
    }
}

impl Iterator for CommandSource {
    type Item = String;

    /// Trimmed command. `None` once input runs out.
    fn next(&mut self) -> Option<String> {
        loop {
            if let Some(command) = self.pending.pop_front() {
                // Nobody typed it, so show what is being run
                if matches!(self.input, Input::Script(_)) {
                    dprintln!(Sometimes, "\x1b[1mCommand:\x1b[0m {}", command);
                }
                return Some(command);
            }
            let line = self.input.read_line()?;
            self.pending.extend(split_commands(&line));
        }
    }
}

impl Input {
    /// `None` at end of input.
    fn read_line(&mut self) -> Option<String> {
        let line = match self {
            Input::Script(reader) => {
                let mut line = String::new();
                reader
                    .read_line(&mut line)
                    .map(|len| (len > 0).then_some(line))
            }
            Input::Terminal(prompt) => prompt.read_line().map(Some),
        };
        line.unwrap_or_else(|error| {
            // Ctrl+C at the prompt ends up here too
            log::info!("stopped reading debugger commands: {error}");
            None
        })
    }
}

fn split_commands(line: &str) -> impl Iterator<Item = String> + '_ {
    line.split(';')
        .map(str::trim)
        .filter(|command| !command.is_empty())
        .map(String::from)
}

/// Interactive prompt on stderr, with history.
struct Prompt {
    term: Term,
    history: Vec<String>,
}

impl Prompt {
    fn new() -> Self {
        Self {
            term: Term::stderr(),
            history: Vec::new(),
        }
    }

    /// Blocks until a non-blank line is entered.
    fn read_line(&mut self) -> io::Result<String> {
        let mut edit = LineEdit::default();
        loop {
            self.draw(&edit)?;
            match self.term.read_key()? {
                Key::Enter | Key::Char('\n') => {
                    writeln!(self.term)?;
                    let line = edit.text();
                    if line.trim().is_empty() {
                        edit = LineEdit::default();
                        continue;
                    }
                    if self.history.last() != Some(&line) {
                        self.history.push(line.clone());
                    }
                    return Ok(line);
                }
                key => edit.apply(key, &self.history),
            }
        }
    }

    fn draw(&mut self, edit: &LineEdit) -> io::Result<()> {
        self.term.clear_line()?;
        write!(
            self.term,
            "\x1b[1;{}mCommand: \x1b[0m{}",
            DEBUGGER_COLOR,
            edit.text()
        )?;
        self.term.move_cursor_left(edit.chars.len() - edit.cursor)?;
        self.term.flush()
    }
}

/// Line being typed at the prompt.
#[derive(Debug, Default)]
struct LineEdit {
    chars: Vec<char>,
    /// Index into `chars`, at most its length.
    cursor: usize,
    /// History entry on display, `None` for the line being typed.
    browsing: Option<usize>,
    /// Line being typed, put aside while browsing history.
    draft: Vec<char>,
}

impl LineEdit {
    fn text(&self) -> String {
        self.chars.iter().collect()
    }

    fn apply(&mut self, key: Key, history: &[String]) {
        match key {
            Key::Char('\x00'..='\x1f' | '\x7f') => (),
            Key::Char(ch) => {
                self.chars.insert(self.cursor, ch);
                self.cursor += 1;
                self.browsing = None;
            }
            Key::Backspace if self.cursor > 0 => {
                self.cursor -= 1;
                self.chars.remove(self.cursor);
                self.browsing = None;
            }
            Key::Del if self.cursor < self.chars.len() => {
                self.chars.remove(self.cursor);
                self.browsing = None;
            }
            Key::ArrowLeft => self.cursor = self.cursor.saturating_sub(1),
            Key::ArrowRight => self.cursor = (self.cursor + 1).min(self.chars.len()),
            Key::Home => self.cursor = 0,
            Key::End => self.cursor = self.chars.len(),
            Key::ArrowUp => self.older(history),
            Key::ArrowDown => self.newer(history),
            _ => (),
        }
    }

    fn older(&mut self, history: &[String]) {
        let index = match self.browsing {
            None if history.is_empty() => return,
            None => {
                self.draft = mem::take(&mut self.chars);
                history.len() - 1
            }
            Some(0) => return,
            Some(index) => index - 1,
        };
        self.show(Some(index), history[index].chars().collect());
    }

    fn newer(&mut self, history: &[String]) {
        match self.browsing {
            None => (),
            Some(index) if index + 1 < history.len() => {
                self.show(Some(index + 1), history[index + 1].chars().collect());
            }
            Some(_) => {
                let draft = mem::take(&mut self.draft);
                self.show(None, draft);
            }
        }
    }

    fn show(&mut self, browsing: Option<usize>, chars: Vec<char>) {
        self.browsing = browsing;
        self.cursor = chars.len();
        self.chars = chars;
    }
}
