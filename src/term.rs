use std::io::{self, IsTerminal};
use std::time::{Duration, Instant};

use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    terminal,
};

use crate::interrupt::InterruptSource;

/// Timer period of the host clock.
const TIMER_PERIOD: Duration = Duration::from_secs(1);

/// Host-backed interrupt source: wall clock timer and non-blocking keyboard.
///
/// The keyboard is only captured when stdin is an interactive terminal. While it
/// is captured the terminal is in raw mode, so `Ctrl+C` is read as a key and
/// turned into a stop request instead of killing the process.
pub struct HostInterrupts {
    last_tick: Instant,
    keyboard: bool,
    stop: bool,
}

impl HostInterrupts {
    pub fn new(capture_keyboard: bool) -> Self {
        let keyboard = capture_keyboard && io::stdin().is_terminal() && enable_raw_mode();
        HostInterrupts {
            last_tick: Instant::now(),
            keyboard,
            stop: false,
        }
    }

    /// Whether the terminal was put in raw mode for keyboard capture.
    ///
    /// Output must then use `\r\n` line endings.
    pub fn is_capturing(&self) -> bool {
        self.keyboard
    }

    fn read_key(&mut self) -> io::Result<Option<u8>> {
        while event::poll(Duration::ZERO)? {
            let Event::Key(key) = event::read()? else {
                continue;
            };
            match Key::try_from(key) {
                Ok(Key::Interrupt) => {
                    log::info!("stop requested from keyboard");
                    self.stop = true;
                    return Ok(None);
                }
                Ok(Key::Byte(byte)) => return Ok(Some(byte)),
                Err(()) => continue,
            }
        }
        Ok(None)
    }
}

impl InterruptSource for HostInterrupts {
    fn poll_timer_tick(&mut self) -> bool {
        let now = Instant::now();
        if now.duration_since(self.last_tick) < TIMER_PERIOD {
            return false;
        }
        self.last_tick = now;
        true
    }

    fn poll_keyboard(&mut self) -> Option<u8> {
        if !self.keyboard {
            return None;
        }
        match self.read_key() {
            Ok(key) => key,
            Err(error) => {
                log::warn!("keyboard polling failed, disabling: {error}");
                self.keyboard = false;
                disable_raw_mode();
                None
            }
        }
    }

    fn stop_requested(&mut self) -> bool {
        self.stop
    }
}

impl Drop for HostInterrupts {
    fn drop(&mut self) {
        if self.keyboard {
            disable_raw_mode();
        }
    }
}

/// Keyboard events that matter to the machine.
#[derive(Debug, PartialEq, Eq)]
enum Key {
    /// `Ctrl+C`
    Interrupt,
    /// Single-byte character code.
    Byte(u8),
}

impl TryFrom<KeyEvent> for Key {
    type Error = ();
    fn try_from(event: KeyEvent) -> Result<Self, Self::Error> {
        use KeyModifiers as Mod;

        if matches!(event.kind, KeyEventKind::Release) {
            return Err(());
        }

        let key = match (event.modifiers, event.code) {
            (Mod::CONTROL, KeyCode::Char('c')) => Key::Interrupt,
            (_, KeyCode::Enter) => Key::Byte(b'\n'),
            (_, KeyCode::Backspace) => Key::Byte(0x08),
            (_, KeyCode::Tab) => Key::Byte(b'\t'),
            (_, KeyCode::Esc) => Key::Byte(0x1b),
            (Mod::NONE | Mod::SHIFT, KeyCode::Char(ch)) if ch.is_ascii() => Key::Byte(ch as u8),
            _ => return Err(()),
        };
        Ok(key)
    }
}

/// Returns whether raw mode is now enabled.
fn enable_raw_mode() -> bool {
    match terminal::enable_raw_mode() {
        Ok(()) => true,
        Err(error) => {
            log::warn!("failed to enable raw terminal, keyboard disabled: {error}");
            false
        }
    }
}

fn disable_raw_mode() {
    if let Err(error) = terminal::disable_raw_mode() {
        log::warn!("failed to disable raw terminal: {error}");
    }
}
