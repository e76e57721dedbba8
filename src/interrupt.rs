use std::collections::VecDeque;

use crate::fault::Fault;
use crate::flag::Flag;
use crate::memory::{KEYBOARD_CELL, VECTOR_TABLE};
use crate::registers::Register;
use crate::state::RunState;

/// Interrupt line raised by the timer, once per second.
pub const TIMER_LINE: u8 = 0;
/// Interrupt line raised when a key is pressed.
pub const KEYBOARD_LINE: u8 = 1;

/// Number of interrupt lines, one per bit of the status/mask registers.
pub const LINE_COUNT: u8 = 8;

/// External events polled once per cycle, before fetch.
pub trait InterruptSource {
    /// Whether the timer has ticked since the last poll.
    fn poll_timer_tick(&mut self) -> bool;

    /// Next key pressed since the last poll, if any. Must not block.
    fn poll_keyboard(&mut self) -> Option<u8>;

    /// Whether the host asked the machine to stop.
    fn stop_requested(&mut self) -> bool {
        false
    }
}

/// Source that never raises anything.
#[derive(Debug, Default)]
pub struct NoInterrupts;

impl InterruptSource for NoInterrupts {
    fn poll_timer_tick(&mut self) -> bool {
        false
    }

    fn poll_keyboard(&mut self) -> Option<u8> {
        None
    }
}

/// Replays a fixed list of events, one entry per poll.
///
/// Useful for driving the machine without a real clock or terminal.
#[derive(Debug, Default)]
pub struct ScriptedInterrupts {
    events: VecDeque<Event>,
}

/// What happens on a single poll of a [`ScriptedInterrupts`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Event {
    pub tick: bool,
    pub key: Option<u8>,
    pub stop: bool,
}

impl Event {
    pub fn quiet() -> Self {
        Self::default()
    }

    pub fn tick() -> Self {
        Event {
            tick: true,
            ..Self::default()
        }
    }

    pub fn key(key: u8) -> Self {
        Event {
            key: Some(key),
            ..Self::default()
        }
    }

    pub fn stop() -> Self {
        Event {
            stop: true,
            ..Self::default()
        }
    }
}

impl ScriptedInterrupts {
    pub fn new(events: impl IntoIterator<Item = Event>) -> Self {
        ScriptedInterrupts {
            events: events.into_iter().collect(),
        }
    }

    /// Poll order per cycle is: stop, timer, keyboard. The event is consumed on
    /// the keyboard poll, which always comes last.
    fn current(&self) -> Event {
        self.events.front().copied().unwrap_or_default()
    }
}

impl InterruptSource for ScriptedInterrupts {
    fn poll_timer_tick(&mut self) -> bool {
        self.current().tick
    }

    fn poll_keyboard(&mut self) -> Option<u8> {
        self.events.pop_front().and_then(|event| event.key)
    }

    fn stop_requested(&mut self) -> bool {
        self.current().stop
    }
}

/// Poll `source`, raise pending lines, and dispatch at most one interrupt.
///
/// Returns the line that was dispatched.
pub fn poll(state: &mut RunState, source: &mut dyn InterruptSource) -> Result<Option<u8>, Fault> {
    if source.poll_timer_tick() {
        raise(state, TIMER_LINE);
    }
    if let Some(key) = source.poll_keyboard() {
        state.mem_mut().write(KEYBOARD_CELL as usize, key)?;
        raise(state, KEYBOARD_LINE);
    }
    dispatch(state)
}

/// Mark `line` as pending.
pub fn raise(state: &mut RunState, line: u8) {
    debug_assert!(line < LINE_COUNT);
    let pending = state.reg().pending() | (1 << line);
    state.reg_mut().set_pending(pending);
}

/// Enter the handler of the lowest pending, enabled line.
///
/// Lower line number wins. Nothing is dispatched while another handler is still
/// in service.
pub fn dispatch(state: &mut RunState) -> Result<Option<u8>, Fault> {
    if state.in_service() {
        return Ok(None);
    }
    let masked = state.reg().pending() & state.reg().mask();
    if masked == 0 {
        return Ok(None);
    }
    let line = masked.trailing_zeros() as u8;

    // Saved R6 already has this line cleared
    let pending = state.reg().pending() & !(1 << line);
    state.reg_mut().set_pending(pending);

    state.push(state.pc())?;
    state.push(state.flag().bits())?;
    for index in 0..=Register::IS {
        let value = state.reg().get(index)?;
        state.push(value)?;
    }

    let handler = state.mem().read((VECTOR_TABLE + line) as usize)?;
    *state.pc_mut() = handler;
    state.set_in_service(true);
    log::debug!("dispatched interrupt line {line} to 0x{handler:02x}");
    Ok(Some(line))
}

/// Undo [`dispatch`]: restore R6..R0, the flag and PC.
pub fn return_from_interrupt(state: &mut RunState) -> Result<(), Fault> {
    for index in (0..=Register::IS).rev() {
        let value = state.pop()?;
        state.reg_mut().set(index, value)?;
    }
    let flag = state.pop()?;
    *state.flag_mut() = Flag::from_bits(flag);
    let pc = state.pop()?;
    *state.pc_mut() = pc;
    state.set_in_service(false);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::STACK_BASE;

    fn state_with_vectors() -> RunState {
        let mut state = RunState::new();
        for line in 0..LINE_COUNT {
            state
                .mem_mut()
                .write((VECTOR_TABLE + line) as usize, 0x10 * (line + 1))
                .unwrap();
        }
        state
    }

    #[test]
    fn masked_lines_stay_pending() -> Result<(), Fault> {
        let mut state = state_with_vectors();
        raise(&mut state, 3);
        assert_eq!(dispatch(&mut state)?, None);
        assert_eq!(state.reg().pending(), 0b1000);
        assert_eq!(state.pc(), 0);
        Ok(())
    }

    #[test]
    fn context_switch() -> Result<(), Fault> {
        let mut state = state_with_vectors();
        *state.pc_mut() = 0x33;
        *state.flag_mut() = Flag::compare(1, 2);
        for index in 0..5 {
            state.reg_mut().set(index, index + 100)?;
        }
        state.reg_mut().set(Register::IM, 0b0000_0100)?;
        raise(&mut state, 2);

        assert_eq!(dispatch(&mut state)?, Some(2));
        assert_eq!(state.pc(), 0x30);
        assert_eq!(state.reg().pending(), 0);
        assert_eq!(state.reg().sp(), STACK_BASE - 9);
        assert!(state.in_service());

        // Stack, from the top: PC, flag, R0..R6
        let stack = state.mem().slice(STACK_BASE as usize - 9, 9);
        assert_eq!(stack, &[0, 0b100, 104, 103, 102, 101, 100, Flag::LESS, 0x33]);

        // Handler clobbers registers, then returns
        for index in 0..=Register::IS {
            state.reg_mut().set(index, 0xee)?;
        }
        return_from_interrupt(&mut state)?;
        assert_eq!(state.pc(), 0x33);
        assert_eq!(state.flag(), Flag::compare(1, 2));
        assert_eq!(state.reg().get(0)?, 100);
        assert_eq!(state.reg().mask(), 0b100);
        assert_eq!(state.reg().pending(), 0);
        assert_eq!(state.reg().sp(), STACK_BASE);
        assert!(!state.in_service());
        Ok(())
    }

    #[test]
    fn lowest_line_wins() -> Result<(), Fault> {
        let mut state = state_with_vectors();
        state.reg_mut().set(Register::IM, 0b0010_0100)?;
        raise(&mut state, 5);
        raise(&mut state, 2);

        assert_eq!(dispatch(&mut state)?, Some(2));
        assert_eq!(state.reg().pending(), 0b0010_0000);
        // Nothing nests while line 2 is being handled
        assert_eq!(dispatch(&mut state)?, None);

        return_from_interrupt(&mut state)?;
        assert_eq!(state.reg().pending(), 0b0010_0000);
        assert_eq!(dispatch(&mut state)?, Some(5));
        assert_eq!(state.pc(), 0x60);
        Ok(())
    }

    #[test]
    fn sources_raise_lines() -> Result<(), Fault> {
        let mut state = RunState::new();
        let mut source = ScriptedInterrupts::new([Event::tick(), Event::key(b'x')]);

        assert_eq!(poll(&mut state, &mut source)?, None);
        assert_eq!(state.reg().pending(), 1 << TIMER_LINE);

        assert_eq!(poll(&mut state, &mut source)?, None);
        assert_eq!(state.reg().pending(), (1 << TIMER_LINE) | (1 << KEYBOARD_LINE));
        assert_eq!(state.mem().read(KEYBOARD_CELL as usize)?, b'x');

        // Script exhausted
        assert_eq!(poll(&mut state, &mut source)?, None);
        assert!(!source.stop_requested());
        Ok(())
    }

    #[test]
    fn keyboard_dispatch() -> Result<(), Fault> {
        let mut state = state_with_vectors();
        state.reg_mut().set(Register::IM, 1 << KEYBOARD_LINE)?;
        let mut source = ScriptedInterrupts::new([Event::key(b'q')]);
        assert_eq!(poll(&mut state, &mut source)?, Some(KEYBOARD_LINE));
        assert_eq!(state.pc(), 0x20);
        Ok(())
    }

    #[test]
    fn dispatch_overflows_small_stack() {
        let mut state = state_with_vectors();
        state.reg_mut().set_sp(4);
        state.reg_mut().set(Register::IM, 1).unwrap();
        raise(&mut state, 0);
        assert_eq!(dispatch(&mut state), Err(Fault::StackOverflow));
    }
}
