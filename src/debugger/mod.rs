mod breakpoint;
mod command;
mod error;
mod parse;
mod print;
mod source;

use self::breakpoint::Breakpoints;
use self::command::{Command, Location};
use self::source::CommandSource;
use crate::fault::Fault;
use crate::flag::Flag;
use crate::isa::Opcode;
use crate::output::{self, Condition};
use crate::state::RunState;
use crate::dprintln;

/// ANSI color code of the command prompt.
const DEBUGGER_COLOR: u8 = 34;

/// Leave this as a struct, in case more options are added in the future. Plus it is more explicit.
#[derive(Debug)]
pub struct DebuggerOptions {
    pub command: Option<String>,
}

pub struct Debugger {
    /// Must not be mutated.
    initial_state: RunState,

    status: Status,
    command_source: CommandSource,

    breakpoints: Breakpoints,
    /// Used to allow breakpoint to be passed on second attempt.
    current_breakpoint: Option<u8>,

    /// Amount of instructions executed since last command.
    instruction_count: u32,
    /// Whether PC should be displayed on next command prompt.
    should_echo_pc: bool,
}

/// The current status of the debugger execution loop.
#[derive(Debug, Default)]
enum Status {
    /// Keep executing user commands, until one changes the debugger status.
    #[default]
    WaitForAction,
    /// Execute `count` more instructions after the current one.
    ///
    /// Stop execution early if breakpoint or `HLT` is reached.
    Step { count: u32 },
    /// Execute all instructions until breakpoint or `HLT` is reached.
    Continue,
}

/// An action, which the debugger passes to the runtime loop.
#[derive(Debug, PartialEq, Eq)]
pub enum Action {
    /// Keep executing as normal (with the debugger active).
    Proceed,
    /// Disable the debugger, keep executing.
    StopDebugger,
    /// Exit the entire program.
    ExitProgram,
}

impl Debugger {
    pub(crate) fn new(opts: DebuggerOptions, initial_state: RunState) -> Self {
        Self {
            initial_state,

            status: Status::default(),
            command_source: CommandSource::new(opts.command),

            breakpoints: Breakpoints::default(),
            current_breakpoint: None,

            instruction_count: 0,
            should_echo_pc: true,
        }
    }

    /// Called before every instruction. Blocks on user commands while paused.
    pub(crate) fn wait_for_action(&mut self, state: &mut RunState) -> Action {
        let pc = state.pc();
        let is_halt = state.mem().read(pc as usize).ok() == Some(Opcode::Hlt.byte());
        self.check_pause(pc, is_halt);

        loop {
            match &mut self.status {
                Status::WaitForAction => {
                    // Continue loop until action is given
                    if let Some(action) = self.next_action(state) {
                        return action;
                    }
                }
                Status::Step { count } => {
                    if *count > 0 {
                        *count -= 1;
                    } else {
                        self.status = Status::WaitForAction;
                    }
                    return Action::Proceed;
                }
                Status::Continue => return Action::Proceed,
            }
        }
    }

    /// Pause on a breakpoint or `HLT`.
    fn check_pause(&mut self, pc: u8, is_halt: bool) {
        // Remember if previous cycle paused on the same breakpoint. If so, don't break now.
        if self.breakpoints.contains(pc) && self.current_breakpoint != Some(pc) {
            dprintln!(Always, "Reached breakpoint at 0x{:02x}. Pausing execution.", pc);
            self.current_breakpoint = Some(pc);
            self.status = Status::WaitForAction;
            return;
        }
        self.current_breakpoint = None;
        if is_halt && !matches!(self.status, Status::WaitForAction) {
            dprintln!(Always, "Reached HLT. Pausing execution.");
            self.status = Status::WaitForAction;
        }
    }

    fn next_action(&mut self, state: &mut RunState) -> Option<Action> {
        output::start_new_line();

        if self.should_echo_pc {
            dprintln!(Sometimes, "Program counter at: 0x{:02x}.", state.pc());
            self.should_echo_pc = false;
        }
        if self.instruction_count > 0 {
            dprintln!(
                Always,
                "Executed {} instruction{}.",
                self.instruction_count,
                if self.instruction_count == 1 { "" } else { "s" },
            );
            self.instruction_count = 0;
        }

        // Convert `EOF` to `quit` command
        let command = self.next_command().unwrap_or(Command::Quit);

        match command {
            Command::Quit => return Some(Action::StopDebugger),
            Command::Exit => return Some(Action::ExitProgram),

            Command::Help => {
                dprintln!(Always, "\n{}", include_str!("./help.txt"));
            }

            Command::Continue => {
                self.status = Status::Continue;
                self.should_echo_pc = true;
                dprintln!(Sometimes, "Continuing...");
            }
            Command::Step { count } => {
                self.status = Status::Step { count: count - 1 };
                self.should_echo_pc = true;
            }

            Command::Get { location } => match read_location(state, location) {
                Ok(value) => {
                    dprintln!(Sometimes, "{}:", describe(location));
                    print::print_value(value);
                }
                Err(fault) => dprintln!(Always, "{}", fault),
            },
            Command::Set { location, value } => match write_location(state, location, value) {
                Ok(()) => {
                    if location == Location::ProgramCounter {
                        self.should_echo_pc = true;
                    }
                    dprintln!(Always, "Updated {}.", describe(location));
                }
                Err(fault) => dprintln!(Always, "{}", fault),
            },

            Command::Jump { address } => {
                *state.pc_mut() = address;
                self.should_echo_pc = true;
                dprintln!(Always, "Set program counter to 0x{:02x}.", address);
            }

            Command::Registers => {
                dprintln!(Sometimes, "Registers:");
                output::print_registers(state);
            }

            Command::Memory { address, len } => {
                print::print_memory(state, address, len);
            }
            Command::List { address, count } => {
                print::print_listing(state, address.unwrap_or(state.pc()), count);
            }

            Command::Reset => {
                *state = self.initial_state.clone();
                self.should_echo_pc = true;
                dprintln!(Always, "Reset program to initial state.");
            }

            Command::BreakAdd { address } => {
                let address = address.unwrap_or(state.pc());
                if self.breakpoints.insert(address) {
                    dprintln!(Always, "Added breakpoint at 0x{:02x}.", address);
                } else {
                    dprintln!(Always, "Breakpoint already exists at 0x{:02x}.", address);
                }
            }
            Command::BreakRemove { address } => {
                let address = address.unwrap_or(state.pc());
                if self.breakpoints.remove(address) {
                    dprintln!(Always, "Removed breakpoint at 0x{:02x}.", address);
                } else {
                    dprintln!(Always, "No breakpoint exists at 0x{:02x}.", address);
                }
            }
            Command::BreakList => {
                if self.breakpoints.is_empty() {
                    dprintln!(Always, "No breakpoints exist.");
                } else {
                    dprintln!(Sometimes, "Breakpoints:");
                    for address in self.breakpoints.iter() {
                        dprintln!(Always, "0x{:02x}", address);
                    }
                }
            }
        }

        None
    }

    /// Returns `None` on EOF.
    fn next_command(&mut self) -> Option<Command> {
        // Loop until valid command or EOF
        loop {
            let line = self.command_source.next()?;
            match Command::try_from(line.as_str()) {
                Ok(command) => return Some(command),
                Err(error) => {
                    dprintln!(Always, "{}", error);
                    output::print_debug(Condition::Sometimes, "Type `help` for a list of commands.\n");
                }
            }
        }
    }

    pub(crate) fn increment_instruction_count(&mut self) {
        self.instruction_count += 1;
    }
}

fn read_location(state: &RunState, location: Location) -> Result<u8, Fault> {
    match location {
        Location::Register(index) => state.reg().get(index),
        Location::ProgramCounter => Ok(state.pc()),
        Location::Flag => Ok(state.flag().bits()),
        Location::InService => Ok(state.in_service() as u8),
        Location::Memory(address) => state.mem().read(address as usize),
    }
}

fn write_location(state: &mut RunState, location: Location, value: u8) -> Result<(), Fault> {
    match location {
        Location::Register(index) => state.reg_mut().set(index, value)?,
        Location::ProgramCounter => *state.pc_mut() = value,
        Location::Flag => *state.flag_mut() = Flag::from_bits(value),
        Location::InService => state.set_in_service(value != 0),
        Location::Memory(address) => state.mem_mut().write(address as usize, value)?,
    }
    Ok(())
}

fn describe(location: Location) -> String {
    match location {
        Location::Register(index) => format!("register R{}", index),
        Location::ProgramCounter => "program counter".to_string(),
        Location::Flag => "flag".to_string(),
        Location::InService => "interrupt latch".to_string(),
        Location::Memory(address) => format!("memory at address 0x{:02x}", address),
    }
}
