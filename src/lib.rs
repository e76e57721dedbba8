// Machine
pub mod fault;
pub use fault::{Access, Fault};
pub mod memory;
pub use memory::Memory;
pub mod registers;
pub use registers::{Register, Registers};
pub mod flag;
pub use flag::Flag;
pub mod isa;
pub use isa::{Instruction, Opcode};
mod alu;
pub mod state;
pub use state::RunState;
pub mod interrupt;
pub use interrupt::{InterruptSource, NoInterrupts, ScriptedInterrupts};

// Loading
mod loader;
pub use loader::Program;
pub mod disasm;

// Running
mod runtime;
pub use runtime::{Exit, RunEnvironment, Step};
#[macro_use]
pub mod output;
pub use output::Console;
mod debugger;
pub use debugger::DebuggerOptions;
mod term;
pub use term::HostInterrupts;

pub mod error;

pub mod env;

/// Amount of lines to show as context, each side of focus line (line containing span).
pub const DIAGNOSTIC_CONTEXT_LINES: usize = 8;
