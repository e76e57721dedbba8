use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use colored::Colorize;
use miette::{IntoDiagnostic, Result};

use ls8::{disasm, error, output};
use ls8::{Console, DebuggerOptions, Exit, HostInterrupts, Program, RunEnvironment};

/// ls8 is an emulator for the LS-8, a small 8-bit computer with 256 bytes of memory.
#[derive(Parser)]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Quickly provide a `.ls8` file to run
    path: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Run a `.ls8` program and output to terminal
    Run {
        /// `.ls8` file to run
        name: PathBuf,
        /// Produce minimal output, suited for blackbox tests
        #[arg(short, long)]
        minimal: bool,
        /// Print machine state before every instruction
        #[arg(short, long)]
        trace: bool,
        /// Stop after this many instructions
        #[arg(long, value_name = "N")]
        max_steps: Option<u64>,
        /// Do not capture the keyboard, even in an interactive terminal
        #[arg(long)]
        no_keyboard: bool,
    },
    /// Run a `.ls8` program with the debugger
    Debug {
        /// `.ls8` file to run
        name: PathBuf,
        /// Read debugger commands from argument
        #[arg(short, long)]
        command: Option<String>,
        /// Produce minimal output, suited for blackbox tests
        #[arg(short, long)]
        minimal: bool,
    },
    /// Check a `.ls8` file without running it
    Check {
        /// File to check
        name: PathBuf,
    },
    /// Print the instructions of a `.ls8` file
    Disasm {
        /// File to disassemble
        name: PathBuf,
    },
}

/// Everything `run` and `debug` need besides the program.
#[derive(Default)]
struct RunOptions {
    minimal: bool,
    trace: bool,
    max_steps: Option<u64>,
    no_keyboard: bool,
    debugger: Option<DebuggerOptions>,
}

fn main() -> miette::Result<()> {
    use MsgColor::*;
    let args = Args::parse();
    env_logger::init();
    ls8::env::init();

    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new() //
                .context_lines(ls8::DIAGNOSTIC_CONTEXT_LINES)
                .build(),
        )
    }))?;

    let Some(command) = args.command else {
        if let Some(path) = args.path {
            return run(&path, RunOptions::default());
        }
        println!("\n~ ls8 v{VERSION} ~");
        println!("{}", LOGO.truecolor(120, 200, 255).bold());
        println!("{SHORT_INFO}");
        std::process::exit(0);
    };

    match command {
        Command::Run {
            name,
            minimal,
            trace,
            max_steps,
            no_keyboard,
        } => run(
            &name,
            RunOptions {
                minimal,
                trace,
                max_steps,
                no_keyboard,
                debugger: None,
            },
        ),
        Command::Debug {
            name,
            command,
            minimal,
        } => run(
            &name,
            RunOptions {
                minimal,
                debugger: Some(DebuggerOptions { command }),
                ..Default::default()
            },
        ),
        Command::Check { name } => {
            file_message(Green, "Checking", &name);
            let program = Program::from_file(&name)?;
            let instructions = disasm::listing(program.bytes()).len();
            message(
                Green,
                "Success",
                &format!(
                    "{} bytes, {} instructions",
                    program.len(),
                    instructions
                ),
            );
            Ok(())
        }
        Command::Disasm { name } => {
            let program = Program::from_file(&name)?;
            for (address, instr) in disasm::listing(program.bytes()) {
                let size = instr.size() as usize;
                let start = address as usize;
                let end = (start + size).min(program.len());
                let bytes = program.bytes()[start..end]
                    .iter()
                    .map(|byte| format!("{:02x}", byte))
                    .collect::<Vec<_>>()
                    .join(" ");
                println!("0x{:02x}  {:<8}  {}", address, bytes, instr);
            }
            Ok(())
        }
    }
}

#[allow(unused)]
enum MsgColor {
    Green,
    Cyan,
    Red,
}

fn file_message(color: MsgColor, left: &str, right: &Path) {
    let right = format!("target {}", right.display());
    message(color, left, &right);
}

fn message(color: MsgColor, left: &str, right: &str) {
    if output::is_minimal() {
        return;
    }
    let left = match color {
        MsgColor::Green => left.green(),
        MsgColor::Cyan => left.cyan(),
        MsgColor::Red => left.red(),
    };
    println!("{left:>12} {right}");
}

fn run(name: &Path, opts: RunOptions) -> Result<()> {
    use MsgColor::*;
    output::set_minimal(opts.minimal);

    file_message(Green, "Loading", name);
    let program = Program::from_file(name)?;

    // The debugger reads commands from the terminal, so the keyboard stays with it
    let capture_keyboard =
        !opts.no_keyboard && !ls8::env::is_keyboard_disabled() && opts.debugger.is_none();

    message(Green, "Running", &format!("{} bytes", program.len()));
    let result = {
        let interrupts = HostInterrupts::new(capture_keyboard);
        let console = Console::stdout(interrupts.is_capturing());
        let mut env =
            RunEnvironment::new(program.bytes(), console, Box::new(interrupts)).into_diagnostic()?;
        env.set_trace(opts.trace || ls8::env::is_trace_enabled());
        env.set_max_steps(opts.max_steps);
        if let Some(debugger_opts) = opts.debugger {
            env.attach_debugger(debugger_opts);
        }

        // Terminal leaves raw mode when `env` is dropped, so report after this block
        let result = match env.run() {
            Ok(exit) => Ok((exit, env.steps(), env.take_output_error())),
            Err(fault) => Err((fault, env.state().clone())),
        };
        result
    };

    match result {
        Ok((Exit::Halted, steps, _)) => message(Green, "Halted", &format!("after {steps} steps")),
        Ok((Exit::StepLimit, steps, _)) => {
            message(Cyan, "Stopped", &format!("step limit reached after {steps} steps"))
        }
        Ok((Exit::Stopped, _, _)) => message(Cyan, "Stopped", "interrupted from keyboard"),
        Ok((Exit::Exited, _, _)) => message(Cyan, "Exited", "from debugger"),
        Ok((Exit::OutputFailed, steps, output_error)) => {
            return Err(error::run_output_failed(output_error, steps));
        }
        Err((fault, state)) => {
            output::print_fault(&state, &fault);
            return Err(error::run_fault(&fault, state.pc()));
        }
    }

    file_message(Green, "Completed", name);
    Ok(())
}

const LOGO: &str = r#"
  _      ____    ___
 | |    / ___|  ( _ )
 | |    \___ \  / _ \
 | |___  ___) || (_) |
 |_____||____/  \___/ "#;

const SHORT_INFO: &str = r"
Welcome to ls8, an emulator for the LS-8 8-bit computer.
Please use `-h` or `--help` to access the usage instructions.
";

const VERSION: &str = env!("CARGO_PKG_VERSION");
