use std::io::{self, Write};

use crate::alu;
use crate::debugger::{Action, Debugger, DebuggerOptions};
use crate::fault::Fault;
use crate::interrupt::{self, InterruptSource};
use crate::isa::Opcode;
use crate::output::{self, Console};
use crate::state::RunState;

/// Why the run loop stopped without a fault.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Exit {
    /// `HLT` was executed.
    Halted,
    /// Step budget used up.
    StepLimit,
    /// Interrupt source asked to stop.
    Stopped,
    /// Debugger `exit` command.
    Exited,
    /// `PRN` or `PRA` could not write to the console, eg. a closed pipe.
    OutputFailed,
}

/// Outcome of a single instruction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Step {
    Continue,
    Halt,
}

/// Where PC goes after an instruction.
enum Flow {
    /// Advance by the instruction size.
    Next,
    /// Instruction set PC itself.
    Jump(u8),
    Halt,
}

/// Machine plus everything it talks to: interrupt sources, console, debugger.
pub struct RunEnvironment<W: Write = io::Stdout> {
    state: RunState,
    interrupts: Box<dyn InterruptSource>,
    console: Console<W>,
    debugger: Option<Debugger>,
    trace: bool,
    max_steps: Option<u64>,
    steps: u64,
    output_error: Option<io::Error>,
}

impl<W: Write> RunEnvironment<W> {
    pub fn new(
        program: &[u8],
        console: Console<W>,
        interrupts: Box<dyn InterruptSource>,
    ) -> Result<Self, Fault> {
        Ok(RunEnvironment {
            state: RunState::from_raw(program)?,
            interrupts,
            console,
            debugger: None,
            trace: false,
            max_steps: None,
            steps: 0,
            output_error: None,
        })
    }

    /// Must only be called once.
    pub fn attach_debugger(&mut self, opts: DebuggerOptions) {
        debug_assert!(self.debugger.is_none(), "debugger attached twice");
        self.debugger = Some(Debugger::new(opts, self.state.clone()));
    }

    /// Print a `TRACE:` line before every instruction.
    pub fn set_trace(&mut self, trace: bool) {
        self.trace = trace;
    }

    /// Stop after this many cycles. `None` runs until halt.
    pub fn set_max_steps(&mut self, max_steps: Option<u64>) {
        self.max_steps = max_steps;
    }

    pub fn state(&self) -> &RunState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut RunState {
        &mut self.state
    }

    pub fn console(&self) -> &Console<W> {
        &self.console
    }

    /// Instructions executed so far.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Why the run ended with [`Exit::OutputFailed`].
    pub fn take_output_error(&mut self) -> Option<io::Error> {
        self.output_error.take()
    }

    /// Run until halt, fault, step budget, stop request, debugger exit or
    /// failed console write.
    ///
    /// On a fault, machine state is left untouched for inspection. Reporting it
    /// is up to the caller, see [`output::print_fault`].
    pub fn run(&mut self) -> Result<Exit, Fault> {
        let result = self.run_loop();
        if let Err(fault) = &result {
            log::warn!("machine faulted at 0x{:02x}: {fault}", self.state.pc());
        }
        result
    }

    fn run_loop(&mut self) -> Result<Exit, Fault> {
        loop {
            if self.interrupts.stop_requested() {
                return Ok(Exit::Stopped);
            }
            if self.max_steps.is_some_and(|max| self.steps >= max) {
                return Ok(Exit::StepLimit);
            }
            if let Some(exit) = self.cycle()? {
                return Ok(exit);
            }
        }
    }

    /// One full cycle: interrupts, debugger, fetch-decode-execute.
    fn cycle(&mut self) -> Result<Option<Exit>, Fault> {
        interrupt::poll(&mut self.state, self.interrupts.as_mut())?;

        if let Some(debugger) = &mut self.debugger {
            match debugger.wait_for_action(&mut self.state) {
                Action::Proceed => debugger.increment_instruction_count(),
                Action::StopDebugger => self.debugger = None,
                Action::ExitProgram => return Ok(Some(Exit::Exited)),
            }
        }

        if self.trace {
            output::print_trace(&self.state);
        }
        let step = self.step()?;
        self.steps += 1;
        if let Some(error) = &self.output_error {
            log::warn!("stopping, console write failed: {error}");
            return Ok(Some(Exit::OutputFailed));
        }
        Ok(match step {
            Step::Continue => None,
            Step::Halt => Some(Exit::Halted),
        })
    }

    /// Execute the instruction at PC, without polling interrupts.
    pub fn step(&mut self) -> Result<Step, Fault> {
        let instr = self.state.fetch()?;
        let opcode = instr.decode()?;
        let (a, b) = (instr.a, instr.b);
        let pc = self.state.pc();
        let state = &mut self.state;

        let flow = match opcode {
            op if op.is_alu() => {
                let (reg, flag) = state.alu_parts();
                alu::execute(op, reg, flag, a, b)?;
                Flow::Next
            }
            Opcode::Ldi => {
                state.reg_mut().set(a, b)?;
                Flow::Next
            }
            Opcode::Ld => {
                let address = state.reg().get(b)?;
                let value = state.mem().read(address as usize)?;
                state.reg_mut().set(a, value)?;
                Flow::Next
            }
            Opcode::St => {
                let address = state.reg().get(a)?;
                let value = state.reg().get(b)?;
                state.mem_mut().write(address as usize, value)?;
                Flow::Next
            }
            Opcode::Prn => {
                let value = state.reg().get(a)?;
                if let Err(error) = self.console.print_decimal(value) {
                    self.output_error = Some(error);
                }
                Flow::Next
            }
            Opcode::Pra => {
                let value = state.reg().get(a)?;
                if let Err(error) = self.console.print_char(value as char) {
                    self.output_error = Some(error);
                }
                Flow::Next
            }
            Opcode::Push => {
                let value = state.reg().get(a)?;
                state.push(value)?;
                Flow::Next
            }
            Opcode::Pop => {
                // Check destination first, so a bad index does not eat a stack entry
                state.reg().get(a)?;
                let value = state.pop()?;
                state.reg_mut().set(a, value)?;
                Flow::Next
            }
            Opcode::Call => {
                let target = state.reg().get(a)?;
                state.push(pc.wrapping_add(instr.size()))?;
                Flow::Jump(target)
            }
            Opcode::Ret => Flow::Jump(state.pop()?),
            Opcode::Iret => {
                interrupt::return_from_interrupt(state)?;
                Flow::Jump(state.pc())
            }
            Opcode::Jmp => Flow::Jump(state.reg().get(a)?),
            Opcode::Jeq | Opcode::Jne => {
                let target = state.reg().get(a)?;
                let equal = state.flag().is_equal();
                if equal == (opcode == Opcode::Jeq) {
                    Flow::Jump(target)
                } else {
                    Flow::Next
                }
            }
            Opcode::Hlt => Flow::Halt,
            // ALU opcodes are all caught by the guard above
            _ => return Err(Fault::UnsupportedOperation { opcode: instr.opcode }),
        };

        let next = pc.wrapping_add(instr.size());
        match flow {
            Flow::Next => *state.pc_mut() = next,
            Flow::Jump(target) => {
                debug_assert!(instr.sets_pc());
                *state.pc_mut() = target;
            }
            Flow::Halt => {
                *state.pc_mut() = next;
                return Ok(Step::Halt);
            }
        }
        Ok(Step::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fault::Access;
    use crate::interrupt::{Event, NoInterrupts, ScriptedInterrupts};
    use crate::memory::{STACK_BASE, VECTOR_TABLE};
    use crate::registers::Register;

    type TestEnvironment = RunEnvironment<Vec<u8>>;

    fn env(program: &[u8]) -> TestEnvironment {
        RunEnvironment::new(program, Console::new(Vec::new(), false), Box::new(NoInterrupts))
            .unwrap()
    }

    fn env_with(program: &[u8], events: Vec<Event>) -> TestEnvironment {
        RunEnvironment::new(
            program,
            Console::new(Vec::new(), false),
            Box::new(ScriptedInterrupts::new(events)),
        )
        .unwrap()
    }

    fn printed(env: &TestEnvironment) -> String {
        String::from_utf8(env.console().get_ref().clone()).unwrap()
    }

    #[test]
    fn halt_only_program() {
        let mut env = env(&[0x01]);
        let before = env.state().clone();
        assert_eq!(env.run(), Ok(Exit::Halted));
        assert_eq!(env.steps(), 1);
        assert_eq!(printed(&env), "");
        assert_eq!(env.state().reg(), before.reg());
        assert_eq!(env.state().mem().slice(0, 256), before.mem().slice(0, 256));
    }

    #[test]
    fn print_ten() {
        let mut env = env(&[0x82, 0x00, 0x0a, 0x47, 0x00, 0x01]);
        assert_eq!(env.run(), Ok(Exit::Halted));
        assert_eq!(printed(&env), "10\n");
        assert_eq!(env.steps(), 3);
    }

    #[test]
    fn print_alpha() {
        let mut env = env(&[0x82, 0x02, b'H', 0x48, 0x02, 0x82, 0x02, b'i', 0x48, 0x02, 0x01]);
        env.run().unwrap();
        assert_eq!(printed(&env), "Hi");
    }

    #[test]
    fn pc_delta_matches_size() {
        for opcode in Opcode::ALL.into_iter().filter(|op| !op.sets_pc()) {
            // Operands: R0, R1 (or literal 1)
            let mut env = env(&[opcode.byte(), 0x00, 0x01]);
            env.state_mut().reg_mut().set(0, 0x40).unwrap();
            env.state_mut().reg_mut().set(1, 3).unwrap();
            // Something on the stack for `POP`
            env.state_mut().push(9).unwrap();

            env.step()
                .unwrap_or_else(|fault| panic!("{:?} faulted: {}", opcode, fault));
            assert_eq!(
                env.state().pc(),
                opcode.operand_count() + 1,
                "PC delta for {:?}",
                opcode
            );
        }
    }

    #[test]
    fn arithmetic_program_wraps() {
        #[rustfmt::skip]
        let program = [
            0x82, 0x00, 0xff, // LDI R0, 255
            0x65, 0x00,       // INC R0
            0x82, 0x01, 0x10, // LDI R1, 16
            0x82, 0x02, 0x11, // LDI R2, 17
            0xa2, 0x01, 0x02, // MUL R1, R2
            0x01,             // HLT
        ];
        let mut env = env(&program);
        env.run().unwrap();
        assert_eq!(env.state().reg().get(0), Ok(0));
        assert_eq!(env.state().reg().get(1), Ok(16));
    }

    #[test]
    fn push_pop_other_register() {
        #[rustfmt::skip]
        let program = [
            0x82, 0x00, 0x2a, // LDI R0, 42
            0x45, 0x00,       // PUSH R0
            0x46, 0x03,       // POP R3
            0x01,             // HLT
        ];
        let mut env = env(&program);
        env.run().unwrap();
        assert_eq!(env.state().reg().get(3), Ok(42));
        assert_eq!(env.state().reg().sp(), STACK_BASE);
    }

    #[test]
    fn call_returns_after_call() {
        #[rustfmt::skip]
        let program = [
            0x82, 0x01, 0x10, // 00: LDI R1, 0x10
            0x50, 0x01,       // 03: CALL R1
            0x47, 0x00,       // 05: PRN R0
            0x01,             // 07: HLT
            0, 0, 0, 0, 0, 0, 0, 0,
            0x82, 0x00, 0x07, // 10: LDI R0, 7
            0x11,             // 13: RET
        ];
        let mut env = env(&program);

        env.step().unwrap();
        env.step().unwrap();
        assert_eq!(env.state().pc(), 0x10);
        assert_eq!(env.state().mem().read(STACK_BASE as usize - 1), Ok(0x05));
        env.step().unwrap();
        env.step().unwrap();
        assert_eq!(env.state().pc(), 0x05);
        assert_eq!(env.state().reg().sp(), STACK_BASE);

        assert_eq!(env.run(), Ok(Exit::Halted));
        assert_eq!(printed(&env), "7\n");
    }

    #[test]
    fn conditional_jumps() {
        #[rustfmt::skip]
        let program = [
            0x82, 0x00, 0x05, // 00: LDI R0, 5
            0x82, 0x01, 0x05, // 03: LDI R1, 5
            0x82, 0x02, 0x14, // 06: LDI R2, 0x14
            0xa7, 0x00, 0x01, // 09: CMP R0, R1
            0x56, 0x02,       // 0c: JNE R2 (not taken)
            0x55, 0x02,       // 0e: JEQ R2 (taken)
            0x47, 0x00,       // 10: PRN R0 (skipped)
            0x01,             // 12: HLT
            0x00,
            0x47, 0x01,       // 14: PRN R1
            0x01,             // 16: HLT
        ];
        let mut env = env(&program);
        assert_eq!(env.run(), Ok(Exit::Halted));
        assert_eq!(printed(&env), "5\n");
        assert_eq!(env.state().pc(), 0x17);
        assert_eq!(env.steps(), 8);
    }

    #[test]
    fn divide_by_zero_faults() {
        #[rustfmt::skip]
        let program = [
            0x82, 0x00, 0x09, // LDI R0, 9
            0xa3, 0x00, 0x01, // DIV R0, R1
            0x01,
        ];
        let mut env = env(&program);
        assert_eq!(env.run(), Err(Fault::DivisionByZero { register: 1 }));
        assert_eq!(env.state().pc(), 0x03);
        assert_eq!(env.state().reg().get(0), Ok(9));
    }

    #[test]
    fn unsupported_instruction_faults() {
        let mut env = env(&[0x00]);
        assert_eq!(
            env.run(),
            Err(Fault::UnsupportedInstruction { opcode: 0x00 })
        );
        let mut env = env_with(&[0xbf], vec![]);
        assert_eq!(env.run(), Err(Fault::UnsupportedOperation { opcode: 0xbf }));
    }

    #[test]
    fn bad_register_operand_faults() {
        let mut env = env(&[0x82, 0x08, 0x01]);
        assert_eq!(env.run(), Err(Fault::OutOfRange(Access::Register(8))));
    }

    #[test]
    fn step_budget() {
        #[rustfmt::skip]
        let program = [
            0x82, 0x00, 0x00, // LDI R0, 0
            0x54, 0x00,       // JMP R0
        ];
        let mut env = env(&program);
        env.set_max_steps(Some(10));
        assert_eq!(env.run(), Ok(Exit::StepLimit));
        assert_eq!(env.steps(), 10);
    }

    #[test]
    fn stop_request() {
        let program = [0x82, 0x00, 0x00, 0x54, 0x00];
        let mut env = env_with(&program, vec![Event::quiet(), Event::quiet(), Event::stop()]);
        assert_eq!(env.run(), Ok(Exit::Stopped));
        assert_eq!(env.steps(), 2);
    }

    #[test]
    fn two_pending_lines_in_priority_order() {
        let mut program = [0u8; 256];
        #[rustfmt::skip]
        let main = [
            0x82, 0x05, 0x24, // 00: LDI R5, 0b0010_0100
            0x82, 0x06, 0x24, // 03: LDI R6, 0b0010_0100
            0x01,             // 06: HLT
        ];
        // Line 2: record pending register
        #[rustfmt::skip]
        let handler_2 = [
            0x82, 0x00, 0x40, // LDI R0, 0x40
            0x84, 0x00, 0x06, // ST R0, R6
            0x13,             // IRET
        ];
        // Line 5: record pending register, and what line 2 recorded
        #[rustfmt::skip]
        let handler_5 = [
            0x82, 0x00, 0x41, // LDI R0, 0x41
            0x84, 0x00, 0x06, // ST R0, R6
            0x82, 0x00, 0x40, // LDI R0, 0x40
            0x83, 0x02, 0x00, // LD R2, R0
            0x82, 0x00, 0x42, // LDI R0, 0x42
            0x84, 0x00, 0x02, // ST R0, R2
            0x13,             // IRET
        ];
        program[..main.len()].copy_from_slice(&main);
        program[0x10..0x10 + handler_2.len()].copy_from_slice(&handler_2);
        program[0x20..0x20 + handler_5.len()].copy_from_slice(&handler_5);
        program[VECTOR_TABLE as usize + 2] = 0x10;
        program[VECTOR_TABLE as usize + 5] = 0x20;

        let mut env = env(&program);
        assert_eq!(env.run(), Ok(Exit::Halted));

        let mem = env.state().mem();
        // Line 2 ran first, while line 5 was still pending
        assert_eq!(mem.read(0x40), Ok(0b0010_0000));
        // Line 5 ran second, after line 2 had finished
        assert_eq!(mem.read(0x41), Ok(0));
        assert_eq!(mem.read(0x42), Ok(0b0010_0000));
        assert_eq!(env.state().reg().pending(), 0);
        assert_eq!(env.state().reg().sp(), STACK_BASE);
        assert_eq!(env.state().pc(), 0x07);
    }

    #[test]
    fn timer_interrupt_handler() {
        let mut program = [0u8; 256];
        #[rustfmt::skip]
        let main = [
            0x82, 0x05, 0x01, // 00: LDI R5, 1 (timer only)
            0x82, 0x00, 0x03, // 03: LDI R0, 3
            0x82, 0x01, 0x0c, // 06: LDI R1, 0x0c
            0x54, 0x01,       // 09: JMP R1
            0x00,             // 0b: (unused)
            0x47, 0x00,       // 0c: PRN R0
            0x01,             // 0e: HLT
        ];
        #[rustfmt::skip]
        let handler = [
            0x82, 0x00, 0x54, // 30: LDI R0, 'T'
            0x48, 0x00,       // 33: PRA R0
            0x13,             // 35: IRET
        ];
        program[..main.len()].copy_from_slice(&main);
        program[0x30..0x30 + handler.len()].copy_from_slice(&handler);
        program[VECTOR_TABLE as usize] = 0x30;

        // Timer fires while R0 holds 3; the handler's R0 must not leak out
        let events = vec![Event::quiet(), Event::quiet(), Event::tick()];
        let mut env = env_with(&program, events);
        assert_eq!(env.run(), Ok(Exit::Halted));
        assert_eq!(printed(&env), "T3\n");
        assert_eq!(env.state().reg().get(Register::IS), Ok(0));
    }

    struct ClosedPipe;

    impl Write for ClosedPipe {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::ErrorKind::BrokenPipe.into())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn closed_console_stops_run() {
        #[rustfmt::skip]
        let program = [
            0x82, 0x01, 0x03, // 00: LDI R1, 3
            0x47, 0x00,       // 03: PRN R0
            0x54, 0x01,       // 05: JMP R1
        ];
        let mut env = RunEnvironment::new(
            &program,
            Console::new(ClosedPipe, false),
            Box::new(NoInterrupts),
        )
        .unwrap();
        assert_eq!(env.run(), Ok(Exit::OutputFailed));
        assert_eq!(env.steps(), 2);
        // PRN itself completed
        assert_eq!(env.state().pc(), 0x05);
        let error = env.take_output_error().unwrap();
        assert_eq!(error.kind(), io::ErrorKind::BrokenPipe);
    }

    #[test]
    fn fault_leaves_state() {
        // POP with nothing on the stack
        let mut env = env(&[0x82, 0x00, 0x07, 0x46, 0x00]);
        assert_eq!(env.run(), Err(Fault::StackUnderflow { sp: STACK_BASE }));
        assert_eq!(env.state().pc(), 0x03);
        assert_eq!(env.state().reg().get(0), Ok(7));
    }
}
