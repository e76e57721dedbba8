use std::io;
use std::ops::Range;

use miette::{miette, LabeledSpan, NamedSource, Report, Severity};

use crate::fault::Fault;
use crate::memory::MEMORY_SIZE;

// Loader errors

pub fn load_bad_literal(span: Range<usize>, src: NamedSource<String>) -> Report {
    miette!(
        severity = Severity::Error,
        code = "load::bad_literal",
        help = "program lines start with exactly 8 binary digits, like 10000010",
        labels = vec![LabeledSpan::at(span, "not an 8-bit binary literal")],
        "Encountered an invalid byte literal",
    )
    .with_source_code(src)
}

pub fn load_too_long(span: Range<usize>, src: NamedSource<String>, len: usize) -> Report {
    miette!(
        severity = Severity::Error,
        code = "load::too_long",
        help = format!("the machine has {MEMORY_SIZE} bytes of memory, including the stack"),
        labels = vec![LabeledSpan::at(span, "first byte that does not fit")],
        "Program is {len} bytes long, which does not fit in memory",
    )
    .with_source_code(src)
}

// Runtime errors

/// Front-end report for a fault, once the machine state has been printed.
pub fn run_fault(fault: &Fault, pc: u8) -> Report {
    miette!(
        severity = Severity::Error,
        code = fault.code(),
        help = "run again with --trace or use `ls8 debug` to inspect the machine",
        "Machine faulted at 0x{pc:02x}: {fault}",
    )
}

pub fn run_output_failed(error: Option<io::Error>, steps: u64) -> Report {
    let reason = error.map_or_else(|| "unknown error".to_string(), |error| error.to_string());
    miette!(
        severity = Severity::Error,
        code = "run::output_failed",
        "Could not write program output after {steps} steps: {reason}",
    )
}
