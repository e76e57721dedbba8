use assert_cmd::Command;
use predicates::str::{contains, diff};

fn debug(file: &str, commands: &str) -> Command {
    let mut cmd = Command::cargo_bin("ls8").unwrap();
    cmd.env_remove("LS8_TRACE")
        .env_remove("RUST_LOG")
        .arg("debug")
        .arg(file)
        .arg("--minimal")
        .arg("--command")
        .arg(commands);
    cmd
}

#[test]
fn steps_and_inspects() {
    let mut cmd = debug("tests/files/print8.ls8", "step; get r0; continue; continue");
    cmd.assert().success().stdout(diff("8\n")).stderr(diff(
        "Executed 1 instruction.\n\
         8\n\
         Reached HLT. Pausing execution.\n\
         Executed 1 instruction.\n",
    ));
}

#[test]
fn breakpoint_changes_output() {
    let mut cmd = debug(
        "tests/files/mult.ls8",
        "break add 0x09; continue; set r0 5; quit",
    );
    cmd.assert()
        .success()
        .stdout(diff("5\n"))
        .stderr(contains("Added breakpoint at 0x09."))
        .stderr(contains("Reached breakpoint at 0x09. Pausing execution."));
}

#[test]
fn exits_program() {
    let mut cmd = debug("tests/files/print8.ls8", "exit");
    cmd.assert().success().stdout(diff(""));
}

#[test]
fn end_of_commands_keeps_running() {
    let mut cmd = debug("tests/files/mult.ls8", "");
    cmd.assert().success().stdout(diff("72\n"));
}

#[test]
fn lists_and_dumps_memory() {
    let mut cmd = debug("tests/files/mult.ls8", "list 0 2; memory 0 12; exit");
    cmd.assert().success().stderr(diff(
        "0x00  LDI R0, 8\n\
         0x03  LDI R1, 9\n\
         0x00: 82 00 08 82 01 09 a2 00\n\
         0x08: 01 47 00 01\n",
    ));
}

#[test]
fn reports_invalid_command() {
    let mut cmd = debug("tests/files/print8.ls8", "fly; exit");
    cmd.assert()
        .success()
        .stderr(diff("Not a command: `fly`\n"));
}

#[test]
fn prints_help() {
    let mut cmd = debug("tests/files/print8.ls8", "help; exit");
    cmd.assert()
        .success()
        .stderr(contains("break add [ADDR]"));
}

#[test]
fn shows_interrupt_latch() {
    let mut cmd = debug("tests/files/print8.ls8", "registers; get isr; exit");
    cmd.assert().success().stderr(diff(
        "R0 0\n\
         R1 0\n\
         R2 0\n\
         R3 0\n\
         R4 0\n\
         R5 0\n\
         R6 0\n\
         R7 116\n\
         PC 0\n\
         FL 000\n\
         ISR 0\n\
         0\n",
    ));
}

#[test]
fn reports_bad_argument() {
    let mut cmd = debug("tests/files/print8.ls8", "set r0 256; jump 1 2; exit");
    cmd.assert().success().stderr(diff(
        "`set`: `256` is not a valid value, maximum is 255\n\
         `jump`: unexpected `2`\n",
    ));
}
