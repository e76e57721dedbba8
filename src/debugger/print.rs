use crate::disasm;
use crate::memory::MEMORY_SIZE;
use crate::output::is_minimal;
use crate::state::RunState;
use crate::{dprint, dprintln};

/// Bytes per row of a memory dump.
const ROW_LEN: usize = 8;

/// Single byte as hex, decimal and character.
pub fn print_value(value: u8) {
    if is_minimal() {
        dprintln!(Always, "{}", value);
        return;
    }
    dprintln!(
        Always,
        "0x{:02x}  {:>3}  0b{:08b}  {}",
        value,
        value,
        value,
        crate::output::char_display(value)
    );
}

/// Hex dump of `len` bytes from `address`, clamped to memory.
pub fn print_memory(state: &RunState, address: u8, len: u16) {
    let bytes = state.mem().slice(address as usize, len as usize);
    for (row, chunk) in bytes.chunks(ROW_LEN).enumerate() {
        let row_address = address as usize + row * ROW_LEN;
        dprint!(Always, "\x1b[1m0x{:02x}\x1b[0m:", row_address);
        for byte in chunk {
            dprint!(Always, " {:02x}", byte);
        }
        dprintln!(Always);
    }
}

/// Disassemble `count` instructions from `address`, marking the one at PC.
pub fn print_listing(state: &RunState, address: u8, count: u16) {
    let memory = state.mem().slice(0, MEMORY_SIZE);
    let mut address = address as usize;
    for _ in 0..count {
        if address >= MEMORY_SIZE {
            break;
        }
        let instr = disasm::instruction_at(memory, address);
        let marker = if address == state.pc() as usize {
            "\x1b[1m>\x1b[0m"
        } else {
            " "
        };
        if is_minimal() {
            dprintln!(Always, "0x{:02x}  {}", address, instr);
        } else {
            dprintln!(Always, "{} 0x{:02x}  {}", marker, address, instr);
        }
        address += instr.size() as usize;
    }
}
