use std::fmt;

use crate::isa::{Instruction, Opcode};

/// Operand shapes used when rendering an instruction.
enum Operands {
    None,
    Reg,
    RegReg,
    RegImm,
}

fn operands(opcode: Opcode) -> Operands {
    use Opcode::*;
    match opcode {
        Hlt | Ret | Iret => Operands::None,
        Push | Pop | Prn | Pra | Call | Jmp | Jeq | Jne | Inc | Dec | Not => Operands::Reg,
        Ldi | Shl | Shr => Operands::RegImm,
        Ld | St | Add | Sub | Mul | Div | Cmp | And | Or | Xor => Operands::RegReg,
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Ok(opcode) = self.decode() else {
            return write!(f, ".byte 0x{:02x}", self.opcode);
        };
        let name = opcode.mnemonic();
        match operands(opcode) {
            Operands::None => write!(f, "{}", name),
            Operands::Reg => write!(f, "{} R{}", name, self.a),
            Operands::RegReg => write!(f, "{} R{}, R{}", name, self.a, self.b),
            Operands::RegImm => write!(f, "{} R{}, {}", name, self.a, self.b),
        }
    }
}

/// Walk `bytes` from address 0, one instruction at a time.
///
/// Unknown opcodes are stepped over by the size their top bits declare, the same
/// way the machine would advance past them.
pub fn listing(bytes: &[u8]) -> Vec<(u8, Instruction)> {
    let mut lines = Vec::new();
    let mut address = 0usize;
    while address < bytes.len() {
        let instr = instruction_at(bytes, address);
        lines.push((address as u8, instr));
        address += instr.size() as usize;
    }
    lines
}

/// Instruction starting at `address`. Bytes past the end of `bytes` read as zero.
pub fn instruction_at(bytes: &[u8], address: usize) -> Instruction {
    let byte = |offset: usize| bytes.get(address + offset).copied().unwrap_or(0);
    Instruction::new(byte(0), byte(1), byte(2))
}
