use crate::fault::Fault;

// Opcode layout:
//   AABCDDDD
//   AA    number of operand bytes (0-2)
//   B     ALU operation
//   C     instruction sets PC itself
//   DDDD  instruction identifier

/// Bit 5: handled by the ALU.
pub const ALU_BIT: u8 = 0b0010_0000;
/// Bit 4: instruction moves PC itself, so it is not advanced afterwards.
pub const SETS_PC_BIT: u8 = 0b0001_0000;
const OPERAND_COUNT_SHIFT: u8 = 6;

/// Every opcode the machine understands.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
    Hlt = 0b0000_0001,
    Ret = 0b0001_0001,
    Iret = 0b0001_0011,
    Push = 0b0100_0101,
    Pop = 0b0100_0110,
    Prn = 0b0100_0111,
    Pra = 0b0100_1000,
    Call = 0b0101_0000,
    Jmp = 0b0101_0100,
    Jeq = 0b0101_0101,
    Jne = 0b0101_0110,
    Inc = 0b0110_0101,
    Dec = 0b0110_0110,
    Not = 0b0110_1001,
    Ldi = 0b1000_0010,
    Ld = 0b1000_0011,
    St = 0b1000_0100,
    Add = 0b1010_0000,
    Sub = 0b1010_0001,
    Mul = 0b1010_0010,
    Div = 0b1010_0011,
    Cmp = 0b1010_0111,
    And = 0b1010_1000,
    Or = 0b1010_1010,
    Xor = 0b1010_1011,
    Shl = 0b1010_1100,
    Shr = 0b1010_1101,
}

impl Opcode {
    pub const ALL: [Opcode; 27] = [
        Self::Hlt,
        Self::Ret,
        Self::Iret,
        Self::Push,
        Self::Pop,
        Self::Prn,
        Self::Pra,
        Self::Call,
        Self::Jmp,
        Self::Jeq,
        Self::Jne,
        Self::Inc,
        Self::Dec,
        Self::Not,
        Self::Ldi,
        Self::Ld,
        Self::St,
        Self::Add,
        Self::Sub,
        Self::Mul,
        Self::Div,
        Self::Cmp,
        Self::And,
        Self::Or,
        Self::Xor,
        Self::Shl,
        Self::Shr,
    ];

    pub fn byte(self) -> u8 {
        self as u8
    }

    pub fn is_alu(self) -> bool {
        is_alu(self.byte())
    }

    pub fn sets_pc(self) -> bool {
        sets_pc(self.byte())
    }

    pub fn operand_count(self) -> u8 {
        operand_count(self.byte())
    }

    pub fn mnemonic(self) -> &'static str {
        match self {
            Self::Hlt => "HLT",
            Self::Ret => "RET",
            Self::Iret => "IRET",
            Self::Push => "PUSH",
            Self::Pop => "POP",
            Self::Prn => "PRN",
            Self::Pra => "PRA",
            Self::Call => "CALL",
            Self::Jmp => "JMP",
            Self::Jeq => "JEQ",
            Self::Jne => "JNE",
            Self::Inc => "INC",
            Self::Dec => "DEC",
            Self::Not => "NOT",
            Self::Ldi => "LDI",
            Self::Ld => "LD",
            Self::St => "ST",
            Self::Add => "ADD",
            Self::Sub => "SUB",
            Self::Mul => "MUL",
            Self::Div => "DIV",
            Self::Cmp => "CMP",
            Self::And => "AND",
            Self::Or => "OR",
            Self::Xor => "XOR",
            Self::Shl => "SHL",
            Self::Shr => "SHR",
        }
    }
}

impl TryFrom<u8> for Opcode {
    type Error = ();
    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|opcode| opcode.byte() == byte)
            .ok_or(())
    }
}

pub fn is_alu(opcode: u8) -> bool {
    opcode & ALU_BIT != 0
}

pub fn sets_pc(opcode: u8) -> bool {
    opcode & SETS_PC_BIT != 0
}

pub fn operand_count(opcode: u8) -> u8 {
    opcode >> OPERAND_COUNT_SHIFT
}

/// Instruction length in bytes, 1 to 4 (4 is never a valid instruction).
pub fn size(opcode: u8) -> u8 {
    1 + operand_count(opcode)
}

/// Raw instruction as fetched from memory.
///
/// Operand bytes are always carried, even when the opcode does not use them.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Instruction {
    pub opcode: u8,
    pub a: u8,
    pub b: u8,
}

impl Instruction {
    pub fn new(opcode: u8, a: u8, b: u8) -> Self {
        Instruction { opcode, a, b }
    }

    pub fn size(&self) -> u8 {
        size(self.opcode)
    }

    pub fn sets_pc(&self) -> bool {
        sets_pc(self.opcode)
    }

    /// Resolve the opcode byte, splitting failures by the ALU bit.
    pub fn decode(&self) -> Result<Opcode, Fault> {
        let opcode = Opcode::try_from(self.opcode).ok();
        if is_alu(self.opcode) {
            opcode
                .filter(|op| op.is_alu())
                .ok_or(Fault::UnsupportedOperation {
                    opcode: self.opcode,
                })
        } else {
            opcode
                .filter(|op| !op.is_alu())
                .ok_or(Fault::UnsupportedInstruction {
                    opcode: self.opcode,
                })
        }
    }
}
