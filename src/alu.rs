use crate::fault::Fault;
use crate::flag::Flag;
use crate::isa::Opcode;
use crate::registers::Registers;

/// Perform an ALU operation on `reg[a]` and `reg[b]`.
///
/// The result lands in `reg[a]`, except for `CMP` which only writes the flag.
/// `SHL`/`SHR` shift by the literal `b`, not by a register value.
pub fn execute(
    op: Opcode,
    reg: &mut Registers,
    flag: &mut Flag,
    a: u8,
    b: u8,
) -> Result<(), Fault> {
    let val_a = reg.get(a)?;
    let result = match op {
        Opcode::Add => val_a.wrapping_add(reg.get(b)?),
        Opcode::Sub => val_a.wrapping_sub(reg.get(b)?),
        Opcode::Mul => val_a.wrapping_mul(reg.get(b)?),
        Opcode::Div => {
            let divisor = reg.get(b)?;
            if divisor == 0 {
                return Err(Fault::DivisionByZero { register: b });
            }
            val_a / divisor
        }
        Opcode::And => val_a & reg.get(b)?,
        Opcode::Or => val_a | reg.get(b)?,
        Opcode::Xor => val_a ^ reg.get(b)?,
        Opcode::Not => !val_a,
        Opcode::Shl => val_a.checked_shl(b as u32).unwrap_or(0),
        Opcode::Shr => val_a.checked_shr(b as u32).unwrap_or(0),
        Opcode::Inc => val_a.wrapping_add(1),
        Opcode::Dec => val_a.wrapping_sub(1),
        Opcode::Cmp => {
            *flag = Flag::compare(val_a, reg.get(b)?);
            return Ok(());
        }
        _ => return Err(Fault::UnsupportedOperation { opcode: op.byte() }),
    };
    reg.set(a, result)
}
