use std::cmp::Ordering;
use std::fmt;

/// Condition code, written only by `CMP` (and restored by `IRET`).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Flag(u8);

impl Flag {
    pub const EQUAL: u8 = 0b001;
    pub const GREATER: u8 = 0b010;
    pub const LESS: u8 = 0b100;

    /// Result of comparing `a` with `b`.
    pub fn compare(a: u8, b: u8) -> Self {
        Flag(match a.cmp(&b) {
            Ordering::Less => Self::LESS,
            Ordering::Equal => Self::EQUAL,
            Ordering::Greater => Self::GREATER,
        })
    }

    /// Restore from a byte saved on the stack. Only the low 3 bits are kept.
    pub fn from_bits(bits: u8) -> Self {
        Flag(bits & 0b111)
    }

    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn is_equal(self) -> bool {
        self.0 & Self::EQUAL != 0
    }
}

impl fmt::Display for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bit = |mask, set, unset| if self.0 & mask != 0 { set } else { unset };
        write!(
            f,
            "{}{}{}",
            bit(Self::LESS, 'L', 'l'),
            bit(Self::GREATER, 'G', 'g'),
            bit(Self::EQUAL, 'E', 'e'),
        )
    }
}
