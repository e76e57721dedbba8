use std::fs;
use std::path::Path;

use miette::{IntoDiagnostic, NamedSource, Result};

use crate::error;
use crate::memory::MEMORY_SIZE;

/// Digits in one program line.
const LITERAL_WIDTH: usize = 8;

/// Program image read from a text file of binary literals.
///
/// Every line starting with `0` or `1` holds one byte: its first 8 characters,
/// in binary. Anything after them on the same line is a
/// comment. All other lines are ignored.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Program {
    bytes: Vec<u8>,
}

impl Program {
    pub fn from_file(path: &Path) -> Result<Self> {
        let src = fs::read_to_string(path).into_diagnostic()?;
        Self::parse(&path.to_string_lossy(), &src)
    }

    /// Parse program text. `name` is only used in diagnostics.
    pub fn parse(name: &str, src: &str) -> Result<Self> {
        let mut bytes = Vec::new();
        let mut offset = 0;
        for line in src.split_inclusive('\n') {
            let start = offset;
            offset += line.len();

            if !line.starts_with(['0', '1']) {
                continue;
            }

            let literal = line
                .trim_end_matches(['\n', '\r'])
                .chars()
                .take(LITERAL_WIDTH)
                .collect::<String>();
            let bad_digit = literal
                .char_indices()
                .find(|&(_, ch)| ch != '0' && ch != '1')
                .map(|(i, ch)| i + ch.len_utf8());
            if literal.len() < LITERAL_WIDTH || bad_digit.is_some() {
                let end = start + bad_digit.unwrap_or(literal.len());
                return Err(error::load_bad_literal(start..end, source(name, src)));
            }

            if bytes.len() == MEMORY_SIZE {
                let len = bytes.len() + count_remaining(&src[start..]);
                return Err(error::load_too_long(
                    start..start + LITERAL_WIDTH,
                    source(name, src),
                    len,
                ));
            }
            // Cannot fail: exactly 8 binary digits
            bytes.push(u8::from_str_radix(&literal, 2).into_diagnostic()?);
        }
        log::debug!("loaded {} bytes from {name}", bytes.len());
        Ok(Program { bytes })
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Program { bytes }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Program lines in `src`, for the length reported by `load::too_long`.
fn count_remaining(src: &str) -> usize {
    src.lines()
        .filter(|line| line.starts_with(['0', '1']))
        .count()
}

fn source(name: &str, src: &str) -> NamedSource<String> {
    NamedSource::new(name, src.to_string())
}
