//! Dispatch register allocation.
//!
//! With `.locals R`, local registers are `v0..v(R-1)` and parameters follow them, so `vR` is
//! free once the directive is bumped to `R+1`. Parameter registers addressed as `pN` keep their
//! meaning, so no other renumbering is needed. A body that addresses parameters as `vN` would
//! see them shift, and is rejected.

use crate::method::{BlockKind, Method};
use crate::result::{Error, Result};
use crate::{code_tokens, starts_with_directive, LOCALS_DIRECTIVE, REGISTERS_DIRECTIVE};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Highest register index accepted for the dispatch register.
///
/// `const/16` and `packed-switch` both encode their register in 8 bits.
pub const MAX_DISPATCH_REGISTER: u32 = 255;

/// A `v` register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Register(pub u16);

impl Register {
    pub fn index(self) -> u16 {
        self.0
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// Location and value of a method's `.locals` directive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalsDirective {
    /// Line index inside the prologue block.
    pub index: usize,
    /// Declared number of local registers.
    pub count: u32,
}

/// Finds the `.locals` directive in the method prologue.
pub fn find_locals(method: &Method) -> Result<LocalsDirective> {
    let missing = || Error::MissingRegisterDirective {
        method: method.declaration.trim().to_string(),
    };
    let prologue = method
        .blocks
        .first()
        .filter(|block| block.kind == BlockKind::Prologue)
        .ok_or_else(missing)?;

    for (index, line) in prologue.lines.iter().enumerate() {
        if starts_with_directive(line, REGISTERS_DIRECTIVE) {
            return Err(Error::UnsupportedRegisterDirective {
                method: method.declaration.trim().to_string(),
                directive: line.trim().to_string(),
            });
        }
        if starts_with_directive(line, LOCALS_DIRECTIVE) {
            let count = parse_count(line).ok_or_else(|| Error::InvalidRegisterCount {
                method: method.declaration.trim().to_string(),
                raw: line.trim().to_string(),
            })?;
            return Ok(LocalsDirective { index, count });
        }
    }

    Err(missing())
}

/// Reserves the next free register as dispatch register.
///
/// Returns `v{R}` for a method declaring `.locals R` and rewrites the directive to declare
/// `R + 1` locals, keeping its indentation.
pub fn reserve_dispatch_register(method: &mut Method) -> Result<Register> {
    let LocalsDirective { index, count } = find_locals(method)?;
    if count > MAX_DISPATCH_REGISTER {
        return Err(Error::RegisterOutOfRange(count));
    }
    if let Some(register) = method
        .body_lines()
        .find_map(|line| highest_register(line).filter(|&reg| reg >= count))
    {
        return Err(Error::RegisterConflict {
            method: method.declaration.trim().to_string(),
            register,
        });
    }

    let line = &mut method.blocks[0].lines[index];
    let indent_len = line.len() - line.trim_start().len();
    let indent = line[..indent_len].to_string();
    *line = format!("{indent}{LOCALS_DIRECTIVE} {}", count + 1);

    debug!("reserved v{} in {} (.locals {} -> {})", count, method.name(), count, count + 1);

    Ok(Register(count as u16))
}

/// Highest `vN` register named by a line, ignoring comments and string literals.
///
/// Parameters addressed as `v` registers sit right above the locals, so any `vN` with
/// `N >= R` would alias the register reserved for dispatch.
fn highest_register(line: &str) -> Option<u32> {
    code_tokens(line)
        .filter_map(|token| token.strip_prefix('v'))
        .filter_map(|digits| digits.parse::<u32>().ok())
        .max()
}

fn parse_count(line: &str) -> Option<u32> {
    let value = line
        .trim_start()
        .strip_prefix(LOCALS_DIRECTIVE)?
        .split('#')
        .next()?
        .trim();

    match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16).ok(),
        None => value.parse().ok(),
    }
}
