pub mod method;
pub mod registers;
pub mod result;
pub mod scanner;
pub mod seed;

pub use method::{split_method, Block, BlockKind, Method};
pub use registers::{reserve_dispatch_register, Register};
pub use scanner::{scan_source, MethodSource, SmaliSource, SourceItem};

/// Directive opening a method block.
pub const METHOD_START: &str = ".method";
/// Directive closing a method block.
pub const METHOD_END: &str = ".end method";
/// Source-line marker used as the block boundary.
pub const LINE_MARKER: &str = ".line";
/// Register-count directive declaring the number of local registers.
pub const LOCALS_DIRECTIVE: &str = ".locals";
/// Alternate register-count directive that also counts parameter registers.
pub const REGISTERS_DIRECTIVE: &str = ".registers";

/// Returns true if `line` starts with the directive `directive`, ignoring leading whitespace.
///
/// The directive must be followed by whitespace or the end of the line, so `.line` does not
/// match `.lines` or `.line_table`.
#[inline]
pub fn starts_with_directive(line: &str, directive: &str) -> bool {
    let trimmed = line.trim_start();
    match trimmed.strip_prefix(directive) {
        Some(rest) => rest.is_empty() || rest.starts_with(char::is_whitespace),
        None => false,
    }
}

/// Returns true if the line is a `.line` source marker.
#[inline]
pub fn is_line_marker(line: &str) -> bool {
    starts_with_directive(line, LINE_MARKER)
}

/// Returns true if the line opens a method.
#[inline]
pub fn is_method_start(line: &str) -> bool {
    starts_with_directive(line, METHOD_START)
}

/// Returns true if the line closes a method.
#[inline]
pub fn is_method_end(line: &str) -> bool {
    line.trim() == METHOD_END
}

/// Operand and label tokens of a line, with string literals and comments cut off.
pub fn code_tokens(line: &str) -> impl Iterator<Item = &str> {
    let code = line.split(['"', '#']).next().unwrap_or_default();
    code.split(|c: char| c.is_whitespace() || matches!(c, ',' | '{' | '}'))
        .filter(|token| !token.is_empty())
}
