//! Core results and error types

use thiserror::Error;

/// Core error type encompassing all core module errors.
#[derive(Debug, Error)]
pub enum Error {
    /// Failed to read file at the specified path.
    #[error("could not read file '{path}': {source}")]
    FileRead {
        /// The path to the file that could not be read.
        path: String,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The register-count directive carries a value that is not a register count.
    #[error("invalid register count in `{raw}` of method `{method}`")]
    InvalidRegisterCount {
        /// Declaration line of the method.
        method: String,
        /// The directive line that failed to parse.
        raw: String,
    },

    /// Invalid hexadecimal in seed.
    #[error("invalid hexadecimal in seed")]
    InvalidSeedHex,

    /// Invalid seed length.
    #[error("invalid seed length: expected 64 hex chars, got {0}")]
    InvalidSeedLength(usize),

    /// A method block is too short to hold a declaration and a terminator.
    #[error("malformed method at line {line}: {msg}")]
    MalformedMethod {
        /// 1-based line of the method declaration.
        line: usize,
        /// Description of the problem.
        msg: String,
    },

    /// The method has no `.locals` directive before its first line marker.
    #[error("method `{method}` has no .locals directive")]
    MissingRegisterDirective {
        /// Declaration line of the method.
        method: String,
    },

    /// A `.method` directive appeared while another method was still open.
    #[error("nested .method at line {line} (method opened at line {open})")]
    NestedMethod {
        /// 1-based line of the offending directive.
        line: usize,
        /// 1-based line of the method still open.
        open: usize,
    },

    /// The body already addresses the register that would be reserved for dispatch.
    #[error("method `{method}` already uses v{register}, the next free local")]
    RegisterConflict {
        /// Declaration line of the method.
        method: String,
        /// Offending register index.
        register: u32,
    },

    /// The dispatch register would not fit an 8-bit register operand.
    #[error("dispatch register v{0} is out of range (max v255)")]
    RegisterOutOfRange(u32),

    /// `.end method` appeared with no open method.
    #[error("unexpected .end method at line {line}")]
    UnexpectedMethodEnd {
        /// 1-based line of the offending directive.
        line: usize,
    },

    /// Input ended while a method was still open.
    #[error("method opened at line {line} is never closed")]
    UnterminatedMethod {
        /// 1-based line of the unterminated method declaration.
        line: usize,
    },

    /// The method declares registers with `.registers`, which cannot be extended safely.
    #[error("method `{method}` uses unsupported register directive `{directive}`")]
    UnsupportedRegisterDirective {
        /// Declaration line of the method.
        method: String,
        /// The directive line found.
        directive: String,
    },
}

/// Core result type
pub type Result<T> = std::result::Result<T, Error>;
