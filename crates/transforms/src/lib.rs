pub mod flatten;
pub mod obfuscator;
pub mod pass;
pub mod validator;

use rand::rngs::StdRng;
use tangle_core::Method;
use thiserror::Error;

/// Transform error type encompassing all transform module errors.
#[derive(Debug, Error)]
pub enum Error {
    /// Core operation failed.
    #[error("core operation failed: {0}")]
    Core(#[from] tangle_core::result::Error),

    /// A chain position outside the plan was looked up.
    #[error("chain position {position} is outside a plan of {cases} cases")]
    ChainLookup {
        /// The position that was requested.
        position: usize,
        /// Number of cases in the plan.
        cases: usize,
    },

    /// A case was reached twice while replaying the dispatch chain.
    #[error("case {0} is visited twice by the dispatch chain")]
    CaseRevisited(usize),

    /// The dispatch chain stops before covering every case.
    #[error("dispatch chain visits {visited} of {total} cases")]
    IncompleteChain {
        /// Number of cases reached from case 0.
        visited: usize,
        /// Number of cases in the jump table.
        total: usize,
    },

    /// The configured label prefix cannot be used in a smali label.
    #[error("invalid label prefix `{0}`")]
    InvalidLabelPrefix(String),

    /// The case bijection is broken.
    #[error("invalid dispatch plan: {0}")]
    InvalidPlan(String),

    /// The method already uses a label with the dispatch prefix.
    #[error("method `{method}` already uses labels starting with `{prefix}`")]
    LabelCollision {
        /// Method name.
        method: String,
        /// Offending label prefix including the leading colon.
        prefix: String,
    },

    /// The dispatch preamble or jump table could not be found.
    #[error("method `{0}` has no dispatch structure")]
    MissingDispatch(String),

    /// A next-case value names a case with no block.
    #[error("dispatch chain jumps to missing case {0}")]
    MissingCase(usize),

    /// The flattened method does not replay to the original instruction order.
    #[error("flattened method `{0}` does not reproduce its original body")]
    ReplayMismatch(String),
}

/// Transform result type
pub type Result<T> = std::result::Result<T, Error>;

/// Trait for method-level obfuscation transforms.
pub trait Transform: Send + Sync {
    /// Returns the transform's name for logging and identification.
    fn name(&self) -> &'static str;
    /// Applies the transform to one method, returning whether changes were made.
    fn apply(&self, method: &mut Method, rng: &mut StdRng) -> Result<bool>;
}
