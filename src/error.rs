//! Error taxonomy for the path-query engine.
//!
//! Every fallible operation in this crate returns [`EngineResult`]. No operation
//! swallows an error or returns a partial result set on failure.

use thiserror::Error;

/// Errors produced by the path-query engine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// Matrix operation attempted on mismatched shapes.
    #[error("shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeError {
        expected: (usize, usize),
        actual: (usize, usize),
    },

    /// A decomposition or automaton was constructed with non-unique state data.
    #[error("duplicate state data encountered during construction: {0}")]
    DuplicateStateError(String),

    /// Two operands disagree on the "kind" of value they carry (vertex kind,
    /// result element kind, or automaton-like capability).
    #[error("type error: {0}")]
    TypeError(String),

    /// A regex, CFG, or DOT source string failed to parse.
    #[error("parse error: {0}")]
    ParseError(String),

    /// A requested canned/named graph is not registered.
    #[error("graph not found: {0}")]
    MissingGraphError(String),

    /// The requested operation is not implemented for this combination of inputs.
    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// A fixed-point loop exceeded `EngineConfig::max_iterations`.
    #[error("iteration limit ({limit}) exceeded in {phase}")]
    IterationLimitExceeded { phase: String, limit: usize },
}

/// Result type for all engine operations.
pub type EngineResult<T> = Result<T, EngineError>;
