//! Typed errors, one enum per component boundary rather than one crate-wide
//! enum — mirrors the separation between `VerifyError` and `ValidationError`
//! that the authoring/compiler split keeps in the teacher's codebase.

use thiserror::Error;

/// Raised by the Token Validator (C2).
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ValidationError {
    #[error("unknown spec id: {0}")]
    UnknownSpec(String),

    #[error("missing required field '{field}' for spec '{spec_id}'")]
    MissingField { spec_id: String, field: String },

    #[error("constraint violation on '{field}': {message}")]
    ConstraintViolation { field: String, message: String },
}

/// Raised by the Process Graph (C4).
#[derive(Debug, Clone, Error, PartialEq)]
pub enum GraphError {
    #[error("unknown task id: {0}")]
    UnknownTask(String),

    #[error("compile failed with {} error(s): {}", .errors.len(), .errors.join("; "))]
    CompileError { errors: Vec<String> },
}

/// Raised by the Merge Engine (C5).
#[derive(Debug, Clone, Error, PartialEq)]
pub enum MergeError {
    #[error("merge conflict on key '{key}': {left} != {right}")]
    Conflict {
        key: String,
        left: serde_json::Value,
        right: serde_json::Value,
    },
}

/// The Firing Engine's (C6) internal error type. `run_step` never propagates
/// this to its caller — it converts every variant into a `FiringResult` with
/// `success = false` and a human-readable message (spec §7's propagation
/// policy). It exists so the step pipeline can use ordinary `?`.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum EngineError {
    #[error("token integrity violation: {0}")]
    TokenIntegrity(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("runtime execution error: {0}")]
    RuntimeExecution(String),
}

impl EngineError {
    /// `FiringResult.message` for the token-integrity and runtime-execution
    /// cases, where the wording doesn't depend on which pipeline stage the
    /// error surfaced from. Input-spec vs. output-spec validation failures
    /// are prefixed by the caller in `engine.rs`, since the same
    /// `ValidationError` can occur at either stage.
    pub fn step_message(&self) -> String {
        match self {
            EngineError::TokenIntegrity(msg) => format!("Token Integrity Fail: {msg}"),
            EngineError::Validation(e) => e.to_string(),
            EngineError::RuntimeExecution(msg) => format!("Runtime Execution Error: {msg}"),
        }
    }
}
