//! Error types for flowbn compilation.

use thiserror::Error;

/// Errors that can occur while compiling an attack flow.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error
/// variants without breaking changes.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum CompileError {
    /// The flow has no nodes or no edges, so there is nothing to compile.
    #[error("empty flow: {0}")]
    EmptyGraph(&'static str),

    /// Network construction rejected an operation (duplicate variable,
    /// cycle, malformed CPT).
    #[error("model error: {0}")]
    Model(#[from] flowbn_model::ModelError),

    /// Internal compilation error (programmer error, not user error).
    #[error("internal error: {0}")]
    Internal(String),
}
