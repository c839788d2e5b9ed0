//! Error types for network construction.

use thiserror::Error;

/// Errors raised while assembling a [`crate::Network`].
///
/// Structural errors (cycles, missing endpoints) are expected to be
/// recovered by the caller: the compiler logs and skips the offending
/// request rather than aborting.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ModelError {
    /// A variable with this id already exists.
    #[error("duplicate variable '{0}'")]
    DuplicateVariable(String),

    /// The referenced variable does not exist.
    #[error("unknown variable '{0}'")]
    UnknownVariable(String),

    /// The arc would connect a variable to itself.
    #[error("self-loop arc on '{0}'")]
    SelfLoop(String),

    /// The arc already exists.
    #[error("duplicate arc {src} -> {dst}")]
    DuplicateArc { src: String, dst: String },

    /// Adding the arc would create a directed cycle.
    #[error("arc {src} -> {dst} would create a cycle")]
    CycleDetected { src: String, dst: String },

    /// A CPT has the wrong shape or rows that are not probability vectors.
    #[error("invalid CPT for '{variable}': {reason}")]
    InvalidCpt { variable: String, reason: String },

    /// Noisy-max strength metadata does not match the wired parent.
    #[error("invalid noisy strengths for '{variable}': {reason}")]
    InvalidStrengths { variable: String, reason: String },
}
