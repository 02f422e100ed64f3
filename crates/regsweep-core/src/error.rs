//! Error types for convention and planning operations.

use thiserror::Error;

/// Errors raised when constructing a tag convention.
///
/// These are configuration errors: planning must not proceed with an
/// ambiguous policy, so they surface before any registry call is made.
#[derive(Debug, Error)]
pub enum ConventionError {
    /// The pattern is not a valid regular expression.
    #[error("invalid convention pattern: {0}")]
    InvalidPattern(String),

    /// The pattern compiles but lacks a capture group the contract requires.
    #[error("convention pattern is missing required capture group `{0}`")]
    MissingGroup(&'static str),
}

/// Errors raised while computing a retention plan.
#[derive(Debug, Error)]
pub enum PlanError {
    /// A conforming tag has no usable recency marker under the chosen
    /// policy: neither an embedded timestamp nor a push time is available.
    #[error("no recency marker available for tag `{tag}`")]
    MissingRecency {
        /// The tag that could not be ordered.
        tag: String,
    },
}
