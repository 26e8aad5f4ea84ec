//! Error types for layout operations.

use thiserror::Error;

/// Errors that can occur during layout operations.
///
/// Plain layout functions never return these for structurally valid input;
/// they come from configuration validation and interruptible runs.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LayoutError {
    /// A configuration value is out of range or not finite.
    #[error("invalid config `{field}`: {reason}")]
    InvalidConfig {
        field: &'static str,
        reason: String,
    },

    /// The caller cancelled the run.
    #[error("layout cancelled at iteration {iteration}")]
    Cancelled { iteration: usize },

    /// The run did not finish before its deadline.
    #[error("layout deadline exceeded at iteration {iteration}")]
    DeadlineExceeded { iteration: usize },
}

impl LayoutError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field,
            reason: reason.into(),
        }
    }
}
