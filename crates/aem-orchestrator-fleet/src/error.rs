//! Error types for fleet resolution.

use aem_orchestrator_core::CoreError;
use thiserror::Error;

/// A result type using `FleetError`.
pub type Result<T> = std::result::Result<T, FleetError>;

/// Errors that can occur while resolving fleet identifiers.
#[derive(Debug, Error)]
pub enum FleetError {
    /// The stack or logical resource could not be resolved to a physical id.
    #[error("cannot resolve {logical_id} in stack {stack_name}: {reason}")]
    ResolutionFailure {
        /// Stack that was queried.
        stack_name: String,
        /// Logical resource id within the stack.
        logical_id: String,
        /// Why resolution failed.
        reason: String,
    },

    /// The lookup client could not be constructed.
    #[error("fleet lookup client error: {0}")]
    Client(#[from] CoreError),
}

impl FleetError {
    /// Build a resolution failure for `(stack_name, logical_id)`.
    #[must_use]
    pub fn resolution(stack_name: &str, logical_id: &str, reason: impl Into<String>) -> Self {
        Self::ResolutionFailure {
            stack_name: stack_name.to_string(),
            logical_id: logical_id.to_string(),
            reason: reason.into(),
        }
    }
}
