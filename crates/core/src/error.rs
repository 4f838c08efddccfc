//! Error taxonomy for workflow operations.
//!
//! Every fallible operation in the workspace returns
//! `Result<_, WorkflowError>`. Callers can match on the variant to
//! distinguish caller mistakes (`Validation`, `InvalidState`,
//! `PermissionDenied`) from infrastructure failures (`Repository`), which
//! are the only retryable class.

use thiserror::Error;
use uuid::Uuid;

/// The workflow-wide error type.
#[derive(Debug, Clone, Error)]
pub enum WorkflowError {
    /// Actor lacks the capability for the attempted operation.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// Operation not valid from the item's current workflow status.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// A referenced entity does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: Uuid },

    /// The parent already has a live fork.
    #[error("an active revision already exists for item {0}")]
    ForkAlreadyExists(Uuid),

    /// Malformed or missing input.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The underlying content repository or metadata store failed.
    #[error("repository error: {0}")]
    Repository(String),

    /// Publish attempted on an item that has not passed the approval gate.
    #[error("item {0} is not approved")]
    NotApproved(Uuid),
}

impl WorkflowError {
    /// `true` for the infrastructure failure class that is safe to retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, WorkflowError::Repository(_))
    }

    /// Shorthand for a missing content item.
    pub fn item_not_found(id: Uuid) -> Self {
        WorkflowError::NotFound {
            entity: "content item",
            id,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages() {
        let id = Uuid::nil();
        let e = WorkflowError::PermissionDenied("approve requires a reviewer role".into());
        assert_eq!(
            e.to_string(),
            "permission denied: approve requires a reviewer role"
        );

        let e = WorkflowError::item_not_found(id);
        assert_eq!(
            e.to_string(),
            format!("content item not found: {id}")
        );

        let e = WorkflowError::NotApproved(id);
        assert_eq!(e.to_string(), format!("item {id} is not approved"));
    }

    #[test]
    fn only_repository_errors_are_retryable() {
        assert!(WorkflowError::Repository("connection reset".into()).is_retryable());
        assert!(!WorkflowError::Validation("empty comment".into()).is_retryable());
        assert!(!WorkflowError::ForkAlreadyExists(Uuid::nil()).is_retryable());
    }
}
