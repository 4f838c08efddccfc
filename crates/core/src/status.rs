//! Workflow and repository status enums.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// WorkflowStatus
// ---------------------------------------------------------------------------

/// The workflow state of a content item.
///
/// `Rejected` is terminal for the current review round: the only way out is
/// a fresh submission. `Published` implies the item is locked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    Draft,
    PendingReview,
    PendingFinalApproval,
    Approved,
    Rejected,
    Published,
}

impl WorkflowStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowStatus::Draft => "draft",
            WorkflowStatus::PendingReview => "pending_review",
            WorkflowStatus::PendingFinalApproval => "pending_final_approval",
            WorkflowStatus::Approved => "approved",
            WorkflowStatus::Rejected => "rejected",
            WorkflowStatus::Published => "published",
        }
    }

    /// `true` while the item sits in a review queue.
    pub fn is_pending(&self) -> bool {
        matches!(
            self,
            WorkflowStatus::PendingReview | WorkflowStatus::PendingFinalApproval
        )
    }

    /// States a new review round can be submitted from.
    pub fn can_submit(&self) -> bool {
        matches!(self, WorkflowStatus::Draft | WorkflowStatus::Rejected)
    }
}

impl Default for WorkflowStatus {
    fn default() -> Self {
        WorkflowStatus::Draft
    }
}

// ---------------------------------------------------------------------------
// RepoStatus
// ---------------------------------------------------------------------------

/// The repository-visible status of a content item.
///
/// Owned by the `ContentRepository`; the workflow mirrors its transitions
/// onto it (submit -> `Pending`, reject/cancel -> `Draft`, publish ->
/// `Published`, fork retirement -> `Trashed`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepoStatus {
    Draft,
    Pending,
    Published,
    Trashed,
}

impl RepoStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RepoStatus::Draft => "draft",
            RepoStatus::Pending => "pending",
            RepoStatus::Published => "published",
            RepoStatus::Trashed => "trashed",
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
    fn pending_states() {
        assert!(WorkflowStatus::PendingReview.is_pending());
        assert!(WorkflowStatus::PendingFinalApproval.is_pending());
        assert!(!WorkflowStatus::Draft.is_pending());
        assert!(!WorkflowStatus::Published.is_pending());
    }

    #[test]
    fn submittable_states() {
        assert!(WorkflowStatus::Draft.can_submit());
        assert!(WorkflowStatus::Rejected.can_submit());
        assert!(!WorkflowStatus::Approved.can_submit());
        assert!(!WorkflowStatus::PendingReview.can_submit());
    }

    #[test]
    fn default_is_draft() {
        assert_eq!(WorkflowStatus::default(), WorkflowStatus::Draft);
    }

    #[test]
    fn serde_uses_snake_case() {
        let s = serde_json::to_string(&WorkflowStatus::PendingFinalApproval).unwrap();
        assert_eq!(s, "\"pending_final_approval\"");
        let back: WorkflowStatus = serde_json::from_str(&s).unwrap();
        assert_eq!(back, WorkflowStatus::PendingFinalApproval);
    }
}
