//! Reviewer decisions and tally logic.
//!
//! An item's approval list holds at most one live entry per reviewer: a
//! reviewer deciding again replaces their earlier entry in place. When a
//! fork is merged back, a `Separator` marker is appended followed by the
//! fork's entries, so the list doubles as an audit trail across rounds.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::UserId;
use crate::version::Version;

/// Number of distinct approvals required to pass the gate.
pub const REQUIRED_APPROVALS: usize = 2;

// ---------------------------------------------------------------------------
// Decision
// ---------------------------------------------------------------------------

/// A reviewer's verdict, or the merge marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Approved,
    Rejected,
    /// Marks the boundary before entries merged in from a published fork.
    /// Never counts toward the approval threshold.
    Separator,
}

// ---------------------------------------------------------------------------
// Approval
// ---------------------------------------------------------------------------

/// One entry in an item's approval list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Approval {
    /// The deciding reviewer. `None` only for separator markers.
    pub reviewer: Option<UserId>,
    pub decision: Decision,
    pub decided_at: DateTime<Utc>,
    pub comment: String,
    /// Item version at decision time.
    pub version: Version,
}

impl Approval {
    pub fn decision(
        reviewer: UserId,
        decision: Decision,
        comment: impl Into<String>,
        version: Version,
    ) -> Self {
        Approval {
            reviewer: Some(reviewer),
            decision,
            decided_at: Utc::now(),
            comment: comment.into(),
            version,
        }
    }

    /// The marker appended to a parent's list before merged fork entries.
    pub fn separator(comment: impl Into<String>, version: Version) -> Self {
        Approval {
            reviewer: None,
            decision: Decision::Separator,
            decided_at: Utc::now(),
            comment: comment.into(),
            version,
        }
    }
}

// ---------------------------------------------------------------------------
// Tally
// ---------------------------------------------------------------------------

/// Record a decision, replacing the reviewer's earlier entry if present.
///
/// Returns `true` when an existing entry was replaced.
pub fn record_decision(approvals: &mut Vec<Approval>, entry: Approval) -> bool {
    let reviewer = entry.reviewer;
    if let Some(existing) = approvals
        .iter_mut()
        .find(|a| a.reviewer.is_some() && a.reviewer == reviewer)
    {
        *existing = entry;
        return true;
    }
    approvals.push(entry);
    false
}

/// Count distinct reviewers whose live decision is `Approved`.
pub fn approval_count(approvals: &[Approval]) -> usize {
    approvals
        .iter()
        .filter(|a| a.reviewer.is_some() && a.decision == Decision::Approved)
        .count()
}

/// `true` if any reviewer's live decision is `Rejected`.
pub fn has_rejection(approvals: &[Approval]) -> bool {
    approvals
        .iter()
        .any(|a| a.reviewer.is_some() && a.decision == Decision::Rejected)
}

/// `true` once the distinct-approval threshold is met.
pub fn gate_passed(approvals: &[Approval]) -> bool {
    approval_count(approvals) >= REQUIRED_APPROVALS
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn v01() -> Version {
        Version::new(0, 1)
    }

    #[test]
    fn first_decision_appends() {
        let mut list = Vec::new();
        let replaced = record_decision(
            &mut list,
            Approval::decision(Uuid::new_v4(), Decision::Approved, "lgtm", v01()),
        );
        assert!(!replaced);
        assert_eq!(list.len(), 1);
        assert_eq!(approval_count(&list), 1);
    }

    #[test]
    fn same_reviewer_replaces_in_place() {
        let reviewer = Uuid::new_v4();
        let mut list = Vec::new();
        record_decision(
            &mut list,
            Approval::decision(reviewer, Decision::Approved, "lgtm", v01()),
        );
        let replaced = record_decision(
            &mut list,
            Approval::decision(reviewer, Decision::Approved, "still fine", v01()),
        );
        assert!(replaced);
        assert_eq!(list.len(), 1);
        assert_eq!(approval_count(&list), 1);
        assert_eq!(list[0].comment, "still fine");
    }

    #[test]
    fn rejection_supersedes_earlier_approval() {
        let reviewer = Uuid::new_v4();
        let mut list = Vec::new();
        record_decision(
            &mut list,
            Approval::decision(reviewer, Decision::Approved, "ok", v01()),
        );
        record_decision(
            &mut list,
            Approval::decision(reviewer, Decision::Rejected, "found a problem", v01()),
        );
        assert_eq!(list.len(), 1);
        assert_eq!(approval_count(&list), 0);
        assert!(has_rejection(&list));
    }

    #[test]
    fn two_distinct_approvers_pass_the_gate() {
        let mut list = Vec::new();
        record_decision(
            &mut list,
            Approval::decision(Uuid::new_v4(), Decision::Approved, "a", v01()),
        );
        assert!(!gate_passed(&list));
        record_decision(
            &mut list,
            Approval::decision(Uuid::new_v4(), Decision::Approved, "b", v01()),
        );
        assert!(gate_passed(&list));
    }

    #[test]
    fn one_reviewer_cannot_pass_the_gate_alone() {
        let reviewer = Uuid::new_v4();
        let mut list = Vec::new();
        for comment in ["first", "second", "third"] {
            record_decision(
                &mut list,
                Approval::decision(reviewer, Decision::Approved, comment, v01()),
            );
        }
        assert_eq!(list.len(), 1);
        assert!(!gate_passed(&list));
    }

    #[test]
    fn separators_never_count() {
        let mut list = vec![Approval::separator("Revision 1.1 published", v01())];
        assert_eq!(approval_count(&list), 0);
        assert!(!has_rejection(&list));

        // A reviewer deciding after a merge must not replace the marker.
        record_decision(
            &mut list,
            Approval::decision(Uuid::new_v4(), Decision::Approved, "ok", v01()),
        );
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].decision, Decision::Separator);
    }
}
