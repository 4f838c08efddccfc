//! The (role, kind, operation) authorization table.
//!
//! A single finite lookup replaces per-kind capability name strings:
//! every grant is visible in one match expression, and the tests walk the
//! full table. Author-based allowances (an author may cancel their own
//! request, for example) are layered on top by the engine; this table only
//! answers what a role grants.

use serde::{Deserialize, Serialize};

use crate::types::ItemKind;

// ---------------------------------------------------------------------------
// Role
// ---------------------------------------------------------------------------

/// Workflow roles, in increasing order of privilege.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Authors content, submits it for review.
    Contributor,
    /// Everything a contributor can do, plus approve/reject.
    Approver,
    /// Full control, including publish, lock and fork merges.
    Admin,
}

pub const ALL_ROLES: &[Role] = &[Role::Contributor, Role::Approver, Role::Admin];

// ---------------------------------------------------------------------------
// Operation
// ---------------------------------------------------------------------------

/// Every operation the workflow can authorize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Edit,
    SubmitForReview,
    Approve,
    Reject,
    RequestFinalApproval,
    CancelApproval,
    Publish,
    Lock,
    Unlock,
    CreateFork,
    PublishFork,
    RestoreVersion,
    ArchiveVersion,
    ResetRelatedItem,
}

pub const ALL_OPERATIONS: &[Operation] = &[
    Operation::Edit,
    Operation::SubmitForReview,
    Operation::Approve,
    Operation::Reject,
    Operation::RequestFinalApproval,
    Operation::CancelApproval,
    Operation::Publish,
    Operation::Lock,
    Operation::Unlock,
    Operation::CreateFork,
    Operation::PublishFork,
    Operation::RestoreVersion,
    Operation::ArchiveVersion,
    Operation::ResetRelatedItem,
];

// ---------------------------------------------------------------------------
// The table
// ---------------------------------------------------------------------------

/// Does `role` grant `op` on items of `kind`?
pub fn role_allows(role: Role, kind: ItemKind, op: Operation) -> bool {
    match role {
        Role::Admin => true,

        Role::Approver => match op {
            Operation::Approve | Operation::Reject => true,
            _ => role_allows(Role::Contributor, kind, op),
        },

        Role::Contributor => match op {
            Operation::Edit | Operation::SubmitForReview | Operation::CancelApproval => true,
            // Contributors may start revisions of the primary kind; forks
            // of linked kinds are an admin affair.
            Operation::CreateFork => kind == ItemKind::Method,
            _ => false,
        },
    }
}

/// Does any of `roles` grant `op` on items of `kind`?
pub fn any_role_allows(roles: &[Role], kind: ItemKind, op: Operation) -> bool {
    roles.iter().any(|&r| role_allows(r, kind, op))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ALL_KINDS;

    #[test]
    fn admin_is_granted_everything() {
        for &kind in ALL_KINDS {
            for &op in ALL_OPERATIONS {
                assert!(role_allows(Role::Admin, kind, op), "{kind} {op:?}");
            }
        }
    }

    #[test]
    fn approver_extends_contributor_with_review_powers() {
        for &kind in ALL_KINDS {
            assert!(role_allows(Role::Approver, kind, Operation::Approve));
            assert!(role_allows(Role::Approver, kind, Operation::Reject));
            for &op in ALL_OPERATIONS {
                if role_allows(Role::Contributor, kind, op) {
                    assert!(role_allows(Role::Approver, kind, op), "{kind} {op:?}");
                }
            }
        }
    }

    #[test]
    fn contributor_grants() {
        for &kind in ALL_KINDS {
            assert!(role_allows(Role::Contributor, kind, Operation::Edit));
            assert!(role_allows(Role::Contributor, kind, Operation::SubmitForReview));
            assert!(role_allows(Role::Contributor, kind, Operation::CancelApproval));
            assert!(!role_allows(Role::Contributor, kind, Operation::Approve));
            assert!(!role_allows(Role::Contributor, kind, Operation::Publish));
            assert!(!role_allows(Role::Contributor, kind, Operation::Lock));
        }
    }

    #[test]
    fn fork_creation_scoped_to_primary_kind_below_admin() {
        assert!(role_allows(Role::Contributor, ItemKind::Method, Operation::CreateFork));
        assert!(role_allows(Role::Approver, ItemKind::Method, Operation::CreateFork));
        assert!(!role_allows(Role::Contributor, ItemKind::GuideVersion, Operation::CreateFork));
        assert!(!role_allows(Role::Approver, ItemKind::ProtocolVersion, Operation::CreateFork));
        assert!(role_allows(Role::Admin, ItemKind::GuideVersion, Operation::CreateFork));
    }

    #[test]
    fn publish_and_merge_are_admin_only() {
        for &kind in ALL_KINDS {
            for role in [Role::Contributor, Role::Approver] {
                assert!(!role_allows(role, kind, Operation::Publish));
                assert!(!role_allows(role, kind, Operation::PublishFork));
                assert!(!role_allows(role, kind, Operation::RestoreVersion));
                assert!(!role_allows(role, kind, Operation::ArchiveVersion));
                assert!(!role_allows(role, kind, Operation::ResetRelatedItem));
            }
        }
    }

    #[test]
    fn any_role_allows_unions_grants() {
        let roles = [Role::Contributor, Role::Approver];
        assert!(any_role_allows(&roles, ItemKind::Method, Operation::Approve));
        assert!(!any_role_allows(&roles, ItemKind::Method, Operation::Publish));
        assert!(!any_role_allows(&[], ItemKind::Method, Operation::Edit));
    }
}
