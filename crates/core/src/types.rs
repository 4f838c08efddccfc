//! Shared identifier aliases and the content-kind enum.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::WorkflowError;

/// Identifier of a content item in the repository.
pub type ItemId = Uuid;

/// Identifier of a user known to the identity provider.
pub type UserId = Uuid;

// ---------------------------------------------------------------------------
// ItemKind
// ---------------------------------------------------------------------------

/// The content kinds governed by the workflow.
///
/// `Method` is the primary kind: it supports revisions and admin
/// lock/unlock. `GuideVersion` and `ProtocolVersion` are linked kinds: each
/// instance references a `Method` it updates on publish, and forks of them
/// are called version forks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Method,
    GuideVersion,
    ProtocolVersion,
}

/// All kinds, in declaration order.
pub const ALL_KINDS: &[ItemKind] = &[
    ItemKind::Method,
    ItemKind::GuideVersion,
    ItemKind::ProtocolVersion,
];

impl ItemKind {
    /// Canonical string form, as stored in metadata and event payloads.
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemKind::Method => "method",
            ItemKind::GuideVersion => "guide_version",
            ItemKind::ProtocolVersion => "protocol_version",
        }
    }

    /// Parse the canonical string form.
    pub fn parse(s: &str) -> Result<Self, WorkflowError> {
        match s {
            "method" => Ok(ItemKind::Method),
            "guide_version" => Ok(ItemKind::GuideVersion),
            "protocol_version" => Ok(ItemKind::ProtocolVersion),
            other => Err(WorkflowError::Validation(format!(
                "unknown item kind: '{other}'"
            ))),
        }
    }

    /// Linked kinds carry a `related_item_id` and push content onto the
    /// related `Method` when published.
    pub fn is_linked(&self) -> bool {
        matches!(self, ItemKind::GuideVersion | ItemKind::ProtocolVersion)
    }
}

impl std::fmt::Display for ItemKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
