//! Append-only history log entries.
//!
//! Every state-changing operation appends one entry; nothing is ever
//! rewritten or pruned. Sequence numbers are 1-based and strictly
//! monotonic within an item. Entries carried over from a published fork
//! keep their content but are re-sequenced and tagged `from_fork`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{ItemId, UserId};
use crate::version::Version;

// ---------------------------------------------------------------------------
// Entry labels
// ---------------------------------------------------------------------------

/// Free-text status labels, matching the vocabulary shown to auditors.
pub mod labels {
    pub const SUBMITTED_FOR_REVIEW: &str = "submitted for review";
    pub const APPROVED: &str = "approved";
    pub const REJECTED: &str = "rejected";
    pub const FINAL_APPROVAL_REQUESTED: &str = "submitted for final approval";
    pub const APPROVAL_CANCELED: &str = "approval request canceled";
    pub const PUBLISHED: &str = "published";
    pub const LOCKED: &str = "locked";
    pub const UNLOCKED: &str = "unlocked for editing";
    pub const FORK_CREATED: &str = "revision created";
    pub const FORK_PUBLISHED: &str = "revision published";
    pub const CREATED_FROM_VERSION: &str = "created from previous version";
    pub const VERSION_RESTORED: &str = "version restored";
    pub const VERSION_ARCHIVED: &str = "version archived";
    pub const RELATED_UPDATED: &str = "updated from linked version";
    pub const RELATED_RESET: &str = "related item reset";
}

// ---------------------------------------------------------------------------
// HistoryEntry
// ---------------------------------------------------------------------------

/// One entry in an item's history log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// 1-based position in the log, assigned by [`append`].
    #[serde(default)]
    pub seq: u32,

    /// Acting user; `None` for system-generated entries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor: Option<UserId>,

    pub at: DateTime<Utc>,

    /// Free-text label from [`labels`].
    pub status: String,

    /// Item version at the time of the entry.
    pub version: Version,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,

    /// Fork this entry refers to (fork-creation entries on the parent).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fork_id: Option<ItemId>,

    /// Target version recorded when a fork is created.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_version: Option<Version>,

    /// Body snapshots recorded by the fork-merge entry; these make later
    /// restores possible.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_body: Option<String>,

    /// `true` for entries merged in from a published fork.
    #[serde(default)]
    pub from_fork: bool,
}

impl HistoryEntry {
    pub fn new(status: impl Into<String>, version: Version) -> Self {
        HistoryEntry {
            seq: 0,
            actor: None,
            at: Utc::now(),
            status: status.into(),
            version,
            note: None,
            fork_id: None,
            next_version: None,
            previous_body: None,
            new_body: None,
            from_fork: false,
        }
    }

    pub fn with_actor(mut self, actor: UserId) -> Self {
        self.actor = Some(actor);
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    pub fn with_fork(mut self, fork_id: ItemId, next_version: Version) -> Self {
        self.fork_id = Some(fork_id);
        self.next_version = Some(next_version);
        self
    }

    pub fn with_bodies(
        mut self,
        previous_body: impl Into<String>,
        new_body: impl Into<String>,
    ) -> Self {
        self.previous_body = Some(previous_body.into());
        self.new_body = Some(new_body.into());
        self
    }
}

/// Append an entry, assigning the next sequence number.
pub fn append(log: &mut Vec<HistoryEntry>, mut entry: HistoryEntry) {
    entry.seq = log.len() as u32 + 1;
    log.push(entry);
}

/// Append an entry from a fork's log, re-sequencing and tagging it.
pub fn append_from_fork(log: &mut Vec<HistoryEntry>, mut entry: HistoryEntry) {
    entry.from_fork = true;
    append(log, entry);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
