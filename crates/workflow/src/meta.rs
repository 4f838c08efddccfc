//! Typed accessor over the per-item workflow metadata keys.
//!
//! The engine and the revision coordinator are the only writers of the
//! `workflow.*` keys. Values are whole JSON documents per key, so a
//! `persist` replaces each key's previous value; other components may
//! store their own keys next to these, and a fork merge copies those
//! through untouched (minus [`MERGE_DENYLIST`]).

use serde::de::DeserializeOwned;
use serde::Serialize;

use docflow_core::approval::Approval;
use docflow_core::history::HistoryEntry;
use docflow_core::{BumpKind, ItemId, ItemKind, UserId, Version, WorkflowError, WorkflowStatus};
use docflow_store::MetadataStore;

// ---------------------------------------------------------------------------
// Keys
// ---------------------------------------------------------------------------

pub mod keys {
    pub const STATUS: &str = "workflow.status";
    pub const IS_LOCKED: &str = "workflow.is_locked";
    pub const AWAITING_FINAL_APPROVAL: &str = "workflow.awaiting_final_approval";
    pub const APPROVALS: &str = "workflow.approvals";
    pub const VERSION: &str = "workflow.version_number";
    pub const BUMP: &str = "workflow.version_bump_kind";
    pub const VERSION_NOTE: &str = "workflow.version_note";
    pub const VERSION_ARCHIVED: &str = "workflow.version_archived";
    pub const IS_REVISION: &str = "workflow.is_revision";
    pub const REVISION_PARENT: &str = "workflow.revision_parent_id";
    pub const IS_VERSION_FORK: &str = "workflow.is_version_fork";
    pub const VERSION_FORK_PARENT: &str = "workflow.version_fork_parent_id";
    pub const RELATED_ITEM: &str = "workflow.related_item_id";
    pub const ASSIGNED_APPROVERS: &str = "workflow.assigned_approvers";
    pub const CANCEL_REQUESTED: &str = "workflow.cancel_approval_requested";
    pub const HISTORY: &str = "workflow.history";
    pub const ACTIVE_FORK: &str = "workflow.active_fork_id";
}

/// Keys never copied from a fork onto its parent during a merge. The
/// parent's own workflow state (and the adopted version) is written
/// explicitly by the coordinator; everything else copies through.
pub const MERGE_DENYLIST: &[&str] = &[
    keys::STATUS,
    keys::IS_LOCKED,
    keys::APPROVALS,
    keys::VERSION,
    keys::BUMP,
    keys::VERSION_NOTE,
    keys::IS_REVISION,
    keys::REVISION_PARENT,
    keys::IS_VERSION_FORK,
    keys::VERSION_FORK_PARENT,
    keys::AWAITING_FINAL_APPROVAL,
    keys::CANCEL_REQUESTED,
    keys::HISTORY,
    keys::ACTIVE_FORK,
];

// ---------------------------------------------------------------------------
// WorkflowMeta
// ---------------------------------------------------------------------------

/// The full workflow metadata record of one item.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowMeta {
    pub status: WorkflowStatus,
    pub is_locked: bool,
    pub awaiting_final_approval: bool,
    pub approvals: Vec<Approval>,
    pub version: Version,
    pub bump: BumpKind,
    pub version_note: String,
    pub version_archived: bool,
    pub is_revision: bool,
    pub revision_parent: Option<ItemId>,
    pub is_version_fork: bool,
    pub version_fork_parent: Option<ItemId>,
    pub related_item: Option<ItemId>,
    pub assigned_approvers: Vec<UserId>,
    pub cancel_approval_requested: bool,
    pub history: Vec<HistoryEntry>,
    pub active_fork: Option<ItemId>,
}

impl Default for WorkflowMeta {
    fn default() -> Self {
        WorkflowMeta {
            status: WorkflowStatus::Draft,
            is_locked: false,
            awaiting_final_approval: false,
            approvals: Vec::new(),
            version: Version::ZERO,
            bump: BumpKind::None,
            version_note: String::new(),
            version_archived: false,
            is_revision: false,
            revision_parent: None,
            is_version_fork: false,
            version_fork_parent: None,
            related_item: None,
            assigned_approvers: Vec::new(),
            cancel_approval_requested: false,
            history: Vec::new(),
            active_fork: None,
        }
    }
}

impl WorkflowMeta {
    /// Read the item's full record; absent keys take their defaults, so a
    /// never-touched item loads as a draft at version `0.0`.
    pub async fn load(store: &dyn MetadataStore, item: ItemId) -> Result<Self, WorkflowError> {
        let defaults = WorkflowMeta::default();
        Ok(WorkflowMeta {
            status: read(store, item, keys::STATUS).await?.unwrap_or(defaults.status),
            is_locked: read(store, item, keys::IS_LOCKED).await?.unwrap_or(false),
            awaiting_final_approval: read(store, item, keys::AWAITING_FINAL_APPROVAL)
                .await?
                .unwrap_or(false),
            approvals: read(store, item, keys::APPROVALS).await?.unwrap_or_default(),
            version: read(store, item, keys::VERSION).await?.unwrap_or(Version::ZERO),
            bump: read(store, item, keys::BUMP).await?.unwrap_or(BumpKind::None),
            version_note: read(store, item, keys::VERSION_NOTE).await?.unwrap_or_default(),
            version_archived: read(store, item, keys::VERSION_ARCHIVED)
                .await?
                .unwrap_or(false),
            is_revision: read(store, item, keys::IS_REVISION).await?.unwrap_or(false),
            revision_parent: read(store, item, keys::REVISION_PARENT).await?,
            is_version_fork: read(store, item, keys::IS_VERSION_FORK).await?.unwrap_or(false),
            version_fork_parent: read(store, item, keys::VERSION_FORK_PARENT).await?,
            related_item: read(store, item, keys::RELATED_ITEM).await?,
            assigned_approvers: read(store, item, keys::ASSIGNED_APPROVERS)
                .await?
                .unwrap_or_default(),
            cancel_approval_requested: read(store, item, keys::CANCEL_REQUESTED)
                .await?
                .unwrap_or(false),
            history: read(store, item, keys::HISTORY).await?.unwrap_or_default(),
            active_fork: read(store, item, keys::ACTIVE_FORK).await?,
        })
    }

    /// Write the full record back, key by key. Optional linkage fields are
    /// deleted when unset so stale linkage never survives.
    pub async fn persist(&self, store: &dyn MetadataStore, item: ItemId) -> Result<(), WorkflowError> {
        write(store, item, keys::STATUS, &self.status).await?;
        write(store, item, keys::IS_LOCKED, &self.is_locked).await?;
        write(
            store,
            item,
            keys::AWAITING_FINAL_APPROVAL,
            &self.awaiting_final_approval,
        )
        .await?;
        write(store, item, keys::APPROVALS, &self.approvals).await?;
        write(store, item, keys::VERSION, &self.version).await?;
        write(store, item, keys::BUMP, &self.bump).await?;
        write(store, item, keys::VERSION_NOTE, &self.version_note).await?;
        write(store, item, keys::VERSION_ARCHIVED, &self.version_archived).await?;
        write(store, item, keys::IS_REVISION, &self.is_revision).await?;
        write_opt(store, item, keys::REVISION_PARENT, &self.revision_parent).await?;
        write(store, item, keys::IS_VERSION_FORK, &self.is_version_fork).await?;
        write_opt(store, item, keys::VERSION_FORK_PARENT, &self.version_fork_parent).await?;
        write_opt(store, item, keys::RELATED_ITEM, &self.related_item).await?;
        write(store, item, keys::ASSIGNED_APPROVERS, &self.assigned_approvers).await?;
        write(store, item, keys::CANCEL_REQUESTED, &self.cancel_approval_requested).await?;
        write(store, item, keys::HISTORY, &self.history).await?;
        write_opt(store, item, keys::ACTIVE_FORK, &self.active_fork).await?;
        Ok(())
    }

    /// The parent of a fork, whichever flavor it is.
    pub fn fork_parent(&self) -> Option<ItemId> {
        self.revision_parent.or(self.version_fork_parent)
    }

    pub fn is_fork(&self) -> bool {
        self.is_revision || self.is_version_fork
    }

    /// Set the fork linkage appropriate to the kind.
    pub fn set_fork_linkage(&mut self, kind: ItemKind, parent: ItemId) {
        if kind.is_linked() {
            self.is_version_fork = true;
            self.version_fork_parent = Some(parent);
        } else {
            self.is_revision = true;
            self.revision_parent = Some(parent);
        }
    }
}

// ---------------------------------------------------------------------------
// Key-level helpers
// ---------------------------------------------------------------------------

async fn read<T: DeserializeOwned>(
    store: &dyn MetadataStore,
    item: ItemId,
    key: &str,
) -> Result<Option<T>, WorkflowError> {
    match store.get(item, key).await? {
        None => Ok(None),
        Some(value) => serde_json::from_value(value).map(Some).map_err(|e| {
            WorkflowError::Repository(format!("corrupt metadata at {key} for {item}: {e}"))
        }),
    }
}

async fn write<T: Serialize>(
    store: &dyn MetadataStore,
    item: ItemId,
    key: &str,
    value: &T,
) -> Result<(), WorkflowError> {
    let json = serde_json::to_value(value)
        .map_err(|e| WorkflowError::Repository(format!("serialize {key}: {e}")))?;
    store.set(item, key, json).await
}

async fn write_opt<T: Serialize>(
    store: &dyn MetadataStore,
    item: ItemId,
    key: &str,
    value: &Option<T>,
) -> Result<(), WorkflowError> {
    match value {
        Some(v) => write(store, item, key, v).await,
        None => store.delete(item, key).await,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
