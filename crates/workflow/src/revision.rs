//! Fork lifecycle: create a revision, merge it back, restore snapshots.
//!
//! A fork is a full content item of the same kind, linked to its parent
//! through metadata. It runs through the ordinary review gate; publishing
//! it folds everything back into the parent and retires the fork. The
//! merge puts the parent's metadata commit last behind idempotent
//! repository writes, so a failure anywhere leaves the audit trail
//! untouched and a retried merge converges instead of applying twice.

use std::sync::Arc;

use serde_json::json;
use tracing::{info, warn};

use docflow_core::approval::Approval;
use docflow_core::capability::{any_role_allows, Operation};
use docflow_core::history::{self, labels, HistoryEntry};
use docflow_core::version::next_version;
use docflow_core::{BumpKind, ItemId, RepoStatus, UserId, WorkflowError, WorkflowStatus};
use docflow_events::{Audience, EventKind, NotificationDispatcher, WorkflowEvent};
use docflow_store::{ContentItem, ContentRepository, IdentityProvider, MetadataStore, NewContentItem};

use crate::locks::ItemLocks;
use crate::meta::{WorkflowMeta, MERGE_DENYLIST};

pub struct RevisionCoordinator {
    repo: Arc<dyn ContentRepository>,
    meta: Arc<dyn MetadataStore>,
    identity: Arc<dyn IdentityProvider>,
    notifier: Arc<dyn NotificationDispatcher>,
    locks: Arc<ItemLocks>,
}

impl RevisionCoordinator {
    /// `locks` should be the engine's registry so engine and coordinator
    /// serialize against the same items.
    pub fn new(
        repo: Arc<dyn ContentRepository>,
        meta: Arc<dyn MetadataStore>,
        identity: Arc<dyn IdentityProvider>,
        notifier: Arc<dyn NotificationDispatcher>,
        locks: Arc<ItemLocks>,
    ) -> Self {
        RevisionCoordinator {
            repo,
            meta,
            identity,
            notifier,
            locks,
        }
    }

    // -- create -------------------------------------------------------------

    /// Create a fork of `parent_id` targeting the bumped version.
    ///
    /// At most one live fork per parent: a second attempt fails with
    /// [`WorkflowError::ForkAlreadyExists`] until the first is published or
    /// trashed. The fork starts as a fresh draft with no approvals.
    pub async fn create_fork(
        &self,
        parent_id: ItemId,
        actor: UserId,
        bump: BumpKind,
        note: Option<String>,
    ) -> Result<ContentItem, WorkflowError> {
        let _guard = self.locks.acquire(parent_id).await;
        let parent = self.get_item(parent_id).await?;
        let mut pm = WorkflowMeta::load(self.meta.as_ref(), parent_id).await?;
        self.require(actor, parent.kind, Operation::CreateFork).await?;

        if let Some(existing) = pm.active_fork {
            match self.repo.get(existing).await? {
                Some(fork) if fork.status != RepoStatus::Trashed => {
                    return Err(WorkflowError::ForkAlreadyExists(parent_id));
                }
                // Stale pointer (fork trashed or deleted out of band).
                _ => pm.active_fork = None,
            }
        }

        let next = next_version(pm.version, bump);
        let note = note.unwrap_or_else(|| format!("Revision for {} update", parent.title));

        let fork = self
            .repo
            .create(NewContentItem {
                kind: parent.kind,
                title: format!("{} - Revision v{}", parent.title, next),
                body: parent.body.clone(),
                excerpt: parent.excerpt.clone(),
                author: actor,
                status: RepoStatus::Draft,
            })
            .await?;

        let mut fm = WorkflowMeta {
            version: next,
            version_note: note.clone(),
            related_item: pm.related_item,
            ..WorkflowMeta::default()
        };
        fm.set_fork_linkage(parent.kind, parent_id);
        history::append(
            &mut fm.history,
            HistoryEntry::new(labels::CREATED_FROM_VERSION, next)
                .with_actor(actor)
                .with_note(format!("Created from version {}", pm.version)),
        );
        fm.persist(self.meta.as_ref(), fork.id).await?;

        pm.active_fork = Some(fork.id);
        history::append(
            &mut pm.history,
            HistoryEntry::new(labels::FORK_CREATED, pm.version)
                .with_actor(actor)
                .with_fork(fork.id, next)
                .with_note(note),
        );
        pm.persist(self.meta.as_ref(), parent_id).await?;

        info!(parent = %parent_id, fork = %fork.id, version = %next, "fork created");
        self.notify(
            WorkflowEvent::new(EventKind::ForkCreated, parent_id, parent.kind, Audience::Approvers)
                .with_actor(actor)
                .with_payload(json!({
                    "fork_id": fork.id,
                    "next_version": next.to_string(),
                })),
        )
        .await;
        Ok(fork)
    }

    // -- publish ------------------------------------------------------------

    /// Merge an approved fork back into its parent and retire the fork.
    /// Returns the parent's id.
    pub async fn publish_fork(
        &self,
        fork_id: ItemId,
        actor: UserId,
    ) -> Result<ItemId, WorkflowError> {
        let _fork_guard = self.locks.acquire(fork_id).await;
        let fork = self.get_item(fork_id).await?;
        let fm = WorkflowMeta::load(self.meta.as_ref(), fork_id).await?;
        self.require(actor, fork.kind, Operation::PublishFork).await?;

        if fm.fork_parent().is_none() {
            return Err(WorkflowError::Validation(
                "item is not a revision of anything".into(),
            ));
        }
        if fm.status != WorkflowStatus::Approved {
            return Err(WorkflowError::NotApproved(fork_id));
        }

        merge_into_parent(
            MergeContext {
                repo: self.repo.as_ref(),
                meta: self.meta.as_ref(),
                notifier: self.notifier.as_ref(),
                locks: self.locks.as_ref(),
            },
            &fork,
            &fm,
            actor,
        )
        .await
    }

    // -- restore / relink ---------------------------------------------------

    /// Overwrite the item's body with a snapshot recorded in its history.
    ///
    /// Only fork-merge entries carry snapshots. The version number is not
    /// bumped; the restore itself is recorded in history.
    pub async fn restore_version(
        &self,
        item_id: ItemId,
        actor: UserId,
        seq: u32,
    ) -> Result<(), WorkflowError> {
        let _guard = self.locks.acquire(item_id).await;
        let item = self.get_item(item_id).await?;
        let mut m = WorkflowMeta::load(self.meta.as_ref(), item_id).await?;
        self.require(actor, item.kind, Operation::RestoreVersion).await?;

        let entry = m
            .history
            .iter()
            .find(|e| e.seq == seq)
            .ok_or_else(|| {
                WorkflowError::Validation(format!("no history entry with sequence {seq}"))
            })?
            .clone();
        let body = entry
            .new_body
            .clone()
            .or_else(|| entry.previous_body.clone())
            .ok_or_else(|| {
                WorkflowError::Validation(format!(
                    "history entry {seq} carries no content snapshot"
                ))
            })?;

        self.repo
            .update_content(item_id, &item.title, &body, &item.excerpt)
            .await?;
        history::append(
            &mut m.history,
            HistoryEntry::new(labels::VERSION_RESTORED, m.version)
                .with_actor(actor)
                .with_note(format!("Restored content from version {}", entry.version)),
        );
        m.persist(self.meta.as_ref(), item_id).await?;

        info!(item = %item_id, seq, "version restored");
        Ok(())
    }

    /// Mark the item's current version as archived. Informational: the
    /// flag rides along on merges but never gates a transition. No-op
    /// when already archived.
    pub async fn archive_version(
        &self,
        item_id: ItemId,
        actor: UserId,
    ) -> Result<(), WorkflowError> {
        let _guard = self.locks.acquire(item_id).await;
        let item = self.get_item(item_id).await?;
        let mut m = WorkflowMeta::load(self.meta.as_ref(), item_id).await?;
        self.require(actor, item.kind, Operation::ArchiveVersion).await?;

        if m.version_archived {
            return Ok(());
        }
        m.version_archived = true;
        history::append(
            &mut m.history,
            HistoryEntry::new(labels::VERSION_ARCHIVED, m.version).with_actor(actor),
        );
        m.persist(self.meta.as_ref(), item_id).await?;

        info!(item = %item_id, version = %m.version, "version archived");
        Ok(())
    }

    /// Admin repair: point a linked item at a different method (or clear
    /// the link entirely).
    pub async fn reset_related_item(
        &self,
        item_id: ItemId,
        actor: UserId,
        related: Option<ItemId>,
    ) -> Result<(), WorkflowError> {
        let _guard = self.locks.acquire(item_id).await;
        let item = self.get_item(item_id).await?;
        let mut m = WorkflowMeta::load(self.meta.as_ref(), item_id).await?;
        self.require(actor, item.kind, Operation::ResetRelatedItem).await?;

        if !item.kind.is_linked() {
            return Err(WorkflowError::Validation(format!(
                "{} items do not carry a related method",
                item.kind
            )));
        }
        if let Some(rid) = related {
            if self.repo.get(rid).await?.is_none() {
                return Err(WorkflowError::item_not_found(rid));
            }
        }

        m.related_item = related;
        let note = match related {
            Some(rid) => format!("Related method set to {rid}"),
            None => "Related method cleared".to_owned(),
        };
        history::append(
            &mut m.history,
            HistoryEntry::new(labels::RELATED_RESET, m.version)
                .with_actor(actor)
                .with_note(note),
        );
        m.persist(self.meta.as_ref(), item_id).await?;

        info!(item = %item_id, ?related, "related item reset");
        Ok(())
    }

    // -- helpers ------------------------------------------------------------

    async fn get_item(&self, id: ItemId) -> Result<ContentItem, WorkflowError> {
        self.repo
            .get(id)
            .await?
            .ok_or_else(|| WorkflowError::item_not_found(id))
    }

    async fn require(
        &self,
        user: UserId,
        kind: docflow_core::ItemKind,
        op: Operation,
    ) -> Result<(), WorkflowError> {
        let roles = self.identity.roles_of(user).await?;
        if any_role_allows(&roles, kind, op) {
            Ok(())
        } else {
            Err(WorkflowError::PermissionDenied(format!(
                "user {user} may not perform {op:?} on {kind} items"
            )))
        }
    }

    async fn notify(&self, event: WorkflowEvent) {
        if let Err(e) = self.notifier.dispatch(event).await {
            warn!(error = %e, "notification dispatch failed");
        }
    }
}

// ---------------------------------------------------------------------------
// The merge itself
// ---------------------------------------------------------------------------

/// Collaborators the merge needs; borrowed so both the coordinator and the
/// engine (which runs the merge when an approved fork is published through
/// it) can call in.
pub(crate) struct MergeContext<'a> {
    pub repo: &'a dyn ContentRepository,
    pub meta: &'a dyn MetadataStore,
    pub notifier: &'a dyn NotificationDispatcher,
    pub locks: &'a ItemLocks,
}

/// Fold an approved fork back into its parent and retire the fork.
///
/// Carries over: title, body and excerpt (the parent keeps its slug), the
/// fork's version and note, its approvals (after a separator marker), its
/// history (tagged), and any non-workflow metadata keys. The parent ends
/// published and locked.
///
/// Write order: repository first (content, status, fork retirement — all
/// idempotent), the parent's metadata commit last. A failure at any point
/// leaves the fork's record loadable and the parent's approvals and
/// history untouched, so retrying the merge applies it exactly once.
///
/// The caller holds the fork's lock and has verified approval; the
/// parent's lock is taken here.
pub(crate) async fn merge_into_parent(
    ctx: MergeContext<'_>,
    fork: &ContentItem,
    fm: &WorkflowMeta,
    actor: UserId,
) -> Result<ItemId, WorkflowError> {
    let parent_id = fm.fork_parent().ok_or_else(|| {
        WorkflowError::Validation("item is not a revision of anything".into())
    })?;
    let _parent_guard = ctx.locks.acquire(parent_id).await;
    let parent = ctx
        .repo
        .get(parent_id)
        .await?
        .ok_or(WorkflowError::NotFound {
            entity: "parent item",
            id: parent_id,
        })?;
    let mut pm = WorkflowMeta::load(ctx.meta, parent_id).await?;

    ctx.repo
        .update_content(parent_id, &fork.title, &fork.body, &fork.excerpt)
        .await?;
    ctx.repo.change_status(parent_id, RepoStatus::Published).await?;
    ctx.repo.trash(fork.id).await?;

    for (key, value) in ctx.meta.all(fork.id).await? {
        if !MERGE_DENYLIST.contains(&key.as_str()) {
            ctx.meta.set(parent_id, &key, value).await?;
        }
    }

    pm.approvals.push(Approval::separator(
        format!("Revision {} published", fm.version),
        pm.version,
    ));
    pm.approvals.extend(fm.approvals.iter().cloned());
    pm.version = fm.version;
    pm.version_note = fm.version_note.clone();
    pm.status = WorkflowStatus::Published;
    pm.is_locked = true;
    pm.awaiting_final_approval = false;
    pm.cancel_approval_requested = false;
    pm.bump = BumpKind::None;
    pm.active_fork = None;
    // Informational fields the merge adopts alongside the store-level
    // metadata copy, so `persist` writes the fork's values.
    pm.related_item = fm.related_item.or(pm.related_item);
    pm.assigned_approvers = fm.assigned_approvers.clone();
    pm.version_archived = fm.version_archived;

    history::append(
        &mut pm.history,
        HistoryEntry::new(labels::FORK_PUBLISHED, fm.version)
            .with_actor(actor)
            .with_fork(fork.id, fm.version)
            .with_note(fm.version_note.clone())
            .with_bodies(parent.body.clone(), fork.body.clone()),
    );
    for entry in fm.history.iter().cloned() {
        history::append_from_fork(&mut pm.history, entry);
    }

    pm.persist(ctx.meta, parent_id).await?;

    info!(parent = %parent_id, fork = %fork.id, version = %fm.version, "fork published");
    let mut audience = vec![fork.author, parent.author];
    audience.sort();
    audience.dedup();
    let event = WorkflowEvent::new(
        EventKind::ForkPublished,
        parent_id,
        parent.kind,
        Audience::Users(audience),
    )
    .with_actor(actor)
    .with_payload(json!({
        "fork_id": fork.id,
        "version": fm.version.to_string(),
    }));
    if let Err(e) = ctx.notifier.dispatch(event).await {
        warn!(error = %e, "notification dispatch failed");
    }
    Ok(parent_id)
}
