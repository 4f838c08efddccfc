//! The draft / review / approval / publish state machine.
//!
//! One engine instance serves all items; collaborators are injected as
//! trait objects. Every operation acquires the item's lock, loads the
//! repository record and the workflow metadata, checks capability, applies
//! the transition, persists metadata before mirroring the repository
//! status, and finally notifies — dispatch failures are logged and
//! swallowed, never surfaced to the caller.

use std::sync::Arc;

use serde_json::json;
use tracing::{info, warn};

use docflow_core::approval::{self, Approval, Decision};
use docflow_core::capability::{any_role_allows, Operation, Role};
use docflow_core::history::{self, labels, HistoryEntry};
use docflow_core::version::{first_submission_version, next_version};
use docflow_core::{
    BumpKind, ItemId, RepoStatus, UserId, Version, WorkflowError, WorkflowStatus,
};
use docflow_events::{Audience, EventKind, NotificationDispatcher, WorkflowEvent};
use docflow_store::{ContentItem, ContentRepository, IdentityProvider, MetadataStore};

use crate::locks::ItemLocks;
use crate::meta::WorkflowMeta;

// ---------------------------------------------------------------------------
// EffectiveStatus
// ---------------------------------------------------------------------------

/// Normalized single-read view of an item's workflow state.
#[derive(Debug, Clone, PartialEq)]
pub struct EffectiveStatus {
    pub status: WorkflowStatus,
    pub is_locked: bool,
    pub awaiting_final_approval: bool,
    pub version: Version,
    /// Set when the item is a fork of another item.
    pub fork_parent: Option<ItemId>,
}

// ---------------------------------------------------------------------------
// WorkflowEngine
// ---------------------------------------------------------------------------

pub struct WorkflowEngine {
    repo: Arc<dyn ContentRepository>,
    meta: Arc<dyn MetadataStore>,
    identity: Arc<dyn IdentityProvider>,
    notifier: Arc<dyn NotificationDispatcher>,
    locks: Arc<ItemLocks>,
}

impl WorkflowEngine {
    pub fn new(
        repo: Arc<dyn ContentRepository>,
        meta: Arc<dyn MetadataStore>,
        identity: Arc<dyn IdentityProvider>,
        notifier: Arc<dyn NotificationDispatcher>,
    ) -> Self {
        WorkflowEngine {
            repo,
            meta,
            identity,
            notifier,
            locks: Arc::new(ItemLocks::new()),
        }
    }

    /// The per-item lock registry, shared with the revision coordinator so
    /// both serialize against the same items.
    pub fn locks(&self) -> Arc<ItemLocks> {
        self.locks.clone()
    }

    // -- operations ---------------------------------------------------------

    /// Submit a draft (or rejected) item for review.
    ///
    /// The first submission always allocates version `0.1`; later rounds
    /// apply the requested bump. Earlier approvals are cleared, so every
    /// round faces the full two-reviewer gate. Returns the version under
    /// review.
    pub async fn submit_for_review(
        &self,
        item_id: ItemId,
        actor: UserId,
        bump: BumpKind,
        approvers: Option<Vec<UserId>>,
    ) -> Result<Version, WorkflowError> {
        let _guard = self.locks.acquire(item_id).await;
        let (item, mut m) = self.load(item_id).await?;
        self.require(actor, item.kind, Operation::SubmitForReview).await?;
        self.require_author_or_admin(actor, &item).await?;

        if !m.status.can_submit() {
            return Err(WorkflowError::InvalidState(format!(
                "cannot submit for review from status '{}'",
                m.status.as_str()
            )));
        }
        if item.kind.is_linked() && m.related_item.is_none() {
            return Err(WorkflowError::Validation(
                "a related method must be set before submission".into(),
            ));
        }

        // An explicit bump wins; otherwise a previously requested one is
        // consumed.
        let requested = match bump {
            BumpKind::None => m.bump,
            other => other,
        };
        m.version = if m.version == Version::ZERO {
            first_submission_version(m.version)
        } else {
            next_version(m.version, requested)
        };
        m.bump = BumpKind::None;
        m.approvals.clear();
        m.awaiting_final_approval = false;
        m.cancel_approval_requested = false;
        m.status = WorkflowStatus::PendingReview;
        if let Some(list) = approvers {
            m.assigned_approvers = list;
        }
        history::append(
            &mut m.history,
            HistoryEntry::new(labels::SUBMITTED_FOR_REVIEW, m.version).with_actor(actor),
        );
        m.persist(self.meta.as_ref(), item_id).await?;
        self.repo.change_status(item_id, RepoStatus::Pending).await?;

        info!(item = %item_id, version = %m.version, "submitted for review");
        self.notify(
            WorkflowEvent::new(
                EventKind::SubmittedForReview,
                item_id,
                item.kind,
                Audience::Approvers,
            )
            .with_actor(actor)
            .with_payload(json!({ "version": m.version.to_string() })),
        )
        .await;
        Ok(m.version)
    }

    /// Record a version bump to apply later: the stored kind is consumed
    /// by the item's next submission without an explicit bump, and cleared.
    pub async fn request_version_bump(
        &self,
        item_id: ItemId,
        actor: UserId,
        bump: BumpKind,
    ) -> Result<(), WorkflowError> {
        let _guard = self.locks.acquire(item_id).await;
        let (item, mut m) = self.load(item_id).await?;
        self.require(actor, item.kind, Operation::Edit).await?;
        self.require_author_or_admin(actor, &item).await?;

        m.bump = bump;
        m.persist(self.meta.as_ref(), item_id).await?;
        info!(item = %item_id, ?bump, "version bump requested");
        Ok(())
    }

    /// Record an approval. Idempotent per reviewer: deciding again
    /// replaces the earlier entry. Returns the distinct-approval count.
    pub async fn approve(
        &self,
        item_id: ItemId,
        actor: UserId,
        comment: &str,
    ) -> Result<usize, WorkflowError> {
        let _guard = self.locks.acquire(item_id).await;
        let (item, mut m) = self.load(item_id).await?;
        self.require(actor, item.kind, Operation::Approve).await?;
        self.require_pending(&m)?;

        approval::record_decision(
            &mut m.approvals,
            Approval::decision(actor, Decision::Approved, comment, m.version),
        );
        let count = approval::approval_count(&m.approvals);
        history::append(
            &mut m.history,
            HistoryEntry::new(labels::APPROVED, m.version)
                .with_actor(actor)
                .with_note(comment),
        );

        if approval::gate_passed(&m.approvals) {
            m.status = WorkflowStatus::Approved;
            m.awaiting_final_approval = false;
            m.persist(self.meta.as_ref(), item_id).await?;

            info!(item = %item_id, count, "approval gate passed");
            let mut audience = self.identity.users_with_role(Role::Admin).await?;
            audience.push(item.author);
            audience.sort();
            audience.dedup();
            self.notify(
                WorkflowEvent::new(EventKind::Approved, item_id, item.kind, Audience::Users(audience))
                    .with_actor(actor)
                    .with_payload(json!({ "version": m.version.to_string(), "approvals": count })),
            )
            .await;
        } else {
            if m.awaiting_final_approval {
                m.status = WorkflowStatus::PendingFinalApproval;
            }
            m.persist(self.meta.as_ref(), item_id).await?;
            info!(item = %item_id, count, "approval recorded");
        }
        Ok(count)
    }

    /// Record a rejection. The comment is mandatory; the round ends and
    /// the item returns to the author as a rejected draft.
    pub async fn reject(
        &self,
        item_id: ItemId,
        actor: UserId,
        comment: &str,
    ) -> Result<(), WorkflowError> {
        if comment.trim().is_empty() {
            return Err(WorkflowError::Validation(
                "a rejection comment is required".into(),
            ));
        }
        let _guard = self.locks.acquire(item_id).await;
        let (item, mut m) = self.load(item_id).await?;
        self.require(actor, item.kind, Operation::Reject).await?;
        self.require_pending(&m)?;

        approval::record_decision(
            &mut m.approvals,
            Approval::decision(actor, Decision::Rejected, comment, m.version),
        );
        m.status = WorkflowStatus::Rejected;
        m.awaiting_final_approval = false;
        history::append(
            &mut m.history,
            HistoryEntry::new(labels::REJECTED, m.version)
                .with_actor(actor)
                .with_note(comment),
        );
        m.persist(self.meta.as_ref(), item_id).await?;
        self.repo.change_status(item_id, RepoStatus::Draft).await?;

        info!(item = %item_id, "rejected");
        self.notify(
            WorkflowEvent::new(EventKind::Rejected, item_id, item.kind, Audience::Author)
                .with_actor(actor)
                .with_payload(json!({ "comment": comment })),
        )
        .await;
        Ok(())
    }

    /// After exactly one approval, escalate the remainder of the gate to a
    /// single final approver.
    pub async fn request_final_approval(
        &self,
        item_id: ItemId,
        actor: UserId,
    ) -> Result<(), WorkflowError> {
        let _guard = self.locks.acquire(item_id).await;
        let (item, mut m) = self.load(item_id).await?;
        if item.author != actor && !self.is_admin(actor).await? {
            return Err(WorkflowError::PermissionDenied(
                "only the author or an admin may request final approval".into(),
            ));
        }

        if m.status != WorkflowStatus::PendingReview {
            return Err(WorkflowError::InvalidState(format!(
                "final approval can only be requested from 'pending_review', not '{}'",
                m.status.as_str()
            )));
        }
        if approval::approval_count(&m.approvals) != 1 {
            return Err(WorkflowError::InvalidState(
                "final approval requires exactly one recorded approval".into(),
            ));
        }
        if m.awaiting_final_approval {
            return Err(WorkflowError::InvalidState(
                "final approval already requested".into(),
            ));
        }

        m.awaiting_final_approval = true;
        m.status = WorkflowStatus::PendingFinalApproval;
        history::append(
            &mut m.history,
            HistoryEntry::new(labels::FINAL_APPROVAL_REQUESTED, m.version).with_actor(actor),
        );
        m.persist(self.meta.as_ref(), item_id).await?;

        // Reviewers who already decided are not asked again.
        let decided: Vec<UserId> = m.approvals.iter().filter_map(|a| a.reviewer).collect();
        let remaining: Vec<UserId> = self
            .identity
            .users_with_role(Role::Approver)
            .await?
            .into_iter()
            .filter(|u| !decided.contains(u))
            .collect();

        info!(item = %item_id, "final approval requested");
        self.notify(
            WorkflowEvent::new(
                EventKind::FinalApprovalRequested,
                item_id,
                item.kind,
                Audience::Users(remaining),
            )
            .with_actor(actor)
            .with_payload(json!({ "version": m.version.to_string() })),
        )
        .await;
        Ok(())
    }

    /// Withdraw an in-flight review request; the item returns to draft and
    /// the author regains editability.
    pub async fn cancel_approval_request(
        &self,
        item_id: ItemId,
        actor: UserId,
    ) -> Result<(), WorkflowError> {
        let _guard = self.locks.acquire(item_id).await;
        let (item, mut m) = self.load(item_id).await?;
        self.require(actor, item.kind, Operation::CancelApproval).await?;
        self.require_author_or_admin(actor, &item).await?;
        self.require_pending(&m)?;

        m.status = WorkflowStatus::Draft;
        m.awaiting_final_approval = false;
        m.cancel_approval_requested = true;
        history::append(
            &mut m.history,
            HistoryEntry::new(labels::APPROVAL_CANCELED, m.version).with_actor(actor),
        );
        m.persist(self.meta.as_ref(), item_id).await?;
        self.repo.change_status(item_id, RepoStatus::Draft).await?;

        info!(item = %item_id, "approval request canceled");
        Ok(())
    }

    /// Publish an approved item. The item locks first, then the
    /// repository status flips, so no window exists where the item is
    /// published but editable. Linked kinds push their content and version
    /// onto the related method.
    ///
    /// If the repository write fails after the metadata committed, the
    /// item is left marked published with the repository still pending; a
    /// retried publish detects that half-state and finishes the
    /// repository side without re-appending history.
    pub async fn publish(&self, item_id: ItemId, actor: UserId) -> Result<(), WorkflowError> {
        let _guard = self.locks.acquire(item_id).await;
        let (item, mut m) = self.load(item_id).await?;
        self.require(actor, item.kind, Operation::Publish).await?;

        let resuming =
            m.status == WorkflowStatus::Published && item.status != RepoStatus::Published;
        if m.status != WorkflowStatus::Approved && !resuming {
            return Err(WorkflowError::InvalidState(format!(
                "only approved items can be published, status is '{}'",
                m.status.as_str()
            )));
        }
        if !approval::gate_passed(&m.approvals) {
            return Err(WorkflowError::NotApproved(item_id));
        }

        // An approved fork publishes by merging back into its parent.
        if m.is_fork() {
            let parent = crate::revision::merge_into_parent(
                crate::revision::MergeContext {
                    repo: self.repo.as_ref(),
                    meta: self.meta.as_ref(),
                    notifier: self.notifier.as_ref(),
                    locks: self.locks.as_ref(),
                },
                &item,
                &m,
                actor,
            )
            .await?;
            info!(item = %item_id, parent = %parent, "fork published into parent");
            return Ok(());
        }

        if !resuming {
            m.status = WorkflowStatus::Published;
            m.is_locked = true;
            history::append(
                &mut m.history,
                HistoryEntry::new(labels::PUBLISHED, m.version).with_actor(actor),
            );
            m.persist(self.meta.as_ref(), item_id).await?;
        }
        self.repo.change_status(item_id, RepoStatus::Published).await?;

        info!(item = %item_id, version = %m.version, "published");

        if item.kind.is_linked() {
            self.propagate_to_related(&item, &m, actor).await?;
        }

        let mut audience: Vec<UserId> = self
            .identity
            .users_with_role(Role::Approver)
            .await?
            .into_iter()
            .filter(|u| *u != actor)
            .collect();
        audience.push(item.author);
        audience.sort();
        audience.dedup();
        self.notify(
            WorkflowEvent::new(EventKind::Published, item_id, item.kind, Audience::Users(audience))
                .with_actor(actor)
                .with_payload(json!({ "version": m.version.to_string() })),
        )
        .await;
        Ok(())
    }

    /// Push a published linked item's body and version onto its related
    /// method, locking it.
    async fn propagate_to_related(
        &self,
        item: &ContentItem,
        m: &WorkflowMeta,
        actor: UserId,
    ) -> Result<(), WorkflowError> {
        let Some(related_id) = m.related_item else {
            return Ok(());
        };
        let Some(related) = self.repo.get(related_id).await? else {
            warn!(item = %item.id, related = %related_id, "related method missing, skipping update");
            return Ok(());
        };

        // Content moves over; the related item keeps its own title.
        self.repo
            .update_content(related_id, &related.title, &item.body, &related.excerpt)
            .await?;

        let mut rm = WorkflowMeta::load(self.meta.as_ref(), related_id).await?;
        rm.version = m.version;
        rm.is_locked = true;
        history::append(
            &mut rm.history,
            HistoryEntry::new(labels::RELATED_UPDATED, rm.version)
                .with_actor(actor)
                .with_note(format!("Updated from {} version {}", item.kind, m.version)),
        );
        rm.persist(self.meta.as_ref(), related_id).await?;

        info!(item = %item.id, related = %related_id, version = %m.version, "related method updated");
        Ok(())
    }

    /// Admin lock. No-op when already locked.
    pub async fn lock(&self, item_id: ItemId, actor: UserId) -> Result<(), WorkflowError> {
        self.set_locked(item_id, actor, true).await
    }

    /// Admin unlock. The workflow status is preserved: unlocking a
    /// published item makes it editable without un-publishing it.
    pub async fn unlock(&self, item_id: ItemId, actor: UserId) -> Result<(), WorkflowError> {
        self.set_locked(item_id, actor, false).await
    }

    async fn set_locked(
        &self,
        item_id: ItemId,
        actor: UserId,
        locked: bool,
    ) -> Result<(), WorkflowError> {
        let _guard = self.locks.acquire(item_id).await;
        let (item, mut m) = self.load(item_id).await?;
        let op = if locked { Operation::Lock } else { Operation::Unlock };
        self.require(actor, item.kind, op).await?;

        if m.is_locked == locked {
            return Ok(());
        }
        m.is_locked = locked;
        let label = if locked { labels::LOCKED } else { labels::UNLOCKED };
        history::append(
            &mut m.history,
            HistoryEntry::new(label, m.version).with_actor(actor),
        );
        m.persist(self.meta.as_ref(), item_id).await?;

        info!(item = %item_id, locked, "lock state changed");
        let kind = if locked { EventKind::Locked } else { EventKind::Unlocked };
        self.notify(
            WorkflowEvent::new(kind, item_id, item.kind, Audience::Author).with_actor(actor),
        )
        .await;
        Ok(())
    }

    // -- queries ------------------------------------------------------------

    /// May `user` edit the item right now?
    pub async fn can_edit(&self, item_id: ItemId, user: UserId) -> Result<bool, WorkflowError> {
        let (item, m) = self.load(item_id).await?;
        let roles = self.identity.roles_of(user).await?;
        if roles.contains(&Role::Admin) {
            return Ok(true);
        }
        if m.is_locked {
            return Ok(false);
        }
        if m.status.is_pending() {
            // During review only reviewers touch the item. The author gets
            // it back by canceling the request; if that cancellation has
            // been recorded but the item is still listed as pending, the
            // author may already edit.
            if user == item.author {
                return Ok(m.cancel_approval_requested);
            }
            return Ok(roles.contains(&Role::Approver));
        }
        if user == item.author {
            return Ok(any_role_allows(&roles, item.kind, Operation::Edit));
        }
        Ok(roles.contains(&Role::Approver))
    }

    /// Single normalized read of the item's workflow state.
    pub async fn effective_status(
        &self,
        item_id: ItemId,
    ) -> Result<EffectiveStatus, WorkflowError> {
        let (_, m) = self.load(item_id).await?;
        Ok(EffectiveStatus {
            status: m.status,
            // Publishing sets the flag; an admin unlock clears it while the
            // status stays Published, and this view reports that truthfully.
            is_locked: m.is_locked,
            awaiting_final_approval: m.awaiting_final_approval,
            version: m.version,
            fork_parent: m.fork_parent(),
        })
    }

    /// The item's full history log, oldest first.
    pub async fn get_history(
        &self,
        item_id: ItemId,
    ) -> Result<Vec<HistoryEntry>, WorkflowError> {
        let (_, m) = self.load(item_id).await?;
        Ok(m.history)
    }

    // -- helpers ------------------------------------------------------------

    async fn load(&self, id: ItemId) -> Result<(ContentItem, WorkflowMeta), WorkflowError> {
        let item = self
            .repo
            .get(id)
            .await?
            .ok_or_else(|| WorkflowError::item_not_found(id))?;
        let m = WorkflowMeta::load(self.meta.as_ref(), id).await?;
        Ok((item, m))
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

    async fn require_author_or_admin(
        &self,
        user: UserId,
        item: &ContentItem,
    ) -> Result<(), WorkflowError> {
        if item.author == user || self.is_admin(user).await? {
            Ok(())
        } else {
            Err(WorkflowError::PermissionDenied(
                "only the author or an admin may do this".into(),
            ))
        }
    }

    fn require_pending(&self, m: &WorkflowMeta) -> Result<(), WorkflowError> {
        if m.status.is_pending() {
            Ok(())
        } else {
            Err(WorkflowError::InvalidState(format!(
                "item is not under review, status is '{}'",
                m.status.as_str()
            )))
        }
    }

    async fn is_admin(&self, user: UserId) -> Result<bool, WorkflowError> {
        Ok(self.identity.roles_of(user).await?.contains(&Role::Admin))
    }

    async fn notify(&self, event: WorkflowEvent) {
        if let Err(e) = self.notifier.dispatch(event).await {
            warn!(error = %e, "notification dispatch failed");
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
