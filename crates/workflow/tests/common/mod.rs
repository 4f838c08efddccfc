//! Shared harness for the workflow integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use uuid::Uuid;

use docflow_core::{ItemId, ItemKind, RepoStatus, Role, UserId};
use docflow_events::RecordingDispatcher;
use docflow_store::{
    ContentRepository, MemoryMetadataStore, MemoryRepository, NewContentItem, StaticIdentity,
};
use docflow_workflow::{RevisionCoordinator, WorkflowEngine};

pub struct Harness {
    pub engine: WorkflowEngine,
    pub coordinator: RevisionCoordinator,
    pub repo: Arc<MemoryRepository>,
    pub meta: Arc<MemoryMetadataStore>,
    pub events: Arc<RecordingDispatcher>,
    pub author: UserId,
    pub reviewer_a: UserId,
    pub reviewer_b: UserId,
    pub admin: UserId,
}

pub fn harness() -> Harness {
    // RUST_LOG=docflow_workflow=debug surfaces engine traces in test runs.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();

    let author = Uuid::new_v4();
    let reviewer_a = Uuid::new_v4();
    let reviewer_b = Uuid::new_v4();
    let admin = Uuid::new_v4();

    let repo = Arc::new(MemoryRepository::new());
    let meta = Arc::new(MemoryMetadataStore::new());
    let events = Arc::new(RecordingDispatcher::new());
    let identity = Arc::new(
        StaticIdentity::new()
            .with_user(author, &[Role::Contributor])
            .with_user(reviewer_a, &[Role::Approver])
            .with_user(reviewer_b, &[Role::Approver])
            .with_user(admin, &[Role::Admin]),
    );

    let engine = WorkflowEngine::new(
        repo.clone(),
        meta.clone(),
        identity.clone(),
        events.clone(),
    );
    let coordinator = RevisionCoordinator::new(
        repo.clone(),
        meta.clone(),
        identity,
        events.clone(),
        engine.locks(),
    );

    Harness {
        engine,
        coordinator,
        repo,
        meta,
        events,
        author,
        reviewer_a,
        reviewer_b,
        admin,
    }
}

impl Harness {
    pub async fn repo_item(&self, id: ItemId) -> docflow_store::ContentItem {
        self.repo.get(id).await.unwrap().unwrap()
    }

    pub async fn draft(&self, kind: ItemKind, title: &str) -> ItemId {
        self.repo
            .create(NewContentItem {
                kind,
                title: title.into(),
                body: format!("{title} body"),
                excerpt: format!("{title} excerpt"),
                author: self.author,
                status: RepoStatus::Draft,
            })
            .await
            .unwrap()
            .id
    }

    pub async fn method_draft(&self) -> ItemId {
        self.draft(ItemKind::Method, "Sample Method").await
    }

    /// Submit and take the item through the two-reviewer gate.
    pub async fn approve_twice(&self, item: ItemId) {
        self.engine
            .submit_for_review(item, self.author, docflow_core::BumpKind::None, None)
            .await
            .unwrap();
        self.engine
            .approve(item, self.reviewer_a, "looks good")
            .await
            .unwrap();
        self.engine
            .approve(item, self.reviewer_b, "agreed")
            .await
            .unwrap();
    }

    /// A method taken all the way to published.
    pub async fn published_method(&self) -> ItemId {
        let item = self.method_draft().await;
        self.approve_twice(item).await;
        self.engine.publish(item, self.admin).await.unwrap();
        item
    }
}
