//! The collaborator traits the engine is built against.

use async_trait::async_trait;

use docflow_core::{ItemId, RepoStatus, Role, UserId, WorkflowError};

use crate::item::{ContentItem, NewContentItem};

// ---------------------------------------------------------------------------
// ContentRepository
// ---------------------------------------------------------------------------

/// Owns content items. All failures surface as
/// [`WorkflowError::Repository`]; the engine treats them as retryable and
/// never leaves an item half-merged because of one.
#[async_trait]
pub trait ContentRepository: Send + Sync {
    async fn get(&self, id: ItemId) -> Result<Option<ContentItem>, WorkflowError>;

    async fn create(&self, item: NewContentItem) -> Result<ContentItem, WorkflowError>;

    /// Replace title, body and excerpt. The slug is never touched.
    async fn update_content(
        &self,
        id: ItemId,
        title: &str,
        body: &str,
        excerpt: &str,
    ) -> Result<(), WorkflowError>;

    async fn change_status(&self, id: ItemId, status: RepoStatus) -> Result<(), WorkflowError>;

    /// Retire an item. Trashed items stay readable for audit purposes.
    async fn trash(&self, id: ItemId) -> Result<(), WorkflowError> {
        self.change_status(id, RepoStatus::Trashed).await
    }
}

// ---------------------------------------------------------------------------
// MetadataStore
// ---------------------------------------------------------------------------

/// Per-item key/value metadata. Values are whole JSON documents; a `set`
/// replaces the previous value for that key.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    async fn get(&self, item: ItemId, key: &str) -> Result<Option<serde_json::Value>, WorkflowError>;

    async fn set(
        &self,
        item: ItemId,
        key: &str,
        value: serde_json::Value,
    ) -> Result<(), WorkflowError>;

    async fn delete(&self, item: ItemId, key: &str) -> Result<(), WorkflowError>;

    /// Every key/value pair stored for the item, in unspecified order.
    async fn all(&self, item: ItemId) -> Result<Vec<(String, serde_json::Value)>, WorkflowError>;
}

// ---------------------------------------------------------------------------
// IdentityProvider
// ---------------------------------------------------------------------------

/// Maps users to workflow roles. Capability decisions themselves live in
/// `docflow_core::capability`; this trait only answers who holds what.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Roles held by the user; empty when the user is unknown.
    async fn roles_of(&self, user: UserId) -> Result<Vec<Role>, WorkflowError>;

    /// All users holding the given role.
    async fn users_with_role(&self, role: Role) -> Result<Vec<UserId>, WorkflowError>;
}
