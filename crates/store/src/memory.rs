//! In-memory reference implementations of the collaborator traits.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use docflow_core::{ItemId, RepoStatus, Role, UserId, WorkflowError};

use crate::item::{slugify, ContentItem, NewContentItem};
use crate::traits::{ContentRepository, IdentityProvider, MetadataStore};

// ---------------------------------------------------------------------------
// MemoryRepository
// ---------------------------------------------------------------------------

/// Content repository over a `RwLock`ed map.
#[derive(Default)]
pub struct MemoryRepository {
    items: RwLock<HashMap<ItemId, ContentItem>>,
    /// When set, the named operation fails with a `Repository` error once.
    /// Used by tests exercising merge rollback behavior.
    fail_next: RwLock<Option<&'static str>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arrange for the next call of the named operation (`"update_content"`,
    /// `"change_status"`, `"create"`) to fail.
    pub async fn fail_next(&self, op: &'static str) {
        *self.fail_next.write().await = Some(op);
    }

    async fn check_fail(&self, op: &str) -> Result<(), WorkflowError> {
        let mut guard = self.fail_next.write().await;
        if guard.as_deref() == Some(op) {
            *guard = None;
            return Err(WorkflowError::Repository(format!(
                "injected failure in {op}"
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl ContentRepository for MemoryRepository {
    async fn get(&self, id: ItemId) -> Result<Option<ContentItem>, WorkflowError> {
        Ok(self.items.read().await.get(&id).cloned())
    }

    async fn create(&self, item: NewContentItem) -> Result<ContentItem, WorkflowError> {
        self.check_fail("create").await?;
        let now = Utc::now();
        let created = ContentItem {
            id: Uuid::new_v4(),
            kind: item.kind,
            slug: slugify(&item.title),
            title: item.title,
            body: item.body,
            excerpt: item.excerpt,
            author: item.author,
            status: item.status,
            created_at: now,
            updated_at: now,
        };
        self.items.write().await.insert(created.id, created.clone());
        Ok(created)
    }

    async fn update_content(
        &self,
        id: ItemId,
        title: &str,
        body: &str,
        excerpt: &str,
    ) -> Result<(), WorkflowError> {
        self.check_fail("update_content").await?;
        let mut items = self.items.write().await;
        let item = items
            .get_mut(&id)
            .ok_or_else(|| WorkflowError::item_not_found(id))?;
        item.title = title.to_owned();
        item.body = body.to_owned();
        item.excerpt = excerpt.to_owned();
        item.updated_at = Utc::now();
        Ok(())
    }

    async fn change_status(&self, id: ItemId, status: RepoStatus) -> Result<(), WorkflowError> {
        self.check_fail("change_status").await?;
        let mut items = self.items.write().await;
        let item = items
            .get_mut(&id)
            .ok_or_else(|| WorkflowError::item_not_found(id))?;
        item.status = status;
        item.updated_at = Utc::now();
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// MemoryMetadataStore
// ---------------------------------------------------------------------------

/// Metadata store over nested maps, one inner map per item.
#[derive(Default)]
pub struct MemoryMetadataStore {
    entries: RwLock<HashMap<ItemId, HashMap<String, serde_json::Value>>>,
}

impl MemoryMetadataStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MetadataStore for MemoryMetadataStore {
    async fn get(
        &self,
        item: ItemId,
        key: &str,
    ) -> Result<Option<serde_json::Value>, WorkflowError> {
        Ok(self
            .entries
            .read()
            .await
            .get(&item)
            .and_then(|m| m.get(key))
            .cloned())
    }

    async fn set(
        &self,
        item: ItemId,
        key: &str,
        value: serde_json::Value,
    ) -> Result<(), WorkflowError> {
        self.entries
            .write()
            .await
            .entry(item)
            .or_default()
            .insert(key.to_owned(), value);
        Ok(())
    }

    async fn delete(&self, item: ItemId, key: &str) -> Result<(), WorkflowError> {
        if let Some(m) = self.entries.write().await.get_mut(&item) {
            m.remove(key);
        }
        Ok(())
    }

    async fn all(&self, item: ItemId) -> Result<Vec<(String, serde_json::Value)>, WorkflowError> {
        Ok(self
            .entries
            .read()
            .await
            .get(&item)
            .map(|m| m.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default())
    }
}

// ---------------------------------------------------------------------------
// StaticIdentity
// ---------------------------------------------------------------------------

/// Identity provider over a fixed user/role assignment.
#[derive(Default)]
pub struct StaticIdentity {
    roles: HashMap<UserId, Vec<Role>>,
}

impl StaticIdentity {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(mut self, user: UserId, roles: &[Role]) -> Self {
        self.roles.insert(user, roles.to_vec());
        self
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentity {
    async fn roles_of(&self, user: UserId) -> Result<Vec<Role>, WorkflowError> {
        Ok(self.roles.get(&user).cloned().unwrap_or_default())
    }

    async fn users_with_role(&self, role: Role) -> Result<Vec<UserId>, WorkflowError> {
        let mut users: Vec<UserId> = self
            .roles
            .iter()
            .filter(|(_, roles)| roles.contains(&role))
            .map(|(user, _)| *user)
            .collect();
        users.sort();
        Ok(users)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
