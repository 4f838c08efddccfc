//! Collaborator traits and reference implementations.
//!
//! The workflow engine never talks to a concrete platform; it goes through
//! three traits:
//!
//! - [`ContentRepository`] — owns [`ContentItem`] records.
//! - [`MetadataStore`] — per-item key/value metadata (JSON values).
//! - [`IdentityProvider`] — maps users to workflow roles.
//!
//! [`memory`] provides in-process implementations backed by
//! `tokio::sync::RwLock` maps; they are both the test harness and a
//! reference for embedders implementing the traits over a real platform.

pub mod item;
pub mod memory;
pub mod traits;

pub use item::{ContentItem, NewContentItem};
pub use memory::{MemoryMetadataStore, MemoryRepository, StaticIdentity};
pub use traits::{ContentRepository, IdentityProvider, MetadataStore};
