//! Docflow domain core.
//!
//! Pure domain logic for the two-reviewer content-approval workflow:
//!
//! - [`error::WorkflowError`] — the crate-wide error taxonomy.
//! - [`types::ItemKind`] — the content kinds the workflow governs.
//! - [`status`] — workflow and repository status enums.
//! - [`version`] — "MAJOR.MINOR" version values and bump arithmetic.
//! - [`approval`] — reviewer decisions and tally logic.
//! - [`history`] — append-only audit log entries.
//! - [`capability`] — the (role, kind, operation) authorization table.
//!
//! This crate performs no I/O and has no async surface; the engine crates
//! build on it.

pub mod approval;
pub mod capability;
pub mod error;
pub mod history;
pub mod status;
pub mod types;
pub mod version;

pub use approval::{Approval, Decision};
pub use capability::{role_allows, Operation, Role};
pub use error::WorkflowError;
pub use history::HistoryEntry;
pub use status::{RepoStatus, WorkflowStatus};
pub use types::{ItemId, ItemKind, UserId};
pub use version::{BumpKind, Version};
