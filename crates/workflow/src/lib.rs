//! The docflow workflow engine.
//!
//! Ties the domain core to the collaborator traits:
//!
//! - [`WorkflowEngine`] — the draft / review / approval / publish state
//!   machine, including the two-reviewer gate, locking and the
//!   append-only history log.
//! - [`RevisionCoordinator`] — fork lifecycle: create a revision of a
//!   published item, run it through the same gate, merge it back.
//! - [`meta::WorkflowMeta`] — the typed accessor over the per-item
//!   metadata keys both of them share.
//!
//! All operations on the same item are serialized through [`locks::ItemLocks`];
//! operations on distinct items run concurrently.

pub mod engine;
pub mod locks;
pub mod meta;
pub mod revision;

pub use engine::{EffectiveStatus, WorkflowEngine};
pub use meta::WorkflowMeta;
pub use revision::RevisionCoordinator;
