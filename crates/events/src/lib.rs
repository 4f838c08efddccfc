//! Docflow event bus and notification dispatch.
//!
//! Building blocks for workflow notifications:
//!
//! - [`WorkflowEvent`] — the canonical event envelope.
//! - [`EventBus`] — in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.
//! - [`NotificationDispatcher`] — the fire-and-forget seam the engine
//!   notifies through; delivery transports plug in as bus subscribers.

pub mod bus;
pub mod dispatch;

pub use bus::{Audience, EventBus, EventKind, WorkflowEvent};
pub use dispatch::{BusDispatcher, NotificationDispatcher, RecordingDispatcher};
