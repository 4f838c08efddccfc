//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] is the publish/subscribe hub for [`WorkflowEvent`]s. It is
//! shared via `Arc<EventBus>`; delivery transports subscribe and resolve
//! the symbolic [`Audience`] to concrete recipients themselves.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use docflow_core::{ItemId, ItemKind, UserId};

// ---------------------------------------------------------------------------
// EventKind / Audience
// ---------------------------------------------------------------------------

/// What happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    SubmittedForReview,
    Approved,
    Rejected,
    FinalApprovalRequested,
    Published,
    Locked,
    Unlocked,
    ForkCreated,
    ForkPublished,
}

/// Who should hear about it. `Users` carries an explicit recipient list
/// when the engine has already narrowed the audience (final-approval
/// requests exclude reviewers who already decided).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Audience {
    Approvers,
    Admins,
    Author,
    Users(Vec<UserId>),
}

// ---------------------------------------------------------------------------
// WorkflowEvent
// ---------------------------------------------------------------------------

/// A workflow event.
///
/// Constructed via [`WorkflowEvent::new`] and enriched with
/// [`with_actor`](WorkflowEvent::with_actor) and
/// [`with_payload`](WorkflowEvent::with_payload).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowEvent {
    pub kind: EventKind,

    /// The item the event is about.
    pub item_id: ItemId,
    pub item_kind: ItemKind,

    /// The user whose action produced the event, when there is one.
    pub actor: Option<UserId>,

    pub audience: Audience,

    /// Event-specific data (version numbers, comments, fork ids).
    pub payload: serde_json::Value,

    pub timestamp: DateTime<Utc>,
}

impl WorkflowEvent {
    pub fn new(kind: EventKind, item_id: ItemId, item_kind: ItemKind, audience: Audience) -> Self {
        WorkflowEvent {
            kind,
            item_id,
            item_kind,
            actor: None,
            audience,
            payload: serde_json::Value::Object(Default::default()),
            timestamp: Utc::now(),
        }
    }

    pub fn with_actor(mut self, actor: UserId) -> Self {
        self.actor = Some(actor);
        self
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out event bus.
///
/// Wraps a [`broadcast::Sender`] so any number of subscribers can
/// independently receive every published [`WorkflowEvent`].
pub struct EventBus {
    sender: broadcast::Sender<WorkflowEvent>,
}

impl EventBus {
    /// Create a bus with a specific channel capacity. When the buffer is
    /// full the oldest un-consumed events are dropped and slow receivers
    /// observe `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers. With zero subscribers
    /// the event is silently dropped; workflow state never depends on it.
    pub fn publish(&self, event: WorkflowEvent) {
        // Ignore the SendError — it only means there are zero receivers.
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<WorkflowEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[tokio::test]
    async fn publish_and_receive_single_subscriber() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();

        let item = Uuid::new_v4();
        let actor = Uuid::new_v4();
        let event = WorkflowEvent::new(
            EventKind::SubmittedForReview,
            item,
            ItemKind::Method,
            Audience::Approvers,
        )
        .with_actor(actor)
        .with_payload(serde_json::json!({"version": "0.1"}));

        bus.publish(event);

        let received = rx.recv().await.expect("should receive the event");
        assert_eq!(received.kind, EventKind::SubmittedForReview);
        assert_eq!(received.item_id, item);
        assert_eq!(received.actor, Some(actor));
        assert_eq!(received.payload["version"], "0.1");
    }

    #[tokio::test]
    async fn multiple_subscribers_receive_same_event() {
        let bus = EventBus::default();
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        bus.publish(WorkflowEvent::new(
            EventKind::Published,
            Uuid::new_v4(),
            ItemKind::Method,
            Audience::Author,
        ));

        let e1 = rx1.recv().await.expect("subscriber 1 should receive");
        let e2 = rx2.recv().await.expect("subscriber 2 should receive");
        assert_eq!(e1.kind, EventKind::Published);
        assert_eq!(e2.kind, EventKind::Published);
    }

    #[test]
    fn publish_with_no_subscribers_does_not_panic() {
        let bus = EventBus::default();
        bus.publish(WorkflowEvent::new(
            EventKind::Locked,
            Uuid::new_v4(),
            ItemKind::Method,
            Audience::Author,
        ));
    }

    #[test]
    fn explicit_user_audience_round_trips() {
        let users = vec![Uuid::new_v4(), Uuid::new_v4()];
        let event = WorkflowEvent::new(
            EventKind::FinalApprovalRequested,
            Uuid::new_v4(),
            ItemKind::Method,
            Audience::Users(users.clone()),
        );
        let json = serde_json::to_value(&event).unwrap();
        let back: WorkflowEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back.audience, Audience::Users(users));
    }
}
