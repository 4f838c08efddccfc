//! Notification dispatch seam.
//!
//! The engine notifies after state is committed and never lets delivery
//! problems fail a workflow operation: implementations return a `Result`
//! so the engine can log the failure, but the engine swallows it.

use async_trait::async_trait;
use tokio::sync::Mutex;

use docflow_core::WorkflowError;

use crate::bus::{EventBus, WorkflowEvent};

// ---------------------------------------------------------------------------
// NotificationDispatcher
// ---------------------------------------------------------------------------

/// Fire-and-forget event sink.
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    async fn dispatch(&self, event: WorkflowEvent) -> Result<(), WorkflowError>;
}

// ---------------------------------------------------------------------------
// BusDispatcher
// ---------------------------------------------------------------------------

/// Dispatcher that publishes onto an [`EventBus`]. Publishing cannot fail;
/// events with no subscribers are dropped.
#[derive(Default)]
pub struct BusDispatcher {
    bus: EventBus,
}

impl BusDispatcher {
    pub fn new(bus: EventBus) -> Self {
        Self { bus }
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }
}

#[async_trait]
impl NotificationDispatcher for BusDispatcher {
    async fn dispatch(&self, event: WorkflowEvent) -> Result<(), WorkflowError> {
        self.bus.publish(event);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// RecordingDispatcher
// ---------------------------------------------------------------------------

/// Test double that captures every dispatched event.
#[derive(Default)]
pub struct RecordingDispatcher {
    events: Mutex<Vec<WorkflowEvent>>,
    fail: Mutex<bool>,
}

impl RecordingDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn events(&self) -> Vec<WorkflowEvent> {
        self.events.lock().await.clone()
    }

    /// Make every subsequent dispatch fail; the engine must shrug it off.
    pub async fn fail_all(&self) {
        *self.fail.lock().await = true;
    }
}

#[async_trait]
impl NotificationDispatcher for RecordingDispatcher {
    async fn dispatch(&self, event: WorkflowEvent) -> Result<(), WorkflowError> {
        if *self.fail.lock().await {
            return Err(WorkflowError::Repository(
                "notification channel unavailable".into(),
            ));
        }
        self.events.lock().await.push(event);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::{Audience, EventKind};
    use docflow_core::ItemKind;
    use uuid::Uuid;

    fn sample_event() -> WorkflowEvent {
        WorkflowEvent::new(
            EventKind::Approved,
            Uuid::new_v4(),
            ItemKind::Method,
            Audience::Admins,
        )
    }

    #[tokio::test]
    async fn bus_dispatcher_publishes() {
        let dispatcher = BusDispatcher::default();
        let mut rx = dispatcher.bus().subscribe();

        dispatcher.dispatch(sample_event()).await.unwrap();

        let received = rx.recv().await.unwrap();
        assert_eq!(received.kind, EventKind::Approved);
    }

    #[tokio::test]
    async fn recording_dispatcher_captures_in_order() {
        let dispatcher = RecordingDispatcher::new();
        dispatcher.dispatch(sample_event()).await.unwrap();
        dispatcher
            .dispatch(WorkflowEvent::new(
                EventKind::Published,
                Uuid::new_v4(),
                ItemKind::Method,
                Audience::Author,
            ))
            .await
            .unwrap();

        let events = dispatcher.events().await;
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].kind, EventKind::Approved);
        assert_eq!(events[1].kind, EventKind::Published);
    }

    #[tokio::test]
    async fn recording_dispatcher_can_be_made_to_fail() {
        let dispatcher = RecordingDispatcher::new();
        dispatcher.fail_all().await;
        assert!(dispatcher.dispatch(sample_event()).await.is_err());
        assert!(dispatcher.events().await.is_empty());
    }
}
