//! Per-item mutual exclusion.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

use docflow_core::ItemId;

/// Registry of per-item async locks.
///
/// Operations on the same item serialize; distinct items proceed
/// concurrently. Entries are never removed; the map grows with the number
/// of items ever touched, which is bounded by the content catalog.
#[derive(Default)]
pub struct ItemLocks {
    inner: Mutex<HashMap<ItemId, Arc<Mutex<()>>>>,
}

impl ItemLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the lock for one item, waiting if another operation holds it.
    pub async fn acquire(&self, item: ItemId) -> OwnedMutexGuard<()> {
        let entry = {
            let mut map = self.inner.lock().await;
            map.entry(item)
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        entry.lock_owned().await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
