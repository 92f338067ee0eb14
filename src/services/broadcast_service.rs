use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{info, warn};

use crate::state::store::{InnerMap, LatestStore, Reading};

/// Full state sent once to every new viewer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bootstrap {
    pub spots: InnerMap,
    pub threshold_cm: f64,
}

/// Everything a viewer can receive, serialized as
/// `{"event": "...", "data": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "lowercase")]
pub enum HubMessage {
    Bootstrap(Bootstrap),
    Reading(Reading),
}

/// A registered viewer: its id and the receiving end of its outbound queue.
///
/// `recv` returns `None` once the hub has dropped the subscriber.
#[derive(Debug)]
pub struct Subscription {
    pub id: u64,
    receiver: mpsc::Receiver<HubMessage>,
}

impl Subscription {
    pub async fn recv(&mut self) -> Option<HubMessage> {
        self.receiver.recv().await
    }

    #[cfg(test)]
    pub(crate) fn try_recv(&mut self) -> Option<HubMessage> {
        self.receiver.try_recv().ok()
    }
}

struct Inner {
    store: LatestStore,
    threshold_cm: f64,
    buffer: usize,
    next_id: AtomicU64,
    subscribers: Mutex<HashMap<u64, mpsc::Sender<HubMessage>>>,
}

/// Fans accepted readings out to every connected viewer.
///
/// The registry lock also serializes the write path: `commit` stores and
/// publishes under it, and `subscribe` snapshots and registers under it.
/// A reading is therefore either in a viewer's bootstrap or pushed to it
/// afterwards, exactly once, and all viewers see commits in the same order.
///
/// Nothing done under the lock awaits; sends use `try_send`, so a slow
/// viewer is dropped instead of stalling ingestion.
#[derive(Clone)]
pub struct Hub {
    inner: Arc<Inner>,
}

impl Hub {
    /// `buffer` is the per-viewer queue length; values below 1 are raised to 1.
    pub fn new(store: LatestStore, threshold_cm: f64, buffer: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                threshold_cm,
                buffer: buffer.max(1),
                next_id: AtomicU64::new(1),
                subscribers: Mutex::new(HashMap::new()),
            }),
        }
    }

    pub fn threshold_cm(&self) -> f64 {
        self.inner.threshold_cm
    }

    #[cfg(test)]
    pub(crate) fn store(&self) -> &LatestStore {
        &self.inner.store
    }

    /// Live clones of this hub; each open WebSocket session holds one.
    #[cfg(test)]
    pub(crate) fn handle_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }

    /// Bootstrap payload built from the store's current contents.
    pub fn bootstrap(&self) -> Bootstrap {
        Bootstrap {
            spots: self.inner.store.snapshot(),
            threshold_cm: self.inner.threshold_cm,
        }
    }

    fn registry(&self) -> MutexGuard<'_, HashMap<u64, mpsc::Sender<HubMessage>>> {
        self.inner
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a viewer and queue its bootstrap message.
    pub fn subscribe(&self) -> Subscription {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, receiver) = mpsc::channel(self.inner.buffer);

        let mut subs = self.registry();

        // Fresh channel with capacity >= 1: this cannot fail.
        let _ = tx.try_send(HubMessage::Bootstrap(self.bootstrap()));
        subs.insert(id, tx);

        info!(subscriber = id, total = subs.len(), "Viewer subscribed");
        Subscription { id, receiver }
    }

    /// Remove a viewer. Returns whether it was still registered.
    pub fn unsubscribe(&self, id: u64) -> bool {
        let mut subs = self.registry();
        let existed = subs.remove(&id).is_some();
        if existed {
            info!(subscriber = id, total = subs.len(), "Viewer unsubscribed");
        }
        existed
    }

    /// Store `reading` and push it to every viewer as one step.
    pub fn commit(&self, reading: Reading) {
        let mut subs = self.registry();
        self.inner.store.put(reading.clone());
        Self::fan_out(&mut subs, HubMessage::Reading(reading));
    }

    /// Push `message` to every viewer without touching the store.
    ///
    /// Returns the number of viewers that accepted it.
    pub fn publish(&self, message: HubMessage) -> usize {
        let mut subs = self.registry();
        Self::fan_out(&mut subs, message)
    }

    fn fan_out(subs: &mut HashMap<u64, mpsc::Sender<HubMessage>>, message: HubMessage) -> usize {
        let mut delivered = 0;

        subs.retain(|id, tx| match tx.try_send(message.clone()) {
            Ok(()) => {
                delivered += 1;
                true
            }
            Err(TrySendError::Full(_)) => {
                warn!(subscriber = *id, "Viewer queue full, dropping subscriber");
                false
            }
            Err(TrySendError::Closed(_)) => {
                info!(subscriber = *id, "Viewer gone, removing subscriber");
                false
            }
        });

        delivered
    }

    pub fn subscriber_count(&self) -> usize {
        self.registry().len()
    }
}
