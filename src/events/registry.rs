use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use tokio::sync::mpsc;
use uuid::Uuid;

use super::ChangeEvent;

pub type SubscriberId = Uuid;

/// Per-subscriber buffer; a subscriber this far behind starts losing frames
/// instead of stalling the rest of the fan-out.
const SUBSCRIBER_BUFFER: usize = 64;

#[derive(Debug, Default)]
struct RegistryStats {
    published: AtomicU64,
    delivered: AtomicU64,
    dropped: AtomicU64,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct RegistryStatsSnapshot {
    pub subscribers: usize,
    pub published: u64,
    pub delivered: u64,
    pub dropped: u64,
}

/// The set of currently-connected live-update subscribers.
///
/// One entry per open connection (a user may hold several). Injected by
/// reference into whichever component needs to publish; there is no global
/// singleton. No replay: a channel registered after a publish never sees
/// that event.
pub struct EventRegistry {
    subscribers: DashMap<SubscriberId, mpsc::Sender<ChangeEvent>>,
    stats: RegistryStats,
}

impl EventRegistry {
    pub fn new() -> Self {
        Self {
            subscribers: DashMap::new(),
            stats: RegistryStats::default(),
        }
    }

    /// Register a new subscriber channel.
    ///
    /// The connection ack and any caller-supplied initial frames (the
    /// current gateway status) are queued BEFORE the sender becomes visible
    /// to `publish`, so the channel observes its ack first and never an
    /// event published before its own registration.
    pub fn subscribe(
        &self,
        initial_events: Vec<ChangeEvent>,
    ) -> (SubscriberId, mpsc::Receiver<ChangeEvent>) {
        let id = Uuid::new_v4();
        let (tx, rx) = mpsc::channel(SUBSCRIBER_BUFFER);

        // Buffer is empty here, these sends cannot fail
        let _ = tx.try_send(ChangeEvent::connected(id));
        for event in initial_events {
            let _ = tx.try_send(event);
        }

        self.subscribers.insert(id, tx);
        tracing::info!(subscriber_id = %id, total = self.subscribers.len(), "Subscriber registered");

        (id, rx)
    }

    pub fn unsubscribe(&self, id: SubscriberId) {
        if self.subscribers.remove(&id).is_some() {
            tracing::info!(subscriber_id = %id, total = self.subscribers.len(), "Subscriber removed");
        }
    }

    /// Broadcast an event to every registered channel.
    ///
    /// Writes are non-blocking: a full buffer drops the frame for that
    /// subscriber only, and a closed channel is pruned. Cross-channel order
    /// is unspecified; per-channel order follows publish order.
    pub fn publish(&self, event: ChangeEvent) {
        self.stats.published.fetch_add(1, Ordering::Relaxed);

        let mut closed = Vec::new();
        let mut delivered = 0u64;
        let mut dropped = 0u64;

        for entry in self.subscribers.iter() {
            match entry.value().try_send(event.clone()) {
                Ok(()) => delivered += 1,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    dropped += 1;
                    tracing::warn!(subscriber_id = %entry.key(), "Subscriber buffer full, frame dropped");
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    closed.push(*entry.key());
                }
            }
        }

        for id in closed {
            self.unsubscribe(id);
        }

        self.stats.delivered.fetch_add(delivered, Ordering::Relaxed);
        self.stats.dropped.fetch_add(dropped, Ordering::Relaxed);

        tracing::debug!(
            event_type = %event.event_type,
            delivered,
            dropped,
            "Event published"
        );
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    pub fn stats(&self) -> RegistryStatsSnapshot {
        RegistryStatsSnapshot {
            subscribers: self.subscribers.len(),
            published: self.stats.published.load(Ordering::Relaxed),
            delivered: self.stats.delivered.load(Ordering::Relaxed),
            dropped: self.stats.dropped.load(Ordering::Relaxed),
        }
    }
}

impl Default for EventRegistry {
    fn default() -> Self {
        Self::new()
    }
}
