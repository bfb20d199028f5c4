//! The event bus: fan-out of notifications to per-topic subscribers.

use crate::types::Notification;
use crossbeam_channel::{bounded, Sender};
use parking_lot::{Mutex, RwLock};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::{debug, warn};

use super::types::{BusConfig, BusEvent, DropReason, SubscriptionHandle, SubscriptionId};

/// Internal subscription state.
struct Subscription {
    topic: String,
    sender: Sender<BusEvent>,
}

impl Subscription {
    /// Try to send an event. Returns false if the buffer is full or the
    /// receiver is gone (subscription will be removed).
    fn try_send(&self, event: BusEvent) -> bool {
        self.sender.try_send(event).is_ok()
    }
}

/// Topic-keyed publish/subscribe broker.
///
/// Publishing hands each notification to every current subscriber's bounded
/// queue and returns; it never waits for a consumer. A subscriber whose queue
/// is full is closed with a [`DropReason::BufferOverflow`] signal rather than
/// stalling ingestion or other subscribers.
///
/// The bus also keeps a bounded ring of the most recent change notifications,
/// recorded only once the configured warm-up delay has elapsed. Keep-alives
/// are never recorded.
pub struct EventBus {
    config: BusConfig,
    /// Active subscriptions by ID.
    subscriptions: RwLock<HashMap<SubscriptionId, Subscription>>,
    /// Counter for generating subscription IDs.
    next_id: AtomicU64,
    /// Recent change notifications, oldest first.
    history: Mutex<VecDeque<Notification>>,
    started_at: Instant,
}

impl EventBus {
    pub fn new(config: BusConfig) -> Self {
        Self {
            subscriptions: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            history: Mutex::new(VecDeque::with_capacity(config.history_capacity)),
            started_at: Instant::now(),
            config,
        }
    }

    /// Create a new subscription on `topic`.
    ///
    /// The subscription receives every notification published to the topic
    /// after this call; there is no replay of history.
    pub fn subscribe(&self, topic: &str) -> SubscriptionHandle {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let (sender, receiver) = bounded(self.config.buffer_size);

        self.subscriptions.write().insert(
            id,
            Subscription {
                topic: topic.to_string(),
                sender,
            },
        );
        debug!(?id, topic, "subscribed");

        SubscriptionHandle {
            id,
            topic: topic.to_string(),
            receiver,
        }
    }

    /// Remove a subscription. Idempotent and safe to call concurrently with
    /// an in-flight publish.
    pub fn unsubscribe(&self, id: SubscriptionId) {
        let mut subs = self.subscriptions.write();
        if let Some(sub) = subs.remove(&id) {
            debug!(?id, topic = %sub.topic, "unsubscribed");
            // Best effort; the consumer may already be gone.
            let _ = sub.sender.try_send(BusEvent::Dropped {
                reason: DropReason::Unsubscribed,
            });
        }
    }

    /// Deliver `notification` to every subscription currently registered for
    /// `topic`.
    ///
    /// Returns once the notification has been handed to every subscriber's
    /// queue; subscribers that cannot accept it are removed, never waited on.
    pub fn publish(&self, topic: &str, notification: Notification) {
        self.record_history(&notification);

        let mut to_remove = Vec::new();
        {
            let subs = self.subscriptions.read();
            for (id, sub) in subs.iter() {
                if sub.topic != topic {
                    continue;
                }
                if !sub.try_send(BusEvent::Notification(notification.clone())) {
                    to_remove.push(*id);
                }
            }
        }

        if !to_remove.is_empty() {
            let mut subs = self.subscriptions.write();
            for id in to_remove {
                if let Some(sub) = subs.remove(&id) {
                    warn!(?id, topic = %sub.topic, "dropping slow subscriber");
                    // Try to surface the missed-events signal (may fail on a
                    // full queue; the closed channel is still observable).
                    let _ = sub.sender.try_send(BusEvent::Dropped {
                        reason: DropReason::BufferOverflow,
                    });
                }
            }
        }
    }

    fn record_history(&self, notification: &Notification) {
        if self.config.history_capacity == 0 || !notification.is_change() {
            return;
        }
        if self.started_at.elapsed() < self.config.history_warmup {
            return;
        }
        let mut history = self.history.lock();
        while history.len() >= self.config.history_capacity {
            history.pop_front();
        }
        history.push_back(notification.clone());
    }

    /// Up to `n` most recent recorded change notifications, oldest first.
    pub fn take_last(&self, n: usize) -> Vec<Notification> {
        let history = self.history.lock();
        let skip = history.len().saturating_sub(n);
        history.iter().skip(skip).cloned().collect()
    }

    /// Number of active subscriptions across all topics.
    pub fn subscription_count(&self) -> usize {
        self.subscriptions.read().len()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(BusConfig::default())
    }
}
