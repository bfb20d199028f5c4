//! Subscription types for the event bus.

use crate::types::Notification;
use std::fmt;
use std::time::Duration;

/// Configuration for the event bus. Fixed at startup.
#[derive(Clone, Debug)]
pub struct BusConfig {
    /// Max buffered events per subscription before the subscriber is dropped.
    /// Default: 64
    pub buffer_size: usize,

    /// Capacity of the bounded change-history ring.
    /// Default: 100
    pub history_capacity: usize,

    /// Delay after bus construction before history recording starts, so the
    /// ring is not flooded with startup-time bulk-load noise.
    /// Default: 10s
    pub history_warmup: Duration,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            buffer_size: 64,
            history_capacity: 100,
            history_warmup: Duration::from_secs(10),
        }
    }
}

/// Unique identifier for a subscription.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

impl fmt::Debug for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SubscriptionId({})", self.0)
    }
}

/// Why a subscription was closed by the bus.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DropReason {
    /// Delivery queue overflowed (slow consumer); events were missed.
    BufferOverflow,
    /// Explicitly unsubscribed.
    Unsubscribed,
}

/// Items delivered on a subscription's queue.
#[derive(Clone, Debug)]
pub enum BusEvent {
    /// A published notification.
    Notification(Notification),
    /// The bus closed this subscription.
    Dropped { reason: DropReason },
}

/// Handle owned by exactly one consumer; releasing it requires unsubscribing.
pub struct SubscriptionHandle {
    pub id: SubscriptionId,
    pub topic: String,
    /// Channel to receive events.
    pub receiver: crossbeam_channel::Receiver<BusEvent>,
}

impl SubscriptionHandle {
    /// Receive the next event (blocking).
    pub fn recv(&self) -> Result<BusEvent, crossbeam_channel::RecvError> {
        self.receiver.recv()
    }

    /// Try to receive an event (non-blocking).
    pub fn try_recv(&self) -> Result<BusEvent, crossbeam_channel::TryRecvError> {
        self.receiver.try_recv()
    }

    /// Receive with timeout.
    pub fn recv_timeout(
        &self,
        timeout: Duration,
    ) -> Result<BusEvent, crossbeam_channel::RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }
}
