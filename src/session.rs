//! Per-consumer streaming sessions and the periodic keep-alive task.

use crate::bus::{BusEvent, DropReason, EventBus, SubscriptionHandle};
use crate::types::Notification;
use crate::wire;
use crossbeam_channel::{bounded, Receiver, Sender};
use std::io::Write;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};

/// Why a session ended. Every path releases the subscription.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CloseReason {
    /// The consumer disconnected.
    Cancelled,
    /// A write to the consumer failed.
    WriteFailed,
    /// The bus force-closed the subscription because its queue overflowed;
    /// events were missed.
    MissedEvents,
    /// The subscription was removed out from under the session.
    Unsubscribed,
}

/// Signals consumer disconnect to a running session.
///
/// Dropping the token has the same effect as calling [`cancel`](Self::cancel).
pub struct CancelToken {
    sender: Sender<()>,
}

impl CancelToken {
    pub fn cancel(&self) {
        let _ = self.sender.try_send(());
    }
}

/// Create a cancellation pair: the token is held by whoever detects the
/// disconnect, the receiver is passed to [`StreamSession::run`].
pub fn cancellation() -> (CancelToken, Receiver<()>) {
    let (sender, receiver) = bounded(1);
    (CancelToken { sender }, receiver)
}

/// The live state of one connected streaming consumer.
///
/// Opening subscribes to the topic; [`run`](Self::run) streams every received
/// notification as a wire frame until cancellation, a write failure, or the
/// bus closing the subscription. All exits unsubscribe.
pub struct StreamSession<W: Write> {
    bus: Arc<EventBus>,
    handle: SubscriptionHandle,
    writer: W,
}

impl<W: Write> StreamSession<W> {
    pub fn open(bus: Arc<EventBus>, topic: &str, writer: W) -> Self {
        let handle = bus.subscribe(topic);
        Self {
            bus,
            handle,
            writer,
        }
    }

    /// Stream until the session closes, returning the reason and the writer.
    pub fn run(self, cancel: &Receiver<()>) -> (CloseReason, W) {
        let Self {
            bus,
            handle,
            mut writer,
        } = self;

        let reason = loop {
            crossbeam_channel::select! {
                recv(handle.receiver) -> event => match event {
                    Ok(BusEvent::Notification(notification)) => {
                        if let Err(e) = Self::deliver(&mut writer, &notification) {
                            warn!(id = ?handle.id, error = %e, "stream write failed");
                            break CloseReason::WriteFailed;
                        }
                    }
                    Ok(BusEvent::Dropped { reason: DropReason::BufferOverflow }) => {
                        break CloseReason::MissedEvents;
                    }
                    Ok(BusEvent::Dropped { reason: DropReason::Unsubscribed }) => {
                        break CloseReason::Unsubscribed;
                    }
                    // Queue ended without an explicit signal: the bus dropped
                    // this subscription after an overflow.
                    Err(_) => break CloseReason::MissedEvents,
                },
                recv(cancel) -> _ => break CloseReason::Cancelled,
            }
        };

        bus.unsubscribe(handle.id);
        debug!(id = ?handle.id, ?reason, "session closed");
        (reason, writer)
    }

    fn deliver(writer: &mut W, notification: &Notification) -> std::io::Result<()> {
        let framed = wire::frame(notification)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))?;
        writer.write_all(framed.as_bytes())?;
        writer.flush()
    }
}

/// Spawn the periodic keep-alive task.
///
/// Publishes a [`Notification::keep_alive`] on `topic` every `interval` so
/// idle sessions and intermediary proxies see a live link. Runs until the
/// shutdown receiver fires or disconnects. Independent of ingestion.
pub fn spawn_keep_alive(
    bus: Arc<EventBus>,
    topic: impl Into<String>,
    interval: Duration,
    shutdown: Receiver<()>,
) -> thread::JoinHandle<()> {
    let topic = topic.into();
    thread::spawn(move || {
        let ticker = crossbeam_channel::tick(interval);
        loop {
            crossbeam_channel::select! {
                recv(ticker) -> _ => bus.publish(&topic, Notification::keep_alive()),
                recv(shutdown) -> _ => return,
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::BusConfig;
    use crate::types::Kind;
    use serde_json::json;

    fn test_bus(buffer_size: usize) -> Arc<EventBus> {
        Arc::new(EventBus::new(BusConfig {
            buffer_size,
            ..Default::default()
        }))
    }

    fn change(n: u64) -> Notification {
        Notification::added(Kind::from("doc"), json!({ "n": n }))
    }

    fn frames(bytes: &[u8]) -> Vec<Notification> {
        std::str::from_utf8(bytes)
            .unwrap()
            .split("\n\n")
            .filter(|s| !s.is_empty())
            .map(|s| serde_json::from_str(s.strip_prefix(wire::DATA_PREFIX).unwrap()).unwrap())
            .collect()
    }

    #[test]
    fn test_streams_notifications_until_cancelled() {
        let bus = test_bus(16);
        let session = StreamSession::open(Arc::clone(&bus), "change", Vec::new());
        let (token, cancel) = cancellation();

        let worker = thread::spawn(move || session.run(&cancel));

        bus.publish("change", change(1));
        bus.publish("change", change(2));

        // Let the session drain before cancelling.
        thread::sleep(Duration::from_millis(50));
        token.cancel();

        let (reason, written) = worker.join().unwrap();
        assert_eq!(reason, CloseReason::Cancelled);
        let delivered = frames(&written);
        assert_eq!(delivered.len(), 2);
        assert_eq!(delivered[0].change().unwrap().resource["n"], 1);
        assert_eq!(delivered[1].change().unwrap().resource["n"], 2);
        assert_eq!(bus.subscription_count(), 0, "queue must be released");
    }

    #[test]
    fn test_dropping_token_cancels() {
        let bus = test_bus(16);
        let session = StreamSession::open(Arc::clone(&bus), "change", Vec::<u8>::new());
        let (token, cancel) = cancellation();
        drop(token);

        let (reason, _) = session.run(&cancel);
        assert_eq!(reason, CloseReason::Cancelled);
        assert_eq!(bus.subscription_count(), 0);
    }

    struct FailingWriter;

    impl Write for FailingWriter {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "gone"))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_write_failure_closes_session() {
        let bus = test_bus(16);
        let session = StreamSession::open(Arc::clone(&bus), "change", FailingWriter);
        let (_token, cancel) = cancellation();

        bus.publish("change", change(1));
        let (reason, _) = session.run(&cancel);
        assert_eq!(reason, CloseReason::WriteFailed);
        assert_eq!(bus.subscription_count(), 0);
    }

    #[test]
    fn test_overflow_surfaces_missed_events() {
        let bus = test_bus(1);
        let session = StreamSession::open(Arc::clone(&bus), "change", Vec::new());
        let (_token, cancel) = cancellation();

        // Overflow the capacity-1 queue before the session drains it.
        bus.publish("change", change(1));
        bus.publish("change", change(2));
        assert_eq!(bus.subscription_count(), 0);

        let (reason, written) = session.run(&cancel);
        assert_eq!(reason, CloseReason::MissedEvents);
        // The queued notification was still delivered before the close.
        assert_eq!(frames(&written).len(), 1);
    }

    #[test]
    fn test_external_unsubscribe_closes_session() {
        let bus = test_bus(16);
        let session = StreamSession::open(Arc::clone(&bus), "change", Vec::<u8>::new());
        let id = session.handle.id;
        let (_token, cancel) = cancellation();

        bus.unsubscribe(id);
        let (reason, _) = session.run(&cancel);
        assert_eq!(reason, CloseReason::Unsubscribed);
    }

    #[test]
    fn test_keep_alive_publishes_on_interval() {
        let bus = test_bus(16);
        let handle = bus.subscribe("change");
        let (shutdown_tx, shutdown_rx) = bounded(1);

        let task = spawn_keep_alive(
            Arc::clone(&bus),
            "change",
            Duration::from_millis(10),
            shutdown_rx,
        );

        let event = handle.recv_timeout(Duration::from_secs(1)).unwrap();
        match event {
            BusEvent::Notification(n) => {
                assert!(!n.is_change(), "keep-alive must not look like a change")
            }
            other => panic!("unexpected event {other:?}"),
        }

        shutdown_tx.send(()).unwrap();
        task.join().unwrap();
    }
}
