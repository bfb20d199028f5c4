//! Ingestion adapter: applies feed calls to a store and publishes a change
//! notification for every accepted mutation.

use crate::bus::EventBus;
use crate::error::Result;
use crate::store::TypedStore;
use crate::types::{Notification, Resource, Uid, Version};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, warn};

/// Topic all change notifications are published under, across every kind,
/// so one stream observes all change activity.
pub const CHANGE_TOPIC: &str = "change";

/// Feed-facing write side of one entity kind.
///
/// Wraps store mutations with notification emission. A private write lock is
/// held across mutation + publish so subscribers always observe mutations to
/// the same id in the order they were applied, and a consumer reacting to a
/// notification by querying the store never sees stale state.
pub struct Ingestor<T: Resource> {
    store: Arc<TypedStore<T>>,
    bus: Arc<EventBus>,
    write_lock: Mutex<()>,
}

impl<T: Resource> Ingestor<T> {
    pub fn new(store: Arc<TypedStore<T>>, bus: Arc<EventBus>) -> Self {
        Self {
            store,
            bus,
            write_lock: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &Arc<TypedStore<T>> {
        &self.store
    }

    /// Apply an observed add.
    ///
    /// Always publishes a `ResourceAdded` notification, even when an entry
    /// with this id already existed; deduplicating adds is the feed's
    /// responsibility. On serialization failure nothing is applied.
    ///
    /// # Panics
    ///
    /// Panics if `id` is empty.
    pub fn add(&self, id: &Uid, version: Version, resource: T) -> Result<()> {
        let snapshot = serde_json::to_value(&resource)?;
        let _lock = self.write_lock.lock();
        debug!(kind = %self.store.kind(), %id, "add");
        self.store.insert(id, version, resource);
        self.bus.publish(
            CHANGE_TOPIC,
            Notification::added(self.store.kind().clone(), snapshot),
        );
        Ok(())
    }

    /// Apply an observed update.
    ///
    /// An update whose version matches the stored version is a pure no-op:
    /// no mutation, no notification. An update for an unknown id is treated
    /// as a late-observed add and published as `ResourceUpdated`.
    ///
    /// # Panics
    ///
    /// Panics if `id` is empty.
    pub fn update(&self, id: &Uid, version: Version, resource: T) -> Result<()> {
        let snapshot = serde_json::to_value(&resource)?;
        let _lock = self.write_lock.lock();
        if self.store.update(id, version, resource) {
            debug!(kind = %self.store.kind(), %id, "update");
            self.bus.publish(
                CHANGE_TOPIC,
                Notification::updated(self.store.kind().clone(), snapshot),
            );
        }
        Ok(())
    }

    /// Apply an observed delete.
    ///
    /// The `ResourceDeleted` notification carries the last-known snapshot,
    /// or JSON `null` if the id was never present or the snapshot cannot be
    /// serialized. The notification is published in every case: once the
    /// entry is removed, the mutation is accepted and must be announced.
    ///
    /// # Panics
    ///
    /// Panics if `id` is empty.
    pub fn delete(&self, id: &Uid) -> Result<()> {
        let _lock = self.write_lock.lock();
        debug!(kind = %self.store.kind(), %id, "delete");
        let snapshot = match self.store.remove(id) {
            Some(last) => serde_json::to_value(&last).unwrap_or_else(|e| {
                warn!(kind = %self.store.kind(), %id, error = %e, "snapshot lost on delete");
                serde_json::Value::Null
            }),
            None => serde_json::Value::Null,
        };
        self.bus.publish(
            CHANGE_TOPIC,
            Notification::deleted(self.store.kind().clone(), snapshot),
        );
        Ok(())
    }
}
