//! Core types for the cache and its change stream.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// Opaque stable identifier assigned by the source of truth.
///
/// Unique within a kind, distinct from the human-facing name. Must never be
/// empty; store operations panic on an empty uid.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Uid(pub String);

impl Uid {
    pub fn new(id: impl Into<String>) -> Self {
        Uid(id.into())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Uid({})", self.0)
    }
}

impl fmt::Display for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Uid {
    fn from(s: &str) -> Self {
        Uid(s.to_string())
    }
}

/// Name of a tracked entity kind (e.g. "tenant").
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Kind(pub String);

impl fmt::Debug for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Kind({})", self.0)
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Kind {
    fn from(s: &str) -> Self {
        Kind(s.to_string())
    }
}

/// Opaque version token.
///
/// Carries no ordering; "changed" is detected by inequality only.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Version(pub String);

impl fmt::Debug for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Version({})", self.0)
    }
}

impl From<&str> for Version {
    fn from(s: &str) -> Self {
        Version(s.to_string())
    }
}

/// Display/lookup key for a resource. Not guaranteed unique across namespaces.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NamespacedName {
    pub namespace: String,
    pub name: String,
}

impl NamespacedName {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for NamespacedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Microseconds since Unix epoch.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(pub i64);

impl Timestamp {
    /// Current time.
    pub fn now() -> Self {
        let duration = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("Time went backwards");
        Timestamp(duration.as_micros() as i64)
    }
}

impl fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timestamp({})", self.0)
    }
}

/// A tracked remote object.
///
/// The payload is opaque to the cache; all it needs is the display key and
/// the ability to snapshot the resource into JSON for notifications.
pub trait Resource: Clone + Serialize + Send + Sync + 'static {
    fn namespaced_name(&self) -> NamespacedName;
}

/// Which kind of mutation a notification describes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChangeType {
    Added,
    Updated,
    Deleted,
}

/// Body of a change notification: one accepted mutation, with the resource
/// snapshotted at mutation time.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChangeNotification {
    /// When the mutation was applied.
    pub ts: Timestamp,

    /// Entity kind the mutation belongs to.
    pub kind: Kind,

    /// JSON snapshot of the resource. For deletes, the last-known state, or
    /// `null` if the id was never present.
    pub resource: serde_json::Value,
}

/// Events delivered to streaming consumers.
///
/// Wire format is internally tagged on `"type"` with the tag names the UI
/// expects (`ResourceAdded`, `ResourceUpdated`, `ResourceDeleted`,
/// `KeepAlive`).
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Notification {
    ResourceAdded(ChangeNotification),
    ResourceUpdated(ChangeNotification),
    ResourceDeleted(ChangeNotification),
    /// Synthetic liveness signal; never a real change.
    KeepAlive { ts: Timestamp },
}

impl Notification {
    pub fn added(kind: Kind, resource: serde_json::Value) -> Self {
        Notification::ResourceAdded(ChangeNotification {
            ts: Timestamp::now(),
            kind,
            resource,
        })
    }

    pub fn updated(kind: Kind, resource: serde_json::Value) -> Self {
        Notification::ResourceUpdated(ChangeNotification {
            ts: Timestamp::now(),
            kind,
            resource,
        })
    }

    pub fn deleted(kind: Kind, resource: serde_json::Value) -> Self {
        Notification::ResourceDeleted(ChangeNotification {
            ts: Timestamp::now(),
            kind,
            resource,
        })
    }

    pub fn keep_alive() -> Self {
        Notification::KeepAlive {
            ts: Timestamp::now(),
        }
    }

    /// The change type, or None for keep-alives.
    pub fn change_type(&self) -> Option<ChangeType> {
        match self {
            Notification::ResourceAdded(_) => Some(ChangeType::Added),
            Notification::ResourceUpdated(_) => Some(ChangeType::Updated),
            Notification::ResourceDeleted(_) => Some(ChangeType::Deleted),
            Notification::KeepAlive { .. } => None,
        }
    }

    /// The change body, or None for keep-alives.
    pub fn change(&self) -> Option<&ChangeNotification> {
        match self {
            Notification::ResourceAdded(c)
            | Notification::ResourceUpdated(c)
            | Notification::ResourceDeleted(c) => Some(c),
            Notification::KeepAlive { .. } => None,
        }
    }

    pub fn is_change(&self) -> bool {
        self.change().is_some()
    }
}
