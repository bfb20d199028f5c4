//! # Lookout
//!
//! A live, queryable, in-memory mirror of externally-owned versioned objects,
//! with ordered at-least-once change fan-out to streaming consumers.
//!
//! ## Core Concepts
//!
//! - **TypedStore**: a versioned map for one entity kind
//! - **StoreRegistry**: fixed set of stores, one per tracked kind
//! - **Ingestor**: applies feed events and publishes change notifications
//! - **EventBus**: topic-keyed fan-out with bounded per-subscriber queues
//! - **StreamSession**: one connected consumer, framed over a writer
//!
//! ## Example
//!
//! ```ignore
//! use lookout::{
//!     spawn_keep_alive, BusConfig, EventBus, Ingestor, Kind, StoreRegistry,
//!     StreamSession, Uid, Version, CHANGE_TOPIC,
//! };
//!
//! let registry = StoreRegistry::builder()
//!     .register::<Tenant>(Kind::from("tenant"))
//!     .build();
//! let bus = Arc::new(EventBus::new(BusConfig::default()));
//!
//! // Feed side, one per kind:
//! let tenants = Ingestor::new(registry.store(&Kind::from("tenant"))?, Arc::clone(&bus));
//! tenants.add(&Uid::from("t-1"), Version::from("41"), tenant)?;
//!
//! // Consumer side, one per connection:
//! let session = StreamSession::open(Arc::clone(&bus), CHANGE_TOPIC, socket);
//! let (reason, _) = session.run(&cancel);
//! ```

pub mod bus;
pub mod error;
pub mod ingest;
pub mod session;
pub mod store;
pub mod types;
pub mod wire;

// Re-exports
pub use bus::{BusConfig, BusEvent, DropReason, EventBus, SubscriptionHandle, SubscriptionId};
pub use error::{CacheError, Result};
pub use ingest::{Ingestor, CHANGE_TOPIC};
pub use session::{cancellation, spawn_keep_alive, CancelToken, CloseReason, StreamSession};
pub use store::{RegistryBuilder, StoreRegistry, TypedStore};
pub use types::*;
