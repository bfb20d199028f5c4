//! Topic-keyed publish/subscribe broker for change notifications.

mod manager;
mod types;

pub use manager::EventBus;
pub use types::{BusConfig, BusEvent, DropReason, SubscriptionHandle, SubscriptionId};
