//! Versioned in-memory stores, one per tracked entity kind.

mod registry;
mod typed;

pub use registry::{RegistryBuilder, StoreRegistry};
pub use typed::TypedStore;
