//! Fixed lookup table of one store per tracked entity kind.

use crate::error::{CacheError, Result};
use crate::store::TypedStore;
use crate::types::{Kind, Resource};
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

/// Object-safe view of a store, used to hold differently-typed stores in one
/// map while still exposing kind-agnostic observations.
trait AnyStore: Send + Sync {
    fn entry_count(&self) -> usize;
    fn as_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

impl<T: Resource> AnyStore for TypedStore<T> {
    fn entry_count(&self) -> usize {
        self.len()
    }

    fn as_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

/// Builder for a [`StoreRegistry`].
///
/// The set of kinds is fixed at build time; there is no dynamic registration
/// at runtime.
#[derive(Default)]
pub struct RegistryBuilder {
    stores: HashMap<Kind, Arc<dyn AnyStore>>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a store for `kind` holding resources of type `T`.
    ///
    /// # Panics
    ///
    /// Panics if `kind` is already registered (programming error).
    pub fn register<T: Resource>(mut self, kind: Kind) -> Self {
        let store = Arc::new(TypedStore::<T>::new(kind.clone()));
        let previous = self.stores.insert(kind.clone(), store);
        assert!(previous.is_none(), "kind {kind} registered twice");
        self
    }

    pub fn build(self) -> StoreRegistry {
        StoreRegistry {
            stores: self.stores,
        }
    }
}

/// Owns one [`TypedStore`] per tracked entity kind.
///
/// Created once at startup and passed around explicitly; lives for the
/// process lifetime.
pub struct StoreRegistry {
    stores: HashMap<Kind, Arc<dyn AnyStore>>,
}

impl StoreRegistry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// Typed access to the store for `kind`.
    pub fn store<T: Resource>(&self, kind: &Kind) -> Result<Arc<TypedStore<T>>> {
        let store = self
            .stores
            .get(kind)
            .ok_or_else(|| CacheError::UnknownKind(kind.clone()))?;
        Arc::clone(store)
            .as_any_arc()
            .downcast::<TypedStore<T>>()
            .map_err(|_| CacheError::KindMismatch(kind.clone()))
    }

    /// All registered kinds, in unspecified order.
    pub fn kinds(&self) -> Vec<&Kind> {
        self.stores.keys().collect()
    }

    /// Number of entries currently cached for `kind`.
    pub fn count(&self, kind: &Kind) -> Result<usize> {
        self.stores
            .get(kind)
            .map(|s| s.entry_count())
            .ok_or_else(|| CacheError::UnknownKind(kind.clone()))
    }
}
