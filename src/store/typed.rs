//! Single-kind versioned map.

use crate::error::{CacheError, Result};
use crate::types::{Kind, Resource, Uid, Version};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;

struct StoreEntry<T> {
    version: Version,
    resource: T,
}

/// Versioned map for one entity kind: `Uid -> (Version, T)`.
///
/// At most one entry per uid. The map is guarded by its own mutex, held only
/// for the duration of a single call; reads copy entries out so a returned
/// snapshot is never retroactively changed by later mutations.
pub struct TypedStore<T: Resource> {
    kind: Kind,
    entries: Mutex<HashMap<Uid, StoreEntry<T>>>,
}

impl<T: Resource> TypedStore<T> {
    pub fn new(kind: Kind) -> Self {
        Self {
            kind,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn kind(&self) -> &Kind {
        &self.kind
    }

    fn check_uid(&self, id: &Uid) {
        assert!(
            !id.is_empty(),
            "{}: uid must not be empty (programming error)",
            self.kind
        );
    }

    /// Insert or overwrite the entry for `id`.
    ///
    /// # Panics
    ///
    /// Panics if `id` is empty.
    pub fn insert(&self, id: &Uid, version: Version, resource: T) {
        self.check_uid(id);
        self.entries
            .lock()
            .insert(id.clone(), StoreEntry { version, resource });
    }

    /// Apply an update. Returns true if the mutation was accepted.
    ///
    /// An update for an unknown id behaves as an insert (a late-observed add).
    /// An update whose version equals the stored version is a pure no-op and
    /// returns false, so re-delivered events never produce spurious
    /// notifications.
    ///
    /// # Panics
    ///
    /// Panics if `id` is empty.
    pub fn update(&self, id: &Uid, version: Version, resource: T) -> bool {
        self.check_uid(id);
        let mut entries = self.entries.lock();
        if let Some(existing) = entries.get(id) {
            if existing.version == version {
                return false;
            }
        }
        entries.insert(id.clone(), StoreEntry { version, resource });
        true
    }

    /// Remove the entry for `id`, returning the last-known resource if it
    /// was present.
    ///
    /// # Panics
    ///
    /// Panics if `id` is empty.
    pub fn remove(&self, id: &Uid) -> Option<T> {
        self.check_uid(id);
        self.entries.lock().remove(id).map(|e| e.resource)
    }

    /// Snapshot of all resources for which every predicate holds.
    ///
    /// Iteration order is unspecified; use [`items_sorted`](Self::items_sorted)
    /// for the canonical `namespace/name` ordering.
    pub fn items(&self, predicates: &[&dyn Fn(&T) -> bool]) -> Vec<T> {
        let entries = self.entries.lock();
        entries
            .values()
            .filter(|e| predicates.iter().all(|p| p(&e.resource)))
            .map(|e| e.resource.clone())
            .collect()
    }

    /// Like [`items`](Self::items), sorted ascending by the byte-wise
    /// `namespace/name` string.
    pub fn items_sorted(&self, predicates: &[&dyn Fn(&T) -> bool]) -> Vec<T> {
        let mut items = self.items(predicates);
        items.sort_by_key(|r| r.namespaced_name().to_string());
        items
    }

    /// Look up a single resource by namespace and name.
    ///
    /// Returns [`CacheError::NotFound`] on zero matches and
    /// [`CacheError::Ambiguous`] on more than one.
    pub fn get(&self, namespace: &str, name: &str) -> Result<T> {
        let matches = self.items(&[&|r: &T| {
            let nn = r.namespaced_name();
            nn.namespace == namespace && nn.name == name
        }]);
        match matches.len() {
            0 => Err(CacheError::NotFound {
                kind: self.kind.clone(),
                namespace: namespace.to_string(),
                name: name.to_string(),
            }),
            1 => Ok(matches.into_iter().next().expect("len checked")),
            count => Err(CacheError::Ambiguous {
                kind: self.kind.clone(),
                namespace: namespace.to_string(),
                name: name.to_string(),
                count,
            }),
        }
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl<T: Resource> fmt::Debug for TypedStore<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypedStore({}, {} entries)", self.kind, self.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NamespacedName;
    use serde::Serialize;

    #[derive(Clone, Debug, PartialEq, Serialize)]
    struct Doc {
        namespace: String,
        name: String,
        body: String,
    }

    impl Doc {
        fn new(namespace: &str, name: &str, body: &str) -> Self {
            Self {
                namespace: namespace.into(),
                name: name.into(),
                body: body.into(),
            }
        }
    }

    impl Resource for Doc {
        fn namespaced_name(&self) -> NamespacedName {
            NamespacedName::new(self.namespace.clone(), self.name.clone())
        }
    }

    fn store() -> TypedStore<Doc> {
        TypedStore::new(Kind::from("doc"))
    }

    #[test]
    fn test_insert_overwrites() {
        let store = store();
        store.insert(&Uid::from("a1"), Version::from("1"), Doc::new("x", "t1", "old"));
        store.insert(&Uid::from("a1"), Version::from("2"), Doc::new("x", "t1", "new"));
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("x", "t1").unwrap().body, "new");
    }

    #[test]
    fn test_update_same_version_is_noop() {
        let store = store();
        store.insert(&Uid::from("a1"), Version::from("1"), Doc::new("x", "t1", "old"));
        let accepted = store.update(&Uid::from("a1"), Version::from("1"), Doc::new("x", "t1", "new"));
        assert!(!accepted);
        assert_eq!(store.get("x", "t1").unwrap().body, "old");
    }

    #[test]
    fn test_update_new_version_replaces() {
        let store = store();
        store.insert(&Uid::from("a1"), Version::from("1"), Doc::new("x", "t1", "old"));
        let accepted = store.update(&Uid::from("a1"), Version::from("2"), Doc::new("x", "t1", "new"));
        assert!(accepted);
        assert_eq!(store.get("x", "t1").unwrap().body, "new");
    }

    #[test]
    fn test_update_unknown_id_inserts() {
        let store = store();
        let accepted = store.update(&Uid::from("a1"), Version::from("1"), Doc::new("x", "t1", "late"));
        assert!(accepted);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_remove_returns_last_snapshot() {
        let store = store();
        store.insert(&Uid::from("a1"), Version::from("1"), Doc::new("x", "t1", "body"));
        let removed = store.remove(&Uid::from("a1")).unwrap();
        assert_eq!(removed.body, "body");
        assert!(store.is_empty());
        assert!(store.remove(&Uid::from("a1")).is_none());
    }

    #[test]
    #[should_panic(expected = "uid must not be empty")]
    fn test_empty_uid_panics() {
        store().insert(&Uid::from(""), Version::from("1"), Doc::new("x", "t1", ""));
    }

    #[test]
    fn test_items_applies_all_predicates() {
        let store = store();
        store.insert(&Uid::from("a1"), Version::from("1"), Doc::new("x", "t1", "keep"));
        store.insert(&Uid::from("a2"), Version::from("1"), Doc::new("x", "t2", "drop"));
        store.insert(&Uid::from("a3"), Version::from("1"), Doc::new("y", "t3", "keep"));

        let in_x = |d: &Doc| d.namespace == "x";
        let keep = |d: &Doc| d.body == "keep";
        let items = store.items(&[&in_x, &keep]);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].name, "t1");
    }

    #[test]
    fn test_items_is_stable_between_calls() {
        let store = store();
        for i in 0..5 {
            let name = format!("t{i}");
            store.insert(
                &Uid::new(format!("a{i}")),
                Version::from("1"),
                Doc::new("x", &name, ""),
            );
        }
        let first = store.items_sorted(&[]);
        let second = store.items_sorted(&[]);
        assert_eq!(first, second);
    }

    #[test]
    fn test_items_snapshot_not_retroactively_changed() {
        let store = store();
        store.insert(&Uid::from("a1"), Version::from("1"), Doc::new("x", "t1", "before"));
        let snapshot = store.items(&[]);
        store.insert(&Uid::from("a1"), Version::from("2"), Doc::new("x", "t1", "after"));
        assert_eq!(snapshot[0].body, "before");
    }

    #[test]
    fn test_items_sorted_by_namespaced_name() {
        let store = store();
        store.insert(&Uid::from("a1"), Version::from("1"), Doc::new("b", "z", ""));
        store.insert(&Uid::from("a2"), Version::from("1"), Doc::new("a", "y", ""));
        store.insert(&Uid::from("a3"), Version::from("1"), Doc::new("a", "x", ""));

        let names: Vec<String> = store
            .items_sorted(&[])
            .iter()
            .map(|d| d.namespaced_name().to_string())
            .collect();
        assert_eq!(names, vec!["a/x", "a/y", "b/z"]);
    }

    #[test]
    fn test_debug_names_kind_and_size() {
        let store = store();
        store.insert(&Uid::from("a1"), Version::from("1"), Doc::new("x", "t1", ""));
        assert_eq!(format!("{store:?}"), "TypedStore(doc, 1 entries)");
    }

    #[test]
    fn test_get_not_found() {
        let err = store().get("x", "missing").unwrap_err();
        assert!(matches!(err, CacheError::NotFound { .. }));
    }

    #[test]
    fn test_get_ambiguous() {
        let store = store();
        store.insert(&Uid::from("a1"), Version::from("1"), Doc::new("x", "t1", "one"));
        store.insert(&Uid::from("a2"), Version::from("1"), Doc::new("x", "t1", "two"));
        let err = store.get("x", "t1").unwrap_err();
        assert!(matches!(err, CacheError::Ambiguous { count: 2, .. }));
    }
}
