//! A concurrent, weakly-referenced identifier→object map.
//!
//! Used to share one coordination object (typically a
//! [`Dogpile`](crate::dogpile::Dogpile)) per logical cache key across
//! however many call sites need it, without the registry itself keeping
//! every entry alive forever. The `Arc`/`Weak` split and the
//! read-lock-fast-path/write-lock-slow-path discipline mirror
//! `bpa::app_registry::AppRegistry`'s own `Arc<RwLock<HashMap<..>>>` index.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, RwLock, Weak};

/// A registry mapping identifiers to shared, weakly-held objects.
///
/// `NameRegistry<K, V>` does not own any `V`; once every external `Arc<V>`
/// handed out for a given key is dropped, the entry is free to disappear
/// (and is swept out lazily on a later `get` that touches it).
pub struct NameRegistry<K, V> {
    entries: RwLock<HashMap<K, Weak<V>>>,
}

impl<K, V> Default for NameRegistry<K, V>
where
    K: Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> NameRegistry<K, V>
where
    K: Eq + Hash + Clone,
{
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the object associated with `id`, creating one via `create` if
    /// none currently exists (or the one that did has been fully dropped).
    ///
    /// Concurrent calls for the same `id` are guaranteed to observe the same
    /// `Arc<V>` as long as at least one caller keeps a strong reference
    /// alive across the calls; `create` is invoked at most once per such
    /// window. `create` must not itself call `get` on this same registry
    /// (see the module docs on non-reentrancy).
    #[cfg_attr(feature = "instrument", tracing::instrument(skip(self, create)))]
    pub fn get(&self, id: &K, create: impl FnOnce() -> V) -> Arc<V> {
        // Fast path: shared read lock, no allocation on hit.
        let fast = self
            .entries
            .read()
            .expect("registry poisoned")
            .get(id)
            .and_then(Weak::upgrade);
        if let Some(value) = fast {
            tracing::trace!("registry hit on fast path");
            return value;
        }

        // Slow path: re-check under the write lock in case another thread
        // raced us between the read-lock check above and here.
        let mut entries = self.entries.write().expect("registry poisoned");
        if let Some(value) = entries.get(id).and_then(Weak::upgrade) {
            return value;
        }

        let value = Arc::new(create());
        entries.insert(id.clone(), Arc::downgrade(&value));
        tracing::debug!("registry created new entry");
        value
    }

    /// Removes dead (no longer referenced) entries from the map.
    ///
    /// Entries are swept opportunistically during [`get`](Self::get) slow
    /// paths that touch the same key; call this to reclaim memory for keys
    /// that are no longer being looked up at all.
    pub fn retain_live(&self) {
        let mut entries = self.entries.write().expect("registry poisoned");
        entries.retain(|_, weak| weak.strong_count() > 0);
    }

    /// The number of entries currently tracked, live or not. Mainly useful
    /// for tests.
    pub fn len(&self) -> usize {
        self.entries.read().expect("registry poisoned").len()
    }

    /// Whether the registry currently tracks no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
