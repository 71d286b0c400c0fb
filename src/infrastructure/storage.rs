//! Concurrent bucket storage.
//!
//! Provides the sharded map behind the dedup store.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::hash::Hash;

/// Thread-safe sharded storage backed by DashMap.
///
/// Reads and writes lock a single shard, so unrelated buckets never contend
/// and a read-then-write through [`ShardedStorage::upsert`] is atomic with
/// respect to other callers targeting the same key.
#[derive(Debug)]
pub struct ShardedStorage<K, V>
where
    K: Eq + Hash,
{
    map: DashMap<K, V>,
}

impl<K, V> ShardedStorage<K, V>
where
    K: Eq + Hash + Clone,
{
    /// Create a new sharded storage instance.
    pub fn new() -> Self {
        Self {
            map: DashMap::new(),
        }
    }

    /// Create storage pre-sized for `capacity` entries.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            map: DashMap::with_capacity(capacity),
        }
    }

    /// Atomically update an existing value or insert a new one.
    ///
    /// `update` runs with the shard locked when the key is present; otherwise
    /// `insert` builds the value, still under the same lock. Exactly one of
    /// the two closures runs.
    pub fn upsert<R>(
        &self,
        key: K,
        update: impl FnOnce(&mut V) -> R,
        insert: impl FnOnce() -> (V, R),
    ) -> R {
        match self.map.entry(key) {
            Entry::Occupied(mut occupied) => update(occupied.get_mut()),
            Entry::Vacant(vacant) => {
                let (value, result) = insert();
                vacant.insert(value);
                result
            }
        }
    }

    /// Check if a key exists.
    pub fn contains_key(&self, key: &K) -> bool {
        self.map.contains_key(key)
    }

    /// Read a value through a closure.
    pub fn read<R>(&self, key: &K, f: impl FnOnce(&V) -> R) -> Option<R> {
        self.map.get(key).map(|value| f(value.value()))
    }

    /// Remove a key and return its value.
    pub fn remove(&self, key: &K) -> Option<V> {
        self.map.remove(key).map(|(_, value)| value)
    }

    /// Remove a key only if the predicate still holds for its value.
    pub fn remove_if(&self, key: &K, f: impl FnOnce(&V) -> bool) -> Option<V> {
        self.map.remove_if(key, |_, value| f(value)).map(|(_, value)| value)
    }

    /// Get the number of entries.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Check if the storage is empty.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Clear all entries.
    pub fn clear(&self) {
        self.map.clear();
    }

    /// Retain only the elements that satisfy the predicate.
    ///
    /// Locks one shard at a time.
    pub fn retain(&self, f: impl FnMut(&K, &mut V) -> bool) {
        self.map.retain(f);
    }

    /// Map up to `limit` entries through `f`, in shard iteration order.
    pub fn sample<T>(&self, limit: usize, mut f: impl FnMut(&K, &V) -> T) -> Vec<T> {
        self.map
            .iter()
            .take(limit)
            .map(|entry| f(entry.key(), entry.value()))
            .collect()
    }
}

impl<K, V> Default for ShardedStorage<K, V>
where
    K: Eq + Hash + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}
