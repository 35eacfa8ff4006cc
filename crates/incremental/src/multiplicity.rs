//! Multiplicity tracking for `Distinct` and `Union`.
//!
//! `Distinct` must only emit an insert the first time a value's count
//! goes from zero to positive, and only emit a delete when it drops back
//! to zero; `Union` needs the same bookkeeping to avoid re-emitting a
//! row present on both sides. `MultiplicityMap` is the net-count model
//! the teacher's `ConsolidatedCollection` used for differential
//! multiplicities, narrowed to the insert/delete counting this event
//! model actually needs.

use hashbrown::HashMap;

/// Tracks how many times each key is currently present across all
/// contributing sources.
pub struct MultiplicityMap<K> {
    counts: HashMap<K, u64>,
}

impl<K: core::hash::Hash + Eq + Clone> MultiplicityMap<K> {
    /// Creates an empty multiplicity map.
    pub fn new() -> Self {
        Self { counts: HashMap::new() }
    }

    /// Records one more occurrence of `key`. Returns true if this was
    /// the transition from absent (count 0) to present (count 1) — the
    /// caller should emit an insert.
    pub fn increment(&mut self, key: K) -> bool {
        let count = self.counts.entry(key).or_insert(0);
        *count += 1;
        *count == 1
    }

    /// Records one fewer occurrence of `key`. Returns true if this was
    /// the transition from present (count 1) to absent (count 0) — the
    /// caller should emit a delete.
    pub fn decrement(&mut self, key: &K) -> bool {
        let mut became_absent = false;
        let mut remove = false;
        if let Some(count) = self.counts.get_mut(key) {
            if *count > 0 {
                *count -= 1;
            }
            if *count == 0 {
                became_absent = true;
                remove = true;
            }
        }
        if remove {
            self.counts.remove(key);
        }
        became_absent
    }

    /// Returns the current count for a key.
    pub fn count(&self, key: &K) -> u64 {
        self.counts.get(key).copied().unwrap_or(0)
    }

    /// Returns true if the key is currently present (count > 0).
    pub fn contains(&self, key: &K) -> bool {
        self.counts.contains_key(key)
    }

    /// Returns the number of distinct keys currently present.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    /// Returns true if no key is currently present.
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Clears all tracked counts.
    pub fn clear(&mut self) {
        self.counts.clear();
    }
}

impl<K: core::hash::Hash + Eq + Clone> Default for MultiplicityMap<K> {
    fn default() -> Self {
        Self::new()
    }
}
