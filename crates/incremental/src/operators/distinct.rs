//! Incremental `Distinct` maintenance (§4.6).
//!
//! A row's presence in a `Distinct` view depends on how many input rows
//! currently equal it, tracked in a [`MultiplicityMap`] keyed by the
//! row's full value. The view only ever emits the zero-to-one and
//! one-to-zero transitions a downstream listener cares about.

use crate::delta::Delta;
use crate::multiplicity::MultiplicityMap;
use alloc::vec::Vec;

/// Maintains a `Distinct` view's multiplicity state.
pub struct DistinctState<K> {
    multiplicities: MultiplicityMap<K>,
}

impl<K: core::hash::Hash + Eq + Clone> DistinctState<K> {
    /// Creates an empty distinct state.
    pub fn new() -> Self {
        Self { multiplicities: MultiplicityMap::new() }
    }

    /// Applies one delta from the input, keyed by `key_of`, returning
    /// the deltas (if any) the `Distinct` view should emit.
    pub fn apply<T: Clone>(&mut self, delta: Delta<T>, key_of: impl Fn(&T) -> K) -> Vec<Delta<T>> {
        match delta {
            Delta::Insert(row) => {
                let key = key_of(&row);
                if self.multiplicities.increment(key) {
                    alloc::vec![Delta::Insert(row)]
                } else {
                    Vec::new()
                }
            }
            Delta::Delete(row) => {
                let key = key_of(&row);
                if self.multiplicities.decrement(&key) {
                    alloc::vec![Delta::Delete(row)]
                } else {
                    Vec::new()
                }
            }
            Delta::Update { old, new } => {
                let old_key = key_of(&old);
                let new_key = key_of(&new);
                if old_key == new_key {
                    return Vec::new();
                }
                let old_absent = self.multiplicities.decrement(&old_key);
                let new_present = self.multiplicities.increment(new_key);
                match (old_absent, new_present) {
                    (true, true) => alloc::vec![Delta::Update { old, new }],
                    (true, false) => alloc::vec![Delta::Delete(old)],
                    (false, true) => alloc::vec![Delta::Insert(new)],
                    (false, false) => Vec::new(),
                }
            }
            Delta::Reset => {
                self.multiplicities.clear();
                alloc::vec![Delta::Reset]
            }
        }
    }

    /// Returns the number of distinct keys currently present.
    pub fn len(&self) -> usize {
        self.multiplicities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.multiplicities.is_empty()
    }
}

impl<K: core::hash::Hash + Eq + Clone> Default for DistinctState<K> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distinct_suppresses_duplicate_inserts() {
        let mut state: DistinctState<i32> = DistinctState::new();
        let id = |x: &i32| *x;

        assert_eq!(state.apply(Delta::insert(1), id), alloc::vec![Delta::insert(1)]);
        assert_eq!(state.apply(Delta::insert(1), id), Vec::new());
        assert_eq!(state.len(), 1);
    }

    #[test]
    fn test_distinct_delete_only_on_last_copy() {
        let mut state: DistinctState<i32> = DistinctState::new();
        let id = |x: &i32| *x;

        state.apply(Delta::insert(1), id);
        state.apply(Delta::insert(1), id);
        assert_eq!(state.apply(Delta::delete(1), id), Vec::new());
        assert_eq!(state.apply(Delta::delete(1), id), alloc::vec![Delta::delete(1)]);
        assert!(state.is_empty());
    }

    #[test]
    fn test_distinct_update_changing_key() {
        let mut state: DistinctState<i32> = DistinctState::new();
        let id = |x: &i32| *x;

        state.apply(Delta::insert(1), id);
        assert_eq!(state.apply(Delta::update(1, 2), id), alloc::vec![Delta::update(1, 2)]);
    }

    proptest::proptest! {
        /// §8's Distinct/Union invariant: for every row, the emitted
        /// presence is binary (0 or 1), and an insert immediately
        /// followed by a delete of the same row nets to zero — checked
        /// here against a shadow reference-count model.
        #[test]
        fn test_distinct_tracks_presence_as_binary(ops in proptest::collection::vec((proptest::prelude::any::<bool>(), 0i32..4), 0..60)) {
            let mut state: DistinctState<i32> = DistinctState::new();
            let mut shadow: std::collections::HashMap<i32, u64> = std::collections::HashMap::new();
            let id = |x: &i32| *x;

            for (is_insert, key) in ops {
                let delta = if is_insert { Delta::insert(key) } else { Delta::delete(key) };
                let emitted = state.apply(delta, id);
                let count = shadow.entry(key).or_insert(0);
                if is_insert {
                    *count += 1;
                    if *count == 1 {
                        proptest::prop_assert_eq!(&emitted, &alloc::vec![Delta::insert(key)]);
                    } else {
                        proptest::prop_assert!(emitted.is_empty());
                    }
                } else if *count > 0 {
                    *count -= 1;
                    if *count == 0 {
                        proptest::prop_assert_eq!(&emitted, &alloc::vec![Delta::delete(key)]);
                    } else {
                        proptest::prop_assert!(emitted.is_empty());
                    }
                } else {
                    proptest::prop_assert!(emitted.is_empty());
                }
            }

            let live_keys = shadow.values().filter(|&&c| c > 0).count();
            proptest::prop_assert_eq!(state.len(), live_keys);
        }
    }
}
