//! Incremental `Union` and `UnionAll` maintenance (§4.6).
//!
//! `UnionAll` is stateless concatenation: every delta from either side
//! passes straight through. `Union` additionally removes duplicates
//! across the two sides, so it reuses [`DistinctState`] keyed by the
//! row's full value, fed from both input streams.

use crate::delta::Delta;
use crate::operators::distinct::DistinctState;
use alloc::vec::Vec;

/// Passes deltas from either side of a `UnionAll` straight through.
pub fn union_all_incremental<T: Clone>(input: Vec<Delta<T>>) -> Vec<Delta<T>> {
    input
}

/// Maintains a `Union` view's deduplication state across both inputs.
pub struct UnionState<K> {
    distinct: DistinctState<K>,
}

impl<K: core::hash::Hash + Eq + Clone> UnionState<K> {
    pub fn new() -> Self {
        Self { distinct: DistinctState::new() }
    }

    /// Applies a delta observed from either side of the union.
    pub fn apply<T: Clone>(&mut self, delta: Delta<T>, key_of: impl Fn(&T) -> K) -> Vec<Delta<T>> {
        self.distinct.apply(delta, key_of)
    }

    pub fn len(&self) -> usize {
        self.distinct.len()
    }

    pub fn is_empty(&self) -> bool {
        self.distinct.is_empty()
    }
}

impl<K: core::hash::Hash + Eq + Clone> Default for UnionState<K> {
    fn default() -> Self {
        Self::new()
    }
}
