//! Incremental `Join` maintenance (§4.8), including outer joins.
//!
//! `IncrementalHashJoin` keeps a hash index on each side keyed by the
//! join key, mirroring the teacher's original hash-join design. Outer
//! joins additionally need to know, on every mutation, whether the
//! *other* side's bucket for that key was empty before and non-empty
//! after (or vice versa): that 0↔1 transition is what turns a
//! null-padded row into a real match and back, and it has to retract
//! every pad row sharing the key, not just the row that triggered it —
//! several left rows can share a key and all of them were padded while
//! the key had no right match.

use crate::delta::Delta;
use alloc::vec::Vec;
use core::hash::Hash;
use hashbrown::HashMap;

/// Which rows with no match are still included in the output.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JoinType {
    /// Only matched pairs are emitted.
    Inner,
    /// Every left row is emitted at least once, null-padded if unmatched.
    LeftOuter,
    /// Every right row is emitted at least once, null-padded if unmatched.
    RightOuter,
    /// Both sides are preserved when unmatched.
    FullOuter,
}

/// Maintains an incremental hash join between two row streams.
///
/// `L` and `R` are the per-side row types; `merge` combines a matched
/// pair (or a row and a null-padded counterpart) into the join's output
/// row type `T`.
pub struct IncrementalHashJoin<K, L, R> {
    join_type: JoinType,
    left_index: HashMap<K, Vec<L>>,
    right_index: HashMap<K, Vec<R>>,
}

impl<K, L, R> IncrementalHashJoin<K, L, R>
where
    K: Hash + Eq + Clone,
    L: Clone,
    R: Clone,
{
    /// Creates a new, empty join state.
    pub fn new(join_type: JoinType) -> Self {
        Self { join_type, left_index: HashMap::new(), right_index: HashMap::new() }
    }

    fn bucket_has_rows<V>(index: &HashMap<K, Vec<V>>, key: &K) -> bool {
        index.get(key).map(|v| !v.is_empty()).unwrap_or(false)
    }

    fn emits_left_outer(&self) -> bool {
        matches!(self.join_type, JoinType::LeftOuter | JoinType::FullOuter)
    }

    fn emits_right_outer(&self) -> bool {
        matches!(self.join_type, JoinType::RightOuter | JoinType::FullOuter)
    }

    /// Processes an insertion of a left-side row under `key`, merging
    /// against every currently-indexed right row via `merge`.
    pub fn on_left_insert<T>(
        &mut self,
        key: K,
        row: L,
        merge: impl Fn(&L, &R) -> T,
        pad_right: impl Fn(&L) -> T,
    ) -> Vec<Delta<T>> {
        let mut out = Vec::new();
        let has_right_matches = Self::bucket_has_rows(&self.right_index, &key);

        if has_right_matches {
            for r in self.right_index.get(&key).into_iter().flatten() {
                out.push(Delta::Insert(merge(&row, r)));
            }
        } else if self.emits_left_outer() {
            out.push(Delta::Insert(pad_right(&row)));
        }

        self.left_index.entry(key).or_default().push(row);
        out
    }

    /// Processes a deletion of a left-side row under `key`.
    pub fn on_left_delete<T>(
        &mut self,
        key: &K,
        row: &L,
        matches: impl Fn(&L, &L) -> bool,
        merge: impl Fn(&L, &R) -> T,
        pad_right: impl Fn(&L) -> T,
        pad_left: impl Fn(&R) -> T,
    ) -> Vec<Delta<T>> {
        let mut out = Vec::new();
        let had_right_matches = Self::bucket_has_rows(&self.right_index, key);

        if had_right_matches {
            for r in self.right_index.get(key).into_iter().flatten() {
                out.push(Delta::Delete(merge(row, r)));
            }
        } else if self.emits_left_outer() {
            out.push(Delta::Delete(pad_right(row)));
        }

        if let Some(left_rows) = self.left_index.get_mut(key) {
            left_rows.retain(|l| !matches(l, row));
            if left_rows.is_empty() {
                self.left_index.remove(key);
            }
        }

        // The last left row under this key is gone: any right row that
        // was only matched through it now has no match left and, under
        // a right outer join, must be re-padded.
        let left_now_empty = !Self::bucket_has_rows(&self.left_index, key);
        if had_right_matches && left_now_empty && self.emits_right_outer() {
            for r in self.right_index.get(key).into_iter().flatten() {
                out.push(Delta::Insert(pad_left(r)));
            }
        }

        out
    }

    /// Processes an insertion of a right-side row under `key`.
    pub fn on_right_insert<T>(
        &mut self,
        key: K,
        row: R,
        merge: impl Fn(&L, &R) -> T,
        pad_left: impl Fn(&R) -> T,
        pad_right: impl Fn(&L) -> T,
    ) -> Vec<Delta<T>> {
        let mut out = Vec::new();
        let has_left_matches = Self::bucket_has_rows(&self.left_index, &key);
        let had_right_before = Self::bucket_has_rows(&self.right_index, &key);

        if has_left_matches {
            // This key's left rows were only visible via their null pad
            // until now; retract those pads before emitting real matches.
            if !had_right_before && self.emits_left_outer() {
                for l in self.left_index.get(&key).into_iter().flatten() {
                    out.push(Delta::Delete(pad_right(l)));
                }
            }
            for l in self.left_index.get(&key).into_iter().flatten() {
                out.push(Delta::Insert(merge(l, &row)));
            }
        } else if self.emits_right_outer() {
            out.push(Delta::Insert(pad_left(&row)));
        }

        self.right_index.entry(key).or_default().push(row);
        out
    }

    /// Processes a deletion of a right-side row under `key`.
    pub fn on_right_delete<T>(
        &mut self,
        key: &K,
        row: &R,
        matches: impl Fn(&R, &R) -> bool,
        merge: impl Fn(&L, &R) -> T,
        pad_left: impl Fn(&R) -> T,
        pad_right: impl Fn(&L) -> T,
    ) -> Vec<Delta<T>> {
        let mut out = Vec::new();
        let has_left_matches = Self::bucket_has_rows(&self.left_index, key);

        if has_left_matches {
            for l in self.left_index.get(key).into_iter().flatten() {
                out.push(Delta::Delete(merge(l, row)));
            }
        } else if self.emits_right_outer() {
            out.push(Delta::Delete(pad_left(row)));
        }

        if let Some(right_rows) = self.right_index.get_mut(key) {
            right_rows.retain(|r| !matches(r, row));
            if right_rows.is_empty() {
                self.right_index.remove(key);
            }
        }

        let right_now_empty = !Self::bucket_has_rows(&self.right_index, key);
        if has_left_matches && right_now_empty && self.emits_left_outer() {
            for l in self.left_index.get(key).into_iter().flatten() {
                out.push(Delta::Insert(pad_right(l)));
            }
        }

        out
    }

    /// Number of distinct keys on the left side.
    pub fn left_key_count(&self) -> usize {
        self.left_index.len()
    }

    /// Number of distinct keys on the right side.
    pub fn right_key_count(&self) -> usize {
        self.right_index.len()
    }
}
