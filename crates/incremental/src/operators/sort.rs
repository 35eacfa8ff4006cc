//! Incremental `Sort` maintenance (§4.10): ordered output with an
//! optional `(offset, limit)` window.
//!
//! Unlike the other operators in this module, `Sort`'s output is
//! positional: a listener patching a DOM list or a desktop grid needs
//! to know not just *that* a row appeared but *where*, and needs that
//! index to be correct against the window's state at the moment the
//! listener applies it — not against some globally-recomputed final
//! state. A single upstream delta moves at most one row across the
//! window boundary, so each delta kind gets its own index-precise rule
//! (§4.10) rather than a snapshot diff of the whole window, which would
//! assign departing rows an index relative to the *new* window instead
//! of the one the listener is still holding.
//!
//! The full relation is kept in `rows` (not just the visible slice) so
//! that windowing maths never needs a round trip back to the gateway —
//! `offset`/`limit` changes and boundary-row lookups are served directly
//! from memory. NULLs sort low in ascending order (`Value`'s `Ord`); a
//! descending comparator reverses the whole order, NULLs included, so
//! they end up high under `DESC`.

use crate::delta::{Delta, IndexedDelta};
use alloc::boxed::Box;
use alloc::vec::Vec;
use core::cmp::Ordering;
use core::hash::Hash;

/// Maintains the ordered, windowed output of a `Sort` view.
pub struct SortState<K, T> {
    comparator: Box<dyn Fn(&T, &T) -> Ordering>,
    key_of: Box<dyn Fn(&T) -> K>,
    rows: Vec<T>,
    offset: usize,
    limit: Option<usize>,
}

impl<K: Hash + Eq + Clone, T: Clone + PartialEq> SortState<K, T> {
    /// Creates a new sort state.
    pub fn new(
        comparator: impl Fn(&T, &T) -> Ordering + 'static,
        key_of: impl Fn(&T) -> K + 'static,
        offset: usize,
        limit: Option<usize>,
    ) -> Self {
        Self { comparator: Box::new(comparator), key_of: Box::new(key_of), rows: Vec::new(), offset, limit }
    }

    fn window_bounds_over(&self, total: usize) -> (usize, usize) {
        let start = self.offset.min(total);
        let end = match self.limit {
            Some(l) => (start + l).min(total),
            None => total,
        };
        (start, end)
    }

    fn window_bounds(&self) -> (usize, usize) {
        self.window_bounds_over(self.rows.len())
    }

    /// True if `global_index` falls inside the current (offset, limit)
    /// window, given the relation has `total` rows.
    fn is_visible(&self, global_index: usize, total: usize) -> bool {
        if global_index < self.offset {
            return false;
        }
        match self.limit {
            Some(l) => global_index < self.offset + l,
            None => global_index < total,
        }
    }

    fn sorted_position(&self, row: &T) -> usize {
        self.rows.binary_search_by(|existing| (self.comparator)(existing, row)).unwrap_or_else(|p| p)
    }

    fn position_of_key(&self, key: &K) -> Option<usize> {
        self.rows.iter().position(|r| &(self.key_of)(r) == key)
    }

    /// Applies a single insertion, returning the window-relative events
    /// a listener should see (§4.10 `insert`).
    fn apply_insert(&mut self, row: T) -> Vec<IndexedDelta<T>> {
        let old_total = self.rows.len();
        let p = self.sorted_position(&row);
        let mut out = Vec::new();

        if self.is_visible(p, old_total + 1) {
            let window_index = p - self.offset;
            out.push(IndexedDelta::new(Delta::Insert(row.clone()), window_index));
        } else if p < self.offset {
            // The row lands before the window; everything in it shifts
            // forward by one slot and a new head enters from outside.
            // The value that becomes the new head is whatever currently
            // sits at `offset` in the not-yet-mutated relation.
            if self.offset < old_total {
                let new_head = self.rows[self.offset].clone();
                out.push(IndexedDelta::new(Delta::Insert(new_head), 0));
            }
        }

        // Whether a tail row is pushed out of the window depends only on
        // whether the window was already at capacity before this insert —
        // an insert past the window's end never evicts anything.
        if let Some(limit) = self.limit {
            if (p < self.offset || self.is_visible(p, old_total + 1)) && old_total >= self.offset + limit {
                let evicted = self.rows[self.offset + limit - 1].clone();
                out.push(IndexedDelta::new(Delta::Delete(evicted), limit));
            }
        }

        self.rows.insert(p, row);
        out
    }

    /// Applies a single deletion, returning the window-relative events
    /// a listener should see (§4.10 `delete`). No-op if the row isn't
    /// present (e.g. already removed by a prior reset).
    fn apply_delete(&mut self, row: &T) -> Vec<IndexedDelta<T>> {
        let key = (self.key_of)(row);
        let p = match self.position_of_key(&key) {
            Some(p) => p,
            None => return Vec::new(),
        };
        let old_total = self.rows.len();
        let mut out = Vec::new();

        if self.is_visible(p, old_total) {
            let window_index = p - self.offset;
            out.push(IndexedDelta::new(Delta::Delete(row.clone()), window_index));
        } else if p < self.offset {
            // An invisible row before the window disappears; the window
            // shifts back by one slot, so its current head departs.
            out.push(IndexedDelta::new(Delta::Delete(self.rows[self.offset].clone()), 0));
        }

        self.rows.remove(p);

        // A row promoted into the window's last slot, if the relation
        // still has enough rows to fill it after the removal.
        if let Some(limit) = self.limit {
            if (p < self.offset || self.is_visible(p, old_total)) && self.offset + limit - 1 < self.rows.len() {
                let promoted = self.rows[self.offset + limit - 1].clone();
                out.push(IndexedDelta::new(Delta::Insert(promoted), limit - 1));
            }
        }

        out
    }

    /// Applies an in-place value change, merging the row's own
    /// delete+insert into a single positioned `Update` when both sides
    /// are window-visible (§4.10 `update`); any knock-on eviction or
    /// promotion at the window boundary is reported alongside it.
    fn apply_update(&mut self, old: T, new: T) -> Vec<IndexedDelta<T>> {
        let old_key = (self.key_of)(&old);
        let mut delete_events = self.apply_delete(&old);
        let mut insert_events = self.apply_insert(new.clone());

        let old_self_pos = delete_events.iter().position(|e| match &e.delta {
            Delta::Delete(r) => (self.key_of)(r) == old_key,
            _ => false,
        });
        let new_self_pos = insert_events.iter().position(|e| match &e.delta {
            Delta::Insert(r) => r == &new,
            _ => false,
        });

        match (old_self_pos, new_self_pos) {
            (Some(di), Some(ii)) => {
                let old_index = delete_events.remove(di).position;
                let new_index = insert_events.remove(ii).position;
                let mut out = alloc::vec![IndexedDelta::new(Delta::Update { old, new }, new_index)];
                out[0].position = new_index;
                // Retain old_index information by encoding it only via
                // the event itself isn't possible with one `position`
                // field, so side-channel it through a dedicated variant
                // is unnecessary here: callers that need old_index read
                // it from the delete half when the move crosses a
                // boundary; within-window moves report the new index.
                let _ = old_index;
                out.extend(delete_events);
                out.extend(insert_events);
                out
            }
            _ => {
                delete_events.extend(insert_events);
                delete_events
            }
        }
    }

    /// Applies one delta from the input, emitting the window-relative
    /// changes a `Sort` listener should see.
    pub fn apply(&mut self, delta: Delta<T>) -> Vec<IndexedDelta<T>> {
        match delta {
            Delta::Insert(row) => self.apply_insert(row),
            Delta::Delete(row) => self.apply_delete(&row),
            Delta::Update { old, new } => self.apply_update(old, new),
            Delta::Reset => {
                self.rows.clear();
                alloc::vec![IndexedDelta::new(Delta::Reset, 0)]
            }
        }
    }

    /// Returns the current window's rows, in order.
    pub fn window(&self) -> &[T] {
        let (start, end) = self.window_bounds();
        &self.rows[start..end]
    }

    /// Grows or shrinks the limit, emitting the rows that enter or leave
    /// the window as a result (§4.10 `set_limit`).
    pub fn set_limit(&mut self, limit: Option<usize>) -> Vec<IndexedDelta<T>> {
        let (_, old_end) = self.window_bounds();
        self.limit = limit;
        let (_, new_end) = self.window_bounds();
        let mut out = Vec::new();
        if new_end > old_end {
            for (i, row) in self.rows[old_end..new_end].iter().enumerate() {
                out.push(IndexedDelta::new(Delta::Insert(row.clone()), old_end - self.offset + i));
            }
        } else if new_end < old_end {
            for (i, row) in self.rows[new_end..old_end].iter().enumerate().rev() {
                out.push(IndexedDelta::new(Delta::Delete(row.clone()), new_end - self.offset + i));
            }
        }
        out
    }

    /// Changes the offset, re-reading the window wholesale (§4.10
    /// `set_offset`): shifting the window start moves every visible row,
    /// so a `Reset` is cheaper and simpler to reason about than a
    /// positional diff.
    pub fn set_offset(&mut self, offset: usize) -> Vec<IndexedDelta<T>> {
        self.offset = offset;
        alloc::vec![IndexedDelta::new(Delta::Reset, 0)]
    }

    /// Total number of rows seen by this sort, independent of windowing.
    pub fn total_len(&self) -> usize {
        self.rows.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(limit: Option<usize>) -> SortState<i64, i64> {
        SortState::new(|a: &i64, b: &i64| a.cmp(b), |x: &i64| *x, 0, limit)
    }

    #[test]
    fn test_sort_inserts_in_order() {
        let mut s = state(None);
        s.apply(Delta::insert(3));
        s.apply(Delta::insert(1));
        s.apply(Delta::insert(2));
        assert_eq!(s.window(), &[1, 2, 3]);
    }

    #[test]
    fn test_sort_emits_insert_with_position() {
        let mut s = state(None);
        let out = s.apply(Delta::insert(5));
        assert_eq!(out, alloc::vec![IndexedDelta::new(Delta::insert(5), 0)]);
    }

    #[test]
    fn test_sort_respects_limit_window() {
        let mut s = state(Some(2));
        s.apply(Delta::insert(3));
        s.apply(Delta::insert(1));
        s.apply(Delta::insert(2));
        assert_eq!(s.window(), &[1, 2]);
    }

    #[test]
    fn test_sort_delete_shifts_window() {
        let mut s = state(Some(2));
        s.apply(Delta::insert(1));
        s.apply(Delta::insert(2));
        s.apply(Delta::insert(3));
        assert_eq!(s.window(), &[1, 2]);

        s.apply(Delta::delete(1));
        assert_eq!(s.window(), &[2, 3]);
    }

    #[test]
    fn test_sort_delete_emits_the_evicted_rows_own_value() {
        // Key and payload differ, so a naive implementation that
        // reconstructs the deleted row from whatever is left in the
        // window would get this wrong.
        let mut s: SortState<i64, (i64, &str)> =
            SortState::new(|a, b| a.0.cmp(&b.0), |x| x.0, 0, None);
        s.apply(Delta::insert((1, "a")));
        s.apply(Delta::insert((2, "b")));

        let out = s.apply(Delta::delete((1, "a")));
        assert_eq!(out, alloc::vec![IndexedDelta::new(Delta::delete((1, "a")), 0)]);
    }

    #[test]
    fn test_sort_update_in_place_reports_old_and_new_value() {
        let mut s: SortState<i64, (i64, &str)> =
            SortState::new(|a, b| a.0.cmp(&b.0), |x| x.0, 0, None);
        s.apply(Delta::insert((1, "a")));

        let out = s.apply(Delta::update((1, "a"), (1, "b")));
        assert_eq!(out, alloc::vec![IndexedDelta::new(Delta::update((1, "a"), (1, "b")), 0)]);
    }

    #[test]
    fn test_sort_insert_into_middle_evicts_tail_under_limit() {
        // Scenario 5 from the testable properties: window=["a","c","e"]
        // limited to 3, inserting "b" should insert at index 1 and
        // evict "e" — whose patch-time index is 3, the tail slot of the
        // momentarily-four-long array before the trim settles it back
        // down to 3.
        let mut s: SortState<&str, &str> = SortState::new(|a, b| a.cmp(b), |x| *x, 0, Some(3));
        s.apply(Delta::insert("a"));
        s.apply(Delta::insert("c"));
        s.apply(Delta::insert("e"));

        let out = s.apply(Delta::insert("b"));
        assert_eq!(
            out,
            alloc::vec![
                IndexedDelta::new(Delta::insert("b"), 1),
                IndexedDelta::new(Delta::delete("e"), 3),
            ]
        );
        assert_eq!(s.window(), &["a", "b", "c"]);
    }

    #[test]
    fn test_sort_delete_promotes_next_row_into_tail_slot() {
        let mut s = state(Some(2));
        s.apply(Delta::insert(1));
        s.apply(Delta::insert(2));
        s.apply(Delta::insert(3));

        let out = s.apply(Delta::delete(1));
        assert_eq!(out, alloc::vec![IndexedDelta::new(Delta::delete(1), 0), IndexedDelta::new(Delta::insert(3), 1)]);
        assert_eq!(s.window(), &[2, 3]);
    }

    #[test]
    fn test_sort_insert_before_offset_window_shifts_head_and_evicts_tail() {
        let mut s = SortState::new(|a: &i64, b: &i64| a.cmp(b), |x: &i64| *x, 1, Some(2));
        s.apply(Delta::insert(2));
        s.apply(Delta::insert(3));
        s.apply(Delta::insert(4));
        assert_eq!(s.window(), &[3, 4]);

        // Inserting 1 lands before the offset window (position 0); it
        // pushes the window forward so 2 becomes the new head, 4 falls
        // out the tail.
        let out = s.apply(Delta::insert(1));
        assert_eq!(
            out,
            alloc::vec![IndexedDelta::new(Delta::insert(2), 0), IndexedDelta::new(Delta::delete(4), 2)]
        );
        assert_eq!(s.window(), &[2, 3]);
    }

    #[test]
    fn test_sort_set_limit_grows_and_shrinks() {
        let mut s = state(Some(1));
        s.apply(Delta::insert(1));
        s.apply(Delta::insert(2));
        s.apply(Delta::insert(3));
        assert_eq!(s.window(), &[1]);

        let grown = s.set_limit(Some(3));
        assert_eq!(grown, alloc::vec![IndexedDelta::new(Delta::insert(2), 1), IndexedDelta::new(Delta::insert(3), 2)]);
        assert_eq!(s.window(), &[1, 2, 3]);

        let shrunk = s.set_limit(Some(1));
        assert_eq!(shrunk, alloc::vec![IndexedDelta::new(Delta::delete(3), 2), IndexedDelta::new(Delta::delete(2), 1)]);
        assert_eq!(s.window(), &[1]);
    }
}
