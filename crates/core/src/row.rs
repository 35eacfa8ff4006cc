//! Row structure for the rsql engine.
//!
//! A [`Row`] carries its values plus an optional *mirrored* identity: the
//! `RowId` of the base-table row it was derived from. `Filter` and
//! `Distinct` always preserve it unchanged from their parent; `Project`
//! preserves it only when its `id` column is a pass-through of the
//! parent's. `Union`, `UnionAll`, `Join`, `GroupBy` and `Sort` never
//! preserve it — several source rows (or none) can stand behind one
//! output row, so they produce `mirrors_id = None` instead. A
//! `RowHandle` obtained from a derived view can be routed back to a
//! single underlying row for `.update()`/`.delete()` only while
//! `mirrors_id` survived the whole chain down to it.

use crate::value::Value;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicU64, Ordering};

/// Unique identifier for a base-table row.
pub type RowId = u64;

/// Global row ID counter, used when a storage backend doesn't already
/// hand out stable identifiers (e.g. no `INTEGER PRIMARY KEY` column).
static NEXT_ROW_ID: AtomicU64 = AtomicU64::new(1);

/// Gets the next unique row ID.
pub fn next_row_id() -> RowId {
    NEXT_ROW_ID.fetch_add(1, Ordering::SeqCst)
}

/// Reserves a range of row IDs and returns the starting ID.
pub fn reserve_row_ids(count: u64) -> RowId {
    NEXT_ROW_ID.fetch_add(count, Ordering::SeqCst)
}

/// Sets the next row ID. Used by a gateway when resuming against an
/// already-populated table.
pub fn set_next_row_id_if_greater(id: RowId) {
    NEXT_ROW_ID.fetch_max(id, Ordering::SeqCst);
}

/// A row flowing through a view's delta stream.
#[derive(Clone, Debug)]
pub struct Row {
    /// The base-table row this one mirrors, if any single one exists.
    mirrors_id: Option<RowId>,
    /// Values stored in this row, indexed by column position.
    values: Vec<Value>,
}

impl Row {
    /// Creates a row that mirrors a single base-table row.
    pub fn new(mirrors_id: RowId, values: Vec<Value>) -> Self {
        Self { mirrors_id: Some(mirrors_id), values }
    }

    /// Creates a row with no single mirrored origin (a `Join` or
    /// `GroupBy` result).
    pub fn synthesized(values: Vec<Value>) -> Self {
        Self { mirrors_id: None, values }
    }

    /// Returns the mirrored base row id, if this row has one.
    #[inline]
    pub fn mirrors_id(&self) -> Option<RowId> {
        self.mirrors_id
    }

    /// Returns true if this row has no single mirrored origin.
    #[inline]
    pub fn is_synthesized(&self) -> bool {
        self.mirrors_id.is_none()
    }

    /// Rewrites the mirrored id, used when an operator narrows a
    /// multi-source row down to a single surviving source (e.g. an
    /// outer join's unmatched side).
    pub fn set_mirrors_id(&mut self, mirrors_id: Option<RowId>) {
        self.mirrors_id = mirrors_id;
    }

    /// Returns a reference to the values.
    #[inline]
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Returns a mutable reference to the values.
    #[inline]
    pub fn values_mut(&mut self) -> &mut Vec<Value> {
        &mut self.values
    }

    /// Gets a value at the given column index.
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Sets a value at the given column index.
    pub fn set(&mut self, index: usize, value: Value) -> bool {
        if index < self.values.len() {
            self.values[index] = value;
            true
        } else {
            false
        }
    }

    /// Returns the number of values in this row.
    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if this row has no values.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl PartialEq for Row {
    fn eq(&self, other: &Self) -> bool {
        self.mirrors_id == other.mirrors_id && self.values == other.values
    }
}
