//! The delta protocol carried between a view and its listeners.
//!
//! Unlike a differential-dataflow multiplicity diff, each [`Delta`] here
//! is one concrete event: a row appeared, a row disappeared, a row's
//! values changed in place, or the view's entire contents must be
//! re-read (`Reset`, emitted when incremental maintenance can't express
//! a change cheaply — e.g. a schema change upstream).

use alloc::vec::Vec;

/// A single change to a view's result set.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Delta<T> {
    /// A row was added to the result.
    Insert(T),
    /// A row was removed from the result.
    Delete(T),
    /// A row already in the result changed value.
    Update { old: T, new: T },
    /// The result must be discarded and re-read in full.
    Reset,
}

impl<T> Delta<T> {
    /// Creates an insert delta.
    pub fn insert(data: T) -> Self {
        Delta::Insert(data)
    }

    /// Creates a delete delta.
    pub fn delete(data: T) -> Self {
        Delta::Delete(data)
    }

    /// Creates an update delta.
    pub fn update(old: T, new: T) -> Self {
        Delta::Update { old, new }
    }

    /// Creates a reset delta.
    pub fn reset() -> Self {
        Delta::Reset
    }

    /// Returns true if this is an insert delta.
    pub fn is_insert(&self) -> bool {
        matches!(self, Delta::Insert(_))
    }

    /// Returns true if this is a delete delta.
    pub fn is_delete(&self) -> bool {
        matches!(self, Delta::Delete(_))
    }

    /// Returns true if this is an update delta.
    pub fn is_update(&self) -> bool {
        matches!(self, Delta::Update { .. })
    }

    /// Returns true if this is a reset delta.
    pub fn is_reset(&self) -> bool {
        matches!(self, Delta::Reset)
    }

    /// Maps the payload of this delta, preserving its kind.
    pub fn map<U, F: Fn(T) -> U>(self, f: F) -> Delta<U> {
        match self {
            Delta::Insert(v) => Delta::Insert(f(v)),
            Delta::Delete(v) => Delta::Delete(f(v)),
            Delta::Update { old, new } => Delta::Update { old: f(old), new: f(new) },
            Delta::Reset => Delta::Reset,
        }
    }

    /// Maps the payload by reference, producing a new delta.
    pub fn map_ref<U, F: Fn(&T) -> U>(&self, f: F) -> Delta<U> {
        match self {
            Delta::Insert(v) => Delta::Insert(f(v)),
            Delta::Delete(v) => Delta::Delete(f(v)),
            Delta::Update { old, new } => Delta::Update { old: f(old), new: f(new) },
            Delta::Reset => Delta::Reset,
        }
    }

    /// Splits an update into its `(old, new)` halves.
    pub fn as_update(&self) -> Option<(&T, &T)> {
        match self {
            Delta::Update { old, new } => Some((old, new)),
            _ => None,
        }
    }
}

/// A batch of deltas moving through one propagation step.
pub type DeltaBatch<T> = Vec<Delta<T>>;

/// A delta for an ordered view, additionally carrying the zero-based
/// position the row occupies in (or is leaving from) the output window.
/// Emitted only by `Sort` (§4.10): every other operator's listeners
/// receive a plain [`Delta`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IndexedDelta<T> {
    pub delta: Delta<T>,
    pub position: usize,
}

impl<T> IndexedDelta<T> {
    pub fn new(delta: Delta<T>, position: usize) -> Self {
        Self { delta, position }
    }
}
