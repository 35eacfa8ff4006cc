//! The four listener channels a view exposes to its subscribers and
//! child views (§3, §9): row inserted, row deleted, row updated, and
//! reset (the view must be re-read in full).

use crate::listeners::{ListenerList, Subscription};
use rsql_ivm::Delta;

/// Bundles the four per-event listener lists a reactive view maintains.
pub struct ViewListeners<T> {
    pub on_insert: ListenerList<T>,
    pub on_delete: ListenerList<T>,
    pub on_update: ListenerList<(T, T)>,
    pub on_reset: ListenerList<()>,
}

impl<T: Clone> ViewListeners<T> {
    /// Creates an empty set of listener channels.
    pub fn new() -> Self {
        Self {
            on_insert: ListenerList::new(),
            on_delete: ListenerList::new(),
            on_update: ListenerList::new(),
            on_reset: ListenerList::new(),
        }
    }

    /// Routes one delta to the matching channel.
    pub fn dispatch(&mut self, delta: &Delta<T>) {
        match delta {
            Delta::Insert(row) => self.on_insert.notify(row),
            Delta::Delete(row) => self.on_delete.notify(row),
            Delta::Update { old, new } => self.on_update.notify(&(old.clone(), new.clone())),
            Delta::Reset => self.on_reset.notify(&()),
        }
    }

    /// Routes a batch of deltas.
    pub fn dispatch_all(&mut self, deltas: &[Delta<T>]) {
        for delta in deltas {
            self.dispatch(delta);
        }
    }

    /// Returns true if no listener is registered on any channel —
    /// a view with no subscribers and no child views can skip
    /// maintaining its own state entirely.
    pub fn is_empty(&self) -> bool {
        self.on_insert.is_empty()
            && self.on_delete.is_empty()
            && self.on_update.is_empty()
            && self.on_reset.is_empty()
    }
}

impl<T: Clone> Default for ViewListeners<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// One subscriber's handles across all four channels, returned from a
/// view's `subscribe` so the caller can unsubscribe from all of them
/// together.
#[derive(Clone, Copy, Debug)]
pub struct ViewSubscription {
    pub insert: Subscription,
    pub delete: Subscription,
    pub update: Subscription,
    pub reset: Subscription,
}
