//! RAII auto-unsubscribe for parent-child view links.
//!
//! When a derived view (e.g. a `Filter` over a `BaseTable`) subscribes
//! to its parent's deltas, the link must not outlive the child: if the
//! child view is dropped with subscribers of its own still live, its
//! subscription to the parent must be torn down too, or the parent
//! keeps pushing deltas into a sink nobody reads. The teacher's
//! `notify.rs` handled this with a `Weak<RefCell<ObservableQuery>>`
//! plus an explicit `cleanup()` call threaded through drop glue; here
//! the cleanup itself is the `Drop` impl, so a child view's field of
//! type `ParentLink<P>` can never be forgotten.
//!
//! This is distinct from [`crate::listeners::Subscription`], which is
//! for callers of a view's *public* API and is unsubscribed explicitly.

use alloc::rc::Weak;
use core::cell::RefCell;

use crate::listeners::SubscriptionId;

/// Implemented by anything a [`ParentLink`] can unregister itself from.
/// `Id` is whatever the parent hands back from its subscribe call — a
/// single [`SubscriptionId`] for a plain `ListenerList`, or a bundle
/// like `ViewSubscription` when the parent exposes several channels
/// that must be torn down together.
pub trait Unregisterable<Id> {
    fn unregister(&mut self, id: Id);
}

/// Holds a weak reference to a parent view and the subscription id(s)
/// this child registered with it. Unregisters automatically on drop.
pub struct ParentLink<P: Unregisterable<Id>, Id = SubscriptionId> {
    parent: Weak<RefCell<P>>,
    id: Id,
}

impl<P: Unregisterable<Id>, Id: Copy> ParentLink<P, Id> {
    pub fn new(parent: Weak<RefCell<P>>, id: Id) -> Self {
        Self { parent, id }
    }

    /// True if the parent this link refers to has already been dropped.
    pub fn parent_is_gone(&self) -> bool {
        self.parent.upgrade().is_none()
    }

    /// Upgrades the held weak reference, for callers that need to walk
    /// back up to the parent itself (e.g. to find an owning base table).
    pub fn parent(&self) -> Option<alloc::rc::Rc<RefCell<P>>> {
        self.parent.upgrade()
    }
}

impl<P: Unregisterable<Id>, Id: Copy> Drop for ParentLink<P, Id> {
    fn drop(&mut self) {
        if let Some(parent) = self.parent.upgrade() {
            parent.borrow_mut().unregister(self.id);
        }
    }
}
