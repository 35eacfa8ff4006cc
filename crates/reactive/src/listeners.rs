//! Per-event listener lists.
//!
//! A view keeps one `ListenerList` per event kind it can emit. This
//! stays close to the teacher's `SubscriptionManager` (`HashMap` of
//! boxed callbacks keyed by an id) but trades the single batched
//! `ChangeSet` callback for one channel per delta kind, matching the
//! four-callback shape views expose to callers (§9).

use alloc::boxed::Box;
use alloc::vec::Vec;

/// Identifies one registered callback so it can later be removed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// A handle returned from [`ListenerList::subscribe`]. Unlike
/// [`crate::parent_link::ParentLink`], this does not unsubscribe on
/// drop — external callers are expected to call `unsubscribe`
/// explicitly when they're done, matching the opt-in (not
/// drop-triggered) unsubscribe model callers of a view's public API
/// expect.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Subscription(pub SubscriptionId);

/// A list of callbacks invoked with one kind of event.
pub struct ListenerList<T> {
    next_id: u64,
    callbacks: Vec<(SubscriptionId, Box<dyn FnMut(&T)>)>,
}

impl<T> ListenerList<T> {
    /// Creates an empty listener list.
    pub fn new() -> Self {
        Self { next_id: 0, callbacks: Vec::new() }
    }

    /// Registers a callback, returning a subscription handle.
    pub fn subscribe(&mut self, callback: impl FnMut(&T) + 'static) -> Subscription {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.callbacks.push((id, Box::new(callback)));
        Subscription(id)
    }

    /// Removes a previously registered callback. Returns false if the
    /// subscription was already removed.
    pub fn unsubscribe(&mut self, subscription: Subscription) -> bool {
        let len_before = self.callbacks.len();
        self.callbacks.retain(|(id, _)| *id != subscription.0);
        self.callbacks.len() != len_before
    }

    /// Invokes every registered callback with the given event.
    pub fn notify(&mut self, event: &T) {
        for (_, callback) in &mut self.callbacks {
            callback(event);
        }
    }

    /// Number of currently registered callbacks.
    pub fn len(&self) -> usize {
        self.callbacks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }
}

impl<T> Default for ListenerList<T> {
    fn default() -> Self {
        Self::new()
    }
}
