//! rsql-reactive — the subscription plumbing behind rsql's reactive
//! views.
//!
//! A view (built on top of `rsql-ivm`'s incremental operators) owns one
//! [`ViewListeners`] bundle and calls [`ViewListeners::dispatch`] with
//! each `rsql_ivm::Delta` it produces. Callers register a callback on
//! the channel they care about — `on_insert`, `on_delete`, `on_update`,
//! or `on_reset` — through a [`listeners::ListenerList`] and get back a
//! [`listeners::Subscription`] token to unsubscribe with later.
//!
//! Views that subscribe to a *parent* view (rather than an external
//! caller subscribing to them) use [`parent_link::ParentLink`] instead:
//! it holds a weak reference to the parent and unregisters itself when
//! the child view is dropped, so a view's lifetime never outlives the
//! subscriptions it depends on.
//!
//! # Example
//!
//! ```
//! use rsql_reactive::ViewListeners;
//! use rsql_ivm::Delta;
//!
//! let mut listeners: ViewListeners<i64> = ViewListeners::new();
//! listeners.on_insert.subscribe(|row| {
//!     // handle a newly inserted row
//!     let _ = row;
//! });
//! listeners.dispatch(&Delta::insert(42));
//! ```

#![no_std]

extern crate alloc;

pub mod listeners;
pub mod parent_link;
pub mod view_listeners;

pub use listeners::{ListenerList, Subscription, SubscriptionId};
pub use parent_link::{ParentLink, Unregisterable};
pub use view_listeners::{ViewListeners, ViewSubscription};

pub use rsql_ivm::{Delta, IndexedDelta};
