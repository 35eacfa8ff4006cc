//! `Distinct` (`.distinct()`, §4.6): de-duplicates rows by full value,
//! keyed on the row's own values (not its `mirrors_id`) since two
//! distinct source rows with equal values are indistinguishable once
//! projected into a set.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use rsql_core::{Result, Row, Value};
use rsql_ivm::{Delta, DistinctState};
use rsql_reactive::{ParentLink, ViewListeners, ViewSubscription};

use crate::view::{self, View, ViewKind, ViewRef};

pub struct DistinctViewState {
    parent_link: ParentLink<View, ViewSubscription>,
    state: Rc<RefCell<DistinctState<Vec<Value>>>>,
}

impl DistinctViewState {
    pub(crate) fn parent(&self) -> Option<ViewRef> {
        self.parent_link.parent()
    }
}

fn key_of(row: &Row) -> Vec<Value> {
    row.values().to_vec()
}

/// `View.distinct()` (§4.6).
pub fn distinct(parent: &ViewRef) -> Result<ViewRef> {
    let (columns, is_bool, gateway, parent_query) = {
        let p = parent.borrow();
        (p.columns.clone(), p.is_bool.clone(), p.gateway.clone(), p.query.clone())
    };
    let query_sql = crate::query::distinct(&parent_query);
    let state = Rc::new(RefCell::new(DistinctState::new()));

    let view: ViewRef = Rc::new_cyclic(|weak: &Weak<RefCell<View>>| {
        let weak_for_closure = weak.clone();
        let state_for_closure = state.clone();
        let parent_link = view::link_to_parent(parent, move |delta: Delta<Row>| {
            if let Some(view) = weak_for_closure.upgrade() {
                let out = state_for_closure.borrow_mut().apply(delta, key_of);
                view::emit_all(&view, out);
            }
        });

        RefCell::new(View {
            id: view::next_view_id(),
            columns,
            is_bool,
            query: query_sql,
            gateway,
            base_weak: Some(weak.clone()),
            listeners: ViewListeners::new(),
            kind: ViewKind::Distinct(DistinctViewState { parent_link, state }),
        })
    });

    Ok(view)
}
