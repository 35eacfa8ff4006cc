//! `Union` and `UnionAll` (§4.7): combine two parents with matching
//! column sets (case-insensitive; output order follows the left
//! parent). `UnionAll` forwards every delta from either side
//! unchanged; `Union` additionally deduplicates across both streams.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use rsql_core::{Error, Result, Row, Value};
use rsql_ivm::{Delta, UnionState};
use rsql_reactive::{ParentLink, ViewListeners, ViewSubscription};

use crate::view::{self, View, ViewKind, ViewRef};

pub struct UnionAllViewState {
    left_link: ParentLink<View, ViewSubscription>,
    right_link: ParentLink<View, ViewSubscription>,
}

impl UnionAllViewState {
    pub(crate) fn left(&self) -> Option<ViewRef> {
        self.left_link.parent()
    }

    pub(crate) fn right(&self) -> Option<ViewRef> {
        self.right_link.parent()
    }
}

pub struct UnionViewState {
    left_link: ParentLink<View, ViewSubscription>,
    right_link: ParentLink<View, ViewSubscription>,
}

impl UnionViewState {
    pub(crate) fn left(&self) -> Option<ViewRef> {
        self.left_link.parent()
    }

    pub(crate) fn right(&self) -> Option<ViewRef> {
        self.right_link.parent()
    }
}

/// Computes the permutation that reorders `right`'s columns into
/// `left`'s order, matched case-insensitively. `None` at index `i` is
/// unreachable once `validate_column_sets` has passed.
fn reorder_permutation(left: &[String], right: &[String]) -> Vec<usize> {
    left.iter()
        .map(|l| {
            right
                .iter()
                .position(|r| r.eq_ignore_ascii_case(l))
                .expect("column sets already validated to match")
        })
        .collect()
}

fn validate_column_sets(left: &[String], right: &[String]) -> Result<()> {
    if left.len() != right.len() {
        return Err(Error::usage("union: parents have a different number of columns"));
    }
    for l in left {
        if !right.iter().any(|r| r.eq_ignore_ascii_case(l)) {
            return Err(Error::usage(format!("union: column {l} is missing from the other parent")));
        }
    }
    Ok(())
}

fn reorder_row(row: &Row, permutation: &[usize]) -> Row {
    let values: Vec<Value> = permutation.iter().map(|&i| row.values()[i].clone()).collect();
    Row::synthesized(values)
}

fn reorder_delta(delta: Delta<Row>, permutation: &[usize]) -> Delta<Row> {
    match delta {
        Delta::Insert(r) => Delta::Insert(reorder_row(&r, permutation)),
        Delta::Delete(r) => Delta::Delete(reorder_row(&r, permutation)),
        Delta::Update { old, new } => {
            Delta::Update { old: reorder_row(&old, permutation), new: reorder_row(&new, permutation) }
        }
        Delta::Reset => Delta::Reset,
    }
}

/// `View.union_all(other)` (§4.7).
pub fn union_all(left: &ViewRef, right: &ViewRef) -> Result<ViewRef> {
    let (left_columns, is_bool, gateway, left_query) = {
        let p = left.borrow();
        (p.columns.clone(), p.is_bool.clone(), p.gateway.clone(), p.query.clone())
    };
    let (right_columns, right_query) = {
        let p = right.borrow();
        (p.columns.clone(), p.query.clone())
    };
    validate_column_sets(&left_columns, &right_columns)?;
    let permutation = reorder_permutation(&left_columns, &right_columns);
    let query_sql = crate::query::union_all(&left_query, &right_query);

    let identity: Vec<usize> = (0..left_columns.len()).collect();

    let view: ViewRef = Rc::new_cyclic(|weak: &Weak<RefCell<View>>| {
        let weak_for_left = weak.clone();
        let left_link = view::link_to_parent(left, move |delta: Delta<Row>| {
            if let Some(view) = weak_for_left.upgrade() {
                view::emit(&view, reorder_delta(delta, &identity));
            }
        });

        let weak_for_right = weak.clone();
        let right_link = view::link_to_parent(right, move |delta: Delta<Row>| {
            if let Some(view) = weak_for_right.upgrade() {
                view::emit(&view, reorder_delta(delta, &permutation));
            }
        });

        RefCell::new(View {
            id: view::next_view_id(),
            columns: left_columns,
            is_bool,
            query: query_sql,
            gateway,
            base_weak: Some(weak.clone()),
            listeners: ViewListeners::new(),
            kind: ViewKind::UnionAll(UnionAllViewState { left_link, right_link }),
        })
    });

    Ok(view)
}

/// `View.union(other)` (§4.7): `UnionAll` plus cross-stream dedup.
pub fn union(left: &ViewRef, right: &ViewRef) -> Result<ViewRef> {
    let (left_columns, is_bool, gateway, left_query) = {
        let p = left.borrow();
        (p.columns.clone(), p.is_bool.clone(), p.gateway.clone(), p.query.clone())
    };
    let (right_columns, right_query) = {
        let p = right.borrow();
        (p.columns.clone(), p.query.clone())
    };
    validate_column_sets(&left_columns, &right_columns)?;
    let permutation = reorder_permutation(&left_columns, &right_columns);
    let query_sql = crate::query::union_distinct(&left_query, &right_query);

    let key_of = |row: &Row| row.values().to_vec();
    let state = Rc::new(RefCell::new(UnionState::new()));
    let identity: Vec<usize> = (0..left_columns.len()).collect();

    let view: ViewRef = Rc::new_cyclic(|weak: &Weak<RefCell<View>>| {
        let weak_for_left = weak.clone();
        let state_for_left = state.clone();
        let left_link = view::link_to_parent(left, move |delta: Delta<Row>| {
            let delta = reorder_delta(delta, &identity);
            if let Some(view) = weak_for_left.upgrade() {
                let out = state_for_left.borrow_mut().apply(delta, key_of);
                view::emit_all(&view, out);
            }
        });

        let weak_for_right = weak.clone();
        let state_for_right = state.clone();
        let right_link = view::link_to_parent(right, move |delta: Delta<Row>| {
            let delta = reorder_delta(delta, &permutation);
            if let Some(view) = weak_for_right.upgrade() {
                let out = state_for_right.borrow_mut().apply(delta, key_of);
                view::emit_all(&view, out);
            }
        });

        RefCell::new(View {
            id: view::next_view_id(),
            columns: left_columns,
            is_bool,
            query: query_sql,
            gateway,
            base_weak: Some(weak.clone()),
            listeners: ViewListeners::new(),
            kind: ViewKind::Union(UnionViewState { left_link, right_link }),
        })
    });

    Ok(view)
}
