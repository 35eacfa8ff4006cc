//! `Join` (§4.8): an incremental equi-hash join over two parents, with
//! optional left/right outer null-padding.
//!
//! `Update` deltas from either side are decomposed into a delete of the
//! old row followed by an insert of the new one — the join index has
//! no notion of "the same row, changed", only presence per key, so this
//! is the natural incremental translation and matches how the join
//! index itself is keyed (by value, not by identity).

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use rsql_core::{Error, Result, Row, Value};
use rsql_ivm::{Delta, IncrementalHashJoin, JoinType};
use rsql_reactive::{ParentLink, ViewListeners, ViewSubscription};

use crate::view::{self, View, ViewKind, ViewRef};

type RowJoin = IncrementalHashJoin<Vec<Value>, Row, Row>;

pub struct JoinViewState {
    left_link: ParentLink<View, ViewSubscription>,
    right_link: ParentLink<View, ViewSubscription>,
}

impl JoinViewState {
    pub(crate) fn left(&self) -> Option<ViewRef> {
        self.left_link.parent()
    }

    pub(crate) fn right(&self) -> Option<ViewRef> {
        self.right_link.parent()
    }
}

fn column_index(columns: &[String], name: &str) -> Result<usize> {
    columns
        .iter()
        .position(|c| c == name)
        .ok_or_else(|| Error::usage(format!("join: unknown column {name}")))
}

/// Output column names for `left` plus the kept right-hand columns
/// (`right_keep`, indices into `right`). A name present on both sides is
/// suffixed `1`/`2` so every output column stays uniquely addressable by
/// name (§4.8 "Column output": specified for the any-outer case, applied
/// here whenever a clash actually occurs — an inner join's surviving
/// non-key right columns can still collide with an unrelated left
/// column of the same name).
fn output_columns(left: &[String], right: &[String], right_keep: &[usize]) -> Vec<String> {
    let kept_right: Vec<&String> = right_keep.iter().map(|&i| &right[i]).collect();
    let mut out = Vec::with_capacity(left.len() + kept_right.len());
    for l in left {
        if kept_right.iter().any(|r| r.eq_ignore_ascii_case(l)) {
            out.push(format!("{l}1"));
        } else {
            out.push(l.clone());
        }
    }
    for r in kept_right {
        if left.iter().any(|l| l.eq_ignore_ascii_case(r)) {
            out.push(format!("{r}2"));
        } else {
            out.push(r.clone());
        }
    }
    out
}

fn row_values_eq(a: &Row, b: &Row) -> bool {
    a.values() == b.values()
}

/// Right-side columns actually emitted: every column when either outer
/// flag is set, otherwise every column except the join key (which
/// already appears once, from the left side) — (§4.8 "Column output").
fn right_keep_indices(right_len: usize, right_key_cols: &[usize], any_outer: bool) -> Vec<usize> {
    if any_outer {
        (0..right_len).collect()
    } else {
        (0..right_len).filter(|i| !right_key_cols.contains(i)).collect()
    }
}

fn merge_rows(l: &Row, r: &Row, right_keep: &[usize]) -> Row {
    let mut values = Vec::with_capacity(l.values().len() + right_keep.len());
    values.extend_from_slice(l.values());
    values.extend(right_keep.iter().map(|&i| r.values()[i].clone()));
    Row::synthesized(values)
}

fn pad_right_row(l: &Row, right_keep_len: usize) -> Row {
    let mut values = Vec::with_capacity(l.values().len() + right_keep_len);
    values.extend_from_slice(l.values());
    values.extend(core::iter::repeat(Value::Null).take(right_keep_len));
    Row::synthesized(values)
}

fn pad_left_row(left_len: usize, r: &Row, right_keep: &[usize]) -> Row {
    let mut values = Vec::with_capacity(left_len + right_keep.len());
    values.extend(core::iter::repeat(Value::Null).take(left_len));
    values.extend(right_keep.iter().map(|&i| r.values()[i].clone()));
    Row::synthesized(values)
}

/// `View.join(other, on, left_outer, right_outer)` (§4.8). `on` pairs
/// `(left_column, right_column)`; an empty slice means a cross join.
pub fn join(
    left: &ViewRef,
    right: &ViewRef,
    on: &[(&str, &str)],
    left_outer: bool,
    right_outer: bool,
) -> Result<ViewRef> {
    let (left_columns, left_is_bool, gateway, left_query) = {
        let p = left.borrow();
        (p.columns.clone(), p.is_bool.clone(), p.gateway.clone(), p.query.clone())
    };
    let (right_columns, right_is_bool, right_query) = {
        let p = right.borrow();
        (p.columns.clone(), p.is_bool.clone(), p.query.clone())
    };

    let left_key_cols: Vec<usize> = on.iter().map(|(l, _)| column_index(&left_columns, l)).collect::<Result<_>>()?;
    let right_key_cols: Vec<usize> = on.iter().map(|(_, r)| column_index(&right_columns, r)).collect::<Result<_>>()?;

    let join_type = match (left_outer, right_outer) {
        (false, false) => JoinType::Inner,
        (true, false) => JoinType::LeftOuter,
        (false, true) => JoinType::RightOuter,
        (true, true) => JoinType::FullOuter,
    };

    let any_outer = left_outer || right_outer;
    let right_keep = right_keep_indices(right_columns.len(), &right_key_cols, any_outer);
    let columns = output_columns(&left_columns, &right_columns, &right_keep);
    let mut is_bool = left_is_bool;
    is_bool.extend(right_keep.iter().map(|&i| right_is_bool[i]));
    let left_len = left_columns.len();

    let left_on: Vec<String> = on.iter().map(|(l, _)| (*l).to_string()).collect();
    let right_on: Vec<String> = on.iter().map(|(_, r)| (*r).to_string()).collect();
    let equality = left_on
        .iter()
        .zip(right_on.iter())
        .map(|(l, r)| format!("L.{} = R.{}", crate::query::quote_ident(l), crate::query::quote_ident(r)))
        .collect::<Vec<_>>()
        .join(" AND ");
    let join_verb = match join_type {
        JoinType::Inner => "JOIN",
        JoinType::LeftOuter => "LEFT JOIN",
        JoinType::RightOuter => "RIGHT JOIN",
        JoinType::FullOuter => "FULL OUTER JOIN",
    };
    let query_sql = if on.is_empty() {
        format!("SELECT * FROM ({left_query}) AS L, ({right_query}) AS R")
    } else {
        format!("SELECT * FROM ({left_query}) AS L {join_verb} ({right_query}) AS R ON {equality}")
    };

    let state: Rc<RefCell<RowJoin>> = Rc::new(RefCell::new(IncrementalHashJoin::new(join_type)));
    let right_keep_len = right_keep.len();

    let view: ViewRef = Rc::new_cyclic(|weak: &Weak<RefCell<View>>| {
        let weak_for_left = weak.clone();
        let state_for_left = state.clone();
        let left_key_cols_for_left = left_key_cols.clone();
        let right_keep_for_left = right_keep.clone();
        let left_link = view::link_to_parent(left, move |delta: Delta<Row>| {
            let Some(view) = weak_for_left.upgrade() else { return };
            let merge = |l: &Row, r: &Row| merge_rows(l, r, &right_keep_for_left);
            let pad_right = |l: &Row| pad_right_row(l, right_keep_len);
            let pad_left = |r: &Row| pad_left_row(left_len, r, &right_keep_for_left);
            let key_of = |r: &Row| left_key_cols_for_left.iter().map(|&i| r.values()[i].clone()).collect::<Vec<_>>();
            let mut out = Vec::new();
            match delta {
                Delta::Insert(row) => {
                    let key = key_of(&row);
                    out.extend(state_for_left.borrow_mut().on_left_insert(key, row, merge, pad_right));
                }
                Delta::Delete(row) => {
                    let key = key_of(&row);
                    out.extend(state_for_left.borrow_mut().on_left_delete(&key, &row, row_values_eq, merge, pad_right, pad_left));
                }
                Delta::Update { old, new } => {
                    let old_key = key_of(&old);
                    out.extend(state_for_left.borrow_mut().on_left_delete(&old_key, &old, row_values_eq, merge, pad_right, pad_left));
                    let new_key = key_of(&new);
                    out.extend(state_for_left.borrow_mut().on_left_insert(new_key, new, merge, pad_right));
                }
                Delta::Reset => out.push(Delta::Reset),
            }
            view::emit_all(&view, out);
        });

        let weak_for_right = weak.clone();
        let state_for_right = state.clone();
        let right_key_cols_for_right = right_key_cols.clone();
        let right_keep_for_right = right_keep.clone();
        let right_link = view::link_to_parent(right, move |delta: Delta<Row>| {
            let Some(view) = weak_for_right.upgrade() else { return };
            let merge = |l: &Row, r: &Row| merge_rows(l, r, &right_keep_for_right);
            let pad_right = |l: &Row| pad_right_row(l, right_keep_len);
            let pad_left = |r: &Row| pad_left_row(left_len, r, &right_keep_for_right);
            let key_of = |r: &Row| right_key_cols_for_right.iter().map(|&i| r.values()[i].clone()).collect::<Vec<_>>();
            let mut out = Vec::new();
            match delta {
                Delta::Insert(row) => {
                    let key = key_of(&row);
                    out.extend(state_for_right.borrow_mut().on_right_insert(key, row, merge, pad_left, pad_right));
                }
                Delta::Delete(row) => {
                    let key = key_of(&row);
                    out.extend(state_for_right.borrow_mut().on_right_delete(&key, &row, row_values_eq, merge, pad_left, pad_right));
                }
                Delta::Update { old, new } => {
                    let old_key = key_of(&old);
                    out.extend(state_for_right.borrow_mut().on_right_delete(&old_key, &old, row_values_eq, merge, pad_left, pad_right));
                    let new_key = key_of(&new);
                    out.extend(state_for_right.borrow_mut().on_right_insert(new_key, new, merge, pad_left, pad_right));
                }
                Delta::Reset => out.push(Delta::Reset),
            }
            view::emit_all(&view, out);
        });

        RefCell::new(View {
            id: view::next_view_id(),
            columns,
            is_bool,
            query: query_sql,
            gateway,
            base_weak: Some(weak.clone()),
            listeners: ViewListeners::new(),
            kind: ViewKind::Join(JoinViewState { left_link, right_link }),
        })
    });

    Ok(view)
}
