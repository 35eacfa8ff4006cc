//! `Sort` (§4.10): an ordered, optionally windowed (`offset`, `limit`)
//! view over a parent. Positional: listeners need to know not just that
//! a row appeared but where, so a `Sort` emits its own position-aware
//! events alongside the plain ones every other operator emits (a
//! `Filter`/`Project` stacked on a `Sort` keeps working without knowing
//! about positions at all).
//!
//! Rows are keyed by their full value tuple (like `Distinct`/`Union`) —
//! two value-equal rows are interchangeable for ordering purposes, so
//! which one a delete removes doesn't matter.

use std::cell::{Cell, RefCell};
use std::cmp::Ordering;
use std::rc::{Rc, Weak};

use rsql_core::{Error, Result, Row, Value};
use rsql_ivm::{Delta, IndexedDelta, SortState};
use rsql_reactive::listeners::{ListenerList, Subscription};
use rsql_reactive::{ParentLink, ViewListeners, ViewSubscription};

use crate::query;
use crate::view::{self, View, ViewKind, ViewRef};

/// The key `SortState` uses to locate a row again on delete: its full
/// value tuple, not its `mirrors_id` — value-equal rows are
/// interchangeable for ordering.
pub type SortKey = Vec<Value>;

/// `(column, descending)` pairs, applied in order as tiebreakers.
pub type SortOrder = Vec<(String, bool)>;

/// Position-aware counterpart to [`rsql_reactive::ViewListeners`],
/// carrying the window-relative index a `Sort`'s listener needs to
/// patch a list at the right spot.
pub struct IndexedViewListeners {
    pub on_insert: ListenerList<(Row, usize)>,
    pub on_delete: ListenerList<(Row, usize)>,
    pub on_update: ListenerList<(Row, Row, usize)>,
    pub on_reset: ListenerList<()>,
}

impl IndexedViewListeners {
    pub fn new() -> Self {
        Self { on_insert: ListenerList::new(), on_delete: ListenerList::new(), on_update: ListenerList::new(), on_reset: ListenerList::new() }
    }

    pub fn dispatch(&mut self, indexed: &IndexedDelta<Row>) {
        match &indexed.delta {
            Delta::Insert(row) => self.on_insert.notify(&(row.clone(), indexed.position)),
            Delta::Delete(row) => self.on_delete.notify(&(row.clone(), indexed.position)),
            Delta::Update { old, new } => self.on_update.notify(&(old.clone(), new.clone(), indexed.position)),
            Delta::Reset => self.on_reset.notify(&()),
        }
    }
}

impl Default for IndexedViewListeners {
    fn default() -> Self {
        Self::new()
    }
}

pub struct SortViewState {
    #[allow(dead_code)]
    parent_link: ParentLink<View, ViewSubscription>,
    state: Rc<RefCell<SortState<SortKey, Row>>>,
    indexed_listeners: Rc<RefCell<IndexedViewListeners>>,
    parent_columns: Vec<String>,
    parent_query: String,
    offset: Cell<usize>,
    limit: Cell<Option<usize>>,
}

fn column_index(columns: &[String], name: &str) -> Result<usize> {
    columns.iter().position(|c| c == name).ok_or_else(|| Error::usage(format!("sort: unknown column {name}")))
}

fn resolve_order_by(columns: &[String], order_by: &SortOrder) -> Result<Vec<(usize, bool)>> {
    order_by.iter().map(|(name, desc)| column_index(columns, name).map(|i| (i, *desc))).collect()
}

/// NULL-low ascending / NULL-high descending follows directly from
/// `Value`'s `Ord` (NULL lowest): a `DESC` column just reverses the
/// comparison wholesale, carrying NULL to the high end with it.
fn build_comparator(resolved: Vec<(usize, bool)>) -> impl Fn(&Row, &Row) -> Ordering + 'static {
    move |a, b| {
        for &(col, desc) in &resolved {
            let av = a.get(col).cloned().unwrap_or(Value::Null);
            let bv = b.get(col).cloned().unwrap_or(Value::Null);
            let ord = if desc { bv.cmp(&av) } else { av.cmp(&bv) };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    }
}

fn key_of(row: &Row) -> SortKey {
    row.values().to_vec()
}

fn dispatch_indexed(view: &ViewRef, indexed_listeners: &Rc<RefCell<IndexedViewListeners>>, out: Vec<IndexedDelta<Row>>) {
    for indexed in out {
        view::emit(view, indexed.delta.clone());
        indexed_listeners.borrow_mut().dispatch(&indexed);
    }
}

/// `View.sort(order_by, limit, offset)` (§4.10).
pub fn sort(parent: &ViewRef, order_by: &SortOrder, limit: Option<usize>, offset: usize) -> Result<ViewRef> {
    if order_by.is_empty() {
        return Err(Error::usage("sort: order_by must name at least one column"));
    }
    let (columns, is_bool, gateway, parent_query) = {
        let p = parent.borrow();
        (p.columns.clone(), p.is_bool.clone(), p.gateway.clone(), p.query.clone())
    };
    let resolved = resolve_order_by(&columns, order_by)?;
    let comparator = build_comparator(resolved);
    let query_sql = query::sorted(&parent_query, order_by, limit, offset);

    let state = Rc::new(RefCell::new(SortState::new(comparator, key_of, offset, limit)));
    let indexed_listeners = Rc::new(RefCell::new(IndexedViewListeners::new()));

    let view: ViewRef = Rc::new_cyclic(|weak: &Weak<RefCell<View>>| {
        let weak_for_closure = weak.clone();
        let state_for_closure = state.clone();
        let indexed_for_closure = indexed_listeners.clone();
        let parent_link = view::link_to_parent(parent, move |delta: Delta<Row>| {
            if let Some(view) = weak_for_closure.upgrade() {
                let out = state_for_closure.borrow_mut().apply(delta);
                dispatch_indexed(&view, &indexed_for_closure, out);
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
            kind: ViewKind::Sort(SortViewState {
                parent_link,
                state,
                indexed_listeners,
                parent_columns: columns_of(parent),
                parent_query,
                offset: Cell::new(offset),
                limit: Cell::new(limit),
            }),
        })
    });

    Ok(view)
}

fn columns_of(view: &ViewRef) -> Vec<String> {
    view.borrow().columns.clone()
}

/// Grows or shrinks the window's limit (§4.10 `set_limit`).
pub fn set_limit(view: &ViewRef, limit: Option<usize>) -> Result<()> {
    let (state, indexed_listeners) = match &view.borrow().kind {
        ViewKind::Sort(s) => {
            s.limit.set(limit);
            (s.state.clone(), s.indexed_listeners.clone())
        }
        _ => return Err(Error::usage("set_limit: view is not a Sort view")),
    };
    let out = state.borrow_mut().set_limit(limit);
    dispatch_indexed(view, &indexed_listeners, out);
    Ok(())
}

/// Moves the window's start, re-reading it wholesale (§4.10 `set_offset`).
pub fn set_offset(view: &ViewRef, offset: usize) -> Result<()> {
    let (state, indexed_listeners) = match &view.borrow().kind {
        ViewKind::Sort(s) => {
            s.offset.set(offset);
            (s.state.clone(), s.indexed_listeners.clone())
        }
        _ => return Err(Error::usage("set_offset: view is not a Sort view")),
    };
    let out = state.borrow_mut().set_offset(offset);
    dispatch_indexed(view, &indexed_listeners, out);
    Ok(())
}

/// Replaces the comparator entirely, rebuilding the sort state from a
/// fresh read of the parent (§4.10 `set_order_by`) — a comparator swap
/// reorders every row, so there's no cheaper incremental path than a
/// full re-read followed by a `Reset`.
pub fn set_order_by(view: &ViewRef, order_by: &SortOrder) -> Result<()> {
    if order_by.is_empty() {
        return Err(Error::usage("sort: order_by must name at least one column"));
    }
    let (gateway, parent_query, parent_columns, offset, limit, state, indexed_listeners) = {
        let v = view.borrow();
        match &v.kind {
            ViewKind::Sort(s) => (
                v.gateway.clone(),
                s.parent_query.clone(),
                s.parent_columns.clone(),
                s.offset.get(),
                s.limit.get(),
                s.state.clone(),
                s.indexed_listeners.clone(),
            ),
            _ => return Err(Error::usage("set_order_by: view is not a Sort view")),
        }
    };

    let resolved = resolve_order_by(&parent_columns, order_by)?;
    let comparator = build_comparator(resolved);
    let mut new_state = SortState::new(comparator, key_of, offset, limit);

    let raw_rows = gateway.fetchall(&format!("SELECT * FROM ({parent_query})"), &[])?;
    let hydrated: Vec<Row> = {
        let v = view.borrow();
        raw_rows.into_iter().map(|values| super::hydrate(&v, values, None)).collect()
    };
    for row in hydrated {
        new_state.apply(Delta::Insert(row));
    }

    let query_sql = query::sorted(&parent_query, order_by, limit, offset);
    *state.borrow_mut() = new_state;
    view.borrow_mut().query = query_sql;

    view::emit(view, Delta::Reset);
    indexed_listeners.borrow_mut().dispatch(&IndexedDelta::new(Delta::Reset, 0));
    Ok(())
}

/// Subscribes to position-aware insert events; errors if `view` isn't
/// a `Sort` view.
pub fn on_insert(view: &ViewRef, f: impl FnMut(&(Row, usize)) + 'static) -> Result<Subscription> {
    match &view.borrow().kind {
        ViewKind::Sort(s) => Ok(s.indexed_listeners.borrow_mut().on_insert.subscribe(f)),
        _ => Err(Error::usage("view is not a Sort view")),
    }
}

pub fn on_delete(view: &ViewRef, f: impl FnMut(&(Row, usize)) + 'static) -> Result<Subscription> {
    match &view.borrow().kind {
        ViewKind::Sort(s) => Ok(s.indexed_listeners.borrow_mut().on_delete.subscribe(f)),
        _ => Err(Error::usage("view is not a Sort view")),
    }
}

pub fn on_update(view: &ViewRef, f: impl FnMut(&(Row, Row, usize)) + 'static) -> Result<Subscription> {
    match &view.borrow().kind {
        ViewKind::Sort(s) => Ok(s.indexed_listeners.borrow_mut().on_update.subscribe(f)),
        _ => Err(Error::usage("view is not a Sort view")),
    }
}

pub fn on_reset(view: &ViewRef, f: impl FnMut(&()) + 'static) -> Result<Subscription> {
    match &view.borrow().kind {
        ViewKind::Sort(s) => Ok(s.indexed_listeners.borrow_mut().on_reset.subscribe(f)),
        _ => Err(Error::usage("view is not a Sort view")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rsql_core::schema::TableBuilder;
    use rsql_core::DataType;
    use rsql_gateway::GatewayConfig;

    fn scores_table() -> rsql_core::schema::Table {
        TableBuilder::new("scores")
            .unwrap()
            .add_column("id", DataType::Integer)
            .unwrap()
            .add_column("label", DataType::Text)
            .unwrap()
            .add_primary_key("id")
            .unwrap()
            .build()
            .unwrap()
    }

    fn order() -> SortOrder {
        vec![("label".to_string(), false)]
    }

    #[test]
    fn test_sort_inserts_into_limited_window_and_evicts_tail() {
        let gateway = Rc::new(StoreGateway::open_in_memory(GatewayConfig::in_memory()).unwrap());
        let base = crate::view::base_table::open(&gateway, scores_table()).unwrap();
        let ordered = sort(&base, &order(), Some(3), 0).unwrap();

        let inserts = Rc::new(RefCell::new(Vec::new()));
        let inserts_clone = inserts.clone();
        on_insert(&ordered, move |(row, pos)| inserts_clone.borrow_mut().push((row.clone(), *pos))).unwrap();
        let deletes = Rc::new(RefCell::new(Vec::new()));
        let deletes_clone = deletes.clone();
        on_delete(&ordered, move |(row, pos)| deletes_clone.borrow_mut().push((row.clone(), *pos))).unwrap();

        if let ViewKind::Base(s) = &base.borrow().kind {
            s.insert(&[Value::Integer(1), Value::Text("a".into())]).unwrap();
            s.insert(&[Value::Integer(2), Value::Text("c".into())]).unwrap();
            s.insert(&[Value::Integer(3), Value::Text("e".into())]).unwrap();
            s.insert(&[Value::Integer(4), Value::Text("b".into())]).unwrap();
        }

        assert_eq!(inserts.borrow().last().unwrap().1, 1);
        assert_eq!(deletes.borrow().len(), 1);
        assert_eq!(deletes.borrow()[0].1, 3);
    }

    #[test]
    fn test_set_limit_grows_window_and_emits_new_rows() {
        let gateway = Rc::new(StoreGateway::open_in_memory(GatewayConfig::in_memory()).unwrap());
        let base = crate::view::base_table::open(&gateway, scores_table()).unwrap();
        let ordered = sort(&base, &order(), Some(1), 0).unwrap();

        if let ViewKind::Base(s) = &base.borrow().kind {
            s.insert(&[Value::Integer(1), Value::Text("a".into())]).unwrap();
            s.insert(&[Value::Integer(2), Value::Text("b".into())]).unwrap();
        }

        let inserts = Rc::new(RefCell::new(Vec::new()));
        let inserts_clone = inserts.clone();
        on_insert(&ordered, move |(row, pos)| inserts_clone.borrow_mut().push((row.clone(), *pos))).unwrap();

        set_limit(&ordered, Some(2)).unwrap();

        assert_eq!(inserts.borrow().len(), 1);
        assert_eq!(inserts.borrow()[0].1, 1);
    }
}
