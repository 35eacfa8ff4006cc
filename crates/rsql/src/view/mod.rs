//! The view DAG (§3, §4, §9 "Polymorphism over view variants").
//!
//! A [`View`] is a tagged-variant node: one shared header (`columns`,
//! `is_bool`, `query`, the four listener channels) plus a `ViewKind`
//! holding whatever state that particular operator needs. Every
//! concrete operator lives in its own submodule and is constructed by a
//! free function taking the parent(s) as `&ViewRef` — `View` itself
//! never constructs an `Rc` around itself, so these functions use
//! `Rc::new_cyclic` to hand a view its own weak self-reference before
//! wiring up the parent subscription that will call back into it.
//!
//! Adding a new operator means a new `ViewKind` variant and a new
//! submodule; nothing here needs to change besides the dispatch tables
//! in [`View::columns_of`]-adjacent helpers that are genuinely
//! variant-specific (there are none yet that don't delegate to common
//! fields).

pub mod base_table;
pub mod distinct;
pub mod filter;
pub mod group_by;
pub mod join;
pub mod project;
pub mod sort;
pub mod union;

use std::cell::RefCell;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU32, Ordering};

use rsql_core::{DataType, Error, Result, Row, Value};
use rsql_gateway::StoreGateway;
use rsql_reactive::{
    listeners::Subscription,
    Delta, ParentLink, Unregisterable, ViewListeners, ViewSubscription,
};

use crate::row::RowHandle;

pub use group_by::{avg, count, max, min, sum, AggregateDef, AggregateFn};
pub use sort::{IndexedViewListeners, SortKey, SortOrder};

/// A live node in the view DAG. Always held behind `Rc<RefCell<_>>`;
/// see [`ViewRef`].
pub struct View {
    pub(crate) id: u32,
    pub columns: Vec<String>,
    pub is_bool: Vec<bool>,
    pub query: String,
    pub(crate) gateway: Rc<StoreGateway>,
    /// This view's own weak self-reference, handed out by
    /// `Rc::new_cyclic` at construction time so the view's maintenance
    /// closures can upgrade back to themselves.
    pub(crate) base_weak: Option<Weak<RefCell<View>>>,
    pub(crate) listeners: ViewListeners<Row>,
    pub(crate) kind: ViewKind,
}

/// Shared reference to a view node. Child views hold a [`ParentLink`]
/// (weak) to their parent's `ViewRef`; callers and the `rsql` public
/// API hold strong `ViewRef`s for as long as they care about the view.
pub type ViewRef = Rc<RefCell<View>>;

static NEXT_VIEW_ID: AtomicU32 = AtomicU32::new(1);

pub(crate) fn next_view_id() -> u32 {
    NEXT_VIEW_ID.fetch_add(1, Ordering::SeqCst)
}

/// Tagged operator variant (§9 "Polymorphism over view variants").
pub(crate) enum ViewKind {
    Base(base_table::BaseTableState),
    Filter(filter::FilterState),
    Project(project::ProjectState),
    Distinct(distinct::DistinctViewState),
    Union(union::UnionViewState),
    UnionAll(union::UnionAllViewState),
    Join(join::JoinViewState),
    GroupBy(group_by::GroupByState),
    Sort(sort::SortViewState),
}

impl ViewKind {
    fn kind_name(&self) -> &'static str {
        match self {
            ViewKind::Base(_) => "BaseTable",
            ViewKind::Filter(_) => "Filter",
            ViewKind::Project(_) => "Project",
            ViewKind::Distinct(_) => "Distinct",
            ViewKind::Union(_) => "Union",
            ViewKind::UnionAll(_) => "UnionAll",
            ViewKind::Join(_) => "Join",
            ViewKind::GroupBy(_) => "GroupBy",
            ViewKind::Sort(_) => "Sort",
        }
    }
}

/// A child view's subscription to its parent unregisters all four
/// channels together on drop (§9 "ownership problem").
impl Unregisterable<ViewSubscription> for View {
    fn unregister(&mut self, id: ViewSubscription) {
        self.listeners.on_insert.unsubscribe(id.insert);
        self.listeners.on_delete.unsubscribe(id.delete);
        self.listeners.on_update.unsubscribe(id.update);
        self.listeners.on_reset.unsubscribe(id.reset);
    }
}

/// Subscribes `on_delta` to every channel of `parent`, returning a
/// [`ParentLink`] that tears the subscription down when dropped. The
/// four channels funnel into one `FnMut(Delta<Row>)` so every operator
/// implements one `apply` method regardless of which channel fired.
pub(crate) fn link_to_parent(
    parent: &ViewRef,
    on_delta: impl FnMut(Delta<Row>) + 'static,
) -> ParentLink<View, ViewSubscription> {
    let shared = Rc::new(RefCell::new(on_delta));
    let (c1, c2, c3, c4) = (shared.clone(), shared.clone(), shared.clone(), shared.clone());

    let mut p = parent.borrow_mut();
    let insert = p.listeners.on_insert.subscribe(move |row: &Row| (c1.borrow_mut())(Delta::Insert(row.clone())));
    let delete = p.listeners.on_delete.subscribe(move |row: &Row| (c2.borrow_mut())(Delta::Delete(row.clone())));
    let update = p
        .listeners
        .on_update
        .subscribe(move |(old, new): &(Row, Row)| (c3.borrow_mut())(Delta::Update { old: old.clone(), new: new.clone() }));
    let reset = p.listeners.on_reset.subscribe(move |_: &()| (c4.borrow_mut())(Delta::Reset));
    drop(p);

    ParentLink::new(Rc::downgrade(parent), ViewSubscription { insert, delete, update, reset })
}

/// Dispatches one delta to `view`'s own listeners, and — if `view` is a
/// `Sort` — the corresponding position-aware event to its indexed
/// listeners too (a `Sort`'s plain channels carry the same payload
/// minus position, so a `Filter`/`Project` stacked on top of a `Sort`
/// still works without knowing about indices at all).
pub(crate) fn emit(view: &ViewRef, delta: Delta<Row>) {
    view.borrow_mut().listeners.dispatch(&delta);
}

pub(crate) fn emit_all(view: &ViewRef, deltas: impl IntoIterator<Item = Delta<Row>>) {
    for d in deltas {
        emit(view, d);
    }
}

/// Hydrates a raw engine row (read back via a plain SQL query, e.g. a
/// `reset`/`fetchall`) into a `Row` with declared-boolean columns
/// coerced, and no mirrored base-table identity (it wasn't captured
/// from a mutation, so there's no single originating row to point at —
/// `RowHandle::update`/`delete` on a freshly-read row requires the
/// view's chain to have a usable `mirrors_id` captured through deltas,
/// not through plain reads, matching the BaseTable capture path that
/// actually knows the id).
fn hydrate(view: &View, mut values: Vec<Value>, mirrors_id: Option<u64>) -> Row {
    for (v, &is_bool) in values.iter_mut().zip(view.is_bool.iter()) {
        if is_bool {
            *v = core::mem::replace(v, Value::Null).coerce_to(DataType::Boolean);
        }
    }
    match mirrors_id {
        Some(id) => Row::new(id, values),
        None => Row::synthesized(values),
    }
}

impl View {
    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn kind_name(&self) -> &'static str {
        self.kind.kind_name()
    }

    fn mirrors_id_column_index(&self) -> Option<usize> {
        match &self.kind {
            ViewKind::Base(s) => Some(s.pk_index()),
            _ => None,
        }
    }
}

/// `View.fetchall()` (§6): a full, non-incremental read of the view's
/// current contents.
pub fn fetchall(view: &ViewRef) -> Result<Vec<RowHandle>> {
    let (sql, gateway) = {
        let v = view.borrow();
        (format!("SELECT * FROM ({})", v.query), v.gateway.clone())
    };
    let raw = gateway.fetchall(&sql, &[])?;
    let v = view.borrow();
    let pk_col = v.mirrors_id_column_index();
    Ok(raw
        .into_iter()
        .map(|values| {
            let mirrors_id = pk_col.and_then(|i| values.get(i)).and_then(|val| val.as_i64()).map(|i| i as u64);
            RowHandle::new(hydrate(&v, values, mirrors_id), view)
        })
        .collect())
}

/// `View.fetchone(equalities)` (§6, §1.2): the first row matching a
/// conjunctive equality predicate, NULL-safe.
pub fn fetchone(view: &ViewRef, equalities: &[(&str, Value)]) -> Result<Option<RowHandle>> {
    let (sql, params, gateway) = {
        let v = view.borrow();
        let columns: Vec<&str> = equalities.iter().map(|(c, _)| *c).collect();
        let values: Vec<Value> = equalities.iter().map(|(_, val)| val.clone()).collect();
        let predicate = if columns.is_empty() { "1".to_string() } else { rsql_gateway::where_builder::equality_predicate(&columns, &values).0 };
        let sql = format!("SELECT * FROM ({}) WHERE {predicate} LIMIT 1", v.query);
        (sql, values, v.gateway.clone())
    };
    let row = gateway.fetchone(&sql, &params)?;
    let v = view.borrow();
    let pk_col = v.mirrors_id_column_index();
    Ok(row.map(|values| {
        let mirrors_id = pk_col.and_then(|i| values.get(i)).and_then(|val| val.as_i64()).map(|i| i as u64);
        RowHandle::new(hydrate(&v, values, mirrors_id), view)
    }))
}

/// Re-enters through the owning `BaseTable` to apply an UPDATE keyed by
/// a mirrored row id — used by [`RowHandle::update`].
pub(crate) fn update_mirrored_row(view: &ViewRef, mirrors_id: u64, values: &[(&str, Value)]) -> Result<()> {
    let base = find_owning_base(view).ok_or_else(|| Error::usage("no BaseTable found along this row's view chain"))?;
    let b = base.borrow();
    match &b.kind {
        ViewKind::Base(state) => state.update_by_id(mirrors_id, values),
        _ => unreachable!(),
    }
}

/// Re-enters through the owning `BaseTable` to delete a mirrored row —
/// used by [`RowHandle::delete`].
pub(crate) fn delete_mirrored_row(view: &ViewRef, mirrors_id: u64) -> Result<()> {
    let base = find_owning_base(view).ok_or_else(|| Error::usage("no BaseTable found along this row's view chain"))?;
    let b = base.borrow();
    match &b.kind {
        ViewKind::Base(state) => state.delete_by_id(mirrors_id),
        _ => unreachable!(),
    }
}

/// `BaseTable.insert(cols)` (§6). Fails with `UsageError` if `view` is
/// not itself a `BaseTable` — unlike `update`/`delete`, insert has no
/// row to re-enter through, so it cannot be aimed at a derived view.
pub fn insert(view: &ViewRef, values: &[Value]) -> Result<()> {
    match &view.borrow().kind {
        ViewKind::Base(state) => state.insert(values),
        _ => Err(Error::usage("insert is only valid on a BaseTable view")),
    }
}

/// `BaseTable.update(where, cols)` (§6).
pub fn update_where(view: &ViewRef, where_cols: &[&str], where_vals: &[Value], set: &[(&str, Value)]) -> Result<()> {
    match &view.borrow().kind {
        ViewKind::Base(state) => state.update_where(where_cols, where_vals, set),
        _ => Err(Error::usage("update is only valid on a BaseTable view")),
    }
}

/// `BaseTable.delete(where)` (§6).
pub fn delete_where(view: &ViewRef, where_cols: &[&str], where_vals: &[Value]) -> Result<()> {
    match &view.borrow().kind {
        ViewKind::Base(state) => state.delete_where(where_cols, where_vals),
        _ => Err(Error::usage("delete is only valid on a BaseTable view")),
    }
}

/// Walks a single-parent chain up to the owning `BaseTable`. Only
/// `Filter`/`Project`/`Distinct` preserve a single parent and
/// `mirrors_id`; any other operator on the chain means the row's
/// `mirrors_id` could not have survived down to this view in the first
/// place (see `Row`'s docs), so this is only ever called after a
/// `RowHandle` already confirmed `mirrors_id.is_some()`.
fn find_owning_base(view: &ViewRef) -> Option<ViewRef> {
    let parent = {
        let v = view.borrow();
        match &v.kind {
            ViewKind::Base(_) => return Some(view.clone()),
            ViewKind::Filter(s) => s.parent(),
            ViewKind::Project(s) => s.parent(),
            ViewKind::Distinct(s) => s.parent(),
            _ => None,
        }
    }?;
    find_owning_base(&parent)
}

/// `View.on_insert(callback) -> unsubscribe_token` (§6).
pub fn on_insert(view: &ViewRef, f: impl FnMut(&Row) + 'static) -> Subscription {
    view.borrow_mut().listeners.on_insert.subscribe(f)
}

pub fn on_delete(view: &ViewRef, f: impl FnMut(&Row) + 'static) -> Subscription {
    view.borrow_mut().listeners.on_delete.subscribe(f)
}

pub fn on_update(view: &ViewRef, f: impl FnMut(&(Row, Row)) + 'static) -> Subscription {
    view.borrow_mut().listeners.on_update.subscribe(f)
}

pub fn on_reset(view: &ViewRef, f: impl FnMut(&()) + 'static) -> Subscription {
    view.borrow_mut().listeners.on_reset.subscribe(f)
}

pub fn unsubscribe_insert(view: &ViewRef, sub: Subscription) -> bool {
    view.borrow_mut().listeners.on_insert.unsubscribe(sub)
}

pub fn unsubscribe_delete(view: &ViewRef, sub: Subscription) -> bool {
    view.borrow_mut().listeners.on_delete.unsubscribe(sub)
}

pub fn unsubscribe_update(view: &ViewRef, sub: Subscription) -> bool {
    view.borrow_mut().listeners.on_update.unsubscribe(sub)
}

pub fn unsubscribe_reset(view: &ViewRef, sub: Subscription) -> bool {
    view.borrow_mut().listeners.on_reset.unsubscribe(sub)
}

// Re-exported operator constructors, kept as free functions (rather
// than inherent methods on `ViewRef`, which Rust's orphan rules don't
// allow on a foreign `Rc<RefCell<_>>`) so call sites read like the
// method-chaining surface in §6: `view::where_(&t, ...)`,
// `view::select(&filtered, ...)`, and so on.
pub use distinct::distinct;
pub use filter::{set_filter, where_};
pub use group_by::group_by;
pub use join::join;
pub use project::select;
pub use sort::sort;
pub use union::{union, union_all};
pub use crate::scalar::only;
