//! `GroupBy` (§4.9): groups a parent's rows by a key and maintains one
//! or more aggregates per group.
//!
//! COUNT, SUM and AVG update in O(1) per delta (`rsql_ivm`'s trackers
//! handle `Update` directly, so a within-group update never needs to
//! touch every tracker separately from an insert/delete). MIN/MAX are
//! the exception: deleting (or updating away) the current extremum
//! leaves the tracker unable to say what the new one is, so it raises
//! `needs_recompute` and this module re-queries the source through the
//! gateway for just that group.
//!
//! The empty-group-key case (no `group_cols`) is a permanent singleton:
//! unlike every other group, it exists before any row has ever arrived
//! and is never removed, so `fetchone()` sees `{count: 0, rest: null}`
//! rather than no row at all (§4.9 edge case).

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use rsql_core::{Error, Result, Row, Value};
use rsql_ivm::{
    Delta, IncrementalAvg, IncrementalCount, IncrementalMax, IncrementalMin, IncrementalSum,
};
use rsql_reactive::{ParentLink, ViewListeners, ViewSubscription};

use crate::query;
use crate::scalar::ColumnValue;
use crate::view::{self, View, ViewKind, ViewRef};

/// One aggregate function applied to a column (`Count` ignores it —
/// it behaves as `COUNT(*)`, matching how `_count` is auto-added).
#[derive(Clone, Debug)]
pub enum AggregateFn {
    Count,
    Sum(String),
    Avg(String),
    Min(String),
    Max(String),
}

#[derive(Clone, Debug)]
pub struct AggregateDef {
    pub alias: String,
    pub func: AggregateFn,
}

#[derive(Clone)]
struct AggregateSpec {
    alias: String,
    func: AggregateFn,
    source_col: usize,
}

enum Tracker {
    Count(IncrementalCount),
    Sum(IncrementalSum),
    Avg(IncrementalAvg),
    Min(IncrementalMin),
    Max(IncrementalMax),
}

impl Tracker {
    fn new(func: &AggregateFn, source_col: usize) -> Self {
        match func {
            AggregateFn::Count => Tracker::Count(IncrementalCount::new()),
            AggregateFn::Sum(_) => Tracker::Sum(IncrementalSum::new(source_col)),
            AggregateFn::Avg(_) => Tracker::Avg(IncrementalAvg::new(source_col)),
            AggregateFn::Min(_) => Tracker::Min(IncrementalMin::new(source_col)),
            AggregateFn::Max(_) => Tracker::Max(IncrementalMax::new(source_col)),
        }
    }

    fn apply(&mut self, deltas: &[Delta<Row>]) {
        match self {
            Tracker::Count(t) => t.apply(deltas),
            Tracker::Sum(t) => t.apply(deltas),
            Tracker::Avg(t) => t.apply(deltas),
            Tracker::Min(t) => t.apply(deltas),
            Tracker::Max(t) => t.apply(deltas),
        }
    }

    fn value(&self) -> Value {
        match self {
            Tracker::Count(t) => Value::Integer(t.get()),
            Tracker::Sum(t) => Value::Real(t.get()),
            Tracker::Avg(t) => t.get().map(Value::Real).unwrap_or(Value::Null),
            Tracker::Min(t) => t.get().cloned().unwrap_or(Value::Null),
            Tracker::Max(t) => t.get().cloned().unwrap_or(Value::Null),
        }
    }

    fn count(&self) -> Option<i64> {
        match self {
            Tracker::Count(t) => Some(t.get()),
            _ => None,
        }
    }

    fn needs_recompute(&self) -> bool {
        match self {
            Tracker::Min(t) => t.needs_recompute(),
            Tracker::Max(t) => t.needs_recompute(),
            _ => false,
        }
    }

    fn recompute(&mut self, value: Option<Value>) {
        match self {
            Tracker::Min(t) => t.recompute(value.into_iter()),
            Tracker::Max(t) => t.recompute(value.into_iter()),
            _ => {}
        }
    }

    fn reset(&mut self) {
        match self {
            Tracker::Count(t) => t.reset(),
            Tracker::Sum(t) => t.reset(),
            Tracker::Avg(t) => t.reset(),
            Tracker::Min(t) => t.reset(),
            Tracker::Max(t) => t.reset(),
        }
    }
}

type Groups = HashMap<Vec<Value>, Vec<Tracker>>;

pub struct GroupByState {
    parent_link: ParentLink<View, ViewSubscription>,
    groups: Rc<RefCell<Groups>>,
}

impl GroupByState {
    #[allow(dead_code)]
    pub(crate) fn group_count(&self) -> usize {
        self.groups.borrow().len()
    }
}

fn column_index(columns: &[String], name: &str) -> Result<usize> {
    columns.iter().position(|c| c == name).ok_or_else(|| Error::usage(format!("group_by: unknown column {name}")))
}

fn agg_sql_expr(spec: &AggregateSpec) -> String {
    match &spec.func {
        AggregateFn::Count => "COUNT(*)".to_string(),
        AggregateFn::Sum(c) => format!("SUM({})", query::quote_ident(c)),
        AggregateFn::Avg(c) => format!("AVG({})", query::quote_ident(c)),
        AggregateFn::Min(c) => format!("MIN({})", query::quote_ident(c)),
        AggregateFn::Max(c) => format!("MAX({})", query::quote_ident(c)),
    }
}

fn key_of(row: &Row, group_cols: &[usize]) -> Vec<Value> {
    group_cols.iter().map(|&i| row.get(i).cloned().unwrap_or(Value::Null)).collect()
}

fn zero_trackers(specs: &[AggregateSpec]) -> Vec<Tracker> {
    specs.iter().map(|s| Tracker::new(&s.func, s.source_col)).collect()
}

fn build_row(key: &[Value], trackers: &[Tracker]) -> Row {
    let mut values = key.to_vec();
    values.extend(trackers.iter().map(Tracker::value));
    Row::synthesized(values)
}

/// Re-queries the source for any tracker that flagged
/// `needs_recompute` after losing its current extremum (§4.9).
fn recompute_if_needed(
    gateway: &rsql_gateway::StoreGateway,
    parent_query: &str,
    group_col_names: &[String],
    key: &[Value],
    specs: &[AggregateSpec],
    trackers: &mut [Tracker],
) -> Result<()> {
    for (spec, tracker) in specs.iter().zip(trackers.iter_mut()) {
        if !tracker.needs_recompute() {
            continue;
        }
        let (verb, column) = match &spec.func {
            AggregateFn::Min(c) => ("MIN", c),
            AggregateFn::Max(c) => ("MAX", c),
            _ => continue,
        };
        let predicate = if group_col_names.is_empty() { "1".to_string() } else { query::conjunctive_equals(group_col_names) };
        let sql = format!("SELECT {verb}({}) FROM ({parent_query}) WHERE {predicate}", query::quote_ident(column));
        let params: Vec<Value> = if group_col_names.is_empty() { Vec::new() } else { key.to_vec() };
        let row = gateway.fetchone(&sql, &params)?;
        let value = row.and_then(|mut r| if r.is_empty() { None } else { Some(r.remove(0)) });
        let value = value.filter(|v| !v.is_null());
        tracker.recompute(value);
    }
    Ok(())
}

fn apply_insert(groups: &mut Groups, group_cols: &[usize], specs: &[AggregateSpec], row: &Row) -> Delta<Row> {
    let key = key_of(row, group_cols);
    if let Some(trackers) = groups.get_mut(&key) {
        let old_row = build_row(&key, trackers);
        for t in trackers.iter_mut() {
            t.apply(&[Delta::Insert(row.clone())]);
        }
        let new_row = build_row(&key, trackers);
        Delta::Update { old: old_row, new: new_row }
    } else {
        let mut trackers = zero_trackers(specs);
        for t in trackers.iter_mut() {
            t.apply(&[Delta::Insert(row.clone())]);
        }
        let new_row = build_row(&key, &trackers);
        groups.insert(key, trackers);
        Delta::Insert(new_row)
    }
}

#[allow(clippy::too_many_arguments)]
fn apply_delete(
    groups: &mut Groups,
    group_cols: &[usize],
    specs: &[AggregateSpec],
    empty_key_preserved: bool,
    gateway: &rsql_gateway::StoreGateway,
    parent_query: &str,
    group_col_names: &[String],
    row: &Row,
) -> Result<Delta<Row>> {
    let key = key_of(row, group_cols);
    let trackers = groups.get_mut(&key).ok_or_else(|| Error::invariant_broken("group_by: delete for a group with no tracked rows"))?;
    let old_row = build_row(&key, trackers);
    for t in trackers.iter_mut() {
        t.apply(&[Delta::Delete(row.clone())]);
    }

    let count_now = trackers.iter().find_map(Tracker::count).unwrap_or(0);
    if count_now == 0 {
        if empty_key_preserved {
            for t in trackers.iter_mut() {
                t.reset();
            }
            let zero_row = build_row(&key, trackers);
            Ok(Delta::Update { old: old_row, new: zero_row })
        } else {
            groups.remove(&key);
            Ok(Delta::Delete(old_row))
        }
    } else {
        recompute_if_needed(gateway, parent_query, group_col_names, &key, specs, trackers)?;
        let new_row = build_row(&key, trackers);
        Ok(Delta::Update { old: old_row, new: new_row })
    }
}

#[allow(clippy::too_many_arguments)]
fn apply_update_same_group(
    groups: &mut Groups,
    group_cols: &[usize],
    specs: &[AggregateSpec],
    gateway: &rsql_gateway::StoreGateway,
    parent_query: &str,
    group_col_names: &[String],
    old: &Row,
    new: &Row,
) -> Result<Delta<Row>> {
    let key = key_of(old, group_cols);
    let trackers = groups.get_mut(&key).ok_or_else(|| Error::invariant_broken("group_by: update for a group with no tracked rows"))?;
    let old_row = build_row(&key, trackers);
    for t in trackers.iter_mut() {
        t.apply(&[Delta::Update { old: old.clone(), new: new.clone() }]);
    }
    recompute_if_needed(gateway, parent_query, group_col_names, &key, specs, trackers)?;
    let new_row = build_row(&key, trackers);
    Ok(Delta::Update { old: old_row, new: new_row })
}

#[allow(clippy::too_many_arguments)]
fn handle_delta(
    groups: &mut Groups,
    group_cols: &[usize],
    specs: &[AggregateSpec],
    empty_key: bool,
    gateway: &rsql_gateway::StoreGateway,
    parent_query: &str,
    group_col_names: &[String],
    delta: Delta<Row>,
) -> Result<Vec<Delta<Row>>> {
    Ok(match delta {
        Delta::Insert(row) => alloc_vec1(apply_insert(groups, group_cols, specs, &row)),
        Delta::Delete(row) => {
            alloc_vec1(apply_delete(groups, group_cols, specs, empty_key, gateway, parent_query, group_col_names, &row)?)
        }
        Delta::Update { old, new } => {
            let go = key_of(&old, group_cols);
            let gn = key_of(&new, group_cols);
            if go == gn {
                alloc_vec1(apply_update_same_group(groups, group_cols, specs, gateway, parent_query, group_col_names, &old, &new)?)
            } else {
                let deleted = apply_delete(groups, group_cols, specs, empty_key, gateway, parent_query, group_col_names, &old)?;
                let inserted = apply_insert(groups, group_cols, specs, &new);
                vec![deleted, inserted]
            }
        }
        Delta::Reset => {
            groups.clear();
            if empty_key {
                groups.insert(Vec::new(), zero_trackers(specs));
            }
            vec![Delta::Reset]
        }
    })
}

fn alloc_vec1(d: Delta<Row>) -> Vec<Delta<Row>> {
    vec![d]
}

/// `View.group_by(group_cols, aggregates)` (§4.9). Adds an automatic
/// `_count` aggregate if none of `aggregates` is already a `Count`.
pub fn group_by(parent: &ViewRef, group_cols: &[&str], aggregates: &[AggregateDef]) -> Result<ViewRef> {
    let (parent_columns, is_bool, gateway, parent_query) = {
        let p = parent.borrow();
        (p.columns.clone(), p.is_bool.clone(), p.gateway.clone(), p.query.clone())
    };

    let group_col_indices: Vec<usize> = group_cols.iter().map(|c| column_index(&parent_columns, c)).collect::<Result<_>>()?;
    let group_col_names: Vec<String> = group_cols.iter().map(|c| c.to_string()).collect();

    let mut specs: Vec<AggregateSpec> = Vec::new();
    for def in aggregates {
        let source_col = match &def.func {
            AggregateFn::Count => 0,
            AggregateFn::Sum(c) | AggregateFn::Avg(c) | AggregateFn::Min(c) | AggregateFn::Max(c) => column_index(&parent_columns, c)?,
        };
        specs.push(AggregateSpec { alias: def.alias.clone(), func: def.func.clone(), source_col });
    }
    if !specs.iter().any(|s| matches!(s.func, AggregateFn::Count)) {
        specs.push(AggregateSpec { alias: "_count".to_string(), func: AggregateFn::Count, source_col: 0 });
    }

    let columns: Vec<String> = group_col_names.iter().cloned().chain(specs.iter().map(|s| s.alias.clone())).collect();
    let mut out_is_bool: Vec<bool> = group_col_indices.iter().map(|&i| is_bool[i]).collect();
    out_is_bool.extend(specs.iter().map(|_| false));

    let mut select_list: Vec<String> = group_col_names.iter().map(|c| query::quote_ident(c)).collect();
    select_list.extend(specs.iter().map(|s| format!("{} AS {}", agg_sql_expr(s), query::quote_ident(&s.alias))));
    let mut query_sql = format!("SELECT {} FROM ({parent_query})", select_list.join(", "));
    if !group_col_names.is_empty() {
        query_sql.push_str(&format!(" GROUP BY {}", group_col_names.iter().map(|c| query::quote_ident(c)).collect::<Vec<_>>().join(", ")));
    }

    let empty_key = group_col_indices.is_empty();
    let mut initial_groups: Groups = HashMap::new();
    if empty_key {
        initial_groups.insert(Vec::new(), zero_trackers(&specs));
    }
    let groups = Rc::new(RefCell::new(initial_groups));

    let gateway_for_closure = gateway.clone();
    let parent_query_for_closure = parent_query.clone();
    let group_col_names_for_closure = group_col_names.clone();
    let group_col_indices_for_closure = group_col_indices.clone();
    let specs_for_closure = specs.clone();

    let view: ViewRef = Rc::new_cyclic(|weak: &Weak<RefCell<View>>| {
        let weak_for_closure = weak.clone();
        let groups_for_closure = groups.clone();
        let parent_link = view::link_to_parent(parent, move |delta: Delta<Row>| {
            if let Some(view) = weak_for_closure.upgrade() {
                let result = handle_delta(
                    &mut groups_for_closure.borrow_mut(),
                    &group_col_indices_for_closure,
                    &specs_for_closure,
                    empty_key,
                    &gateway_for_closure,
                    &parent_query_for_closure,
                    &group_col_names_for_closure,
                    delta,
                );
                match result {
                    Ok(out) => view::emit_all(&view, out),
                    Err(err) => tracing::warn!(%err, "group_by: failed to maintain aggregate state for a delta"),
                }
            }
        });

        RefCell::new(View {
            id: view::next_view_id(),
            columns,
            is_bool: out_is_bool,
            query: query_sql,
            gateway,
            base_weak: Some(weak.clone()),
            listeners: ViewListeners::new(),
            kind: ViewKind::GroupBy(GroupByState { parent_link, groups }),
        })
    });

    Ok(view)
}

/// `View.count()` (§6): a `ColumnValue` tracking the live row count.
pub fn count(parent: &ViewRef) -> Result<ColumnValue> {
    let gb = group_by(parent, &[], &[AggregateDef { alias: "_count".to_string(), func: AggregateFn::Count }])?;
    ColumnValue::new(&gb, "_count")
}

/// `View.sum(col)` (§6).
pub fn sum(parent: &ViewRef, column: &str) -> Result<ColumnValue> {
    let gb = group_by(parent, &[], &[AggregateDef { alias: "_sum".to_string(), func: AggregateFn::Sum(column.to_string()) }])?;
    ColumnValue::new(&gb, "_sum")
}

/// `View.avg(col)` (§6).
pub fn avg(parent: &ViewRef, column: &str) -> Result<ColumnValue> {
    let gb = group_by(parent, &[], &[AggregateDef { alias: "_avg".to_string(), func: AggregateFn::Avg(column.to_string()) }])?;
    ColumnValue::new(&gb, "_avg")
}

/// `View.min(col)` (§6).
pub fn min(parent: &ViewRef, column: &str) -> Result<ColumnValue> {
    let gb = group_by(parent, &[], &[AggregateDef { alias: "_min".to_string(), func: AggregateFn::Min(column.to_string()) }])?;
    ColumnValue::new(&gb, "_min")
}

/// `View.max(col)` (§6).
pub fn max(parent: &ViewRef, column: &str) -> Result<ColumnValue> {
    let gb = group_by(parent, &[], &[AggregateDef { alias: "_max".to_string(), func: AggregateFn::Max(column.to_string()) }])?;
    ColumnValue::new(&gb, "_max")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rsql_core::schema::TableBuilder;
    use rsql_core::DataType;
    use rsql_gateway::GatewayConfig;

    fn orders_table() -> rsql_core::schema::Table {
        TableBuilder::new("orders")
            .unwrap()
            .add_column("id", DataType::Integer)
            .unwrap()
            .add_column("user_id", DataType::Integer)
            .unwrap()
            .add_column("amount", DataType::Integer)
            .unwrap()
            .add_primary_key("id")
            .unwrap()
            .build()
            .unwrap()
    }

    #[test]
    fn test_group_by_sum_tracks_insert_and_delete() {
        let gateway = Rc::new(rsql_gateway::StoreGateway::open_in_memory(GatewayConfig::in_memory()).unwrap());
        let orders = crate::view::base_table::open(&gateway, orders_table()).unwrap();
        let totals = group_by(&orders, &["user_id"], &[AggregateDef { alias: "total".to_string(), func: AggregateFn::Sum("amount".to_string()) }]).unwrap();

        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen_clone = seen.clone();
        view::on_insert(&totals, move |row: &Row| seen_clone.borrow_mut().push(row.clone()));
        let updates = Rc::new(RefCell::new(Vec::new()));
        let updates_clone = updates.clone();
        view::on_update(&totals, move |(old, new): &(Row, Row)| updates_clone.borrow_mut().push((old.clone(), new.clone())));

        if let ViewKind::Base(s) = &orders.borrow().kind {
            s.insert(&[Value::Integer(1), Value::Integer(7), Value::Integer(10)]).unwrap();
            s.insert(&[Value::Integer(2), Value::Integer(7), Value::Integer(5)]).unwrap();
        }

        assert_eq!(seen.borrow().len(), 1);
        assert_eq!(seen.borrow()[0].get(0), Some(&Value::Integer(7)));
        assert_eq!(seen.borrow()[0].get(1), Some(&Value::Real(10.0)));

        assert_eq!(updates.borrow().len(), 1);
        assert_eq!(updates.borrow()[0].1.get(1), Some(&Value::Real(15.0)));
    }

    #[test]
    fn test_group_by_min_recomputes_on_extremum_delete() {
        let gateway = Rc::new(rsql_gateway::StoreGateway::open_in_memory(GatewayConfig::in_memory()).unwrap());
        let orders = crate::view::base_table::open(&gateway, orders_table()).unwrap();
        let cheapest = group_by(&orders, &["user_id"], &[AggregateDef { alias: "cheapest".to_string(), func: AggregateFn::Min("amount".to_string()) }]).unwrap();

        let updates = Rc::new(RefCell::new(Vec::new()));
        let updates_clone = updates.clone();
        view::on_update(&cheapest, move |(old, new): &(Row, Row)| updates_clone.borrow_mut().push((old.clone(), new.clone())));

        if let ViewKind::Base(s) = &orders.borrow().kind {
            s.insert(&[Value::Integer(1), Value::Integer(9), Value::Integer(30)]).unwrap();
            s.insert(&[Value::Integer(2), Value::Integer(9), Value::Integer(10)]).unwrap();
            s.insert(&[Value::Integer(3), Value::Integer(9), Value::Integer(20)]).unwrap();
        }
        if let ViewKind::Base(s) = &orders.borrow().kind {
            s.delete_where(&["id"], &[Value::Integer(2)]).unwrap();
        }

        let last = updates.borrow().last().unwrap().1.clone();
        assert_eq!(last.get(1), Some(&Value::Integer(20)));
    }

    #[test]
    fn test_group_by_empty_key_starts_at_zero_and_survives_draining() {
        let gateway = Rc::new(rsql_gateway::StoreGateway::open_in_memory(GatewayConfig::in_memory()).unwrap());
        let orders = crate::view::base_table::open(&gateway, orders_table()).unwrap();
        let total_count = count(&orders).unwrap();

        assert_eq!(total_count.value(), Some(Value::Integer(0)));

        if let ViewKind::Base(s) = &orders.borrow().kind {
            s.insert(&[Value::Integer(1), Value::Integer(1), Value::Integer(1)]).unwrap();
        }
        assert_eq!(total_count.value(), Some(Value::Integer(1)));

        if let ViewKind::Base(s) = &orders.borrow().kind {
            s.delete_where(&["id"], &[Value::Integer(1)]).unwrap();
        }
        assert_eq!(total_count.value(), Some(Value::Integer(0)));
    }
}
