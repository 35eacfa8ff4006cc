//! `Filter` (`.where()`, §4.4): a predicate over a parent view.
//!
//! Pure column/value equalities are evaluated locally (no round trip);
//! a free-form SQL fragment is evaluated through a one-row gateway probe
//! (`query::predicate_probe`) so SQL's own three-valued logic — NULL
//! comparisons, `LIKE`, whatever the fragment uses — applies exactly as
//! it would in a full re-read, rather than reimplementing a scalar SQL
//! evaluator here.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use rsql_core::{Result, Row, Value};
use rsql_ivm::{filter_incremental, Delta};
use rsql_reactive::{ParentLink, ViewListeners, ViewSubscription};

use crate::query;
use crate::view::{self, View, ViewKind, ViewRef};

/// The predicate a `Filter` currently evaluates — held behind a shared
/// `RefCell` so `set_filter` (§4.4) can swap it out from under the
/// parent-delta closure that reads it on every maintenance step.
struct PredicateState {
    predicate_sql: Option<String>,
    equality_cols: Vec<usize>,
    equality_vals: Vec<Value>,
}

pub struct FilterState {
    parent_link: ParentLink<View, ViewSubscription>,
    gateway: Rc<rsql_gateway::StoreGateway>,
    parent_columns: Vec<String>,
    parent_query: String,
    predicate: Rc<RefCell<PredicateState>>,
}

impl FilterState {
    pub(crate) fn parent(&self) -> Option<ViewRef> {
        self.parent_link.parent()
    }
}

/// Builds the conjunctive predicate text (`col = literal AND …` plus an
/// optional free-form fragment) and the view's defining query from a
/// set of equalities and an optional SQL fragment — shared by
/// `where_`'s initial construction and `set_filter`'s swap.
fn build_predicate_text(equalities: &[(&str, Value)], predicate_sql: Option<&str>) -> String {
    let mut clauses: Vec<String> =
        equalities.iter().map(|(c, v)| format!("{} = {}", query::quote_ident(c), query::sql_literal(v))).collect();
    if let Some(sql) = predicate_sql {
        clauses.push(format!("({sql})"));
    }
    if clauses.is_empty() {
        "1".to_string()
    } else {
        clauses.join(" AND ")
    }
}

fn resolve_equality_cols(parent_columns: &[String], equalities: &[(&str, Value)]) -> Result<Vec<usize>> {
    equalities
        .iter()
        .map(|(c, _)| {
            parent_columns
                .iter()
                .position(|pc| pc == c)
                .ok_or_else(|| rsql_core::Error::usage(format!("unknown filter column: {c}")))
        })
        .collect()
}

fn eval_equality(row: &Row, col: usize, val: &Value) -> bool {
    if val.is_null() {
        return false;
    }
    row.get(col).map(|v| !v.is_null() && v == val).unwrap_or(false)
}

fn matches(gateway: &rsql_gateway::StoreGateway, parent_columns: &[String], predicate: &PredicateState, row: &Row) -> Result<bool> {
    for (&col, val) in predicate.equality_cols.iter().zip(predicate.equality_vals.iter()) {
        if !eval_equality(row, col, val) {
            return Ok(false);
        }
    }
    match &predicate.predicate_sql {
        None => Ok(true),
        Some(sql) => {
            let probe = query::predicate_probe(parent_columns, sql);
            Ok(gateway.fetchone(&probe, row.values())?.is_some())
        }
    }
}

/// `View.where_(sql?, equalities)` (§4.4, §6).
pub fn where_(parent: &ViewRef, predicate_sql: Option<&str>, equalities: &[(&str, Value)]) -> Result<ViewRef> {
    let (parent_columns, is_bool, gateway, parent_query) = {
        let p = parent.borrow();
        (p.columns.clone(), p.is_bool.clone(), p.gateway.clone(), p.query.clone())
    };

    let equality_cols = resolve_equality_cols(&parent_columns, equalities)?;
    let equality_vals: Vec<Value> = equalities.iter().map(|(_, v)| v.clone()).collect();
    let predicate_text = build_predicate_text(equalities, predicate_sql);
    let query_sql = query::filtered(&parent_query, &predicate_text);

    let predicate = Rc::new(RefCell::new(PredicateState {
        predicate_sql: predicate_sql.map(|s| s.to_string()),
        equality_cols,
        equality_vals,
    }));

    let gateway_for_eval = gateway.clone();
    let parent_columns_for_eval = parent_columns.clone();
    let predicate_for_eval = predicate.clone();

    let view: ViewRef = Rc::new_cyclic(|weak: &Weak<RefCell<View>>| {
        let weak_for_closure = weak.clone();
        let parent_link = view::link_to_parent(parent, move |delta: Delta<Row>| {
            if let Some(view) = weak_for_closure.upgrade() {
                let pred = |r: &Row| matches(&gateway_for_eval, &parent_columns_for_eval, &predicate_for_eval.borrow(), r).unwrap_or(false);
                let out = filter_incremental(&[delta], pred);
                view::emit_all(&view, out);
            }
        });

        RefCell::new(View {
            id: view::next_view_id(),
            columns: parent_columns,
            is_bool,
            query: query_sql,
            gateway,
            base_weak: Some(weak.clone()),
            listeners: ViewListeners::new(),
            kind: ViewKind::Filter(FilterState { parent_link, gateway: gateway_for_eval, parent_columns: parent_columns_for_eval, parent_query, predicate }),
        })
    });

    Ok(view)
}

/// `Filter.set_filter(new_pred)` (§4.4): swaps the predicate and emits
/// `reset` — the new predicate may accept or reject rows the old one
/// didn't, so there's no cheaper incremental path than telling
/// consumers to requery.
pub fn set_filter(view: &ViewRef, predicate_sql: Option<&str>, equalities: &[(&str, Value)]) -> Result<()> {
    let (parent_columns, parent_query, predicate_state) = {
        let v = view.borrow();
        match &v.kind {
            ViewKind::Filter(s) => (s.parent_columns.clone(), s.parent_query.clone(), s.predicate.clone()),
            _ => return Err(rsql_core::Error::usage("set_filter: view is not a Filter view")),
        }
    };

    let equality_cols = resolve_equality_cols(&parent_columns, equalities)?;
    let equality_vals: Vec<Value> = equalities.iter().map(|(_, v)| v.clone()).collect();
    let predicate_text = build_predicate_text(equalities, predicate_sql);
    let query_sql = query::filtered(&parent_query, &predicate_text);

    *predicate_state.borrow_mut() =
        PredicateState { predicate_sql: predicate_sql.map(|s| s.to_string()), equality_cols, equality_vals };
    view.borrow_mut().query = query_sql;

    view::emit(view, Delta::Reset);
    Ok(())
}
