//! `Project` (`.select()`, §4.5): reshapes each row through a mapping of
//! output column name to SQL expression.
//!
//! Every expression — a bare column reference or an arbitrary scalar
//! SQL expression — is evaluated through a one-row gateway probe
//! (`query::expr_probe`) rather than a local scalar evaluator, so the
//! full breadth of SQLite's expression language (arithmetic, `CASE`,
//! string functions, …) works without this crate reimplementing any of
//! it.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use rsql_core::{DataType, Result, Row, Value};
use rsql_ivm::Delta;
use rsql_reactive::{ParentLink, ViewListeners, ViewSubscription};

use crate::query;
use crate::view::{self, View, ViewKind, ViewRef};

pub struct ProjectState {
    parent_link: ParentLink<View, ViewSubscription>,
    gateway: Rc<rsql_gateway::StoreGateway>,
    parent_columns: Vec<String>,
    exprs: Vec<String>,
    /// Whether this projection's caller asserted that `mirrors_id`
    /// survives (one of `exprs` is a pure pass-through of the parent's
    /// own identity-preserving column). Detecting this automatically
    /// would require parsing `exprs` as SQL rather than treating them as
    /// opaque text, so it is asserted by the constructor's caller
    /// instead (§1.2 Open Question).
    preserve_mirrors_id: bool,
}

impl ProjectState {
    pub(crate) fn parent(&self) -> Option<ViewRef> {
        self.parent_link.parent()
    }
}

fn eval_row(
    gateway: &rsql_gateway::StoreGateway,
    parent_columns: &[String],
    exprs: &[String],
    is_bool: &[bool],
    row: &Row,
) -> Result<Vec<Value>> {
    let sql = query::expr_probe(parent_columns, exprs);
    let projected = gateway
        .fetchone(&sql, row.values())?
        .ok_or_else(|| rsql_core::Error::invariant_broken("projection probe returned no row"))?;
    Ok(projected
        .into_iter()
        .zip(is_bool.iter())
        .map(|(v, &b)| if b { v.coerce_to(DataType::Boolean) } else { v })
        .collect())
}

fn project_delta(
    gateway: &rsql_gateway::StoreGateway,
    parent_columns: &[String],
    exprs: &[String],
    is_bool: &[bool],
    preserve_mirrors_id: bool,
    delta: Delta<Row>,
) -> Result<Delta<Row>> {
    let build = |src: &Row| -> Result<Row> {
        let values = eval_row(gateway, parent_columns, exprs, is_bool, src)?;
        Ok(match preserve_mirrors_id.then(|| src.mirrors_id()).flatten() {
            Some(id) => Row::new(id, values),
            None => Row::synthesized(values),
        })
    };

    Ok(match delta {
        Delta::Insert(r) => Delta::Insert(build(&r)?),
        Delta::Delete(r) => Delta::Delete(build(&r)?),
        Delta::Update { old, new } => Delta::Update { old: build(&old)?, new: build(&new)? },
        Delta::Reset => Delta::Reset,
    })
}

/// `View.select(mapping, preserve_id)` (§4.5). `mapping` is
/// `(output_column, sql_expression)`; `sql_expression` may be a bare
/// parent column name or any scalar SQL expression. `output_is_bool`
/// flags which output columns should be coerced to logical booleans
/// after evaluation (§1, boolean coercion at view-read boundaries).
pub fn select(
    parent: &ViewRef,
    mapping: &[(&str, &str)],
    output_is_bool: &[bool],
    preserve_id: bool,
) -> Result<ViewRef> {
    if mapping.len() != output_is_bool.len() {
        return Err(rsql_core::Error::usage("select: output_is_bool must match mapping length"));
    }

    let (parent_columns, gateway, parent_query) = {
        let p = parent.borrow();
        (p.columns.clone(), p.gateway.clone(), p.query.clone())
    };

    let columns: Vec<String> = mapping.iter().map(|(out, _)| out.to_string()).collect();
    let exprs: Vec<String> = mapping
        .iter()
        .map(|(out, expr)| format!("{} AS {}", expr, query::quote_ident(out)))
        .collect();
    let is_bool = output_is_bool.to_vec();
    let query_sql = query::projected(&parent_query, &exprs);

    let gateway_for_eval = gateway.clone();
    let parent_columns_for_eval = parent_columns.clone();
    let exprs_for_eval = exprs.clone();
    let is_bool_for_eval = is_bool.clone();

    let view: ViewRef = Rc::new_cyclic(|weak: &Weak<RefCell<View>>| {
        let weak_for_closure = weak.clone();
        let parent_link = view::link_to_parent(parent, move |delta: Delta<Row>| {
            if let Some(view) = weak_for_closure.upgrade() {
                match project_delta(
                    &gateway_for_eval,
                    &parent_columns_for_eval,
                    &exprs_for_eval,
                    &is_bool_for_eval,
                    preserve_id,
                    delta,
                ) {
                    Ok(out) => view::emit(&view, out),
                    Err(err) => tracing::warn!(%err, "project: failed to evaluate projection for a delta"),
                }
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
            kind: ViewKind::Project(ProjectState {
                parent_link,
                gateway: gateway_for_eval,
                parent_columns: parent_columns_for_eval,
                exprs: exprs_for_eval,
                preserve_mirrors_id: preserve_id,
            }),
        })
    });

    Ok(view)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rsql_core::schema::TableBuilder;
    use rsql_gateway::GatewayConfig;

    fn items_table() -> rsql_core::schema::Table {
        TableBuilder::new("items")
            .unwrap()
            .add_column("id", DataType::Integer)
            .unwrap()
            .add_column("price", DataType::Integer)
            .unwrap()
            .add_primary_key("id")
            .unwrap()
            .build()
            .unwrap()
    }

    #[test]
    fn test_select_evaluates_expression_and_preserves_id() {
        let gateway = Rc::new(rsql_gateway::StoreGateway::open_in_memory(GatewayConfig::in_memory()).unwrap());
        let base = crate::view::base_table::open(&gateway, items_table()).unwrap();
        let doubled = select(&base, &[("doubled", "\"price\" * 2")], &[false], true).unwrap();

        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen_clone = seen.clone();
        view::on_insert(&doubled, move |row: &Row| seen_clone.borrow_mut().push(row.clone()));

        if let ViewKind::Base(s) = &base.borrow().kind {
            s.insert(&[Value::Integer(1), Value::Integer(21)]).unwrap();
        }

        let seen = seen.borrow();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].get(0), Some(&Value::Integer(42)));
        assert_eq!(seen[0].mirrors_id(), Some(1));
    }
}
