//! `BaseTable` (§4.3): a leaf view backed directly by a gateway table.
//!
//! Reconciles the declared schema against the physical one at open time,
//! installs the gateway's per-table capture callback, and re-hydrates
//! captured rows (boolean coercion, `mirrors_id` from the primary key)
//! into the `Delta<Row>` stream every other view variant consumes.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use rsql_core::schema::Table;
use rsql_core::{DataType, Error, Result, Row, Value};
use rsql_gateway::{Action, CallbackToken, StoreGateway};
use rsql_reactive::Delta;

use crate::query;
use crate::view::{View, ViewKind, ViewListeners, ViewRef};

pub struct BaseTableState {
    gateway: Rc<StoreGateway>,
    table: Table,
    pk_column: String,
    pk_index: usize,
    #[allow(dead_code)]
    capture_token: CallbackToken,
}

impl BaseTableState {
    pub fn table(&self) -> &Table {
        &self.table
    }

    pub(crate) fn pk_index(&self) -> usize {
        self.pk_index
    }

    fn coerce_engine_values(&self, values: &[Value]) -> Vec<Value> {
        values.iter().cloned().map(Value::coerce_for_engine).collect()
    }

    /// `BaseTable.insert(cols)` (§6). `values` must be in declared
    /// column order.
    pub fn insert(&self, values: &[Value]) -> Result<()> {
        let engine_values = self.coerce_engine_values(values);
        self.gateway.insert(self.table.name(), &engine_values, false)
    }

    /// `BaseTable.update(where, cols)` — `where_cols`/`where_vals` are
    /// ANDed as NULL-safe equalities.
    pub fn update_where(&self, where_cols: &[&str], where_vals: &[Value], set: &[(&str, Value)]) -> Result<()> {
        let (clause, params) = rsql_gateway::where_builder::equality_predicate(where_cols, where_vals);
        let set_engine: Vec<(&str, Value)> =
            set.iter().map(|(c, v)| (*c, v.clone().coerce_for_engine())).collect();
        self.gateway.update(self.table.name(), &clause, &params, &set_engine)
    }

    pub fn delete_where(&self, where_cols: &[&str], where_vals: &[Value]) -> Result<()> {
        let (clause, params) = rsql_gateway::where_builder::equality_predicate(where_cols, where_vals);
        self.gateway.delete(self.table.name(), &clause, &params)
    }

    pub fn update_by_id(&self, id: u64, set: &[(&str, Value)]) -> Result<()> {
        self.update_where(&[&self.pk_column], &[Value::Integer(id as i64)], set)
    }

    pub fn delete_by_id(&self, id: u64) -> Result<()> {
        self.delete_where(&[&self.pk_column], &[Value::Integer(id as i64)])
    }
}

/// Checks the physical schema against `table`'s declared columns
/// (case-insensitive name match), adding missing columns via `ALTER
/// TABLE` and creating the table outright if it doesn't exist yet. No
/// destructive migration: a type mismatch on an existing column is a
/// hard failure.
fn ensure_physical_schema(gateway: &StoreGateway, table: &Table) -> Result<()> {
    let pragma = format!("PRAGMA table_info({})", query::quote_ident(table.name()));
    let physical = gateway.fetchall(&pragma, &[])?;

    if physical.is_empty() {
        let create_verb = if table.is_temporary() { "CREATE TEMP TABLE" } else { "CREATE TABLE" };
        let col_decls: Vec<String> = table
            .columns()
            .iter()
            .map(|c| {
                let pk = table.primary_key() == Some(c.name());
                format!(
                    "{} {}{}{}",
                    query::quote_ident(c.name()),
                    c.data_type().sql_type_name(),
                    if pk { " PRIMARY KEY" } else { "" },
                    if !c.is_nullable() && !pk { " NOT NULL" } else { "" },
                )
            })
            .collect();
        let sql = format!("{create_verb} {} ({})", query::quote_ident(table.name()), col_decls.join(", "));
        gateway.execute(&sql, &[])?;
        return Ok(());
    }

    // PRAGMA table_info columns: cid, name, type, notnull, dflt_value, pk.
    let physical_names: Vec<String> = physical
        .iter()
        .filter_map(|row| row.get(1).and_then(|v| v.as_str()).map(|s| s.to_lowercase()))
        .collect();

    for column in table.columns() {
        if !physical_names.contains(&column.name().to_lowercase()) {
            let sql = format!(
                "ALTER TABLE {} ADD COLUMN {} {}",
                query::quote_ident(table.name()),
                query::quote_ident(column.name()),
                column.data_type().sql_type_name(),
            );
            gateway.execute(&sql, &[])?;
        }
    }
    Ok(())
}

/// Opens (creating or reconciling) a `BaseTable` view over `table`.
pub fn open(gateway: &Rc<StoreGateway>, table: Table) -> Result<ViewRef> {
    ensure_physical_schema(gateway, &table)?;

    let pk_column = table
        .primary_key()
        .ok_or_else(|| Error::usage("BaseTable requires a declared primary key"))?
        .to_string();
    let pk_index = table
        .get_column_index(&pk_column)
        .ok_or_else(|| Error::invariant_broken("primary key column missing from its own table"))?;

    gateway.register_table(table.clone());

    let columns: Vec<String> = table.columns().iter().map(|c| c.name().to_string()).collect();
    let is_bool: Vec<bool> = table.columns().iter().map(|c| c.data_type().is_bool()).collect();
    let sql_query = format!("SELECT * FROM {}", query::quote_ident(table.name()));
    let gateway_for_view = gateway.clone();
    let gateway_for_callback = gateway.clone();
    let table_name = table.name().to_string();

    let view: ViewRef = Rc::new_cyclic(|weak: &Weak<RefCell<View>>| {
        let weak_for_callback = weak.clone();
        let capture_token = gateway_for_callback.on_table_change(&table_name, move |action, old, new| {
            if let Some(view) = weak_for_callback.upgrade() {
                dispatch_capture(&view, action, old, new);
            }
        });

        RefCell::new(View {
            id: super::next_view_id(),
            columns,
            is_bool,
            query: sql_query,
            gateway: gateway_for_view,
            base_weak: Some(weak.clone()),
            listeners: ViewListeners::new(),
            kind: ViewKind::Base(BaseTableState { gateway: gateway.clone(), table, pk_column, pk_index, capture_token }),
        })
    });

    Ok(view)
}

fn dispatch_capture(view: &ViewRef, action: Action, old: Option<&[Value]>, new: Option<&[Value]>) {
    let (is_bool, pk_index) = {
        let v = view.borrow();
        let pk_index = match &v.kind {
            ViewKind::Base(state) => state.pk_index,
            _ => return,
        };
        (v.is_bool.clone(), pk_index)
    };

    let coerce = |raw: &[Value]| -> Row {
        let values: Vec<Value> = raw
            .iter()
            .zip(is_bool.iter())
            .map(|(v, &is_bool)| if is_bool { v.clone().coerce_to(DataType::Boolean) } else { v.clone() })
            .collect();
        let mirrors_id = values.get(pk_index).and_then(|v| v.as_i64()).unwrap_or(0) as u64;
        Row::new(mirrors_id, values)
    };

    let delta = match action {
        Action::Insert => new.map(|n| Delta::Insert(coerce(n))),
        Action::Delete => old.map(|o| Delta::Delete(coerce(o))),
        Action::Update => match (old, new) {
            (Some(o), Some(n)) => Some(Delta::Update { old: coerce(o), new: coerce(n) }),
            _ => None,
        },
    };

    if let Some(delta) = delta {
        view.borrow_mut().listeners.dispatch(&delta);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rsql_core::schema::TableBuilder;
    use rsql_gateway::GatewayConfig;

    fn users_table() -> Table {
        TableBuilder::new("users")
            .unwrap()
            .add_column("id", DataType::Integer)
            .unwrap()
            .add_column("name", DataType::Text)
            .unwrap()
            .add_column("active", DataType::Boolean)
            .unwrap()
            .add_primary_key("id")
            .unwrap()
            .build()
            .unwrap()
    }

    #[test]
    fn test_open_creates_table_and_reconciles_on_reopen() {
        let gateway = Rc::new(StoreGateway::open_in_memory(GatewayConfig::in_memory()).unwrap());
        let view = open(&gateway, users_table()).unwrap();
        assert_eq!(view.borrow().columns, vec!["id", "name", "active"]);
    }

    #[test]
    fn test_insert_dispatches_coerced_boolean() {
        let gateway = Rc::new(StoreGateway::open_in_memory(GatewayConfig::in_memory()).unwrap());
        let view = open(&gateway, users_table()).unwrap();

        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen_cb = seen.clone();
        view.borrow_mut().listeners.on_insert.subscribe(move |row: &Row| {
            seen_cb.borrow_mut().push(row.clone());
        });

        let state = match &view.borrow().kind {
            ViewKind::Base(s) => s.gateway.clone(),
            _ => unreachable!(),
        };
        let _ = state;
        if let ViewKind::Base(state) = &view.borrow().kind {
            state.insert(&[Value::Integer(1), Value::Text("Alice".into()), Value::Boolean(true)]).unwrap();
        }

        let seen = seen.borrow();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].get(2), Some(&Value::Boolean(true)));
        assert_eq!(seen[0].mirrors_id(), Some(1));
    }
}
