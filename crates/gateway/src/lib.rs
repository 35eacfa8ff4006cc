//! rsql-gateway — the single point of SQL execution for the rsql
//! reactive SQL engine (§4.2).
//!
//! `StoreGateway` owns the `rusqlite` connection and is the only thing
//! in the engine allowed to touch it. Every mutation runs inside an
//! explicit transaction so that change capture and the statement it's
//! capturing either both land or both roll back together. Per-table
//! callbacks are always invoked *after* that transaction commits and
//! after the gateway's own borrow of the connection is released — a
//! listener that itself calls back into `StoreGateway::insert` (or
//! any other mutator) re-enters on a free connection rather than a
//! connection still held mutably by the outer call, which is what
//! makes nested, listener-triggered mutations safe (§4.12, §5).

pub mod capture;
pub mod config;
pub mod value_convert;
pub mod where_builder;

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use rsql_core::schema::Table;
use rsql_core::{Error, Result, Value};
use rusqlite::Connection;

pub use capture::{Action, CapturedChange};
pub use config::{CaptureStrategy, GatewayConfig, JournalMode};

use value_convert::{from_rusqlite, to_rusqlite};

/// One row read back from a free-form `execute`/`fetchall` query.
pub type GatewayRow = Vec<Value>;

/// A per-table change callback: invoked with the action and the old
/// and/or new row values (whichever the action produces).
type Callback = Box<dyn FnMut(Action, Option<&[Value]>, Option<&[Value]>)>;

/// Opaque handle returned by [`StoreGateway::on_table_change`], used to
/// unregister the callback later.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CallbackToken(u64);

struct TableListeners {
    next_id: u64,
    // Wrapped in Rc<RefCell<_>> so `dispatch` can snapshot the list of
    // callbacks (by cloning the Rcs, not the closures) and release the
    // `StoreGateway::listeners` borrow before calling any of them —
    // listeners are an append-only list iterated by index snapshot
    // (§4.12), so a listener that triggers a further mutation on the
    // same table re-enters cleanly instead of hitting a borrowed
    // `RefCell`.
    callbacks: Vec<(u64, Rc<RefCell<Callback>>)>,
}

impl TableListeners {
    fn new() -> Self {
        Self { next_id: 0, callbacks: Vec::new() }
    }
}

/// Owns the embedded SQL connection; the single point of SQL execution
/// for the whole engine.
pub struct StoreGateway {
    conn: RefCell<Connection>,
    config: GatewayConfig,
    tables: RefCell<HashMap<String, Table>>,
    listeners: RefCell<HashMap<String, TableListeners>>,
}

impl StoreGateway {
    /// Opens an in-memory database with the given configuration.
    pub fn open_in_memory(config: GatewayConfig) -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(engine_err)?;
        Self::from_connection(conn, config)
    }

    /// Opens an on-disk database at `path` with the given configuration.
    pub fn open(path: &str, config: GatewayConfig) -> Result<Self> {
        let conn = Connection::open(path).map_err(engine_err)?;
        Self::from_connection(conn, config)
    }

    fn from_connection(conn: Connection, config: GatewayConfig) -> Result<Self> {
        conn.execute_batch(&config.pragma_statements()).map_err(engine_err)?;
        Ok(Self { conn: RefCell::new(conn), config, tables: RefCell::new(HashMap::new()), listeners: RefCell::new(HashMap::new()) })
    }

    /// Registers `table`'s declared schema with the gateway, so future
    /// mutations against it know its column list (needed to build the
    /// shadow table and triggers under the trigger capture strategy).
    pub fn register_table(&self, table: Table) {
        let name = table.name().to_string();
        self.tables.borrow_mut().insert(name.clone(), table);
        self.listeners.borrow_mut().entry(name).or_insert_with(TableListeners::new);
    }

    /// Subscribes to every captured change on `table`. Returns a token
    /// for `unregister`.
    pub fn on_table_change(&self, table: &str, callback: impl FnMut(Action, Option<&[Value]>, Option<&[Value]>) + 'static) -> CallbackToken {
        let mut listeners = self.listeners.borrow_mut();
        let entry = listeners.entry(table.to_string()).or_insert_with(TableListeners::new);
        let id = entry.next_id;
        entry.next_id += 1;
        entry.callbacks.push((id, Rc::new(RefCell::new(Box::new(callback) as Callback))));
        CallbackToken(id)
    }

    /// Unregisters a callback previously returned by `on_table_change`.
    pub fn unregister(&self, table: &str, token: CallbackToken) {
        if let Some(entry) = self.listeners.borrow_mut().get_mut(table) {
            entry.callbacks.retain(|(id, _)| *id != token.0);
        }
    }

    /// Runs a general query, returning every matched row materialised
    /// as a `Vec<Value>` per row.
    pub fn fetchall(&self, sql: &str, params: &[Value]) -> Result<Vec<GatewayRow>> {
        let conn = self.conn.borrow();
        let mut stmt = conn.prepare(sql).map_err(engine_err)?;
        let col_count = stmt.column_count();
        let bound: Vec<_> = params.iter().map(to_rusqlite).collect();
        let rows = stmt
            .query_map(rusqlite::params_from_iter(bound.iter()), |row| {
                (0..col_count).map(|i| row.get_ref(i).map(from_rusqlite)).collect::<rusqlite::Result<Vec<Value>>>()
            })
            .map_err(engine_err)?;

        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(engine_err)
    }

    /// Runs a query expected to return at most one row.
    pub fn fetchone(&self, sql: &str, params: &[Value]) -> Result<Option<GatewayRow>> {
        Ok(self.fetchall(sql, params)?.into_iter().next())
    }

    /// Runs a statement with no result rows expected (DDL, or a raw
    /// mutation the caller is handling capture for itself).
    pub fn execute(&self, sql: &str, params: &[Value]) -> Result<usize> {
        let conn = self.conn.borrow();
        let bound: Vec<_> = params.iter().map(to_rusqlite).collect();
        conn.execute(sql, rusqlite::params_from_iter(bound.iter())).map_err(engine_err)
    }

    /// Inserts one row into `table`, dispatching the resulting capture
    /// callback. `ignore_dup` uses `INSERT OR IGNORE` so a conflicting
    /// primary/unique key is silently skipped rather than erroring.
    pub fn insert(&self, table: &str, values: &[Value], ignore_dup: bool) -> Result<()> {
        let columns = self.column_names(table)?;
        let placeholders = vec!["?"; columns.len()].join(", ");
        let col_list = columns.iter().map(|c| format!("\"{c}\"")).collect::<Vec<_>>().join(", ");
        let verb = if ignore_dup { "INSERT OR IGNORE" } else { "INSERT" };
        let sql = format!("{verb} INTO \"{table}\" ({col_list}) VALUES ({placeholders})");
        self.mutate(table, Action::Insert, &sql, values, None)
    }

    /// Updates every row matching `where_clause`/`where_params` in
    /// `table`, setting the given `(column, value)` pairs.
    pub fn update(&self, table: &str, where_clause: &str, where_params: &[Value], set: &[(&str, Value)]) -> Result<()> {
        let assignments = set.iter().map(|(c, _)| format!("\"{c}\" = ?")).collect::<Vec<_>>().join(", ");
        let sql = format!("UPDATE \"{table}\" SET {assignments} WHERE {where_clause}");

        let mut params: Vec<Value> = set.iter().map(|(_, v)| v.clone()).collect();
        params.extend(where_params.iter().cloned());
        self.mutate(table, Action::Update, &sql, &params, Some((where_clause, where_params)))
    }

    /// Deletes every row matching `where_clause`/`where_params` in
    /// `table`.
    pub fn delete(&self, table: &str, where_clause: &str, where_params: &[Value]) -> Result<()> {
        let sql = format!("DELETE FROM \"{table}\" WHERE {where_clause}");
        self.mutate(table, Action::Delete, &sql, where_params, Some((where_clause, where_params)))
    }

    /// Runs one capturing mutation, then — with the connection borrow
    /// already released — dispatches the captured changes to `table`'s
    /// listeners. Under `CaptureStrategy::Trigger`, installs the shadow
    /// table/triggers if needed and drains them after `sql` runs. Under
    /// `CaptureStrategy::Synthesis`, pre-reads the rows an UPDATE/DELETE
    /// is about to touch (via `where_clause_for_synthesis`) before `sql`
    /// runs, then re-reads by `rowid` (INSERT) or pairs the pre-read
    /// with the post-mutation state (UPDATE) after it commits — both
    /// strategies must produce identical observable callbacks (§4.2).
    fn mutate(
        &self,
        table: &str,
        action: Action,
        sql: &str,
        params: &[Value],
        where_clause_for_synthesis: Option<(&str, &[Value])>,
    ) -> Result<()> {
        let schema = self.table_schema(table)?;
        let changes = {
            let mut conn = self.conn.borrow_mut();
            let tx = conn.transaction().map_err(engine_err)?;

            if self.config.capture_strategy == CaptureStrategy::Trigger {
                capture::ensure_capture_installed(&tx, &schema).map_err(engine_err)?;
            }

            let synthesis_pre = if self.config.capture_strategy == CaptureStrategy::Synthesis {
                match (action, where_clause_for_synthesis) {
                    (Action::Update, Some((wc, wp))) | (Action::Delete, Some((wc, wp))) => {
                        Some(capture::synthesize_pre_read(&tx, &schema, wc, wp).map_err(engine_err)?)
                    }
                    _ => None,
                }
            } else {
                None
            };

            let bound: Vec<Value> = params.to_vec();
            let rusqlite_params: Vec<_> = bound.iter().map(to_rusqlite).collect();
            tx.execute(sql, rusqlite::params_from_iter(rusqlite_params.iter())).map_err(engine_err)?;

            let changes = match self.config.capture_strategy {
                CaptureStrategy::Trigger => capture::drain_captured(&tx, &schema).map_err(engine_err)?,
                CaptureStrategy::Synthesis => match action {
                    Action::Insert => capture::synthesize_insert(&tx, &schema, tx.last_insert_rowid()).map_err(engine_err)?,
                    Action::Update => capture::synthesize_update(&tx, &schema, synthesis_pre.unwrap_or_default()).map_err(engine_err)?,
                    Action::Delete => capture::synthesize_delete(synthesis_pre.unwrap_or_default()),
                },
            };

            tx.commit().map_err(engine_err)?;
            changes
        };

        self.dispatch(table, &changes);
        Ok(())
    }

    /// Invokes `table`'s listeners with each captured change.
    ///
    /// Snapshots the current callback list (cloning the `Rc` handles,
    /// not the closures) and releases the `self.listeners` borrow
    /// before calling any of them — an index-snapshot iteration (§4.12):
    /// a listener that triggers another mutation on the same table
    /// re-enters on a free `RefCell` rather than one still borrowed by
    /// this dispatch, and any listener it registers along the way
    /// simply isn't part of this round's snapshot.
    fn dispatch(&self, table: &str, changes: &[CapturedChange]) {
        if changes.is_empty() {
            return;
        }
        let snapshot: Vec<Rc<RefCell<Callback>>> = match self.listeners.borrow().get(table) {
            Some(entry) => entry.callbacks.iter().map(|(_, cb)| cb.clone()).collect(),
            None => return,
        };

        for change in changes {
            let old = change.old.as_deref();
            let new = change.new.as_deref();
            for callback in &snapshot {
                (*callback.borrow_mut())(change.action, old, new);
            }
        }
    }

    fn table_schema(&self, table: &str) -> Result<Table> {
        self.tables
            .borrow()
            .get(table)
            .cloned()
            .ok_or_else(|| Error::schema_mismatch(table, "table not registered with gateway"))
    }

    fn column_names(&self, table: &str) -> Result<Vec<String>> {
        Ok(self.table_schema(table)?.columns().iter().map(|c| c.name().to_string()).collect())
    }
}

fn engine_err(err: rusqlite::Error) -> Error {
    Error::engine(err.to_string())
}
