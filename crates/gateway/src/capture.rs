//! Change capture (§4.2): two strategies, required to yield identical
//! observable callbacks.
//!
//! **Trigger** (strategy 1, the default): on first touch of a declared
//! table `T`, creates a shadow table
//! `T__rsql_rows(seq, action, old_<col>…, new_<col>…)` plus one
//! `AFTER INSERT|UPDATE|DELETE` trigger per action, each of which logs
//! the affected row(s) into the shadow table. After running a mutating
//! statement, the gateway drains the shadow table in `seq` order,
//! turns each row into a [`CapturedChange`], then truncates it — all
//! inside the same transaction as the mutation, so a rollback discards
//! both the data change and its capture rows together.
//!
//! **Synthesis** (strategy 2): no triggers at all. An INSERT is read
//! back by `last_insert_rowid()`; an UPDATE/DELETE pre-reads the rows
//! matching the mutation's own `WHERE` clause (keyed by `rowid` so the
//! post-UPDATE read can find the same physical rows again) before the
//! statement runs.

use rsql_core::schema::Table;
use rsql_core::Value;
use rusqlite::Transaction;

use crate::value_convert::{from_rusqlite, to_rusqlite};

/// What kind of mutation produced a [`CapturedChange`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    Insert,
    Update,
    Delete,
}

/// One row-level effect of a mutation, as handed to `BaseTable`'s
/// per-table listener dispatch.
#[derive(Clone, Debug)]
pub struct CapturedChange {
    pub action: Action,
    pub old: Option<Vec<Value>>,
    pub new: Option<Vec<Value>>,
}

fn shadow_table_name(table: &str) -> String {
    format!("{table}__rsql_rows")
}

/// Creates the shadow table and its triggers for `table`, if they
/// don't already exist. Idempotent: safe to call before every
/// mutation.
pub fn ensure_capture_installed(tx: &Transaction<'_>, table: &Table) -> rusqlite::Result<()> {
    let shadow = shadow_table_name(table.name());
    let cols: Vec<&str> = table.columns().iter().map(|c| c.name()).collect();

    let old_cols: Vec<String> = cols.iter().map(|c| format!("old_{c}")).collect();
    let new_cols: Vec<String> = cols.iter().map(|c| format!("new_{c}")).collect();

    let create_shadow = format!(
        "CREATE TABLE IF NOT EXISTS \"{shadow}\" (\
            seq INTEGER PRIMARY KEY AUTOINCREMENT, \
            action TEXT NOT NULL, \
            {old_decls}, \
            {new_decls}\
        )",
        old_decls = old_cols.iter().map(|c| format!("\"{c}\"")).collect::<Vec<_>>().join(", "),
        new_decls = new_cols.iter().map(|c| format!("\"{c}\"")).collect::<Vec<_>>().join(", "),
    );
    tx.execute(&create_shadow, [])?;

    let insert_cols = |prefix: &str| -> String { cols.iter().map(|c| format!("\"{prefix}_{c}\"")).collect::<Vec<_>>().join(", ") };
    let new_values = |row: &str| -> String { cols.iter().map(|c| format!("{row}.\"{c}\"")).collect::<Vec<_>>().join(", ") };

    let insert_trigger = format!(
        "CREATE TRIGGER IF NOT EXISTS \"{table}_rsql_ai\" AFTER INSERT ON \"{table}\" BEGIN \
            INSERT INTO \"{shadow}\" (action, {new_cols}) VALUES ('insert', {new_vals}); \
        END",
        table = table.name(),
        new_cols = insert_cols("new"),
        new_vals = new_values("NEW"),
    );
    tx.execute(&insert_trigger, [])?;

    let update_trigger = format!(
        "CREATE TRIGGER IF NOT EXISTS \"{table}_rsql_au\" AFTER UPDATE ON \"{table}\" BEGIN \
            INSERT INTO \"{shadow}\" (action, {old_cols}, {new_cols}) VALUES ('update', {old_vals}, {new_vals}); \
        END",
        table = table.name(),
        old_cols = insert_cols("old"),
        new_cols = insert_cols("new"),
        old_vals = new_values("OLD"),
        new_vals = new_values("NEW"),
    );
    tx.execute(&update_trigger, [])?;

    let delete_trigger = format!(
        "CREATE TRIGGER IF NOT EXISTS \"{table}_rsql_ad\" AFTER DELETE ON \"{table}\" BEGIN \
            INSERT INTO \"{shadow}\" (action, {old_cols}) VALUES ('delete', {old_vals}); \
        END",
        table = table.name(),
        old_cols = insert_cols("old"),
        old_vals = new_values("OLD"),
    );
    tx.execute(&delete_trigger, [])?;

    Ok(())
}

/// Reads every row logged in `table`'s shadow table since the last
/// drain, in insertion order, then truncates it.
pub fn drain_captured(tx: &Transaction<'_>, table: &Table) -> rusqlite::Result<Vec<CapturedChange>> {
    let shadow = shadow_table_name(table.name());
    let n = table.columns().len();

    let select = format!("SELECT action, * FROM \"{shadow}\" ORDER BY seq ASC");
    let mut stmt = tx.prepare(&select)?;
    let mut rows = stmt.query([])?;

    let mut out = Vec::new();
    while let Some(row) = rows.next()? {
        // Column order: seq, action, old_*, new_*.
        let action_str: String = row.get(1)?;
        let action = match action_str.as_str() {
            "insert" => Action::Insert,
            "update" => Action::Update,
            "delete" => Action::Delete,
            other => {
                return Err(rusqlite::Error::InvalidColumnName(format!("unknown capture action: {other}")));
            }
        };

        let old_base = 2;
        let new_base = 2 + n;
        let old = if matches!(action, Action::Update | Action::Delete) {
            let values: rusqlite::Result<Vec<Value>> =
                (0..n).map(|i| row.get_ref(old_base + i).map(from_rusqlite)).collect();
            Some(values?)
        } else {
            None
        };
        let new = if matches!(action, Action::Update | Action::Insert) {
            let values: rusqlite::Result<Vec<Value>> =
                (0..n).map(|i| row.get_ref(new_base + i).map(from_rusqlite)).collect();
            Some(values?)
        } else {
            None
        };

        out.push(CapturedChange { action, old, new });
    }
    drop(rows);
    drop(stmt);

    tx.execute(&format!("DELETE FROM \"{shadow}\""), [])?;
    Ok(out)
}

fn column_list(table: &Table) -> String {
    table.columns().iter().map(|c| format!("\"{}\"", c.name())).collect::<Vec<_>>().join(", ")
}

fn read_by_rowid(tx: &Transaction<'_>, table: &Table, rowid: i64) -> rusqlite::Result<Vec<Value>> {
    let n = table.columns().len();
    let sql = format!("SELECT {} FROM \"{}\" WHERE rowid = ?", column_list(table), table.name());
    tx.query_row(&sql, [rowid], |row| (0..n).map(|i| row.get_ref(i).map(from_rusqlite)).collect::<rusqlite::Result<Vec<Value>>>())
}

/// Synthesis strategy, pre-mutation half: reads every row currently
/// matching `where_clause`/`where_params`, paired with its `rowid` so
/// the post-mutation half can find the same row again after an UPDATE
/// changes its column values (a DELETE has no post-mutation half — the
/// pre-read values are already everything a `CapturedChange::Delete`
/// needs).
pub fn synthesize_pre_read(
    tx: &Transaction<'_>,
    table: &Table,
    where_clause: &str,
    where_params: &[Value],
) -> rusqlite::Result<Vec<(i64, Vec<Value>)>> {
    let n = table.columns().len();
    let sql = format!("SELECT rowid, {} FROM \"{}\" WHERE {where_clause} ORDER BY rowid ASC", column_list(table), table.name());
    let bound: Vec<_> = where_params.iter().map(to_rusqlite).collect();
    let mut stmt = tx.prepare(&sql)?;
    let rows = stmt.query_map(rusqlite::params_from_iter(bound.iter()), |row| {
        let rowid: i64 = row.get(0)?;
        let values: rusqlite::Result<Vec<Value>> = (0..n).map(|i| row.get_ref(i + 1).map(from_rusqlite)).collect();
        Ok((rowid, values?))
    })?;
    rows.collect()
}

/// Synthesis strategy, INSERT: reads back the just-inserted row by
/// `last_insert_rowid()`.
pub fn synthesize_insert(tx: &Transaction<'_>, table: &Table, rowid: i64) -> rusqlite::Result<Vec<CapturedChange>> {
    let new = read_by_rowid(tx, table, rowid)?;
    Ok(vec![CapturedChange { action: Action::Insert, old: None, new: Some(new) }])
}

/// Synthesis strategy, UPDATE: re-reads each pre-read `rowid` after the
/// statement has run, pairing the old values captured before the
/// mutation with the new values read after it.
pub fn synthesize_update(tx: &Transaction<'_>, table: &Table, pre: Vec<(i64, Vec<Value>)>) -> rusqlite::Result<Vec<CapturedChange>> {
    let mut out = Vec::with_capacity(pre.len());
    for (rowid, old) in pre {
        let new = read_by_rowid(tx, table, rowid)?;
        out.push(CapturedChange { action: Action::Update, old: Some(old), new: Some(new) });
    }
    Ok(out)
}

/// Synthesis strategy, DELETE: the pre-read rows already captured
/// everything needed — the rows no longer exist to re-read.
pub fn synthesize_delete(pre: Vec<(i64, Vec<Value>)>) -> Vec<CapturedChange> {
    pre.into_iter().map(|(_, old)| CapturedChange { action: Action::Delete, old: Some(old), new: None }).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rsql_core::schema::TableBuilder;
    use rsql_core::DataType;
    use rusqlite::Connection;

    fn users_table() -> Table {
        TableBuilder::new("users")
            .unwrap()
            .add_column("id", DataType::Integer)
            .unwrap()
            .add_column("name", DataType::Text)
            .unwrap()
            .build()
            .unwrap()
    }

    fn open_with_table() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute("CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT)", []).unwrap();
        conn
    }

    #[test]
    fn test_insert_is_captured() {
        let mut conn = open_with_table();
        let table = users_table();
        let tx = conn.transaction().unwrap();
        ensure_capture_installed(&tx, &table).unwrap();
        tx.execute("INSERT INTO users (id, name) VALUES (1, 'Alice')", []).unwrap();

        let changes = drain_captured(&tx, &table).unwrap();
        tx.commit().unwrap();

        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].action, Action::Insert);
        assert_eq!(changes[0].new, Some(vec![Value::Integer(1), Value::Text("Alice".into())]));
        assert_eq!(changes[0].old, None);
    }

    #[test]
    fn test_update_captures_old_and_new() {
        let mut conn = open_with_table();
        let table = users_table();
        conn.execute("INSERT INTO users (id, name) VALUES (1, 'Alice')", []).unwrap();

        let tx = conn.transaction().unwrap();
        ensure_capture_installed(&tx, &table).unwrap();
        tx.execute("UPDATE users SET name = 'Bob' WHERE id = 1", []).unwrap();

        let changes = drain_captured(&tx, &table).unwrap();
        tx.commit().unwrap();

        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].action, Action::Update);
        assert_eq!(changes[0].old, Some(vec![Value::Integer(1), Value::Text("Alice".into())]));
        assert_eq!(changes[0].new, Some(vec![Value::Integer(1), Value::Text("Bob".into())]));
    }

    #[test]
    fn test_delete_captures_old_only() {
        let mut conn = open_with_table();
        let table = users_table();
        conn.execute("INSERT INTO users (id, name) VALUES (1, 'Alice')", []).unwrap();

        let tx = conn.transaction().unwrap();
        ensure_capture_installed(&tx, &table).unwrap();
        tx.execute("DELETE FROM users WHERE id = 1", []).unwrap();

        let changes = drain_captured(&tx, &table).unwrap();
        tx.commit().unwrap();

        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].action, Action::Delete);
        assert_eq!(changes[0].new, None);
        assert_eq!(changes[0].old, Some(vec![Value::Integer(1), Value::Text("Alice".into())]));
    }

    #[test]
    fn test_drain_truncates_shadow_table() {
        let mut conn = open_with_table();
        let table = users_table();
        let tx = conn.transaction().unwrap();
        ensure_capture_installed(&tx, &table).unwrap();
        tx.execute("INSERT INTO users (id, name) VALUES (1, 'Alice')", []).unwrap();
        drain_captured(&tx, &table).unwrap();

        let again = drain_captured(&tx, &table).unwrap();
        assert!(again.is_empty());
    }

    #[test]
    fn test_ensure_capture_installed_is_idempotent() {
        let mut conn = open_with_table();
        let table = users_table();
        let tx = conn.transaction().unwrap();
        ensure_capture_installed(&tx, &table).unwrap();
        ensure_capture_installed(&tx, &table).unwrap();
        tx.commit().unwrap();
    }

    #[test]
    fn test_synthesize_insert_reads_back_by_rowid() {
        let mut conn = open_with_table();
        let table = users_table();
        let tx = conn.transaction().unwrap();
        tx.execute("INSERT INTO users (id, name) VALUES (1, 'Alice')", []).unwrap();
        let rowid = tx.last_insert_rowid();

        let changes = synthesize_insert(&tx, &table, rowid).unwrap();
        tx.commit().unwrap();

        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].action, Action::Insert);
        assert_eq!(changes[0].new, Some(vec![Value::Integer(1), Value::Text("Alice".into())]));
        assert_eq!(changes[0].old, None);
    }

    #[test]
    fn test_synthesize_update_pairs_pre_and_post_read() {
        let mut conn = open_with_table();
        let table = users_table();
        conn.execute("INSERT INTO users (id, name) VALUES (1, 'Alice')", []).unwrap();

        let tx = conn.transaction().unwrap();
        let pre = synthesize_pre_read(&tx, &table, "id = ?", &[Value::Integer(1)]).unwrap();
        tx.execute("UPDATE users SET name = 'Bob' WHERE id = 1", []).unwrap();
        let changes = synthesize_update(&tx, &table, pre).unwrap();
        tx.commit().unwrap();

        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].action, Action::Update);
        assert_eq!(changes[0].old, Some(vec![Value::Integer(1), Value::Text("Alice".into())]));
        assert_eq!(changes[0].new, Some(vec![Value::Integer(1), Value::Text("Bob".into())]));
    }

    #[test]
    fn test_synthesize_delete_uses_pre_read_values_only() {
        let mut conn = open_with_table();
        let table = users_table();
        conn.execute("INSERT INTO users (id, name) VALUES (1, 'Alice')", []).unwrap();

        let tx = conn.transaction().unwrap();
        let pre = synthesize_pre_read(&tx, &table, "id = ?", &[Value::Integer(1)]).unwrap();
        tx.execute("DELETE FROM users WHERE id = 1", []).unwrap();
        let changes = synthesize_delete(pre);
        tx.commit().unwrap();

        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].action, Action::Delete);
        assert_eq!(changes[0].old, Some(vec![Value::Integer(1), Value::Text("Alice".into())]));
        assert_eq!(changes[0].new, None);
    }

    #[test]
    fn test_synthesize_pre_read_is_null_safe() {
        let mut conn = open_with_table();
        conn.execute("INSERT INTO users (id, name) VALUES (1, NULL)", []).unwrap();
        let table = users_table();
        let tx = conn.transaction().unwrap();

        let (clause, params) = crate::where_builder::equality_predicate(&["name"], &[Value::Null]);
        let pre = synthesize_pre_read(&tx, &table, &clause, &params).unwrap();
        assert_eq!(pre.len(), 1);
        assert_eq!(pre[0].1, vec![Value::Integer(1), Value::Null]);
    }
}
