//! SQL string assembly shared by the view operators (§4, "Delta Model &
//! Query Builder"). Every view carries an equivalent `query` string used
//! for full re-reads (`reset`, `fetchall`) and to compose a child's own
//! query out of its parent's.
//!
//! None of this does its own escaping of arbitrary user SQL fragments
//! (`where` predicates, `select` expressions) — those are assumed to be
//! trusted query-building strings supplied by the application, exactly
//! as the gateway's parameterised `?` placeholders only protect *values*,
//! never identifiers or fragments spliced into the query itself.

use rsql_core::Value;

/// Quotes an identifier (table or column name) for SQLite.
pub fn quote_ident(name: &str) -> String {
    format!("\"{name}\"")
}

pub fn column_list(columns: &[impl AsRef<str>]) -> String {
    columns.iter().map(|c| quote_ident(c.as_ref())).collect::<Vec<_>>().join(", ")
}

/// `SELECT <columns> FROM (<base>)`.
pub fn select_all(columns: &[impl AsRef<str>], base: &str) -> String {
    format!("SELECT {} FROM ({})", column_list(columns), base)
}

/// Wraps `base` with an additional `WHERE <predicate>`.
pub fn filtered(base: &str, predicate: &str) -> String {
    format!("SELECT * FROM ({base}) WHERE {predicate}")
}

/// `SELECT <exprs> FROM (<base>)` for a projection, where `exprs` are
/// either plain column names or arbitrary SQL expressions with an
/// `AS alias`.
pub fn projected(base: &str, exprs: &[String]) -> String {
    format!("SELECT {} FROM ({})", exprs.join(", "), base)
}

pub fn union_all(left: &str, right: &str) -> String {
    format!("SELECT * FROM ({left}) UNION ALL SELECT * FROM ({right})")
}

pub fn union_distinct(left: &str, right: &str) -> String {
    format!("SELECT * FROM ({left}) UNION SELECT * FROM ({right})")
}

pub fn distinct(base: &str) -> String {
    format!("SELECT DISTINCT * FROM ({base})")
}

/// A literal-value single-row subquery used to evaluate a predicate or
/// projection expression against one row without touching a real table
/// (§4.4, §4.5): `SELECT ? AS col1, ? AS col2 FROM (VALUES (0))`, bound
/// to the row's current values.
pub fn literal_row(columns: &[impl AsRef<str>]) -> String {
    let select_list = columns
        .iter()
        .map(|c| format!("? AS {}", quote_ident(c.as_ref())))
        .collect::<Vec<_>>()
        .join(", ");
    format!("SELECT {select_list}")
}

/// Builds the SQL (and its bound parameters) for evaluating a one-row
/// predicate via [`literal_row`]: `SELECT 1 FROM (<literal row>) WHERE
/// <predicate>`.
pub fn predicate_probe(columns: &[impl AsRef<str>], predicate: &str) -> String {
    format!("SELECT 1 FROM ({}) WHERE {predicate}", literal_row(columns))
}

/// Builds the SQL for evaluating a row's projected expressions via a
/// literal-row subquery: `SELECT <exprs> FROM (<literal row>)`.
pub fn expr_probe(columns: &[impl AsRef<str>], exprs: &[String]) -> String {
    format!("SELECT {} FROM ({})", exprs.join(", "), literal_row(columns))
}

/// NULL-safe equality clause for a single column: always `IS` rather
/// than `=`, since `=` against a NULL parameter never matches (SQL's
/// three-valued logic) — see [`rsql_gateway::where_builder`].
pub fn equals_clause(column: &str) -> String {
    format!("{} IS ?", quote_ident(column))
}

pub fn conjunctive_equals(columns: &[impl AsRef<str>]) -> String {
    columns.iter().map(|c| equals_clause(c.as_ref())).collect::<Vec<_>>().join(" AND ")
}

/// `ORDER BY` clause for a `Sort` view's comparator columns.
pub fn order_by_clause(columns: &[(String, bool)]) -> String {
    columns
        .iter()
        .map(|(col, desc)| format!("{} {}", quote_ident(col), if *desc { "DESC" } else { "ASC" }))
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn sorted(base: &str, order_by: &[(String, bool)], limit: Option<usize>, offset: usize) -> String {
    let mut sql = format!("SELECT * FROM ({base}) ORDER BY {}", order_by_clause(order_by));
    if let Some(limit) = limit {
        sql.push_str(&format!(" LIMIT {limit}"));
    } else {
        sql.push_str(" LIMIT -1");
    }
    sql.push_str(&format!(" OFFSET {offset}"));
    sql
}

/// Formats a value as a SQL literal for splicing into a view's `query`
/// text, where a `?` placeholder can't be used — e.g. an equality
/// predicate folded into a `Filter`'s composed SQL for `reset`/fetchall
/// re-reads and for downstream views to build on. Only ever fed
/// internally-held `Value`s the operator itself captured, never
/// unescaped caller-supplied SQL.
pub fn sql_literal(value: &Value) -> String {
    match value {
        Value::Null => "NULL".into(),
        Value::Boolean(b) => if *b { "1".into() } else { "0".into() },
        Value::Integer(i) => format!("{i}"),
        Value::Real(f) => format!("{f}"),
        Value::Text(s) => format!("'{}'", s.replace('\'', "''")),
        Value::Blob(_) => "<blob>".into(),
    }
}
