//! Conversion between `rsql_core::Value` and `rusqlite`'s own value
//! representation.
//!
//! Boolean coercion is deliberately **not** done here: SQLite has no
//! boolean storage class, so every value the gateway sends or receives
//! is either an integer, a real, text, a blob, or NULL. `BaseTable` is
//! the boundary that re-hydrates a declared-boolean column's 0/1
//! integer into `Value::Boolean` (§4.3); this module only bridges the
//! engine-level representations.

use rsql_core::Value;
use rusqlite::types::{Value as SqlValue, ValueRef};

/// Converts an engine-level value to something `rusqlite` can bind as
/// a statement parameter.
pub fn to_rusqlite(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Boolean(b) => SqlValue::Integer(if *b { 1 } else { 0 }),
        Value::Integer(i) => SqlValue::Integer(*i),
        Value::Real(f) => SqlValue::Real(*f),
        Value::Text(s) => SqlValue::Text(s.clone()),
        Value::Blob(b) => SqlValue::Blob(b.clone()),
    }
}

/// Converts a row column read back from `rusqlite` into an engine-level
/// value. Always produces `Integer`/`Real`/`Text`/`Blob`/`Null` — never
/// `Boolean`, per this module's doc comment.
pub fn from_rusqlite(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Integer(i),
        ValueRef::Real(f) => Value::Real(f),
        ValueRef::Text(t) => Value::Text(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => Value::Blob(b.to_vec()),
    }
}
