//! NULL-safe `WHERE`-clause construction (§4.2).
//!
//! `col = ?` is always false when the bound parameter is NULL — SQL's
//! three-valued logic, not a bug — so a caller looking up "the row
//! whose `manager_id` is NULL" with a plain equality predicate would
//! match nothing. `IS` collapses to the same truth table as `=` for
//! non-NULL operands but correctly equates two NULLs, so every
//! equality predicate the gateway builds uses `IS` uniformly rather
//! than special-casing NULL columns.

use rsql_core::Value;

/// Builds a conjunctive `WHERE` clause equating each of `columns` to
/// its corresponding entry in `values`, returning the SQL fragment
/// (starting right after `WHERE`, no leading keyword) and the
/// parameters to bind in order.
///
/// Panics if `columns` and `values` have different lengths — this is a
/// caller bug (mismatched column/value lists), not a runtime condition.
pub fn equality_predicate(columns: &[&str], values: &[Value]) -> (String, Vec<Value>) {
    assert_eq!(columns.len(), values.len(), "column/value count mismatch building a predicate");
    let clause = columns.iter().map(|c| format!("\"{c}\" IS ?")).collect::<Vec<_>>().join(" AND ");
    (clause, values.to_vec())
}
