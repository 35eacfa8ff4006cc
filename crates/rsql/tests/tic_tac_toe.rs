//! End-to-end pipeline test: a tic-tac-toe win detector built entirely
//! out of view composition, migrated from the original's
//! `tictactoe_simple.py` (§1.2). Each move is a row in a `steps` base
//! table (`step`, `col`, `row`, `o`); a win is any `(col, o)`,
//! `(row, o)`, `(row+col, o)`, or `(row-col, o)` group that reaches a
//! count of 3 moves by the same player.

use rsql::{Database, DataType, Value};
use rsql::schema::TableBuilder;
use rsql::view;

fn open_steps() -> (Database, rsql::ViewRef) {
    let db = Database::open_in_memory().unwrap();
    let table = TableBuilder::new("steps")
        .unwrap()
        .add_column("step", DataType::Integer)
        .unwrap()
        .add_column("col", DataType::Integer)
        .unwrap()
        .add_column("row", DataType::Integer)
        .unwrap()
        .add_column("o", DataType::Boolean)
        .unwrap()
        .add_primary_key("step")
        .unwrap()
        .build()
        .unwrap();
    let steps = db.table(table).unwrap();
    (db, steps)
}

/// Builds the "any line of 3 same-player moves" detector over `steps`:
/// columns, rows, and both diagonals, unioned together.
fn won_count(steps: &rsql::ViewRef) -> rsql::scalar::ColumnValue {
    let by_col = view::group_by(steps, &["col", "o"], &[rsql::view::AggregateDef {
        alias: "_count".to_string(),
        func: rsql::view::AggregateFn::Count,
    }])
    .unwrap();
    let by_row = view::group_by(steps, &["row", "o"], &[rsql::view::AggregateDef {
        alias: "_count".to_string(),
        func: rsql::view::AggregateFn::Count,
    }])
    .unwrap();

    let diag_src = view::select(steps, &[("line", "\"row\" + \"col\""), ("o", "\"o\"")], &[false, true], false).unwrap();
    let by_diag = view::group_by(&diag_src, &["line", "o"], &[rsql::view::AggregateDef {
        alias: "_count".to_string(),
        func: rsql::view::AggregateFn::Count,
    }])
    .unwrap();

    let anti_src = view::select(steps, &[("line", "\"row\" - \"col\""), ("o", "\"o\"")], &[false, true], false).unwrap();
    let by_anti = view::group_by(&anti_src, &["line", "o"], &[rsql::view::AggregateDef {
        alias: "_count".to_string(),
        func: rsql::view::AggregateFn::Count,
    }])
    .unwrap();

    let col_winners = view::where_(&by_col, None, &[("_count", Value::Integer(3))]).unwrap();
    let row_winners = view::where_(&by_row, None, &[("_count", Value::Integer(3))]).unwrap();
    let diag_winners = view::where_(&by_diag, None, &[("_count", Value::Integer(3))]).unwrap();
    let anti_winners = view::where_(&by_anti, None, &[("_count", Value::Integer(3))]).unwrap();

    let col_projected = view::select(&col_winners, &[("line", "\"col\""), ("o", "\"o\""), ("_count", "\"_count\"")], &[false, true, false], false).unwrap();
    let row_projected = view::select(&row_winners, &[("line", "\"row\""), ("o", "\"o\""), ("_count", "\"_count\"")], &[false, true, false], false).unwrap();

    let lines = view::union_all(&col_projected, &row_projected).unwrap();
    let lines = view::union_all(&lines, &diag_winners).unwrap();
    let lines = view::union_all(&lines, &anti_winners).unwrap();

    view::count(&lines).unwrap()
}

#[test]
fn test_top_row_win_is_detected_on_third_move() {
    let (_db, steps) = open_steps();
    let won = won_count(&steps);
    assert_eq!(won.value(), Value::Integer(0));

    // X plays the top row (row=1), O plays the middle row, X wins on
    // their third move.
    view::insert(&steps, &[Value::Integer(1), Value::Integer(1), Value::Integer(1), Value::Boolean(false)]).unwrap();
    view::insert(&steps, &[Value::Integer(2), Value::Integer(1), Value::Integer(2), Value::Boolean(true)]).unwrap();
    view::insert(&steps, &[Value::Integer(3), Value::Integer(2), Value::Integer(1), Value::Boolean(false)]).unwrap();
    view::insert(&steps, &[Value::Integer(4), Value::Integer(2), Value::Integer(2), Value::Boolean(true)]).unwrap();
    assert_eq!(won.value(), Value::Integer(0));

    view::insert(&steps, &[Value::Integer(5), Value::Integer(3), Value::Integer(1), Value::Boolean(false)]).unwrap();
    assert_eq!(won.value(), Value::Integer(1));
}

#[test]
fn test_diagonal_win_is_detected() {
    let (_db, steps) = open_steps();
    let won = won_count(&steps);

    // X takes the main diagonal: (1,1), (2,2), (3,3).
    view::insert(&steps, &[Value::Integer(1), Value::Integer(1), Value::Integer(1), Value::Boolean(false)]).unwrap();
    view::insert(&steps, &[Value::Integer(2), Value::Integer(2), Value::Integer(1), Value::Boolean(true)]).unwrap();
    view::insert(&steps, &[Value::Integer(3), Value::Integer(2), Value::Integer(2), Value::Boolean(false)]).unwrap();
    view::insert(&steps, &[Value::Integer(4), Value::Integer(3), Value::Integer(1), Value::Boolean(true)]).unwrap();
    assert_eq!(won.value(), Value::Integer(0));

    view::insert(&steps, &[Value::Integer(5), Value::Integer(3), Value::Integer(3), Value::Boolean(false)]).unwrap();
    assert_eq!(won.value(), Value::Integer(1));
}

#[test]
fn test_reset_clears_win_state() {
    let (_db, steps) = open_steps();
    let won = won_count(&steps);

    view::insert(&steps, &[Value::Integer(1), Value::Integer(1), Value::Integer(1), Value::Boolean(false)]).unwrap();
    view::insert(&steps, &[Value::Integer(2), Value::Integer(1), Value::Integer(2), Value::Boolean(false)]).unwrap();
    view::insert(&steps, &[Value::Integer(3), Value::Integer(1), Value::Integer(3), Value::Boolean(false)]).unwrap();
    assert_eq!(won.value(), Value::Integer(1));

    for step in [1, 2, 3] {
        view::delete_where(&steps, &["step"], &[Value::Integer(step)]).unwrap();
    }
    assert_eq!(won.value(), Value::Integer(0));
}
