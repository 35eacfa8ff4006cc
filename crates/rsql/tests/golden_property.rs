//! The golden property (§8): for any view and any sequence of base
//! table mutations, the multiset reconstructed from the view's emitted
//! deltas (materialized at subscription time, then insert/delete/update
//! applied and reset triggering a full re-read) always equals what
//! `fetchall()` would return after the same mutations.
//!
//! Exercised here over a base table and a filtered view stacked on top
//! of it, against randomized insert/update/delete sequences.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use proptest::prelude::*;

use rsql::schema::TableBuilder;
use rsql::{DataType, Database, Value};
use rsql::view::{self, ViewRef};

/// A shadow multiset kept in sync with a view purely through its
/// `on_insert`/`on_delete`/`on_update`/`on_reset` channels, independent
/// of any direct `fetchall` the test later compares it against.
struct Shadow {
    counts: Rc<RefCell<HashMap<Vec<Value>, i64>>>,
}

impl Shadow {
    fn attach(view: &ViewRef) -> Self {
        let counts: Rc<RefCell<HashMap<Vec<Value>, i64>>> = Rc::new(RefCell::new(HashMap::new()));
        for handle in view::fetchall(view).unwrap() {
            *counts.borrow_mut().entry(handle.values().to_vec()).or_insert(0) += 1;
        }

        let counts_insert = counts.clone();
        view::on_insert(view, move |row| {
            *counts_insert.borrow_mut().entry(row.values().to_vec()).or_insert(0) += 1;
        });

        let counts_delete = counts.clone();
        view::on_delete(view, move |row| {
            let mut map = counts_delete.borrow_mut();
            if let Some(count) = map.get_mut(row.values()) {
                *count -= 1;
                if *count <= 0 {
                    map.remove(row.values());
                }
            }
        });

        let counts_update = counts.clone();
        view::on_update(view, move |(old, new)| {
            let mut map = counts_update.borrow_mut();
            if let Some(count) = map.get_mut(old.values()) {
                *count -= 1;
                if *count <= 0 {
                    map.remove(old.values());
                }
            }
            *map.entry(new.values().to_vec()).or_insert(0) += 1;
        });

        let counts_reset = counts.clone();
        let view_weak = Rc::downgrade(view);
        view::on_reset(view, move |_| {
            let Some(view) = view_weak.upgrade() else { return };
            let Ok(rows) = view::fetchall(&view) else { return };
            let mut map = counts_reset.borrow_mut();
            map.clear();
            for handle in rows {
                *map.entry(handle.values().to_vec()).or_insert(0) += 1;
            }
        });

        Self { counts }
    }

    fn assert_matches(&self, view: &ViewRef) {
        let mut expected: HashMap<Vec<Value>, i64> = HashMap::new();
        for handle in view::fetchall(view).unwrap() {
            *expected.entry(handle.values().to_vec()).or_insert(0) += 1;
        }
        let actual: HashMap<Vec<Value>, i64> =
            self.counts.borrow().iter().filter(|(_, &c)| c != 0).map(|(k, &v)| (k.clone(), v)).collect();
        assert_eq!(actual, expected);
    }
}

#[derive(Clone, Debug)]
enum Op {
    Insert(i64),
    Update(usize, i64),
    Delete(usize),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0i64..20).prop_map(Op::Insert),
        (0usize..8, 0i64..20).prop_map(|(i, b)| Op::Update(i, b)),
        (0usize..8).prop_map(Op::Delete),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]
    #[test]
    fn test_golden_property_holds_for_base_and_filtered_views(ops in proptest::collection::vec(op_strategy(), 0..40)) {
        let db = Database::open_in_memory().unwrap();
        let table = TableBuilder::new("t")
            .unwrap()
            .add_column("id", DataType::Integer)
            .unwrap()
            .add_column("b", DataType::Integer)
            .unwrap()
            .add_primary_key("id")
            .unwrap()
            .build()
            .unwrap();
        let t = db.table(table).unwrap();
        let active = view::where_(&t, None, &[("b", Value::Integer(0))]).unwrap();

        let base_shadow = Shadow::attach(&t);
        let active_shadow = Shadow::attach(&active);

        let mut live_ids: Vec<i64> = Vec::new();
        let mut next_id: i64 = 1;

        for op in ops {
            match op {
                Op::Insert(b) => {
                    let id = next_id;
                    next_id += 1;
                    view::insert(&t, &[Value::Integer(id), Value::Integer(b)]).unwrap();
                    live_ids.push(id);
                }
                Op::Update(idx, b) => {
                    if !live_ids.is_empty() {
                        let id = live_ids[idx % live_ids.len()];
                        view::update_where(&t, &["id"], &[Value::Integer(id)], &[("b", Value::Integer(b))]).unwrap();
                    }
                }
                Op::Delete(idx) => {
                    if !live_ids.is_empty() {
                        let pos = idx % live_ids.len();
                        let id = live_ids.remove(pos);
                        view::delete_where(&t, &["id"], &[Value::Integer(id)]).unwrap();
                    }
                }
            }

            base_shadow.assert_matches(&t);
            active_shadow.assert_matches(&active);
        }
    }
}
