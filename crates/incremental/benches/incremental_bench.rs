//! Benchmarks for rsql-ivm.
//!
//! Target: single row incremental update < 100μs.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rsql_core::{Row, Value};
use rsql_ivm::{
    filter_incremental, project_incremental, Delta, IncrementalAvg, IncrementalCount,
    IncrementalHashJoin, IncrementalSum, JoinType, SortState,
};

fn make_row(id: u64, age: i64) -> Row {
    Row::new(id, vec![Value::Integer(id as i64), Value::Integer(age)])
}

fn bench_delta_operations(c: &mut Criterion) {
    let mut group = c.benchmark_group("delta");

    group.bench_function("create_insert", |b| b.iter(|| Delta::insert(black_box(42i64))));
    group.bench_function("create_delete", |b| b.iter(|| Delta::delete(black_box(42i64))));

    group.finish();
}

fn bench_filter_incremental(c: &mut Criterion) {
    let mut group = c.benchmark_group("filter");

    for size in [1, 10, 100, 1000] {
        let deltas: Vec<Delta<i64>> = (0..size).map(Delta::insert).collect();

        group.bench_with_input(BenchmarkId::new("filter_gt_50", size), &deltas, |b, deltas| {
            b.iter(|| filter_incremental(black_box(deltas), |&x| x > 50))
        });
    }

    group.finish();
}

fn bench_project_incremental(c: &mut Criterion) {
    let mut group = c.benchmark_group("project");

    for size in [1, 10, 100, 1000] {
        let deltas: Vec<Delta<i64>> = (0..size).map(Delta::insert).collect();

        group.bench_with_input(BenchmarkId::new("project_double", size), &deltas, |b, deltas| {
            b.iter(|| project_incremental(black_box(deltas), |&x| x * 2))
        });
    }

    group.finish();
}

fn bench_incremental_count(c: &mut Criterion) {
    let mut group = c.benchmark_group("aggregate/count");

    group.bench_function("single_insert", |b| {
        let mut count = IncrementalCount::new();
        let delta = [Delta::insert(1i64)];
        b.iter(|| count.apply(black_box(&delta)));
    });

    for size in [10, 100, 1000] {
        let deltas: Vec<Delta<i64>> = (0..size).map(Delta::insert).collect();
        group.bench_with_input(BenchmarkId::new("batch_insert", size), &deltas, |b, deltas| {
            let mut count = IncrementalCount::new();
            b.iter(|| count.apply(black_box(deltas)))
        });
    }

    group.finish();
}

fn bench_incremental_sum(c: &mut Criterion) {
    let mut group = c.benchmark_group("aggregate/sum");

    group.bench_function("single_insert", |b| {
        let mut sum = IncrementalSum::new(1);
        let delta = [Delta::insert(make_row(1, 100))];
        b.iter(|| sum.apply(black_box(&delta)));
    });

    for size in [10, 100, 1000] {
        let deltas: Vec<Delta<Row>> = (0..size).map(|i| Delta::insert(make_row(i, i as i64 * 10))).collect();
        group.bench_with_input(BenchmarkId::new("batch_insert", size), &deltas, |b, deltas| {
            let mut sum = IncrementalSum::new(1);
            b.iter(|| sum.apply(black_box(deltas)))
        });
    }

    group.finish();
}

fn bench_incremental_avg(c: &mut Criterion) {
    let mut group = c.benchmark_group("aggregate/avg");

    group.bench_function("single_insert", |b| {
        let mut avg = IncrementalAvg::new(1);
        let delta = [Delta::insert(make_row(1, 100))];
        b.iter(|| avg.apply(black_box(&delta)));
    });

    group.finish();
}

fn bench_incremental_join(c: &mut Criterion) {
    let mut group = c.benchmark_group("join");

    fn setup_join() -> IncrementalHashJoin<i64, Row, Row> {
        let mut join = IncrementalHashJoin::new(JoinType::Inner);
        for i in 0..10i64 {
            let dept = Row::new(i as u64, vec![Value::Integer(i), Value::Text(format!("Dept{}", i))]);
            join.on_right_insert(i, dept, |l: &Row, r: &Row| {
                let mut v = l.values().to_vec();
                v.extend(r.values().iter().cloned());
                Row::synthesized(v)
            }, |r: &Row| r.clone(), |l: &Row| l.clone());
        }
        join
    }

    group.bench_function("single_left_insert", |b| {
        let mut join = setup_join();
        let emp = Row::new(100, vec![Value::Integer(100), Value::Integer(5)]);
        b.iter(|| {
            join.on_left_insert(
                5,
                black_box(emp.clone()),
                |l: &Row, r: &Row| {
                    let mut v = l.values().to_vec();
                    v.extend(r.values().iter().cloned());
                    Row::synthesized(v)
                },
                |l: &Row| l.clone(),
            )
        })
    });

    group.finish();
}

fn bench_sort(c: &mut Criterion) {
    let mut group = c.benchmark_group("sort");

    for size in [10, 100, 1000] {
        group.bench_with_input(BenchmarkId::new("insert_ascending_limit_10", size), &size, |b, &size| {
            b.iter(|| {
                let mut sort = SortState::new(|a: &i64, b: &i64| a.cmp(b), |x: &i64| *x, 0, Some(10));
                for i in 0..size {
                    sort.apply(black_box(Delta::insert(i)));
                }
            })
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_delta_operations,
    bench_filter_incremental,
    bench_project_incremental,
    bench_incremental_count,
    bench_incremental_sum,
    bench_incremental_avg,
    bench_incremental_join,
    bench_sort,
);

criterion_main!(benches);
