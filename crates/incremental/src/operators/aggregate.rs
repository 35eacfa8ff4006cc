//! Incremental aggregate maintenance for `GroupBy` (§4.9).
//!
//! Each of these trackers maintains one aggregate value for one group.
//! `GroupBy` itself (which rows belong to which group, and routing
//! deltas to the right group's trackers) is the caller's job — these
//! types only own the per-group running value.
//!
//! COUNT, SUM and AVG are fully incremental: every insert/delete/update
//! can update the running value in O(1) without looking at any other
//! row. MIN and MAX are not: deleting the current extremum leaves no
//! way to know the new one without scanning the remaining rows, so they
//! raise a `needs_recompute` flag instead of guessing, and the caller is
//! expected to re-query and call `recompute`.

use crate::delta::Delta;
use alloc::vec::Vec;
use rsql_core::{Row, Value};

/// Incremental COUNT aggregate.
#[derive(Clone, Debug, Default)]
pub struct IncrementalCount {
    count: i64,
}

impl IncrementalCount {
    pub fn new() -> Self {
        Self { count: 0 }
    }

    pub fn with_initial(count: i64) -> Self {
        Self { count }
    }

    /// Applies a batch of deltas of any payload type to update the count.
    pub fn apply<T>(&mut self, deltas: &[Delta<T>]) {
        for d in deltas {
            match d {
                Delta::Insert(_) => self.count += 1,
                Delta::Delete(_) => self.count -= 1,
                Delta::Update { .. } | Delta::Reset => {}
            }
        }
    }

    #[inline]
    pub fn get(&self) -> i64 {
        self.count
    }

    pub fn reset(&mut self) {
        self.count = 0;
    }
}

fn extract_numeric(value: &Value) -> f64 {
    match value {
        Value::Integer(v) => *v as f64,
        Value::Real(v) => *v,
        Value::Boolean(b) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
        _ => 0.0,
    }
}

/// Incremental SUM aggregate over one column.
#[derive(Clone, Debug)]
pub struct IncrementalSum {
    sum: f64,
    column: usize,
}

impl IncrementalSum {
    pub fn new(column: usize) -> Self {
        Self { sum: 0.0, column }
    }

    pub fn with_initial(column: usize, sum: f64) -> Self {
        Self { sum, column }
    }

    pub fn apply(&mut self, deltas: &[Delta<Row>]) {
        for d in deltas {
            match d {
                Delta::Insert(row) => {
                    if let Some(v) = row.get(self.column) {
                        self.sum += extract_numeric(v);
                    }
                }
                Delta::Delete(row) => {
                    if let Some(v) = row.get(self.column) {
                        self.sum -= extract_numeric(v);
                    }
                }
                Delta::Update { old, new } => {
                    if let Some(v) = old.get(self.column) {
                        self.sum -= extract_numeric(v);
                    }
                    if let Some(v) = new.get(self.column) {
                        self.sum += extract_numeric(v);
                    }
                }
                Delta::Reset => self.sum = 0.0,
            }
        }
    }

    #[inline]
    pub fn get(&self) -> f64 {
        self.sum
    }

    pub fn reset(&mut self) {
        self.sum = 0.0;
    }
}

/// Incremental AVG aggregate over one column.
#[derive(Clone, Debug)]
pub struct IncrementalAvg {
    sum: f64,
    count: i64,
    column: usize,
}

impl IncrementalAvg {
    pub fn new(column: usize) -> Self {
        Self { sum: 0.0, count: 0, column }
    }

    pub fn apply(&mut self, deltas: &[Delta<Row>]) {
        for d in deltas {
            match d {
                Delta::Insert(row) => {
                    if let Some(v) = row.get(self.column) {
                        self.sum += extract_numeric(v);
                        self.count += 1;
                    }
                }
                Delta::Delete(row) => {
                    if let Some(v) = row.get(self.column) {
                        self.sum -= extract_numeric(v);
                        self.count -= 1;
                    }
                }
                Delta::Update { old, new } => {
                    if let Some(v) = old.get(self.column) {
                        self.sum -= extract_numeric(v);
                    }
                    if let Some(v) = new.get(self.column) {
                        self.sum += extract_numeric(v);
                    }
                }
                Delta::Reset => {
                    self.sum = 0.0;
                    self.count = 0;
                }
            }
        }
    }

    pub fn get(&self) -> Option<f64> {
        if self.count == 0 {
            None
        } else {
            Some(self.sum / self.count as f64)
        }
    }

    #[inline]
    pub fn count(&self) -> i64 {
        self.count
    }

    #[inline]
    pub fn sum(&self) -> f64 {
        self.sum
    }

    pub fn reset(&mut self) {
        self.sum = 0.0;
        self.count = 0;
    }
}

/// Incremental MIN aggregate over one column. See module docs for why
/// deletion of the current minimum forces a recompute.
#[derive(Clone, Debug)]
pub struct IncrementalMin {
    min: Option<Value>,
    column: usize,
    needs_recompute: bool,
}

impl IncrementalMin {
    pub fn new(column: usize) -> Self {
        Self { min: None, column, needs_recompute: false }
    }

    pub fn apply(&mut self, deltas: &[Delta<Row>]) {
        for d in deltas {
            match d {
                Delta::Insert(row) => {
                    if let Some(value) = row.get(self.column) {
                        self.consider(value);
                    }
                }
                Delta::Delete(row) => {
                    if let Some(value) = row.get(self.column) {
                        self.retire(value);
                    }
                }
                Delta::Update { old, new } => {
                    if let Some(value) = old.get(self.column) {
                        self.retire(value);
                    }
                    if !self.needs_recompute {
                        if let Some(value) = new.get(self.column) {
                            self.consider(value);
                        }
                    }
                }
                Delta::Reset => self.reset(),
            }
        }
    }

    fn consider(&mut self, value: &Value) {
        match &self.min {
            None => self.min = Some(value.clone()),
            Some(current) if value < current => self.min = Some(value.clone()),
            _ => {}
        }
    }

    fn retire(&mut self, value: &Value) {
        if self.min.as_ref() == Some(value) {
            self.needs_recompute = true;
        }
    }

    /// Returns the current minimum, or None if empty or needing recompute.
    pub fn get(&self) -> Option<&Value> {
        if self.needs_recompute {
            None
        } else {
            self.min.as_ref()
        }
    }

    pub fn needs_recompute(&self) -> bool {
        self.needs_recompute
    }

    /// Recomputes the minimum from a full scan of the group's values.
    pub fn recompute(&mut self, values: impl Iterator<Item = Value>) {
        self.min = values.min();
        self.needs_recompute = false;
    }

    pub fn reset(&mut self) {
        self.min = None;
        self.needs_recompute = false;
    }
}

/// Incremental MAX aggregate over one column. Mirrors [`IncrementalMin`].
#[derive(Clone, Debug)]
pub struct IncrementalMax {
    max: Option<Value>,
    column: usize,
    needs_recompute: bool,
}

impl IncrementalMax {
    pub fn new(column: usize) -> Self {
        Self { max: None, column, needs_recompute: false }
    }

    pub fn apply(&mut self, deltas: &[Delta<Row>]) {
        for d in deltas {
            match d {
                Delta::Insert(row) => {
                    if let Some(value) = row.get(self.column) {
                        self.consider(value);
                    }
                }
                Delta::Delete(row) => {
                    if let Some(value) = row.get(self.column) {
                        self.retire(value);
                    }
                }
                Delta::Update { old, new } => {
                    if let Some(value) = old.get(self.column) {
                        self.retire(value);
                    }
                    if !self.needs_recompute {
                        if let Some(value) = new.get(self.column) {
                            self.consider(value);
                        }
                    }
                }
                Delta::Reset => self.reset(),
            }
        }
    }

    fn consider(&mut self, value: &Value) {
        match &self.max {
            None => self.max = Some(value.clone()),
            Some(current) if value > current => self.max = Some(value.clone()),
            _ => {}
        }
    }

    fn retire(&mut self, value: &Value) {
        if self.max.as_ref() == Some(value) {
            self.needs_recompute = true;
        }
    }

    pub fn get(&self) -> Option<&Value> {
        if self.needs_recompute {
            None
        } else {
            self.max.as_ref()
        }
    }

    pub fn needs_recompute(&self) -> bool {
        self.needs_recompute
    }

    pub fn recompute(&mut self, values: impl Iterator<Item = Value>) {
        self.max = values.max();
        self.needs_recompute = false;
    }

    pub fn reset(&mut self) {
        self.max = None;
        self.needs_recompute = false;
    }
}
