//! rsql-ivm — Incremental View Maintenance for the rsql reactive SQL
//! engine.
//!
//! This crate implements the maintenance algorithms behind every view
//! operator: given a batch of deltas on a view's input, compute the
//! (usually much smaller) batch of deltas on its output, without
//! re-running the underlying query.
//!
//! # Core Concepts
//!
//! - `Delta<T>`: one change to a result set — insert, delete, update, or
//!   reset (§4.1)
//! - `IndexedDelta<T>`: a `Delta` carrying a window-relative position,
//!   used only by `Sort`
//! - `MultiplicityMap<K>`: net-presence counting backing `Distinct` and
//!   `Union`
//! - `DataflowGraph`: which views depend on which base tables
//!
//! # Incremental Operators
//!
//! - `filter_incremental` / `project_incremental`: stateless row-wise
//!   maintenance
//! - `DistinctState` / `UnionState` / `union_all_incremental`: set
//!   operators
//! - `IncrementalHashJoin`: inner and outer joins
//! - `IncrementalCount` / `Sum` / `Avg` / `Min` / `Max`: per-group
//!   aggregate trackers
//! - `SortState`: ordered, windowed output
//!
//! # Example
//!
//! ```
//! use rsql_ivm::{filter_incremental, Delta};
//!
//! let input = vec![Delta::insert(25), Delta::insert(15)];
//! let output = filter_incremental(&input, |&age| age >= 18);
//! assert_eq!(output, vec![Delta::insert(25)]);
//! ```

#![no_std]

extern crate alloc;
#[cfg(test)]
extern crate std;

pub mod dataflow;
pub mod delta;
pub mod multiplicity;
pub mod operators;

pub use dataflow::{DataflowGraph, NodeId, TableId};
pub use delta::{Delta, DeltaBatch, IndexedDelta};
pub use multiplicity::MultiplicityMap;
pub use operators::{
    filter_incremental, project_incremental, union_all_incremental, DistinctState,
    IncrementalAvg, IncrementalCount, IncrementalHashJoin, IncrementalMax, IncrementalMin,
    IncrementalSum, JoinType, SortState, UnionState,
};
