//! Incremental operators for IVM.
//!
//! Each submodule maintains one of the eight view operators against the
//! event-based delta protocol: `Filter`, `Project`, `Distinct`, `Union`/
//! `UnionAll`, `Join` (inner and outer), `GroupBy`'s aggregates, and
//! `Sort`'s ordered window.

mod aggregate;
mod distinct;
mod filter;
mod join;
mod project;
mod sort;
mod union;

pub use aggregate::{IncrementalAvg, IncrementalCount, IncrementalMax, IncrementalMin, IncrementalSum};
pub use distinct::DistinctState;
pub use filter::filter_incremental;
pub use join::{IncrementalHashJoin, JoinType};
pub use project::project_incremental;
pub use sort::SortState;
pub use union::{union_all_incremental, UnionState};
