//! Table-dependency tracking for views.

mod graph;

pub use graph::{DataflowGraph, NodeId, TableId};
