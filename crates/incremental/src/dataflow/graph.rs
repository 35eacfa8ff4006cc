//! Table-dependency tracking for the view graph.
//!
//! A view doesn't carry its own dataflow plan in this crate — the
//! top-level `rsql` crate's `View` owns the concrete operator chain and
//! per-operator incremental state. What every view still needs,
//! regardless of shape, is: which base tables feed it, so that a
//! gateway-level change can be routed to exactly the views that care.
//! `DataflowGraph` is that routing table.

use alloc::vec::Vec;
use hashbrown::HashMap;

/// Unique identifier for a node (a view) in the dependency graph.
pub type NodeId = u32;

/// Identifier for a base table.
pub type TableId = u32;

/// Tracks which views depend on which base tables.
pub struct DataflowGraph {
    next_id: NodeId,
    /// Table ids each registered node depends on, so they can be
    /// unregistered later without the caller re-supplying them.
    dependencies: HashMap<NodeId, Vec<TableId>>,
    /// Reverse index: table id -> nodes that depend on it.
    table_dependents: HashMap<TableId, Vec<NodeId>>,
}

impl Default for DataflowGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl DataflowGraph {
    /// Creates a new empty dependency graph.
    pub fn new() -> Self {
        Self {
            next_id: 0,
            dependencies: HashMap::new(),
            table_dependents: HashMap::new(),
        }
    }

    /// Registers a view depending on the given tables, returning the
    /// node id it was assigned.
    pub fn add_node(&mut self, tables: Vec<TableId>) -> NodeId {
        let id = self.next_id;
        self.next_id += 1;

        for &table_id in &tables {
            self.table_dependents.entry(table_id).or_default().push(id);
        }
        self.dependencies.insert(id, tables);
        id
    }

    /// Removes a view's registration.
    pub fn remove_node(&mut self, id: NodeId) {
        if let Some(tables) = self.dependencies.remove(&id) {
            for table_id in tables {
                if let Some(deps) = self.table_dependents.get_mut(&table_id) {
                    deps.retain(|&dep_id| dep_id != id);
                }
            }
        }
    }

    /// Returns the node ids that depend on a given table.
    pub fn get_dependents(&self, table_id: TableId) -> &[NodeId] {
        self.table_dependents
            .get(&table_id)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Returns the number of registered nodes.
    pub fn len(&self) -> usize {
        self.dependencies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dependencies.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    #[test]
    fn test_graph_add_node() {
        let mut graph = DataflowGraph::new();
        let id = graph.add_node(vec![1]);
        assert_eq!(id, 0);
        assert_eq!(graph.len(), 1);
    }

    #[test]
    fn test_graph_dependencies() {
        let mut graph = DataflowGraph::new();
        let id1 = graph.add_node(vec![1]);
        let id2 = graph.add_node(vec![1, 2]);

        let deps = graph.get_dependents(1);
        assert_eq!(deps.len(), 2);
        assert!(deps.contains(&id1));
        assert!(deps.contains(&id2));
        assert_eq!(graph.get_dependents(2), &[id2]);
    }

    #[test]
    fn test_graph_remove_node() {
        let mut graph = DataflowGraph::new();
        let id = graph.add_node(vec![1]);

        graph.remove_node(id);
        assert!(graph.is_empty());
        assert!(graph.get_dependents(1).is_empty());
    }
}
