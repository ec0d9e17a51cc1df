//! File-level dependency graph using petgraph::DiGraph with NodeId weights

use crate::model::NodeId;
use crate::symbols::SymbolTable;
use petgraph::algo::kosaraju_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::{HashMap, HashSet};

/// Directed graph restricted to file-to-file edges.
pub struct FileGraph {
    inner: DiGraph<NodeId, ()>,
    index: HashMap<NodeId, NodeIndex>,
}

impl std::fmt::Debug for FileGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileGraph")
            .field("node_count", &self.inner.node_count())
            .field("edge_count", &self.inner.edge_count())
            .finish()
    }
}

impl FileGraph {
    pub fn new() -> Self {
        FileGraph {
            inner: DiGraph::new(),
            index: HashMap::new(),
        }
    }

    /// Build the adjacency from every file node's dependency list, keeping only
    /// entries that name a known file.
    pub fn from_table(table: &SymbolTable) -> Self {
        let mut graph = FileGraph::new();
        for file in table.files() {
            graph.add_file(file.id.clone());
        }
        for file in table.files() {
            for dep in file.dependencies.iter().filter(|d| table.is_file(d.as_str())) {
                graph.add_dependency(&file.id, dep);
            }
        }
        graph
    }

    /// Add a file node. Adding a known file is a no-op.
    pub fn add_file(&mut self, id: NodeId) -> NodeIndex {
        if let Some(&idx) = self.index.get(&id) {
            return idx;
        }
        let idx = self.inner.add_node(id.clone());
        self.index.insert(id, idx);
        idx
    }

    /// Add `from -> to`. Unknown endpoints are skipped.
    pub fn add_dependency(&mut self, from: &NodeId, to: &NodeId) -> bool {
        match (self.index.get(from), self.index.get(to)) {
            (Some(&a), Some(&b)) => {
                if !self.inner.contains_edge(a, b) {
                    self.inner.add_edge(a, b, ());
                }
                true
            }
            _ => false,
        }
    }

    pub fn node_count(&self) -> usize {
        self.inner.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.inner.edge_count()
    }

    /// Files that lie on at least one directed cycle.
    ///
    /// Uses Kosaraju's algorithm, which walks the graph with explicit stacks,
    /// so arbitrarily deep chains do not grow the call stack. A file is cyclic
    /// iff its strongly connected component has more than one member or it
    /// has an edge to itself.
    pub fn cyclic_files(&self) -> HashSet<NodeId> {
        let mut cyclic = HashSet::new();
        for component in kosaraju_scc(&self.inner) {
            let on_cycle = component.len() > 1
                || component
                    .first()
                    .is_some_and(|&n| self.inner.contains_edge(n, n));
            if !on_cycle {
                continue;
            }
            for idx in component {
                if let Some(id) = self.inner.node_weight(idx) {
                    cyclic.insert(id.clone());
                }
            }
        }
        cyclic
    }
}

impl Default for FileGraph {
    fn default() -> Self {
        Self::new()
    }
}
