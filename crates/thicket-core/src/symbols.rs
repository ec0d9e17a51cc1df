//! Identifier map shared by both extraction strategies and the linker

use crate::model::{GraphNode, NodeId};
use indexmap::{IndexMap, IndexSet};

/// Result of [`SymbolTable::merge`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    Inserted,
    Patched,
}

/// Identifier map from `NodeId` to node, in first-encounter order.
///
/// Holds file and symbol nodes. At most one node exists per identifier.
#[derive(Debug, Default, Clone)]
pub struct SymbolTable {
    nodes: IndexMap<NodeId, GraphNode>,
}

impl SymbolTable {
    pub fn new() -> Self {
        SymbolTable {
            nodes: IndexMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut GraphNode> {
        self.nodes.get_mut(id)
    }

    /// Insert only if the identifier is unknown. Returns false if an existing
    /// node was kept.
    pub fn insert_if_absent(&mut self, node: GraphNode) -> bool {
        if self.nodes.contains_key(&node.id) {
            return false;
        }
        self.nodes.insert(node.id.clone(), node);
        true
    }

    /// Insert, or patch the existing node without overwriting anything it
    /// already has: the exported flag can only be raised, and location or
    /// complexity are only filled when missing.
    pub fn merge(&mut self, node: GraphNode) -> MergeOutcome {
        match self.nodes.get_mut(&node.id) {
            Some(existing) => {
                existing.is_exported |= node.is_exported;
                if existing.loc.is_none() {
                    existing.loc = node.loc;
                }
                if existing.cognitive_complexity.is_none() {
                    existing.cognitive_complexity = node.cognitive_complexity;
                }
                MergeOutcome::Patched
            }
            None => {
                self.nodes.insert(node.id.clone(), node);
                MergeOutcome::Inserted
            }
        }
    }

    /// Move every node of `other` into this table with [`merge`](Self::merge)
    /// semantics, keeping `other`'s order.
    pub fn absorb(&mut self, other: SymbolTable) {
        for (_, node) in other.nodes {
            self.merge(node);
        }
    }

    /// Raise the exported flag of a known node. Returns false if unknown.
    pub fn mark_exported(&mut self, id: &str) -> bool {
        match self.nodes.get_mut(id) {
            Some(node) => {
                node.is_exported = true;
                true
            }
            None => false,
        }
    }

    /// Record `from -> to` on both endpoints.
    ///
    /// Symbol endpoints are mirrored onto their owning file nodes, so a file's
    /// lists cover every edge touching the file. Edges to or from unknown
    /// identifiers and self edges are dropped.
    pub fn add_edge(&mut self, from: &NodeId, to: &NodeId) -> bool {
        if from == to {
            return false;
        }
        let (Some(from_file), Some(to_file)) = (self.owner_file(from.as_str()), self.owner_file(to.as_str())) else {
            tracing::trace!("dropping edge {} -> {}: unknown endpoint", from, to);
            return false;
        };
        let from_file = NodeId::file(&from_file);
        let to_file = NodeId::file(&to_file);

        if let Some(node) = self.nodes.get_mut(from) {
            node.dependencies.push(to.clone());
        }
        if let Some(node) = self.nodes.get_mut(to) {
            node.dependents.push(from.clone());
        }
        if &from_file != from {
            if let Some(file) = self.nodes.get_mut(&from_file) {
                file.dependencies.push(to.clone());
            }
        }
        if &to_file != to {
            if let Some(file) = self.nodes.get_mut(&to_file) {
                file.dependents.push(from.clone());
            }
        }
        true
    }

    /// Path of the file that owns `id`, if `id` is known.
    pub fn owner_file(&self, id: &str) -> Option<String> {
        self.nodes.get(id).map(|n| n.file_path.clone())
    }

    /// True if `id` is known and names a file node.
    pub fn is_file(&self, id: &str) -> bool {
        self.nodes.get(id).is_some_and(GraphNode::is_file)
    }

    /// Remove duplicate entries from every edge list, keeping first occurrences.
    pub fn dedup_edges(&mut self) {
        for node in self.nodes.values_mut() {
            dedup_in_place(&mut node.dependencies);
            dedup_in_place(&mut node.dependents);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &GraphNode> {
        self.nodes.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut GraphNode> {
        self.nodes.values_mut()
    }

    pub fn files(&self) -> impl Iterator<Item = &GraphNode> {
        self.nodes.values().filter(|n| n.is_file())
    }

    pub fn into_nodes(self) -> impl Iterator<Item = GraphNode> {
        self.nodes.into_values()
    }
}

fn dedup_in_place(ids: &mut Vec<NodeId>) {
    let unique: IndexSet<NodeId> = ids.drain(..).collect();
    ids.extend(unique);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{NodeKind, SourceSpan};

    #[test]
    fn test_insert_if_absent_keeps_first() {
        let mut table = SymbolTable::new();
        let first = GraphNode::symbol("a.py", "run", NodeKind::Function).with_complexity(2);
        let second = GraphNode::symbol("a.py", "run", NodeKind::Class).with_complexity(9);

        assert!(table.insert_if_absent(first));
        assert!(!table.insert_if_absent(second));

        let node = table.get("a.py:run").unwrap();
        assert_eq!(node.kind, NodeKind::Function);
        assert_eq!(node.cognitive_complexity, Some(2));
    }

    #[test]
    fn test_merge_only_upgrades() {
        let mut table = SymbolTable::new();
        table.merge(GraphNode::symbol("a.ts", "f", NodeKind::Function).with_complexity(4));

        let later = GraphNode::symbol("a.ts", "f", NodeKind::Variable)
            .exported(true)
            .with_loc(SourceSpan::new(1, 0, 3, 1))
            .with_complexity(0);
        assert_eq!(table.merge(later), MergeOutcome::Patched);

        let node = table.get("a.ts:f").unwrap();
        assert_eq!(node.kind, NodeKind::Function);
        assert!(node.is_exported);
        assert_eq!(node.loc, Some(SourceSpan::new(1, 0, 3, 1)));
        assert_eq!(node.cognitive_complexity, Some(4));
        assert_eq!(table.len(), 1);

        table.merge(GraphNode::symbol("a.ts", "f", NodeKind::Function));
        assert!(table.get("a.ts:f").unwrap().is_exported);
    }

    #[test]
    fn test_add_edge_mirrors_onto_files() {
        let mut table = SymbolTable::new();
        table.merge(GraphNode::file("a.ts", None));
        table.merge(GraphNode::file("b.ts", None));
        table.merge(GraphNode::symbol("a.ts", "f", NodeKind::Function));
        table.merge(GraphNode::symbol("b.ts", "g", NodeKind::Function));

        assert!(table.add_edge(&NodeId::from("b.ts:g"), &NodeId::from("a.ts:f")));

        assert_eq!(table.get("b.ts:g").unwrap().dependencies, vec![NodeId::from("a.ts:f")]);
        assert_eq!(table.get("a.ts:f").unwrap().dependents, vec![NodeId::from("b.ts:g")]);
        assert_eq!(table.get("b.ts").unwrap().dependencies, vec![NodeId::from("a.ts:f")]);
        assert_eq!(table.get("a.ts").unwrap().dependents, vec![NodeId::from("b.ts:g")]);
    }

    #[test]
    fn test_add_edge_tolerates_unknown_and_self() {
        let mut table = SymbolTable::new();
        table.merge(GraphNode::file("a.ts", None));

        assert!(!table.add_edge(&NodeId::from("a.ts"), &NodeId::from("missing.ts")));
        assert!(!table.add_edge(&NodeId::from("a.ts"), &NodeId::from("a.ts")));
        assert!(table.get("a.ts").unwrap().dependencies.is_empty());
    }

    #[test]
    fn test_dedup_keeps_first_occurrence_order() {
        let mut table = SymbolTable::new();
        table.merge(GraphNode::file("a.ts", None));
        table.merge(GraphNode::file("b.ts", None));
        table.merge(GraphNode::file("c.ts", None));
        let a = NodeId::from("a.ts");
        table.add_edge(&a, &NodeId::from("c.ts"));
        table.add_edge(&a, &NodeId::from("b.ts"));
        table.add_edge(&a, &NodeId::from("c.ts"));

        table.dedup_edges();

        assert_eq!(
            table.get("a.ts").unwrap().dependencies,
            vec![NodeId::from("c.ts"), NodeId::from("b.ts")]
        );
        assert_eq!(table.get("c.ts").unwrap().dependents, vec![a]);
    }
}
