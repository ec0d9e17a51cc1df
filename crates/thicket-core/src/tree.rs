//! Directory → file → symbol tree assembly and read-only queries over it

use crate::error::CoreError;
use crate::model::{GraphNode, NodeId, NodeKind, SourceSpan};
use crate::symbols::SymbolTable;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashMap;

/// Identifier of the root directory node.
pub const ROOT_ID: &str = "/";

/// A node of the assembled Project Tree.
///
/// The tree is an immutable snapshot once [`assemble`] returns.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeNode {
    pub id: NodeId,
    pub name: String,
    pub kind: NodeKind,
    pub path: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TreeNode>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub imports: Vec<String>,
    pub dependencies: Vec<NodeId>,
    pub dependents: Vec<NodeId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    pub is_exported: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loc: Option<SourceSpan>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cognitive_complexity: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_unused: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_cyclic: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instability: Option<f64>,
}

impl TreeNode {
    fn directory(path: &str, name: &str) -> Self {
        let id = if path.is_empty() {
            NodeId::from(ROOT_ID)
        } else {
            NodeId::from(path)
        };
        TreeNode {
            id,
            name: name.to_string(),
            kind: NodeKind::Directory,
            path: path.to_string(),
            children: Vec::new(),
            imports: Vec::new(),
            dependencies: Vec::new(),
            dependents: Vec::new(),
            language: None,
            is_exported: false,
            loc: None,
            cognitive_complexity: None,
            is_unused: None,
            is_cyclic: None,
            instability: None,
        }
    }

    fn from_graph_node(node: GraphNode) -> Self {
        TreeNode {
            id: node.id,
            name: node.name,
            kind: node.kind,
            path: node.file_path,
            children: Vec::new(),
            imports: node.imports,
            dependencies: node.dependencies,
            dependents: node.dependents,
            language: node.language,
            is_exported: node.is_exported,
            loc: node.loc,
            cognitive_complexity: node.cognitive_complexity,
            is_unused: node.is_unused,
            is_cyclic: node.is_cyclic,
            instability: node.instability,
        }
    }

    /// Pre-order traversal of this node and every descendant.
    pub fn walk(&self) -> TreeWalk<'_> {
        TreeWalk { stack: vec![self] }
    }

    pub fn find_by_id(&self, id: &str) -> Option<&TreeNode> {
        self.walk().find(|n| n.id.as_str() == id)
    }

    pub fn find_by_name<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a TreeNode> + 'a {
        self.walk().filter(move |n| n.name == name)
    }

    pub fn files(&self) -> impl Iterator<Item = &TreeNode> {
        self.walk().filter(|n| n.kind == NodeKind::File)
    }

    pub fn cyclic_files(&self) -> Vec<&TreeNode> {
        self.files().filter(|n| n.is_cyclic == Some(true)).collect()
    }

    pub fn unused_exports(&self) -> Vec<&TreeNode> {
        self.walk().filter(|n| n.is_unused == Some(true)).collect()
    }

    /// Scored symbols, highest complexity first; ties broken by identifier.
    pub fn complexity_hotspots(&self, limit: usize) -> Vec<&TreeNode> {
        let mut scored: Vec<&TreeNode> = self
            .walk()
            .filter(|n| n.cognitive_complexity.is_some())
            .collect();
        scored.sort_by(|a, b| {
            b.cognitive_complexity
                .cmp(&a.cognitive_complexity)
                .then_with(|| a.id.cmp(&b.id))
        });
        scored.truncate(limit);
        scored
    }

    /// Files by instability, most unstable first; ties broken by identifier.
    pub fn unstable_files(&self, limit: usize) -> Vec<&TreeNode> {
        let mut files: Vec<&TreeNode> = self.files().filter(|n| n.instability.is_some()).collect();
        files.sort_by(|a, b| {
            b.instability
                .partial_cmp(&a.instability)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        files.truncate(limit);
        files
    }

    pub fn to_json(&self, pretty: bool) -> Result<String, CoreError> {
        let json = if pretty {
            serde_json::to_string_pretty(self)?
        } else {
            serde_json::to_string(self)?
        };
        Ok(json)
    }

    fn sort_recursive(&mut self) {
        if self.kind != NodeKind::Directory {
            return;
        }
        self.children.sort_by(directory_order);
        for child in &mut self.children {
            child.sort_recursive();
        }
    }
}

/// Directories before files, then alphabetical by name.
fn directory_order(a: &TreeNode, b: &TreeNode) -> Ordering {
    let rank = |n: &TreeNode| u8::from(n.kind != NodeKind::Directory);
    rank(a).cmp(&rank(b)).then_with(|| a.name.cmp(&b.name))
}

/// Pre-order iterator over a [`TreeNode`], driven by an explicit stack.
pub struct TreeWalk<'a> {
    stack: Vec<&'a TreeNode>,
}

impl<'a> Iterator for TreeWalk<'a> {
    type Item = &'a TreeNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children.iter().rev());
        Some(node)
    }
}

/// Build the Project Tree from a fully analyzed identifier map.
///
/// Every file path is split on `/`; each leading segment becomes a directory
/// created at most once per parent. Symbols hang off their owning file in
/// first-encounter order.
pub fn assemble(table: SymbolTable, root_name: &str) -> TreeNode {
    let mut files: Vec<TreeNode> = Vec::new();
    let mut file_slots: HashMap<String, usize> = HashMap::new();
    let mut orphans: Vec<GraphNode> = Vec::new();

    for node in table.into_nodes() {
        if node.is_file() {
            file_slots.insert(node.file_path.clone(), files.len());
            files.push(TreeNode::from_graph_node(node));
        } else if let Some(&slot) = file_slots.get(&node.file_path) {
            files[slot].children.push(TreeNode::from_graph_node(node));
        } else {
            orphans.push(node);
        }
    }
    // Symbols registered before their file node.
    for node in orphans {
        match file_slots.get(&node.file_path) {
            Some(&slot) => files[slot].children.push(TreeNode::from_graph_node(node)),
            None => tracing::warn!("symbol {} has no file node, dropping it", node.id),
        }
    }

    let mut root = TreeNode::directory("", root_name);
    for file in files {
        insert_file(&mut root, file);
    }
    root.sort_recursive();
    root
}

fn insert_file(root: &mut TreeNode, file: TreeNode) {
    let segments: Vec<&str> = file.path.split('/').filter(|s| !s.is_empty()).collect();
    let Some((_, dirs)) = segments.split_last() else {
        return;
    };

    let mut current = root;
    let mut prefix = String::new();
    for segment in dirs {
        if !prefix.is_empty() {
            prefix.push('/');
        }
        prefix.push_str(segment);

        let pos = current
            .children
            .iter()
            .position(|c| c.kind == NodeKind::Directory && c.name == *segment);
        let pos = match pos {
            Some(pos) => pos,
            None => {
                current.children.push(TreeNode::directory(&prefix, segment));
                current.children.len() - 1
            }
        };
        current = &mut current.children[pos];
    }
    current.children.push(file);
}
