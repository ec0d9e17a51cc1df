//! Core data structures for the symbol/dependency graph

use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Unique identifier for a node.
///
/// Files are addressed by their path, symbols by `<path>:<name>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub String);

impl NodeId {
    pub fn file(path: &str) -> Self {
        NodeId(path.to_string())
    }

    pub fn symbol(path: &str, name: &str) -> Self {
        NodeId(format!("{}:{}", path, name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for NodeId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for NodeId {
    fn from(value: &str) -> Self {
        NodeId(value.to_string())
    }
}

/// Discriminates what kind of entity a node represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    // ── Structural ──────────────────────────────────────────
    Directory,
    File,

    // ── Declared entities ───────────────────────────────────
    Function,
    Class,
    Struct,
    Interface,
    Protocol,
    Enum,
    Variable,
    /// Arrow or anonymous function bound to an identifier.
    ArrowFunction,
}

impl NodeKind {
    pub fn is_symbol(self) -> bool {
        !matches!(self, NodeKind::Directory | NodeKind::File)
    }

    /// Kinds that carry a cognitive-complexity score.
    pub fn is_callable(self) -> bool {
        matches!(self, NodeKind::Function | NodeKind::ArrowFunction)
    }
}

/// Source-location span. Lines are 1-based, columns 0-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceSpan {
    pub start_line: u32,
    pub start_column: u32,
    pub end_line: u32,
    pub end_column: u32,
}

impl SourceSpan {
    pub fn new(start_line: u32, start_column: u32, end_line: u32, end_column: u32) -> Self {
        SourceSpan {
            start_line,
            start_column,
            end_line,
            end_column,
        }
    }

    /// True if the position lies inside this span (inclusive on both ends).
    pub fn contains(&self, line: u32, column: u32) -> bool {
        (self.start_line, self.start_column) <= (line, column)
            && (line, column) <= (self.end_line, self.end_column)
    }
}

/// One (path, content) pair handed over by the acquisition layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: String,
    pub content: String,
}

impl SourceFile {
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        SourceFile {
            path: path.into(),
            content: content.into(),
        }
    }
}

/// A file or symbol node in the identifier map.
///
/// Directory nodes never live here; they only exist in the assembled tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: NodeId,
    pub kind: NodeKind,
    /// Display name. For symbols this may differ from the in-file name
    /// (default exports keep `default` in the id but show the declaration's name).
    pub name: String,
    pub file_path: String,
    pub language: Option<String>,
    /// Raw import strings, files only, captured before resolution.
    pub imports: Vec<String>,
    pub dependencies: Vec<NodeId>,
    pub dependents: Vec<NodeId>,
    pub is_exported: bool,
    pub loc: Option<SourceSpan>,
    pub cognitive_complexity: Option<u32>,
    pub is_unused: Option<bool>,
    pub is_cyclic: Option<bool>,
    pub instability: Option<f64>,
}

impl GraphNode {
    pub fn file(path: &str, language: Option<&str>) -> Self {
        let name = path.rsplit('/').next().unwrap_or(path).to_string();
        GraphNode {
            id: NodeId::file(path),
            kind: NodeKind::File,
            name,
            file_path: path.to_string(),
            language: language.map(str::to_string),
            imports: Vec::new(),
            dependencies: Vec::new(),
            dependents: Vec::new(),
            is_exported: false,
            loc: None,
            cognitive_complexity: None,
            is_unused: None,
            is_cyclic: None,
            instability: None,
        }
    }

    pub fn symbol(path: &str, name: &str, kind: NodeKind) -> Self {
        GraphNode {
            id: NodeId::symbol(path, name),
            kind,
            name: name.to_string(),
            file_path: path.to_string(),
            language: None,
            imports: Vec::new(),
            dependencies: Vec::new(),
            dependents: Vec::new(),
            is_exported: false,
            loc: None,
            cognitive_complexity: None,
            is_unused: None,
            is_cyclic: None,
            instability: None,
        }
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn exported(mut self, is_exported: bool) -> Self {
        self.is_exported = is_exported;
        self
    }

    pub fn with_loc(mut self, loc: SourceSpan) -> Self {
        self.loc = Some(loc);
        self
    }

    pub fn with_complexity(mut self, score: u32) -> Self {
        self.cognitive_complexity = Some(score);
        self
    }

    pub fn is_file(&self) -> bool {
        self.kind == NodeKind::File
    }
}
