//! Thicket Core: identifier map, file graph, analysis passes and tree assembly

pub mod analysis;
pub mod error;
pub mod graph;
pub mod model;
pub mod symbols;
pub mod tree;


pub use analysis::{analyze, AnalysisSummary};
pub use error::CoreError;
pub use graph::FileGraph;
pub use model::{GraphNode, NodeId, NodeKind, SourceFile, SourceSpan};
pub use symbols::{MergeOutcome, SymbolTable};
pub use tree::{assemble, TreeNode, ROOT_ID};
