//! Language extractor trait definition

use thicket_core::SymbolTable;
use tree_sitter::Tree;

/// Syntax tree kept for the linker's second walk over a script file.
#[derive(Debug)]
pub struct ParsedScript {
    pub tree: Tree,
    pub source: String,
}

/// Everything one file contributes before linking.
#[derive(Debug, Default)]
pub struct ExtractionResult {
    /// Symbol nodes declared in the file, in first-encounter order.
    pub symbols: SymbolTable,
    /// Raw import strings, before resolution.
    pub imports: Vec<String>,
    pub script: Option<ParsedScript>,
}

/// Per-file extraction. Implementations never touch other files' state, so
/// files can be extracted concurrently and merged afterwards.
pub trait LanguageExtractor: Send + Sync {
    fn extract(&self, path: &str, source: &str) -> anyhow::Result<ExtractionResult>;
}
