//! Extraction strategies

pub mod pattern;
pub mod script;

pub use pattern::PatternExtractor;
pub use script::{collect_import_sites, ImportBinding, ImportSite, ImportedName, ScriptExtractor};

use thicket_core::SourceSpan;
use tree_sitter::Node;

/// Span of a syntax node. Lines are 1-based, columns 0-based.
pub(crate) fn span_of(node: Node<'_>) -> SourceSpan {
    let start = node.start_position();
    let end = node.end_position();
    SourceSpan::new(
        start.row as u32 + 1,
        start.column as u32,
        end.row as u32 + 1,
        end.column as u32,
    )
}

/// Byte offset → line/column lookup for raw text.
pub(crate) struct LineIndex {
    starts: Vec<usize>,
}

impl LineIndex {
    pub fn new(text: &str) -> Self {
        let starts = std::iter::once(0)
            .chain(text.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        LineIndex { starts }
    }

    /// (1-based line, 0-based byte column)
    pub fn position(&self, offset: usize) -> (u32, u32) {
        let line = self.starts.partition_point(|&start| start <= offset).saturating_sub(1);
        let column = offset - self.starts[line];
        (line as u32 + 1, column as u32)
    }

    pub fn span(&self, start: usize, end: usize) -> SourceSpan {
        let (start_line, start_column) = self.position(start);
        let (end_line, end_column) = self.position(end);
        SourceSpan::new(start_line, start_column, end_line, end_column)
    }
}
