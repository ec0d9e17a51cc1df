//! Pattern-based extractor driven by a language's rule set

use std::sync::Arc;

use anyhow::Result;
use thicket_core::{GraphNode, NodeId, NodeKind, SymbolTable};

use super::LineIndex;
use crate::complexity;
use crate::extractor::{ExtractionResult, LanguageExtractor};
use crate::registry::RuleSet;

/// Function captures that are really control flow (`if (x) {` looks like a
/// C function signature).
pub const CONTROL_KEYWORDS: &[&str] = &[
    "if", "for", "while", "switch", "catch", "return", "else", "sizeof", "new",
];

pub struct PatternExtractor {
    rules: Arc<RuleSet>,
}

impl PatternExtractor {
    pub fn new(rules: Arc<RuleSet>) -> Self {
        Self { rules }
    }
}

impl LanguageExtractor for PatternExtractor {
    fn extract(&self, path: &str, source: &str) -> Result<ExtractionResult> {
        let lines = LineIndex::new(source);
        let mut symbols = SymbolTable::new();
        let mut imports = Vec::new();

        for rule in &self.rules.rules {
            let kind = rule.category.node_kind();
            for pattern in &rule.patterns {
                for captures in pattern.captures_iter(source) {
                    let Some(capture) = captures.get(1) else {
                        continue;
                    };
                    let name = capture.as_str().trim();
                    if name.is_empty() {
                        continue;
                    }

                    let Some(kind) = kind else {
                        imports.push(name.to_string());
                        continue;
                    };
                    if kind == NodeKind::Function && CONTROL_KEYWORDS.contains(&name) {
                        continue;
                    }
                    // First match wins.
                    if symbols.contains(NodeId::symbol(path, name).as_str()) {
                        continue;
                    }

                    let whole = captures.get(0).unwrap_or(capture);
                    let mut node = GraphNode::symbol(path, name, kind)
                        .with_loc(lines.span(whole.start(), whole.end()));
                    if kind == NodeKind::Function {
                        node = node.with_complexity(complexity::approximate(
                            &self.rules,
                            source,
                            name,
                            capture.end(),
                        ));
                    }
                    symbols.insert_if_absent(node);
                }
            }
        }

        tracing::trace!(
            "{}: {} symbols, {} imports ({})",
            path,
            symbols.len(),
            imports.len(),
            self.rules.language
        );

        Ok(ExtractionResult {
            symbols,
            imports,
            script: None,
        })
    }
}
