//! Cognitive-complexity scoring.
//!
//! Script functions get an exact score from their syntax tree
//! ([`cognitive`]). Pattern-based functions get an approximation from raw
//! text, chosen by the language's block style:
//! - [`indentation`] for significant-whitespace languages
//! - [`braces`] for brace-delimited languages

pub mod braces;
pub mod cognitive;
pub mod indentation;

use crate::registry::{BlockStyle, RuleSet};

/// Approximate score for a pattern-matched function whose name capture ends
/// at byte offset `name_end`.
pub fn approximate(rules: &RuleSet, source: &str, name: &str, name_end: usize) -> u32 {
    match rules.block_style {
        BlockStyle::Braces => braces::score(source, name_end, name),
        BlockStyle::Indentation => {
            let keyword = rules.definition_keyword.as_deref().unwrap_or("def");
            indentation::score(source, name, keyword)
        }
    }
}

/// Identifier-like words of a line with their byte offsets.
pub(crate) fn words(line: &str) -> impl Iterator<Item = (usize, &str)> + '_ {
    let mut start: Option<usize> = None;
    let mut chars = line.char_indices().chain(std::iter::once((line.len(), ' ')));
    std::iter::from_fn(move || {
        for (i, c) in chars.by_ref() {
            let is_word = c.is_alphanumeric() || c == '_';
            match (start, is_word) {
                (None, true) => start = Some(i),
                (Some(s), false) => {
                    start = None;
                    return Some((s, &line[s..i]));
                }
                _ => {}
            }
        }
        None
    })
}
