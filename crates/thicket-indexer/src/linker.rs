//! Import resolution and edge building
//!
//! Runs after every file has been extracted, so every declaration it may
//! link to is already in the identifier map.

use std::collections::{HashMap, HashSet};

use thicket_core::{NodeId, SourceSpan, SymbolTable};
use tree_sitter::Node;

use crate::extractor::ParsedScript;
use crate::languages::script::DEFAULT_EXPORT;
use crate::languages::{collect_import_sites, ImportSite, ImportedName};
use crate::registry::{RuleSet, SCRIPT_EXTENSIONS};

/// Identifier kinds that can be a use of an imported binding.
const USE_KINDS: &[&str] = &["identifier", "type_identifier", "shorthand_property_identifier"];

/// Counts reported by [`Linker::link`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkStats {
    pub file_edges: usize,
    pub symbol_edges: usize,
    pub unresolved: usize,
}

/// Located symbols per file path, in first-encounter order.
type SpanIndex = HashMap<String, Vec<(NodeId, SourceSpan)>>;

/// How one file's imports are linked.
pub enum LinkSource<'a> {
    Script(&'a ParsedScript),
    Patterns(&'a RuleSet),
}

pub struct Linker<'a> {
    /// Known file paths in admission order.
    files: &'a [String],
    known: HashSet<&'a str>,
}

impl<'a> Linker<'a> {
    pub fn new(files: &'a [String]) -> Self {
        let known = files.iter().map(String::as_str).collect();
        Self { files, known }
    }

    /// Link every file in `sources` into `table`.
    pub fn link(&self, table: &mut SymbolTable, sources: &HashMap<String, LinkSource<'_>>) -> LinkStats {
        let mut stats = LinkStats::default();
        let spans = span_index(table);
        for path in self.files {
            match sources.get(path) {
                Some(LinkSource::Script(script)) => {
                    let file_spans = spans.get(path.as_str()).map(Vec::as_slice).unwrap_or_default();
                    self.link_script(table, path, script, file_spans, &mut stats);
                }
                Some(LinkSource::Patterns(rules)) => self.link_patterns(table, path, rules, &mut stats),
                None => {}
            }
        }
        tracing::debug!(
            "linked {} file edges, {} symbol edges ({} imports unresolved)",
            stats.file_edges,
            stats.symbol_edges,
            stats.unresolved
        );
        stats
    }

    fn link_script(
        &self,
        table: &mut SymbolTable,
        path: &str,
        script: &ParsedScript,
        spans: &[(NodeId, SourceSpan)],
        stats: &mut LinkStats,
    ) {
        let root = script.tree.root_node();
        let source = script.source.as_bytes();
        let importer = NodeId::file(path);

        for site in collect_import_sites(root, source) {
            let Some(target) = self.resolve_script(path, &site.specifier) else {
                tracing::trace!("{}: unresolved import {}", path, site.specifier);
                stats.unresolved += 1;
                continue;
            };
            if table.add_edge(&importer, &NodeId::file(target)) {
                stats.file_edges += 1;
            }

            for binding in &site.bindings {
                let Some(use_site) = first_use(root, source, &binding.local, &site) else {
                    continue;
                };
                let from = enclosing_symbol(spans, use_site).unwrap_or_else(|| importer.clone());
                let to = match &binding.imported {
                    ImportedName::Named(name) => Some(NodeId::symbol(target, name)),
                    ImportedName::Default => Some(NodeId::symbol(target, DEFAULT_EXPORT)),
                    ImportedName::Namespace => None,
                }
                .filter(|id| table.contains(id.as_str()))
                .unwrap_or_else(|| NodeId::file(target));

                if table.add_edge(&from, &to) {
                    stats.symbol_edges += 1;
                }
            }
        }
    }

    fn link_patterns(&self, table: &mut SymbolTable, path: &str, rules: &RuleSet, stats: &mut LinkStats) {
        let importer = NodeId::file(path);
        let imports = table.get(path).map(|n| n.imports.clone()).unwrap_or_default();

        for raw in imports {
            let target = self.find_containing(path, &raw).or_else(|| {
                let translated = translate_module_path(&raw, rules.module_separator.as_deref()?)?;
                self.find_containing(path, &translated)
            });
            match target {
                Some(target) => {
                    if table.add_edge(&importer, &NodeId::file(target)) {
                        stats.file_edges += 1;
                    }
                }
                None => {
                    tracing::trace!("{}: unresolved import {}", path, raw);
                    stats.unresolved += 1;
                }
            }
        }
    }

    /// Resolve a script specifier to a known file.
    pub fn resolve_script(&self, importer: &str, specifier: &str) -> Option<&'a str> {
        if is_relative(specifier) {
            let base = join_relative(importer, specifier)?;
            return script_candidates(&base)
                .into_iter()
                .find_map(|candidate| self.known.get(candidate.as_str()).copied());
        }
        let first_segment = specifier.split('/').find(|s| !s.is_empty())?;
        self.find_containing(importer, first_segment)
    }

    /// First known file, other than `importer`, whose path contains `needle`.
    pub fn find_containing(&self, importer: &str, needle: &str) -> Option<&'a str> {
        let needle = needle.trim();
        if needle.is_empty() {
            return None;
        }
        self.files
            .iter()
            .map(String::as_str)
            .find(|file| *file != importer && file.contains(needle))
    }
}

fn is_relative(specifier: &str) -> bool {
    specifier == "." || specifier == ".." || specifier.starts_with("./") || specifier.starts_with("../")
}

/// Join `specifier` onto the importer's directory. `None` if it escapes the
/// project root.
fn join_relative(importer: &str, specifier: &str) -> Option<String> {
    let mut segments: Vec<&str> = importer.split('/').filter(|s| !s.is_empty()).collect();
    segments.pop();
    for segment in specifier.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop()?;
            }
            other => segments.push(other),
        }
    }
    Some(segments.join("/"))
}

/// Literal path, then implicit extensions, then an implicit index file.
fn script_candidates(base: &str) -> Vec<String> {
    let mut candidates = vec![base.to_string()];
    for (ext, _) in SCRIPT_EXTENSIONS {
        candidates.push(format!("{}.{}", base, ext));
    }
    for (ext, _) in SCRIPT_EXTENSIONS {
        candidates.push(format!("{}/index.{}", base, ext));
    }
    // Compiled-output specifiers written against TypeScript sources.
    for (emitted, sources) in [
        (".js", &["ts", "tsx"][..]),
        (".jsx", &["tsx"][..]),
        (".mjs", &["mts"][..]),
        (".cjs", &["cts"][..]),
    ] {
        if let Some(stem) = base.strip_suffix(emitted) {
            candidates.extend(sources.iter().map(|ext| format!("{}.{}", stem, ext)));
        }
    }
    candidates
}

/// `a.b.c` → `a/b/c` for a `.` separator. Leading separators (relative
/// imports) are dropped. `None` if there is nothing to translate.
pub fn translate_module_path(raw: &str, separator: &str) -> Option<String> {
    if separator.is_empty() || !raw.contains(separator) {
        return None;
    }
    let mut rest = raw;
    while let Some(stripped) = rest.strip_prefix(separator) {
        rest = stripped;
    }
    let translated: Vec<&str> = rest.split(separator).filter(|s| !s.is_empty()).collect();
    (!translated.is_empty()).then(|| translated.join("/"))
}

/// Position of the first use of `name` outside any import construct.
fn first_use(root: Node<'_>, source: &[u8], name: &str, site: &ImportSite) -> Option<(u32, u32)> {
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if node.kind() == "import_statement" || node.byte_range() == site.range {
            continue;
        }
        if USE_KINDS.contains(&node.kind()) && node.utf8_text(source).ok() == Some(name) {
            let start = node.start_position();
            return Some((start.row as u32 + 1, start.column as u32));
        }
        let mut cursor = node.walk();
        let children: Vec<Node<'_>> = node.children(&mut cursor).collect();
        stack.extend(children.into_iter().rev());
    }
    None
}

/// Built once per link pass; declarations do not move while edges are added.
fn span_index(table: &SymbolTable) -> SpanIndex {
    let mut index = SpanIndex::new();
    for node in table.iter().filter(|n| !n.is_file()) {
        if let Some(loc) = node.loc {
            index
                .entry(node.file_path.clone())
                .or_default()
                .push((node.id.clone(), loc));
        }
    }
    index
}

/// Innermost symbol whose span covers the position.
fn enclosing_symbol(spans: &[(NodeId, SourceSpan)], (line, column): (u32, u32)) -> Option<NodeId> {
    spans
        .iter()
        .filter(|(_, loc)| loc.contains(line, column))
        .max_by_key(|(_, loc)| (loc.start_line, loc.start_column))
        .map(|(id, _)| id.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn files(paths: &[&str]) -> Vec<String> {
        paths.iter().map(|p| p.to_string()).collect()
    }

    #[test]
    fn test_relative_resolution() {
        let known = files(&["src/a.ts", "src/lib/index.tsx", "src/util.ts", "web/main.js"]);
        let linker = Linker::new(&known);

        assert_eq!(linker.resolve_script("src/b.ts", "./a"), Some("src/a.ts"));
        assert_eq!(linker.resolve_script("src/b.ts", "./lib"), Some("src/lib/index.tsx"));
        assert_eq!(linker.resolve_script("src/lib/x.ts", "../util.js"), Some("src/util.ts"));
        assert_eq!(linker.resolve_script("web/x.js", "./main.js"), Some("web/main.js"));
        assert_eq!(linker.resolve_script("src/b.ts", "../../outside"), None);
        assert_eq!(linker.resolve_script("src/b.ts", "./missing"), None);
    }

    #[test]
    fn test_bare_specifier_matches_first_segment() {
        let known = files(&["src/b.ts", "packages/widgets/button.ts"]);
        let linker = Linker::new(&known);
        assert_eq!(
            linker.resolve_script("src/b.ts", "widgets/button"),
            Some("packages/widgets/button.ts")
        );
        assert_eq!(linker.resolve_script("src/b.ts", "src"), None);
    }

    #[test]
    fn test_module_path_translation() {
        assert_eq!(translate_module_path("pkg.utils.io", "."), Some("pkg/utils/io".to_string()));
        assert_eq!(translate_module_path("..models", "."), Some("models".to_string()));
        assert_eq!(translate_module_path("crate::graph", "::"), Some("crate/graph".to_string()));
        assert_eq!(translate_module_path("os", "."), None);
    }

    #[test]
    fn test_enclosing_symbol_prefers_innermost() {
        use thicket_core::{GraphNode, NodeKind};

        let mut table = SymbolTable::new();
        table.merge(GraphNode::file("a.ts", None));
        table.merge(GraphNode::symbol("a.ts", "Outer", NodeKind::Class).with_loc(SourceSpan::new(1, 0, 10, 1)));
        table.merge(GraphNode::symbol("a.ts", "Outer.run", NodeKind::Function).with_loc(SourceSpan::new(2, 2, 5, 3)));
        table.merge(GraphNode::symbol("b.ts", "far", NodeKind::Function).with_loc(SourceSpan::new(1, 0, 99, 0)));

        let index = span_index(&table);
        assert_eq!(index["b.ts"].len(), 1);
        let spans = index["a.ts"].as_slice();
        assert_eq!(spans.len(), 2);
        assert_eq!(enclosing_symbol(spans, (3, 4)).as_ref().map(NodeId::as_str), Some("a.ts:Outer.run"));
        assert_eq!(enclosing_symbol(spans, (8, 0)).as_ref().map(NodeId::as_str), Some("a.ts:Outer"));
        assert_eq!(enclosing_symbol(spans, (12, 0)), None);
    }

    #[test]
    fn test_join_relative() {
        assert_eq!(join_relative("a/b/c.ts", "../d").as_deref(), Some("a/d"));
        assert_eq!(join_relative("c.ts", "./d/./e").as_deref(), Some("d/e"));
        assert_eq!(join_relative("c.ts", "../d"), None);
    }
}
