//! Derived annotations over the fully linked identifier map

use crate::graph::FileGraph;
use crate::model::NodeId;
use crate::symbols::SymbolTable;
use serde::Serialize;

/// Counts reported by [`analyze`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisSummary {
    pub files: usize,
    pub symbols: usize,
    pub file_edges: usize,
    pub cyclic_files: usize,
    pub unused_exports: usize,
}

/// Run every analysis pass. Must only be called after linking completes.
pub fn analyze(table: &mut SymbolTable) -> AnalysisSummary {
    table.dedup_edges();
    let unused_exports = mark_unused_exports(table);
    compute_instability(table);
    let (file_edges, cyclic_files) = mark_cycles(table);

    let files = table.files().count();
    let summary = AnalysisSummary {
        files,
        symbols: table.len() - files,
        file_edges,
        cyclic_files,
        unused_exports,
    };
    tracing::debug!(?summary, "analysis complete");
    summary
}

/// An exported symbol is unused iff no dependent lives in another file.
/// Returns the number of symbols marked unused.
pub fn mark_unused_exports(table: &mut SymbolTable) -> usize {
    let verdicts: Vec<(NodeId, bool)> = table
        .iter()
        .filter(|n| !n.is_file() && n.is_exported)
        .map(|symbol| {
            let used_elsewhere = symbol.dependents.iter().any(|dep| {
                table
                    .get(dep.as_str())
                    .is_some_and(|d| d.file_path != symbol.file_path)
            });
            (symbol.id.clone(), !used_elsewhere)
        })
        .collect();

    let mut unused = 0;
    for (id, is_unused) in verdicts {
        if let Some(node) = table.get_mut(id.as_str()) {
            node.is_unused = Some(is_unused);
            unused += usize::from(is_unused);
        }
    }
    unused
}

/// Set `instability = Ce / (Ca + Ce)` on every file, counting only
/// file-level identifiers. Zero edges yields 0.
pub fn compute_instability(table: &mut SymbolTable) {
    let scores: Vec<(NodeId, f64)> = table
        .files()
        .map(|file| {
            let afferent = count_file_edges(table, &file.dependents);
            let efferent = count_file_edges(table, &file.dependencies);
            (file.id.clone(), instability(afferent, efferent))
        })
        .collect();

    for (id, score) in scores {
        if let Some(node) = table.get_mut(id.as_str()) {
            node.instability = Some(score);
        }
    }
}

pub fn instability(afferent: usize, efferent: usize) -> f64 {
    let total = afferent + efferent;
    if total == 0 {
        0.0
    } else {
        efferent as f64 / total as f64
    }
}

fn count_file_edges(table: &SymbolTable, ids: &[NodeId]) -> usize {
    ids.iter().filter(|id| table.is_file(id.as_str())).count()
}

/// Flag every file with `is_cyclic`. Returns (file edge count, cyclic count).
pub fn mark_cycles(table: &mut SymbolTable) -> (usize, usize) {
    let graph = FileGraph::from_table(table);
    let cyclic = graph.cyclic_files();

    for file in table.iter_mut().filter(|n| n.is_file()) {
        file.is_cyclic = Some(cyclic.contains(&file.id));
    }
    tracing::debug!(files = graph.node_count(), cyclic = cyclic.len(), "cycle detection done");
    (graph.edge_count(), cyclic.len())
}
