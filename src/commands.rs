//! CLI command implementations

use anyhow::Context;
use ignore::WalkBuilder;
use std::fs;
use std::path::Path;
use thicket_core::{SourceFile, TreeNode};
use thicket_indexer::{Coordinator, IndexerConfig, ProjectAnalysis, Strategy};

pub fn analyze(root: &Path, config: Option<&Path>, output: Option<&Path>, pretty: bool) -> anyhow::Result<()> {
    let analysis = run(root, config)?;
    let json = analysis.tree.to_json(pretty)?;

    match output {
        Some(path) => {
            fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
            tracing::info!("Wrote project tree to {}", path.display());
        }
        None => println!("{}", json),
    }
    Ok(())
}

pub fn report(root: &Path, config: Option<&Path>, top: usize) -> anyhow::Result<()> {
    let analysis = run(root, config)?;
    print!("{}", render_report(&analysis, top));
    Ok(())
}

pub fn languages(config: Option<&Path>) -> anyhow::Result<()> {
    let config = match config {
        Some(path) => IndexerConfig::load(path)?,
        None => IndexerConfig::default(),
    };
    let coordinator = Coordinator::new(config)?;
    let registry = coordinator.registry();

    for ext in registry.extensions() {
        let description = match (registry.alias_of(ext), registry.lookup(ext)) {
            (Some(target), _) => format!("alias of .{}", target),
            (None, Some(Strategy::Script(dialect))) => format!("syntax tree ({})", dialect.name()),
            (None, Some(Strategy::Patterns(rules))) => {
                format!("patterns ({}, {:?} blocks)", rules.language, rules.block_style)
            }
            (None, None) => continue,
        };
        println!(".{:<6} {}", ext, description);
    }
    Ok(())
}

/// Load config, acquire files, analyze.
fn run(root: &Path, config: Option<&Path>) -> anyhow::Result<ProjectAnalysis> {
    let mut config = load_config(root, config)?;
    if config.root_name.is_none() {
        config.root_name = project_name(root);
    }

    tracing::info!("Analyzing {}", root.display());
    let coordinator = Coordinator::new(config)?;
    let files = collect_sources(root, &coordinator)?;
    let analysis = coordinator.run(files);

    let summary = &analysis.summary;
    tracing::info!(
        "Analyzed {} files, {} symbols, {} file edges ({} cyclic files, {} unused exports)",
        summary.files,
        summary.symbols,
        summary.file_edges,
        summary.cyclic_files,
        summary.unused_exports
    );
    Ok(analysis)
}

pub fn load_config(root: &Path, explicit: Option<&Path>) -> anyhow::Result<IndexerConfig> {
    let config = match explicit {
        Some(path) => IndexerConfig::load(path),
        None => IndexerConfig::discover(root),
    };
    config.context("Failed to load configuration")
}

fn project_name(root: &Path) -> Option<String> {
    let canonical = root.canonicalize().ok()?;
    canonical.file_name()?.to_str().map(str::to_string)
}

/// Read every admitted file under `root`, honoring ignore files.
///
/// Paths are relative to `root` and `/`-separated. Oversized and non-UTF-8
/// files are skipped with a warning.
pub fn collect_sources(root: &Path, coordinator: &Coordinator) -> anyhow::Result<Vec<SourceFile>> {
    let max_bytes = coordinator.config().max_file_bytes;
    let mut files = Vec::new();

    for entry in WalkBuilder::new(root).build() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!("Cannot read entry: {}", e);
                continue;
            }
        };
        if !entry.file_type().is_some_and(|t| t.is_file()) {
            continue;
        }

        let Some(relative) = relative_path(root, entry.path()) else {
            continue;
        };
        if !coordinator.admits(&relative) {
            continue;
        }

        if let Some(max) = max_bytes {
            let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
            if size > max {
                tracing::warn!("Skipping {}: {} bytes exceeds limit of {}", relative, size, max);
                continue;
            }
        }

        let bytes = match fs::read(entry.path()) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!("Cannot read {}: {}", relative, e);
                continue;
            }
        };
        match String::from_utf8(bytes) {
            Ok(content) => files.push(SourceFile::new(relative, content)),
            Err(_) => tracing::warn!("Skipping {}: not valid UTF-8", relative),
        }
    }

    files.sort_by(|a, b| a.path.cmp(&b.path));
    tracing::debug!("Collected {} source files", files.len());
    Ok(files)
}

fn relative_path(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let segments: Vec<&str> = relative
        .components()
        .map(|c| c.as_os_str().to_str())
        .collect::<Option<_>>()?;
    (!segments.is_empty()).then(|| segments.join("/"))
}

pub fn render_report(analysis: &ProjectAnalysis, top: usize) -> String {
    let tree = &analysis.tree;
    let summary = &analysis.summary;
    let mut out = String::new();

    out.push_str(&format!(
        "{}: {} files, {} symbols, {} file edges\n",
        tree.name, summary.files, summary.symbols, summary.file_edges
    ));

    section(&mut out, "Cyclic files", &tree.cyclic_files(), |n| n.id.to_string());
    section(&mut out, "Unused exports", &tree.unused_exports(), |n| {
        format!("{} ({})", n.id, kind_label(n))
    });
    section(&mut out, "Complexity hotspots", &tree.complexity_hotspots(top), |n| {
        format!("{:>4}  {}", n.cognitive_complexity.unwrap_or(0), n.id)
    });
    section(&mut out, "Most unstable files", &tree.unstable_files(top), |n| {
        format!("{:.2}  {}", n.instability.unwrap_or(0.0), n.id)
    });
    out
}

fn section(out: &mut String, title: &str, nodes: &[&TreeNode], line: impl Fn(&TreeNode) -> String) {
    out.push_str(&format!("\n{} ({})\n", title, nodes.len()));
    for node in nodes {
        out.push_str("  ");
        out.push_str(&line(node));
        out.push('\n');
    }
}

fn kind_label(node: &TreeNode) -> String {
    serde_json::to_value(node.kind)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &TempDir, path: &str, content: &[u8]) {
        let full = dir.path().join(path);
        fs::create_dir_all(full.parent().unwrap()).unwrap();
        fs::write(full, content).unwrap();
    }

    #[test]
    fn test_collect_sources_filters_and_normalizes() {
        let dir = TempDir::new().unwrap();
        write(&dir, "src/a.ts", b"export const a = 1;");
        write(&dir, "src/deep/b.py", b"def b():\n    pass\n");
        write(&dir, "notes.txt", b"not code");
        write(&dir, "bin/blob.c", &[0xff, 0xfe, 0x00]);

        let coordinator = Coordinator::new(IndexerConfig::default()).unwrap();
        let files = collect_sources(dir.path(), &coordinator).unwrap();
        let paths: Vec<&str> = files.iter().map(|f| f.path.as_str()).collect();

        assert_eq!(paths, vec!["src/a.ts", "src/deep/b.py"]);
    }

    #[test]
    fn test_collect_sources_respects_limits_and_excludes() {
        let dir = TempDir::new().unwrap();
        write(&dir, "small.c", b"int f(void) { return 0; }");
        write(&dir, "big.c", &[b' '; 4096]);
        write(&dir, "gen/out.js", b"export const x = 1;");

        let config = IndexerConfig {
            max_file_bytes: Some(1024),
            exclude: vec!["gen/**".to_string()],
            ..Default::default()
        };
        let coordinator = Coordinator::new(config).unwrap();
        let files = collect_sources(dir.path(), &coordinator).unwrap();
        let paths: Vec<&str> = files.iter().map(|f| f.path.as_str()).collect();

        assert_eq!(paths, vec!["small.c"]);
    }

    #[test]
    fn test_config_discovery() {
        let dir = TempDir::new().unwrap();
        assert!(load_config(dir.path(), None).unwrap().parallel);

        write(&dir, "thicket.toml", b"parallel = false\nroot_name = \"demo\"\n");
        let config = load_config(dir.path(), None).unwrap();
        assert!(!config.parallel);
        assert_eq!(config.root_name(), "demo");

        write(&dir, "broken.toml", b"parallel = ");
        assert!(load_config(dir.path(), Some(&dir.path().join("broken.toml"))).is_err());
    }

    #[test]
    fn test_report_lists_findings() {
        let dir = TempDir::new().unwrap();
        write(&dir, "p.py", b"import q\n");
        write(&dir, "q.py", b"import p\n");
        write(&dir, "a.ts", b"export function f(){ if (x) { for(;;){} } }");

        let coordinator = Coordinator::new(IndexerConfig::default()).unwrap();
        let analysis = coordinator.run(collect_sources(dir.path(), &coordinator).unwrap());
        let report = render_report(&analysis, 5);

        assert!(report.contains("Cyclic files (2)\n  p.py\n  q.py\n"));
        assert!(report.contains("Unused exports (1)\n  a.ts:f (function)\n"));
        assert!(report.contains("   3  a.ts:f"));
    }
}
