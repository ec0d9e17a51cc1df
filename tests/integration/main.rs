//! Integration tests for Thicket
//!
//! These tests run the whole pipeline through the public API and the CLI.

use std::fs;
use std::process::Command;

use tempfile::TempDir;
use thicket_core::{NodeKind, SourceFile, TreeNode};
use thicket_indexer::{analyze_project, IndexerConfig, ProjectAnalysis};

fn analyze(files: &[(&str, &str)]) -> ProjectAnalysis {
    let files = files
        .iter()
        .map(|(path, content)| SourceFile::new(*path, *content))
        .collect();
    analyze_project(files, IndexerConfig::default()).expect("analysis setup failed")
}

fn find<'a>(tree: &'a TreeNode, id: &str) -> &'a TreeNode {
    tree.find_by_id(id).unwrap_or_else(|| panic!("missing node {}", id))
}

/// `import p` resolves to the first admitted path containing `p`, so `p.py`
/// and `q.py` come ahead of every other `.py` file here and in sorted order.
fn mixed_project() -> Vec<(&'static str, &'static str)> {
    vec![
        ("p.py", "import q\n"),
        ("q.py", "import p\n"),
        ("r.py", "value = 1\n"),
        ("web/a.ts", "export function f(){ if (x) { for(;;){} } }"),
        ("web/b.ts", "import {f} from './a'; f();"),
        ("tools/x.py", "def g():\n    if a:\n        for i in y:\n            pass"),
        ("native/m.c", "int h(int n){ if(n>0){ return h(n-1); } return 0; }"),
    ]
}

/// Exact complexity, symbol edge and export usage across two script files
#[test]
fn test_script_scenario() {
    let result = analyze(&[
        ("a.ts", "export function f(){ if (x) { for(;;){} } }"),
        ("b.ts", "import {f} from './a'; f();"),
    ]);
    let f = find(&result.tree, "a.ts:f");
    assert_eq!(f.cognitive_complexity, Some(3));
    assert_eq!(f.is_unused, Some(false));
    assert!(find(&result.tree, "b.ts")
        .dependencies
        .iter()
        .any(|d| d.as_str() == "a.ts:f"));
}

#[test]
fn test_pattern_scenarios() {
    let result = analyze(&mixed_project());
    let tree = &result.tree;

    assert_eq!(find(tree, "tools/x.py:g").cognitive_complexity, Some(3));
    assert_eq!(find(tree, "native/m.c:h").cognitive_complexity, Some(2));
    assert_eq!(find(tree, "native/m.c:h").kind, NodeKind::Function);
}

#[test]
fn test_cycle_scenario() {
    let result = analyze(&mixed_project());
    let tree = &result.tree;

    assert_eq!(find(tree, "p.py").is_cyclic, Some(true));
    assert_eq!(find(tree, "q.py").is_cyclic, Some(true));
    assert_eq!(find(tree, "r.py").is_cyclic, Some(false));
    let cyclic: Vec<&str> = tree.cyclic_files().iter().map(|n| n.id.as_str()).collect();
    assert_eq!(cyclic, vec!["p.py", "q.py"]);
}

#[test]
fn test_substring_import_takes_first_admitted_file() {
    let result = analyze(&[
        ("lib/x.py", "value = 2\n"),
        ("p.py", "import q\n"),
        ("q.py", "import p\n"),
    ]);
    let tree = &result.tree;

    assert!(find(tree, "q.py").dependencies.iter().any(|d| d.as_str() == "lib/x.py"));
    assert_eq!(find(tree, "p.py").is_cyclic, Some(false));
    assert!(tree.cyclic_files().is_empty());
}

#[test]
fn test_tree_shape_and_invariants() {
    let result = analyze(&mixed_project());
    let tree = &result.tree;

    let top: Vec<&str> = tree.children.iter().map(|c| c.name.as_str()).collect();
    insta::assert_debug_snapshot!(top, @r###"
    [
        "native",
        "tools",
        "web",
        "p.py",
        "q.py",
        "r.py",
    ]
    "###);

    let mut ids: Vec<&str> = tree.walk().map(|n| n.id.as_str()).collect();
    let total = ids.len();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), total, "identifiers must be unique");

    for file in tree.files() {
        let score = file.instability.expect("every file is scored");
        assert!((0.0..=1.0).contains(&score), "{} out of range", file.id);
    }
    assert_eq!(find(tree, "r.py").instability, Some(0.0));
}

#[test]
fn test_edges_are_symmetric() {
    let result = analyze(&mixed_project());
    let tree = &result.tree;

    for node in tree.walk() {
        for dep in &node.dependencies {
            let target = find(tree, dep.as_str());
            let owner_listed = target.dependents.iter().any(|d| d == &node.id);
            // File lists mirror symbol edges, so the reverse entry may name
            // the symbol that owns the edge rather than its file.
            let symbol_listed = target
                .dependents
                .iter()
                .any(|d| d.as_str().starts_with(&format!("{}:", node.id)));
            assert!(owner_listed || symbol_listed, "{} -> {} has no reverse entry", node.id, dep);
        }
    }
}

#[test]
fn test_json_output_annotations() {
    let result = analyze(&mixed_project());
    let json: serde_json::Value = serde_json::from_str(&result.tree.to_json(false).unwrap()).unwrap();

    assert_eq!(json["id"], "/");
    assert_eq!(json["kind"], "directory");
    let web = json["children"]
        .as_array()
        .unwrap()
        .iter()
        .find(|c| c["name"] == "web")
        .unwrap();
    let a = &web["children"][0];
    assert_eq!(a["id"], "web/a.ts");
    assert_eq!(a["language"], "typescript");
    let f = &a["children"][0];
    assert_eq!(f["cognitiveComplexity"], 3);
    assert_eq!(f["isUnused"], false);
    assert_eq!(f["loc"]["startLine"], 1);
}

/// Test that the CLI analyzes a directory end to end
#[test]
fn test_cli_analyze_and_report() {
    let dir = TempDir::new().unwrap();
    for (path, content) in mixed_project() {
        let full = dir.path().join(path);
        fs::create_dir_all(full.parent().unwrap()).unwrap();
        fs::write(full, content).unwrap();
    }
    fs::write(dir.path().join("thicket.toml"), "root_name = \"demo\"\n").unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_thicket"))
        .args(["analyze", "--root"])
        .arg(dir.path())
        .output()
        .expect("Failed to execute thicket");
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["name"], "demo");

    let output = Command::new(env!("CARGO_BIN_EXE_thicket"))
        .args(["report", "--top", "3", "--root"])
        .arg(dir.path())
        .output()
        .expect("Failed to execute thicket");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Cyclic files (2)"));
    assert!(stdout.contains("native/m.c:h"));
}

#[test]
fn test_cli_languages() {
    let output = Command::new(env!("CARGO_BIN_EXE_thicket"))
        .arg("languages")
        .output()
        .expect("Failed to execute thicket");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains(".h      alias of .c"));
    assert!(stdout.contains(".tsx    syntax tree (tsx)"));
    assert!(stdout.contains(".py     patterns (python, Indentation blocks)"));
}
