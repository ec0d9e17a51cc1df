//! Tree-based extractor for the JavaScript/TypeScript family

use anyhow::Result;
use thicket_core::{GraphNode, NodeId, NodeKind, SourceSpan, SymbolTable};
use tree_sitter::Node;

use super::span_of;
use crate::complexity::cognitive;
use crate::extractor::{ExtractionResult, LanguageExtractor, ParsedScript};
use crate::parser_pool::{ParseRequest, ParserPool, ScriptDialect};

/// Reserved in-file name of a default export.
pub const DEFAULT_EXPORT: &str = "default";

const FUNCTION_VALUES: &[&str] = &[
    "function_expression",
    "function",
    "arrow_function",
    "generator_function",
];

pub struct ScriptExtractor {
    parser_pool: ParserPool,
    dialect: ScriptDialect,
    tolerate_syntax_errors: bool,
}

impl ScriptExtractor {
    pub fn new(parser_pool: ParserPool, dialect: ScriptDialect, tolerate_syntax_errors: bool) -> Self {
        Self {
            parser_pool,
            dialect,
            tolerate_syntax_errors,
        }
    }
}

impl LanguageExtractor for ScriptExtractor {
    fn extract(&self, path: &str, source: &str) -> Result<ExtractionResult> {
        let request = ParseRequest {
            dialect: self.dialect,
            content: source.to_string(),
            path: path.to_string(),
        };
        let parsed = self.parser_pool.parse_blocking(request)?;
        let root = parsed.tree.root_node();
        if root.has_error() && !self.tolerate_syntax_errors {
            anyhow::bail!("syntax errors in {}", path);
        }

        let source_bytes = parsed.content.as_bytes();
        let mut walker = DeclarationWalker {
            path,
            source: source_bytes,
            symbols: SymbolTable::new(),
            named_exports: Vec::new(),
            default_identifiers: Vec::new(),
        };
        let imports = {
            let mut cursor = root.walk();
            for child in root.children(&mut cursor) {
                walker.visit(child, true);
            }
            collect_import_sites(root, source_bytes)
                .into_iter()
                .map(|site| site.specifier)
                .collect()
        };
        let symbols = walker.finish();

        tracing::trace!("{}: {} symbols", path, symbols.len());

        Ok(ExtractionResult {
            symbols,
            imports,
            script: Some(ParsedScript {
                tree: parsed.tree,
                source: parsed.content,
            }),
        })
    }
}

struct DeclarationWalker<'a> {
    path: &'a str,
    source: &'a [u8],
    symbols: SymbolTable,
    /// `export { a }` clauses, applied once every declaration is known.
    named_exports: Vec<String>,
    /// `export default a` / `export { a as default }`, with the export node.
    default_identifiers: Vec<(String, SourceSpan)>,
}

impl<'a> DeclarationWalker<'a> {
    fn text(&self, node: Node<'_>) -> &'a str {
        node.utf8_text(self.source).unwrap_or_default()
    }

    fn name_of(&self, node: Node<'_>) -> Option<&'a str> {
        node.child_by_field_name("name")
            .map(|n| self.text(n))
            .filter(|name| !name.is_empty())
    }

    fn visit(&mut self, node: Node<'_>, top_level: bool) {
        match node.kind() {
            "export_statement" => {
                self.visit_export(node);
                return;
            }
            "function_declaration" | "generator_function_declaration" => {
                if let Some(name) = self.name_of(node) {
                    self.emit_function(node, name, None, false);
                }
            }
            "class_declaration" | "abstract_class_declaration" => {
                if let Some(name) = self.name_of(node) {
                    self.emit_class(node, name, None, false);
                }
            }
            "interface_declaration" => self.emit_named(node, NodeKind::Interface, false),
            "enum_declaration" => self.emit_named(node, NodeKind::Enum, false),
            "lexical_declaration" | "variable_declaration" if top_level => {
                self.emit_variables(node, false);
            }
            _ => {}
        }
        self.visit_children(node);
    }

    fn visit_children(&mut self, node: Node<'_>) {
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            self.visit(child, false);
        }
    }

    fn visit_export(&mut self, node: Node<'_>) {
        // Re-exports declare nothing locally.
        if node.child_by_field_name("source").is_some() {
            return;
        }
        let mut cursor = node.walk();
        let is_default = node.children(&mut cursor).any(|c| c.kind() == "default");

        if let Some(declaration) = node.child_by_field_name("declaration") {
            if is_default {
                self.emit_default(declaration, node);
            } else {
                self.emit_exported_declaration(declaration);
            }
            self.visit_children(declaration);
            return;
        }

        if let Some(value) = node.child_by_field_name("value") {
            self.emit_default(value, node);
            self.visit_children(value);
            return;
        }

        let mut cursor = node.walk();
        for clause in node.children(&mut cursor).filter(|c| c.kind() == "export_clause") {
            let mut inner = clause.walk();
            for specifier in clause.children(&mut inner).filter(|c| c.kind() == "export_specifier") {
                let Some(local) = specifier.child_by_field_name("name").map(|n| self.text(n)) else {
                    continue;
                };
                let alias = specifier.child_by_field_name("alias").map(|n| self.text(n));
                if alias == Some(DEFAULT_EXPORT) {
                    self.default_identifiers.push((local.to_string(), span_of(node)));
                } else {
                    self.named_exports.push(local.to_string());
                }
            }
        }
    }

    fn emit_exported_declaration(&mut self, declaration: Node<'_>) {
        match declaration.kind() {
            "function_declaration" | "generator_function_declaration" => {
                if let Some(name) = self.name_of(declaration) {
                    self.emit_function(declaration, name, None, true);
                }
            }
            "class_declaration" | "abstract_class_declaration" => {
                if let Some(name) = self.name_of(declaration) {
                    self.emit_class(declaration, name, None, true);
                }
            }
            "lexical_declaration" | "variable_declaration" => self.emit_variables(declaration, true),
            "interface_declaration" => self.emit_named(declaration, NodeKind::Interface, true),
            "enum_declaration" => self.emit_named(declaration, NodeKind::Enum, true),
            _ => {}
        }
    }

    /// Emit `<path>:default`, labelled with the declaration's own name or
    /// the file's base name.
    fn emit_default(&mut self, target: Node<'_>, export: Node<'_>) {
        let base = base_name(self.path);
        let label = self.name_of(target).unwrap_or(base);
        match target.kind() {
            "function_declaration" | "generator_function_declaration" | "function_expression"
            | "function" | "generator_function" => {
                self.emit_function(target, DEFAULT_EXPORT, Some(label), true);
            }
            "arrow_function" => {
                let mut node = GraphNode::symbol(self.path, DEFAULT_EXPORT, NodeKind::ArrowFunction)
                    .with_display_name(label)
                    .exported(true)
                    .with_loc(span_of(export));
                if let Some(body) = target.child_by_field_name("body") {
                    node = node.with_complexity(cognitive::score(body, self.source, label));
                }
                self.symbols.merge(node);
            }
            "class_declaration" | "abstract_class_declaration" | "class" => {
                self.emit_class(target, DEFAULT_EXPORT, Some(label), true);
            }
            "identifier" => {
                let local = self.text(target);
                self.default_identifiers.push((local.to_string(), span_of(export)));
            }
            _ => {
                let node = GraphNode::symbol(self.path, DEFAULT_EXPORT, NodeKind::Variable)
                    .with_display_name(label)
                    .exported(true)
                    .with_loc(span_of(export));
                self.symbols.merge(node);
            }
        }
    }

    fn emit_function(&mut self, node: Node<'_>, name: &str, label: Option<&str>, exported: bool) {
        let display = label.unwrap_or(name);
        let mut symbol = GraphNode::symbol(self.path, name, NodeKind::Function)
            .with_display_name(display)
            .exported(exported)
            .with_loc(span_of(node));
        if let Some(body) = node.child_by_field_name("body") {
            symbol = symbol.with_complexity(cognitive::score(body, self.source, display));
        }
        self.symbols.merge(symbol);
    }

    fn emit_class(&mut self, node: Node<'_>, name: &str, label: Option<&str>, exported: bool) {
        let display = label.unwrap_or(name);
        self.symbols.merge(
            GraphNode::symbol(self.path, name, NodeKind::Class)
                .with_display_name(display)
                .exported(exported)
                .with_loc(span_of(node)),
        );

        let Some(body) = node.child_by_field_name("body") else {
            return;
        };
        let mut cursor = body.walk();
        for member in body.children(&mut cursor).filter(|m| m.kind() == "method_definition") {
            let (Some(method), Some(method_body)) =
                (self.name_of(member), member.child_by_field_name("body"))
            else {
                continue;
            };
            let qualified = format!("{}.{}", display, method);
            self.symbols.merge(
                GraphNode::symbol(self.path, &qualified, NodeKind::Function)
                    .with_loc(span_of(member))
                    .with_complexity(cognitive::score(method_body, self.source, method)),
            );
        }
    }

    fn emit_named(&mut self, node: Node<'_>, kind: NodeKind, exported: bool) {
        if let Some(name) = self.name_of(node) {
            self.symbols.merge(
                GraphNode::symbol(self.path, name, kind)
                    .exported(exported)
                    .with_loc(span_of(node)),
            );
        }
    }

    fn emit_variables(&mut self, declaration: Node<'_>, exported: bool) {
        let mut cursor = declaration.walk();
        for declarator in declaration
            .children(&mut cursor)
            .filter(|c| c.kind() == "variable_declarator")
        {
            let Some(name_node) = declarator.child_by_field_name("name") else {
                continue;
            };
            let span = span_of(declarator);

            if name_node.kind() != "identifier" {
                // Destructuring: every bound identifier is a plain variable.
                for name in self.pattern_identifiers(name_node) {
                    self.symbols.merge(
                        GraphNode::symbol(self.path, name, NodeKind::Variable)
                            .exported(exported)
                            .with_loc(span),
                    );
                }
                continue;
            }

            let name = self.text(name_node);
            let value = declarator
                .child_by_field_name("value")
                .filter(|v| FUNCTION_VALUES.contains(&v.kind()));
            let symbol = match value {
                Some(function) => {
                    let symbol = GraphNode::symbol(self.path, name, NodeKind::ArrowFunction);
                    match function.child_by_field_name("body") {
                        Some(body) => symbol.with_complexity(cognitive::score(body, self.source, name)),
                        None => symbol,
                    }
                }
                None => GraphNode::symbol(self.path, name, NodeKind::Variable),
            };
            self.symbols.merge(symbol.exported(exported).with_loc(span));
        }
    }

    fn pattern_identifiers(&self, pattern: Node<'_>) -> Vec<&'a str> {
        let mut names = Vec::new();
        let mut stack = vec![pattern];
        while let Some(node) = stack.pop() {
            match node.kind() {
                "identifier" | "shorthand_property_identifier_pattern" => names.push(self.text(node)),
                // Default values are expressions, not bindings.
                "assignment_pattern" | "object_assignment_pattern" => {
                    if let Some(left) = node.child_by_field_name("left") {
                        stack.push(left);
                    }
                }
                "pair_pattern" => {
                    if let Some(value) = node.child_by_field_name("value") {
                        stack.push(value);
                    }
                }
                _ => {
                    let mut cursor = node.walk();
                    let children: Vec<Node<'_>> = node.children(&mut cursor).collect();
                    stack.extend(children.into_iter().rev());
                }
            }
        }
        names
    }

    fn finish(mut self) -> SymbolTable {
        for name in std::mem::take(&mut self.named_exports) {
            let id = NodeId::symbol(self.path, &name);
            if !self.symbols.mark_exported(id.as_str()) {
                tracing::trace!("{}: export of undeclared `{}`", self.path, name);
            }
        }

        for (local, span) in std::mem::take(&mut self.default_identifiers) {
            let local_id = NodeId::symbol(self.path, &local);
            let (kind, complexity) = match self.symbols.get(local_id.as_str()) {
                Some(node) => (node.kind, node.cognitive_complexity),
                None => (NodeKind::Variable, None),
            };
            self.symbols.mark_exported(local_id.as_str());
            let mut node = GraphNode::symbol(self.path, DEFAULT_EXPORT, kind)
                .with_display_name(local.as_str())
                .exported(true)
                .with_loc(span);
            node.cognitive_complexity = complexity;
            self.symbols.merge(node);
        }

        self.symbols
    }
}

/// File name without directories or extensions.
fn base_name(path: &str) -> &str {
    let file_name = path.rsplit('/').next().unwrap_or(path);
    match file_name.find('.') {
        Some(0) | None => file_name,
        Some(dot) => &file_name[..dot],
    }
}

/// What an import binding refers to in the target module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportedName {
    Named(String),
    Default,
    /// The module as a whole (`* as ns`, `const ns = require(..)`).
    Namespace,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportBinding {
    /// Name the importer uses locally.
    pub local: String,
    pub imported: ImportedName,
}

/// One module reference in a script file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSite {
    pub specifier: String,
    pub bindings: Vec<ImportBinding>,
    /// Byte range of the importing construct, excluded from use scanning.
    pub range: std::ops::Range<usize>,
}

/// Module references in source order: `import` statements, `export … from`,
/// `require("..")` and dynamic `import("..")`.
pub fn collect_import_sites(root: Node<'_>, source: &[u8]) -> Vec<ImportSite> {
    let mut sites = Vec::new();
    let mut stack = vec![root];

    while let Some(node) = stack.pop() {
        match node.kind() {
            "import_statement" => {
                if let Some(specifier) = node.child_by_field_name("source").and_then(|s| string_value(s, source)) {
                    sites.push(ImportSite {
                        specifier,
                        bindings: import_clause_bindings(node, source),
                        range: node.byte_range(),
                    });
                }
                continue;
            }
            "export_statement" => {
                if let Some(specifier) = node.child_by_field_name("source").and_then(|s| string_value(s, source)) {
                    sites.push(ImportSite {
                        specifier,
                        bindings: Vec::new(),
                        range: node.byte_range(),
                    });
                    continue;
                }
            }
            "call_expression" => {
                if let Some(site) = call_site(node, source) {
                    sites.push(site);
                }
            }
            _ => {}
        }

        let mut cursor = node.walk();
        let children: Vec<Node<'_>> = node.children(&mut cursor).collect();
        stack.extend(children.into_iter().rev());
    }

    sites
}

fn string_value(node: Node<'_>, source: &[u8]) -> Option<String> {
    if !matches!(node.kind(), "string" | "template_string") {
        return None;
    }
    let text = node.utf8_text(source).ok()?;
    let value = text.trim_matches(|c| c == '"' || c == '\'' || c == '`');
    (!value.is_empty()).then(|| value.to_string())
}

fn import_clause_bindings(statement: Node<'_>, source: &[u8]) -> Vec<ImportBinding> {
    let text = |n: Node<'_>| n.utf8_text(source).unwrap_or_default().to_string();
    let mut bindings = Vec::new();

    let mut cursor = statement.walk();
    let Some(clause) = statement
        .children(&mut cursor)
        .find(|c| c.kind() == "import_clause")
    else {
        return bindings;
    };

    let mut cursor = clause.walk();
    for part in clause.children(&mut cursor) {
        match part.kind() {
            "identifier" => bindings.push(ImportBinding {
                local: text(part),
                imported: ImportedName::Default,
            }),
            "namespace_import" => {
                let mut inner = part.walk();
                let local = part.children(&mut inner).find(|c| c.kind() == "identifier");
                if let Some(local) = local {
                    bindings.push(ImportBinding {
                        local: text(local),
                        imported: ImportedName::Namespace,
                    });
                }
            }
            "named_imports" => {
                let mut inner = part.walk();
                for specifier in part.children(&mut inner).filter(|c| c.kind() == "import_specifier") {
                    let Some(name) = specifier.child_by_field_name("name").map(text) else {
                        continue;
                    };
                    let name = name.trim_matches(|c| c == '"' || c == '\'').to_string();
                    let local = specifier
                        .child_by_field_name("alias")
                        .map(text)
                        .unwrap_or_else(|| name.clone());
                    let imported = if name == DEFAULT_EXPORT {
                        ImportedName::Default
                    } else {
                        ImportedName::Named(name)
                    };
                    bindings.push(ImportBinding { local, imported });
                }
            }
            _ => {}
        }
    }
    bindings
}

/// `require("x")` or `import("x")`, with bindings taken from an enclosing
/// `const … =` declarator.
fn call_site(call: Node<'_>, source: &[u8]) -> Option<ImportSite> {
    let callee = call.child_by_field_name("function")?;
    let is_require = callee.kind() == "identifier" && callee.utf8_text(source).ok()? == "require";
    if !is_require && callee.kind() != "import" {
        return None;
    }
    let arguments = call.child_by_field_name("arguments")?;
    let first = arguments.named_child(0)?;
    let specifier = string_value(first, source)?;

    let declarator = call.parent().filter(|p| p.kind() == "variable_declarator");
    let bindings = match declarator.and_then(|d| d.child_by_field_name("name")) {
        Some(name) => require_bindings(name, source),
        None => Vec::new(),
    };
    let range = declarator.unwrap_or(call).byte_range();

    Some(ImportSite {
        specifier,
        bindings,
        range,
    })
}

fn require_bindings(name: Node<'_>, source: &[u8]) -> Vec<ImportBinding> {
    let text = |n: Node<'_>| n.utf8_text(source).unwrap_or_default().to_string();
    match name.kind() {
        "identifier" => vec![ImportBinding {
            local: text(name),
            imported: ImportedName::Namespace,
        }],
        "object_pattern" => {
            let mut bindings = Vec::new();
            let mut cursor = name.walk();
            for property in name.named_children(&mut cursor) {
                match property.kind() {
                    "shorthand_property_identifier_pattern" => {
                        let local = text(property);
                        bindings.push(ImportBinding {
                            imported: ImportedName::Named(local.clone()),
                            local,
                        });
                    }
                    "pair_pattern" => {
                        let key = property.child_by_field_name("key").map(text);
                        let value = property
                            .child_by_field_name("value")
                            .filter(|v| v.kind() == "identifier")
                            .map(text);
                        if let (Some(key), Some(local)) = (key, value) {
                            bindings.push(ImportBinding {
                                local,
                                imported: ImportedName::Named(key),
                            });
                        }
                    }
                    _ => {}
                }
            }
            bindings
        }
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser_pool::create_parser_pool;

    fn extract(path: &str, source: &str) -> ExtractionResult {
        let extractor = ScriptExtractor::new(create_parser_pool(), ScriptDialect::TypeScript, false);
        extractor.extract(path, source).unwrap()
    }

    fn ids(result: &ExtractionResult) -> Vec<String> {
        result.symbols.iter().map(|n| n.id.to_string()).collect()
    }

    #[test]
    fn test_declarations_in_order() {
        let result = extract(
            "src/shapes.ts",
            r#"
import { x } from "./x";
const PI = 3.14;
const area = (r: number) => PI * r * r;
class Circle {
  radius(): number { if (this.r) { return 1; } return 0; }
  static make() { return new Circle(); }
}
function helper() {}
interface Shape { area(): number }
enum Color { Red }
"#,
        );

        insta::assert_debug_snapshot!(ids(&result), @r###"
        [
            "src/shapes.ts:PI",
            "src/shapes.ts:area",
            "src/shapes.ts:Circle",
            "src/shapes.ts:Circle.radius",
            "src/shapes.ts:Circle.make",
            "src/shapes.ts:helper",
            "src/shapes.ts:Shape",
            "src/shapes.ts:Color",
        ]
        "###);

        let area = result.symbols.get("src/shapes.ts:area").unwrap();
        assert_eq!(area.kind, NodeKind::ArrowFunction);
        assert_eq!(area.cognitive_complexity, Some(0));
        let radius = result.symbols.get("src/shapes.ts:Circle.radius").unwrap();
        assert_eq!(radius.cognitive_complexity, Some(1));
        assert!(!radius.is_exported);
        assert_eq!(result.symbols.get("src/shapes.ts:PI").unwrap().kind, NodeKind::Variable);
        assert_eq!(result.imports, vec!["./x".to_string()]);
    }

    #[test]
    fn test_named_export_of_known_identifier_is_not_duplicated() {
        let result = extract(
            "a.ts",
            "function f() {}\nexport { f };\nexport function g() {}\nexport const h = 1;",
        );
        assert_eq!(ids(&result), vec!["a.ts:f", "a.ts:g", "a.ts:h"]);
        assert!(result.symbols.iter().all(|n| n.is_exported));
    }

    #[test]
    fn test_default_exports() {
        let named = extract("src/Button.ts", "export default function render() { if (a) {} }");
        let node = named.symbols.get("src/Button.ts:default").unwrap();
        assert_eq!(node.name, "render");
        assert!(node.is_exported);
        assert_eq!(node.cognitive_complexity, Some(1));

        let anonymous = extract("src/Button.ts", "export default () => 1;");
        assert_eq!(anonymous.symbols.get("src/Button.ts:default").unwrap().name, "Button");

        let identifier = extract("src/app.ts", "const app = 1;\nexport default app;");
        assert!(identifier.symbols.get("src/app.ts:app").unwrap().is_exported);
        assert_eq!(identifier.symbols.get("src/app.ts:default").unwrap().name, "app");
    }

    #[test]
    fn test_nested_functions_and_local_variables() {
        let result = extract("n.ts", "function outer() { const local = 1; function inner() {} }");
        assert_eq!(ids(&result), vec!["n.ts:outer", "n.ts:inner"]);
    }

    #[test]
    fn test_syntax_errors_fail_unless_tolerated() {
        let source = "function broken( { if }";
        let strict = ScriptExtractor::new(create_parser_pool(), ScriptDialect::TypeScript, false);
        assert!(strict.extract("b.ts", source).is_err());

        let lenient = ScriptExtractor::new(create_parser_pool(), ScriptDialect::TypeScript, true);
        assert!(lenient.extract("b.ts", source).is_ok());
    }

    #[test]
    fn test_import_sites() {
        let result = extract(
            "m.ts",
            r#"
import def, { a, b as c, default as d } from "./one";
import * as ns from "../two";
export * from "./three";
const fs = require("fs");
const { join, x: y } = require("./path");
"#,
        );
        let script = result.script.unwrap();
        let sites = collect_import_sites(script.tree.root_node(), script.source.as_bytes());
        let specifiers: Vec<&str> = sites.iter().map(|s| s.specifier.as_str()).collect();
        assert_eq!(specifiers, vec!["./one", "../two", "./three", "fs", "./path"]);

        let first: Vec<(&str, &ImportedName)> = sites[0]
            .bindings
            .iter()
            .map(|b| (b.local.as_str(), &b.imported))
            .collect();
        assert_eq!(
            first,
            vec![
                ("def", &ImportedName::Default),
                ("a", &ImportedName::Named("a".into())),
                ("c", &ImportedName::Named("b".into())),
                ("d", &ImportedName::Default),
            ]
        );
        assert_eq!(sites[1].bindings[0].imported, ImportedName::Namespace);
        assert_eq!(sites[3].bindings[0].imported, ImportedName::Namespace);
        assert_eq!(sites[4].bindings[1].local, "y");
        assert_eq!(sites[4].bindings[1].imported, ImportedName::Named("x".into()));
    }

    #[test]
    fn test_complexity_ignores_surrounding_declarations() {
        let target = "function check(a, b) {\n  if (a && b) {\n    for (const x of a) { if (x) { continue; } }\n  }\n}\n";
        let before = "const limit = 3;\nclass Box { open() { while (true) {} } }\n";
        let after = "export function noisy() { switch (y) { case 1: break; } }\nlet z = () => z();\n";

        let score = |source: &str| {
            let result = extract("m.ts", source);
            result.symbols.get("m.ts:check").and_then(|n| n.cognitive_complexity)
        };
        let alone = score(target);
        // if 1, && 1, for 2, nested if 3
        assert_eq!(alone, Some(7));
        assert_eq!(score(&format!("{}{}{}", before, target, after)), alone);
        assert_eq!(score(&format!("{}{}{}", after, target, before)), alone);
    }
}
