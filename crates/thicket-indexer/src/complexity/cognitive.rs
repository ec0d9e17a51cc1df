//! Exact cognitive complexity over a script syntax tree

use tree_sitter::Node;

/// Structures that score `1 + nesting` and nest their contents.
const NESTING_STRUCTURES: &[&str] = &[
    "if_statement",
    "for_statement",
    "for_in_statement",
    "while_statement",
    "do_statement",
    "ternary_expression",
    "switch_statement",
    "catch_clause",
];

/// Nested functions raise nesting but score nothing themselves.
const NESTED_FUNCTIONS: &[&str] = &[
    "function_expression",
    "function",
    "arrow_function",
    "generator_function",
    "function_declaration",
    "generator_function_declaration",
    "method_definition",
];

/// Expressions that break a run of identical boolean operators.
const RUN_BREAKERS: &[&str] = &["member_expression", "unary_expression", "update_expression"];

/// Score the body of the function called `name`.
pub fn score(body: Node<'_>, source: &[u8], name: &str) -> u32 {
    let mut scorer = Scorer {
        source,
        name,
        total: 0,
        run: None,
    };
    scorer.visit_children(body, 0);
    scorer.total
}

struct Scorer<'s> {
    source: &'s [u8],
    name: &'s str,
    total: u32,
    /// Operator of the current boolean run, if one is open.
    run: Option<&'static str>,
}

impl Scorer<'_> {
    fn visit_children(&mut self, node: Node<'_>, nesting: u32) {
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            self.visit(child, nesting);
        }
    }

    fn visit(&mut self, node: Node<'_>, nesting: u32) {
        let kind = node.kind();

        if NESTING_STRUCTURES.contains(&kind) {
            self.total += 1 + nesting;
            self.visit_children(node, nesting + 1);
            return;
        }
        if NESTED_FUNCTIONS.contains(&kind) {
            self.visit_children(node, nesting + 1);
            return;
        }

        match kind {
            "switch_case" => {
                if node.child_by_field_name("value").is_some() {
                    self.total += 1;
                }
            }
            "break_statement" | "continue_statement" => {
                if node.child_by_field_name("label").is_some() {
                    self.total += 1;
                }
            }
            "call_expression" => {
                self.run = None;
                if self.is_self_call(node) {
                    self.total += 1;
                }
            }
            "binary_expression" => {
                self.visit_binary(node, nesting);
                return;
            }
            _ if RUN_BREAKERS.contains(&kind) => self.run = None,
            _ => {}
        }

        self.visit_children(node, nesting);
    }

    /// Operators are scored in source order, after their left operand.
    fn visit_binary(&mut self, node: Node<'_>, nesting: u32) {
        let operator = node.child_by_field_name("operator");
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            if Some(child) == operator {
                self.logical_operator(child.kind());
            } else {
                self.visit(child, nesting);
            }
        }
    }

    fn logical_operator(&mut self, kind: &str) {
        let operator = match kind {
            "&&" => "&&",
            "||" => "||",
            _ => return,
        };
        if self.run != Some(operator) {
            self.total += 1;
            self.run = Some(operator);
        }
    }

    /// `name(...)` or `this.name(...)`.
    fn is_self_call(&self, call: Node<'_>) -> bool {
        let Some(callee) = call.child_by_field_name("function") else {
            return false;
        };
        match callee.kind() {
            "identifier" => self.text(callee) == Some(self.name),
            "member_expression" => {
                let object = callee.child_by_field_name("object");
                let property = callee.child_by_field_name("property");
                object.is_some_and(|o| o.kind() == "this")
                    && property.is_some_and(|p| self.text(p) == Some(self.name))
            }
            _ => false,
        }
    }

    fn text(&self, node: Node<'_>) -> Option<&str> {
        node.utf8_text(self.source).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tree_sitter::Parser;

    fn score_first_function(source: &str) -> u32 {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into())
            .unwrap();
        let tree = parser.parse(source, None).unwrap();
        let mut cursor = tree.root_node().walk();
        let func = tree
            .root_node()
            .children(&mut cursor)
            .find(|n| n.kind() == "function_declaration")
            .unwrap();
        let name = func
            .child_by_field_name("name")
            .unwrap()
            .utf8_text(source.as_bytes())
            .unwrap();
        score(func.child_by_field_name("body").unwrap(), source.as_bytes(), name)
    }

    #[test]
    fn test_if_with_nested_for() {
        assert_eq!(score_first_function("function f(){ if (x) { for(;;){} } }"), 3);
    }

    #[test]
    fn test_boolean_runs() {
        // one run of &&
        assert_eq!(score_first_function("function f(){ return a && b && c; }"), 1);
        // && then ||
        assert_eq!(score_first_function("function f(){ return a && b || c; }"), 2);
        // a call between identical operators starts a new run
        assert_eq!(score_first_function("function f(){ return a && g() && c; }"), 2);
    }

    #[test]
    fn test_switch_cases_and_labels() {
        let src = "function f(v){ outer: while (v) { switch (v) { case 1: break outer; case 2: continue outer; default: break; } } }";
        // while 1, switch 2, two cases 2, two labeled jumps 2
        assert_eq!(score_first_function(src), 7);
    }

    #[test]
    fn test_recursion_and_nested_arrow() {
        let src = "function fact(n){ const g = () => { if (n) { return 1; } }; return n * fact(n - 1); }";
        // if inside arrow at nesting 1 → 2, recursion 1
        assert_eq!(score_first_function(src), 3);
    }

    #[test]
    fn test_renaming_unrelated_identifiers_is_invariant() {
        let a = score_first_function("function f(){ if (alpha) { return beta ? 1 : 2; } }");
        let b = score_first_function("function f(){ if (gamma) { return delta ? 1 : 2; } }");
        assert_eq!(a, b);
        assert_eq!(a, 3);
    }
}
