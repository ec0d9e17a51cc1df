//! Brace-balance complexity scan for brace-delimited languages

use super::words;

const NESTING_KEYWORDS: &[&str] = &["if", "for", "while", "switch", "catch"];
const FLAT_KEYWORDS: &[&str] = &["else", "case", "goto"];

/// Score the body following byte offset `from` in `source`.
///
/// The body is the text between the first `{` at or after `from` and its
/// balanced `}`. An unbalanced body scores 0.
pub fn score(source: &str, from: usize, name: &str) -> u32 {
    let Some(body) = source.get(from..).and_then(balanced_body) else {
        return 0;
    };

    let mut total = 0u32;
    let mut nesting = 0u32;
    let mut in_block_comment = false;

    for raw in body.lines() {
        let line = strip_comments(raw, &mut in_block_comment);

        let closes = line.matches('}').count() as u32;
        nesting = nesting.saturating_sub(closes);

        let mut calls_self = false;
        for (offset, word) in words(&line) {
            if NESTING_KEYWORDS.contains(&word) {
                total += 1 + nesting;
            } else if FLAT_KEYWORDS.contains(&word) {
                total += 1;
            } else if word == name && is_call(&line[offset + word.len()..]) {
                calls_self = true;
            }
        }
        if calls_self {
            total += 1;
        }

        total += line.matches('?').count() as u32;
        total += line.matches("&&").count() as u32;
        total += line.matches("||").count() as u32;

        nesting += line.matches('{').count() as u32;
    }

    total
}

/// Inner text of the first balanced `{ ... }` in `text`.
fn balanced_body(text: &str) -> Option<&str> {
    let open = text.find('{')?;
    let mut depth = 0usize;
    for (i, c) in text[open..].char_indices() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[open + 1..open + i]);
                }
            }
            _ => {}
        }
    }
    None
}

fn is_call(rest: &str) -> bool {
    rest.trim_start().starts_with('(')
}

/// Drop `//` comments and `/* */` spans. Block comments may span lines.
fn strip_comments(line: &str, in_block_comment: &mut bool) -> String {
    let mut out = String::with_capacity(line.len());
    let mut rest = line;
    loop {
        if *in_block_comment {
            match rest.find("*/") {
                Some(end) => {
                    rest = &rest[end + 2..];
                    *in_block_comment = false;
                }
                None => return out,
            }
        }
        let line_comment = rest.find("//");
        let block_comment = rest.find("/*");
        match (line_comment, block_comment) {
            (Some(l), Some(b)) if b < l => {
                out.push_str(&rest[..b]);
                rest = &rest[b + 2..];
                *in_block_comment = true;
            }
            (None, Some(b)) => {
                out.push_str(&rest[..b]);
                rest = &rest[b + 2..];
                *in_block_comment = true;
            }
            (Some(l), _) => {
                out.push_str(&rest[..l]);
                return out;
            }
            (None, None) => {
                out.push_str(rest);
                return out;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_line_recursion() {
        let src = "int h(int n){ if(n>0){ return h(n-1); } return 0; }";
        assert_eq!(score(src, 5, "h"), 2);
    }

    #[test]
    fn test_nested_keywords_and_operators() {
        let src = "void f() {\n  if (a && b) {\n    while (c) {\n      x = d ? 1 : 2;\n    }\n  } else {\n  }\n}\n";
        // if 1, && 1, while 2, ? 1, else 1
        assert_eq!(score(src, 6, "f"), 6);
    }

    #[test]
    fn test_comments_are_ignored() {
        let src = "void f() {\n  // if (x) while (y)\n  /* for (;;)\n  switch */ return;\n}\n";
        assert_eq!(score(src, 6, "f"), 0);
    }

    #[test]
    fn test_unbalanced_body_scores_zero() {
        assert_eq!(score("void f() { if (x) {", 6, "f"), 0);
        assert_eq!(score("void f();", 6, "f"), 0);
    }

    #[test]
    fn test_name_without_call_is_not_recursion() {
        let src = "int f() {\n  int f_count = 0;\n  return f;\n}";
        assert_eq!(score(src, 5, "f"), 0);
    }
}
