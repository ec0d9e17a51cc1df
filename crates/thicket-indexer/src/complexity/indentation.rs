//! Indentation-tracking complexity scan for significant-whitespace languages

use super::words;

const NESTING_KEYWORDS: &[&str] = &["if", "for", "while", "except", "with"];
const BRANCH_KEYWORDS: &[&str] = &["elif", "else"];
const BOOLEAN_OPERATORS: &[&str] = &["and", "or"];
const TAB_WIDTH: usize = 4;

/// Score the block of the first `<keyword> <name>` header in `source`.
///
/// Returns 0 if no header is found.
pub fn score(source: &str, name: &str, keyword: &str) -> u32 {
    let mut lines = source.lines();
    let Some(header_indent) = lines
        .by_ref()
        .find(|line| is_header(line, name, keyword))
        .map(indent_width)
    else {
        return 0;
    };

    let mut total = 0u32;
    let mut levels: Vec<usize> = Vec::new();

    for line in lines {
        let code = strip_comment(line);
        if code.trim().is_empty() {
            continue;
        }
        let indent = indent_width(line);
        if indent <= header_indent {
            break;
        }

        while levels.last().is_some_and(|&top| top >= indent) {
            levels.pop();
        }

        let mut tokens = words(code).map(|(_, w)| w).peekable();
        if tokens.peek() == Some(&"async") {
            tokens.next();
        }
        match tokens.peek() {
            Some(first) if NESTING_KEYWORDS.contains(first) => {
                total += 1 + levels.len() as u32;
                levels.push(indent);
            }
            Some(first) if BRANCH_KEYWORDS.contains(first) => total += 1,
            _ => {}
        }

        let mut recursive = false;
        for word in words(code).map(|(_, w)| w) {
            if BOOLEAN_OPERATORS.contains(&word) {
                total += 1;
            } else if word == name {
                recursive = true;
            }
        }
        if recursive {
            total += 1;
        }
    }

    total
}

fn is_header(line: &str, name: &str, keyword: &str) -> bool {
    let trimmed = line.trim_start();
    if trimmed.starts_with('#') {
        return false;
    }
    let trimmed = trimmed
        .strip_prefix("async")
        .filter(|rest| rest.starts_with(char::is_whitespace))
        .map_or(trimmed, str::trim_start);
    let Some(rest) = trimmed
        .strip_prefix(keyword)
        .filter(|rest| rest.starts_with(char::is_whitespace))
    else {
        return false;
    };
    let Some(rest) = rest.trim_start().strip_prefix(name) else {
        return false;
    };
    rest.trim_start().starts_with(['(', ':'])
}

fn indent_width(line: &str) -> usize {
    line.chars()
        .take_while(|c| c.is_whitespace())
        .map(|c| if c == '\t' { TAB_WIDTH } else { 1 })
        .sum()
}

fn strip_comment(line: &str) -> &str {
    match line.find('#') {
        Some(pos) => &line[..pos],
        None => line,
    }
}
