//! Shared lexical helpers for the regex-based extractors

use regex::Regex;

/// Result of scanning forward for the brace that closes a body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BraceSpan {
    /// Byte offset of the opening brace
    pub open: usize,
    /// Byte offset one past the last scanned byte (the closing brace when balanced)
    pub end: usize,
    /// False when the scan window ran out before the braces balanced
    pub balanced: bool,
}

impl BraceSpan {
    /// Text between the braces; for a truncated scan, everything scanned
    pub fn body<'a>(&self, content: &'a str) -> &'a str {
        let inner_end = if self.balanced { self.end - 1 } else { self.end };
        &content[self.open + 1..inner_end.max(self.open + 1)]
    }
}

/// Count nested braces from `open` until they balance, looking at most
/// `max_scan` bytes past the opening brace. Hitting the cap is not an error:
/// the truncated span is returned with `balanced == false`.
pub fn match_brace_span(content: &str, open: usize, max_scan: usize) -> BraceSpan {
    let bytes = content.as_bytes();
    debug_assert_eq!(bytes.get(open), Some(&b'{'));

    let limit = floor_char_boundary(content, content.len().min(open.saturating_add(max_scan)));
    let mut depth = 1usize;
    let mut pos = open + 1;

    while pos < limit {
        match bytes[pos] {
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return BraceSpan { open, end: pos + 1, balanced: true };
                }
            }
            _ => {}
        }
        pos += 1;
    }

    BraceSpan { open, end: limit.max(open + 1), balanced: false }
}

fn floor_char_boundary(content: &str, mut index: usize) -> usize {
    while index > 0 && !content.is_char_boundary(index) {
        index -= 1;
    }
    index
}

/// Minified/bundled heuristic: any of the first `probe_lines` lines is
/// longer than `max_line_length` characters.
pub fn looks_minified(content: &str, probe_lines: usize, max_line_length: usize) -> bool {
    content
        .split('\n')
        .take(probe_lines)
        .any(|line| line.chars().count() > max_line_length)
}

/// Finds `identifier(` call sites inside a function body
pub struct CallScanner {
    pattern: Regex,
    keywords: &'static [&'static str],
    max_calls: usize,
}

impl CallScanner {
    /// `pattern` must capture the called name in group 1
    pub fn new(pattern: &str, keywords: &'static [&'static str], max_calls: usize) -> Result<Self, regex::Error> {
        Ok(Self {
            pattern: Regex::new(pattern)?,
            keywords,
            max_calls,
        })
    }

    /// Called names in order of appearance. Keywords and the enclosing
    /// function's own name are dropped; at most `max_calls` names are kept.
    pub fn scan(&self, body: &str, enclosing_name: &str) -> Vec<String> {
        self.pattern
            .captures_iter(body)
            .filter_map(|cap| cap.get(1))
            .map(|m| m.as_str())
            .filter(|name| *name != enclosing_name && !self.keywords.contains(name))
            .take(self.max_calls)
            .map(str::to_string)
            .collect()
    }

    pub fn is_keyword(&self, name: &str) -> bool {
        self.keywords.contains(&name)
    }
}
