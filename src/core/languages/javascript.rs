use std::path::Path;
use regex::Regex;
use tracing::info;

use crate::config::ExtractionConfig;
use crate::error::Result;
use super::{looks_minified, match_brace_span, CallScanner, FileExtraction, LanguageExtractor};
use super::super::call_graph::FunctionId;

/// Declaration forms, each capturing the function name in group 1
const DECLARATION_PATTERNS: &[&str] = &[
    // function name()
    r"function\s+([a-zA-Z0-9_$]+)\s*\(",
    // const name = function()
    r"(?:const|let|var)\s+([a-zA-Z0-9_$]+)\s*=\s*function\s*\(",
    // const name = () =>
    r"(?:const|let|var)\s+([a-zA-Z0-9_$]+)\s*=\s*\([^)]*\)\s*=>",
    // Class.name = function
    r"(?:class|Object)\.([a-zA-Z0-9_$]+)\s*=\s*function",
    // name: function()
    r"([a-zA-Z0-9_$]+):\s*function\s*\(",
];

const CALL_PATTERN: &str = r"([a-zA-Z0-9_$]+)\s*\(";

static JS_KEYWORDS: &[&str] = &[
    "if", "for", "while", "switch", "catch", "function", "return", "typeof", "with",
];

/// A declaration found by one of the patterns
#[derive(Debug, Clone)]
struct Declaration {
    name: String,
    start: usize,
    end: usize,
    is_arrow: bool,
}

/// Heuristic JavaScript extractor
pub struct JavaScriptExtractor {
    declarations: Vec<Regex>,
    calls: CallScanner,
    max_brace_scan: usize,
    minified_probe_lines: usize,
    minified_line_length: usize,
}

impl JavaScriptExtractor {
    pub fn new(config: &ExtractionConfig) -> Result<Self> {
        let declarations = DECLARATION_PATTERNS.iter()
            .map(|pattern| Regex::new(pattern))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(Self {
            declarations,
            calls: CallScanner::new(CALL_PATTERN, JS_KEYWORDS, config.max_calls_per_function)?,
            max_brace_scan: config.max_brace_scan,
            minified_probe_lines: config.minified_probe_lines,
            minified_line_length: config.minified_line_length,
        })
    }

    /// All declarations in source order; a position matched by two patterns counts once
    fn find_declarations(&self, content: &str) -> Vec<Declaration> {
        let mut found: Vec<Declaration> = self.declarations.iter()
            .flat_map(|pattern| pattern.captures_iter(content))
            .filter_map(|cap| {
                let whole = cap.get(0)?;
                let name = cap.get(1)?;
                Some(Declaration {
                    name: name.as_str().to_string(),
                    start: whole.start(),
                    end: whole.end(),
                    is_arrow: whole.as_str().ends_with("=>"),
                })
            })
            .filter(|decl| !self.calls.is_keyword(&decl.name))
            .collect();

        found.sort_by_key(|decl| decl.start);
        found.dedup_by_key(|decl| decl.start);
        found
    }

    /// Body text (for call scanning) and snippet end for one declaration.
    ///
    /// `limit` is where the next declaration starts; an expression body never
    /// runs past it.
    fn body_of<'a>(&self, content: &'a str, decl: &Declaration, limit: usize) -> (&'a str, usize) {
        let rest = &content[decl.end..];

        if decl.is_arrow {
            let offset = rest.len() - rest.trim_start().len();
            if !rest[offset..].starts_with('{') {
                return self.expression_body(content, decl.end + offset, limit);
            }
            let span = match_brace_span(content, decl.end + offset, self.max_brace_scan);
            return (span.body(content), span.end);
        }

        match rest.find('{') {
            Some(brace) => {
                let span = match_brace_span(content, decl.end + brace, self.max_brace_scan);
                (span.body(content), span.end)
            }
            None => self.expression_body(content, decl.end, limit),
        }
    }

    /// Expression body starting at `start`: ends at the first `;` or newline
    /// outside brackets, at `limit`, or at the scan cap
    fn expression_body<'a>(&self, content: &'a str, start: usize, limit: usize) -> (&'a str, usize) {
        let mut cap = content.len().min(limit.max(start)).min(start + self.max_brace_scan);
        while !content.is_char_boundary(cap) {
            cap -= 1;
        }

        let mut depth = 0usize;
        for (i, ch) in content[start..cap].char_indices() {
            match ch {
                '(' | '[' | '{' => depth += 1,
                ')' | ']' | '}' => depth = depth.saturating_sub(1),
                ';' if depth == 0 => return (&content[start..start + i], start + i + 1),
                '\n' if depth == 0 => return (&content[start..start + i], start + i),
                _ => {}
            }
        }

        let body = content[start..cap].trim_end();
        (body, start + body.len())
    }
}

impl LanguageExtractor for JavaScriptExtractor {
    fn extract_source(&self, content: &str, file_path: &Path) -> Result<FileExtraction> {
        let mut extraction = FileExtraction::new();

        if looks_minified(content, self.minified_probe_lines, self.minified_line_length) {
            info!("Skipping likely minified JS file: {}", file_path.display());
            return Ok(extraction);
        }

        let declarations = self.find_declarations(content);
        for (index, decl) in declarations.iter().enumerate() {
            let function = FunctionId::new(file_path, decl.name.as_str());
            extraction.add_function(function.clone());

            let limit = declarations.get(index + 1).map_or(content.len(), |next| next.start);
            let (body, snippet_end) = self.body_of(content, decl, limit);
            extraction.add_snippet(function.clone(), content[decl.start..snippet_end].to_string());

            for callee in self.calls.scan(body, &decl.name) {
                extraction.add_edge(&function, &callee);
            }
        }

        Ok(extraction)
    }

    fn file_extensions(&self) -> &[&str] {
        &["js"]
    }

    fn language_name(&self) -> &str {
        "javascript"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor() -> JavaScriptExtractor {
        JavaScriptExtractor::new(&ExtractionConfig::default()).unwrap()
    }

    fn edges(extraction: &FileExtraction) -> Vec<(&str, &str)> {
        extraction.edges.iter()
            .map(|e| (e.caller.name.as_str(), e.callee.name.as_str()))
            .collect()
    }

    #[test]
    fn test_declaration_forms() {
        let source = r#"
function render(state) {
    const html = template(state);
    mount(html);
}

const load = function (url) {
    return fetch(url);
};

let double = (x) => x * scale(x);

var handlers = {
    onClick: function (event) {
        render(event.state);
    }
};
"#;
        let extraction = extractor().extract_source(source, Path::new("/web/app.js")).unwrap();
        let names: Vec<&str> = extraction.functions.iter().map(|f| f.name.as_str()).collect();

        assert_eq!(names, vec!["render", "load", "double", "onClick"]);
        assert_eq!(
            edges(&extraction),
            vec![
                ("render", "template"),
                ("render", "mount"),
                ("load", "fetch"),
                ("double", "scale"),
                ("onClick", "render"),
            ]
        );
    }

    #[test]
    fn test_snippet_starts_at_declaration() {
        let source = "function a() {\n  b();\n}\n\nfunction b() {\n  return 1;\n}\n";
        let extraction = extractor().extract_source(source, Path::new("x.js")).unwrap();

        assert_eq!(extraction.snippets[&FunctionId::new("x.js", "a")], "function a() {\n  b();\n}");
        assert_eq!(extraction.snippets[&FunctionId::new("x.js", "b")], "function b() {\n  return 1;\n}");
    }

    #[test]
    fn test_keywords_and_recursion_dropped() {
        let source = "function walk(node) {\n  if (node) {\n    for (const c of node.children) { walk(c); }\n    setTimeout(function () { done(); });\n  }\n}\n";
        let extraction = extractor().extract_source(source, Path::new("t.js")).unwrap();

        assert_eq!(edges(&extraction), vec![("walk", "setTimeout"), ("walk", "done")]);
    }

    #[test]
    fn test_arrow_without_semicolon_ends_at_line() {
        let source = "const double = (x) => scale(x)\n\nfunction render() {\n  draw()\n}\n";
        let extraction = extractor().extract_source(source, Path::new("v.js")).unwrap();

        assert_eq!(edges(&extraction), vec![("double", "scale"), ("render", "draw")]);
        assert_eq!(
            extraction.snippets[&FunctionId::new("v.js", "double")],
            "const double = (x) => scale(x)"
        );
    }

    #[test]
    fn test_arrow_expression_spanning_lines() {
        let source = "const total = (items) =>\n  sum(items.map(\n    (i) => price(i)\n  ))\nconst shown = (x) => { log(x); }\n";
        let extraction = extractor().extract_source(source, Path::new("c.js")).unwrap();

        assert_eq!(
            edges(&extraction),
            vec![("total", "sum"), ("total", "map"), ("total", "price"), ("shown", "log")]
        );
    }

    #[test]
    fn test_minified_file_is_skipped() {
        let source = format!("function a(){{b()}}{}\nfunction c() {{ d(); }}\n", ";".repeat(600));
        let extraction = extractor().extract_source(&source, Path::new("bundle.js")).unwrap();
        assert!(extraction.is_empty());
    }
}
