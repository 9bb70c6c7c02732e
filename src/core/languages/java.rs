use std::path::Path;
use regex::Regex;

use crate::config::ExtractionConfig;
use crate::error::Result;
use super::{match_brace_span, CallScanner, FileExtraction, LanguageExtractor};
use super::super::call_graph::FunctionId;

/// Method declarations: modifiers and type tokens, then `name(params)` followed by `{` or `throws`
const DECLARATION_PATTERN: &str =
    r"(?:public|private|protected|static|\s)+(?:[\w<>\[\]]+\s+)*(\w+)\s*\([^)]*\)\s*(?:\{|throws)";

/// Call sites: `name(` preceded by whitespace, a dot or start of input
const CALL_PATTERN: &str = r"(?:\s|\.|^)([a-zA-Z0-9_]+)\s*\(";

/// Statement keywords that look like calls or declarations to the patterns above
static JAVA_KEYWORDS: &[&str] = &[
    "if", "for", "while", "switch", "catch", "synchronized", "return", "try", "do", "else",
    "new", "throw",
];

/// Heuristic Java extractor
pub struct JavaExtractor {
    declaration: Regex,
    calls: CallScanner,
    max_brace_scan: usize,
}

impl JavaExtractor {
    pub fn new(config: &ExtractionConfig) -> Result<Self> {
        Ok(Self {
            declaration: Regex::new(DECLARATION_PATTERN)?,
            calls: CallScanner::new(CALL_PATTERN, JAVA_KEYWORDS, config.max_calls_per_function)?,
            max_brace_scan: config.max_brace_scan,
        })
    }
}

impl LanguageExtractor for JavaExtractor {
    fn extract_source(&self, content: &str, file_path: &Path) -> Result<FileExtraction> {
        let mut extraction = FileExtraction::new();

        for declaration in self.declaration.captures_iter(content) {
            let (Some(whole), Some(name)) = (declaration.get(0), declaration.get(1)) else {
                continue;
            };
            let method_name = name.as_str();
            if self.calls.is_keyword(method_name) {
                continue;
            }

            let function = FunctionId::new(file_path, method_name);
            extraction.add_function(function.clone());

            // Abstract and interface methods end in ';' before any body opens
            let Some(open) = body_open(content, whole.start()) else {
                continue;
            };

            let span = match_brace_span(content, open, self.max_brace_scan);
            let snippet_start = whole.start() + (whole.as_str().len() - whole.as_str().trim_start().len());
            extraction.add_snippet(function.clone(), content[snippet_start..span.end].to_string());

            for callee in self.calls.scan(span.body(content), method_name) {
                extraction.add_edge(&function, &callee);
            }
        }

        Ok(extraction)
    }

    fn file_extensions(&self) -> &[&str] {
        &["java"]
    }

    fn language_name(&self) -> &str {
        "java"
    }
}

/// Offset of the first `{` at or after `from`, unless a `;` comes first
fn body_open(content: &str, from: usize) -> Option<usize> {
    let rest = &content[from..];
    let brace = rest.find('{')?;
    match rest.find(';') {
        Some(semicolon) if semicolon < brace => None,
        _ => Some(from + brace),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor() -> JavaExtractor {
        JavaExtractor::new(&ExtractionConfig::default()).unwrap()
    }

    fn names(extraction: &FileExtraction) -> Vec<&str> {
        extraction.functions.iter().map(|f| f.name.as_str()).collect()
    }

    fn edges(extraction: &FileExtraction) -> Vec<(&str, &str)> {
        extraction.edges.iter()
            .map(|e| (e.caller.name.as_str(), e.callee.name.as_str()))
            .collect()
    }

    const SOURCE: &str = r#"
public class Service {
    private final Repo repo;

    public List<String> load(int id) throws IOException {
        if (id < 0) {
            throw new IllegalArgumentException("bad");
        }
        validate(id);
        return repo.fetch(id);
    }

    private static void validate(int id) {
        for (int i = 0; i < id; i++) {
            log(i);
        }
    }
}
"#;

    #[test]
    fn test_methods_and_calls() {
        let extraction = extractor().extract_source(SOURCE, Path::new("/src/Service.java")).unwrap();

        assert_eq!(names(&extraction), vec!["load", "validate"]);
        assert_eq!(
            edges(&extraction),
            vec![
                ("load", "IllegalArgumentException"),
                ("load", "validate"),
                ("load", "fetch"),
                ("validate", "log"),
            ]
        );
        for edge in &extraction.edges {
            assert_eq!(edge.callee.file_path, Path::new("/src/Service.java"));
        }
    }

    #[test]
    fn test_snippet_spans_whole_method() {
        let extraction = extractor().extract_source(SOURCE, Path::new("Service.java")).unwrap();
        let snippet = &extraction.snippets[&FunctionId::new("Service.java", "validate")];

        assert!(snippet.starts_with("private static void validate(int id)"));
        assert!(snippet.trim_end().ends_with('}'));
        assert!(snippet.contains("log(i);"));
    }

    #[test]
    fn test_control_flow_is_not_a_method() {
        let source = "class A {\n    void run() {\n        while (running) {\n            step();\n        }\n    }\n}\n";
        let extraction = extractor().extract_source(source, Path::new("A.java")).unwrap();

        assert_eq!(names(&extraction), vec!["run"]);
        assert_eq!(edges(&extraction), vec![("run", "step")]);
    }

    #[test]
    fn test_recursion_is_not_an_edge() {
        let source = "class A {\n    int fact(int n) {\n        return n * fact(n - 1);\n    }\n}\n";
        let extraction = extractor().extract_source(source, Path::new("A.java")).unwrap();
        assert!(extraction.edges.is_empty());
    }

    #[test]
    fn test_abstract_method_has_no_body() {
        let source = "interface Shape {\n    double area() throws X;\n}\nclass B {\n    void b() {\n        c();\n    }\n}\n";
        let extraction = extractor().extract_source(source, Path::new("Shape.java")).unwrap();

        assert_eq!(names(&extraction), vec!["area", "b"]);
        assert!(!extraction.snippets.contains_key(&FunctionId::new("Shape.java", "area")));
        assert_eq!(edges(&extraction), vec![("b", "c")]);
    }

    #[test]
    fn test_call_cap_per_method() {
        let calls: String = (0..80).map(|i| format!("        call{}();\n", i)).collect();
        let source = format!("class A {{\n    void busy() {{\n{}    }}\n}}\n", calls);
        let extraction = extractor().extract_source(&source, Path::new("A.java")).unwrap();
        assert_eq!(extraction.edges.len(), 50);
    }

    #[test]
    fn test_unterminated_body_is_best_effort() {
        let source = "class A {\n    void open() {\n        a();\n        b();\n";
        let extraction = extractor().extract_source(source, Path::new("A.java")).unwrap();
        assert_eq!(edges(&extraction), vec![("open", "a"), ("open", "b")]);
    }
}
