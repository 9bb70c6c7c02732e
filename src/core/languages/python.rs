use std::path::Path;
use tree_sitter::{Node, Parser};

use crate::error::{CodelensError, Result};
use super::{FileExtraction, LanguageExtractor};
use super::super::call_graph::FunctionId;

/// Names provided by Python's builtins module; plain calls to these are not edges
static PYTHON_BUILTINS: &[&str] = &[
    "abs", "aiter", "all", "anext", "any", "ascii", "bin", "bool", "breakpoint", "bytearray",
    "bytes", "callable", "chr", "classmethod", "compile", "complex", "copyright", "credits",
    "delattr", "dict", "dir", "divmod", "enumerate", "eval", "exec", "exit", "filter", "float",
    "format", "frozenset", "getattr", "globals", "hasattr", "hash", "help", "hex", "id", "input",
    "int", "isinstance", "issubclass", "iter", "len", "license", "list", "locals", "map", "max",
    "memoryview", "min", "next", "object", "oct", "open", "ord", "pow", "print", "property",
    "quit", "range", "repr", "reversed", "round", "set", "setattr", "slice", "sorted",
    "staticmethod", "str", "sum", "super", "tuple", "type", "vars", "zip", "__import__",
    "__build_class__",
    // Exception types
    "ArithmeticError", "AssertionError", "AttributeError", "BaseException", "BlockingIOError",
    "BrokenPipeError", "BufferError", "ChildProcessError", "ConnectionAbortedError",
    "ConnectionError", "ConnectionRefusedError", "ConnectionResetError", "DeprecationWarning",
    "EOFError", "EnvironmentError", "Exception", "FileExistsError", "FileNotFoundError",
    "FloatingPointError", "GeneratorExit", "IOError", "ImportError", "IndentationError",
    "IndexError", "InterruptedError", "IsADirectoryError", "KeyError", "KeyboardInterrupt",
    "LookupError", "MemoryError", "ModuleNotFoundError", "NameError", "NotADirectoryError",
    "NotImplementedError", "OSError", "OverflowError", "PermissionError", "ProcessLookupError",
    "RecursionError", "ReferenceError", "RuntimeError", "RuntimeWarning", "StopAsyncIteration",
    "StopIteration", "SyntaxError", "SystemError", "SystemExit", "TabError", "TimeoutError",
    "TypeError", "UnboundLocalError", "UnicodeDecodeError", "UnicodeEncodeError",
    "UnicodeError", "UserWarning", "ValueError", "Warning", "ZeroDivisionError",
];

pub fn is_builtin(name: &str) -> bool {
    PYTHON_BUILTINS.contains(&name)
}

/// One step of the explicit tree walk
enum Visit<'tree> {
    Enter(Node<'tree>),
    /// Leaving a function definition; pops the enclosing-function stack
    Leave,
}

/// Python extractor using Tree-sitter.
///
/// Every `def` and `async def` (nested ones included) becomes a function.
/// Calls are attributed to the innermost enclosing definition; calls at
/// module or class level are dropped.
pub struct PythonExtractor;

impl PythonExtractor {
    pub fn new() -> Self {
        Self
    }

    fn parser(&self) -> Result<Parser> {
        let mut parser = Parser::new();
        let python_language = tree_sitter_python::language();
        parser.set_language(&python_language)
            .map_err(|e| CodelensError::Parser(format!("Failed to set Python language: {}", e)))?;
        Ok(parser)
    }

    fn walk(&self, root: Node, source: &str, file_path: &Path, extraction: &mut FileExtraction) {
        let lines: Vec<&str> = source.lines().collect();
        let mut enclosing: Vec<FunctionId> = Vec::new();
        let mut pending = vec![Visit::Enter(root)];

        while let Some(step) = pending.pop() {
            let node = match step {
                Visit::Leave => {
                    enclosing.pop();
                    continue;
                }
                Visit::Enter(node) => node,
            };

            match node.kind() {
                "function_definition" => {
                    if let Some(name_node) = node.child_by_field_name("name") {
                        let function = FunctionId::new(file_path, node_text(name_node, source));
                        extraction.add_function(function.clone());
                        extraction.add_snippet(function.clone(), line_slice(&lines, node));

                        enclosing.push(function);
                        pending.push(Visit::Leave);
                    }
                }
                "call" => {
                    if let Some(current) = enclosing.last() {
                        if let Some(callee) = callee_name(node, source) {
                            extraction.add_edge(current, callee);
                        }
                    }
                }
                _ => {}
            }

            // Children go on in reverse so they are visited in source order
            let mut cursor = node.walk();
            let children: Vec<Node> = node.children(&mut cursor).collect();
            pending.extend(children.into_iter().rev().map(Visit::Enter));
        }
    }
}

impl Default for PythonExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl LanguageExtractor for PythonExtractor {
    fn extract_source(&self, content: &str, file_path: &Path) -> Result<FileExtraction> {
        let mut parser = self.parser()?;
        let tree = parser.parse(content, None)
            .ok_or_else(|| CodelensError::Parser("Failed to parse Python code".to_string()))?;

        let root_node = tree.root_node();
        if root_node.has_error() {
            return Err(CodelensError::Parser(format!(
                "syntax error near line {}",
                first_error_line(root_node).unwrap_or(0)
            )));
        }

        let mut extraction = FileExtraction::new();
        self.walk(root_node, content, file_path, &mut extraction);
        Ok(extraction)
    }

    fn file_extensions(&self) -> &[&str] {
        &["py"]
    }

    fn language_name(&self) -> &str {
        "python"
    }
}

/// Name used for the edge: plain names unless builtin, the attribute of
/// `obj.method(...)` regardless of the receiver
fn callee_name<'a>(call: Node, source: &'a str) -> Option<&'a str> {
    let function = call.child_by_field_name("function")?;
    match function.kind() {
        "identifier" => {
            let name = node_text(function, source);
            (!is_builtin(name)).then_some(name)
        }
        "attribute" => {
            let attribute = function.child_by_field_name("attribute")?;
            Some(node_text(attribute, source))
        }
        _ => None,
    }
}

fn node_text<'a>(node: Node, source: &'a str) -> &'a str {
    &source[node.byte_range()]
}

/// Exact source lines spanned by a definition
fn line_slice(lines: &[&str], node: Node) -> String {
    let start = node.start_position().row;
    if start >= lines.len() {
        return String::new();
    }
    let mut end = node.end_position().row;
    // A node ending at column 0 stops before that row's text
    if node.end_position().column == 0 && end > start {
        end -= 1;
    }
    let end = end.min(lines.len() - 1).max(start);
    lines[start..=end].join("\n")
}

fn first_error_line(node: Node) -> Option<usize> {
    if node.is_error() || node.is_missing() {
        return Some(node.start_position().row + 1);
    }
    let mut cursor = node.walk();
    let children: Vec<Node> = node.children(&mut cursor).collect();
    children.into_iter()
        .filter(|child| child.has_error())
        .find_map(first_error_line)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(source: &str) -> FileExtraction {
        PythonExtractor::new().extract_source(source, Path::new("/repo/a.py")).unwrap()
    }

    fn edges(extraction: &FileExtraction) -> Vec<(&str, &str)> {
        extraction.edges.iter()
            .map(|e| (e.caller.name.as_str(), e.callee.name.as_str()))
            .collect()
    }

    #[test]
    fn test_simple_call() {
        let extraction = extract("def f():\n    g()\n\ndef g():\n    pass\n");

        let names: Vec<&str> = extraction.functions.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["f", "g"]);
        assert_eq!(edges(&extraction), vec![("f", "g")]);
        assert_eq!(extraction.edges[0].callee, FunctionId::new("/repo/a.py", "g"));
    }

    #[test]
    fn test_builtins_and_methods() {
        let source = "def f(items):\n    print(len(items))\n    items.append(helper())\n";
        let extraction = extract(source);

        // print/len are builtins; `append` is kept without resolving its receiver
        assert_eq!(edges(&extraction), vec![("f", "append"), ("f", "helper")]);
    }

    #[test]
    fn test_nested_and_async_definitions() {
        let source = "\
async def outer():
    def inner():
        deep()
    inner()
    await later()
";
        let extraction = extract(source);

        let names: Vec<&str> = extraction.functions.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["outer", "inner"]);
        assert_eq!(
            edges(&extraction),
            vec![("inner", "deep"), ("outer", "inner"), ("outer", "later")]
        );
    }

    #[test]
    fn test_module_level_calls_dropped() {
        let source = "setup()\n\nclass A:\n    x = make()\n\n    def m(self):\n        self.run()\n";
        let extraction = extract(source);
        assert_eq!(edges(&extraction), vec![("m", "run")]);
    }

    #[test]
    fn test_snippet_is_exact_source() {
        let source = "import os\n\n@decorate\ndef f(a,\n      b):\n    return a + b\n\nx = 1\n";
        let extraction = extract(source);

        assert_eq!(
            extraction.snippets[&FunctionId::new("/repo/a.py", "f")],
            "def f(a,\n      b):\n    return a + b"
        );
    }

    #[test]
    fn test_syntax_error_yields_empty_extraction() {
        let extractor = PythonExtractor::new();
        assert!(extractor.extract_source("def broken(:\n", Path::new("b.py")).is_err());

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("b.py");
        std::fs::write(&path, "def broken(:\n    pass\n").unwrap();
        assert!(extractor.extract(&path).is_empty());
    }
}
