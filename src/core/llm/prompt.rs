//! Prompt construction and chunking for level summaries

use crate::core::call_graph::FunctionId;

/// Appended to every chunk after the function blocks
pub const ANALYSIS_INSTRUCTIONS: &str = "\n\nFor each function above, provide:\n\
1. A one-line summary of what it does\n\
2. A relevance score (0-100) to the described project\n\
3. A brief explanation for the score\n\n\
Format your response in a table with columns: Function, Summary, Score, Explanation";

/// Opening of every chunk, carrying the user's project description
pub fn chunk_header(description: &str) -> String {
    format!("You are analyzing functions from a codebase with this description:\n{}\n\n", description)
}

/// One function's block inside a chunk
pub fn function_block(function: &FunctionId, code: &str) -> String {
    format!("Function: {}\n```\n{}\n```\n\n", function.clean_label(), code)
}

/// Complete prompt for one chunk
pub fn build_prompt(description: &str, functions: &[(FunctionId, String)]) -> String {
    let mut prompt = chunk_header(description);
    for (function, code) in functions {
        prompt.push_str(&function_block(function, code));
    }
    prompt.push_str(ANALYSIS_INSTRUCTIONS);
    prompt
}

/// Split a level's functions into chunks whose header plus blocks stay within
/// `budget` characters. A single block larger than the budget gets a chunk of
/// its own rather than being dropped.
pub fn chunk_functions(
    description: &str,
    functions: Vec<(FunctionId, String)>,
    budget: usize,
) -> Vec<Vec<(FunctionId, String)>> {
    let header_len = chunk_header(description).chars().count();
    let mut chunks = Vec::new();
    let mut current: Vec<(FunctionId, String)> = Vec::new();
    let mut current_len = header_len;

    for (function, code) in functions {
        let block_len = function_block(&function, &code).chars().count();
        if !current.is_empty() && current_len + block_len > budget {
            chunks.push(std::mem::take(&mut current));
            current_len = header_len;
        }
        current_len += block_len;
        current.push((function, code));
    }

    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

/// Keep table rows that mention one of the chunk's functions; when none do,
/// keep every non-empty line so the answer is not lost.
pub fn filter_response(text: &str, functions: &[(FunctionId, String)]) -> Vec<String> {
    let labels: Vec<String> = functions.iter().map(|(f, _)| f.clean_label()).collect();
    let lines: Vec<&str> = text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();

    let rows: Vec<String> = lines.iter()
        .filter(|line| line.contains('|') && labels.iter().any(|label| line.contains(label.as_str())))
        .map(|line| line.to_string())
        .collect();

    if rows.is_empty() {
        lines.into_iter().map(str::to_string).collect()
    } else {
        rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, code: &str) -> (FunctionId, String) {
        (FunctionId::new("/r/a.py", name), code.to_string())
    }

    #[test]
    fn test_prompt_layout() {
        let prompt = build_prompt("A billing service", &[entry("f", "def f(): pass")]);

        assert!(prompt.starts_with(
            "You are analyzing functions from a codebase with this description:\nA billing service\n\nFunction: a.py::f\n```\ndef f(): pass\n```\n\n"
        ));
        assert!(prompt.ends_with("columns: Function, Summary, Score, Explanation"));
    }

    #[test]
    fn test_chunks_respect_budget() {
        let code = "x".repeat(100);
        let functions: Vec<_> = (0..10).map(|i| entry(&format!("f{}", i), &code)).collect();
        let block = function_block(&functions[0].0, &code).chars().count();
        let header = chunk_header("d").chars().count();

        let chunks = chunk_functions("d", functions, header + block * 3);
        let sizes: Vec<usize> = chunks.iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![3, 3, 3, 1]);
    }

    #[test]
    fn test_oversized_function_gets_own_chunk() {
        let functions = vec![entry("small", "a"), entry("huge", &"y".repeat(500)), entry("tail", "b")];
        let chunks = chunk_functions("", functions, 200);

        let names: Vec<Vec<&str>> = chunks.iter()
            .map(|c| c.iter().map(|(f, _)| f.name.as_str()).collect())
            .collect();
        assert_eq!(names, vec![vec!["small"], vec!["huge"], vec!["tail"]]);
    }

    #[test]
    fn test_filter_keeps_matching_rows() {
        let functions = [entry("load", ""), entry("save", "")];
        let text = "| Function | Summary |\n|---|---|\n| a.py::load | reads |\n| a.py::save | writes |\nThanks!";

        assert_eq!(
            filter_response(text, &functions),
            vec!["| a.py::load | reads |", "| a.py::save | writes |"]
        );
    }

    #[test]
    fn test_filter_falls_back_to_all_lines() {
        let functions = [entry("load", "")];
        let text = "load reads rows\n\nno table here";
        assert_eq!(filter_response(text, &functions), vec!["load reads rows", "no table here"]);
    }
}
