use clap::{Parser, Subcommand};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use anyhow::Result;
use tokio::runtime::{Handle, RuntimeFlavor};

use crate::core::{
    function_listing, relationship_listing, snippet_sample, AlwaysContinue, AnalysisOutput,
    ContinuationGate, Engine, FirstCandidate, FunctionId, LevelAnnotation, LevelReport,
    LogProgress, SeedChooser, SeedResolution, TerminationReason, TraceOptions,
};

/// Number of extracted snippets printed after an analysis
const SNIPPET_SAMPLE_SIZE: usize = 5;

#[derive(Parser)]
#[command(name = "codelens")]
#[command(about = "Static call graphs for Python, Java and JavaScript, with bounded guided traversal")]
#[command(version)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a default codelens.toml
    Init {
        /// Target directory (defaults to current directory)
        #[arg(short, long)]
        path: Option<PathBuf>,
    },

    /// Build the call graph, print summaries and write the adjacency file
    Analyze {
        /// Source tree to analyze
        root: PathBuf,

        /// Where to write the adjacency list (defaults to report.output_file)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Skip the graph image
        #[arg(long)]
        no_visualize: bool,
    },

    /// Analyze, then walk the graph breadth-first from suspect functions
    Trace {
        /// Source tree to analyze
        root: PathBuf,

        /// Function name fragments to start from (asked for when omitted)
        #[arg(short, long = "functions", value_delimiter = ',', num_args = 1..)]
        functions: Vec<String>,

        /// Project description handed to the summarizer as context
        #[arg(short, long, default_value = "")]
        description: String,

        /// Override traversal.max_depth
        #[arg(long)]
        max_depth: Option<usize>,

        /// Run without prompts: take the first candidate and keep going
        #[arg(short, long)]
        yes: bool,
    },
}

impl Cli {
    pub async fn execute(self, engine: Engine) -> Result<()> {
        match self.command {
            Commands::Init { path } => {
                let written = engine.init(path)?;
                println!("Created {}", written.display());
                Ok(())
            }
            Commands::Analyze { root, output, no_visualize } => {
                let output = engine.analyze(&root, output, !no_visualize, &LogProgress)?;
                print_analysis(&engine, &output);
                Ok(())
            }
            Commands::Trace { root, functions, description, max_depth, yes } => {
                let output = engine.analyze(&root, None, false, &LogProgress)?;
                print_analysis(&engine, &output);

                let fragments = if functions.is_empty() && !yes {
                    prompt_fragments()?
                } else {
                    functions
                };

                let options = TraceOptions { fragments: &fragments, description: &description, max_depth };
                let report = if yes {
                    let gate = Printing(AlwaysContinue);
                    engine.trace(&output.analysis.graph, options, &FirstCandidate, &gate).await?
                } else {
                    let max_choices = engine.config().traversal.max_choices;
                    let chooser = PromptChooser { max_choices };
                    engine.trace(&output.analysis.graph, options, &chooser, &Printing(PromptGate)).await?
                };

                println!();
                match report.reason {
                    TerminationReason::NoValidSeeds => println!("No valid suspect functions found. Exiting."),
                    TerminationReason::MaxDepthReached => println!("Max depth reached."),
                    TerminationReason::Exhausted => println!("No further levels to explore."),
                    TerminationReason::UserStopped => println!("Stopping the analysis."),
                }
                Ok(())
            }
        }
    }
}

fn print_analysis(engine: &Engine, output: &AnalysisOutput) {
    let report = &engine.config().report;
    let graph = &output.analysis.graph;

    println!(
        "\nAnalyzed {} source files under {}",
        output.analysis.files.len(),
        output.analysis.root.display()
    );

    println!("\n=== ALL FUNCTIONS ===");
    print!("{}", function_listing(graph, report.function_list_limit));
    println!("\nTotal functions found: {}", graph.function_count());

    println!("\n=== FUNCTION CALL GRAPH (Adjacency List) ===");
    print!("{}", relationship_listing(graph, report.relationship_limit, report.callees_per_line));

    println!("\nResults written to {}", output.artifact.display());
    if let Some(image) = output.visualization.as_ref().and_then(|v| v.image_file.as_ref()) {
        println!("Graph saved as {}", image.display());
    } else if let Some(dot) = output.visualization.as_ref().and_then(|v| v.dot_file.as_ref()) {
        println!("Graph description saved as {}", dot.display());
    }

    println!("\n=== EXTRACTED FUNCTION CODE BLOCKS (Sample) ===");
    let (sample, omitted) = snippet_sample(graph, SNIPPET_SAMPLE_SIZE);
    if sample.is_empty() {
        println!("No code blocks extracted.");
    }
    for (function, code) in sample {
        println!("\nFunction: {}", function.clean_label());
        println!("Code:");
        println!("{}", code);
        println!("{}", "-".repeat(40));
    }
    if omitted > 0 {
        println!("... and {} more functions.\n", omitted);
    }
}

fn read_line() -> io::Result<String> {
    off_runtime(|| {
        io::stdout().flush()?;
        let mut line = String::new();
        io::stdin().lock().read_line(&mut line)?;
        Ok(line.trim().to_string())
    })
}

/// Run a blocking call without stalling other tasks on a multi-threaded runtime
fn off_runtime<T>(f: impl FnOnce() -> T) -> T {
    match Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
            tokio::task::block_in_place(f)
        }
        _ => f(),
    }
}

fn prompt_fragments() -> Result<Vec<String>> {
    println!("\n=== BFS ANALYSIS ===");
    println!("Enter function names to analyze (comma separated):");
    print!("> ");
    let line = read_line()?;
    Ok(line.split(',')
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .collect())
}

/// Numbered stdin menu; 0 or anything unparsable skips
struct PromptChooser {
    max_choices: usize,
}

impl SeedChooser for PromptChooser {
    fn choose(&self, fragment: &str, candidates: &[FunctionId]) -> Option<FunctionId> {
        println!("\nMultiple matches found for '{}':", fragment);
        let shown = &candidates[..candidates.len().min(self.max_choices.max(1))];
        for (i, candidate) in shown.iter().enumerate() {
            println!("{}. {}", i + 1, candidate.clean_label());
        }
        print!("Select a number (or 0 to skip): ");

        let choice: usize = read_line().ok()?.parse().ok()?;
        choice.checked_sub(1).and_then(|index| shown.get(index)).cloned()
    }
}

/// Asks on stdin before each deeper level
struct PromptGate;

impl ContinuationGate for PromptGate {
    fn confirm_continue(&self, _report: &LevelReport) -> bool {
        print!("\nShall we continue? [y/n]: ");
        matches!(read_line(), Ok(answer) if answer.eq_ignore_ascii_case("y"))
    }
}

/// Prints seeds and levels, deferring the decision to the wrapped gate
struct Printing<G>(G);

impl<G: ContinuationGate> ContinuationGate for Printing<G> {
    fn confirm_continue(&self, report: &LevelReport) -> bool {
        self.0.confirm_continue(report)
    }

    fn seeds_resolved(&self, seeds: &SeedResolution) {
        for fragment in &seeds.missing {
            println!("No match found for '{}'", fragment);
        }
        for fragment in &seeds.skipped {
            println!("Skipping '{}'", fragment);
        }
        if seeds.is_empty() {
            return;
        }
        println!("\nStarting BFS analysis with {} suspect functions:", seeds.seeds.len());
        for seed in &seeds.seeds {
            println!("- {}", seed.clean_label());
        }
    }

    fn level_completed(&self, report: &LevelReport) {
        println!("\n=== Level {} Functions ===", report.number());
        println!("Found {} functions at this level", report.level.entries.len());
        match &report.annotation {
            LevelAnnotation::Summaries(lines) => {
                for line in lines {
                    println!("{}", line);
                }
            }
            LevelAnnotation::Labels(labels) => {
                for label in labels {
                    println!("- {}", label);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::time::Duration;

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn test_blocking_read_leaves_worker_free() {
        let (tx, rx) = mpsc::channel();

        // Occupies the only worker until the second task has run
        let reader = tokio::spawn(async move { off_runtime(move || rx.recv()) });
        let writer = tokio::spawn(async move { tx.send("y") });

        let answer = tokio::time::timeout(Duration::from_secs(5), reader).await;
        assert_eq!(answer.unwrap().unwrap(), Ok("y"));
        assert!(writer.await.unwrap().is_ok());
    }

    #[test]
    fn test_blocking_read_outside_runtime() {
        assert_eq!(off_runtime(|| 7), 7);
    }
}
