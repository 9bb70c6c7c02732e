//! Summarization of traversal levels
//!
//! The traversal only needs "summarize these functions in this context".
//! Providers behind the `Summarizer` trait turn that into HTTP calls; the
//! prompt module owns the text sent and the filtering of what comes back.

mod prompt;
mod providers;
mod summarizer;

pub use prompt::chunk_functions;
pub use providers::create_summarizer;
pub use summarizer::Summarizer;
