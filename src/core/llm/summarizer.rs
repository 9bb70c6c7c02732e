use async_trait::async_trait;

use crate::core::call_graph::FunctionId;
use crate::error::Result;

/// Summarization capability used to annotate traversal levels.
///
/// Implementations get one chunk at a time and must not retry on their own;
/// the caller applies the timeout and records failures per chunk.
#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Result lines for the given functions, ideally one per function
    async fn summarize(&self, context: &str, functions: &[(FunctionId, String)]) -> Result<Vec<String>>;

    /// Get provider name
    fn provider_name(&self) -> &str;

    /// Get model name
    fn model_name(&self) -> &str;
}
