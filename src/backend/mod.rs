pub mod openai;
pub mod stats;

use crate::error::FeedbackError;
use async_trait::async_trait;
use futures_util::Stream;
use std::pin::Pin;

pub use openai::OpenAiBackend;
pub use stats::{BackendStats, BackendStatsSnapshot};

/// Incremental text chunks from a streaming completion. Dropping the stream
/// cancels the underlying request.
pub type TextStream = Pin<Box<dyn Stream<Item = Result<String, FeedbackError>> + Send>>;

#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub system: String,
    pub prompt: String,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
}

/// The outbound text-generation dependency.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    fn name(&self) -> &str;

    /// Returns the whole completion text. An absent completion is returned as
    /// an empty string; the caller decides what that means.
    async fn complete(&self, request: &CompletionRequest) -> Result<String, FeedbackError>;

    async fn complete_stream(&self, request: &CompletionRequest) -> Result<TextStream, FeedbackError>;
}
