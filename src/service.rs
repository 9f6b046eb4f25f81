//! Buffered and streaming feedback generation on top of the cache, the
//! prompt templates and a generation backend.

use crate::backend::{BackendStats, BackendStatsSnapshot, CompletionRequest, GenerationBackend, TextStream};
use crate::cache::{derive_key, CacheStats, FeedbackCache};
use crate::error::FeedbackError;
use crate::model::{FeedbackOutcome, FeedbackStyle, Language, PerformanceSnapshot};
use crate::prompt::{render_prompt, system_instruction};
use crate::retry::RetryPolicy;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

pub const TEMPERATURE: f32 = 0.7;

pub struct GenerationService {
    cache: Arc<FeedbackCache>,
    backend: Arc<dyn GenerationBackend>,
    retry: RetryPolicy,
    stats: Arc<BackendStats>,
}

impl GenerationService {
    pub fn new(
        cache: Arc<FeedbackCache>,
        backend: Arc<dyn GenerationBackend>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            cache,
            backend,
            retry,
            stats: Arc::new(BackendStats::new()),
        }
    }

    /// Returns cached feedback when an identical request was answered within
    /// the TTL, otherwise asks the backend (with retries) and caches the
    /// trimmed result. Never fails: errors come back as an unsuccessful
    /// outcome carrying a user-facing message.
    pub async fn generate(
        &self,
        snapshot: &PerformanceSnapshot,
        style: FeedbackStyle,
        language: Language,
    ) -> FeedbackOutcome {
        match self.try_generate(snapshot, style, language).await {
            Ok(feedback) => FeedbackOutcome::success(feedback),
            Err(e) => {
                error!(
                    student = %snapshot.student.name,
                    style = %style,
                    language = %language,
                    error = %e,
                    "feedback generation failed"
                );
                FeedbackOutcome::failure(e.user_message())
            }
        }
    }

    async fn try_generate(
        &self,
        snapshot: &PerformanceSnapshot,
        style: FeedbackStyle,
        language: Language,
    ) -> Result<String, FeedbackError> {
        let key = derive_key(snapshot, style, language)?;
        if let Some(feedback) = self.cache.get(&key) {
            info!(student = %snapshot.student.name, style = %style, language = %language, key = %key, "cache hit");
            return Ok(feedback);
        }

        let request = self.request_for(snapshot, style, language)?;
        info!(
            student = %snapshot.student.name,
            style = %style,
            language = %language,
            prompt_len = request.prompt.len(),
            backend = self.backend.name(),
            "generating feedback"
        );

        let text = self
            .retry
            .execute(|| async {
                let start = Instant::now();
                let result = self.backend.complete(&request).await;
                match &result {
                    Ok(_) => self.stats.record_success(start.elapsed()),
                    Err(_) => self.stats.record_failure(),
                }
                result
            })
            .await?;

        let feedback = text.trim();
        if feedback.is_empty() {
            return Err(FeedbackError::EmptyCompletion);
        }
        let feedback = feedback.to_string();
        self.cache.put(key, feedback.clone());
        info!(student = %snapshot.student.name, chars = feedback.len(), "feedback generated and cached");
        Ok(feedback)
    }

    /// Opens a streaming completion. Streams are never cached or retried.
    pub async fn generate_stream(
        &self,
        snapshot: &PerformanceSnapshot,
        style: FeedbackStyle,
        language: Language,
    ) -> Result<TextStream, FeedbackError> {
        let request = self.request_for(snapshot, style, language)?;
        info!(
            student = %snapshot.student.name,
            style = %style,
            language = %language,
            prompt_len = request.prompt.len(),
            "opening feedback stream"
        );
        self.backend.complete_stream(&request).await.map_err(|e| {
            error!(student = %snapshot.student.name, error = %e, "feedback stream failed to open");
            e
        })
    }

    fn request_for(
        &self,
        snapshot: &PerformanceSnapshot,
        style: FeedbackStyle,
        language: Language,
    ) -> Result<CompletionRequest, FeedbackError> {
        Ok(CompletionRequest {
            system: system_instruction(language).to_string(),
            prompt: render_prompt(style, language, snapshot)?,
            temperature: TEMPERATURE,
            max_tokens: Some(style.max_tokens()),
        })
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
        info!("feedback cache cleared");
    }

    pub fn backend_stats(&self) -> BackendStatsSnapshot {
        self.stats.snapshot()
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }
}
