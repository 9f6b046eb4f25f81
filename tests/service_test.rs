mod common;

use common::{sample_snapshot, ScriptedBackend};
use feedback_edge::cache::{CacheConfig, FeedbackCache};
use feedback_edge::error::FeedbackError;
use feedback_edge::model::{FeedbackStyle, Language};
use feedback_edge::retry::RetryPolicy;
use feedback_edge::service::GenerationService;
use futures_util::StreamExt;
use std::sync::Arc;
use std::time::Duration;

fn service_with(backend: Arc<ScriptedBackend>) -> GenerationService {
    let cache = Arc::new(FeedbackCache::new(&CacheConfig::default()));
    GenerationService::new(cache, backend, RetryPolicy::default())
}

#[tokio::test(start_paused = true)]
async fn cache_hit_skips_backend_until_style_changes() {
    let backend = Arc::new(ScriptedBackend::new());
    let service = service_with(backend.clone());
    let s1 = sample_snapshot();

    let first = service
        .generate(&s1, FeedbackStyle::Focused, Language::English)
        .await;
    assert!(first.success);
    assert_eq!(first.feedback.as_deref(), Some("<p>Feedback #1</p>"));
    assert_eq!(backend.calls(), 1);

    let second = service
        .generate(&s1, FeedbackStyle::Focused, Language::English)
        .await;
    assert_eq!(second, first);
    assert_eq!(backend.calls(), 1, "identical request served from cache");

    let third = service
        .generate(&s1, FeedbackStyle::Comprehensive, Language::English)
        .await;
    assert!(third.success);
    assert_eq!(third.feedback.as_deref(), Some("<p>Feedback #2</p>"));
    assert_eq!(backend.calls(), 2);
    assert_eq!(service.cache_stats().total_entries, 2);
}

#[tokio::test(start_paused = true)]
async fn request_carries_style_budget_and_language_instruction() {
    let backend = Arc::new(ScriptedBackend::new());
    let service = service_with(backend.clone());

    service
        .generate(&sample_snapshot(), FeedbackStyle::Encouraging, Language::Korean)
        .await;
    let req = backend.last_request().expect("backend was called");
    assert_eq!(req.max_tokens, Some(600));
    assert!((req.temperature - 0.7).abs() < f32::EPSILON);
    assert!(req.prompt.contains("Alice"));
    assert!(!req.system.is_empty());
}

#[tokio::test(start_paused = true)]
async fn transient_failures_are_retried() {
    let backend = Arc::new(ScriptedBackend::with_replies(vec![
        Err(FeedbackError::Network("connection reset".into())),
        Err(FeedbackError::RateLimited("slow down".into())),
        Ok("  <p>Third time lucky</p>\n".into()),
    ]));
    let service = service_with(backend.clone());

    let outcome = service
        .generate(&sample_snapshot(), FeedbackStyle::Focused, Language::English)
        .await;
    assert!(outcome.success);
    assert_eq!(outcome.feedback.as_deref(), Some("<p>Third time lucky</p>"));
    assert_eq!(backend.calls(), 3);

    let stats = service.backend_stats();
    assert_eq!(stats.request_count, 3);
    assert_eq!(stats.error_count, 2);
    assert_eq!(stats.consecutive_errors, 0);
}

#[tokio::test(start_paused = true)]
async fn credential_error_is_not_retried() {
    let backend = Arc::new(ScriptedBackend::with_replies(vec![Err(FeedbackError::Api {
        status: 500,
        message: "Invalid API key provided".into(),
    })]));
    let service = service_with(backend.clone());

    let outcome = service
        .generate(&sample_snapshot(), FeedbackStyle::Focused, Language::English)
        .await;
    assert!(!outcome.success);
    assert!(outcome.feedback.is_none());
    assert_eq!(
        outcome.error.as_deref(),
        Some("API key not configured or invalid. Please check your API key.")
    );
    assert_eq!(backend.calls(), 1);
    assert_eq!(service.cache_stats().total_entries, 0);
}

#[tokio::test(start_paused = true)]
async fn blank_completion_is_an_error_and_not_cached() {
    let backend = Arc::new(ScriptedBackend::with_replies(vec![Ok("   \n".into())]));
    let service = service_with(backend.clone());
    let s = sample_snapshot();

    let outcome = service
        .generate(&s, FeedbackStyle::Focused, Language::English)
        .await;
    assert!(!outcome.success);
    assert_eq!(
        outcome.error.as_deref(),
        Some("AI generation error: No feedback generated from AI")
    );
    assert_eq!(backend.calls(), 1);

    let retry = service
        .generate(&s, FeedbackStyle::Focused, Language::English)
        .await;
    assert!(retry.success);
    assert_eq!(backend.calls(), 2);
}

#[tokio::test]
async fn invalid_snapshot_never_reaches_backend() {
    let backend = Arc::new(ScriptedBackend::new());
    let service = service_with(backend.clone());
    let mut s = sample_snapshot();
    s.period.end_date = s.period.start_date.pred_opt().unwrap();

    let outcome = service
        .generate(&s, FeedbackStyle::Focused, Language::English)
        .await;
    assert!(!outcome.success);
    assert!(outcome
        .error
        .unwrap()
        .starts_with("Invalid performance data:"));
    assert_eq!(backend.calls(), 0);

    let err = service
        .generate_stream(&s, FeedbackStyle::Focused, Language::English)
        .await
        .err()
        .expect("stream refused");
    assert!(matches!(err, FeedbackError::InvalidSnapshot(_)));
}

#[tokio::test]
async fn streaming_bypasses_the_cache() {
    let backend = Arc::new(ScriptedBackend::new());
    let service = service_with(backend.clone());
    let s = sample_snapshot();

    for _ in 0..2 {
        let stream = service
            .generate_stream(&s, FeedbackStyle::Comprehensive, Language::English)
            .await
            .unwrap();
        let text: Vec<String> = stream.map(|chunk| chunk.unwrap()).collect().await;
        assert_eq!(text.concat(), "<p>Live feedback</p>");
    }
    assert_eq!(backend.stream_calls(), 2);
    assert_eq!(backend.calls(), 0);
    assert_eq!(service.cache_stats().total_entries, 0);
}

#[tokio::test(start_paused = true)]
async fn cleared_cache_forces_regeneration() {
    let backend = Arc::new(ScriptedBackend::new());
    let service = service_with(backend.clone());
    let s = sample_snapshot();

    service.generate(&s, FeedbackStyle::Focused, Language::English).await;
    service.clear_cache();
    assert_eq!(service.cache_stats().total_entries, 0);

    let again = service
        .generate(&s, FeedbackStyle::Focused, Language::English)
        .await;
    assert_eq!(again.feedback.as_deref(), Some("<p>Feedback #2</p>"));
}

#[tokio::test(start_paused = true)]
async fn expired_entry_is_regenerated() {
    let backend = Arc::new(ScriptedBackend::new());
    let cache = Arc::new(FeedbackCache::new(&CacheConfig {
        ttl: Duration::from_secs(60),
        ..CacheConfig::default()
    }));
    let service = GenerationService::new(cache, backend.clone(), RetryPolicy::default());
    let s = sample_snapshot();

    service.generate(&s, FeedbackStyle::Focused, Language::English).await;
    tokio::time::advance(Duration::from_secs(61)).await;
    service.generate(&s, FeedbackStyle::Focused, Language::English).await;
    assert_eq!(backend.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn generic_backend_error_is_reported_by_symptom() {
    let backend = Arc::new(ScriptedBackend::with_replies(
        (0..4)
            .map(|_| {
                Err(FeedbackError::Api {
                    status: 502,
                    message: "upstream request timeout".into(),
                })
            })
            .collect(),
    ));
    let service = service_with(backend.clone());

    let outcome = service
        .generate(&sample_snapshot(), FeedbackStyle::Focused, Language::English)
        .await;
    assert_eq!(
        outcome.error.as_deref(),
        Some("Request timed out. Please try again.")
    );
    assert_eq!(backend.calls(), 4, "initial attempt plus three retries");
}

#[tokio::test(start_paused = true)]
async fn bad_request_without_credential_hint_is_retried() {
    let backend = Arc::new(ScriptedBackend::with_replies(vec![Err(FeedbackError::Api {
        status: 400,
        message: "context length exceeded".into(),
    })]));
    let service = service_with(backend.clone());

    let outcome = service
        .generate(&sample_snapshot(), FeedbackStyle::Focused, Language::English)
        .await;
    assert!(outcome.success);
    assert_eq!(backend.calls(), 2);
}
