use anyhow::Context;
use feedback_edge::backend::OpenAiBackend;
use feedback_edge::cache::FeedbackCache;
use feedback_edge::config::AppConfig;
use feedback_edge::gateway::{self, rate_limit::RateLimiter, AppState};
use feedback_edge::retry::RetryPolicy;
use feedback_edge::service::GenerationService;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = AppConfig::from_env().context("invalid configuration")?;
    if config.provider.api_key.is_none() {
        warn!("OPENAI_API_KEY is not set; generation requests will fail until it is configured");
    }

    let cache = Arc::new(FeedbackCache::new(&config.cache));
    let _sweeper = cache.spawn_sweeper(config.cache.sweep_interval);

    let backend = OpenAiBackend::new(config.provider.clone()).context("building backend")?;
    let service = Arc::new(GenerationService::new(
        cache,
        Arc::new(backend),
        RetryPolicy::default(),
    ));

    let state = Arc::new(AppState {
        service,
        limiter: RateLimiter::per_minute(config.rate_limit_per_minute),
    });
    let app = gateway::router(state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("binding {}", config.bind_addr))?;
    info!(
        addr = %config.bind_addr,
        model = %config.provider.model,
        cache_ttl_secs = config.cache.ttl.as_secs(),
        cache_max_entries = config.cache.max_entries,
        "feedback gateway listening"
    );
    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
