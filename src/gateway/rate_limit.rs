use axum::http::HeaderMap;
use moka::sync::Cache;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

const WINDOW: Duration = Duration::from_secs(60);

/// Fixed-window request limiter keyed by client address. A window opens on a
/// client's first request and closes one minute later regardless of traffic.
pub struct RateLimiter {
    windows: Cache<String, Arc<AtomicU32>>,
    limit: u32,
}

impl RateLimiter {
    /// `limit` requests per client per minute; zero disables limiting.
    pub fn per_minute(limit: u32) -> Self {
        Self {
            windows: Cache::builder()
                .max_capacity(100_000)
                .time_to_live(WINDOW)
                .build(),
            limit,
        }
    }

    /// Counts one request against `client` and reports whether it fits in the
    /// current window.
    pub fn check(&self, client: &str) -> bool {
        if self.limit == 0 {
            return true;
        }
        let counter = self
            .windows
            .get_with(client.to_string(), || Arc::new(AtomicU32::new(0)));
        counter.fetch_add(1, Ordering::Relaxed) < self.limit
    }
}

/// Client identity as seen behind a proxy.
pub fn client_id(headers: &HeaderMap) -> String {
    ["x-forwarded-for", "x-real-ip"]
        .iter()
        .filter_map(|name| headers.get(*name))
        .filter_map(|v| v.to_str().ok())
        .map(str::trim)
        .find(|v| !v.is_empty())
        .unwrap_or("unknown")
        .to_string()
}
