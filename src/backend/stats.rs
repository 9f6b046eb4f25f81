use serde::Serialize;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::Duration;

#[derive(Debug, Default)]
pub struct BackendStats {
    pub request_count: AtomicU64,
    pub error_count: AtomicU64,
    // EWMA of latency (microseconds)
    pub ewma_latency_us: AtomicU64,
    pub consec_errors: AtomicU32,
}

#[derive(Debug, Clone, Serialize)]
pub struct BackendStatsSnapshot {
    pub request_count: u64,
    pub error_count: u64,
    pub consecutive_errors: u32,
    pub ewma_latency_ms: f64,
}

impl BackendStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_success(&self, latency: Duration) {
        self.request_count.fetch_add(1, Ordering::Relaxed);
        self.consec_errors.store(0, Ordering::Relaxed);

        let latency_us = latency.as_micros() as u64;

        // new_avg = (old_avg * 7 + sample) / 8, seeded by the first sample.
        let mut old = self.ewma_latency_us.load(Ordering::Relaxed);
        loop {
            let new_val = if old == 0 {
                latency_us
            } else {
                (old * 7 + latency_us) / 8
            };

            match self.ewma_latency_us.compare_exchange_weak(
                old,
                new_val,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(x) => old = x,
            }
        }
    }

    pub fn record_failure(&self) {
        self.request_count.fetch_add(1, Ordering::Relaxed);
        self.error_count.fetch_add(1, Ordering::Relaxed);
        self.consec_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> BackendStatsSnapshot {
        BackendStatsSnapshot {
            request_count: self.request_count.load(Ordering::Relaxed),
            error_count: self.error_count.load(Ordering::Relaxed),
            consecutive_errors: self.consec_errors.load(Ordering::Relaxed),
            ewma_latency_ms: self.ewma_latency_us.load(Ordering::Relaxed) as f64 / 1000.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ewma_tracks_latency() {
        let stats = BackendStats::new();
        stats.record_success(Duration::from_millis(80));
        assert_eq!(stats.snapshot().ewma_latency_ms, 80.0);
        stats.record_success(Duration::from_millis(160));
        assert_eq!(stats.snapshot().ewma_latency_ms, 90.0);
    }

    #[test]
    fn failures_reset_on_success() {
        let stats = BackendStats::new();
        stats.record_failure();
        stats.record_failure();
        assert_eq!(stats.snapshot().consecutive_errors, 2);
        stats.record_success(Duration::from_millis(1));
        let snap = stats.snapshot();
        assert_eq!(snap.consecutive_errors, 0);
        assert_eq!(snap.error_count, 2);
        assert_eq!(snap.request_count, 3);
    }
}
