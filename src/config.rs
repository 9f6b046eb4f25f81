use crate::cache::CacheConfig;
use crate::error::ConfigError;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

/// Connection details for one OpenAI-compatible backend.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub name: String,
    /// Base URL; `/chat/completions` is appended per request.
    pub endpoint: String,
    pub api_key: Option<String>,
    pub model: String,
    pub request_timeout: Duration,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            name: "openai".to_string(),
            endpoint: "https://api.openai.com/v1".to_string(),
            api_key: None,
            model: "gpt-4o-mini".to_string(),
            request_timeout: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub provider: ProviderConfig,
    pub cache: CacheConfig,
    pub rate_limit_per_minute: u32,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key/value source. Unset or blank
    /// values fall back to defaults; malformed ones are rejected.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = ProviderConfig::default();
        let cache_defaults = CacheConfig::default();

        let provider = ProviderConfig {
            name: defaults.name,
            endpoint: get("OPENAI_BASE_URL").unwrap_or(defaults.endpoint),
            api_key: get("OPENAI_API_KEY"),
            model: get("FEEDBACK_MODEL").unwrap_or(defaults.model),
            request_timeout: secs(&get, "FEEDBACK_REQUEST_TIMEOUT_SECS")?
                .unwrap_or(defaults.request_timeout),
        };

        let cache = CacheConfig {
            ttl: secs(&get, "FEEDBACK_CACHE_TTL_SECS")?.unwrap_or(cache_defaults.ttl),
            max_entries: parse(&get, "FEEDBACK_CACHE_MAX_ENTRIES", "a positive integer")?
                .unwrap_or(cache_defaults.max_entries),
            sweep_interval: secs(&get, "FEEDBACK_CACHE_SWEEP_SECS")?
                .unwrap_or(cache_defaults.sweep_interval),
        };
        if cache.max_entries == 0 {
            return Err(ConfigError::Invalid {
                key: "FEEDBACK_CACHE_MAX_ENTRIES",
                expected: "a positive integer",
                value: "0".to_string(),
            });
        }

        Ok(Self {
            bind_addr: parse(&get, "FEEDBACK_BIND_ADDR", "a socket address")?
                .unwrap_or_else(|| SocketAddr::from(([127, 0, 0, 1], 8080))),
            provider,
            cache,
            rate_limit_per_minute: parse(&get, "FEEDBACK_RATE_LIMIT_PER_MINUTE", "an integer")?
                .unwrap_or(10),
        })
    }
}

fn parse<T, G>(get: &G, key: &'static str, expected: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid {
                key,
                expected,
                value: raw,
            }),
    }
}

fn secs<G>(get: &G, key: &'static str) -> Result<Option<Duration>, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    Ok(parse::<u64, G>(get, key, "a whole number of seconds")?.map(Duration::from_secs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn defaults_when_unset() {
        let cfg = load(&[]).unwrap();
        assert_eq!(cfg.bind_addr, SocketAddr::from(([127, 0, 0, 1], 8080)));
        assert_eq!(cfg.provider.model, "gpt-4o-mini");
        assert_eq!(cfg.provider.endpoint, "https://api.openai.com/v1");
        assert!(cfg.provider.api_key.is_none());
        assert_eq!(cfg.provider.request_timeout, Duration::from_secs(60));
        assert_eq!(cfg.cache.ttl, Duration::from_secs(86_400));
        assert_eq!(cfg.cache.max_entries, 100);
        assert_eq!(cfg.cache.sweep_interval, Duration::from_secs(3_600));
        assert_eq!(cfg.rate_limit_per_minute, 10);
    }

    #[test]
    fn overrides_are_applied() {
        let cfg = load(&[
            ("FEEDBACK_BIND_ADDR", "0.0.0.0:9000"),
            ("OPENAI_API_KEY", "sk-test"),
            ("FEEDBACK_CACHE_MAX_ENTRIES", "5"),
            ("FEEDBACK_CACHE_TTL_SECS", " 30 "),
        ])
        .unwrap();
        assert_eq!(cfg.bind_addr.port(), 9000);
        assert_eq!(cfg.provider.api_key.as_deref(), Some("sk-test"));
        assert_eq!(cfg.cache.max_entries, 5);
        assert_eq!(cfg.cache.ttl, Duration::from_secs(30));
    }

    #[test]
    fn blank_key_counts_as_unset() {
        let cfg = load(&[("OPENAI_API_KEY", "  ")]).unwrap();
        assert!(cfg.provider.api_key.is_none());
    }

    #[test]
    fn malformed_values_are_reported() {
        let err = load(&[("FEEDBACK_CACHE_TTL_SECS", "a day")]).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid { key: "FEEDBACK_CACHE_TTL_SECS", ref value, .. } if value == "a day"
        ));
        assert!(load(&[("FEEDBACK_CACHE_MAX_ENTRIES", "0")]).is_err());
        assert!(load(&[("FEEDBACK_BIND_ADDR", "localhost")]).is_err());
    }
}
