//! Environment-driven configuration (spec §6 "Configuration"), shared by
//! every downstream crate. Grounded on `aion-core`'s pattern of a single
//! `Config::from_env()` entry point backed by the `config` crate plus
//! `.env` loading via `dotenvy`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    pub http_max_concurrency: usize,
    pub http_min_interval_secs: f64,
    pub http_max_retries: u32,
    pub http_backoff_factor: f64,
    pub http_initial_backoff_secs: f64,
    pub http_jitter_secs: f64,
    pub http_timeout_secs: u64,
    pub circuit_failure_threshold: u32,
    pub circuit_success_threshold: u32,
    pub circuit_open_timeout_secs: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            http_max_concurrency: 3,
            http_min_interval_secs: 0.5,
            http_max_retries: 4,
            http_backoff_factor: 2.0,
            http_initial_backoff_secs: 0.5,
            http_jitter_secs: 0.3,
            http_timeout_secs: 30,
            circuit_failure_threshold: 5,
            circuit_success_threshold: 2,
            circuit_open_timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub persistent_cache_ttl_secs: u64,
    pub max_cache_size: usize,
    pub base_dir: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            persistent_cache_ttl_secs: 86_400,
            max_cache_size: 10_000,
            base_dir: ".legalnorm-cache".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LlmConfig {
    pub model: Option<String>,
    pub api_base: Option<String>,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub fetch: FetchConfig,
    pub cache: CacheConfig,
    pub llm: LlmConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            fetch: FetchConfig::default(),
            cache: CacheConfig::default(),
            llm: LlmConfig {
                timeout_secs: 60,
                ..Default::default()
            },
        }
    }
}

impl Config {
    /// Loads configuration from the process environment, falling back to
    /// the spec defaults for any variable that is absent or unparsable.
    /// A `.env` file in the working directory is loaded first, if present.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();

        let mut cfg = Config::default();
        if let Some(v) = env_usize("HTTP_MAX_CONCURRENCY") {
            cfg.fetch.http_max_concurrency = v;
        }
        if let Some(v) = env_f64("HTTP_MIN_INTERVAL") {
            cfg.fetch.http_min_interval_secs = v;
        }
        if let Some(v) = env_u32("HTTP_MAX_RETRIES") {
            cfg.fetch.http_max_retries = v;
        }
        if let Some(v) = env_f64("HTTP_BACKOFF_FACTOR") {
            cfg.fetch.http_backoff_factor = v;
        }
        if let Some(v) = env_f64("HTTP_INITIAL_BACKOFF") {
            cfg.fetch.http_initial_backoff_secs = v;
        }
        if let Some(v) = env_f64("HTTP_JITTER") {
            cfg.fetch.http_jitter_secs = v;
        }
        if let Some(v) = env_u64("HTTP_TIMEOUT") {
            cfg.fetch.http_timeout_secs = v;
        }
        if let Some(v) = env_u64("PERSISTENT_CACHE_TTL") {
            cfg.cache.persistent_cache_ttl_secs = v;
        }
        if let Some(v) = env_usize("MAX_CACHE_SIZE") {
            cfg.cache.max_cache_size = v;
        }
        if let Ok(base_dir) = std::env::var("CACHE_BASE_DIR") {
            cfg.cache.base_dir = base_dir;
        }
        cfg.llm.model = std::env::var("LLM_PARSING_MODEL").ok();
        cfg.llm.api_base = std::env::var("LLM_API_BASE").ok();
        cfg.llm.api_key = std::env::var("LLM_API_KEY").ok();
        if let Some(v) = env_u64("LLM_TIMEOUT") {
            cfg.llm.timeout_secs = v;
        }
        cfg
    }
}

fn env_usize(key: &str) -> Option<usize> {
    std::env::var(key).ok().and_then(|s| s.parse().ok())
}

fn env_u32(key: &str) -> Option<u32> {
    std::env::var(key).ok().and_then(|s| s.parse().ok())
}

fn env_u64(key: &str) -> Option<u64> {
    std::env::var(key).ok().and_then(|s| s.parse().ok())
}

fn env_f64(key: &str) -> Option<f64> {
    std::env::var(key).ok().and_then(|s| s.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let cfg = Config::default();
        assert_eq!(cfg.fetch.http_max_concurrency, 3);
        assert_eq!(cfg.fetch.http_max_retries, 4);
        assert_eq!(cfg.cache.persistent_cache_ttl_secs, 86_400);
        assert_eq!(cfg.cache.max_cache_size, 10_000);
    }
}
