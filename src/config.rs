//! Runtime configuration
//!
//! Values come from the environment (with `.env` support), then CLI flags
//! override. No globals; the config is built once in `main` and passed
//! down.

use std::time::Duration;

const DEFAULT_API_URL: &str = "http://127.0.0.1:8000/api";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Backend base URL, including the `/api` prefix.
    pub api_url: String,

    /// Per-request HTTP timeout.
    pub timeout: Duration,

    /// Emit debug-level logs.
    pub verbose: bool,
}

impl Config {
    /// Load from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let api_url = std::env::var("THREATDECK_API_URL")
            .unwrap_or_else(|_| DEFAULT_API_URL.to_string());

        let timeout = std::env::var("THREATDECK_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS));

        Self {
            api_url,
            timeout,
            verbose: false,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            verbose: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_the_local_backend() {
        let config = Config::default();
        assert_eq!(config.api_url, "http://127.0.0.1:8000/api");
        assert_eq!(config.timeout, Duration::from_secs(30));
    }
}
