use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;
use std::time::Duration;

use crate::retry::RetryPolicy;

pub const DEFAULT_SAFETY_TIMEOUT: Duration = Duration::from_millis(3000);
pub const MIN_SAFETY_TIMEOUT: Duration = Duration::from_millis(1000);
pub const MAX_SAFETY_TIMEOUT: Duration = Duration::from_millis(5000);

/// Console configuration
#[derive(Debug, Clone)]
pub struct ConsoleConfig {
    /// Base URL of the newsdesk API, without a trailing slash
    pub api_url: String,
    /// Upper bound on the initial auth load before the console stops waiting
    pub safety_timeout: Duration,
    /// Identical auth changes inside this window are dropped
    pub dedupe_window: Duration,
    /// How long a fetched profile/role pair is reused for the same user
    pub identity_cache_ttl: Duration,
    pub retry: RetryPolicy,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:8080".to_string(),
            safety_timeout: DEFAULT_SAFETY_TIMEOUT,
            dedupe_window: Duration::from_millis(100),
            identity_cache_ttl: Duration::from_secs(30),
            retry: RetryPolicy::default(),
        }
    }
}

impl ConsoleConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let _ = dotenv();
        let defaults = Self::default();

        let safety_timeout = match env::var("NEWSDESK_SAFETY_TIMEOUT_MS") {
            Ok(raw) => Duration::from_millis(
                raw.parse()
                    .context("NEWSDESK_SAFETY_TIMEOUT_MS must be a number of milliseconds")?,
            ),
            Err(_) => defaults.safety_timeout,
        };

        Ok(Self {
            api_url: env::var("NEWSDESK_API_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.api_url),
            ..defaults
        }
        .with_safety_timeout(safety_timeout))
    }

    /// Set the safety timeout, clamped to 1-5 seconds.
    pub fn with_safety_timeout(mut self, timeout: Duration) -> Self {
        self.safety_timeout = timeout.clamp(MIN_SAFETY_TIMEOUT, MAX_SAFETY_TIMEOUT);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn safety_timeout_is_clamped() {
        let config = ConsoleConfig::default().with_safety_timeout(Duration::from_millis(50));
        assert_eq!(config.safety_timeout, MIN_SAFETY_TIMEOUT);

        let config = ConsoleConfig::default().with_safety_timeout(Duration::from_secs(60));
        assert_eq!(config.safety_timeout, MAX_SAFETY_TIMEOUT);

        let config = ConsoleConfig::default().with_safety_timeout(Duration::from_millis(2500));
        assert_eq!(config.safety_timeout, Duration::from_millis(2500));
    }
}
