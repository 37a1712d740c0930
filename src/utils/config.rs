use anyhow::{Context, Result};
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://www.demoblaze.com";

/// Application configuration
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Storefront home page
    pub base_url: String,

    /// Default timeout for element waiting (ms)
    pub element_timeout_ms: u64,

    /// How long to wait for an outcome signal after submitting (ms)
    pub outcome_timeout_ms: u64,

    /// Outcome detector poll interval (ms)
    pub poll_interval_ms: u64,

    /// Wait for an intermediate "Product added" alert (ms)
    pub alert_timeout_ms: u64,

    /// Attempts per signup case
    pub signup_attempts: u32,

    /// Delay between retries (ms)
    pub retry_delay_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            element_timeout_ms: 10_000,
            outcome_timeout_ms: 8_000,
            poll_interval_ms: 250,
            alert_timeout_ms: 5_000,
            signup_attempts: 3,
            retry_delay_ms: 1_000,
        }
    }
}

impl Config {
    /// Defaults overridden by `STOREFRONT_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(url) = lookup("STOREFRONT_BASE_URL") {
            config.base_url = url;
        }
        read_number(&lookup, "STOREFRONT_ELEMENT_TIMEOUT_MS", &mut config.element_timeout_ms)?;
        read_number(&lookup, "STOREFRONT_OUTCOME_TIMEOUT_MS", &mut config.outcome_timeout_ms)?;
        read_number(&lookup, "STOREFRONT_POLL_INTERVAL_MS", &mut config.poll_interval_ms)?;
        read_number(&lookup, "STOREFRONT_ALERT_TIMEOUT_MS", &mut config.alert_timeout_ms)?;
        read_number(&lookup, "STOREFRONT_SIGNUP_ATTEMPTS", &mut config.signup_attempts)?;
        read_number(&lookup, "STOREFRONT_RETRY_DELAY_MS", &mut config.retry_delay_ms)?;

        Ok(config)
    }

    pub fn element_timeout(&self) -> Duration {
        Duration::from_millis(self.element_timeout_ms)
    }

    pub fn outcome_timeout(&self) -> Duration {
        Duration::from_millis(self.outcome_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn alert_timeout(&self) -> Duration {
        Duration::from_millis(self.alert_timeout_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

fn read_number<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, target: &mut T) -> Result<()>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    if let Some(raw) = lookup(key) {
        *target = raw
            .trim()
            .parse()
            .with_context(|| format!("Invalid value for {}: '{}'", key, raw))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.outcome_timeout(), Duration::from_secs(8));
        assert_eq!(config.poll_interval(), Duration::from_millis(250));
        assert_eq!(config.signup_attempts, 3);
    }

    #[test]
    fn test_env_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("STOREFRONT_BASE_URL", "http://localhost:8080"),
            ("STOREFRONT_SIGNUP_ATTEMPTS", " 5 "),
        ]))
        .unwrap();
        assert_eq!(config.base_url, "http://localhost:8080");
        assert_eq!(config.signup_attempts, 5);
        assert_eq!(config.element_timeout_ms, 10_000);
    }

    #[test]
    fn test_bad_number_is_an_error() {
        let err = Config::from_lookup(lookup(&[("STOREFRONT_POLL_INTERVAL_MS", "fast")]))
            .unwrap_err()
            .to_string();
        assert!(err.contains("STOREFRONT_POLL_INTERVAL_MS"));
    }
}
