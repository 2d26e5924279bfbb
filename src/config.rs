use std::time::Duration;

use anyhow::{Context, Result};

use crate::utils::ReconnectPolicy;

// ============================================================================
// Configuration
// ============================================================================
//
// Everything comes from the environment with workable local defaults; main
// loads a .env file first so development setups can keep their URLs out of
// the shell profile.
//
// ============================================================================

const DEFAULT_BACKEND_URL: &str = "http://127.0.0.1:8000";
const DEFAULT_FEED_URL: &str = "ws://127.0.0.1:8000/ws/orders";
const DEFAULT_METRICS_PORT: u16 = 9464;

#[derive(Clone, Debug)]
pub struct AppConfig {
    /// Base URL of the Remote Order Service.
    pub backend_url: String,
    /// WebSocket URL of the live order feed.
    pub feed_url: String,
    /// Port for the /metrics and /health endpoint server.
    pub metrics_port: u16,
    /// Reconnect tuning for the live feed.
    pub reconnect: ReconnectPolicy,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let backend_url = lookup("TOLO_BACKEND_URL").unwrap_or_else(|| DEFAULT_BACKEND_URL.into());
        let feed_url = lookup("TOLO_FEED_URL").unwrap_or_else(|| DEFAULT_FEED_URL.into());

        let metrics_port = match lookup("TOLO_METRICS_PORT") {
            Some(raw) => raw
                .parse::<u16>()
                .with_context(|| format!("TOLO_METRICS_PORT is not a port number: {raw}"))?,
            None => DEFAULT_METRICS_PORT,
        };

        let mut reconnect = ReconnectPolicy::default();
        if let Some(raw) = lookup("TOLO_FEED_RECONNECT_ATTEMPTS") {
            reconnect.max_attempts = raw
                .parse()
                .with_context(|| format!("TOLO_FEED_RECONNECT_ATTEMPTS is not a number: {raw}"))?;
        }
        if let Some(raw) = lookup("TOLO_FEED_RECONNECT_DELAY_MS") {
            let millis: u64 = raw
                .parse()
                .with_context(|| format!("TOLO_FEED_RECONNECT_DELAY_MS is not a number: {raw}"))?;
            reconnect.initial_delay = Duration::from_millis(millis);
        }

        Ok(Self {
            backend_url,
            feed_url,
            metrics_port,
            reconnect,
        })
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_nothing_set() {
        let config = AppConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.backend_url, DEFAULT_BACKEND_URL);
        assert_eq!(config.feed_url, DEFAULT_FEED_URL);
        assert_eq!(config.metrics_port, DEFAULT_METRICS_PORT);
        assert_eq!(config.reconnect.max_attempts, 5);
    }

    #[test]
    fn test_overrides_apply() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("TOLO_BACKEND_URL", "https://orders.example.com"),
            ("TOLO_FEED_URL", "wss://orders.example.com/ws"),
            ("TOLO_METRICS_PORT", "9100"),
            ("TOLO_FEED_RECONNECT_ATTEMPTS", "8"),
            ("TOLO_FEED_RECONNECT_DELAY_MS", "250"),
        ]))
        .unwrap();

        assert_eq!(config.backend_url, "https://orders.example.com");
        assert_eq!(config.feed_url, "wss://orders.example.com/ws");
        assert_eq!(config.metrics_port, 9100);
        assert_eq!(config.reconnect.max_attempts, 8);
        assert_eq!(config.reconnect.initial_delay, Duration::from_millis(250));
    }

    #[test]
    fn test_bad_port_is_an_error() {
        let result = AppConfig::from_lookup(lookup_from(&[("TOLO_METRICS_PORT", "not-a-port")]));
        assert!(result.is_err());
    }
}
