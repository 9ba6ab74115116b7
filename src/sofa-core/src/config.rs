use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Client configuration
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct Config {
    /// Base endpoint (scheme + host + port) of the database server
    #[serde(default = "default_url")]
    pub url: String,

    /// Per-request timeout in milliseconds. Unset means the transport default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

fn default_url() -> String {
    "http://localhost:5984".to_string()
}

impl Config {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config = Self::from_json(&contents)?;
        tracing::debug!(path, url = %config.url, "Loaded client config");
        Ok(config)
    }

    pub fn from_json(contents: &str) -> anyhow::Result<Self> {
        let config: Config = serde_json::from_str(contents)?;
        Ok(config)
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Set the request timeout, kept to millisecond precision
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        let millis = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self.timeout_ms = Some(millis);
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            url: default_url(),
            timeout_ms: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_points_at_local_server() {
        let config = Config::default();
        assert_eq!(config.url, "http://localhost:5984");
        assert!(config.timeout().is_none());
    }

    #[test]
    fn test_from_json_fills_defaults() {
        let config = Config::from_json(r#"{"timeout_ms": 5000}"#).unwrap();
        assert_eq!(config.url, "http://localhost:5984");
        assert_eq!(config.timeout(), Some(Duration::from_secs(5)));

        let config = Config::from_json(r#"{"url": "http://db.internal:5984"}"#).unwrap();
        assert_eq!(config.url, "http://db.internal:5984");
        assert!(config.timeout_ms.is_none());
    }

    #[test]
    fn test_from_json_rejects_garbage() {
        assert!(Config::from_json("not json").is_err());
    }

    #[test]
    fn test_builders() {
        let config = Config::default()
            .with_url("http://127.0.0.1:1234")
            .with_timeout(Duration::from_secs(30));
        assert_eq!(config.url, "http://127.0.0.1:1234");
        assert_eq!(config.timeout_ms, Some(30_000));
    }

    #[test]
    fn test_sub_second_timeout_is_kept() {
        let config = Config::default().with_timeout(Duration::from_millis(500));
        assert_eq!(config.timeout_ms, Some(500));
        assert_eq!(config.timeout(), Some(Duration::from_millis(500)));

        let config = Config::default().with_timeout(Duration::from_millis(1500));
        assert_eq!(config.timeout(), Some(Duration::from_millis(1500)));

        let json = serde_json::to_string(&config).unwrap();
        assert_eq!(Config::from_json(&json).unwrap(), config);
    }
}
