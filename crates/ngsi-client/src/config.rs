//! Client configuration

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{NgsiClientError, Result};

/// Default Context Broker URL
pub const DEFAULT_CB_URL: &str = "http://127.0.0.1:1026";
/// Default IoT Agent URL
pub const DEFAULT_IOTA_URL: &str = "http://127.0.0.1:4041";

/// Endpoints and timeouts of the FIWARE services
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpClientConfig {
    pub cb_url: String,
    pub iota_url: String,
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            cb_url: DEFAULT_CB_URL.to_string(),
            iota_url: DEFAULT_IOTA_URL.to_string(),
            timeout_secs: 30,
            connect_timeout_secs: 10,
        }
    }
}

impl HttpClientConfig {
    /// Load from a `.json` or `.toml` file; other extensions are read as TOML
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

        let config = if is_json {
            serde_json::from_str(&content)
                .map_err(|e| NgsiClientError::Config(format!("{}: {}", path.display(), e)))?
        } else {
            toml::from_str(&content)
                .map_err(|e| NgsiClientError::Config(format!("{}: {}", path.display(), e)))?
        };
        debug!(path = %path.display(), "loaded client configuration");
        Ok(config)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = HttpClientConfig::default();
        assert_eq!(config.cb_url, DEFAULT_CB_URL);
        assert_eq!(config.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_from_json_file() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, r#"{{"cb_url": "http://orion:1026", "iota_url": "http://iota:4041"}}"#).unwrap();

        let config = HttpClientConfig::from_file(file.path()).unwrap();
        assert_eq!(config.cb_url, "http://orion:1026");
        assert_eq!(config.iota_url, "http://iota:4041");
        assert_eq!(config.connect_timeout_secs, 10);
    }

    #[test]
    fn test_from_toml_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "cb_url = \"http://orion:1026\"\ntimeout_secs = 5").unwrap();

        let config = HttpClientConfig::from_file(file.path()).unwrap();
        assert_eq!(config.cb_url, "http://orion:1026");
        assert_eq!(config.iota_url, DEFAULT_IOTA_URL);
        assert_eq!(config.timeout_secs, 5);
    }

    #[test]
    fn test_invalid_file() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, "not json").unwrap();
        let err = HttpClientConfig::from_file(file.path()).unwrap_err();
        assert!(matches!(err, NgsiClientError::Config(_)));

        assert!(matches!(
            HttpClientConfig::from_file("/nonexistent/ngsi.toml"),
            Err(NgsiClientError::IoError(_))
        ));
    }
}
