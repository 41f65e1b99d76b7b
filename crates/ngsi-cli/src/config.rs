//! Configuration file handling for ngsi-cli

use anyhow::{Context, Result};
use ngsi_client::{HttpClientConfig, DEFAULT_CB_URL, DEFAULT_IOTA_URL};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration for the CLI tool
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    /// Default Context Broker URL
    pub cb_url: Option<String>,
    /// Default IoT Agent URL
    pub iota_url: Option<String>,
    /// Default tenant
    pub service: Option<String>,
    /// Default service path
    pub service_path: Option<String>,
    /// Request timeout in seconds
    pub timeout_secs: Option<u64>,
    /// Default output format
    pub output: Option<String>,
    /// Disable colored output
    pub no_color: Option<bool>,
}

/// Values given on the command line; `None` defers to the config file
#[derive(Debug, Clone, Default)]
pub struct Args<'a> {
    pub cb_url: Option<&'a str>,
    pub iota_url: Option<&'a str>,
    pub service: Option<&'a str>,
    pub service_path: Option<&'a str>,
    pub output: Option<&'a str>,
    pub no_color: bool,
}

impl Config {
    /// Load configuration from the default config file
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Get the default config file path
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Could not determine config directory")?
            .join("ngsi-cli");

        Ok(config_dir.join("config.toml"))
    }

    /// Merge CLI arguments over config file values
    pub fn merge_with_args(&self, args: &Args<'_>) -> MergedConfig {
        let pick = |arg: Option<&str>, file: &Option<String>, default: &str| {
            arg.map(String::from)
                .or_else(|| file.clone())
                .unwrap_or_else(|| default.to_string())
        };
        let defaults = HttpClientConfig::default();

        MergedConfig {
            client: HttpClientConfig {
                cb_url: pick(args.cb_url, &self.cb_url, DEFAULT_CB_URL),
                iota_url: pick(args.iota_url, &self.iota_url, DEFAULT_IOTA_URL),
                timeout_secs: self.timeout_secs.unwrap_or(defaults.timeout_secs),
                connect_timeout_secs: defaults.connect_timeout_secs,
            },
            service: pick(args.service, &self.service, ""),
            service_path: pick(args.service_path, &self.service_path, "/"),
            output: pick(args.output, &self.output, "table"),
            no_color: args.no_color || self.no_color.unwrap_or(false),
        }
    }
}

/// Fully resolved configuration after merging CLI args
#[derive(Debug, Clone)]
pub struct MergedConfig {
    pub client: HttpClientConfig,
    pub service: String,
    pub service_path: String,
    pub output: String,
    pub no_color: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
cb_url = "http://orion:1026"
service = "smartcity"
service_path = "/testing"
no_color = true
"#
        )
        .unwrap();

        let config = Config::load_from(file.path()).unwrap();
        assert_eq!(config.cb_url.as_deref(), Some("http://orion:1026"));
        assert_eq!(config.service.as_deref(), Some("smartcity"));
        assert_eq!(config.iota_url, None);
        assert_eq!(config.no_color, Some(true));
    }

    #[test]
    fn test_invalid_file_reports_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "cb_url = [").unwrap();
        let err = Config::load_from(file.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }

    #[test]
    fn test_args_override_file() {
        let config = Config {
            cb_url: Some("http://orion:1026".to_string()),
            service: Some("smartcity".to_string()),
            timeout_secs: Some(5),
            ..Default::default()
        };
        let args = Args {
            cb_url: Some("http://other:1026"),
            service_path: Some("/cli"),
            ..Default::default()
        };

        let merged = config.merge_with_args(&args);
        assert_eq!(merged.client.cb_url, "http://other:1026");
        assert_eq!(merged.client.iota_url, DEFAULT_IOTA_URL);
        assert_eq!(merged.client.timeout_secs, 5);
        assert_eq!(merged.service, "smartcity");
        assert_eq!(merged.service_path, "/cli");
        assert_eq!(merged.output, "table");
        assert!(!merged.no_color);
    }

    #[test]
    fn test_defaults_without_file() {
        let merged = Config::default().merge_with_args(&Args::default());
        assert_eq!(merged.client.cb_url, DEFAULT_CB_URL);
        assert_eq!(merged.service, "");
        assert_eq!(merged.service_path, "/");
    }
}
