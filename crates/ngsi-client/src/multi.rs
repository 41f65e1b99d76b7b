//! Aggregate client for all configured FIWARE services

use std::path::Path;
use std::sync::Arc;

use ngsi_core::FiwareHeader;
use parking_lot::RwLock;
use tracing::debug;

use crate::base::SharedHeader;
use crate::cb::ContextBrokerClient;
use crate::config::HttpClientConfig;
use crate::error::Result;
use crate::iota::IoTAClient;

/// Context Broker and IoT Agent clients sharing one tenant
///
/// Changing the service or service path here is visible to both
/// sub-clients on their next request.
#[derive(Debug, Clone)]
pub struct HttpClient {
    config: HttpClientConfig,
    header: SharedHeader,
    cb: ContextBrokerClient,
    iota: IoTAClient,
}

impl HttpClient {
    pub fn new(config: HttpClientConfig, header: FiwareHeader) -> Result<Self> {
        let header: SharedHeader = Arc::new(RwLock::new(header));
        let cb = ContextBrokerClient::with_shared_header(
            &config.cb_url,
            header.clone(),
            config.timeout(),
            config.connect_timeout(),
        )?;
        let iota = IoTAClient::with_shared_header(
            &config.iota_url,
            header.clone(),
            config.timeout(),
            config.connect_timeout(),
        )?;
        debug!(cb_url = %config.cb_url, iota_url = %config.iota_url, "created multi client");

        Ok(Self {
            config,
            header,
            cb,
            iota,
        })
    }

    /// Build from a JSON or TOML configuration file
    pub fn from_config_file(path: impl AsRef<Path>, header: FiwareHeader) -> Result<Self> {
        Self::new(HttpClientConfig::from_file(path)?, header)
    }

    pub fn config(&self) -> &HttpClientConfig {
        &self.config
    }

    pub fn cb(&self) -> &ContextBrokerClient {
        &self.cb
    }

    pub fn iota(&self) -> &IoTAClient {
        &self.iota
    }

    pub fn fiware_header(&self) -> FiwareHeader {
        self.header.read().clone()
    }

    pub fn set_fiware_header(&self, header: FiwareHeader) {
        *self.header.write() = header;
    }

    pub fn set_service(&self, service: &str) -> Result<()> {
        Ok(self.header.write().set_service(service)?)
    }

    pub fn set_service_path(&self, service_path: &str) -> Result<()> {
        Ok(self.header.write().set_service_path(service_path)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn client() -> HttpClient {
        HttpClient::new(
            HttpClientConfig::default(),
            FiwareHeader::new("smartcity", "/testing").unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn test_header_shared_with_sub_clients() {
        let client = client();
        assert_eq!(client.cb().fiware_header(), client.fiware_header());

        client.set_service("smartcity_other").unwrap();
        assert_eq!(client.cb().fiware_header().service(), "smartcity_other");
        assert_eq!(client.iota().fiware_header().service(), "smartcity_other");

        client.set_service_path("/someOther").unwrap();
        assert_eq!(client.cb().fiware_header().service_path(), "/someOther");
        assert_eq!(client.iota().fiware_header().service_path(), "/someOther");
    }

    #[test]
    fn test_sub_client_change_visible() {
        let client = client();
        client.cb().set_service("from_cb").unwrap();
        assert_eq!(client.iota().fiware_header().service(), "from_cb");
    }

    #[test]
    fn test_invalid_header_rejected() {
        let client = client();
        assert!(client.set_service("Not Valid").is_err());
        assert_eq!(client.fiware_header().service(), "smartcity");
    }

    #[test]
    fn test_from_config_file() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, r#"{{"cb_url": "http://orion:1026/", "iota_url": "http://iota:4041/"}}"#).unwrap();

        let client = HttpClient::from_config_file(file.path(), FiwareHeader::default()).unwrap();
        assert_eq!(client.cb().base_url().as_str(), "http://orion:1026/");
        assert_eq!(client.iota().base_url().as_str(), "http://iota:4041/");
    }
}
