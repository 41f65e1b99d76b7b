//! IoT Agent client

use std::sync::Arc;
use std::time::Duration;

use ngsi_core::{Device, DeviceList, FiwareHeader, ServiceGroup, ServiceGroupList};
use parking_lot::RwLock;
use reqwest::Method;
use serde_json::json;
use tracing::{debug, instrument};
use url::Url;

use crate::base::{ServiceEndpoint, SharedHeader, DEFAULT_CONNECT_TIMEOUT, DEFAULT_TIMEOUT};
use crate::error::{NgsiClientError, Result};
use crate::types::IotaVersion;

/// Client for the provisioning API of an IoT Agent
#[derive(Debug, Clone)]
pub struct IoTAClient {
    endpoint: ServiceEndpoint,
}

impl IoTAClient {
    /// Create a new client
    ///
    /// # Arguments
    /// * `base_url` - Base URL of the agent's north port (e.g., "http://localhost:4041")
    /// * `header` - Tenant sent with every request
    pub fn new(base_url: &str, header: FiwareHeader) -> Result<Self> {
        Self::with_config(base_url, header, DEFAULT_TIMEOUT, DEFAULT_CONNECT_TIMEOUT)
    }

    /// Create a new client with custom timeouts
    pub fn with_config(
        base_url: &str,
        header: FiwareHeader,
        timeout: Duration,
        connect_timeout: Duration,
    ) -> Result<Self> {
        Self::with_shared_header(
            base_url,
            Arc::new(RwLock::new(header)),
            timeout,
            connect_timeout,
        )
    }

    /// Create a client whose tenant is shared with other clients
    pub fn with_shared_header(
        base_url: &str,
        header: SharedHeader,
        timeout: Duration,
        connect_timeout: Duration,
    ) -> Result<Self> {
        Ok(Self {
            endpoint: ServiceEndpoint::new(base_url, header, timeout, connect_timeout)?,
        })
    }

    pub fn base_url(&self) -> &Url {
        self.endpoint.base_url()
    }

    pub fn fiware_header(&self) -> FiwareHeader {
        self.endpoint.header().read().clone()
    }

    /// Agent version information
    #[instrument(skip(self))]
    pub async fn get_version(&self) -> Result<IotaVersion> {
        let url = self.endpoint.url("/iot/about")?;
        let response = self.endpoint.request(Method::GET, url)?.send().await?;
        self.endpoint.handle_response(response).await
    }

    // =========================================================================
    // Service Groups
    // =========================================================================

    /// Provision service groups
    ///
    /// With `update`, groups that already exist are updated in place.
    #[instrument(skip(self, groups), fields(count = groups.len()))]
    pub async fn post_groups(&self, groups: &[ServiceGroup], update: bool) -> Result<()> {
        for group in groups {
            group.validate()?;
        }
        let url = self.endpoint.url("/iot/services")?;

        let response = self
            .endpoint
            .request(Method::POST, url)?
            .json(&json!({ "services": groups }))
            .send()
            .await?;

        match self.endpoint.handle_empty(response).await {
            Err(NgsiClientError::AlreadyExists(_)) if update => {
                debug!("Service groups exist, updating instead");
                for group in groups {
                    self.update_group(group).await?;
                }
                Ok(())
            }
            other => other,
        }
    }

    /// Provision a single service group
    pub async fn post_group(&self, group: &ServiceGroup, update: bool) -> Result<()> {
        self.post_groups(std::slice::from_ref(group), update).await
    }

    /// List the service groups of the current tenant
    #[instrument(skip(self))]
    pub async fn get_group_list(&self) -> Result<Vec<ServiceGroup>> {
        let url = self.endpoint.url("/iot/services")?;
        let response = self.endpoint.request(Method::GET, url)?.send().await?;
        self.endpoint
            .handle_response::<ServiceGroupList>(response)
            .await
            .map(|r| r.services)
    }

    /// Retrieve the group identified by resource and API key
    #[instrument(skip(self))]
    pub async fn get_group(&self, resource: &str, apikey: &str) -> Result<ServiceGroup> {
        let url = self.endpoint.url("/iot/services")?;
        let response = self
            .endpoint
            .request(Method::GET, url)?
            .query(&[("resource", resource), ("apikey", apikey)])
            .send()
            .await?;

        self.endpoint
            .handle_response::<ServiceGroupList>(response)
            .await?
            .services
            .into_iter()
            .find(|g| g.resource == resource && g.apikey == apikey)
            .ok_or_else(|| {
                NgsiClientError::NotFound(format!("service group {}?apikey={}", resource, apikey))
            })
    }

    /// Update an existing service group
    #[instrument(skip(self, group), fields(resource = %group.resource))]
    pub async fn update_group(&self, group: &ServiceGroup) -> Result<()> {
        group.validate()?;
        let url = self.endpoint.url("/iot/services")?;
        let response = self
            .endpoint
            .request(Method::PUT, url)?
            .query(&[("resource", group.resource.as_str()), ("apikey", group.apikey.as_str())])
            .json(group)
            .send()
            .await?;
        self.endpoint.handle_empty(response).await
    }

    /// Remove a service group
    #[instrument(skip(self))]
    pub async fn delete_group(&self, resource: &str, apikey: &str) -> Result<()> {
        let url = self.endpoint.url("/iot/services")?;
        let response = self
            .endpoint
            .request(Method::DELETE, url)?
            .query(&[("resource", resource), ("apikey", apikey)])
            .send()
            .await?;
        self.endpoint.handle_empty(response).await
    }

    // =========================================================================
    // Devices
    // =========================================================================

    /// Provision devices
    ///
    /// With `update`, devices that already exist are updated in place.
    #[instrument(skip(self, devices), fields(count = devices.len()))]
    pub async fn post_devices(&self, devices: &[Device], update: bool) -> Result<()> {
        for device in devices {
            device.validate()?;
        }
        let url = self.endpoint.url("/iot/devices")?;

        let response = self
            .endpoint
            .request(Method::POST, url)?
            .json(&json!({ "devices": devices }))
            .send()
            .await?;

        match self.endpoint.handle_empty(response).await {
            Err(NgsiClientError::AlreadyExists(_)) if update => {
                debug!("Devices exist, updating instead");
                for device in devices {
                    self.update_device(device).await?;
                }
                Ok(())
            }
            other => other,
        }
    }

    /// Provision a single device
    pub async fn post_device(&self, device: &Device, update: bool) -> Result<()> {
        self.post_devices(std::slice::from_ref(device), update).await
    }

    /// List the devices of the current tenant
    #[instrument(skip(self))]
    pub async fn get_device_list(&self) -> Result<Vec<Device>> {
        let url = self.endpoint.url("/iot/devices")?;
        let response = self.endpoint.request(Method::GET, url)?.send().await?;
        self.endpoint
            .handle_response::<DeviceList>(response)
            .await
            .map(|r| r.devices)
    }

    /// Retrieve one device
    #[instrument(skip(self))]
    pub async fn get_device(&self, device_id: &str) -> Result<Device> {
        let url = self.endpoint.resource_url(&["iot", "devices", device_id])?;
        let response = self.endpoint.request(Method::GET, url)?.send().await?;
        self.endpoint.handle_response(response).await
    }

    /// Update an existing device
    #[instrument(skip(self, device), fields(device_id = %device.device_id))]
    pub async fn update_device(&self, device: &Device) -> Result<()> {
        device.validate()?;
        let url = self
            .endpoint
            .resource_url(&["iot", "devices", device.device_id.as_str()])?;
        let response = self
            .endpoint
            .request(Method::PUT, url)?
            .json(device)
            .send()
            .await?;
        self.endpoint.handle_empty(response).await
    }

    /// Remove a device
    #[instrument(skip(self))]
    pub async fn delete_device(&self, device_id: &str) -> Result<()> {
        let url = self.endpoint.resource_url(&["iot", "devices", device_id])?;
        let response = self.endpoint.request(Method::DELETE, url)?.send().await?;
        self.endpoint.handle_empty(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = IoTAClient::new("http://localhost:4041", FiwareHeader::default());
        assert!(client.is_ok());
        assert!(IoTAClient::new("localhost", FiwareHeader::default()).is_err());
    }
}
