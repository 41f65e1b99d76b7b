//! Context Broker client (NGSI-v2)

use std::sync::Arc;
use std::time::Duration;

use indexmap::IndexMap;
use ngsi_core::{
    ContextAttribute, ContextEntity, ContextEntityKeyValues, FiwareHeader, GetEntitiesOptions,
    NamedCommand, NamedContextAttribute, Query, Subscription, Update,
};
use parking_lot::RwLock;
use reqwest::header::{CONTENT_TYPE, LOCATION};
use reqwest::Method;
use serde_json::{Map, Value};
use tracing::{debug, instrument, warn};
use url::Url;

use crate::base::{ServiceEndpoint, SharedHeader, DEFAULT_CONNECT_TIMEOUT, DEFAULT_TIMEOUT};
use crate::error::{NgsiClientError, Result};
use crate::types::{CbVersion, EntityListParams};

/// Client for the Orion Context Broker
#[derive(Debug, Clone)]
pub struct ContextBrokerClient {
    endpoint: ServiceEndpoint,
}

impl ContextBrokerClient {
    /// Create a new client
    ///
    /// # Arguments
    /// * `base_url` - Base URL of the broker (e.g., "http://localhost:1026")
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

    /// Get the base URL
    pub fn base_url(&self) -> &Url {
        self.endpoint.base_url()
    }

    /// Current tenant
    pub fn fiware_header(&self) -> FiwareHeader {
        self.endpoint.header().read().clone()
    }

    pub fn set_service(&self, service: &str) -> Result<()> {
        Ok(self.endpoint.header().write().set_service(service)?)
    }

    pub fn set_service_path(&self, service_path: &str) -> Result<()> {
        Ok(self.endpoint.header().write().set_service_path(service_path)?)
    }

    /// Query string selecting an entity type, if given
    fn type_query(entity_type: Option<&str>) -> Vec<(&'static str, String)> {
        entity_type
            .map(|t| vec![("type", t.to_string())])
            .unwrap_or_default()
    }

    // =========================================================================
    // Version
    // =========================================================================

    /// Broker version information
    #[instrument(skip(self))]
    pub async fn get_version(&self) -> Result<CbVersion> {
        let url = self.endpoint.url("/version")?;
        let response = self.endpoint.request(Method::GET, url)?.send().await?;
        self.endpoint.handle_response(response).await
    }

    // =========================================================================
    // Entity Operations
    // =========================================================================

    /// Create an entity
    ///
    /// With `update`, an entity that already exists gets its attributes
    /// appended or overwritten instead.
    #[instrument(skip(self, entity), fields(entity_id = entity.id()))]
    pub async fn post_entity(&self, entity: &ContextEntity, update: bool) -> Result<()> {
        let url = self.endpoint.url("/v2/entities")?;
        let response = self
            .endpoint
            .request(Method::POST, url)?
            .json(&entity.to_wire())
            .send()
            .await?;

        match self.endpoint.handle_empty(response).await {
            Err(NgsiClientError::AlreadyExists(_)) if update => {
                debug!("Entity exists, appending attributes instead");
                self.update_entity(entity).await
            }
            other => other,
        }
    }

    /// List entities in normalized representation
    #[instrument(skip(self))]
    pub async fn get_entity_list(&self, params: &EntityListParams) -> Result<Vec<ContextEntity>> {
        let raw = self.list_raw(params, GetEntitiesOptions::Normalized).await?;
        Ok(raw
            .iter()
            .map(ContextEntity::from_wire)
            .collect::<ngsi_core::NgsiResult<Vec<_>>>()?)
    }

    /// List entities as bare attribute values
    #[instrument(skip(self))]
    pub async fn get_entity_list_key_values(
        &self,
        params: &EntityListParams,
    ) -> Result<Vec<ContextEntityKeyValues>> {
        let raw = self.list_raw(params, GetEntitiesOptions::KeyValues).await?;
        Ok(raw
            .iter()
            .map(ContextEntityKeyValues::from_wire)
            .collect::<ngsi_core::NgsiResult<Vec<_>>>()?)
    }

    /// List entities as arrays of values (`values` or `unique`)
    #[instrument(skip(self))]
    pub async fn get_entity_list_values(
        &self,
        params: &EntityListParams,
        unique: bool,
    ) -> Result<Vec<Value>> {
        let options = if unique {
            GetEntitiesOptions::Unique
        } else {
            GetEntitiesOptions::Values
        };
        self.list_raw(params, options).await
    }

    async fn list_raw(
        &self,
        params: &EntityListParams,
        options: GetEntitiesOptions,
    ) -> Result<Vec<Value>> {
        let url = self.endpoint.url("/v2/entities")?;
        debug!("Listing entities from {} ({})", url, options);

        let response = self
            .endpoint
            .request(Method::GET, url)?
            .query(&params.to_query(options))
            .send()
            .await?;
        self.endpoint.handle_response(response).await
    }

    /// Retrieve one entity
    #[instrument(skip(self))]
    pub async fn get_entity(
        &self,
        entity_id: &str,
        entity_type: Option<&str>,
        attrs: Option<&[&str]>,
    ) -> Result<ContextEntity> {
        let url = self.endpoint.resource_url(&["v2", "entities", entity_id])?;
        let mut query = Self::type_query(entity_type);
        if let Some(attrs) = attrs {
            query.push(("attrs", attrs.join(",")));
        }

        let response = self
            .endpoint
            .request(Method::GET, url)?
            .query(&query)
            .send()
            .await?;
        let raw: Value = self.endpoint.handle_response(response).await?;
        Ok(ContextEntity::from_wire(&raw)?)
    }

    /// Retrieve all attributes of an entity without id and type
    #[instrument(skip(self))]
    pub async fn get_entity_attributes(
        &self,
        entity_id: &str,
        entity_type: Option<&str>,
    ) -> Result<IndexMap<String, ContextAttribute>> {
        let url = self
            .endpoint
            .resource_url(&["v2", "entities", entity_id, "attrs"])?;

        let response = self
            .endpoint
            .request(Method::GET, url)?
            .query(&Self::type_query(entity_type))
            .send()
            .await?;
        let raw: IndexMap<String, Value> = self.endpoint.handle_response(response).await?;
        raw.iter()
            .map(|(name, attr)| -> Result<(String, ContextAttribute)> {
                Ok((name.clone(), ContextAttribute::from_wire(attr)?))
            })
            .collect()
    }

    /// Attribute members of an entity without `id` and `type`
    fn attrs_body(entity: &ContextEntity) -> Value {
        Value::Object(
            entity
                .attributes()
                .iter()
                .map(|(name, attr)| (name.clone(), attr.to_wire()))
                .collect(),
        )
    }

    /// Append or overwrite attributes of an existing entity
    #[instrument(skip(self, entity), fields(entity_id = entity.id()))]
    pub async fn update_entity(&self, entity: &ContextEntity) -> Result<()> {
        let url = self
            .endpoint
            .resource_url(&["v2", "entities", entity.id(), "attrs"])?;

        let response = self
            .endpoint
            .request(Method::POST, url)?
            .query(&Self::type_query(Some(entity.entity_type())))
            .json(&Self::attrs_body(entity))
            .send()
            .await?;
        self.endpoint.handle_empty(response).await
    }

    /// Update attributes that already exist; unknown attributes fail
    #[instrument(skip(self, entity), fields(entity_id = entity.id()))]
    pub async fn update_existing_attributes(&self, entity: &ContextEntity) -> Result<()> {
        let url = self
            .endpoint
            .resource_url(&["v2", "entities", entity.id(), "attrs"])?;

        let response = self
            .endpoint
            .request(Method::PATCH, url)?
            .query(&Self::type_query(Some(entity.entity_type())))
            .json(&Self::attrs_body(entity))
            .send()
            .await?;
        self.endpoint.handle_empty(response).await
    }

    /// Replace all attributes of an entity
    #[instrument(skip(self, entity), fields(entity_id = entity.id()))]
    pub async fn replace_entity_attributes(&self, entity: &ContextEntity) -> Result<()> {
        let url = self
            .endpoint
            .resource_url(&["v2", "entities", entity.id(), "attrs"])?;

        let response = self
            .endpoint
            .request(Method::PUT, url)?
            .query(&Self::type_query(Some(entity.entity_type())))
            .json(&Self::attrs_body(entity))
            .send()
            .await?;
        self.endpoint.handle_empty(response).await
    }

    /// Delete an entity
    #[instrument(skip(self))]
    pub async fn delete_entity(&self, entity_id: &str, entity_type: Option<&str>) -> Result<()> {
        let url = self.endpoint.resource_url(&["v2", "entities", entity_id])?;

        let response = self
            .endpoint
            .request(Method::DELETE, url)?
            .query(&Self::type_query(entity_type))
            .send()
            .await?;
        self.endpoint.handle_empty(response).await
    }

    // =========================================================================
    // Attribute Operations
    // =========================================================================

    /// Retrieve one attribute
    #[instrument(skip(self))]
    pub async fn get_attribute(
        &self,
        entity_id: &str,
        attr_name: &str,
        entity_type: Option<&str>,
    ) -> Result<ContextAttribute> {
        let url = self
            .endpoint
            .resource_url(&["v2", "entities", entity_id, "attrs", attr_name])?;

        let response = self
            .endpoint
            .request(Method::GET, url)?
            .query(&Self::type_query(entity_type))
            .send()
            .await?;
        let raw: Value = self.endpoint.handle_response(response).await?;
        Ok(ContextAttribute::from_wire(&raw)?)
    }

    /// Replace one attribute
    #[instrument(skip(self, attr), fields(attr_name = attr.name()))]
    pub async fn update_entity_attribute(
        &self,
        entity_id: &str,
        attr: &NamedContextAttribute,
        entity_type: Option<&str>,
    ) -> Result<()> {
        let url = self
            .endpoint
            .resource_url(&["v2", "entities", entity_id, "attrs", attr.name()])?;

        let response = self
            .endpoint
            .request(Method::PUT, url)?
            .query(&Self::type_query(entity_type))
            .json(&attr.attribute().to_wire())
            .send()
            .await?;
        self.endpoint.handle_empty(response).await
    }

    /// Remove one attribute
    #[instrument(skip(self))]
    pub async fn delete_entity_attribute(
        &self,
        entity_id: &str,
        attr_name: &str,
        entity_type: Option<&str>,
    ) -> Result<()> {
        let url = self
            .endpoint
            .resource_url(&["v2", "entities", entity_id, "attrs", attr_name])?;

        let response = self
            .endpoint
            .request(Method::DELETE, url)?
            .query(&Self::type_query(entity_type))
            .send()
            .await?;
        self.endpoint.handle_empty(response).await
    }

    /// Read only the value of an attribute
    ///
    /// Objects and arrays arrive as JSON; scalars as JSON text in a
    /// `text/plain` body.
    #[instrument(skip(self))]
    pub async fn get_attribute_value(
        &self,
        entity_id: &str,
        attr_name: &str,
        entity_type: Option<&str>,
    ) -> Result<Value> {
        let url = self
            .endpoint
            .resource_url(&["v2", "entities", entity_id, "attrs", attr_name, "value"])?;

        let response = self
            .endpoint
            .request(Method::GET, url)?
            .query(&Self::type_query(entity_type))
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(self.endpoint.extract_error_from_status(response, status).await);
        }
        let text = response.text().await?;
        Ok(serde_json::from_str(&text).unwrap_or(Value::String(text)))
    }

    /// Write only the value of an attribute
    #[instrument(skip(self, value))]
    pub async fn update_attribute_value(
        &self,
        entity_id: &str,
        attr_name: &str,
        value: &Value,
        entity_type: Option<&str>,
    ) -> Result<()> {
        let url = self
            .endpoint
            .resource_url(&["v2", "entities", entity_id, "attrs", attr_name, "value"])?;

        let request = self
            .endpoint
            .request(Method::PUT, url)?
            .query(&Self::type_query(entity_type));
        let request = match value {
            Value::Object(_) | Value::Array(_) => request.json(value),
            scalar => request
                .header(CONTENT_TYPE, "text/plain")
                .body(scalar.to_string()),
        };
        let response = request.send().await?;
        self.endpoint.handle_empty(response).await
    }

    // =========================================================================
    // Commands
    // =========================================================================

    /// Send a command to a device-backed entity
    #[instrument(skip(self, command), fields(command = command.name()))]
    pub async fn post_command(
        &self,
        entity_id: &str,
        command: &NamedCommand,
        entity_type: Option<&str>,
    ) -> Result<()> {
        let url = self
            .endpoint
            .resource_url(&["v2", "entities", entity_id, "attrs"])?;
        let mut body = Map::new();
        body.insert(command.name().to_string(), command.command().to_wire());

        let response = self
            .endpoint
            .request(Method::PATCH, url)?
            .query(&Self::type_query(entity_type))
            .json(&body)
            .send()
            .await?;
        self.endpoint.handle_empty(response).await
    }

    // =========================================================================
    // Batch Operations
    // =========================================================================

    /// Apply a batch update
    #[instrument(skip(self, update), fields(action = %update.action_type, count = update.entities.len()))]
    pub async fn update(&self, update: &Update) -> Result<()> {
        let url = self.endpoint.url("/v2/op/update")?;
        if update.entities.is_empty() {
            warn!("Batch update without entities");
        }

        let response = self
            .endpoint
            .request(Method::POST, url)?
            .json(update)
            .send()
            .await?;
        self.endpoint.handle_empty(response).await
    }

    /// Run a batch query
    #[instrument(skip(self, query))]
    pub async fn query(&self, query: &Query) -> Result<Vec<ContextEntity>> {
        let url = self.endpoint.url("/v2/op/query")?;

        let response = self
            .endpoint
            .request(Method::POST, url)?
            .json(query)
            .send()
            .await?;
        let raw: Vec<Value> = self.endpoint.handle_response(response).await?;
        Ok(raw
            .iter()
            .map(ContextEntity::from_wire)
            .collect::<ngsi_core::NgsiResult<Vec<_>>>()?)
    }

    // =========================================================================
    // Subscriptions
    // =========================================================================

    /// Create a subscription and return its id
    #[instrument(skip(self, subscription))]
    pub async fn post_subscription(&self, subscription: &Subscription) -> Result<String> {
        let url = self.endpoint.url("/v2/subscriptions")?;

        let response = self
            .endpoint
            .request(Method::POST, url)?
            .json(subscription)
            .send()
            .await?;
        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        self.endpoint.handle_empty(response).await?;

        location
            .and_then(|l| l.rsplit('/').next().map(String::from))
            .filter(|id| !id.is_empty())
            .ok_or_else(|| NgsiClientError::ParseError("Missing subscription location".to_string()))
    }

    /// List all subscriptions
    #[instrument(skip(self))]
    pub async fn get_subscription_list(&self) -> Result<Vec<Subscription>> {
        let url = self.endpoint.url("/v2/subscriptions")?;
        let response = self.endpoint.request(Method::GET, url)?.send().await?;
        self.endpoint.handle_response(response).await
    }

    /// Retrieve one subscription
    #[instrument(skip(self))]
    pub async fn get_subscription(&self, subscription_id: &str) -> Result<Subscription> {
        let url = self
            .endpoint
            .resource_url(&["v2", "subscriptions", subscription_id])?;
        let response = self.endpoint.request(Method::GET, url)?.send().await?;
        self.endpoint.handle_response(response).await
    }

    /// Delete a subscription
    #[instrument(skip(self))]
    pub async fn delete_subscription(&self, subscription_id: &str) -> Result<()> {
        let url = self
            .endpoint
            .resource_url(&["v2", "subscriptions", subscription_id])?;
        let response = self.endpoint.request(Method::DELETE, url)?.send().await?;
        self.endpoint.handle_empty(response).await
    }
}
