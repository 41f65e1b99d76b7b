//! Request and response types for the NGSI client

use ngsi_core::{Expression, GetEntitiesOptions};
use serde::{Deserialize, Serialize};

/// Error body returned by the Context Broker and the IoT Agent
///
/// Orion sends `{"error", "description"}`, the agent `{"name", "message"}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorResponse {
    #[serde(default, alias = "name")]
    pub error: String,
    #[serde(default, alias = "message")]
    pub description: Option<String>,
}

impl ErrorResponse {
    pub fn message(&self) -> String {
        match &self.description {
            Some(d) if !d.is_empty() => format!("{}: {}", self.error, d),
            _ => self.error.clone(),
        }
    }
}

// =============================================================================
// Version Info
// =============================================================================

/// `GET /version` response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CbVersion {
    pub orion: OrionVersion,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrionVersion {
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uptime: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compile_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,
}

/// `GET /iot/about` response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IotaVersion {
    #[serde(default)]
    pub lib_version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_root: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

// =============================================================================
// Entity Listing
// =============================================================================

/// Filters for `GET /v2/entities`
#[derive(Debug, Clone, Default)]
pub struct EntityListParams {
    pub id: Option<String>,
    pub id_pattern: Option<String>,
    pub entity_type: Option<String>,
    pub type_pattern: Option<String>,
    pub expression: Expression,
    pub attrs: Option<Vec<String>>,
    pub metadata: Option<Vec<String>>,
    pub order_by: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl EntityListParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_type(mut self, entity_type: impl Into<String>) -> Self {
        self.entity_type = Some(entity_type.into());
        self
    }

    pub fn with_id_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.id_pattern = Some(pattern.into());
        self
    }

    pub fn with_query(mut self, q: impl Into<String>) -> Self {
        self.expression.q = Some(q.into());
        self
    }

    pub fn with_attrs<I, S>(mut self, attrs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attrs = Some(attrs.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Query string pairs, including the representation option
    pub(crate) fn to_query(&self, options: GetEntitiesOptions) -> Vec<(&'static str, String)> {
        let mut query = Vec::new();
        let mut push = |key: &'static str, value: &Option<String>| {
            if let Some(v) = value {
                query.push((key, v.clone()));
            }
        };
        push("id", &self.id);
        push("idPattern", &self.id_pattern);
        push("type", &self.entity_type);
        push("typePattern", &self.type_pattern);
        push("q", &self.expression.q);
        push("mq", &self.expression.mq);
        push("georel", &self.expression.georel);
        push("geometry", &self.expression.geometry);
        push("coords", &self.expression.coords);
        push("orderBy", &self.order_by);
        if let Some(attrs) = &self.attrs {
            query.push(("attrs", attrs.join(",")));
        }
        if let Some(metadata) = &self.metadata {
            query.push(("metadata", metadata.join(",")));
        }
        if let Some(limit) = self.limit {
            query.push(("limit", limit.to_string()));
        }
        if let Some(offset) = self.offset {
            query.push(("offset", offset.to_string()));
        }
        if options != GetEntitiesOptions::Normalized {
            query.push(("options", options.as_str().to_string()));
        }
        query
    }
}
