//! Shared building blocks: entity patterns, query expressions and the
//! multi-tenancy header

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{NgsiError, NgsiResult};
use crate::naming::validate_standard;

// =============================================================================
// EntityPattern
// =============================================================================

/// Selects entities by id or id pattern, optionally narrowed by type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawEntityPattern")]
pub struct EntityPattern {
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    id_pattern: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    entity_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    type_pattern: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawEntityPattern {
    id: Option<String>,
    id_pattern: Option<String>,
    #[serde(rename = "type")]
    entity_type: Option<String>,
    type_pattern: Option<String>,
}

impl TryFrom<RawEntityPattern> for EntityPattern {
    type Error = NgsiError;

    fn try_from(raw: RawEntityPattern) -> NgsiResult<Self> {
        let pattern = Self {
            id: raw.id,
            id_pattern: raw.id_pattern,
            entity_type: raw.entity_type,
            type_pattern: raw.type_pattern,
        };
        pattern.validate()?;
        Ok(pattern)
    }
}

impl EntityPattern {
    /// Match a single entity id
    pub fn by_id(id: impl Into<String>) -> NgsiResult<Self> {
        let pattern = Self {
            id: Some(id.into()),
            id_pattern: None,
            entity_type: None,
            type_pattern: None,
        };
        pattern.validate()?;
        Ok(pattern)
    }

    /// Match ids against a regular expression
    pub fn by_pattern(id_pattern: impl Into<String>) -> NgsiResult<Self> {
        let pattern = Self {
            id: None,
            id_pattern: Some(id_pattern.into()),
            entity_type: None,
            type_pattern: None,
        };
        pattern.validate()?;
        Ok(pattern)
    }

    /// Restrict to an exact entity type
    pub fn with_type(mut self, entity_type: impl Into<String>) -> NgsiResult<Self> {
        self.entity_type = Some(entity_type.into());
        self.validate()?;
        Ok(self)
    }

    /// Restrict to types matching a regular expression
    pub fn with_type_pattern(mut self, type_pattern: impl Into<String>) -> NgsiResult<Self> {
        self.type_pattern = Some(type_pattern.into());
        self.validate()?;
        Ok(self)
    }

    fn validate(&self) -> NgsiResult<()> {
        match (&self.id, &self.id_pattern) {
            (Some(id), None) => validate_standard("entity id", id)?,
            (None, Some(p)) => compile("idPattern", p)?,
            (Some(_), Some(_)) => {
                return Err(NgsiError::validation(
                    "entities",
                    "id and idPattern are mutually exclusive",
                ))
            }
            (None, None) => {
                return Err(NgsiError::validation(
                    "entities",
                    "either id or idPattern is required",
                ))
            }
        }
        match (&self.entity_type, &self.type_pattern) {
            (Some(_), Some(_)) => Err(NgsiError::validation(
                "entities",
                "type and typePattern are mutually exclusive",
            )),
            (Some(t), None) => validate_standard("entity type", t),
            (None, Some(p)) => compile("typePattern", p),
            (None, None) => Ok(()),
        }
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn id_pattern(&self) -> Option<&str> {
        self.id_pattern.as_deref()
    }

    pub fn entity_type(&self) -> Option<&str> {
        self.entity_type.as_deref()
    }

    pub fn type_pattern(&self) -> Option<&str> {
        self.type_pattern.as_deref()
    }
}

fn compile(field: &str, pattern: &str) -> NgsiResult<()> {
    Regex::new(pattern)
        .map(|_| ())
        .map_err(|e| NgsiError::validation(field, format!("not a regular expression: {}", e)))
}

// =============================================================================
// Expression
// =============================================================================

/// Filter expression composed of `q`, `mq`, `georel`, `geometry` and `coords`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expression {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub q: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mq: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub georel: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geometry: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coords: Option<String>,
}

impl Expression {
    /// Expression with only a simple query statement
    pub fn query(q: impl Into<String>) -> Self {
        Self {
            q: Some(q.into()),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

// =============================================================================
// FiwareHeader
// =============================================================================

/// Maximum length of a service name or a service path segment
pub const MAX_TENANT_LENGTH: usize = 50;

/// Maximum number of service path segments
pub const MAX_PATH_SEGMENTS: usize = 10;

pub const SERVICE_HEADER: &str = "fiware-service";
pub const SERVICE_PATH_HEADER: &str = "fiware-servicepath";

fn service_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-z0-9_]*$").expect("service pattern compiles"))
}

fn segment_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9_]+$").expect("segment pattern compiles"))
}

/// Multi-tenancy scope sent with every request
///
/// An empty service addresses the broker's default tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawFiwareHeader")]
pub struct FiwareHeader {
    #[serde(rename = "fiware-service")]
    service: String,
    #[serde(rename = "fiware-servicepath")]
    service_path: String,
}

#[derive(Deserialize)]
struct RawFiwareHeader {
    #[serde(rename = "fiware-service", alias = "service", default)]
    service: String,
    #[serde(rename = "fiware-servicepath", alias = "service_path", default = "root_path")]
    service_path: String,
}

fn root_path() -> String {
    "/".to_string()
}

impl TryFrom<RawFiwareHeader> for FiwareHeader {
    type Error = NgsiError;

    fn try_from(raw: RawFiwareHeader) -> NgsiResult<Self> {
        Self::new(raw.service, raw.service_path)
    }
}

impl Default for FiwareHeader {
    fn default() -> Self {
        Self {
            service: String::new(),
            service_path: root_path(),
        }
    }
}

impl FiwareHeader {
    pub fn new(service: impl Into<String>, service_path: impl Into<String>) -> NgsiResult<Self> {
        let (service, service_path) = (service.into(), service_path.into());
        validate_service(&service)?;
        validate_service_path(&service_path)?;
        Ok(Self {
            service,
            service_path,
        })
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn service_path(&self) -> &str {
        &self.service_path
    }

    pub fn set_service(&mut self, service: impl Into<String>) -> NgsiResult<()> {
        let service = service.into();
        validate_service(&service)?;
        self.service = service;
        Ok(())
    }

    pub fn set_service_path(&mut self, service_path: impl Into<String>) -> NgsiResult<()> {
        let service_path = service_path.into();
        validate_service_path(&service_path)?;
        self.service_path = service_path;
        Ok(())
    }

    /// Header name/value pairs to attach to a request
    pub fn header_pairs(&self) -> [(&'static str, &str); 2] {
        [
            (SERVICE_HEADER, self.service.as_str()),
            (SERVICE_PATH_HEADER, self.service_path.as_str()),
        ]
    }
}

fn validate_service(service: &str) -> NgsiResult<()> {
    if service.len() > MAX_TENANT_LENGTH {
        return Err(NgsiError::format(
            SERVICE_HEADER,
            service,
            format!("exceeds {} characters", MAX_TENANT_LENGTH),
        ));
    }
    if !service_regex().is_match(service) {
        return Err(NgsiError::format(
            SERVICE_HEADER,
            service,
            "only lowercase letters, digits and '_' are allowed",
        ));
    }
    Ok(())
}

fn validate_service_path(path: &str) -> NgsiResult<()> {
    if path == "/" {
        return Ok(());
    }
    let Some(rest) = path.strip_prefix('/') else {
        return Err(NgsiError::format(SERVICE_PATH_HEADER, path, "must start with '/'"));
    };
    let segments: Vec<&str> = rest.split('/').collect();
    if segments.len() > MAX_PATH_SEGMENTS {
        return Err(NgsiError::format(
            SERVICE_PATH_HEADER,
            path,
            format!("more than {} segments", MAX_PATH_SEGMENTS),
        ));
    }
    for segment in segments {
        if segment.len() > MAX_TENANT_LENGTH || !segment_regex().is_match(segment) {
            return Err(NgsiError::format(
                SERVICE_PATH_HEADER,
                path,
                format!("invalid segment '{}'", segment),
            ));
        }
    }
    Ok(())
}
