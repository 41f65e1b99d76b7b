//! Context Broker subscription models

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{NgsiError, NgsiResult};
use crate::models::base::{EntityPattern, Expression};

/// What triggers a notification
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attrs: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expression: Option<Expression>,
}

/// Entities watched by a subscription
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subject {
    pub entities: Vec<EntityPattern>,
    /// Without a condition any attribute change notifies
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<Condition>,
}

impl Subject {
    pub fn new(entities: Vec<EntityPattern>) -> Self {
        Self {
            entities,
            condition: None,
        }
    }

    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.condition = Some(condition);
        self
    }
}

/// Notification target
///
/// Sent as `http` when only `url` is set, `httpCustom` otherwise.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HttpEndpoint {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<IndexMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qs: Option<IndexMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<String>,
}

impl HttpEndpoint {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn is_custom(&self) -> bool {
        self.headers.is_some() || self.qs.is_some() || self.method.is_some() || self.payload.is_some()
    }
}

/// Entity representation used in notifications
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AttrsFormat {
    #[default]
    Normalized,
    KeyValues,
    Values,
    Legacy,
}

/// Attributes included in a notification
#[derive(Debug, Clone, PartialEq)]
pub enum AttrSelection {
    /// Only the listed attributes (empty list: all)
    Include(Vec<String>),
    /// Everything except the listed attributes
    Exclude(Vec<String>),
}

impl Default for AttrSelection {
    fn default() -> Self {
        AttrSelection::Include(Vec::new())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawNotification", into = "RawNotification")]
pub struct Notification {
    pub endpoint: HttpEndpoint,
    pub attrs: AttrSelection,
    pub attrs_format: Option<AttrsFormat>,
    pub metadata: Option<Vec<String>>,
    /// Reported by the broker
    pub times_sent: Option<u64>,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawNotification {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    http: Option<HttpEndpoint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    http_custom: Option<HttpEndpoint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    attrs: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    except_attrs: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    attrs_format: Option<AttrsFormat>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    metadata: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    times_sent: Option<u64>,
}

impl TryFrom<RawNotification> for Notification {
    type Error = NgsiError;

    fn try_from(raw: RawNotification) -> NgsiResult<Self> {
        let endpoint = match (raw.http, raw.http_custom) {
            (Some(e), None) | (None, Some(e)) => e,
            _ => {
                return Err(NgsiError::validation(
                    "notification",
                    "exactly one of http or httpCustom is required",
                ))
            }
        };
        let attrs = match (raw.attrs, raw.except_attrs) {
            (Some(_), Some(_)) => {
                return Err(NgsiError::validation(
                    "notification",
                    "attrs and exceptAttrs are mutually exclusive",
                ))
            }
            (_, Some(except)) => AttrSelection::Exclude(except),
            (attrs, None) => AttrSelection::Include(attrs.unwrap_or_default()),
        };
        Ok(Self {
            endpoint,
            attrs,
            attrs_format: raw.attrs_format,
            metadata: raw.metadata,
            times_sent: raw.times_sent,
        })
    }
}

impl From<Notification> for RawNotification {
    fn from(n: Notification) -> Self {
        let (http, http_custom) = if n.endpoint.is_custom() {
            (None, Some(n.endpoint))
        } else {
            (Some(n.endpoint), None)
        };
        let (attrs, except_attrs) = match n.attrs {
            AttrSelection::Include(a) if a.is_empty() => (None, None),
            AttrSelection::Include(a) => (Some(a), None),
            AttrSelection::Exclude(e) => (None, Some(e)),
        };
        Self {
            http,
            http_custom,
            attrs,
            except_attrs,
            attrs_format: n.attrs_format,
            metadata: n.metadata,
            times_sent: None,
        }
    }
}

impl Notification {
    pub fn new(endpoint: HttpEndpoint) -> Self {
        Self {
            endpoint,
            attrs: AttrSelection::default(),
            attrs_format: None,
            metadata: None,
            times_sent: None,
        }
    }

    pub fn with_attrs(mut self, attrs: AttrSelection) -> Self {
        self.attrs = attrs;
        self
    }

    pub fn with_format(mut self, format: AttrsFormat) -> Self {
        self.attrs_format = Some(format);
        self
    }
}

/// Broker-side subscription state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    Active,
    Inactive,
    Expired,
    Failed,
    Oneshot,
}

/// Subscription as created on and returned by `/v2/subscriptions`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    /// Assigned by the broker
    #[serde(default, skip_serializing)]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub subject: Subject,
    pub notification: Notification,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires: Option<DateTime<Utc>>,
    /// Minimum seconds between two notifications
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub throttling: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<SubscriptionStatus>,
}

impl Subscription {
    pub fn new(subject: Subject, notification: Notification) -> Self {
        Self {
            id: None,
            description: None,
            subject,
            notification,
            expires: None,
            throttling: None,
            status: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_expiry(mut self, expires: DateTime<Utc>) -> Self {
        self.expires = Some(expires);
        self
    }

    pub fn with_throttling(mut self, seconds: u64) -> Self {
        self.throttling = Some(seconds);
        self
    }

    /// Whether the subscription has passed its expiry at `now`
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires.is_some_and(|e| e <= now)
    }
}
