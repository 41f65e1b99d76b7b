//! IoT Agent provisioning models: service groups and devices

use std::collections::BTreeSet;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::{NgsiError, NgsiResult};
use crate::models::metadata::ContextMetadata;
use crate::naming::{validate_protected, validate_standard};
use crate::vocabulary::{AttributeType, DataType};

/// Transport protocol between device and agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Transport {
    Http,
    Mqtt,
    Amqp,
}

/// Language used in attribute expressions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpressionLanguage {
    #[default]
    Legacy,
    Jexl,
}

fn is_false(b: &bool) -> bool {
    !*b
}

// =============================================================================
// Device attributes
// =============================================================================

/// Measurement reported actively by the device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceAttribute {
    /// Key used by the device in its payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_id: Option<String>,
    pub name: String,
    #[serde(rename = "type")]
    pub attr_type: AttributeType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expression: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_type: Option<String>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub metadata: IndexMap<String, ContextMetadata>,
}

impl DeviceAttribute {
    pub fn new(name: impl Into<String>, attr_type: impl Into<AttributeType>) -> Self {
        Self {
            object_id: None,
            name: name.into(),
            attr_type: attr_type.into(),
            expression: None,
            entity_name: None,
            entity_type: None,
            metadata: IndexMap::new(),
        }
    }

    pub fn with_object_id(mut self, object_id: impl Into<String>) -> Self {
        self.object_id = Some(object_id.into());
        self
    }
}

/// Attribute the agent polls from the device on request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LazyDeviceAttribute {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_id: Option<String>,
    pub name: String,
    #[serde(rename = "type")]
    pub attr_type: AttributeType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_type: Option<String>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub metadata: IndexMap<String, ContextMetadata>,
}

impl LazyDeviceAttribute {
    pub fn new(name: impl Into<String>, attr_type: impl Into<AttributeType>) -> Self {
        Self {
            object_id: None,
            name: name.into(),
            attr_type: attr_type.into(),
            entity_name: None,
            entity_type: None,
            metadata: IndexMap::new(),
        }
    }
}

/// Fixed attribute added to every entity update of the device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaticDeviceAttribute {
    pub name: String,
    #[serde(rename = "type")]
    pub attr_type: AttributeType,
    pub value: Value,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub metadata: IndexMap<String, ContextMetadata>,
}

impl StaticDeviceAttribute {
    pub fn new(name: impl Into<String>, attr_type: impl Into<AttributeType>, value: Value) -> Self {
        Self {
            name: name.into(),
            attr_type: attr_type.into(),
            value,
            metadata: IndexMap::new(),
        }
    }
}

/// Command accepted by the device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceCommand {
    pub name: String,
    #[serde(rename = "type", default = "command_type")]
    pub command_type: AttributeType,
}

fn command_type() -> AttributeType {
    DataType::Command.into()
}

impl DeviceCommand {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            command_type: command_type(),
        }
    }
}

/// Any attribute kind a device can carry
#[derive(Debug, Clone, PartialEq)]
pub enum AnyDeviceAttribute {
    Active(DeviceAttribute),
    Lazy(LazyDeviceAttribute),
    Static(StaticDeviceAttribute),
    Command(DeviceCommand),
}

impl AnyDeviceAttribute {
    pub fn name(&self) -> &str {
        match self {
            AnyDeviceAttribute::Active(a) => &a.name,
            AnyDeviceAttribute::Lazy(a) => &a.name,
            AnyDeviceAttribute::Static(a) => &a.name,
            AnyDeviceAttribute::Command(c) => &c.name,
        }
    }
}

impl From<DeviceAttribute> for AnyDeviceAttribute {
    fn from(a: DeviceAttribute) -> Self {
        AnyDeviceAttribute::Active(a)
    }
}

impl From<LazyDeviceAttribute> for AnyDeviceAttribute {
    fn from(a: LazyDeviceAttribute) -> Self {
        AnyDeviceAttribute::Lazy(a)
    }
}

impl From<StaticDeviceAttribute> for AnyDeviceAttribute {
    fn from(a: StaticDeviceAttribute) -> Self {
        AnyDeviceAttribute::Static(a)
    }
}

impl From<DeviceCommand> for AnyDeviceAttribute {
    fn from(c: DeviceCommand) -> Self {
        AnyDeviceAttribute::Command(c)
    }
}

// =============================================================================
// Device
// =============================================================================

/// Device provisioned on an IoT Agent
///
/// Deserialization runs [`Device::validate`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawDevice")]
pub struct Device {
    pub device_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_path: Option<String>,
    pub entity_name: String,
    pub entity_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub apikey: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transport: Option<Transport>,
    #[serde(
        rename = "expressionLanguage",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub expression_language: Option<ExpressionLanguage>,
    #[serde(rename = "explicitAttrs", default, skip_serializing_if = "is_false")]
    pub explicit_attrs: bool,
    #[serde(default)]
    pub attributes: Vec<DeviceAttribute>,
    #[serde(default)]
    pub lazy: Vec<LazyDeviceAttribute>,
    #[serde(default)]
    pub commands: Vec<DeviceCommand>,
    #[serde(default)]
    pub static_attributes: Vec<StaticDeviceAttribute>,
}

#[derive(Deserialize)]
struct RawDevice {
    device_id: String,
    #[serde(default)]
    service: Option<String>,
    #[serde(default)]
    service_path: Option<String>,
    entity_name: String,
    entity_type: String,
    #[serde(default)]
    timezone: Option<String>,
    #[serde(default)]
    timestamp: Option<bool>,
    #[serde(default)]
    apikey: Option<String>,
    #[serde(default)]
    endpoint: Option<String>,
    #[serde(default)]
    protocol: Option<String>,
    #[serde(default)]
    transport: Option<Transport>,
    #[serde(rename = "expressionLanguage", default)]
    expression_language: Option<ExpressionLanguage>,
    #[serde(rename = "explicitAttrs", default)]
    explicit_attrs: bool,
    #[serde(default)]
    attributes: Vec<DeviceAttribute>,
    #[serde(default)]
    lazy: Vec<LazyDeviceAttribute>,
    #[serde(default)]
    commands: Vec<DeviceCommand>,
    #[serde(default)]
    static_attributes: Vec<StaticDeviceAttribute>,
}

impl TryFrom<RawDevice> for Device {
    type Error = NgsiError;

    fn try_from(raw: RawDevice) -> NgsiResult<Self> {
        let device = Self {
            device_id: raw.device_id,
            service: raw.service,
            service_path: raw.service_path,
            entity_name: raw.entity_name,
            entity_type: raw.entity_type,
            timezone: raw.timezone,
            timestamp: raw.timestamp,
            apikey: raw.apikey,
            endpoint: raw.endpoint,
            protocol: raw.protocol,
            transport: raw.transport,
            expression_language: raw.expression_language,
            explicit_attrs: raw.explicit_attrs,
            attributes: raw.attributes,
            lazy: raw.lazy,
            commands: raw.commands,
            static_attributes: raw.static_attributes,
        };
        device.validate()?;
        Ok(device)
    }
}

impl Device {
    pub fn new(
        device_id: impl Into<String>,
        entity_name: impl Into<String>,
        entity_type: impl Into<String>,
    ) -> NgsiResult<Self> {
        let device = Self {
            device_id: device_id.into(),
            service: None,
            service_path: None,
            entity_name: entity_name.into(),
            entity_type: entity_type.into(),
            timezone: None,
            timestamp: None,
            apikey: None,
            endpoint: None,
            protocol: None,
            transport: None,
            expression_language: None,
            explicit_attrs: false,
            attributes: Vec::new(),
            lazy: Vec::new(),
            commands: Vec::new(),
            static_attributes: Vec::new(),
        };
        device.validate()?;
        Ok(device)
    }

    /// Check identifiers and attribute names, which are unique across kinds
    pub fn validate(&self) -> NgsiResult<()> {
        validate_standard("device id", &self.device_id)?;
        validate_standard("entity name", &self.entity_name)?;
        validate_standard("entity type", &self.entity_type)?;
        let mut seen = BTreeSet::new();
        for name in self.attribute_names() {
            validate_protected("device attribute name", name)?;
            if !seen.insert(name) {
                return Err(NgsiError::Precondition(format!(
                    "device '{}' already has an attribute '{}'",
                    self.device_id, name
                )));
            }
        }
        Ok(())
    }

    fn attribute_names(&self) -> impl Iterator<Item = &str> {
        self.attributes
            .iter()
            .map(|a| a.name.as_str())
            .chain(self.lazy.iter().map(|a| a.name.as_str()))
            .chain(self.static_attributes.iter().map(|a| a.name.as_str()))
            .chain(self.commands.iter().map(|c| c.name.as_str()))
    }

    /// Add an attribute of any kind; names are unique across kinds
    pub fn add_attribute(&mut self, attribute: impl Into<AnyDeviceAttribute>) -> NgsiResult<()> {
        let attribute = attribute.into();
        validate_protected("device attribute name", attribute.name())?;
        if self.attribute_names().any(|n| n == attribute.name()) {
            return Err(NgsiError::Precondition(format!(
                "device '{}' already has an attribute '{}'",
                self.device_id,
                attribute.name()
            )));
        }
        match attribute {
            AnyDeviceAttribute::Active(a) => self.attributes.push(a),
            AnyDeviceAttribute::Lazy(a) => self.lazy.push(a),
            AnyDeviceAttribute::Static(a) => self.static_attributes.push(a),
            AnyDeviceAttribute::Command(c) => self.commands.push(c),
        }
        Ok(())
    }

    /// Replace an attribute with the same name, or add it
    pub fn update_attribute(&mut self, attribute: impl Into<AnyDeviceAttribute>) -> NgsiResult<()> {
        let attribute = attribute.into();
        match self.delete_attribute(attribute.name()) {
            Ok(_) => {
                debug!(device = %self.device_id, name = attribute.name(), "replacing attribute")
            }
            Err(NgsiError::Precondition(_)) => {}
            Err(e) => return Err(e),
        }
        self.add_attribute(attribute)
    }

    /// Look up an attribute of any kind by name
    pub fn get_attribute(&self, name: &str) -> Option<AnyDeviceAttribute> {
        if let Some(a) = self.attributes.iter().find(|a| a.name == name) {
            return Some(a.clone().into());
        }
        if let Some(a) = self.lazy.iter().find(|a| a.name == name) {
            return Some(a.clone().into());
        }
        if let Some(a) = self.static_attributes.iter().find(|a| a.name == name) {
            return Some(a.clone().into());
        }
        self.commands
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.clone().into())
    }

    /// Remove an attribute by name and return it
    pub fn delete_attribute(&mut self, name: &str) -> NgsiResult<AnyDeviceAttribute> {
        if let Some(i) = self.attributes.iter().position(|a| a.name == name) {
            return Ok(self.attributes.remove(i).into());
        }
        if let Some(i) = self.lazy.iter().position(|a| a.name == name) {
            return Ok(self.lazy.remove(i).into());
        }
        if let Some(i) = self.static_attributes.iter().position(|a| a.name == name) {
            return Ok(self.static_attributes.remove(i).into());
        }
        if let Some(i) = self.commands.iter().position(|c| c.name == name) {
            return Ok(self.commands.remove(i).into());
        }
        Err(NgsiError::Precondition(format!(
            "device '{}' has no attribute '{}'",
            self.device_id, name
        )))
    }
}

// =============================================================================
// ServiceGroup
// =============================================================================

/// Provisioning group sharing an API key and resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceGroup {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subservice: Option<String>,
    /// Path the agent listens on for this group, e.g. `/iot/json`
    pub resource: String,
    pub apikey: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trust: Option<String>,
    /// Context Broker the group's devices report to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cbroker: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<DeviceAttribute>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub lazy: Vec<LazyDeviceAttribute>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub commands: Vec<DeviceCommand>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub static_attributes: Vec<StaticDeviceAttribute>,
    #[serde(
        rename = "expressionLanguage",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub expression_language: Option<ExpressionLanguage>,
    #[serde(rename = "explicitAttrs", default, skip_serializing_if = "is_false")]
    pub explicit_attrs: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub autoprovision: Option<bool>,
}

impl ServiceGroup {
    pub fn new(resource: impl Into<String>, apikey: impl Into<String>) -> NgsiResult<Self> {
        let group = Self {
            service: None,
            subservice: None,
            resource: resource.into(),
            apikey: apikey.into(),
            timestamp: None,
            entity_type: None,
            trust: None,
            cbroker: None,
            attributes: Vec::new(),
            lazy: Vec::new(),
            commands: Vec::new(),
            static_attributes: Vec::new(),
            expression_language: None,
            explicit_attrs: false,
            autoprovision: None,
        };
        group.validate()?;
        Ok(group)
    }

    pub fn with_entity_type(mut self, entity_type: impl Into<String>) -> NgsiResult<Self> {
        let entity_type = entity_type.into();
        validate_standard("entity type", &entity_type)?;
        self.entity_type = Some(entity_type);
        Ok(self)
    }

    pub fn validate(&self) -> NgsiResult<()> {
        if !self.resource.starts_with('/') {
            return Err(NgsiError::format(
                "resource",
                self.resource.as_str(),
                "must be an absolute path",
            ));
        }
        if self.apikey.is_empty() {
            return Err(NgsiError::format("apikey", "", "must not be empty"));
        }
        if let Some(t) = &self.entity_type {
            validate_standard("entity type", t)?;
        }
        Ok(())
    }
}

/// `GET /iot/services` response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceGroupList {
    #[serde(default)]
    pub count: usize,
    #[serde(default)]
    pub services: Vec<ServiceGroup>,
}

/// `GET /iot/devices` response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceList {
    #[serde(default)]
    pub count: usize,
    #[serde(default)]
    pub devices: Vec<Device>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn device_data() -> Value {
        json!({
            "device_id": "test_device",
            "service": "smartcity",
            "service_path": "/testing",
            "entity_name": "test_entity",
            "entity_type": "test_entity_type",
            "timezone": "Europe/Berlin",
            "apikey": "1234",
            "transport": "HTTP"
        })
    }

    #[test]
    fn test_device_model() {
        let device: Device = serde_json::from_value(device_data()).unwrap();
        assert_eq!(device.transport, Some(Transport::Http));
        let mut expected = device_data();
        for key in ["attributes", "lazy", "commands", "static_attributes"] {
            expected[key] = json!([]);
        }
        assert_eq!(serde_json::to_value(&device).unwrap(), expected);
    }

    #[test]
    fn test_device_deserialization_validates() {
        let mut raw = device_data();
        raw["device_id"] = json!("bad id");
        assert!(serde_json::from_value::<Device>(raw).is_err());

        let mut raw = device_data();
        raw["attributes"] = json!([{"name": "temperature", "type": "Number"}]);
        raw["lazy"] = json!([{"name": "temperature", "type": "Number"}]);
        let err = serde_json::from_value::<Device>(raw).unwrap_err();
        assert!(err.to_string().contains("already has an attribute 'temperature'"));

        let mut raw = device_data();
        raw["commands"] = json!([{"name": "id", "type": "command"}]);
        assert!(serde_json::from_value::<Device>(raw).is_err());
    }

    #[test]
    fn test_update_attribute_replaces_across_kinds() {
        let mut device = Device::new("test_device", "test_entity", "test_entity_type").unwrap();
        device
            .add_attribute(DeviceAttribute::new("temperature", DataType::Number))
            .unwrap();
        device
            .update_attribute(LazyDeviceAttribute::new("temperature", DataType::Number))
            .unwrap();
        assert!(device.attributes.is_empty());
        assert_eq!(device.lazy.len(), 1);

        device.update_attribute(DeviceCommand::new("open")).unwrap();
        assert_eq!(device.commands.len(), 1);
        assert!(device.validate().is_ok());
    }

    #[test]
    fn test_device_attributes() {
        let mut device = Device::new("test_device", "test_entity", "test_entity_type").unwrap();
        device
            .add_attribute(DeviceAttribute::new("temperature", DataType::Number).with_object_id("t"))
            .unwrap();
        device.add_attribute(DeviceCommand::new("open")).unwrap();
        device
            .add_attribute(LazyDeviceAttribute::new("pressure", DataType::Text))
            .unwrap();
        device
            .add_attribute(StaticDeviceAttribute::new(
                "hasRoom",
                DataType::Relationship,
                json!("my_partner_id"),
            ))
            .unwrap();

        assert_eq!(device.commands[0].command_type, DataType::Command);
        assert!(matches!(
            device.get_attribute("pressure"),
            Some(AnyDeviceAttribute::Lazy(_))
        ));

        let err = device.add_attribute(DeviceCommand::new("temperature")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Precondition);

        let removed = device.delete_attribute("hasRoom").unwrap();
        assert_eq!(removed.name(), "hasRoom");
        assert!(device.get_attribute("hasRoom").is_none());
        assert!(device.delete_attribute("hasRoom").is_err());

        device
            .update_attribute(DeviceAttribute::new("temperature", DataType::Integer))
            .unwrap();
        assert_eq!(device.attributes.len(), 1);
        assert_eq!(device.attributes[0].attr_type, DataType::Integer);
    }

    #[test]
    fn test_device_attribute_name_protected() {
        let mut device = Device::new("d", "e", "T").unwrap();
        let err = device
            .add_attribute(DeviceAttribute::new("geo:location", DataType::Text))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Format);
        assert!(Device::new("my device", "e", "T").is_err());
    }

    #[test]
    fn test_device_attribute_metadata() {
        let raw = json!({
            "name": "temperature",
            "object_id": "temperature",
            "type": "Number",
            "metadata": {"accuracy": {"type": "Text", "value": "+-5%"}}
        });
        let attr: DeviceAttribute = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(attr.metadata["accuracy"].value(), &json!("+-5%"));
        assert_eq!(serde_json::to_value(&attr).unwrap(), raw);
    }

    #[test]
    fn test_service_group() {
        let group = ServiceGroup::new("/iot/json", "abc")
            .unwrap()
            .with_entity_type("Thing")
            .unwrap();
        assert_eq!(
            serde_json::to_value(&group).unwrap(),
            json!({"resource": "/iot/json", "apikey": "abc", "entity_type": "Thing"})
        );
        assert!(ServiceGroup::new("iot/json", "abc").is_err());
        assert!(ServiceGroup::new("/iot/json", "").is_err());
    }
}
