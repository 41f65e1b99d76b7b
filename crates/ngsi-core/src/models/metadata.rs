//! Attribute metadata models

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{NgsiError, NgsiResult};
use crate::naming::validate_standard;
use crate::units::{is_unit_metadata, validate_unit_data};
use crate::vocabulary::AttributeType;

/// Serialize a typed value into JSON, mapping failures to a coercion error
pub(crate) fn to_json<T: Serialize + ?Sized>(target: &str, value: &T) -> NgsiResult<Value> {
    serde_json::to_value(value)
        .map_err(|e| NgsiError::coercion(target, format!("value is not JSON serializable: {}", e)))
}

/// Read an optional `type` member from a wire object
pub(crate) fn parse_type_field(field: &str, raw: Option<&Value>) -> NgsiResult<Option<AttributeType>> {
    match raw {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => {
            validate_standard(field, s)?;
            AttributeType::parse(s).map(Some)
        }
        Some(other) => Err(NgsiError::format(field, other.to_string(), "must be a string")),
    }
}

/// Metadata element of an attribute, e.g. accuracy or a timestamp
///
/// Metadata does not nest: the value is plain JSON.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContextMetadata {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    metadata_type: Option<AttributeType>,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    value: Value,
}

impl ContextMetadata {
    /// Create metadata from a JSON value
    pub fn new(metadata_type: Option<AttributeType>, value: Value) -> NgsiResult<Self> {
        if let Some(t) = &metadata_type {
            t.validate("metadata type")?;
        }
        Ok(Self {
            metadata_type,
            value,
        })
    }

    /// Create metadata from any serializable value
    pub fn from_serializable<T: Serialize + ?Sized>(
        metadata_type: Option<AttributeType>,
        value: &T,
    ) -> NgsiResult<Self> {
        let value = to_json("metadata value", value)?;
        Self::new(metadata_type, value)
    }

    /// Parse a `{type, value}` JSON object
    pub fn from_wire(raw: &Value) -> NgsiResult<Self> {
        let map = raw.as_object().ok_or_else(|| {
            NgsiError::Shape(format!("metadata must be an object, got {}", raw))
        })?;
        let metadata_type = parse_type_field("metadata type", map.get("type"))?;
        let value = map.get("value").cloned().unwrap_or(Value::Null);
        Self::new(metadata_type, value)
    }

    /// `{type, value}` object; an absent type or a null value is left out
    pub fn to_wire(&self) -> Value {
        let mut map = Map::new();
        if let Some(t) = &self.metadata_type {
            map.insert("type".to_string(), Value::String(t.to_string()));
        }
        if !self.value.is_null() {
            map.insert("value".to_string(), self.value.clone());
        }
        Value::Object(map)
    }

    pub fn metadata_type(&self) -> Option<&AttributeType> {
        self.metadata_type.as_ref()
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Attach a name to this metadata
    pub fn with_name(self, name: impl Into<String>) -> NgsiResult<NamedContextMetadata> {
        NamedContextMetadata::new(name, self.metadata_type, self.value)
    }
}

/// Metadata element including its name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawNamedMetadata")]
pub struct NamedContextMetadata {
    name: String,
    #[serde(flatten)]
    metadata: ContextMetadata,
}

#[derive(Deserialize)]
struct RawNamedMetadata {
    name: String,
    #[serde(rename = "type", default)]
    metadata_type: Option<AttributeType>,
    #[serde(default)]
    value: Value,
}

impl TryFrom<RawNamedMetadata> for NamedContextMetadata {
    type Error = NgsiError;

    fn try_from(raw: RawNamedMetadata) -> NgsiResult<Self> {
        Self::new(raw.name, raw.metadata_type, raw.value)
    }
}

impl NamedContextMetadata {
    /// Create named metadata
    ///
    /// Unit metadata (`unit`, `unitText`, `unitCode`) is checked against the
    /// unit table and normalised.
    pub fn new(
        name: impl Into<String>,
        metadata_type: Option<AttributeType>,
        value: Value,
    ) -> NgsiResult<Self> {
        let name = name.into();
        validate_standard("metadata name", &name)?;

        let (metadata_type, value) = if is_unit_metadata(&name) {
            validate_unit_data(&name, metadata_type, &value)?
        } else {
            (metadata_type, value)
        };

        Ok(Self {
            name,
            metadata: ContextMetadata::new(metadata_type, value)?,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn metadata(&self) -> &ContextMetadata {
        &self.metadata
    }

    /// Split into name and unnamed metadata
    pub fn into_parts(self) -> (String, ContextMetadata) {
        (self.name, self.metadata)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::vocabulary::DataType;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::collections::HashMap;

    #[test]
    fn test_to_wire_matches_serde() {
        let typed = ContextMetadata::new(Some(DataType::Number.into()), json!(0.5)).unwrap();
        assert_eq!(typed.to_wire(), serde_json::to_value(&typed).unwrap());
        assert_eq!(typed.to_wire(), json!({"type": "Number", "value": 0.5}));

        let bare = ContextMetadata::new(None, Value::Null).unwrap();
        assert_eq!(bare.to_wire(), json!({}));
        assert_eq!(bare.to_wire(), serde_json::to_value(&bare).unwrap());
    }

    #[test]
    fn test_metadata_serialization() {
        let md = ContextMetadata::new(Some(DataType::Text.into()), json!("test")).unwrap();
        assert_eq!(
            serde_json::to_value(&md).unwrap(),
            json!({"type": "Text", "value": "test"})
        );

        let empty = ContextMetadata::default();
        assert_eq!(serde_json::to_value(&empty).unwrap(), json!({}));
    }

    #[test]
    fn test_metadata_type_validated() {
        for bad in ["my name", "Test?", "#False", "/notvalid"] {
            let raw = json!({"type": bad, "value": 1});
            let err = ContextMetadata::from_wire(&raw).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Format, "{bad}");

            let err = ContextMetadata::new(Some(AttributeType::Custom(bad.into())), json!(1))
                .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Format, "{bad}");
        }
        for ok in ["id", "type", "geo:location", "3_:strange-Name!"] {
            assert!(ContextMetadata::from_wire(&json!({ "type": ok })).is_ok());
        }
    }

    #[test]
    fn test_metadata_from_wire_shape() {
        let err = ContextMetadata::from_wire(&json!([1, 2])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Shape);
    }

    #[test]
    fn test_not_serializable_value() {
        let mut bad: HashMap<(u8, u8), u8> = HashMap::new();
        bad.insert((1, 2), 3);
        let err = ContextMetadata::from_serializable(None, &bad).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TypeCoercion);
    }

    #[test]
    fn test_named_metadata_name_validated() {
        assert!(NamedContextMetadata::new("info", None, Value::Null).is_ok());
        assert!(NamedContextMetadata::new("geo:point", None, Value::Null).is_ok());
        assert!(NamedContextMetadata::new("my name", None, Value::Null).is_err());
        assert!(NamedContextMetadata::new("", None, Value::Null).is_err());
    }

    #[test]
    fn test_named_metadata_serde() {
        let md: NamedContextMetadata =
            serde_json::from_value(json!({"name": "info", "type": "Text", "value": "x"})).unwrap();
        assert_eq!(md.name(), "info");
        assert_eq!(md.metadata().value(), &json!("x"));
        assert_eq!(
            serde_json::to_value(&md).unwrap(),
            json!({"name": "info", "type": "Text", "value": "x"})
        );
        assert!(serde_json::from_value::<NamedContextMetadata>(json!({"name": "a b"})).is_err());
    }

    #[test]
    fn test_named_unit_metadata() {
        let md = NamedContextMetadata::new("unitCode", None, json!("kgm")).unwrap();
        assert_eq!(md.metadata().value(), &json!("KGM"));
        assert_eq!(md.metadata().metadata_type(), Some(&AttributeType::Known(DataType::Text)));

        let err = NamedContextMetadata::new("unitCode", None, json!("banana")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }
}
