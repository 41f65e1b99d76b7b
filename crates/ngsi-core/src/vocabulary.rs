//! NGSI attribute type vocabulary

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{NgsiError, NgsiResult};
use crate::naming::validate_standard;

/// Known NGSI value types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    Boolean,
    Number,
    Float,
    Integer,
    Text,
    DateTime,
    StructuredValue,
    Array,
    Relationship,
    Command,
    CommandResult,
    CommandStatus,
    GeoJson,
}

impl DataType {
    /// Every known type, in declaration order
    pub const ALL: [DataType; 13] = [
        DataType::Boolean,
        DataType::Number,
        DataType::Float,
        DataType::Integer,
        DataType::Text,
        DataType::DateTime,
        DataType::StructuredValue,
        DataType::Array,
        DataType::Relationship,
        DataType::Command,
        DataType::CommandResult,
        DataType::CommandStatus,
        DataType::GeoJson,
    ];

    /// Wire representation
    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::Boolean => "Boolean",
            DataType::Number => "Number",
            DataType::Float => "Float",
            DataType::Integer => "Integer",
            DataType::Text => "Text",
            DataType::DateTime => "DateTime",
            DataType::StructuredValue => "StructuredValue",
            DataType::Array => "Array",
            DataType::Relationship => "Relationship",
            DataType::Command => "command",
            DataType::CommandResult => "commandResult",
            DataType::CommandStatus => "commandStatus",
            DataType::GeoJson => "geo:json",
        }
    }

    /// Look up a known type by its exact wire name
    pub fn from_wire(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == s)
    }

    /// Human-readable description
    pub fn description(&self) -> &'static str {
        DATA_TYPE_DESCRIPTIONS
            .iter()
            .find(|(t, _)| t == self)
            .map(|(_, d)| *d)
            .unwrap_or("")
    }
}

/// Descriptions of the known types
pub const DATA_TYPE_DESCRIPTIONS: &[(DataType, &str)] = &[
    (DataType::Boolean, "In JSON-LD true or false"),
    (DataType::Number, "In JSON-LD a floating point number"),
    (DataType::Float, "Floating point number, stored as JSON number"),
    (DataType::Integer, "Integer number, stored as JSON number"),
    (DataType::Text, "Character string"),
    (DataType::DateTime, "ISO 8601 date and time, passed through unchanged"),
    (DataType::StructuredValue, "Any JSON object or array"),
    (DataType::Array, "JSON array"),
    (
        DataType::Relationship,
        "Reference to another entity, value holds the target entity id",
    ),
    (
        DataType::Command,
        "Command registered through an IoT Agent and forwarded to a device",
    ),
    (DataType::CommandResult, "Result reported by a device for a command"),
    (DataType::CommandStatus, "Execution status of a command"),
    (DataType::GeoJson, "GeoJSON geometry"),
];

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataType {
    type Err = NgsiError;

    fn from_str(s: &str) -> NgsiResult<Self> {
        Self::from_wire(s).ok_or_else(|| {
            let allowed: Vec<&str> = Self::ALL.iter().map(|t| t.as_str()).collect();
            NgsiError::enumeration("data type", s, &allowed)
        })
    }
}

impl Serialize for DataType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for DataType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Declared type of an attribute or metadata element
///
/// Unknown type names are accepted as long as they are FIWARE-safe; they
/// receive no coercion beyond JSON normalization.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AttributeType {
    Known(DataType),
    Custom(String),
}

impl AttributeType {
    /// Parse and validate a type name
    pub fn parse(s: &str) -> NgsiResult<Self> {
        validate_standard("type", s)?;
        Ok(match DataType::from_wire(s) {
            Some(known) => AttributeType::Known(known),
            None => AttributeType::Custom(s.to_string()),
        })
    }

    /// Wire representation
    pub fn as_str(&self) -> &str {
        match self {
            AttributeType::Known(t) => t.as_str(),
            AttributeType::Custom(s) => s,
        }
    }

    /// The known type, if any
    pub fn known(&self) -> Option<DataType> {
        match self {
            AttributeType::Known(t) => Some(*t),
            AttributeType::Custom(_) => None,
        }
    }

    /// Re-check the naming policy (custom variants can be built directly)
    pub(crate) fn validate(&self, field: &str) -> NgsiResult<()> {
        match self {
            AttributeType::Known(_) => Ok(()),
            AttributeType::Custom(s) => validate_standard(field, s),
        }
    }
}

impl Default for AttributeType {
    fn default() -> Self {
        AttributeType::Known(DataType::Text)
    }
}

impl From<DataType> for AttributeType {
    fn from(t: DataType) -> Self {
        AttributeType::Known(t)
    }
}

impl PartialEq<DataType> for AttributeType {
    fn eq(&self, other: &DataType) -> bool {
        self.known() == Some(*other)
    }
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AttributeType {
    type Err = NgsiError;

    fn from_str(s: &str) -> NgsiResult<Self> {
        Self::parse(s)
    }
}

impl Serialize for AttributeType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for AttributeType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}
