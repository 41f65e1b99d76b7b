//! Batch operation, query and command payloads

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::{NgsiError, NgsiResult};
use crate::models::base::{EntityPattern, Expression};
use crate::models::entity::ContextEntity;
use crate::models::metadata::to_json;
use crate::naming::validate_protected;
use crate::vocabulary::DataType;

/// Generates a closed string enum with a description table and serde impls
macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $field:literal, $table:ident {
            $($variant:ident => $wire:literal, $desc:literal;)+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant,)+
        }

        /// Descriptions of every variant
        pub const $table: &[($name, &str)] = &[$(($name::$variant, $desc),)+];

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant,)+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $wire,)+
                }
            }

            pub fn description(&self) -> &'static str {
                $table
                    .iter()
                    .find(|(v, _)| v == self)
                    .map(|(_, d)| *d)
                    .unwrap_or("")
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = NgsiError;

            fn from_str(s: &str) -> NgsiResult<Self> {
                Self::ALL
                    .iter()
                    .copied()
                    .find(|v| v.as_str() == s)
                    .ok_or_else(|| {
                        let allowed: Vec<&str> = Self::ALL.iter().map(|v| v.as_str()).collect();
                        NgsiError::enumeration($field, s, &allowed)
                    })
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                s.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

wire_enum! {
    /// Kind of batch update
    ActionType, "actionType", ACTION_TYPE_DESCRIPTIONS {
        Append => "append",
            "maps to POST /v2/entities (if the entity does not already exist) or POST /v2/entities/<id>/attrs (if the entity already exists)";
        AppendStrict => "appendStrict",
            "maps to POST /v2/entities (if the entity does not already exist) or POST /v2/entities/<id>/attrs?options=append (if the entity already exists)";
        Update => "update",
            "maps to PATCH /v2/entities/<id>/attrs";
        Delete => "delete",
            "maps to DELETE /v2/entities/<id>/attrs/<attrName> on every attribute included in the entity or to DELETE /v2/entities/<id> if no attribute were included in the entity";
        Replace => "replace",
            "maps to PUT /v2/entities/<id>/attrs";
    }
}

wire_enum! {
    /// Representation requested from the broker when listing entities
    GetEntitiesOptions, "options", GET_ENTITIES_OPTIONS_DESCRIPTIONS {
        Normalized => "normalized",
            "Normalized message representation";
        KeyValues => "keyValues",
            "Key value message representation. Attributes are represented by their values only, leaving out type and metadata";
        Values => "values",
            "Entity as an array of attribute values, leaving out id and type. The order follows the attrs parameter";
        Unique => "unique",
            "Like values, except that values are not repeated";
    }
}

// =============================================================================
// Update / Query
// =============================================================================

/// Batch update payload for `POST /v2/op/update`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Update {
    pub action_type: ActionType,
    pub entities: Vec<ContextEntity>,
}

impl Update {
    /// Build from a wire action name; unknown names are an enum error
    pub fn new(action_type: &str, entities: Vec<ContextEntity>) -> NgsiResult<Self> {
        Ok(Self {
            action_type: action_type.parse()?,
            entities,
        })
    }

    pub fn with_action(action_type: ActionType, entities: Vec<ContextEntity>) -> Self {
        Self {
            action_type,
            entities,
        }
    }
}

/// Batch query payload for `POST /v2/op/query`
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Query {
    pub entities: Vec<EntityPattern>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attrs: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expression: Option<Expression>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Vec<String>>,
}

impl Query {
    pub fn new(entities: Vec<EntityPattern>) -> Self {
        Self {
            entities,
            ..Default::default()
        }
    }

    pub fn with_attrs<I, S>(mut self, attrs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attrs = Some(attrs.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_metadata<I, S>(mut self, metadata: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.metadata = Some(metadata.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_expression(mut self, expression: Expression) -> Self {
        self.expression = Some(expression);
        self
    }
}

// =============================================================================
// Command / NamedCommand
// =============================================================================

/// Command forwarded through the IoT Agent to a device
///
/// The type is always `command`; the value is any JSON payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    value: Value,
}

impl Command {
    pub fn new(value: Value) -> Self {
        Self { value }
    }

    /// Create from any serializable payload
    pub fn from_serializable<T: Serialize + ?Sized>(value: &T) -> NgsiResult<Self> {
        Ok(Self::new(to_json(DataType::Command.as_str(), value)?))
    }

    pub fn from_wire(raw: &Value) -> NgsiResult<Self> {
        let map = raw
            .as_object()
            .ok_or_else(|| NgsiError::Shape(format!("command must be an object, got {}", raw)))?;
        check_command_type(map)?;
        Ok(Self::new(map.get("value").cloned().unwrap_or(Value::Null)))
    }

    pub fn to_wire(&self) -> Value {
        Value::Object(self.wire_fields())
    }

    fn wire_fields(&self) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert(
            "type".to_string(),
            Value::String(DataType::Command.as_str().to_string()),
        );
        map.insert("value".to_string(), self.value.clone());
        map
    }

    pub fn command_type(&self) -> DataType {
        DataType::Command
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn with_name(self, name: impl Into<String>) -> NgsiResult<NamedCommand> {
        NamedCommand::new(name, self.value)
    }
}

fn check_command_type(map: &Map<String, Value>) -> NgsiResult<()> {
    match map.get("type") {
        None => Ok(()),
        Some(Value::String(t)) if t == DataType::Command.as_str() => Ok(()),
        Some(other) => {
            let value = other.as_str().map(String::from).unwrap_or_else(|| other.to_string());
            Err(NgsiError::enumeration(
                "command type",
                value,
                &[DataType::Command.as_str()],
            ))
        }
    }
}

/// Command together with its protected-pattern name
#[derive(Debug, Clone, PartialEq)]
pub struct NamedCommand {
    name: String,
    command: Command,
}

impl NamedCommand {
    pub fn new(name: impl Into<String>, value: Value) -> NgsiResult<Self> {
        let name = name.into();
        validate_protected("command name", &name)?;
        Ok(Self {
            name,
            command: Command::new(value),
        })
    }

    pub fn from_wire(raw: &Value) -> NgsiResult<Self> {
        let command = Command::from_wire(raw)?;
        let name = raw
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| NgsiError::Shape(format!("named command without name: {}", raw)))?;
        command.with_name(name)
    }

    pub fn to_wire(&self) -> Value {
        let mut map = Map::new();
        map.insert("name".to_string(), Value::String(self.name.clone()));
        map.extend(self.command.wire_fields());
        Value::Object(map)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn command(&self) -> &Command {
        &self.command
    }

    pub fn value(&self) -> &Value {
        self.command.value()
    }
}

macro_rules! serde_via_wire {
    ($($ty:ty),+) => {
        $(
            impl Serialize for $ty {
                fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                    self.to_wire().serialize(serializer)
                }
            }

            impl<'de> Deserialize<'de> for $ty {
                fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                    let raw = Value::deserialize(deserializer)?;
                    Self::from_wire(&raw).map_err(serde::de::Error::custom)
                }
            }
        )+
    };
}

serde_via_wire!(Command, NamedCommand);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::collections::HashMap;

    #[test]
    fn test_update_action_type() {
        let update = Update::new("append", vec![]).unwrap();
        assert_eq!(update.action_type, ActionType::Append);

        let err = Update::new("bogus", vec![]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Enum);
        assert!(err.to_string().contains("appendStrict"));
    }

    #[test]
    fn test_update_serialization() {
        let entity = ContextEntity::from_wire(&json!({
            "id": "e1", "type": "T", "temp": {"type": "Number", "value": 1}
        }))
        .unwrap();
        let update = Update::with_action(ActionType::AppendStrict, vec![entity]);
        let wire = serde_json::to_value(&update).unwrap();
        assert_eq!(
            wire,
            json!({
                "actionType": "appendStrict",
                "entities": [{"id": "e1", "type": "T", "temp": {"type": "Number", "value": 1.0}}]
            })
        );
        let back: Update = serde_json::from_value(wire).unwrap();
        assert_eq!(back, update);

        assert!(serde_json::from_value::<Update>(json!({"actionType": "merge", "entities": []})).is_err());
    }

    #[test]
    fn test_descriptions_complete() {
        for action in ActionType::ALL {
            assert!(!action.description().is_empty());
        }
        for option in GetEntitiesOptions::ALL {
            assert!(!option.description().is_empty());
        }
        assert_eq!(GetEntitiesOptions::KeyValues.as_str(), "keyValues");
        assert_eq!(
            "table".parse::<GetEntitiesOptions>().unwrap_err().kind(),
            ErrorKind::Enum
        );
    }

    #[test]
    fn test_query_serialization() {
        let query = Query::new(vec![EntityPattern::by_pattern(".*").unwrap()])
            .with_attrs(["temperature"])
            .with_expression(Expression::query("temperature>20"));
        assert_eq!(
            serde_json::to_value(&query).unwrap(),
            json!({
                "entities": [{"idPattern": ".*"}],
                "attrs": ["temperature"],
                "expression": {"q": "temperature>20"}
            })
        );
    }

    #[test]
    fn test_command_type_fixed() {
        let cmd = Command::new(json!({"open": true}));
        assert_eq!(cmd.to_wire(), json!({"type": "command", "value": {"open": true}}));

        let err = Command::from_wire(&json!({"type": "Text", "value": 1})).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Enum);
        assert!(Command::from_wire(&json!({"value": 1})).is_ok());
    }

    #[test]
    fn test_command_not_serializable() {
        let mut bad: HashMap<(u8, u8), u8> = HashMap::new();
        bad.insert((0, 1), 2);
        let err = Command::from_serializable(&bad).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TypeCoercion);
    }

    #[test]
    fn test_named_command_name() {
        let cmd = NamedCommand::new("open", json!("1")).unwrap();
        assert_eq!(
            serde_json::to_value(&cmd).unwrap(),
            json!({"name": "open", "type": "command", "value": "1"})
        );
        for bad in ["id", "type", "geo:location", "my name", "Test?"] {
            let err = NamedCommand::new(bad, Value::Null).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Format, "{bad}");
        }
        assert!(NamedCommand::from_wire(&json!({"type": "command", "value": 1})).is_err());
    }
}
