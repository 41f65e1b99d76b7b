//! Context attribute models and type-driven value coercion
//!
//! An attribute on the wire is `{"type": ..., "value": ..., "metadata": {...}}`.
//! The declared type decides how the value is normalised:
//!
//! | type                  | rule                                     |
//! |-----------------------|------------------------------------------|
//! | `Text`                | every element (or the scalar) to string  |
//! | `Boolean`             | to boolean                               |
//! | `Number`, `Float`     | to floating point                        |
//! | `Integer`             | to integer                               |
//! | `DateTime`            | unchanged                                |
//! | `Array`               | must already be a list                   |
//! | anything else         | JSON pass-through                        |
//!
//! Empty values (`null`, `""`, `[]`, `{}`) are never coerced.

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Number, Value};
use tracing::debug;

use crate::error::{NgsiError, NgsiResult};
use crate::models::metadata::{parse_type_field, to_json, ContextMetadata, NamedContextMetadata};
use crate::naming::{validate_protected, validate_standard};
use crate::vocabulary::{AttributeType, DataType};

/// Coerce a raw value according to the declared attribute type
pub fn coerce_value(attr_type: &AttributeType, value: Value) -> NgsiResult<Value> {
    if is_empty(&value) {
        return Ok(value);
    }
    match attr_type {
        AttributeType::Known(DataType::Text) => elementwise(value, to_text),
        AttributeType::Known(DataType::Boolean) => elementwise(value, to_bool),
        AttributeType::Known(DataType::Number) | AttributeType::Known(DataType::Float) => {
            elementwise(value, to_float)
        }
        AttributeType::Known(DataType::Integer) => elementwise(value, to_integer),
        AttributeType::Known(DataType::DateTime) => Ok(value),
        AttributeType::Known(DataType::Array) => match value {
            Value::Array(_) => Ok(value),
            other => Err(NgsiError::coercion(
                DataType::Array.as_str(),
                format!("{} is not a list", json_kind(&other)),
            )),
        },
        AttributeType::Known(_) => Ok(value),
        AttributeType::Custom(name) => {
            debug!(attr_type = %name, "no coercion rule for custom type, passing value through");
            Ok(value)
        }
    }
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        _ => false,
    }
}

fn elementwise(value: Value, cast: fn(Value) -> NgsiResult<Value>) -> NgsiResult<Value> {
    match value {
        Value::Array(items) => items
            .into_iter()
            .map(cast)
            .collect::<NgsiResult<Vec<_>>>()
            .map(Value::Array),
        scalar => cast(scalar),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "object",
    }
}

fn to_text(value: Value) -> NgsiResult<Value> {
    Ok(match value {
        Value::Null => Value::Null,
        Value::String(s) => Value::String(s),
        Value::Bool(b) => Value::String(b.to_string()),
        Value::Number(n) => Value::String(n.to_string()),
        nested => Value::String(nested.to_string()),
    })
}

/// `"true"`/`"false"` literals map case-insensitively; anything else by truthiness
fn to_bool(value: Value) -> NgsiResult<Value> {
    let truthy = match &value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) if s.trim().eq_ignore_ascii_case("true") => true,
        Value::String(s) if s.trim().eq_ignore_ascii_case("false") => false,
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    };
    Ok(Value::Bool(truthy))
}

fn to_float(value: Value) -> NgsiResult<Value> {
    let target = DataType::Number.as_str();
    let f = match &value {
        Value::Null => return Ok(Value::Null),
        Value::Number(n) => n.as_f64(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        other => {
            return Err(NgsiError::coercion(
                target,
                format!("cannot cast {}", json_kind(other)),
            ))
        }
    };
    f.and_then(Number::from_f64)
        .map(Value::Number)
        .ok_or_else(|| NgsiError::coercion(target, format!("{} is not a finite number", value)))
}

fn to_integer(value: Value) -> NgsiResult<Value> {
    let target = DataType::Integer.as_str();
    match &value {
        Value::Null => Ok(Value::Null),
        Value::Number(n) if n.is_i64() || n.is_u64() => Ok(value),
        Value::Number(n) => {
            let f = n.as_f64().unwrap_or(f64::NAN);
            if f.is_finite() && f.trunc() >= i64::MIN as f64 && f.trunc() <= i64::MAX as f64 {
                Ok(Value::from(f.trunc() as i64))
            } else {
                Err(NgsiError::coercion(target, format!("{} is out of range", n)))
            }
        }
        Value::Bool(b) => Ok(Value::from(i64::from(*b))),
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map(Value::from)
            .map_err(|_| NgsiError::coercion(target, format!("'{}' is not an integer", s))),
        other => Err(NgsiError::coercion(
            target,
            format!("cannot cast {}", json_kind(other)),
        )),
    }
}

// =============================================================================
// Metadata normalization
// =============================================================================

/// Accepted shapes for attribute metadata
#[derive(Debug, Clone)]
pub enum MetadataInput {
    Single(NamedContextMetadata),
    List(Vec<NamedContextMetadata>),
    Map(IndexMap<String, ContextMetadata>),
    /// Raw JSON: an object name→{type, value} or a list of named records
    Raw(Value),
}

impl From<NamedContextMetadata> for MetadataInput {
    fn from(md: NamedContextMetadata) -> Self {
        MetadataInput::Single(md)
    }
}

impl From<Vec<NamedContextMetadata>> for MetadataInput {
    fn from(list: Vec<NamedContextMetadata>) -> Self {
        MetadataInput::List(list)
    }
}

impl From<IndexMap<String, ContextMetadata>> for MetadataInput {
    fn from(map: IndexMap<String, ContextMetadata>) -> Self {
        MetadataInput::Map(map)
    }
}

impl From<Value> for MetadataInput {
    fn from(raw: Value) -> Self {
        MetadataInput::Raw(raw)
    }
}

/// Normalise any accepted metadata shape into a mapping keyed by name
pub fn normalize_metadata(input: MetadataInput) -> NgsiResult<IndexMap<String, ContextMetadata>> {
    match input {
        MetadataInput::Single(md) => Ok(IndexMap::from([md.into_parts()])),
        MetadataInput::List(list) => Ok(list.into_iter().map(|md| md.into_parts()).collect()),
        MetadataInput::Map(map) => {
            for name in map.keys() {
                validate_standard("metadata name", name)?;
            }
            Ok(map)
        }
        MetadataInput::Raw(Value::Null) => Ok(IndexMap::new()),
        MetadataInput::Raw(Value::Object(map)) => map
            .iter()
            .map(|(name, raw)| {
                validate_standard("metadata name", name)?;
                Ok((name.clone(), ContextMetadata::from_wire(raw)?))
            })
            .collect(),
        MetadataInput::Raw(Value::Array(items)) => items
            .iter()
            .map(|raw| named_metadata_from_wire(raw).map(NamedContextMetadata::into_parts))
            .collect(),
        MetadataInput::Raw(other) => Err(NgsiError::Shape(format!(
            "metadata must be a mapping or a list of named metadata, got {}",
            json_kind(&other)
        ))),
    }
}

fn named_metadata_from_wire(raw: &Value) -> NgsiResult<NamedContextMetadata> {
    let name = raw
        .get("name")
        .and_then(Value::as_str)
        .ok_or_else(|| NgsiError::Shape(format!("metadata list entry without name: {}", raw)))?;
    let md = ContextMetadata::from_wire(raw)?;
    md.with_name(name)
}

// =============================================================================
// ContextAttribute
// =============================================================================

/// Attribute value with its NGSI type and metadata
///
/// ```
/// use ngsi_core::{ContextAttribute, DataType};
/// use serde_json::json;
///
/// let attr = ContextAttribute::new(DataType::Text, json!(20)).unwrap();
/// assert_eq!(attr.value(), &json!("20"));
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ContextAttribute {
    attr_type: AttributeType,
    value: Value,
    metadata: IndexMap<String, ContextMetadata>,
}

impl ContextAttribute {
    /// Create an attribute, coercing `value` to `attr_type`
    pub fn new(attr_type: impl Into<AttributeType>, value: Value) -> NgsiResult<Self> {
        let attr_type = attr_type.into();
        attr_type.validate("attribute type")?;
        let value = coerce_value(&attr_type, value)?;
        Ok(Self {
            attr_type,
            value,
            metadata: IndexMap::new(),
        })
    }

    /// Create an attribute from any serializable value
    pub fn from_serializable<T: Serialize + ?Sized>(
        attr_type: impl Into<AttributeType>,
        value: &T,
    ) -> NgsiResult<Self> {
        let attr_type = attr_type.into();
        let value = to_json(attr_type.as_str(), value)?;
        Self::new(attr_type, value)
    }

    /// Replace the metadata, normalising the given shape
    pub fn with_metadata(mut self, metadata: impl Into<MetadataInput>) -> NgsiResult<Self> {
        self.metadata = normalize_metadata(metadata.into())?;
        Ok(self)
    }

    /// Parse the wire representation `{type, value, metadata}`
    pub fn from_wire(raw: &Value) -> NgsiResult<Self> {
        let map = raw.as_object().ok_or_else(|| {
            NgsiError::Shape(format!("attribute must be an object, got {}", json_kind(raw)))
        })?;
        let attr_type = parse_type_field("attribute type", map.get("type"))?.unwrap_or_default();
        let value = map.get("value").cloned().unwrap_or(Value::Null);
        let attr = Self::new(attr_type, value)?;
        match map.get("metadata") {
            Some(md) => attr.with_metadata(md.clone()),
            None => Ok(attr),
        }
    }

    /// Wire representation
    pub fn to_wire(&self) -> Value {
        Value::Object(self.wire_fields())
    }

    fn wire_fields(&self) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("type".to_string(), Value::String(self.attr_type.to_string()));
        map.insert("value".to_string(), self.value.clone());
        if !self.metadata.is_empty() {
            let metadata = self
                .metadata
                .iter()
                .map(|(name, md)| (name.clone(), md.to_wire()))
                .collect();
            map.insert("metadata".to_string(), Value::Object(metadata));
        }
        map
    }

    pub fn attr_type(&self) -> &AttributeType {
        &self.attr_type
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn metadata(&self) -> &IndexMap<String, ContextMetadata> {
        &self.metadata
    }

    /// Replace the value, coercing it to the declared type
    pub fn set_value(&mut self, value: Value) -> NgsiResult<()> {
        self.value = coerce_value(&self.attr_type, value)?;
        Ok(())
    }

    /// Insert or overwrite one metadata element
    pub fn insert_metadata(&mut self, metadata: NamedContextMetadata) {
        let (name, md) = metadata.into_parts();
        self.metadata.insert(name, md);
    }

    /// Attach a name to this attribute
    pub fn with_name(self, name: impl Into<String>) -> NgsiResult<NamedContextAttribute> {
        NamedContextAttribute::new(name, self)
    }
}

impl Serialize for ContextAttribute {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.wire_fields().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ContextAttribute {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Value::deserialize(deserializer)?;
        Self::from_wire(&raw).map_err(serde::de::Error::custom)
    }
}

/// Attribute together with its name
///
/// [`new`](Self::new) and [`from_wire`](Self::from_wire) enforce the
/// protected pattern: no `:` and never `id` or `type`. Attributes read back
/// from a [`ContextEntity`](crate::ContextEntity) carry the entity's key
/// as-is, which only follows the standard pattern, so names such as
/// `geo:location` can appear there.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedContextAttribute {
    name: String,
    attribute: ContextAttribute,
}

impl NamedContextAttribute {
    pub fn new(name: impl Into<String>, attribute: ContextAttribute) -> NgsiResult<Self> {
        let name = name.into();
        validate_protected("attribute name", &name)?;
        Ok(Self { name, attribute })
    }

    /// Pair an entity map entry with its key; entity keys use the standard pattern
    pub(crate) fn from_entry(name: String, attribute: ContextAttribute) -> Self {
        Self { name, attribute }
    }

    /// Parse `{name, type, value, metadata}`
    pub fn from_wire(raw: &Value) -> NgsiResult<Self> {
        let name = raw
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| NgsiError::Shape(format!("named attribute without name: {}", raw)))?;
        Self::new(name, ContextAttribute::from_wire(raw)?)
    }

    pub fn to_wire(&self) -> Value {
        let mut map = Map::new();
        map.insert("name".to_string(), Value::String(self.name.clone()));
        map.extend(self.attribute.wire_fields());
        Value::Object(map)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn attribute(&self) -> &ContextAttribute {
        &self.attribute
    }

    pub fn attr_type(&self) -> &AttributeType {
        self.attribute.attr_type()
    }

    pub fn value(&self) -> &Value {
        self.attribute.value()
    }

    pub fn into_parts(self) -> (String, ContextAttribute) {
        (self.name, self.attribute)
    }
}

impl Serialize for NamedContextAttribute {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_wire().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for NamedContextAttribute {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Value::deserialize(deserializer)?;
        Self::from_wire(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn attr(t: DataType, v: Value) -> ContextAttribute {
        ContextAttribute::new(t, v).unwrap()
    }

    #[test]
    fn test_text_coercion() {
        assert_eq!(attr(DataType::Text, json!(20)).value(), &json!("20"));
        assert_eq!(attr(DataType::Text, json!(true)).value(), &json!("true"));
        assert_eq!(
            attr(DataType::Text, json!([1, "a", 2.5])).value(),
            &json!(["1", "a", "2.5"])
        );
        assert_eq!(
            attr(DataType::Text, json!({"a": 1})).value(),
            &json!("{\"a\":1}")
        );
    }

    #[test]
    fn test_number_coercion() {
        assert_eq!(attr(DataType::Number, json!(20)).value(), &json!(20.0));
        assert_eq!(attr(DataType::Float, json!([20, 20])).value(), &json!([20.0, 20.0]));
        assert_eq!(attr(DataType::Number, json!("21.5")).value(), &json!(21.5));
        let err = ContextAttribute::new(DataType::Number, json!("warm")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TypeCoercion);
    }

    #[test]
    fn test_integer_coercion() {
        assert_eq!(
            attr(DataType::Integer, json!([20.0, 20.0])).value(),
            &json!([20, 20])
        );
        assert_eq!(attr(DataType::Integer, json!(20.9)).value(), &json!(20));
        assert_eq!(attr(DataType::Integer, json!("-3")).value(), &json!(-3));
        assert!(ContextAttribute::new(DataType::Integer, json!("2.5")).is_err());
    }

    #[test]
    fn test_boolean_coercion() {
        assert_eq!(attr(DataType::Boolean, json!(1)).value(), &json!(true));
        assert_eq!(attr(DataType::Boolean, json!(0)).value(), &json!(false));
        assert_eq!(
            attr(DataType::Boolean, json!(["True", " FALSE "])).value(),
            &json!([true, false])
        );
        assert_eq!(attr(DataType::Boolean, json!("maybe")).value(), &json!(true));
        assert_eq!(attr(DataType::Boolean, json!({"a": 1})).value(), &json!(true));
    }

    #[test]
    fn test_boolean_list_elements_by_truthiness() {
        assert_eq!(
            attr(DataType::Boolean, json!([[1], [], {}, "", null, 0, 2.5])).value(),
            &json!([true, false, false, false, false, false, true])
        );
    }

    #[test]
    fn test_array_and_passthrough() {
        assert_eq!(attr(DataType::Array, json!([20, 20])).value(), &json!([20, 20]));
        let err = ContextAttribute::new(DataType::Array, json!(20)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TypeCoercion);

        let ts = json!("2021-09-21T12:00:00Z");
        assert_eq!(attr(DataType::DateTime, ts.clone()).value(), &ts);

        let structured = json!({"a": [1, {"b": null}]});
        assert_eq!(attr(DataType::StructuredValue, structured.clone()).value(), &structured);

        let custom = ContextAttribute::new(AttributeType::parse("MyType").unwrap(), json!(5)).unwrap();
        assert_eq!(custom.value(), &json!(5));
    }

    #[test]
    fn test_empty_values_skip_coercion() {
        assert_eq!(attr(DataType::Number, Value::Null).value(), &Value::Null);
        assert_eq!(attr(DataType::Array, json!("")).value(), &json!(""));
        assert_eq!(attr(DataType::Integer, json!([])).value(), &json!([]));
    }

    #[test]
    fn test_coercion_is_idempotent() {
        let cases = [
            (DataType::Text, json!([1, true, "x"])),
            (DataType::Number, json!("3.25")),
            (DataType::Float, json!([1, 2])),
            (DataType::Integer, json!(7.8)),
            (DataType::Boolean, json!("yes")),
            (DataType::Array, json!([1, [2]])),
            (DataType::StructuredValue, json!({"k": "v"})),
        ];
        for (t, raw) in cases {
            let t = AttributeType::from(t);
            let once = coerce_value(&t, raw).unwrap();
            let twice = coerce_value(&t, once.clone()).unwrap();
            assert_eq!(once, twice, "{t}");
        }
    }

    #[test]
    fn test_metadata_shapes_are_equivalent() {
        let md = ContextMetadata::new(Some(DataType::Text.into()), json!("test")).unwrap();
        let named = NamedContextMetadata::new("info", Some(DataType::Text.into()), json!("test"))
            .unwrap();

        let a1 = attr(DataType::Integer, json!(20))
            .with_metadata(IndexMap::from([("info".to_string(), md)]))
            .unwrap();
        let a2 = attr(DataType::Integer, json!(20))
            .with_metadata(named.clone())
            .unwrap();
        let a3 = attr(DataType::Integer, json!(20))
            .with_metadata(vec![named])
            .unwrap();
        let a4 = attr(DataType::Integer, json!(20))
            .with_metadata(json!({"info": {"type": "Text", "value": "test"}}))
            .unwrap();
        let a5 = attr(DataType::Integer, json!(20))
            .with_metadata(json!([{"name": "info", "type": "Text", "value": "test"}]))
            .unwrap();

        assert_eq!(a1, a2);
        assert_eq!(a1, a3);
        assert_eq!(a1, a4);
        assert_eq!(a1, a5);
    }

    #[test]
    fn test_metadata_invalid_shape() {
        let err = attr(DataType::Text, json!("x"))
            .with_metadata(json!("accuracy"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Shape);

        let err = attr(DataType::Text, json!("x"))
            .with_metadata(json!([{"type": "Text"}]))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Shape);
    }

    #[test]
    fn test_wire_round_trip() {
        let raw = json!({
            "type": "Number",
            "value": 21.5,
            "metadata": {"accuracy": {"type": "Number", "value": 0.1}}
        });
        let attr = ContextAttribute::from_wire(&raw).unwrap();
        assert_eq!(attr.to_wire(), raw);

        let parsed: ContextAttribute = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(parsed, attr);
        assert_eq!(serde_json::to_value(&parsed).unwrap(), raw);
    }

    #[test]
    fn test_default_type_is_text() {
        let attr = ContextAttribute::from_wire(&json!({"value": 5})).unwrap();
        assert_eq!(attr.attr_type(), &DataType::Text);
        assert_eq!(attr.value(), &json!("5"));
    }

    #[test]
    fn test_attribute_type_validated() {
        for bad in ["my name", "Test?", "#False", "/notvalid"] {
            let err = ContextAttribute::from_wire(&json!({ "type": bad })).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Format);
        }
        for ok in ["id", "type", "geo:location", "name"] {
            assert!(ContextAttribute::from_wire(&json!({ "type": ok })).is_ok());
        }
    }

    #[test]
    fn test_named_attribute_names() {
        for ok in ["name", "test123"] {
            assert!(NamedContextAttribute::new(ok, ContextAttribute::default()).is_ok());
        }
        for bad in ["my name", "Test?", "#False", "/notvalid", "id", "type", "geo:location"] {
            let err = NamedContextAttribute::new(bad, ContextAttribute::default()).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Format, "{bad}");
        }
    }

    #[test]
    fn test_named_attribute_wire() {
        let raw = json!({"name": "temperature", "type": "Number", "value": 20});
        let named = NamedContextAttribute::from_wire(&raw).unwrap();
        assert_eq!(named.name(), "temperature");
        assert_eq!(named.value(), &json!(20.0));
        assert_eq!(
            named.to_wire(),
            json!({"name": "temperature", "type": "Number", "value": 20.0})
        );
    }

    #[test]
    fn test_set_value_coerces() {
        let mut a = attr(DataType::Text, json!("a"));
        a.set_value(json!(42)).unwrap();
        assert_eq!(a.value(), &json!("42"));
    }
}
