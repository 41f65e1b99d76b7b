//! Context entity models
//!
//! An entity is identified by `(id, type)` and carries an open, ordered set of
//! named attributes. On the wire it is a flat JSON object: the reserved `id`
//! and `type` members plus one member per attribute.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::{NgsiError, NgsiResult};
use crate::models::attribute::{ContextAttribute, NamedContextAttribute};
use crate::naming::validate_standard;
use crate::vocabulary::DataType;

/// Entity members that are never attributes
pub const RESERVED_FIELDS: [&str; 2] = ["id", "type"];

/// Check a key used as attribute name on an entity
pub(crate) fn validate_attribute_key(name: &str) -> NgsiResult<()> {
    validate_standard("attribute name", name)?;
    if RESERVED_FIELDS.contains(&name) {
        return Err(NgsiError::format(
            "attribute name",
            name,
            "collides with a reserved entity field",
        ));
    }
    Ok(())
}

fn read_identity(map: &Map<String, Value>) -> NgsiResult<(String, String)> {
    let read = |key: &str, field: &str| -> NgsiResult<String> {
        match map.get(key) {
            Some(Value::String(s)) => Ok(s.clone()),
            Some(other) => Err(NgsiError::format(field, other.to_string(), "must be a string")),
            None => Err(NgsiError::format(field, "", "field required")),
        }
    };
    Ok((read("id", "entity id")?, read("type", "entity type")?))
}

fn validate_identity(id: &str, entity_type: &str) -> NgsiResult<()> {
    validate_standard("entity id", id)?;
    validate_standard("entity type", entity_type)
}

// =============================================================================
// Response format and argument shapes
// =============================================================================

/// Shape of the attribute collection returned by entity queries
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyFormat {
    /// List of named attributes
    #[default]
    List,
    /// Mapping name → attribute
    Dict,
}

impl FromStr for PropertyFormat {
    type Err = NgsiError;

    fn from_str(s: &str) -> NgsiResult<Self> {
        match s {
            "list" => Ok(PropertyFormat::List),
            "dict" => Ok(PropertyFormat::Dict),
            other => Err(NgsiError::enumeration("response format", other, &["list", "dict"])),
        }
    }
}

impl fmt::Display for PropertyFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyFormat::List => f.write_str("list"),
            PropertyFormat::Dict => f.write_str("dict"),
        }
    }
}

/// Attributes returned by [`ContextEntity::get_attributes`]
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeCollection {
    List(Vec<NamedContextAttribute>),
    Dict(IndexMap<String, ContextAttribute>),
}

impl AttributeCollection {
    pub fn len(&self) -> usize {
        match self {
            AttributeCollection::List(l) => l.len(),
            AttributeCollection::Dict(d) => d.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Attribute names in entity order
    pub fn names(&self) -> Vec<&str> {
        match self {
            AttributeCollection::List(l) => l.iter().map(|a| a.name()).collect(),
            AttributeCollection::Dict(d) => d.keys().map(String::as_str).collect(),
        }
    }

    /// Convert into a list of named attributes
    pub fn into_list(self) -> Vec<NamedContextAttribute> {
        match self {
            AttributeCollection::List(l) => l,
            AttributeCollection::Dict(d) => d
                .into_iter()
                .map(|(name, attr)| NamedContextAttribute::from_entry(name, attr))
                .collect(),
        }
    }

    /// Convert into a mapping name → attribute
    pub fn into_dict(self) -> IndexMap<String, ContextAttribute> {
        match self {
            AttributeCollection::List(l) => l.into_iter().map(|a| a.into_parts()).collect(),
            AttributeCollection::Dict(d) => d,
        }
    }
}

/// Attributes accepted by [`ContextEntity::add_attributes`]
#[derive(Debug, Clone)]
pub enum AttributeSet {
    Map(IndexMap<String, ContextAttribute>),
    Named(Vec<NamedContextAttribute>),
}

impl From<IndexMap<String, ContextAttribute>> for AttributeSet {
    fn from(map: IndexMap<String, ContextAttribute>) -> Self {
        AttributeSet::Map(map)
    }
}

impl From<Vec<NamedContextAttribute>> for AttributeSet {
    fn from(list: Vec<NamedContextAttribute>) -> Self {
        AttributeSet::Named(list)
    }
}

impl From<NamedContextAttribute> for AttributeSet {
    fn from(attr: NamedContextAttribute) -> Self {
        AttributeSet::Named(vec![attr])
    }
}

/// Attribute references accepted by [`ContextEntity::delete_attributes`]
#[derive(Debug, Clone)]
pub enum AttributeRefs {
    Map(IndexMap<String, ContextAttribute>),
    Named(Vec<NamedContextAttribute>),
    Names(Vec<String>),
}

impl AttributeRefs {
    fn into_names(self) -> Vec<String> {
        match self {
            AttributeRefs::Map(m) => m.into_keys().collect(),
            AttributeRefs::Named(l) => l.into_iter().map(|a| a.into_parts().0).collect(),
            AttributeRefs::Names(n) => n,
        }
    }
}

impl From<IndexMap<String, ContextAttribute>> for AttributeRefs {
    fn from(map: IndexMap<String, ContextAttribute>) -> Self {
        AttributeRefs::Map(map)
    }
}

impl From<Vec<NamedContextAttribute>> for AttributeRefs {
    fn from(list: Vec<NamedContextAttribute>) -> Self {
        AttributeRefs::Named(list)
    }
}

impl From<Vec<String>> for AttributeRefs {
    fn from(names: Vec<String>) -> Self {
        AttributeRefs::Names(names)
    }
}

impl From<Vec<&str>> for AttributeRefs {
    fn from(names: Vec<&str>) -> Self {
        AttributeRefs::Names(names.into_iter().map(String::from).collect())
    }
}

impl<const N: usize> From<[&str; N]> for AttributeRefs {
    fn from(names: [&str; N]) -> Self {
        AttributeRefs::Names(names.iter().map(|s| s.to_string()).collect())
    }
}

// =============================================================================
// ContextEntityKeyValues
// =============================================================================

/// Simplified entity representation with bare attribute values
///
/// Corresponds to the broker's `keyValues` option:
/// `{"id": "R12345", "type": "Room", "temperature": 22}`.
#[derive(Debug, Clone, PartialEq)]
pub struct ContextEntityKeyValues {
    id: String,
    entity_type: String,
    values: IndexMap<String, Value>,
}

impl ContextEntityKeyValues {
    pub fn new(id: impl Into<String>, entity_type: impl Into<String>) -> NgsiResult<Self> {
        let (id, entity_type) = (id.into(), entity_type.into());
        validate_identity(&id, &entity_type)?;
        Ok(Self {
            id,
            entity_type,
            values: IndexMap::new(),
        })
    }

    pub fn from_wire(raw: &Value) -> NgsiResult<Self> {
        let map = raw
            .as_object()
            .ok_or_else(|| NgsiError::Shape(format!("entity must be an object, got {}", raw)))?;
        let (id, entity_type) = read_identity(map)?;
        let mut entity = Self::new(id, entity_type)?;
        for (name, value) in map.iter().filter(|(k, _)| !RESERVED_FIELDS.contains(&k.as_str())) {
            entity.insert(name.clone(), value.clone())?;
        }
        Ok(entity)
    }

    pub fn to_wire(&self) -> Value {
        let mut map = Map::new();
        map.insert("id".to_string(), Value::String(self.id.clone()));
        map.insert("type".to_string(), Value::String(self.entity_type.clone()));
        for (name, value) in &self.values {
            map.insert(name.clone(), value.clone());
        }
        Value::Object(map)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn entity_type(&self) -> &str {
        &self.entity_type
    }

    pub fn values(&self) -> &IndexMap<String, Value> {
        &self.values
    }

    /// Insert or overwrite an attribute value
    pub fn insert(&mut self, name: impl Into<String>, value: Value) -> NgsiResult<()> {
        let name = name.into();
        validate_attribute_key(&name)?;
        self.values.insert(name, value);
        Ok(())
    }
}

impl From<&ContextEntity> for ContextEntityKeyValues {
    fn from(entity: &ContextEntity) -> Self {
        Self {
            id: entity.id.clone(),
            entity_type: entity.entity_type.clone(),
            values: entity
                .attributes
                .iter()
                .map(|(name, attr)| (name.clone(), attr.value().clone()))
                .collect(),
        }
    }
}

impl Serialize for ContextEntityKeyValues {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_wire().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ContextEntityKeyValues {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Value::deserialize(deserializer)?;
        Self::from_wire(&raw).map_err(serde::de::Error::custom)
    }
}

// =============================================================================
// ContextEntity
// =============================================================================

/// NGSI context entity
///
/// `id` and `type` are fixed at construction; attributes are managed through
/// [`add_attributes`](Self::add_attributes) and
/// [`delete_attributes`](Self::delete_attributes).
///
/// ```
/// use ngsi_core::ContextEntity;
/// use serde_json::json;
///
/// let entity = ContextEntity::from_wire(&json!({
///     "id": "MyId",
///     "type": "MyType",
///     "temperature": {"value": 20, "type": "Number"}
/// }))
/// .unwrap();
/// assert_eq!(entity.attribute("temperature").unwrap().value(), &json!(20.0));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ContextEntity {
    id: String,
    entity_type: String,
    attributes: IndexMap<String, ContextAttribute>,
}

impl ContextEntity {
    /// Create an entity without attributes
    pub fn new(id: impl Into<String>, entity_type: impl Into<String>) -> NgsiResult<Self> {
        let (id, entity_type) = (id.into(), entity_type.into());
        validate_identity(&id, &entity_type)?;
        Ok(Self {
            id,
            entity_type,
            attributes: IndexMap::new(),
        })
    }

    /// Parse the flat wire object; every non-reserved member is an attribute
    pub fn from_wire(raw: &Value) -> NgsiResult<Self> {
        let map = raw
            .as_object()
            .ok_or_else(|| NgsiError::Shape(format!("entity must be an object, got {}", raw)))?;
        let (id, entity_type) = read_identity(map)?;
        let mut entity = Self::new(id, entity_type)?;
        for (name, raw_attr) in map.iter().filter(|(k, _)| !RESERVED_FIELDS.contains(&k.as_str())) {
            validate_attribute_key(name)?;
            entity
                .attributes
                .insert(name.clone(), ContextAttribute::from_wire(raw_attr)?);
        }
        Ok(entity)
    }

    /// Parse JSON text
    pub fn from_json(text: &str) -> NgsiResult<Self> {
        let raw: Value = serde_json::from_str(text)?;
        Self::from_wire(&raw)
    }

    /// Flat wire object: reserved fields plus one member per attribute
    pub fn to_wire(&self) -> Value {
        let mut map = Map::new();
        map.insert("id".to_string(), Value::String(self.id.clone()));
        map.insert("type".to_string(), Value::String(self.entity_type.clone()));
        for (name, attr) in &self.attributes {
            map.insert(name.clone(), attr.to_wire());
        }
        Value::Object(map)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn entity_type(&self) -> &str {
        &self.entity_type
    }

    /// All attributes in insertion order
    pub fn attributes(&self) -> &IndexMap<String, ContextAttribute> {
        &self.attributes
    }

    pub fn attribute(&self, name: &str) -> Option<&ContextAttribute> {
        self.attributes.get(name)
    }

    pub fn attribute_mut(&mut self, name: &str) -> Option<&mut ContextAttribute> {
        self.attributes.get_mut(name)
    }

    /// Insert or overwrite attributes; the last write for a name wins
    pub fn add_attributes(&mut self, attrs: impl Into<AttributeSet>) -> NgsiResult<()> {
        let entries: Vec<(String, ContextAttribute)> = match attrs.into() {
            AttributeSet::Map(map) => {
                for name in map.keys() {
                    validate_attribute_key(name)?;
                }
                map.into_iter().collect()
            }
            AttributeSet::Named(list) => list.into_iter().map(|a| a.into_parts()).collect(),
        };
        self.attributes.extend(entries);
        Ok(())
    }

    /// Filter attributes by type
    ///
    /// `whitelist` keeps only the listed types, `blacklist` drops them;
    /// supplying both is an error. Custom types never match a whitelist.
    pub fn get_attributes(
        &self,
        whitelist: Option<&[DataType]>,
        blacklist: Option<&[DataType]>,
        format: PropertyFormat,
    ) -> NgsiResult<AttributeCollection> {
        if whitelist.is_some() && blacklist.is_some() {
            return Err(NgsiError::Precondition(
                "only whitelist or blacklist is allowed".to_string(),
            ));
        }

        let selected = self.attributes.iter().filter(|(_, attr)| {
            let known = attr.attr_type().known();
            match (whitelist, blacklist) {
                (Some(white), _) => known.is_some_and(|t| white.contains(&t)),
                (_, Some(black)) => !known.is_some_and(|t| black.contains(&t)),
                (None, None) => true,
            }
        });

        Ok(match format {
            PropertyFormat::Dict => AttributeCollection::Dict(
                selected
                    .map(|(name, attr)| (name.clone(), attr.clone()))
                    .collect(),
            ),
            PropertyFormat::List => AttributeCollection::List(
                selected
                    .map(|(name, attr)| NamedContextAttribute::from_entry(name.clone(), attr.clone()))
                    .collect(),
            ),
        })
    }

    /// Single attribute with its name
    pub fn get_attribute(&self, name: &str) -> Option<NamedContextAttribute> {
        self.attributes
            .get(name)
            .map(|attr| NamedContextAttribute::from_entry(name.to_string(), attr.clone()))
    }

    /// Names of all attributes
    pub fn get_attribute_names(&self) -> BTreeSet<String> {
        self.attributes.keys().cloned().collect()
    }

    /// Remove attributes
    ///
    /// Every referenced name must exist; otherwise nothing is removed.
    pub fn delete_attributes(&mut self, attrs: impl Into<AttributeRefs>) -> NgsiResult<()> {
        let names = attrs.into().into_names();
        if let Some(missing) = names.iter().find(|n| !self.attributes.contains_key(*n)) {
            return Err(NgsiError::Precondition(format!(
                "entity '{}' has no attribute '{}'",
                self.id, missing
            )));
        }
        for name in names {
            self.attributes.shift_remove(&name);
        }
        Ok(())
    }

    /// All attributes that are not relationships
    pub fn get_properties(&self, format: PropertyFormat) -> NgsiResult<AttributeCollection> {
        self.get_attributes(None, Some(&[DataType::Relationship]), format)
    }

    /// Attributes of type `Relationship`
    pub fn get_relationships(&self, format: PropertyFormat) -> NgsiResult<AttributeCollection> {
        self.get_attributes(Some(&[DataType::Relationship]), None, format)
    }
}

impl TryFrom<Value> for ContextEntity {
    type Error = NgsiError;

    fn try_from(raw: Value) -> NgsiResult<Self> {
        Self::from_wire(&raw)
    }
}

impl Serialize for ContextEntity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_wire().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ContextEntity {
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

    fn entity_data() -> Value {
        json!({
            "id": "MyId",
            "type": "MyType",
            "temperature": {"value": 20, "type": "Number"},
            "relation": {"value": "OtherEntity", "type": "Relationship"}
        })
    }

    fn text_attr(v: Value) -> ContextAttribute {
        ContextAttribute::new(DataType::Text, v).unwrap()
    }

    #[test]
    fn test_entity_from_wire() {
        let entity = ContextEntity::from_wire(&entity_data()).unwrap();
        assert_eq!(entity.id(), "MyId");
        assert_eq!(entity.entity_type(), "MyType");
        assert_eq!(entity.attributes().len(), 2);
        assert_eq!(
            entity.to_wire(),
            json!({
                "id": "MyId",
                "type": "MyType",
                "temperature": {"value": 20.0, "type": "Number"},
                "relation": {"value": "OtherEntity", "type": "Relationship"}
            })
        );
    }

    #[test]
    fn test_entity_wire_round_trip() {
        let raw = json!({
            "id": "urn:ngsi:Room:001",
            "type": "Room",
            "name": {"type": "Text", "value": "Office"},
            "occupied": {"type": "Boolean", "value": true},
            "temperature": {"type": "Number", "value": 21.3},
            "humidity": {"type": "Float", "value": 40},
            "people": {"type": "Integer", "value": 3},
            "observedAt": {"type": "DateTime", "value": "2021-09-21T10:00:00Z"},
            "tags": {"type": "Array", "value": ["a", 1]},
            "config": {"type": "StructuredValue", "value": {"k": [1, 2]}},
            "refBuilding": {"type": "Relationship", "value": "urn:ngsi:Building:1"},
            "open": {"type": "command", "value": ""},
            "vendorSpecific": {"type": "VendorType", "value": {"x": 1},
                "metadata": {"accuracy": {"type": "Number", "value": 0.5}}}
        });
        let entity = ContextEntity::from_wire(&raw).unwrap();
        let again = ContextEntity::from_wire(&entity.to_wire()).unwrap();
        assert_eq!(again, entity);

        let text = serde_json::to_string(&entity).unwrap();
        let parsed: ContextEntity = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed, entity);
    }

    #[test]
    fn test_entity_identity_validated() {
        for bad in ["my name", "Test?", "#False", "/notvalid"] {
            let err = ContextEntity::new(bad, "name").unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Format);
            assert!(ContextEntity::new("name", bad).is_err());
            assert!(ContextEntityKeyValues::new(bad, "name").is_err());
        }
        for ok in ["name", "test123", "3_:strange-Name!", "id", "type", "geo:location"] {
            assert!(ContextEntity::new(ok, ok).is_ok());
            assert!(ContextEntityKeyValues::new(ok, ok).is_ok());
        }
        let err = ContextEntity::from_wire(&json!({"id": "x"})).unwrap_err();
        assert!(err.to_string().contains("entity type"));
    }

    #[test]
    fn test_non_object_attribute_rejected() {
        let err = ContextEntity::from_wire(&json!({"id": "a", "type": "b", "temp": 20})).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Shape);
    }

    #[test]
    fn test_get_properties_and_relationships() {
        let entity = ContextEntity::from_wire(&entity_data()).unwrap();

        let props = entity.get_properties(PropertyFormat::List).unwrap();
        let props = props.into_list();
        assert_eq!(props.len(), 1);
        assert_eq!(props[0].name(), "temperature");
        assert_eq!(props[0].value(), &json!(20.0));

        let props = entity.get_properties(PropertyFormat::Dict).unwrap().into_dict();
        assert_eq!(
            props["temperature"].to_wire(),
            json!({"type": "Number", "value": 20.0})
        );

        let relations = entity.get_relationships(PropertyFormat::List).unwrap();
        assert_eq!(relations.names(), vec!["relation"]);
    }

    #[test]
    fn test_custom_types_are_properties() {
        let mut entity = ContextEntity::new("e", "T").unwrap();
        let custom = ContextAttribute::new(
            crate::vocabulary::AttributeType::parse("Vendor").unwrap(),
            json!(1),
        )
        .unwrap();
        entity
            .add_attributes(IndexMap::from([("vendor".to_string(), custom)]))
            .unwrap();
        assert_eq!(entity.get_properties(PropertyFormat::List).unwrap().len(), 1);
        let whitelisted = entity
            .get_attributes(Some(&DataType::ALL), None, PropertyFormat::Dict)
            .unwrap();
        assert!(whitelisted.is_empty());
    }

    #[test]
    fn test_whitelist_and_blacklist_exclusive() {
        let entity = ContextEntity::from_wire(&entity_data()).unwrap();
        let err = entity
            .get_attributes(
                Some(&[DataType::Number]),
                Some(&[DataType::Text]),
                PropertyFormat::List,
            )
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Precondition);

        let numbers = entity
            .get_attributes(Some(&[DataType::Number]), None, PropertyFormat::Dict)
            .unwrap();
        assert_eq!(numbers.names(), vec!["temperature"]);
    }

    #[test]
    fn test_add_attributes_last_write_wins() {
        let mut entity = ContextEntity::from_wire(&entity_data()).unwrap();
        let new_attr = ContextAttribute::new(DataType::Number, json!(25)).unwrap();
        entity
            .add_attributes(IndexMap::from([("new_attr".to_string(), new_attr)]))
            .unwrap();
        assert_eq!(entity.attribute("new_attr").unwrap().value(), &json!(25.0));

        let replacement = NamedContextAttribute::new("new_attr", text_attr(json!("x"))).unwrap();
        entity.add_attributes(replacement).unwrap();
        assert_eq!(entity.attribute("new_attr").unwrap().value(), &json!("x"));
        assert_eq!(entity.attributes().len(), 3);
    }

    #[test]
    fn test_add_reserved_attribute_rejected() {
        let mut entity = ContextEntity::new("e", "T").unwrap();
        let err = entity
            .add_attributes(IndexMap::from([("id".to_string(), text_attr(json!("x")))]))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Format);
        assert!(entity.attributes().is_empty());
    }

    #[test]
    fn test_entity_delete_attributes() {
        let attr = text_attr(json!(20));
        let named_attr = NamedContextAttribute::new("test2", text_attr(json!(20))).unwrap();
        let attr3 = text_attr(json!(20));

        let mut entity = ContextEntity::new("12", "Test").unwrap();
        entity
            .add_attributes(IndexMap::from([
                ("test1".to_string(), attr.clone()),
                ("test3".to_string(), attr3),
            ]))
            .unwrap();
        entity.add_attributes(vec![named_attr.clone()]).unwrap();

        entity
            .delete_attributes(IndexMap::from([("test1".to_string(), attr)]))
            .unwrap();
        assert_eq!(
            entity.get_attribute_names(),
            BTreeSet::from(["test2".to_string(), "test3".to_string()])
        );

        entity.delete_attributes(vec![named_attr]).unwrap();
        assert_eq!(entity.get_attribute_names(), BTreeSet::from(["test3".to_string()]));

        entity.delete_attributes(["test3"]).unwrap();
        assert_eq!(entity.get_attribute_names(), BTreeSet::new());
    }

    #[test]
    fn test_delete_missing_attribute() {
        let mut entity = ContextEntity::from_wire(&entity_data()).unwrap();
        let err = entity.delete_attributes(["temperature", "missing"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Precondition);
        // nothing removed
        assert_eq!(entity.attributes().len(), 2);

        entity.delete_attributes(["temperature"]).unwrap();
        entity.delete_attributes(["relation"]).unwrap();
        assert!(entity.get_attribute_names().is_empty());
    }

    #[test]
    fn test_get_attribute() {
        let entity = ContextEntity::from_wire(&entity_data()).unwrap();
        let attr = entity.get_attribute("relation").unwrap();
        assert_eq!(attr.attr_type(), &DataType::Relationship);
        assert!(entity.get_attribute("missing").is_none());
    }

    #[test]
    fn test_colon_names_listed() {
        let entity = ContextEntity::from_wire(&json!({
            "id": "p1",
            "type": "Place",
            "geo:location": {"type": "geo:json", "value": {"type": "Point", "coordinates": [1, 2]}}
        }))
        .unwrap();
        let listed = entity.get_properties(PropertyFormat::List).unwrap();
        assert_eq!(listed.names(), vec!["geo:location"]);

        let read_back = entity.get_attribute("geo:location").unwrap();
        assert_eq!(read_back.name(), "geo:location");
        assert!(NamedContextAttribute::new("geo:location", read_back.attribute().clone()).is_err());

        let mut copy = ContextEntity::new("p2", "Place").unwrap();
        copy.add_attributes(listed.into_list()).unwrap();
        assert_eq!(copy.get_attribute_names().into_iter().collect::<Vec<_>>(), vec!["geo:location"]);
    }

    #[test]
    fn test_property_format_from_str() {
        assert_eq!("dict".parse::<PropertyFormat>().unwrap(), PropertyFormat::Dict);
        let err = "table".parse::<PropertyFormat>().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Enum);
    }

    #[test]
    fn test_key_values() {
        let entity = ContextEntity::from_wire(&entity_data()).unwrap();
        let kv = ContextEntityKeyValues::from(&entity);
        assert_eq!(
            kv.to_wire(),
            json!({"id": "MyId", "type": "MyType", "temperature": 20.0, "relation": "OtherEntity"})
        );
        let parsed = ContextEntityKeyValues::from_wire(&kv.to_wire()).unwrap();
        assert_eq!(parsed, kv);
    }
}
