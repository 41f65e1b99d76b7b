//! ngsi-core - Typed NGSI-v2 context model
//!
//! Maps the loosely typed FIWARE wire format onto validated in-memory
//! structures: entities, attributes and metadata with type-driven value
//! coercion, plus the batch, query, subscription and IoT Agent payloads
//! built from them.
//!
//! ```
//! use ngsi_core::{ContextEntity, DataType, PropertyFormat};
//! use serde_json::json;
//!
//! let entity = ContextEntity::from_wire(&json!({
//!     "id": "Room1",
//!     "type": "Room",
//!     "temperature": {"type": "Number", "value": "21.5"},
//!     "isIn": {"type": "Relationship", "value": "Building1"}
//! }))
//! .unwrap();
//!
//! let relations = entity.get_relationships(PropertyFormat::List).unwrap();
//! assert_eq!(relations.names(), vec!["isIn"]);
//! assert_eq!(entity.attribute("temperature").unwrap().attr_type(), &DataType::Number);
//! ```

pub mod error;
pub mod models;
pub mod naming;
pub mod units;
pub mod vocabulary;

pub use error::{ErrorKind, NgsiError, NgsiResult};
pub use models::*;
pub use naming::NamePolicy;
pub use vocabulary::{AttributeType, DataType};
