//! Command implementations for ngsi-cli

pub mod entities;
pub mod iota;
pub mod version;

pub use entities::{attrs, delete, entities, entity, update, AttrKind, EntityFilter};
pub use iota::{devices, groups};
pub use version::version;
