//! NGSI-v2 context models

mod attribute;
mod base;
mod bulk;
mod entity;
mod factory;
mod iot;
mod metadata;
mod subscription;

pub use attribute::*;
pub use base::*;
pub use bulk::*;
pub use entity::*;
pub use factory::*;
pub use iot::*;
pub use metadata::*;
pub use subscription::*;
