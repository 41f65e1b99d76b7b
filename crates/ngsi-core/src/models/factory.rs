//! Runtime entity model generation
//!
//! A sample payload fixes which attributes an entity must carry; optional
//! per-attribute rules add further checks.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::Value;
use tracing::debug;

use crate::error::{NgsiError, NgsiResult};
use crate::models::attribute::ContextAttribute;
use crate::models::entity::{ContextEntity, RESERVED_FIELDS};

/// Check applied to one attribute; the error string becomes the failure reason
pub type AttributeValidator = Arc<dyn Fn(&ContextAttribute) -> Result<(), String> + Send + Sync>;

const DEFAULT_MODEL_NAME: &str = "GeneratedContextEntity";

/// Entity schema built at runtime
#[derive(Clone)]
pub struct EntityModel {
    name: String,
    required_attributes: Vec<String>,
    validators: IndexMap<String, AttributeValidator>,
}

impl fmt::Debug for EntityModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityModel")
            .field("name", &self.name)
            .field("required_attributes", &self.required_attributes)
            .field("validators", &self.validators.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Build an [`EntityModel`] from a sample entity payload
///
/// Every member of `data` except `id` and `type` becomes a required
/// attribute. `validators` maps attribute names to rules checked on parse.
pub fn create_context_entity_model(
    name: Option<&str>,
    data: &Value,
    validators: IndexMap<String, AttributeValidator>,
) -> NgsiResult<EntityModel> {
    let map = data
        .as_object()
        .ok_or_else(|| NgsiError::Shape(format!("model sample must be an object, got {}", data)))?;
    let required_attributes: Vec<String> = map
        .keys()
        .filter(|k| !RESERVED_FIELDS.contains(&k.as_str()))
        .cloned()
        .collect();

    let name = name.unwrap_or(DEFAULT_MODEL_NAME).to_string();
    debug!(model = %name, required = ?required_attributes, "created entity model");
    Ok(EntityModel {
        name,
        required_attributes,
        validators,
    })
}

impl EntityModel {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn required_attributes(&self) -> &[String] {
        &self.required_attributes
    }

    /// Register an additional rule for `attribute`
    pub fn with_validator(
        mut self,
        attribute: impl Into<String>,
        rule: impl Fn(&ContextAttribute) -> Result<(), String> + Send + Sync + 'static,
    ) -> Self {
        self.validators.insert(attribute.into(), Arc::new(rule));
        self
    }

    /// Parse a payload and check it against the model
    pub fn parse(&self, raw: &Value) -> NgsiResult<ContextEntity> {
        let entity = ContextEntity::from_wire(raw)?;
        self.validate(&entity)?;
        Ok(entity)
    }

    /// Check an existing entity against the model
    pub fn validate(&self, entity: &ContextEntity) -> NgsiResult<()> {
        if let Some(missing) = self
            .required_attributes
            .iter()
            .find(|name| entity.attribute(name).is_none())
        {
            return Err(NgsiError::validation(
                missing.clone(),
                format!("field required by model '{}'", self.name),
            ));
        }

        for (name, rule) in &self.validators {
            // rules for optional attributes only run when present
            if let Some(attr) = entity.attribute(name) {
                rule(attr).map_err(|reason| NgsiError::validation(name.clone(), reason))?;
            }
        }
        Ok(())
    }
}
