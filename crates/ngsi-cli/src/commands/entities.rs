//! Entity commands - list, inspect, delete and update context entities

use anyhow::{Context, Result};
use clap::ValueEnum;
use ngsi_client::{EntityListParams, HttpClient};
use ngsi_core::{AttributeType, ContextAttribute, ContextEntity, NamedContextAttribute, PropertyFormat};
use serde_json::Value;

use crate::output::{cell, AttributeRow, EntityRow, OutputContext, OutputFormat};

/// Which attributes of an entity to show
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum AttrKind {
    #[default]
    All,
    /// Everything except relationships
    Properties,
    Relationships,
}

/// Listing filters taken from the command line
#[derive(Debug, Clone, Default)]
pub struct EntityFilter {
    pub entity_type: Option<String>,
    pub id_pattern: Option<String>,
    pub query: Option<String>,
    pub limit: Option<u32>,
}

impl EntityFilter {
    fn to_params(&self) -> EntityListParams {
        let mut params = EntityListParams::new();
        if let Some(t) = &self.entity_type {
            params = params.with_type(t);
        }
        if let Some(p) = &self.id_pattern {
            params = params.with_id_pattern(p);
        }
        if let Some(q) = &self.query {
            params = params.with_query(q);
        }
        if let Some(limit) = self.limit {
            params = params.with_limit(limit);
        }
        params
    }
}

/// List entities matching the filter
pub async fn entities(
    client: &HttpClient,
    filter: &EntityFilter,
    key_values: bool,
    ctx: &OutputContext,
) -> Result<()> {
    let params = filter.to_params();

    if key_values {
        let entities = client
            .cb()
            .get_entity_list_key_values(&params)
            .await
            .context("Failed to list entities")?;
        let docs = entities.iter().map(|e| e.to_wire()).collect();
        ctx.print_json(&Value::Array(docs));
        return Ok(());
    }

    let entities = client
        .cb()
        .get_entity_list(&params)
        .await
        .context("Failed to list entities")?;

    let rows: Vec<EntityRow> = entities
        .iter()
        .map(|e| EntityRow {
            id: e.id().to_string(),
            entity_type: e.entity_type().to_string(),
            attributes: e
                .get_attribute_names()
                .into_iter()
                .collect::<Vec<_>>()
                .join(","),
        })
        .collect();

    ctx.print(&rows);
    Ok(())
}

/// Show one entity
pub async fn entity(
    client: &HttpClient,
    id: &str,
    entity_type: Option<&str>,
    ctx: &OutputContext,
) -> Result<()> {
    let entity = client
        .cb()
        .get_entity(id, entity_type, None)
        .await
        .with_context(|| format!("Failed to read entity {}", id))?;

    match ctx.format {
        OutputFormat::Json => ctx.print_json(&entity.to_wire()),
        _ => {
            ctx.print_kv(&[
                ("ID", entity.id().to_string()),
                ("Type", entity.entity_type().to_string()),
            ]);
            ctx.print(&attribute_rows(&entity, AttrKind::All)?);
        }
    }
    Ok(())
}

/// Show the attributes of one entity
pub async fn attrs(
    client: &HttpClient,
    id: &str,
    entity_type: Option<&str>,
    kind: AttrKind,
    ctx: &OutputContext,
) -> Result<()> {
    let entity = client
        .cb()
        .get_entity(id, entity_type, None)
        .await
        .with_context(|| format!("Failed to read entity {}", id))?;

    ctx.print(&attribute_rows(&entity, kind)?);
    Ok(())
}

fn attribute_rows(entity: &ContextEntity, kind: AttrKind) -> Result<Vec<AttributeRow>> {
    let selected = match kind {
        AttrKind::All => entity.get_attributes(None, None, PropertyFormat::List)?,
        AttrKind::Properties => entity.get_properties(PropertyFormat::List)?,
        AttrKind::Relationships => entity.get_relationships(PropertyFormat::List)?,
    };

    Ok(selected
        .into_list()
        .into_iter()
        .map(|attr| AttributeRow {
            name: attr.name().to_string(),
            attr_type: attr.attr_type().to_string(),
            value: cell(attr.value()),
            metadata: attr
                .attribute()
                .metadata()
                .keys()
                .cloned()
                .collect::<Vec<_>>()
                .join(","),
        })
        .collect())
}

/// Delete one entity
pub async fn delete(
    client: &HttpClient,
    id: &str,
    entity_type: Option<&str>,
    ctx: &OutputContext,
) -> Result<()> {
    client
        .cb()
        .delete_entity(id, entity_type)
        .await
        .with_context(|| format!("Failed to delete entity {}", id))?;

    ctx.success(&format!("Deleted entity {}", id));
    Ok(())
}

/// Write an attribute
///
/// With `attr_type` the whole attribute is replaced and the value coerced
/// to that type; otherwise only the value is written.
pub async fn update(
    client: &HttpClient,
    id: &str,
    attr: &str,
    value: &str,
    entity_type: Option<&str>,
    attr_type: Option<&str>,
    ctx: &OutputContext,
) -> Result<()> {
    let json_value = parse_value(value)?;

    match attr_type {
        Some(attr_type) => {
            let attr_type: AttributeType = attr_type.parse()?;
            let attribute = NamedContextAttribute::new(attr, ContextAttribute::new(attr_type, json_value)?)?;
            client
                .cb()
                .update_entity_attribute(id, &attribute, entity_type)
                .await
                .with_context(|| format!("Failed to update {}/{}", id, attr))?;
        }
        None => {
            client
                .cb()
                .update_attribute_value(id, attr, &json_value, entity_type)
                .await
                .with_context(|| format!("Failed to update {}/{}", id, attr))?;
        }
    }

    ctx.success(&format!("Updated {}.{} = {}", id, attr, value));
    Ok(())
}

/// Parse a command-line value as JSON where it looks like JSON, else as text
fn parse_value(value: &str) -> Result<Value> {
    if value.starts_with('{')
        || value.starts_with('[')
        || value.starts_with('"')
        || value == "true"
        || value == "false"
        || value == "null"
    {
        return serde_json::from_str(value).context("Failed to parse value as JSON");
    }
    if let Ok(num) = value.parse::<i64>() {
        return Ok(Value::Number(num.into()));
    }
    Ok(value
        .parse::<f64>()
        .ok()
        .and_then(serde_json::Number::from_f64)
        .map(Value::Number)
        .unwrap_or_else(|| Value::String(value.to_string())))
}
