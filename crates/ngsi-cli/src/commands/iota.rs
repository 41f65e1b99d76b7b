//! IoT Agent provisioning listings

use anyhow::{Context, Result};
use ngsi_client::HttpClient;

use crate::output::{DeviceRow, GroupRow, OutputContext};

/// List service groups of the tenant
pub async fn groups(client: &HttpClient, ctx: &OutputContext) -> Result<()> {
    let groups = client
        .iota()
        .get_group_list()
        .await
        .context("Failed to list service groups")?;

    let rows: Vec<GroupRow> = groups
        .into_iter()
        .map(|g| GroupRow {
            resource: g.resource,
            apikey: g.apikey,
            entity_type: g.entity_type.unwrap_or_default(),
            cbroker: g.cbroker.unwrap_or_default(),
        })
        .collect();

    ctx.print(&rows);
    Ok(())
}

/// List provisioned devices of the tenant
pub async fn devices(client: &HttpClient, ctx: &OutputContext) -> Result<()> {
    let devices = client
        .iota()
        .get_device_list()
        .await
        .context("Failed to list devices")?;

    let rows: Vec<DeviceRow> = devices
        .into_iter()
        .map(|d| DeviceRow {
            attributes: d.attributes.len() + d.lazy.len() + d.static_attributes.len(),
            commands: d.commands.len(),
            device_id: d.device_id,
            entity_name: d.entity_name,
            entity_type: d.entity_type,
            protocol: d.protocol.unwrap_or_default(),
        })
        .collect();

    ctx.print(&rows);
    Ok(())
}
