//! Version command - check both services

use anyhow::{bail, Result};
use ngsi_client::HttpClient;

use crate::output::OutputContext;

/// Query the broker and the agent concurrently
pub async fn version(client: &HttpClient, ctx: &OutputContext) -> Result<()> {
    let (cb, iota) =
        futures::future::join(client.cb().get_version(), client.iota().get_version()).await;

    let mut pairs = Vec::new();
    let mut failures = 0;

    match cb {
        Ok(v) => {
            pairs.push(("Context Broker", v.orion.version));
            if let Some(uptime) = v.orion.uptime {
                pairs.push(("Uptime", uptime));
            }
        }
        Err(e) => {
            failures += 1;
            ctx.error(&format!("Context Broker at {}: {}", client.config().cb_url, e));
        }
    }
    match iota {
        Ok(v) => {
            pairs.push(("IoT Agent", v.version.unwrap_or_default()));
            pairs.push(("IoT Agent library", v.lib_version));
        }
        Err(e) => {
            failures += 1;
            ctx.error(&format!("IoT Agent at {}: {}", client.config().iota_url, e));
        }
    }

    if failures == 2 {
        bail!("No service reachable");
    }
    ctx.print_kv(&pairs);
    Ok(())
}
