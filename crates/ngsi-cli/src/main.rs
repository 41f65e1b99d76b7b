//! NGSI CLI - Command-line tool for FIWARE context data
//!
//! Health checks and entity inspection against an Orion Context Broker and
//! an IoT Agent.

mod commands;
mod config;
mod output;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ngsi_client::HttpClient;
use ngsi_core::FiwareHeader;
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::commands::{AttrKind, EntityFilter};
use crate::config::{Args, Config, MergedConfig};
use crate::output::{OutputContext, OutputFormat};

#[derive(Parser)]
#[command(name = "ngsi-cli")]
#[command(author, version, about = "FIWARE NGSI-v2 CLI")]
#[command(propagate_version = true)]
struct Cli {
    /// Context Broker URL
    #[arg(long)]
    cb_url: Option<String>,

    /// IoT Agent URL
    #[arg(long)]
    iota_url: Option<String>,

    /// Tenant (fiware-service)
    #[arg(long)]
    service: Option<String>,

    /// Service path (fiware-servicepath)
    #[arg(long)]
    service_path: Option<String>,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum)]
    output: Option<OutputFormat>,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,

    /// Minimal output (for scripting)
    #[arg(short, long)]
    quiet: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show Context Broker and IoT Agent versions
    Version,

    /// List entities
    Entities {
        /// Entity type
        #[arg(short = 't', long = "type")]
        entity_type: Option<String>,

        /// Regular expression on entity ids
        #[arg(long)]
        id_pattern: Option<String>,

        /// Simple query language filter, e.g. "temperature>20"
        #[arg(short = 'q', long)]
        query: Option<String>,

        /// Maximum number of entities
        #[arg(long)]
        limit: Option<u32>,

        /// Print bare attribute values as JSON
        #[arg(long)]
        key_values: bool,
    },

    /// Show one entity
    Entity {
        /// Entity ID
        id: String,

        /// Entity type
        #[arg(short = 't', long = "type")]
        entity_type: Option<String>,
    },

    /// Show the attributes of an entity
    Attrs {
        /// Entity ID
        id: String,

        /// Entity type
        #[arg(short = 't', long = "type")]
        entity_type: Option<String>,

        /// Attribute selection
        #[arg(long, value_enum, default_value = "all")]
        kind: AttrKind,
    },

    /// Delete an entity
    Delete {
        /// Entity ID
        id: String,

        /// Entity type
        #[arg(short = 't', long = "type")]
        entity_type: Option<String>,
    },

    /// Write an attribute value
    Update {
        /// Entity ID
        id: String,

        /// Attribute name
        attr: String,

        /// Value to write (string, number, or JSON)
        value: String,

        /// Entity type
        #[arg(short = 't', long = "type")]
        entity_type: Option<String>,

        /// Replace the whole attribute with this type, e.g. Number
        #[arg(long)]
        attr_type: Option<String>,
    },

    /// List IoT Agent service groups
    Groups,

    /// List IoT Agent devices
    Devices,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();

    // Load config file
    let config = if let Some(config_path) = &cli.config {
        Config::load_from(config_path)?
    } else {
        Config::load().unwrap_or_default()
    };

    // Merge CLI args with config
    let merged = config.merge_with_args(&Args {
        cb_url: cli.cb_url.as_deref(),
        iota_url: cli.iota_url.as_deref(),
        service: cli.service.as_deref(),
        service_path: cli.service_path.as_deref(),
        output: cli.output.map(Into::into),
        no_color: cli.no_color,
    });

    // Create output context
    let format = OutputFormat::from_name(&merged.output).unwrap_or_default();
    let ctx = OutputContext::new(format, merged.no_color, cli.quiet);
    if OutputFormat::from_name(&merged.output).is_none() {
        ctx.warn(&format!("Unknown output format '{}', using table", merged.output));
    }

    let client = create_client(&merged)?;

    // Execute command
    match &cli.command {
        Commands::Version => commands::version(&client, &ctx).await?,

        Commands::Entities {
            entity_type,
            id_pattern,
            query,
            limit,
            key_values,
        } => {
            let filter = EntityFilter {
                entity_type: entity_type.clone(),
                id_pattern: id_pattern.clone(),
                query: query.clone(),
                limit: *limit,
            };
            commands::entities(&client, &filter, *key_values, &ctx).await?;
        }

        Commands::Entity { id, entity_type } => {
            commands::entity(&client, id, entity_type.as_deref(), &ctx).await?;
        }

        Commands::Attrs {
            id,
            entity_type,
            kind,
        } => {
            commands::attrs(&client, id, entity_type.as_deref(), *kind, &ctx).await?;
        }

        Commands::Delete { id, entity_type } => {
            commands::delete(&client, id, entity_type.as_deref(), &ctx).await?;
        }

        Commands::Update {
            id,
            attr,
            value,
            entity_type,
            attr_type,
        } => {
            commands::update(
                &client,
                id,
                attr,
                value,
                entity_type.as_deref(),
                attr_type.as_deref(),
                &ctx,
            )
            .await?;
        }

        Commands::Groups => commands::groups(&client, &ctx).await?,

        Commands::Devices => commands::devices(&client, &ctx).await?,
    }

    Ok(())
}

/// Create the client for the resolved services and tenant
fn create_client(merged: &MergedConfig) -> Result<HttpClient> {
    let header = FiwareHeader::new(merged.service.as_str(), merged.service_path.as_str())
        .context("Invalid tenant")?;
    HttpClient::new(merged.client.clone(), header).context("Failed to create NGSI client")
}

// Implement conversion for OutputFormat to string (for config merge)
impl From<OutputFormat> for &str {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Table => "table",
            OutputFormat::Json => "json",
            OutputFormat::Csv => "csv",
        }
    }
}
