//! NGSI Client Library
//!
//! Typed HTTP clients for the FIWARE Context Broker (NGSI-v2) and the IoT
//! Agent provisioning API. Payloads are the validated models of `ngsi-core`.
//!
//! # Example
//!
//! ```rust,no_run
//! use ngsi_client::{EntityListParams, HttpClient, HttpClientConfig};
//! use ngsi_core::FiwareHeader;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let header = FiwareHeader::new("smartcity", "/testing")?;
//!     let client = HttpClient::new(HttpClientConfig::default(), header)?;
//!
//!     // Check both services
//!     let cb = client.cb().get_version().await?;
//!     let iota = client.iota().get_version().await?;
//!     println!("orion {} / iota {}", cb.orion.version, iota.lib_version);
//!
//!     // List rooms
//!     let rooms = client
//!         .cb()
//!         .get_entity_list(&EntityListParams::new().with_type("Room"))
//!         .await?;
//!     for room in rooms {
//!         println!("{}: {:?}", room.id(), room.get_attribute_names());
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! # Testing
//!
//! The `testing` module serves an axum router in place of the remote
//! services:
//!
//! ```rust,ignore
//! use ngsi_client::testing::TestServer;
//!
//! let server = TestServer::start(mock_router()).await?;
//! let entities = server.client.cb().get_entity_list(&Default::default()).await?;
//! ```

mod base;
mod cb;
mod config;
mod error;
mod iota;
mod multi;
pub mod testing;
mod types;

pub use base::SharedHeader;
pub use cb::ContextBrokerClient;
pub use config::{HttpClientConfig, DEFAULT_CB_URL, DEFAULT_IOTA_URL};
pub use error::{NgsiClientError, Result};
pub use iota::IoTAClient;
pub use multi::HttpClient;
pub use types::*;

// Re-export core types for convenience
pub use ngsi_core::{ContextEntity, FiwareHeader};
