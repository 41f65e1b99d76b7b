//! Test utilities for ngsi-client
//!
//! Runs an axum router standing in for the Context Broker and the IoT Agent
//! on a local port, with an [`HttpClient`] pointed at it.

use std::time::Duration;

use ngsi_core::FiwareHeader;
use tokio::net::TcpListener;

use crate::config::HttpClientConfig;
use crate::{HttpClient, Result};

/// Mock services on an ephemeral port, stopped on drop or [`shutdown`](Self::shutdown)
pub struct TestServer {
    pub client: HttpClient,
    shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
    handle: Option<tokio::task::JoinHandle<()>>,
}

impl TestServer {
    /// Serve `router` for both services under the default tenant
    ///
    /// # Example
    ///
    /// ```ignore
    /// use ngsi_client::testing::TestServer;
    ///
    /// let server = TestServer::start(mock_broker()).await?;
    /// let version = server.client.cb().get_version().await?;
    /// ```
    pub async fn start<S>(router: axum::Router<S>) -> Result<Self>
    where
        S: Clone + Send + Sync + 'static,
        axum::Router<S>: Into<axum::Router>,
    {
        Self::start_with_header(router, FiwareHeader::default()).await
    }

    /// Serve `router` with a client scoped to `header`
    pub async fn start_with_header<S>(router: axum::Router<S>, header: FiwareHeader) -> Result<Self>
    where
        S: Clone + Send + Sync + 'static,
        axum::Router<S>: Into<axum::Router>,
    {
        // Bind to any available port
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();

        let router: axum::Router = router.into();

        let handle = tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
                .ok();
        });

        // Give server a moment to start
        tokio::time::sleep(Duration::from_millis(10)).await;

        let base_url = format!("http://{}", addr);
        let config = HttpClientConfig {
            cb_url: base_url.clone(),
            iota_url: base_url,
            timeout_secs: 5,
            connect_timeout_secs: 2,
        };
        let client = HttpClient::new(config, header)?;

        Ok(Self {
            client,
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        })
    }

    /// Stop serving and wait for in-flight requests; the client stays usable
    pub async fn shutdown(mut self) -> HttpClient {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
        self.client.clone()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}
