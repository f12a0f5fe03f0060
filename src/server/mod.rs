//! Status endpoint server
//!
//! Serves the latest monitor snapshot as JSON on a single read-only route.
//! Reads never block on, nor are blocked by, a monitor cycle in progress.

use anyhow::Result;
use axum::{extract::State, response::Json, routing::get, Router};
use log::info;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::monitor::snapshot::{SnapshotStore, StatusSnapshot};

/// Status server configuration
#[derive(Debug, Clone)]
pub struct StatusServerConfig {
    pub host: String,
    pub port: u16,
    /// Route the snapshot is served on
    pub endpoint: String,
}

impl Default for StatusServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            endpoint: "/monitor".to_string(),
        }
    }
}

/// HTTP server exposing the snapshot store
pub struct StatusServer {
    config: StatusServerConfig,
    store: Arc<SnapshotStore>,
}

impl StatusServer {
    pub fn new(config: StatusServerConfig, store: Arc<SnapshotStore>) -> Self {
        Self { config, store }
    }

    /// Serve until the process shuts down
    pub async fn start(&self) -> Result<()> {
        let app = self.router();
        let addr: SocketAddr = format!("{}:{}", self.config.host, self.config.port).parse()?;

        info!(
            "Status endpoint listening on http://{}{}",
            addr, self.config.endpoint
        );

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app.into_make_service()).await?;

        Ok(())
    }

    fn router(&self) -> Router {
        Router::new()
            .route(&self.config.endpoint, get(serve_snapshot))
            .layer(CorsLayer::permissive())
            .with_state(self.store.clone())
    }
}

/// Latest fully published snapshot; the empty default before the first cycle
async fn serve_snapshot(State(store): State<Arc<SnapshotStore>>) -> Json<StatusSnapshot> {
    Json(store.read())
}
