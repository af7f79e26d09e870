//! Lineage Service
//!
//! The HTTP shell around the recording engine: parameter extraction,
//! configuration loading, and process wiring. All decision logic lives in
//! lineage-engine; this crate only adapts it to the network.

#![warn(missing_docs)]

pub mod config;
pub mod handlers;

use config::ServiceConfig;
use handlers::{create_router, AppState};
use lineage_engine::{FailureQueue, Recorder};
use lineage_store::SqliteStore;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tracing::info;

/// Service error
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// Store initialization error
    #[error("Store error: {0}")]
    Store(String),

    /// Server binding error
    #[error("Failed to bind server: {0}")]
    Bind(#[from] std::io::Error),

    /// Server error
    #[error("Server error: {0}")]
    Server(String),
}

/// Start the provenance HTTP service
///
/// Opens the store, wires the recorder and its failure queue, and starts
/// the axum server with per-connection source addresses.
pub async fn start_server(config: ServiceConfig) -> Result<(), ServiceError> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    info!("Starting Lineage provenance service");
    info!("Bind address: {}", config.bind_addr());
    info!("Database: {}", config.database_path);
    info!("Failure queue: {}", config.failure_log_path);

    let store =
        SqliteStore::new(&config.database_path).map_err(|e| ServiceError::Store(e.to_string()))?;
    let recorder = Recorder::new(FailureQueue::new(&config.failure_log_path));

    let state = AppState {
        store: Arc::new(Mutex::new(store)),
        recorder: Arc::new(recorder),
    };

    let app = create_router(state);

    let listener = TcpListener::bind(&config.bind_addr()).await?;
    info!("Provenance service listening on {}", config.bind_addr());

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .map_err(|e| ServiceError::Server(e.to_string()))?;

    Ok(())
}
