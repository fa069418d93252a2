pub mod api;
pub mod config;
pub mod core_state;
pub mod db;
pub mod fhir;
pub mod import;
pub mod models;
pub mod triage;

use std::sync::Arc;

use thiserror::Error;
use tracing_subscriber::EnvFilter;

use crate::config::AppConfig;
use crate::core_state::CoreState;
use crate::fhir::{FhirHttpClient, SyncError};

/// Failures that stop the server before or while it runs.
#[derive(Error, Debug)]
pub enum StartupError {
    #[error("Record service client: {0}")]
    Client(#[from] SyncError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub fn run() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("Ward Triage starting v{}", config::APP_VERSION);

    if let Err(e) = serve(AppConfig::from_env()) {
        tracing::error!(error = %e, "server stopped");
        std::process::exit(1);
    }
}

/// Build the shared state and serve the API until the process is stopped.
///
/// The blocking HTTP client is created and dropped outside the async
/// runtime, which it requires.
pub fn serve(config: AppConfig) -> Result<(), StartupError> {
    let client = FhirHttpClient::new(&config.fhir_base, config.http_timeout)?;
    tracing::info!(
        fhir_base = client.base_url(),
        db = %config.db_path.display(),
        "configuration loaded"
    );

    let bind_addr = config.bind_addr.clone();
    let core = Arc::new(CoreState::new(config, Arc::new(client)));
    let app = api::api_router(Arc::clone(&core));

    let runtime = tokio::runtime::Runtime::new()?;
    let result: Result<(), std::io::Error> = runtime.block_on(async move {
        let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
        tracing::info!(addr = %bind_addr, "API listening");
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = tokio::signal::ctrl_c().await;
                tracing::info!("shutdown requested");
            })
            .await
    });
    drop(runtime);
    drop(core);
    Ok(result?)
}
