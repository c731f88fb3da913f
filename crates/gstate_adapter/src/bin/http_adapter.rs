#![forbid(unsafe_code)]

use std::{net::SocketAddr, sync::Arc};

use gstate_adapter::{router, AdapterConfig};
use gstate_dispatch::{GlobalState, GlobalStateConfig};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let adapter_config = AdapterConfig::from_env();
    let addr: SocketAddr = adapter_config.bind.parse()?;
    let global_state = Arc::new(GlobalState::from_config(&GlobalStateConfig::from_env())?);
    let mode = global_state.mode();
    let app = router(global_state, &adapter_config);

    info!(
        %addr,
        mode,
        shared_secret_required = adapter_config.shared_secret.is_some(),
        max_request_body_bytes = adapter_config.max_request_body_bytes,
        "gstate_adapter_http listening"
    );
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("gstate_adapter_http stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
