//! HTTP endpoints for submitting unseal keys and reading readiness

use std::net::SocketAddr;

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use unsealer_core::{ApiResponse, ShareSubmissionApi};

use crate::error::{DaemonError, Result};

/// Build the router serving `/add-key` and `/status`
pub fn router(api: ShareSubmissionApi) -> Router {
    Router::new()
        .route("/add-key", post(add_key))
        .route("/status", get(status))
        .with_state(api)
        .layer(TraceLayer::new_for_http())
}

/// Bind `listen_addr` and serve until the task is dropped
pub async fn serve(listen_addr: &str, api: ShareSubmissionApi) -> Result<()> {
    let addr: SocketAddr = listen_addr
        .parse()
        .map_err(|e| DaemonError::Config(format!("invalid listen address {}: {}", listen_addr, e)))?;

    if !addr.ip().is_loopback() {
        warn!(
            "Serving plain HTTP on non-loopback address {}; unseal keys travel unencrypted unless TLS is terminated in front",
            addr
        );
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Unsealer listening on {}", listener.local_addr()?);

    axum::serve(listener, router(api)).await?;
    Ok(())
}

fn into_http(response: ApiResponse) -> (StatusCode, String) {
    let status = if response.is_success() {
        StatusCode::OK
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    (status, response.message)
}

async fn add_key(State(api): State<ShareSubmissionApi>, body: Bytes) -> impl IntoResponse {
    into_http(api.add_share(&body).await)
}

async fn status(State(api): State<ShareSubmissionApi>) -> impl IntoResponse {
    into_http(api.status().await)
}
