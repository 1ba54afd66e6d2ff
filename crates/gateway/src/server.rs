// Gateway server
//
// One listener, one fallback handler: `/health` short-circuits, everything
// else resolves the compute ID from the Host header and forwards to the pod,
// over WebSocket when the request carries an upgrade handshake, plain HTTP
// otherwise.

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{DefaultBodyLimit, Request, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use podplane_core::{DirectoryError, GatewayConfig, PodDirectory};
use tower_http::trace::TraceLayer;

use crate::routing::compute_id_from_host;
use crate::{http_proxy, ws_proxy};

/// Shared state for the gateway listener
#[derive(Clone)]
pub struct GatewayState {
    pub config: Arc<GatewayConfig>,
    pub directory: Arc<dyn PodDirectory>,
    http: reqwest::Client,
}

impl GatewayState {
    pub fn new(config: GatewayConfig, directory: Arc<dyn PodDirectory>) -> Result<Self> {
        // Proxies pass redirects through to the client instead of following them
        let http = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .connect_timeout(std::time::Duration::from_secs(10))
            .build()
            .context("failed to build upstream HTTP client")?;
        Ok(Self {
            config: Arc::new(config),
            directory,
            http,
        })
    }
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "healthy"}))
}

/// Entry point for every non-health request.
async fn proxy_entry(
    State(state): State<GatewayState>,
    ws: Option<WebSocketUpgrade>,
    req: Request,
) -> Response {
    let host = req
        .headers()
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned)
        .or_else(|| req.uri().host().map(str::to_owned));

    let compute_id = host
        .as_deref()
        .and_then(|h| compute_id_from_host(h, &state.config.routing_domain));

    let Some(compute_id) = compute_id else {
        return (StatusCode::BAD_REQUEST, "Missing compute ID").into_response();
    };

    let pod = match state.directory.resolve(&compute_id).await {
        Ok(pod) => pod,
        Err(DirectoryError::NotFound(_)) => {
            return (StatusCode::NOT_FOUND, "Pod not found").into_response();
        }
        Err(DirectoryError::Orchestrator(err)) => {
            tracing::warn!(compute_id = %compute_id, error = %err, "pod resolution failed");
            return (StatusCode::BAD_GATEWAY, "Proxy error").into_response();
        }
    };

    if !pod.is_ready {
        return (StatusCode::SERVICE_UNAVAILABLE, "Pod not ready").into_response();
    }

    match ws {
        Some(upgrade) => {
            let path_and_query = req
                .uri()
                .path_and_query()
                .map(|pq| pq.as_str().to_owned())
                .unwrap_or_else(|| "/".to_owned());
            ws_proxy::proxy(upgrade, pod, path_and_query, state.config.clone())
        }
        None => http_proxy::forward(&state.http, &state.config, &pod, req).await,
    }
}

/// Build the gateway router.
pub fn router(state: GatewayState) -> Router {
    let body_limit = state.config.http_max_body_bytes;
    Router::new()
        .route("/health", get(health))
        .fallback(proxy_entry)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Run the gateway listener until a shutdown signal arrives, then drain
/// in-flight connections within the configured shutdown timeout.
pub async fn serve(state: GatewayState) -> Result<()> {
    let listen_addr = state.config.listen_addr.clone();
    let shutdown_timeout = state.config.shutdown_timeout;
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&listen_addr)
        .await
        .with_context(|| format!("failed to bind gateway listener on {listen_addr}"))?;
    tracing::info!("gateway listening on {}", listen_addr);

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(());
    tokio::spawn(async move {
        shutdown_signal().await;
        tracing::info!("shutdown signal received, draining gateway connections");
        let _ = shutdown_tx.send(());
    });

    let mut drain_rx = shutdown_rx.clone();
    let mut server_rx = shutdown_rx;
    let server = axum::serve(listener, app).with_graceful_shutdown(async move {
        let _ = server_rx.changed().await;
    });

    tokio::select! {
        result = server => result.context("gateway server error"),
        _ = async {
            let _ = drain_rx.changed().await;
            tokio::time::sleep(shutdown_timeout).await;
        } => {
            tracing::warn!("shutdown timeout elapsed, aborting remaining gateway connections");
            Ok(())
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
