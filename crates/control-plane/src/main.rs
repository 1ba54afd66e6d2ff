// Podplane control plane server
//
// Runs the lifecycle API and the gateway proxy in one process. Both share the
// same Pod Directory so pods created here are immediately routable through
// the gateway.

use anyhow::{Context, Result};
use axum::Router;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use podplane_control_plane::api;
use podplane_control_plane::{ComputeLifecycle, MemoryPodDirectory};
use podplane_core::telemetry::{init_telemetry, TelemetryConfig};
use podplane_core::{ComputeStatus, ComputeSummary, ControlPlaneConfig, GatewayConfig, StaticPresetManager};
use podplane_gateway::GatewayState;
use podplane_storage::StorageBackend;

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        api::computes::create_compute,
        api::computes::list_computes,
        api::computes::get_compute,
        api::computes::terminate_compute,
    ),
    components(
        schemas(
            ComputeSummary, ComputeStatus,
            api::computes::CreateComputeRequest,
            api::ErrorResponse,
            api::ListResponse<ComputeSummary>,
        )
    ),
    tags(
        (name = "computes", description = "Compute lifecycle endpoints")
    ),
    info(
        title = "Podplane API",
        version = "0.1.0",
        description = "API for provisioning and routing compute pods",
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    )
)]
struct ApiDoc;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let mut telemetry_config = TelemetryConfig::from_env();
    if telemetry_config.log_filter.is_none() {
        telemetry_config.log_filter = Some("podplane=debug,tower_http=debug".to_string());
    }
    init_telemetry(telemetry_config);

    tracing::info!("podplane control plane starting...");

    // Configuration is read from the environment exactly once, here
    let config = ControlPlaneConfig::from_env();
    let gateway_config = GatewayConfig::from_env();

    // Storage: Postgres when DATABASE_URL is set, in-memory dev mode otherwise
    let storage = match &config.database_url {
        Some(url) => {
            let backend = StorageBackend::postgres(url)
                .await
                .context("Failed to connect to database")?;
            tracing::info!("Connected to database");
            backend
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory storage (dev mode)");
            StorageBackend::in_memory()
        }
    };

    // Pod Directory: the in-memory adapter schedules pods instantly. A real
    // orchestrator adapter plugs in here without touching the service or the
    // gateway.
    let directory = Arc::new(MemoryPodDirectory::new());
    tracing::info!("Using in-memory pod directory (dev mode)");

    let presets = Arc::new(StaticPresetManager::default());

    let lifecycle = Arc::new(ComputeLifecycle::new(
        storage,
        directory.clone(),
        presets,
        gateway_config.routing_domain.clone(),
        config.default_preset_id.clone(),
    ));

    // Gateway listener shares the directory with the lifecycle service
    let gateway_state = GatewayState::new(gateway_config, directory)?;
    tokio::spawn(async move {
        if let Err(err) = podplane_gateway::serve(gateway_state).await {
            tracing::error!("gateway server error: {err}");
        }
    });

    // Lifecycle API
    let computes_state = api::computes::AppState::new(lifecycle);
    let app = Router::new()
        .route(
            "/health",
            axum::routing::get(|| async {
                axum::Json(serde_json::json!({"status": "healthy"}))
            }),
        )
        .merge(api::computes::routes(computes_state))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.listen_addr))?;
    tracing::info!("API server listening on {}", config.listen_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    Ok(())
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
