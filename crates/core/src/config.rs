// Runtime configuration
//
// Config structs are built once in main (from_env) and injected into each
// component constructor. No component reads the process environment directly.

use std::time::Duration;

/// Gateway (proxy data plane) configuration
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Address the gateway listener binds to
    pub listen_addr: String,
    /// Domain suffix tenants are routed under, e.g. "preview.example.com".
    /// Requests arrive at `{compute_id}.{routing_domain}`.
    pub routing_domain: String,
    /// Port backend pods serve traffic on
    pub pod_port: u16,
    /// Maximum buffered request body for the HTTP proxy, in bytes
    pub http_max_body_bytes: usize,
    /// Maximum WebSocket message size, in bytes (bounds per-connection memory)
    pub ws_buffer_bytes: usize,
    /// Upper bound on the upstream WebSocket handshake
    pub ws_handshake_timeout: Duration,
    /// How long in-flight requests may drain after a shutdown signal
    pub shutdown_timeout: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".to_string(),
            routing_domain: "preview.localhost".to_string(),
            pod_port: 8080,
            http_max_body_bytes: 16 * 1024 * 1024,
            ws_buffer_bytes: 1024 * 1024,
            ws_handshake_timeout: Duration::from_secs(10),
            shutdown_timeout: Duration::from_secs(30),
        }
    }
}

impl GatewayConfig {
    /// Build from environment variables.
    ///
    /// - `GATEWAY_LISTEN_ADDR` (default "0.0.0.0:8080")
    /// - `GATEWAY_ROUTING_DOMAIN` (default "preview.localhost")
    /// - `GATEWAY_POD_PORT` (default 8080)
    /// - `GATEWAY_HTTP_MAX_BODY_BYTES` (default 16 MiB)
    /// - `GATEWAY_WS_BUFFER_BYTES` (default 1 MiB)
    /// - `GATEWAY_WS_HANDSHAKE_TIMEOUT_SECS` (default 10)
    /// - `GATEWAY_SHUTDOWN_TIMEOUT_SECS` (default 30)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            listen_addr: env_or("GATEWAY_LISTEN_ADDR", defaults.listen_addr),
            routing_domain: env_or("GATEWAY_ROUTING_DOMAIN", defaults.routing_domain),
            pod_port: env_parsed("GATEWAY_POD_PORT", defaults.pod_port),
            http_max_body_bytes: env_parsed(
                "GATEWAY_HTTP_MAX_BODY_BYTES",
                defaults.http_max_body_bytes,
            ),
            ws_buffer_bytes: env_parsed("GATEWAY_WS_BUFFER_BYTES", defaults.ws_buffer_bytes),
            ws_handshake_timeout: Duration::from_secs(env_parsed(
                "GATEWAY_WS_HANDSHAKE_TIMEOUT_SECS",
                defaults.ws_handshake_timeout.as_secs(),
            )),
            shutdown_timeout: Duration::from_secs(env_parsed(
                "GATEWAY_SHUTDOWN_TIMEOUT_SECS",
                defaults.shutdown_timeout.as_secs(),
            )),
        }
    }
}

/// Control plane (lifecycle API) configuration
#[derive(Debug, Clone)]
pub struct ControlPlaneConfig {
    /// Address the API listener binds to
    pub listen_addr: String,
    /// Postgres connection string; None selects the in-memory dev backend
    pub database_url: Option<String>,
    /// Preset used when a create command names none
    pub default_preset_id: String,
}

impl Default for ControlPlaneConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:9000".to_string(),
            database_url: None,
            default_preset_id: crate::preset::DEFAULT_PRESET_ID.to_string(),
        }
    }
}

impl ControlPlaneConfig {
    /// Build from environment variables.
    ///
    /// - `CONTROL_PLANE_LISTEN_ADDR` (default "0.0.0.0:9000")
    /// - `DATABASE_URL` (unset selects the in-memory dev backend)
    /// - `DEFAULT_PRESET_ID` (default "base")
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            listen_addr: env_or("CONTROL_PLANE_LISTEN_ADDR", defaults.listen_addr),
            database_url: std::env::var("DATABASE_URL").ok().filter(|s| !s.is_empty()),
            default_preset_id: env_or("DEFAULT_PRESET_ID", defaults.default_preset_id),
        }
    }
}

fn env_or(key: &str, default: String) -> String {
    std::env::var(key).ok().filter(|s| !s.is_empty()).unwrap_or(default)
}

fn env_parsed<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
