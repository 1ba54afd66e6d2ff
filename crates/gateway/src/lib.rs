// Podplane gateway
//
// Single-listener reverse proxy in front of the compute pods. Requests arrive
// at {compute_id}.{routing_domain}; the gateway resolves the pod through the
// Pod Directory and forwards plain HTTP or a full WebSocket session.

pub mod http_proxy;
pub mod routing;
pub mod server;
pub mod ws_proxy;

pub use server::{router, serve, GatewayState};
