// HTTP leg of the proxy
//
// Streams the inbound request to `http://{pod_ip}:{pod_port}` and mirrors the
// upstream status, headers, and body back verbatim. Any dial or stream
// failure answers 502 with a fixed body - never with internal addresses.

use axum::body::Body;
use axum::extract::Request;
use axum::http::{header, HeaderMap, HeaderName, StatusCode};
use axum::response::{IntoResponse, Response};
use podplane_core::{GatewayConfig, PodInfo};

/// Hop-by-hop headers, stripped in both directions (RFC 9110 §7.6.1).
const HOP_BY_HOP: [HeaderName; 8] = [
    header::CONNECTION,
    HeaderName::from_static("keep-alive"),
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

fn strip_hop_headers(headers: &mut HeaderMap) {
    // Connection's value nominates additional hop-by-hop headers by name
    let nominated: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();
    for name in nominated {
        headers.remove(&name);
    }
    for name in HOP_BY_HOP.iter() {
        headers.remove(name);
    }
}

/// Forward one request to the resolved pod.
pub async fn forward(
    client: &reqwest::Client,
    config: &GatewayConfig,
    pod: &PodInfo,
    req: Request,
) -> Response {
    let path_and_query = req
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    let url = format!("http://{}:{}{}", pod.ip, config.pod_port, path_and_query);

    let (parts, body) = req.into_parts();
    let mut headers = parts.headers;
    strip_hop_headers(&mut headers);
    // Upstream sees its own authority, not the public hostname
    headers.remove(header::HOST);

    let upstream = client
        .request(parts.method, &url)
        .headers(headers)
        .body(reqwest::Body::wrap_stream(body.into_data_stream()))
        .send()
        .await;

    let upstream = match upstream {
        Ok(resp) => resp,
        Err(err) => {
            tracing::warn!(
                compute_id = %pod.compute_id,
                pod_name = %pod.pod_name,
                error = %err,
                "upstream request failed"
            );
            return (StatusCode::BAD_GATEWAY, "Proxy error").into_response();
        }
    };

    let status = upstream.status();
    let mut headers = upstream.headers().clone();
    strip_hop_headers(&mut headers);

    let mut response = Response::new(Body::from_stream(upstream.bytes_stream()));
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    response
}
