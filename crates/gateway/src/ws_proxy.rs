// WebSocket leg of the proxy
//
// After the client handshake completes, dial an upstream socket within the
// configured handshake timeout and run two pump tasks. Either side closing or
// erroring aborts the other pump, which drops both sockets - no leaked tasks.

use std::borrow::Cow;
use std::sync::Arc;

use axum::extract::ws::{self, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use podplane_core::{GatewayConfig, PodInfo};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::protocol::WebSocketConfig;
use tokio_tungstenite::{connect_async_with_config, tungstenite, MaybeTlsStream, WebSocketStream};

type Upstream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Finish the client handshake and hand the session to [`session`].
pub fn proxy(
    ws: WebSocketUpgrade,
    pod: PodInfo,
    path_and_query: String,
    config: Arc<GatewayConfig>,
) -> Response {
    ws.max_message_size(config.ws_buffer_bytes)
        .on_upgrade(move |client| session(client, pod, path_and_query, config))
}

async fn session(mut client: WebSocket, pod: PodInfo, path_and_query: String, config: Arc<GatewayConfig>) {
    let url = format!("ws://{}:{}{}", pod.ip, config.pod_port, path_and_query);
    let mut ws_config = WebSocketConfig::default();
    ws_config.max_message_size = Some(config.ws_buffer_bytes);

    let dial = tokio::time::timeout(
        config.ws_handshake_timeout,
        connect_async_with_config(url.as_str(), Some(ws_config), false),
    )
    .await;

    let upstream: Upstream = match dial {
        Ok(Ok((stream, _response))) => stream,
        Ok(Err(err)) => {
            tracing::warn!(compute_id = %pod.compute_id, error = %err, "upstream websocket handshake failed");
            close_with_error(&mut client).await;
            return;
        }
        Err(_) => {
            tracing::warn!(compute_id = %pod.compute_id, "upstream websocket handshake timed out");
            close_with_error(&mut client).await;
            return;
        }
    };

    tracing::debug!(compute_id = %pod.compute_id, pod_name = %pod.pod_name, "websocket session established");

    let (up_tx, up_rx) = upstream.split();
    let (client_tx, client_rx) = client.split();

    let mut inbound = tokio::spawn(pump_client_to_upstream(client_rx, up_tx));
    let mut outbound = tokio::spawn(pump_upstream_to_client(up_rx, client_tx));

    // Whichever pump ends first tears down the other; aborting drops the
    // socket halves, which closes the peer.
    tokio::select! {
        _ = &mut inbound => outbound.abort(),
        _ = &mut outbound => inbound.abort(),
    }

    tracing::debug!(compute_id = %pod.compute_id, "websocket session closed");
}

async fn close_with_error(client: &mut WebSocket) {
    let _ = client
        .send(ws::Message::Close(Some(ws::CloseFrame {
            code: 1011,
            reason: Cow::Borrowed("upstream unavailable"),
        })))
        .await;
}

async fn pump_client_to_upstream(
    mut rx: SplitStream<WebSocket>,
    mut tx: SplitSink<Upstream, tungstenite::Message>,
) {
    while let Some(msg) = rx.next().await {
        let msg = match msg {
            Ok(msg) => msg,
            Err(_) => break,
        };
        let closing = matches!(msg, ws::Message::Close(_));
        if tx.send(to_upstream(msg)).await.is_err() {
            break;
        }
        if closing {
            break;
        }
    }
}

async fn pump_upstream_to_client(
    mut rx: SplitStream<Upstream>,
    mut tx: SplitSink<WebSocket, ws::Message>,
) {
    while let Some(msg) = rx.next().await {
        let msg = match msg {
            Ok(msg) => msg,
            Err(_) => break,
        };
        let closing = matches!(msg, tungstenite::Message::Close(_));
        let Some(msg) = to_client(msg) else { continue };
        if tx.send(msg).await.is_err() {
            break;
        }
        if closing {
            break;
        }
    }
}

fn to_upstream(msg: ws::Message) -> tungstenite::Message {
    match msg {
        ws::Message::Text(text) => tungstenite::Message::Text(text),
        ws::Message::Binary(data) => tungstenite::Message::Binary(data),
        ws::Message::Ping(data) => tungstenite::Message::Ping(data),
        ws::Message::Pong(data) => tungstenite::Message::Pong(data),
        ws::Message::Close(frame) => {
            tungstenite::Message::Close(frame.map(|f| tungstenite::protocol::CloseFrame {
                code: f.code.into(),
                reason: f.reason,
            }))
        }
    }
}

fn to_client(msg: tungstenite::Message) -> Option<ws::Message> {
    match msg {
        tungstenite::Message::Text(text) => Some(ws::Message::Text(text)),
        tungstenite::Message::Binary(data) => Some(ws::Message::Binary(data)),
        tungstenite::Message::Ping(data) => Some(ws::Message::Ping(data)),
        tungstenite::Message::Pong(data) => Some(ws::Message::Pong(data)),
        tungstenite::Message::Close(frame) => Some(ws::Message::Close(frame.map(|f| {
            ws::CloseFrame {
                code: f.code.into(),
                reason: f.reason,
            }
        }))),
        // Raw frames only appear with manual frame writing; nothing to forward
        tungstenite::Message::Frame(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn close_frames_round_trip() {
        let frame = tungstenite::Message::Close(Some(tungstenite::protocol::CloseFrame {
            code: tungstenite::protocol::frame::coding::CloseCode::Normal,
            reason: Cow::Borrowed("bye"),
        }));
        let client_msg = to_client(frame).unwrap();
        match &client_msg {
            ws::Message::Close(Some(f)) => {
                assert_eq!(f.code, 1000);
                assert_eq!(f.reason, "bye");
            }
            other => panic!("unexpected message: {other:?}"),
        }

        match to_upstream(client_msg) {
            tungstenite::Message::Close(Some(f)) => {
                assert_eq!(u16::from(f.code), 1000);
                assert_eq!(f.reason, "bye");
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn raw_frames_are_dropped() {
        // to_client never forwards tungstenite's raw Frame variant
        let text = tungstenite::Message::Text("hello".to_string());
        assert!(to_client(text).is_some());
    }
}
