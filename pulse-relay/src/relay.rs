use crate::{hub::Hub, AppState};
use axum::{
    extract::{
        ws::{Message as WsMessage, WebSocket},
        State, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use futures::{stream::StreamExt, SinkExt};
use log::{debug, error, info};
use pulse_common::WireMessage;

pub async fn relay_ws(State(state): State<AppState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    let hub = state.hub.clone();
    ws.on_upgrade(move |socket| handle_ws(hub, socket))
}

async fn handle_ws(hub: Hub, socket: WebSocket) {
    let mut member = match hub.join() {
        Ok(m) => m,
        Err(e) => {
            error!("Failed to join relay hub: {e:?}");
            return;
        }
    };
    let id = member.id;
    info!("Relay WS connected: {id}");

    let (mut ws_tx, mut ws_rx) = socket.split();

    tokio::select! {
        // Hub → Browser
        _ = async {
            while let Some(frame) = member.rx.recv().await {
                if ws_tx.send(WsMessage::Text(frame)).await.is_err() {
                    break;
                }
            }
        } => {},
        // Browser → Hub
        _ = async {
            while let Some(Ok(msg)) = ws_rx.next().await {
                match msg {
                    WsMessage::Text(text) => match WireMessage::decode(text.as_str()) {
                        Ok(WireMessage::Pulse(event)) => {
                            if let Err(e) = hub.publish(event) {
                                error!("Publish failed: {e:?}");
                                break;
                            }
                        }
                        Err(e) => debug!("Dropping malformed frame from {id}: {e}"),
                    },
                    WsMessage::Close(_) => break,
                    _ => {}
                }
            }
        } => {},
    }

    info!("Relay WS disconnected: {id}");
    drop(member);
}
