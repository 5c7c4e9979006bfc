//! Live push endpoints: WebSocket and server-sent events.
//!
//! Both attach a fresh receiver to the outbound mirror, so every publish on
//! any topic reaches every connected client. Clients that fall behind the
//! channel capacity skip the oldest envelopes and are told how many.

use std::convert::Infallible;
use std::time::Duration;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::{
        sse::{Event as SseEvent, KeepAlive, Sse},
        IntoResponse,
    },
};
use futures_util::stream::{self, Stream};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::broker::{Envelope, Topic};
use crate::event::Event;

use super::AppState;

// ----------------------------------------------------------------------------
// Limits
// ----------------------------------------------------------------------------

/// Inbound WebSocket frames larger than this are ignored.
const MAX_INBOUND_FRAME_BYTES: usize = 64 * 1024;

/// SSE keep-alive interval.
const KEEP_ALIVE: Duration = Duration::from_secs(15);

/// Frame pushed to WebSocket clients.
#[derive(Debug, Serialize)]
struct Frame<'a> {
    topic: &'a Topic,
    payload: &'a Event,
}

/// Commands a WebSocket client may send.
#[derive(Debug, Deserialize, PartialEq, Eq)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum InboundCommand {
    /// Run a what-if scenario.
    SimulateAnomaly {
        /// Scenario name.
        scenario: String,
    },
}

fn lag_notice(skipped: u64) -> String {
    serde_json::json!({
        "topic": "stream_lagged",
        "payload": { "skipped": skipped }
    })
    .to_string()
}

/// `GET /ws`
pub async fn ws_handler(State(state): State<AppState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(move |socket| ws_session(socket, state))
}

async fn ws_session(mut socket: WebSocket, state: AppState) {
    let conn = Uuid::new_v4();
    let mut rx = state.dashboard.listen();
    let mut closing = state.closing.subscribe();
    tracing::info!(%conn, "client connected");

    loop {
        tokio::select! {
            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => handle_inbound(&state, conn, &text),
                    Some(Ok(Message::Ping(payload))) => {
                        if socket.send(Message::Pong(payload)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                    _ => {}
                }
            }
            outgoing = rx.recv() => {
                let text = match outgoing {
                    Ok(envelope) => match serde_json::to_string(&Frame {
                        topic: &envelope.topic,
                        payload: &envelope.payload,
                    }) {
                        Ok(text) => text,
                        Err(err) => {
                            tracing::warn!(%conn, error = %err, "frame not serializable");
                            continue;
                        }
                    },
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(%conn, skipped, "client lagged");
                        lag_notice(skipped)
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                };
                if socket.send(Message::Text(text)).await.is_err() {
                    break;
                }
            }
            _ = closing.changed() => {
                let _ = socket.send(Message::Close(None)).await;
                break;
            }
        }
    }

    tracing::info!(%conn, "client disconnected");
}

fn handle_inbound(state: &AppState, conn: Uuid, text: &str) {
    if text.len() > MAX_INBOUND_FRAME_BYTES {
        tracing::warn!(%conn, bytes = text.len(), "inbound frame too large");
        return;
    }
    match serde_json::from_str::<InboundCommand>(text) {
        Ok(InboundCommand::SimulateAnomaly { scenario }) => {
            state.dashboard.simulate(&scenario);
        }
        Err(err) => tracing::debug!(%conn, error = %err, "ignoring inbound frame"),
    }
}

/// `GET /api/events`
pub async fn sse_handler(State(state): State<AppState>) -> Sse<impl Stream<Item = Result<SseEvent, Infallible>>> {
    let rx = state.dashboard.listen();
    let closing = state.closing.subscribe();

    let stream = stream::unfold((rx, closing), |(mut rx, mut closing)| async move {
        let next = tokio::select! {
            received = rx.recv() => received,
            _ = closing.changed() => return None,
        };
        let event = match next {
            Ok(envelope) => sse_event(&envelope),
            Err(broadcast::error::RecvError::Lagged(skipped)) => SseEvent::default().comment(format!("lagged {skipped}")),
            Err(broadcast::error::RecvError::Closed) => return None,
        };
        Some((Ok(event), (rx, closing)))
    });

    Sse::new(stream).keep_alive(KeepAlive::new().interval(KEEP_ALIVE).text("ping"))
}

fn sse_event(envelope: &Envelope) -> SseEvent {
    let data = serde_json::to_string(envelope).unwrap_or_default();
    SseEvent::default()
        .event(envelope.topic.as_str())
        .id(envelope.id.to_string())
        .data(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simulate_command() {
        let cmd: InboundCommand =
            serde_json::from_str(r#"{"event":"simulate_anomaly","data":{"scenario":"warehouse_fire"}}"#).unwrap();
        assert_eq!(
            cmd,
            InboundCommand::SimulateAnomaly {
                scenario: "warehouse_fire".to_string()
            }
        );
        assert!(serde_json::from_str::<InboundCommand>(r#"{"event":"reboot"}"#).is_err());
    }

    #[test]
    fn lag_notice_is_a_frame() {
        let v: serde_json::Value = serde_json::from_str(&lag_notice(3)).unwrap();
        assert_eq!(v["topic"], "stream_lagged");
        assert_eq!(v["payload"]["skipped"], 3);
    }
}
