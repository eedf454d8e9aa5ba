//! WebSocket handler: start handshake, then the bus as a live stream.
//!
//! Protocol:
//!   1. Client sends:  `{ "type": "start", "name": "Caddie" }`
//!   2. Server sends:  `{ "type": "init", "source_id": "ws.1a2b3c4d", "round": { ... } }`
//!   3. Server streams every `FairwayMessage`; the client may send commands:
//!      `{ "cmd": "location", "latitude": 55.02, "longitude": -7.24, "accuracy_meters": 4 }`
//!      `{ "cmd": "skill", "tier": "beginner", "category": "chip" }`
//!      `{ "cmd": "activate" }`, `{ "cmd": "cancel" }`

use std::sync::Arc;
use std::sync::atomic::Ordering;

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::broadcast;

use super::routes::stamp;
use super::{WebState, emit_telemetry};
use crate::state::config;
use fairway::{
    Coordinate, FairwayEvent, FairwayMessage, LocationFix, PlacementAction, SkillRequest,
};

/// GET /api/ws
pub async fn ws_upgrade(
    State(state): State<Arc<WebState>>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_ws(socket, state))
}

async fn handle_ws(socket: WebSocket, state: Arc<WebState>) {
    let (mut ws_tx, mut ws_rx) = socket.split();

    let client_name = loop {
        match ws_rx.next().await {
            Some(Ok(Message::Text(text))) => {
                if let Some(name) = parse_start_message(&text) {
                    break name;
                }
            }
            Some(Ok(Message::Close(_))) | None => return,
            _ => continue,
        }
    };

    let source_id = format!("ws.{}", config::generate_id());
    state.ws_count.fetch_add(1, Ordering::Relaxed);
    emit_telemetry(&state);
    tracing::info!("ws: client '{client_name}' connected (source_id={source_id})");

    let init_msg = serde_json::json!({
        "type": "init",
        "source_id": source_id,
        "round": state.root.round.snapshot(),
    });
    if ws_tx
        .send(Message::text(init_msg.to_string()))
        .await
        .is_err()
    {
        state.ws_count.fetch_sub(1, Ordering::Relaxed);
        return;
    }

    let mut bus_rx = state.bus_tx.subscribe();
    let mut send_task = tokio::spawn(async move {
        loop {
            match bus_rx.recv().await {
                Ok(msg) => {
                    if let Ok(json) = serde_json::to_string(&msg)
                        && ws_tx.send(Message::text(json)).await.is_err()
                    {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Closed) => break,
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!("ws: lagged {n}");
                }
            }
        }
    });

    let ws_source = source_id.clone();
    let bus_tx = state.bus_tx.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = ws_rx.next().await {
            match msg {
                Message::Text(text) => match parse_command(&text) {
                    Some(event) => {
                        let _ = bus_tx.send(FairwayMessage::new(event).source(&ws_source));
                    }
                    None => tracing::debug!("ws: ignoring '{text}'"),
                },
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    state.ws_count.fetch_sub(1, Ordering::Relaxed);
    emit_telemetry(&state);
    tracing::info!("ws: client '{client_name}' disconnected (source_id={source_id})");
}

/// Client name from a `start` message, `None` for anything else.
fn parse_start_message(text: &str) -> Option<String> {
    #[derive(Deserialize)]
    struct StartMsg {
        #[serde(rename = "type")]
        msg_type: String,
        #[serde(default)]
        name: String,
    }
    let msg: StartMsg = serde_json::from_str(text).ok()?;
    if msg.msg_type != "start" {
        return None;
    }
    Some(if msg.name.is_empty() {
        "anonymous".to_string()
    } else {
        msg.name
    })
}

#[derive(Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
enum WsCommand {
    Location {
        latitude: f64,
        longitude: f64,
        #[serde(default)]
        accuracy_meters: Option<f64>,
    },
    Skill(SkillRequest),
    Activate,
    Cancel,
}

/// Turn a client command into the bus event it stands for. Malformed
/// commands, invalid coordinates, and unknown tiers yield `None`.
fn parse_command(text: &str) -> Option<FairwayEvent> {
    let cmd: WsCommand = serde_json::from_str(text).ok()?;
    Some(match cmd {
        WsCommand::Location {
            latitude,
            longitude,
            accuracy_meters,
        } => {
            let position = Coordinate::fix(latitude, longitude, accuracy_meters, 0).ok()?;
            LocationFix {
                position: stamp(position),
            }
            .into()
        }
        WsCommand::Skill(request) => {
            let (tier, category) = request.parse().ok()?;
            PlacementAction::UpdateSkillContext { tier, category }.into()
        }
        WsCommand::Activate => PlacementAction::Activate.into(),
        WsCommand::Cancel => PlacementAction::Cancel.into(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use fairway::{ShotCategory, SkillTier};

    #[test]
    fn start_handshake() {
        assert_eq!(
            parse_start_message(r#"{"type":"start","name":"Caddie"}"#).as_deref(),
            Some("Caddie")
        );
        assert_eq!(
            parse_start_message(r#"{"type":"start"}"#).as_deref(),
            Some("anonymous")
        );
        assert!(parse_start_message(r#"{"type":"hello"}"#).is_none());
        assert!(parse_start_message("garbage").is_none());
    }

    #[test]
    fn location_command() {
        let event =
            parse_command(r#"{"cmd":"location","latitude":55.02,"longitude":-7.24,"accuracy_meters":4}"#)
                .unwrap();
        let FairwayEvent::Location(fix) = event else {
            panic!("expected a location event");
        };
        assert_eq!(fix.position.latitude(), 55.02);
        assert_eq!(fix.position.accuracy_meters(), Some(4.0));
        assert!(fix.position.captured_at_millis() > 0);

        assert!(parse_command(r#"{"cmd":"location","latitude":120,"longitude":0}"#).is_none());
    }

    #[test]
    fn skill_command() {
        let event = parse_command(r#"{"cmd":"skill","tier":"beginner","category":"chip"}"#).unwrap();
        let FairwayEvent::PlacementCommand(cmd) = event else {
            panic!("expected a placement command");
        };
        assert!(cmd.request_id.is_none());
        assert!(matches!(
            cmd.action,
            PlacementAction::UpdateSkillContext {
                tier: SkillTier::Beginner,
                category: ShotCategory::Chip
            }
        ));

        assert!(parse_command(r#"{"cmd":"skill","tier":"legend"}"#).is_none());
        assert!(parse_command(r#"{"cmd":"mode"}"#).is_none());
    }
}
