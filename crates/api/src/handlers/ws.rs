//! Live execution progress websocket (spec §4.9): `GET /executions/ws`.
//!
//! One socket, many rooms — a client sends `execution:join`/`execution:leave`
//! to move between `ProgressBus` subscriptions, and receives forwarded
//! `ProgressEvent`s as JSON frames. On join, the current `step_logs` rows
//! are replayed first so a late subscriber isn't missing history.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::broadcast;
use uuid::Uuid;

use engine::ProgressEvent;

use crate::state::AppState;

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ClientMessage {
    #[serde(rename = "execution:join")]
    Join { execution_id: Uuid },
    #[serde(rename = "execution:leave")]
    Leave { execution_id: Uuid },
}

pub async fn upgrade(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

fn step_log_replay_event(row: db::models::StepLogRow) -> ProgressEvent {
    match row.status.as_str() {
        "running" => ProgressEvent::StepStart {
            execution_id: row.execution_id,
            node_id: row.node_id,
            node_name: row.node_name,
            status: "running",
        },
        _ => ProgressEvent::StepComplete {
            execution_id: row.execution_id,
            node_id: row.node_id,
            node_name: row.node_name,
            status: row.status,
            output: row.output,
            error: row.error,
            duration_ms: row.duration_ms,
            retry_attempts: row.retry_attempts,
        },
    }
}

async fn handle_socket(mut socket: WebSocket, state: AppState) {
    let mut subscription: Option<(Uuid, broadcast::Receiver<ProgressEvent>)> = None;

    loop {
        let next_event = async {
            match subscription.as_mut() {
                Some((_, rx)) => rx.recv().await.ok(),
                None => std::future::pending().await,
            }
        };

        tokio::select! {
            biased;

            incoming = socket.recv() => {
                let Some(Ok(message)) = incoming else { break };
                let Message::Text(text) = message else { continue };
                let Ok(client_message) = serde_json::from_str::<ClientMessage>(&text) else { continue };

                match client_message {
                    ClientMessage::Join { execution_id } => {
                        if let Ok(step_logs) = db::repository::step_logs::list_latest_step_logs(&state.pool, execution_id).await {
                            for row in step_logs {
                                let event = step_log_replay_event(row);
                                if send_event(&mut socket, &event).await.is_err() {
                                    return;
                                }
                            }
                        }
                        subscription = Some((execution_id, state.progress.join(execution_id)));
                    }
                    ClientMessage::Leave { execution_id } => {
                        if subscription.as_ref().is_some_and(|(id, _)| *id == execution_id) {
                            subscription = None;
                        }
                    }
                }
            }

            event = next_event => {
                let Some(event) = event else { continue };
                if send_event(&mut socket, &event).await.is_err() {
                    break;
                }
            }
        }
    }
}

async fn send_event(socket: &mut WebSocket, event: &ProgressEvent) -> Result<(), axum::Error> {
    let payload: Value = serde_json::to_value(event).unwrap_or(Value::Null);
    socket.send(Message::Text(payload.to_string())).await
}
