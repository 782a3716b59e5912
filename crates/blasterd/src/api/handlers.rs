use std::future::Future;
use std::sync::Arc;
use std::time::UNIX_EPOCH;

use axum::body::Bytes;
use axum::extract::ws::Message;
use axum::extract::ws::WebSocket;
use axum::extract::ws::WebSocketUpgrade;
use axum::extract::Path;
use axum::extract::Query;
use axum::extract::State;
use axum::response::Response;
use blasterd_catalogue::EntityKind;
use serde::Deserialize;
use serde::Serialize;
use tokio::sync::broadcast::error::RecvError;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::warn;

use super::response::ApiError;
use super::response::ApiResponse;
use super::AppState;
use crate::engine::DeviceState;
use crate::engine::ExecError;
use crate::intents;
use crate::intents::Target;
use crate::intents::VoiceRequest;

type ApiResult = Result<ApiResponse, ApiError>;

/// Run an execution in the background, logging its failure.
fn spawn_execution<F>(what: String, execution: F)
where
    F: Future<Output = Result<(), ExecError>> + Send + 'static,
{
    tokio::spawn(async move {
        match execution.await {
            Ok(()) => debug!("{} finished", what),
            Err(e) => error!("{} failed: {}", what, e),
        }
    });
}

#[derive(Serialize)]
struct Uptime {
    /// Seconds since the server started
    uptime: u64,
    /// Start time as seconds since the Unix epoch
    started_on: u64,
    hostname: String,
    version: &'static str,
}

/// Handler for GET /uptime
#[tracing::instrument(skip(state))]
pub async fn uptime(State(state): State<Arc<AppState>>) -> ApiResult {
    let elapsed = state.started.elapsed().unwrap_or_default().as_secs();
    let started_on = state
        .started
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();

    let hostname = hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "unknown".to_string());

    let message = format!(
        "Uptime {} day(s), {} hour(s), {} minute(s), {} second(s)",
        elapsed / 86_400,
        elapsed % 86_400 / 3_600,
        elapsed % 3_600 / 60,
        elapsed % 60
    );

    ApiResponse::with_payload(
        message,
        &Uptime {
            uptime: elapsed,
            started_on,
            hostname,
            version: state.version,
        },
    )
}

/// Handler for /run/command/:command_id
#[tracing::instrument(skip(state))]
pub async fn run_command(
    State(state): State<Arc<AppState>>,
    Path(command_id): Path<String>,
) -> ApiResult {
    let command = state.engine.command(&command_id)?;

    let engine = state.engine.clone();
    spawn_execution(format!("Command {}", command_id), async move {
        engine.exec_command_full_cycle(&command).await
    });

    Ok(ApiResponse::success("command executed"))
}

/// Handler for /run/scenario/:scenario_id
#[tracing::instrument(skip(state))]
pub async fn run_scenario(
    State(state): State<Arc<AppState>>,
    Path(scenario_id): Path<String>,
) -> ApiResult {
    let scenario = state.engine.scenario(&scenario_id)?;

    let engine = state.engine.clone();
    spawn_execution(format!("Scenario {}", scenario_id), async move {
        engine.exec_scenario(&scenario).await
    });

    Ok(ApiResponse::success("scenario executed"))
}

#[derive(Debug, Deserialize)]
pub struct ControlQuery {
    state: Option<String>,
}

#[derive(Serialize)]
struct ControlResult {
    state: String,
}

/// Handler for /run/control/:control_id/:item_id
#[tracing::instrument(skip(state))]
pub async fn run_control(
    State(state): State<Arc<AppState>>,
    Path((control_id, item_id)): Path<(String, String)>,
    Query(query): Query<ControlQuery>,
) -> ApiResult {
    let entity = state
        .engine
        .resolve_control_entity(&control_id, &item_id, query.state.as_deref())?;
    let target_state = entity.state.clone();

    // A dangling target must fail the request, not the detached execution.
    match entity.kind {
        EntityKind::Command => {
            state.engine.command(&entity.target)?;
        }
        EntityKind::Scenario => {
            state.engine.scenario(&entity.target)?;
        }
    }

    let engine = state.engine.clone();
    spawn_execution(format!("Control {}/{}", control_id, item_id), async move {
        engine.exec_entity(&control_id, &item_id, &entity).await
    });

    ApiResponse::with_payload("control executed", &ControlResult { state: target_state })
}

/// Handler for POST /run/intent
#[tracing::instrument(skip(state, body))]
pub async fn run_intent(State(state): State<Arc<AppState>>, body: Bytes) -> ApiResult {
    let request: VoiceRequest = serde_json::from_slice(&body).map_err(|e| {
        warn!("Rejected intent body: {}", e);
        ApiError::BadRequest("Failed to accept POST body of voice intent".to_string())
    })?;

    let target = state
        .engine
        .store()
        .read(|c| intents::simplify(&request, c).and_then(|intent| intents::resolve(&intent, c)))
        .map_err(ExecError::from)??;
    info!("Intent {} resolved to {:?}", request.intent().name, target);

    let engine = state.engine.clone();
    match target {
        Target::Scenario(id) => spawn_execution(format!("Scenario {}", id), async move {
            engine.exec_scenario_id(&id).await
        }),
        Target::Command(id) => spawn_execution(format!("Command {}", id), async move {
            engine.exec_command(&id).await
        }),
    }

    Ok(ApiResponse::success("intent executed"))
}

/// Handler for GET /controls
#[tracing::instrument(skip(state))]
pub async fn controls(State(state): State<Arc<AppState>>) -> ApiResult {
    let controls = state
        .engine
        .store()
        .read(|c| c.controls.clone())
        .map_err(ExecError::from)?;

    ApiResponse::with_payload("controls", &controls)
}

/// Handler for GET /device/state
pub async fn device_state(State(state): State<Arc<AppState>>, ws: WebSocketUpgrade) -> Response {
    let states = state.engine.subscribe_device_states();
    ws.on_upgrade(move |socket| stream_device_states(socket, states))
}

async fn stream_device_states(
    mut socket: WebSocket,
    mut states: tokio::sync::broadcast::Receiver<DeviceState>,
) {
    debug!("Device state subscriber connected");

    loop {
        tokio::select! {
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    debug!("Device state socket error: {}", e);
                    break;
                }
            },
            state = states.recv() => match state {
                Ok(state) => {
                    let frame = match serde_json::to_string(&state) {
                        Ok(frame) => frame,
                        Err(e) => {
                            warn!("Failed to encode device state: {}", e);
                            continue;
                        }
                    };
                    if socket.send(Message::Text(frame)).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    debug!("Device state subscriber lagged, skipped {}", skipped);
                }
                Err(RecvError::Closed) => break,
            },
        }
    }

    debug!("Device state subscriber disconnected");
}

/// Fallback for unknown routes
pub async fn not_found() -> ApiError {
    ApiError::NotFound("Resource not found".to_string())
}
