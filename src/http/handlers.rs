use super::state::AppState;
use crate::ids::{ChannelId, GuildId};
use crate::session::{MemberEvent, SessionError, SessionStatus};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct SpawnSessionRequest {
    pub guild_id: GuildId,
    pub channel_id: ChannelId,
}

#[derive(Debug, Serialize)]
pub struct SpawnSessionResponse {
    pub session_id: String,
    pub channel_id: ChannelId,
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct MemberEventRequest {
    pub kind: MemberEvent,
}

#[derive(Debug, Serialize)]
pub struct MemberEventResponse {
    pub channel_id: ChannelId,
    pub delivered: bool,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error_response(status: StatusCode, error: String) -> axum::response::Response {
    (status, Json(ErrorResponse { error })).into_response()
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /sessions
/// Start recording a voice channel
pub async fn spawn_session(
    State(state): State<AppState>,
    Json(req): Json<SpawnSessionRequest>,
) -> impl IntoResponse {
    info!("Spawn requested for channel {} (guild {})", req.channel_id, req.guild_id);

    match state.registry.spawn(req.guild_id, req.channel_id).await {
        Ok(handle) => (
            StatusCode::ACCEPTED,
            Json(SpawnSessionResponse {
                session_id: handle.session_id.to_string(),
                channel_id: handle.channel_id,
                status: "starting".to_string(),
            }),
        )
            .into_response(),
        Err(e @ SessionError::AlreadyActive(_)) => {
            error_response(StatusCode::CONFLICT, e.to_string())
        }
        Err(e @ SessionError::ShuttingDown) => {
            error_response(StatusCode::SERVICE_UNAVAILABLE, e.to_string())
        }
        Err(e) => {
            warn!("Failed to spawn session: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

/// POST /sessions/:channel_id/events
/// Deliver a member join/leave; channels without a session ignore it
pub async fn send_event(
    State(state): State<AppState>,
    Path(channel_id): Path<u64>,
    Json(req): Json<MemberEventRequest>,
) -> impl IntoResponse {
    let channel_id = ChannelId(channel_id);
    let delivered = state.registry.send_event(channel_id, req.kind).await;

    (
        StatusCode::ACCEPTED,
        Json(MemberEventResponse {
            channel_id,
            delivered,
        }),
    )
}

/// POST /sessions/:channel_id/stop
/// Stop recording a channel
pub async fn stop_session(
    State(state): State<AppState>,
    Path(channel_id): Path<u64>,
) -> impl IntoResponse {
    let channel_id = ChannelId(channel_id);

    if state.registry.stop(channel_id).await {
        StatusCode::ACCEPTED.into_response()
    } else {
        error_response(
            StatusCode::NOT_FOUND,
            format!("No recording session for channel {}", channel_id),
        )
    }
}

/// GET /sessions
/// List active sessions
pub async fn list_sessions(State(state): State<AppState>) -> Json<Vec<SessionStatus>> {
    Json(state.registry.statuses().await)
}

/// GET /sessions/:channel_id
/// Get status of a recording session
pub async fn get_session(
    State(state): State<AppState>,
    Path(channel_id): Path<u64>,
) -> impl IntoResponse {
    let channel_id = ChannelId(channel_id);

    match state.registry.status(channel_id).await {
        Some(status) => (StatusCode::OK, Json(status)).into_response(),
        None => error_response(
            StatusCode::NOT_FOUND,
            format!("No recording session for channel {}", channel_id),
        ),
    }
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
