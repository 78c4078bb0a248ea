//! Knowledge base status and reset

use axum::{extract::State, Json};

use crate::server::state::AppState;
use crate::types::SessionStatus;

/// GET /api/status
pub async fn session_status(State(state): State<AppState>) -> Json<SessionStatus> {
    Json(state.session().status())
}

/// DELETE /api/knowledge - Back to an empty knowledge base
pub async fn reset_knowledge(State(state): State<AppState>) -> Json<SessionStatus> {
    state.session().reset().await;
    Json(state.session().status())
}
