//! Question endpoint

use axum::{extract::State, Json};

use crate::error::Result;
use crate::server::state::AppState;
use crate::types::{AskOutcome, AskRequest};

/// POST /api/ask - Answer a question from the knowledge base
pub async fn ask_question(
    State(state): State<AppState>,
    Json(request): Json<AskRequest>,
) -> Result<Json<AskOutcome>> {
    let outcome = state.session().ask(&request.question).await?;
    Ok(Json(outcome))
}
