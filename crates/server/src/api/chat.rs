use axum::Json;
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use harbor_intent::Intent;

use super::AppState;
use crate::chat::ChatRequest;
use crate::error::ServerError;

/// `POST /v1/chat/{action}` -- run a chat action and return its reply.
///
/// `action` is the action name or one of its aliases, e.g.
/// `ENCRYPT_AND_UPLOAD_FILE` or `upload-file`.
pub async fn chat(
    State(state): State<AppState>,
    Path(action): Path<String>,
    Json(request): Json<ChatRequest>,
) -> Result<impl IntoResponse, ServerError> {
    let intent: Intent = action.parse()?;
    let reply = state.chat.handle(intent, request).await?;
    Ok(Json(reply))
}
