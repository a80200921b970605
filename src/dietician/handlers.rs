use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use tracing::{info, instrument};

use super::{
    dto::{ChatRequest, ChatResponse},
    services::FoodLogTool,
};
use crate::{auth::extractors::AuthUser, state::AppState};

pub fn chat_router() -> Router<AppState> {
    Router::new().route("/dietician/chat", post(chat))
}

/// POST /dietician/chat { history: [{ role, text }], include_food_log? }
#[instrument(skip(state, body), fields(turns = body.history.len()))]
pub async fn chat(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(body): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, (StatusCode, String)> {
    let food_log = body
        .include_food_log
        .then(|| FoodLogTool::for_user(state.entries.clone(), user_id));
    let reply = state
        .dietician
        .reply(body.history, food_log.as_ref())
        .await?;
    info!(%user_id, "dietician replied");
    Ok(Json(ChatResponse { reply }))
}
