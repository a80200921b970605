use std::sync::Arc;

use axum::http::StatusCode;
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use time::{Duration, OffsetDateTime};
use tracing::{debug, error, instrument, warn};
use uuid::Uuid;

use crate::{
    ai::{
        ChatTurn, ConversationRequest, ConversationTurn, GenerativeModel, ModelReply, Role,
        ToolDeclaration,
    },
    entries::repo::EntryStore,
};

pub const FOOD_LOG_TOOL: &str = "getUsersFoodLogForLast10Days";
const FOOD_LOG_DAYS: i64 = 10;
const FOOD_LOG_LIMIT: i64 = 100;
const MAX_HISTORY_TURNS: usize = 40;
const MAX_TOOL_ROUNDS: usize = 3;

const SYSTEM_PROMPT: &str = r#"You are a friendly and knowledgeable AI Dietician for the NutriSnap app. Your goal is to provide helpful, safe, and personalized dietary advice.

- NEVER give medical advice. If the user asks for medical advice, gently decline and recommend they consult a doctor.
- When the user asks about their own diet or wants suggestions, use the getUsersFoodLogForLast10Days tool (if available) to look at what they have eaten recently.
- You can also answer general nutrition questions.
- Keep your responses concise and easy to understand.
- Always be encouraging and positive."#;

/// Food log row as handed to the model.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggedFood {
    pub name: String,
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fats: f64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Read access to the recent food log of exactly one user. The user is fixed
/// at construction; nothing the model sends can change it.
#[derive(Clone)]
pub struct FoodLogTool {
    store: Arc<dyn EntryStore>,
    user_id: Uuid,
}

impl FoodLogTool {
    pub fn for_user(store: Arc<dyn EntryStore>, user_id: Uuid) -> Self {
        Self { store, user_id }
    }

    fn declaration() -> ToolDeclaration {
        ToolDeclaration {
            name: FOOD_LOG_TOOL.into(),
            description: "Returns the current user's food log from the last 10 days, most recent first.".into(),
            parameters: None,
        }
    }

    /// Last 10 days, newest first, at most 100 rows. A store failure yields an
    /// empty log so the conversation can go on.
    pub async fn recent(&self, now: OffsetDateTime) -> Vec<LoggedFood> {
        let since = now - Duration::days(FOOD_LOG_DAYS);
        match self
            .store
            .list_range(self.user_id, since, None, FOOD_LOG_LIMIT)
            .await
        {
            Ok(rows) => rows
                .into_iter()
                .map(|e| LoggedFood {
                    name: e.name,
                    calories: e.calories,
                    protein: e.protein,
                    carbs: e.carbs,
                    fats: e.fats,
                    created_at: e.created_at,
                })
                .collect(),
            Err(e) => {
                warn!(error = %e, user_id = %self.user_id, "food log fetch failed");
                Vec::new()
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("invalid chat history: {0}")]
    InvalidHistory(&'static str),
    #[error("dietician model call failed: {0:#}")]
    Model(anyhow::Error),
    #[error("model kept requesting tools")]
    ToolLoop,
}

impl From<ChatError> for (StatusCode, String) {
    fn from(e: ChatError) -> Self {
        match e {
            ChatError::InvalidHistory(msg) => (StatusCode::BAD_REQUEST, msg.into()),
            ChatError::Model(_) | ChatError::ToolLoop => (
                StatusCode::BAD_GATEWAY,
                "Sorry, I'm having trouble responding right now. Please try again.".into(),
            ),
        }
    }
}

#[derive(Clone)]
pub struct DieticianChat {
    model: Arc<dyn GenerativeModel>,
}

impl DieticianChat {
    pub fn new(model: Arc<dyn GenerativeModel>) -> Self {
        Self { model }
    }

    /// Answers the last user turn. `food_log` is offered to the model as a tool when present.
    #[instrument(skip(self, history, food_log), fields(turns = history.len(), with_log = food_log.is_some()))]
    pub async fn reply(
        &self,
        history: Vec<ChatTurn>,
        food_log: Option<&FoodLogTool>,
    ) -> Result<String, ChatError> {
        let history = bounded_history(history)?;
        let tools = food_log
            .map(|_| vec![FoodLogTool::declaration()])
            .unwrap_or_default();
        let mut turns: Vec<ConversationTurn> =
            history.into_iter().map(ConversationTurn::Message).collect();

        for round in 0..=MAX_TOOL_ROUNDS {
            let reply = self
                .model
                .converse(ConversationRequest {
                    system: SYSTEM_PROMPT.into(),
                    turns: turns.clone(),
                    tools: tools.clone(),
                })
                .await
                .map_err(|e| {
                    error!(error = %e, round, "dietician model call failed");
                    ChatError::Model(e)
                })?;

            let call = match reply {
                ModelReply::Text(text) => return Ok(text),
                ModelReply::ToolCall(call) => call,
            };
            debug!(tool = %call.name, round, "model requested tool");
            let response = match food_log {
                Some(log) if call.name == FOOD_LOG_TOOL => {
                    json!({ "entries": log.recent(OffsetDateTime::now_utc()).await })
                }
                _ => json!({ "error": format!("unknown tool {}", call.name) }),
            };
            let name = call.name.clone();
            turns.push(ConversationTurn::ToolCall(call));
            turns.push(ConversationTurn::ToolResult { name, response });
        }

        warn!("dietician tool loop exhausted");
        Err(ChatError::ToolLoop)
    }
}

/// Keeps the most recent turns. The kept conversation opens and ends with a user message.
fn bounded_history(mut history: Vec<ChatTurn>) -> Result<Vec<ChatTurn>, ChatError> {
    if history.iter().any(|t| t.text.trim().is_empty()) {
        return Err(ChatError::InvalidHistory("Messages cannot be empty."));
    }
    match history.last() {
        None => return Err(ChatError::InvalidHistory("Please enter a message.")),
        Some(t) if t.role != Role::User => {
            return Err(ChatError::InvalidHistory(
                "The last message must come from the user.",
            ))
        }
        Some(_) => {}
    }
    if history.len() > MAX_HISTORY_TURNS {
        history.drain(..history.len() - MAX_HISTORY_TURNS);
    }
    // the last turn is a user turn, so this always stops inside the vec
    let first_user = history
        .iter()
        .position(|t| t.role == Role::User)
        .unwrap_or(0);
    history.drain(..first_user);
    Ok(history)
}
