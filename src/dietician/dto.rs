use serde::{Deserialize, Serialize};

use crate::ai::ChatTurn;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub history: Vec<ChatTurn>,
    #[serde(default = "default_include_food_log")]
    pub include_food_log: bool,
}
fn default_include_food_log() -> bool {
    true
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub reply: String,
}
