pub mod gemini;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::nutrition::source::ImagePayload;

pub use gemini::GeminiClient;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

/// One message of a chat conversation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatTurn {
    pub role: Role,
    pub text: String,
}

impl ChatTurn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            text: text.into(),
        }
    }
}

/// A single-shot call whose answer must be JSON matching `schema`.
#[derive(Debug, Clone)]
pub struct StructuredRequest {
    pub prompt: String,
    pub image: Option<ImagePayload>,
    pub schema: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ToolCall {
    pub name: String,
    pub args: serde_json::Value,
}

#[derive(Debug, Clone)]
pub struct ToolDeclaration {
    pub name: String,
    pub description: String,
    pub parameters: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConversationTurn {
    Message(ChatTurn),
    ToolCall(ToolCall),
    ToolResult {
        name: String,
        response: serde_json::Value,
    },
}

#[derive(Debug, Clone)]
pub struct ConversationRequest {
    pub system: String,
    pub turns: Vec<ConversationTurn>,
    pub tools: Vec<ToolDeclaration>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ModelReply {
    Text(String),
    ToolCall(ToolCall),
}

/// Outbound generative model. Implementations own transport only; prompt
/// wording and output validation live with the callers.
#[async_trait]
pub trait GenerativeModel: Send + Sync {
    /// Returns the raw JSON text produced by the model.
    async fn generate_structured(&self, request: StructuredRequest) -> anyhow::Result<String>;

    async fn converse(&self, request: ConversationRequest) -> anyhow::Result<ModelReply>;
}
