use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, instrument};

use super::{
    ConversationRequest, ConversationTurn, GenerativeModel, ModelReply, Role, StructuredRequest,
    ToolCall,
};
use crate::config::GeminiConfig;

#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<Tool>>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum Part {
    Text {
        text: String,
    },
    InlineData {
        inline_data: InlineData,
    },
    FunctionCall {
        #[serde(rename = "functionCall")]
        function_call: FunctionCall,
    },
    FunctionResponse {
        #[serde(rename = "functionResponse")]
        function_response: FunctionResponse,
    },
}

#[derive(Debug, Serialize, Deserialize)]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct FunctionCall {
    name: String,
    #[serde(default)]
    args: serde_json::Value,
}

#[derive(Debug, Serialize, Deserialize)]
struct FunctionResponse {
    name: String,
    response: serde_json::Value,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    response_mime_type: String,
    response_schema: serde_json::Value,
}

#[derive(Debug, Serialize)]
struct Tool {
    function_declarations: Vec<FunctionDeclaration>,
}

#[derive(Debug, Serialize)]
struct FunctionDeclaration {
    name: String,
    description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    parameters: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    candidates: Option<Vec<Candidate>>,
    error: Option<GeminiError>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    message: String,
}

/// Google Generative Language API client.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    api_key: String,
    base_url: String,
    model: String,
    chat_model: String,
    client: Client,
}

impl GeminiClient {
    pub fn new(config: &GeminiConfig) -> Self {
        Self {
            api_key: config.api_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            chat_model: config.chat_model.clone(),
            client: Client::new(),
        }
    }

    fn url(&self, model: &str) -> String {
        format!("{}/models/{}:generateContent", self.base_url, model)
    }

    async fn call(&self, model: &str, request: &GeminiRequest) -> anyhow::Result<Content> {
        let response = self
            .client
            .post(self.url(model))
            .header("x-goog-api-key", self.api_key.as_str())
            .json(request)
            .send()
            .await
            .map_err(reqwest::Error::without_url)
            .context("gemini request")?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(reqwest::Error::without_url)
            .context("read gemini response")?;
        if !status.is_success() {
            error!(%status, %model, "gemini api error");
            let message = serde_json::from_str::<GeminiResponse>(&body)
                .ok()
                .and_then(|r| r.error)
                .map_or(body, |e| e.message);
            anyhow::bail!("gemini returned {status}: {message}");
        }

        let parsed: GeminiResponse =
            serde_json::from_str(&body).context("parse gemini response")?;
        if let Some(err) = parsed.error {
            anyhow::bail!("gemini error: {}", err.message);
        }
        parsed
            .candidates
            .and_then(|c| c.into_iter().next())
            .and_then(|c| c.content)
            .filter(|c| !c.parts.is_empty())
            .context("gemini response has no content")
    }
}

fn role_name(role: Role) -> &'static str {
    match role {
        Role::User => "user",
        Role::Model => "model",
    }
}

fn to_content(turn: ConversationTurn) -> Content {
    match turn {
        ConversationTurn::Message(msg) => Content {
            role: Some(role_name(msg.role).into()),
            parts: vec![Part::Text { text: msg.text }],
        },
        ConversationTurn::ToolCall(call) => Content {
            role: Some("model".into()),
            parts: vec![Part::FunctionCall {
                function_call: FunctionCall {
                    name: call.name,
                    args: call.args,
                },
            }],
        },
        ConversationTurn::ToolResult { name, response } => Content {
            role: Some("user".into()),
            parts: vec![Part::FunctionResponse {
                function_response: FunctionResponse { name, response },
            }],
        },
    }
}

fn build_structured_request(request: StructuredRequest) -> GeminiRequest {
    let mut parts = vec![Part::Text {
        text: request.prompt,
    }];
    if let Some(image) = request.image {
        parts.push(Part::InlineData {
            inline_data: InlineData {
                data: image.to_base64(),
                mime_type: image.mime_type,
            },
        });
    }
    GeminiRequest {
        contents: vec![Content {
            role: Some("user".into()),
            parts,
        }],
        system_instruction: None,
        generation_config: Some(GenerationConfig {
            response_mime_type: "application/json".into(),
            response_schema: request.schema,
        }),
        tools: None,
    }
}

fn build_conversation_request(request: ConversationRequest) -> GeminiRequest {
    let tools = if request.tools.is_empty() {
        None
    } else {
        Some(vec![Tool {
            function_declarations: request
                .tools
                .into_iter()
                .map(|t| FunctionDeclaration {
                    name: t.name,
                    description: t.description,
                    parameters: t.parameters,
                })
                .collect(),
        }])
    };
    GeminiRequest {
        contents: request.turns.into_iter().map(to_content).collect(),
        system_instruction: Some(Content {
            role: None,
            parts: vec![Part::Text {
                text: request.system,
            }],
        }),
        generation_config: None,
        tools,
    }
}

/// Function calls win over text; multiple text parts are concatenated.
fn reply_from_content(content: Content) -> anyhow::Result<ModelReply> {
    let mut text = String::new();
    for part in content.parts {
        match part {
            Part::FunctionCall { function_call } => {
                return Ok(ModelReply::ToolCall(ToolCall {
                    name: function_call.name,
                    args: function_call.args,
                }))
            }
            Part::Text { text: t } => text.push_str(&t),
            Part::InlineData { .. } | Part::FunctionResponse { .. } => {}
        }
    }
    if text.trim().is_empty() {
        anyhow::bail!("gemini reply has no text");
    }
    Ok(ModelReply::Text(text))
}

#[async_trait]
impl GenerativeModel for GeminiClient {
    #[instrument(skip(self, request), fields(model = %self.model, has_image = request.image.is_some()))]
    async fn generate_structured(&self, request: StructuredRequest) -> anyhow::Result<String> {
        let body = build_structured_request(request);
        let content = self.call(&self.model, &body).await?;
        let text: String = content
            .parts
            .into_iter()
            .filter_map(|p| match p {
                Part::Text { text } => Some(text),
                _ => None,
            })
            .collect();
        debug!(len = text.len(), "structured response received");
        Ok(text)
    }

    #[instrument(skip(self, request), fields(model = %self.chat_model, turns = request.turns.len()))]
    async fn converse(&self, request: ConversationRequest) -> anyhow::Result<ModelReply> {
        let body = build_conversation_request(request);
        let content = self.call(&self.chat_model, &body).await?;
        reply_from_content(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::{ChatTurn, ToolDeclaration};
    use crate::nutrition::source::ImagePayload;
    use serde_json::json;

    #[test]
    fn structured_request_carries_image_and_schema() {
        let image = ImagePayload::from_data_uri(crate::testing::PNG_URI).unwrap();
        let body = build_structured_request(StructuredRequest {
            prompt: "describe".into(),
            image: Some(image),
            schema: json!({"type": "object"}),
        });
        let v = serde_json::to_value(&body).unwrap();
        assert_eq!(v["contents"][0]["parts"][0]["text"], "describe");
        assert_eq!(
            v["contents"][0]["parts"][1]["inline_data"]["mime_type"],
            "image/png"
        );
        assert_eq!(
            v["generation_config"]["response_mime_type"],
            "application/json"
        );
        assert!(v.get("tools").is_none());
        assert!(v.get("system_instruction").is_none());
    }

    #[test]
    fn conversation_request_maps_roles_and_tools() {
        let body = build_conversation_request(ConversationRequest {
            system: "be nice".into(),
            turns: vec![
                ConversationTurn::Message(ChatTurn::user("hi")),
                ConversationTurn::Message(ChatTurn::model("hello")),
                ConversationTurn::ToolCall(ToolCall {
                    name: "log".into(),
                    args: json!({}),
                }),
                ConversationTurn::ToolResult {
                    name: "log".into(),
                    response: json!({"entries": []}),
                },
            ],
            tools: vec![ToolDeclaration {
                name: "log".into(),
                description: "food log".into(),
                parameters: None,
            }],
        });
        let v = serde_json::to_value(&body).unwrap();
        assert_eq!(v["system_instruction"]["parts"][0]["text"], "be nice");
        assert_eq!(v["contents"][0]["role"], "user");
        assert_eq!(v["contents"][1]["role"], "model");
        assert_eq!(v["contents"][2]["parts"][0]["functionCall"]["name"], "log");
        assert_eq!(
            v["contents"][3]["parts"][0]["functionResponse"]["response"],
            json!({"entries": []})
        );
        assert_eq!(v["tools"][0]["function_declarations"][0]["name"], "log");
    }

    #[test]
    fn reply_prefers_function_call() {
        let content: Content = serde_json::from_value(json!({
            "role": "model",
            "parts": [
                {"text": "let me check"},
                {"functionCall": {"name": "log", "args": {"userId": "x"}}}
            ]
        }))
        .unwrap();
        let reply = reply_from_content(content).unwrap();
        assert_eq!(
            reply,
            ModelReply::ToolCall(ToolCall {
                name: "log".into(),
                args: json!({"userId": "x"})
            })
        );
    }

    #[test]
    fn reply_joins_text_parts() {
        let content: Content = serde_json::from_value(json!({
            "role": "model",
            "parts": [{"text": "Eat "}, {"text": "more greens."}]
        }))
        .unwrap();
        assert_eq!(
            reply_from_content(content).unwrap(),
            ModelReply::Text("Eat more greens.".into())
        );
    }

    #[test]
    fn empty_reply_is_error() {
        let content: Content =
            serde_json::from_value(json!({"role": "model", "parts": [{"text": "  "}]})).unwrap();
        assert!(reply_from_content(content).is_err());
    }

    #[tokio::test]
    async fn transport_errors_do_not_leak_the_api_key() {
        let client = GeminiClient::new(&GeminiConfig {
            api_key: "SUPERSECRETKEY".into(),
            base_url: "http://127.0.0.1:1".into(),
            model: "m".into(),
            chat_model: "m".into(),
        });
        assert!(!client.url("m").contains("SUPERSECRETKEY"));

        let err = client
            .generate_structured(StructuredRequest {
                prompt: "toast".into(),
                image: None,
                schema: json!({"type": "object"}),
            })
            .await
            .unwrap_err();
        let msg = format!("{err:#}");
        assert!(msg.starts_with("gemini request"), "{msg}");
        assert!(!msg.contains("SUPERSECRETKEY"), "{msg}");
    }
}
