use std::str::FromStr;

use anyhow::Context;
use serde::Deserialize;

use crate::entries::services::IngestStrategy;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeminiConfig {
    pub api_key: String,
    pub base_url: String,
    /// Used for extraction and recognition.
    pub model: String,
    pub chat_model: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub gemini: GeminiConfig,
    pub ingest_strategy: IngestStrategy,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET").context("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "nutrisnap".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "nutrisnap-users".into()),
        };
        let gemini = GeminiConfig {
            api_key: std::env::var("GEMINI_API_KEY").context("GEMINI_API_KEY")?,
            base_url: std::env::var("GEMINI_BASE_URL").unwrap_or_else(|_| {
                "https://generativelanguage.googleapis.com/v1beta".into()
            }),
            model: std::env::var("GEMINI_MODEL").unwrap_or_else(|_| "gemini-2.5-flash".into()),
            chat_model: std::env::var("GEMINI_CHAT_MODEL")
                .unwrap_or_else(|_| "gemini-2.5-pro".into()),
        };
        let ingest_strategy = match std::env::var("INGEST_STRATEGY") {
            Ok(v) => IngestStrategy::from_str(&v)?,
            Err(_) => IngestStrategy::Direct,
        };
        Ok(Self {
            database_url,
            jwt,
            gemini,
            ingest_strategy,
        })
    }
}
