//! Fakes shared by unit tests.

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::ai::{ConversationRequest, GenerativeModel, ModelReply, StructuredRequest};
use crate::auth::claims::{Claims, TokenKind};
use crate::config::JwtConfig;
use crate::entries::{repo::EntryStore, repo_types::FoodEntry};

// 1x1 PNG
pub const PNG_URI: &str = "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAQAAAC1HAwCAAAAC0lEQVR42mNkYAAAAAYAAjCB0C8AAAAASUVORK5CYII=";

type StructuredFn = Box<dyn Fn(&StructuredRequest) -> anyhow::Result<String> + Send + Sync>;

/// Model whose answers are scripted by the test and whose requests are recorded.
pub struct ScriptedModel {
    structured: StructuredFn,
    replies: Mutex<VecDeque<anyhow::Result<ModelReply>>>,
    structured_calls: Mutex<Vec<StructuredRequest>>,
    conversations: Mutex<Vec<ConversationRequest>>,
}

impl ScriptedModel {
    pub fn extracting<F>(f: F) -> Self
    where
        F: Fn(&StructuredRequest) -> anyhow::Result<String> + Send + Sync + 'static,
    {
        Self {
            structured: Box::new(f),
            replies: Mutex::default(),
            structured_calls: Mutex::default(),
            conversations: Mutex::default(),
        }
    }

    pub fn conversing(replies: Vec<anyhow::Result<ModelReply>>) -> Self {
        let model = Self::extracting(|_| anyhow::bail!("no structured script"));
        *model.replies.lock().unwrap() = replies.into();
        model
    }

    pub fn structured_calls(&self) -> Vec<StructuredRequest> {
        self.structured_calls.lock().unwrap().clone()
    }

    pub fn conversations(&self) -> Vec<ConversationRequest> {
        self.conversations.lock().unwrap().clone()
    }
}

#[async_trait]
impl GenerativeModel for ScriptedModel {
    async fn generate_structured(&self, request: StructuredRequest) -> anyhow::Result<String> {
        let out = (self.structured)(&request);
        self.structured_calls.lock().unwrap().push(request);
        out
    }

    async fn converse(&self, request: ConversationRequest) -> anyhow::Result<ModelReply> {
        self.conversations.lock().unwrap().push(request);
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(anyhow::anyhow!("no scripted reply left")))
    }
}

/// In-memory store. `fail_after(n)` aborts a batch after `n` staged writes.
#[derive(Default)]
pub struct MemoryEntryStore {
    entries: Mutex<Vec<FoodEntry>>,
    fail_after: Option<usize>,
    fail_reads: bool,
}

impl MemoryEntryStore {
    pub fn failing_after(writes: usize) -> Self {
        Self {
            fail_after: Some(writes),
            ..Self::default()
        }
    }

    pub fn failing_reads() -> Self {
        Self {
            fail_reads: true,
            ..Self::default()
        }
    }

    pub fn with_entries(entries: Vec<FoodEntry>) -> Arc<Self> {
        let store = Self::default();
        *store.entries.lock().unwrap() = entries;
        Arc::new(store)
    }

    pub fn snapshot(&self) -> Vec<FoodEntry> {
        self.entries.lock().unwrap().clone()
    }
}

#[async_trait]
impl EntryStore for MemoryEntryStore {
    async fn insert_batch(&self, entries: &[FoodEntry]) -> anyhow::Result<()> {
        let mut staged = Vec::with_capacity(entries.len());
        for (i, e) in entries.iter().enumerate() {
            if self.fail_after == Some(i) {
                anyhow::bail!("injected write failure after {i} of {}", entries.len());
            }
            staged.push(e.clone());
        }
        self.entries.lock().unwrap().extend(staged);
        Ok(())
    }

    async fn delete(&self, user_id: Uuid, entry_id: Uuid) -> anyhow::Result<()> {
        self.entries
            .lock()
            .unwrap()
            .retain(|e| !(e.id == entry_id && e.user_id == user_id));
        Ok(())
    }

    async fn list_range(
        &self,
        user_id: Uuid,
        since: OffsetDateTime,
        until: Option<OffsetDateTime>,
        limit: i64,
    ) -> anyhow::Result<Vec<FoodEntry>> {
        if self.fail_reads {
            anyhow::bail!("injected read failure");
        }
        let mut rows: Vec<FoodEntry> = self
            .entries
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.user_id == user_id && e.created_at >= since)
            .filter(|e| until.map_or(true, |u| e.created_at < u))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        rows.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(rows)
    }
}

pub fn entry_at(user_id: Uuid, name: &str, calories: f64, created_at: OffsetDateTime) -> FoodEntry {
    FoodEntry {
        id: Uuid::new_v4(),
        user_id,
        name: name.into(),
        calories,
        protein: 1.0,
        carbs: 2.0,
        fats: 3.0,
        created_at,
    }
}

pub fn test_jwt_config() -> JwtConfig {
    JwtConfig {
        secret: "test-secret".into(),
        issuer: "nutrisnap".into(),
        audience: "nutrisnap-users".into(),
    }
}

pub fn sign_token(cfg: &JwtConfig, user_id: Uuid, kind: TokenKind) -> String {
    let now = OffsetDateTime::now_utc().unix_timestamp() as usize;
    let claims = Claims {
        sub: user_id,
        iat: now,
        exp: now + 300,
        iss: cfg.issuer.clone(),
        aud: cfg.audience.clone(),
        kind,
    };
    jsonwebtoken::encode(
        &jsonwebtoken::Header::default(),
        &claims,
        &jsonwebtoken::EncodingKey::from_secret(cfg.secret.as_bytes()),
    )
    .expect("sign token")
}
