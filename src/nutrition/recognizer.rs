use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument, warn};

use super::{prompts, schema, source::ImagePayload};
use crate::ai::{GenerativeModel, StructuredRequest};

/// A food item seen in an image, without any nutrition numbers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecognizedItem {
    pub name: String,
    pub description: String,
}

impl RecognizedItem {
    /// Text handed to the extractor for this item.
    pub fn as_description(&self) -> &str {
        if self.description.trim().is_empty() {
            self.name.trim()
        } else {
            self.description.trim()
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecognitionPayload {
    food_items: Vec<RecognizedItem>,
}

#[derive(Debug, Error)]
pub enum RecognitionError {
    #[error("recognition model call failed: {0:#}")]
    Model(anyhow::Error),
    #[error("recognition model output rejected: {0}")]
    InvalidOutput(String),
}

#[derive(Clone)]
pub struct FoodRecognizer {
    model: Arc<dyn GenerativeModel>,
}

impl FoodRecognizer {
    pub fn new(model: Arc<dyn GenerativeModel>) -> Self {
        Self { model }
    }

    /// Lists the food items visible in `image`. Empty means nothing was recognized.
    #[instrument(skip(self, image), fields(mime = %image.mime_type))]
    pub async fn recognize(&self, image: &ImagePayload) -> Result<Vec<RecognizedItem>, RecognitionError> {
        let raw = self
            .model
            .generate_structured(StructuredRequest {
                prompt: prompts::RECOGNITION_PROMPT.to_string(),
                image: Some(image.clone()),
                schema: schema::recognition_schema(),
            })
            .await
            .map_err(RecognitionError::Model)?;
        let items = parse_recognition(&raw).map_err(|e| {
            warn!(error = %e, "recognition output rejected");
            e
        })?;
        debug!(items = items.len(), "recognition complete");
        Ok(items)
    }
}

fn parse_recognition(raw: &str) -> Result<Vec<RecognizedItem>, RecognitionError> {
    let payload: RecognitionPayload = serde_json::from_str(raw.trim())
        .map_err(|e| RecognitionError::InvalidOutput(e.to_string()))?;
    if payload
        .food_items
        .iter()
        .any(|item| item.as_description().is_empty())
    {
        return Err(RecognitionError::InvalidOutput(
            "item without name or description".into(),
        ));
    }
    Ok(payload.food_items)
}
