use std::{str::FromStr, sync::Arc};

use futures::future::try_join_all;
use serde::Deserialize;
use time::OffsetDateTime;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use super::{errors::IngestError, repo::EntryStore, repo_types::FoodEntry};
use crate::nutrition::{
    FoodRecognizer, FoodSource, ImagePayload, NutritionExtractor, NutritionFacts, SubmissionKind,
};

/// How image submissions are analyzed. Text always goes straight to extraction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IngestStrategy {
    /// One extraction call over the whole image.
    #[default]
    Direct,
    /// Recognize items first, then one extraction call per item.
    TwoStage,
}

impl FromStr for IngestStrategy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "direct" => Ok(Self::Direct),
            "two_stage" | "two-stage" => Ok(Self::TwoStage),
            other => anyhow::bail!("unknown ingest strategy {other:?}"),
        }
    }
}

/// Raw user input as received.
#[derive(Debug, Clone)]
pub enum Submission {
    Text(String),
    Image(String),
}

impl Submission {
    pub fn kind(&self) -> SubmissionKind {
        match self {
            Self::Text(_) => SubmissionKind::Text,
            Self::Image(_) => SubmissionKind::Image,
        }
    }

    fn into_source(self) -> Result<FoodSource, IngestError> {
        let source = match self {
            Self::Text(description) => FoodSource::text(&description),
            Self::Image(data_uri) => FoodSource::image(&data_uri),
        };
        source.map_err(IngestError::Validation)
    }
}

#[derive(Clone)]
pub struct IngestionPipeline {
    extractor: NutritionExtractor,
    recognizer: FoodRecognizer,
    store: Arc<dyn EntryStore>,
    strategy: IngestStrategy,
}

impl IngestionPipeline {
    pub fn new(
        extractor: NutritionExtractor,
        recognizer: FoodRecognizer,
        store: Arc<dyn EntryStore>,
        strategy: IngestStrategy,
    ) -> Self {
        Self {
            extractor,
            recognizer,
            store,
            strategy,
        }
    }

    /// Validates, analyzes and persists one submission for `user_id`.
    #[instrument(skip(self, submission), fields(kind = %submission.kind(), strategy = ?self.strategy))]
    pub async fn ingest(
        &self,
        user_id: Uuid,
        submission: Submission,
    ) -> Result<Vec<FoodEntry>, IngestError> {
        let kind = submission.kind();
        let source = submission.into_source().map_err(|e| {
            warn!(error = %e, "submission rejected");
            e
        })?;

        let facts = match (&source, self.strategy) {
            (FoodSource::Image(image), IngestStrategy::TwoStage) => {
                self.recognize_then_extract(image).await
            }
            _ => self.extractor.extract(&source).await.map_err(IngestError::from),
        }
        .map_err(|e| {
            error!(error = %e, "analysis failed");
            e
        })?;

        if facts.is_empty() {
            warn!("nothing recognized");
            return Err(IngestError::EmptyResult(kind));
        }

        let created_at = OffsetDateTime::now_utc();
        let entries: Vec<FoodEntry> = facts
            .into_iter()
            .map(|f| FoodEntry::from_facts(user_id, f, created_at))
            .collect();

        self.store.insert_batch(&entries).await.map_err(|e| {
            error!(error = %e, count = entries.len(), "persist entries failed");
            IngestError::Persistence(e)
        })?;

        info!(count = entries.len(), "food entries logged");
        Ok(entries)
    }

    /// Results follow recognizer order; any failed item fails the whole submission.
    async fn recognize_then_extract(
        &self,
        image: &ImagePayload,
    ) -> Result<Vec<NutritionFacts>, IngestError> {
        let items = self.recognizer.recognize(image).await?;
        let calls = items.iter().map(|item| {
            let source = FoodSource::Text(item.as_description().to_string());
            async move { self.extractor.extract(&source).await }
        });
        let per_item = try_join_all(calls).await?;
        Ok(per_item.into_iter().flatten().collect())
    }
}
