use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument, warn};

use super::{prompts, schema, source::FoodSource};
use crate::ai::{GenerativeModel, StructuredRequest};

/// Nutrition estimate for one identified food item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NutritionFacts {
    pub name: String,
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fats: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExtractionPayload {
    food_items: Vec<NutritionFacts>,
}

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("nutrition model call failed: {0:#}")]
    Model(anyhow::Error),
    #[error("nutrition model output rejected: {0}")]
    InvalidOutput(String),
}

#[derive(Clone)]
pub struct NutritionExtractor {
    model: Arc<dyn GenerativeModel>,
}

impl NutritionExtractor {
    pub fn new(model: Arc<dyn GenerativeModel>) -> Self {
        Self { model }
    }

    /// Estimates nutrition for every item in `source`. An empty list is a
    /// valid answer; deciding what it means is up to the caller.
    #[instrument(skip(self, source), fields(kind = %source.kind()))]
    pub async fn extract(&self, source: &FoodSource) -> Result<Vec<NutritionFacts>, ExtractionError> {
        let request = match source {
            FoodSource::Text(description) => StructuredRequest {
                prompt: prompts::extraction_text_prompt(description),
                image: None,
                schema: schema::extraction_schema(),
            },
            FoodSource::Image(image) => StructuredRequest {
                prompt: prompts::extraction_image_prompt(),
                image: Some(image.clone()),
                schema: schema::extraction_schema(),
            },
        };

        let raw = self
            .model
            .generate_structured(request)
            .await
            .map_err(ExtractionError::Model)?;
        let items = parse_extraction(&raw).map_err(|e| {
            warn!(error = %e, "extraction output rejected");
            e
        })?;
        debug!(items = items.len(), "extraction complete");
        Ok(items)
    }
}

fn parse_extraction(raw: &str) -> Result<Vec<NutritionFacts>, ExtractionError> {
    let payload: ExtractionPayload = serde_json::from_str(raw.trim())
        .map_err(|e| ExtractionError::InvalidOutput(e.to_string()))?;
    for item in &payload.food_items {
        if item.name.trim().is_empty() {
            return Err(ExtractionError::InvalidOutput("item without a name".into()));
        }
        let fields = [
            ("calories", item.calories),
            ("protein", item.protein),
            ("carbs", item.carbs),
            ("fats", item.fats),
        ];
        if let Some((field, value)) = fields.iter().find(|(_, v)| !v.is_finite() || *v < 0.0) {
            return Err(ExtractionError::InvalidOutput(format!(
                "{} has invalid {field} {value}",
                item.name
            )));
        }
    }
    Ok(payload.food_items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedModel;

    #[test]
    fn parses_list_of_items() {
        let items = parse_extraction(
            r#"{"foodItems":[
                {"name":"1 bowl of dal tadka","calories":180,"protein":9.5,"carbs":22,"fats":6.2},
                {"name":"2 rotis","calories":240,"protein":7,"carbs":44,"fats":4}
            ]}"#,
        )
        .unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].name, "1 bowl of dal tadka");
        assert_eq!(items[0].protein, 9.5);
        assert_eq!(items[1].calories, 240.0);
    }

    #[test]
    fn empty_list_is_not_an_error() {
        assert!(parse_extraction(r#"{"foodItems":[]}"#).unwrap().is_empty());
    }

    #[test]
    fn rejects_missing_numeric_field() {
        let err = parse_extraction(
            r#"{"foodItems":[{"name":"apple","calories":95,"protein":0.5,"carbs":25}]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, ExtractionError::InvalidOutput(_)));
    }

    #[test]
    fn rejects_non_list_food_items() {
        let err = parse_extraction(
            r#"{"foodItems":{"name":"apple","calories":95,"protein":0.5,"carbs":25,"fats":0.3}}"#,
        )
        .unwrap_err();
        assert!(matches!(err, ExtractionError::InvalidOutput(_)));
    }

    #[test]
    fn rejects_mistyped_and_negative_numbers() {
        assert!(parse_extraction(
            r#"{"foodItems":[{"name":"apple","calories":"95","protein":0,"carbs":0,"fats":0}]}"#
        )
        .is_err());
        assert!(parse_extraction(
            r#"{"foodItems":[{"name":"apple","calories":-5,"protein":0,"carbs":0,"fats":0}]}"#
        )
        .is_err());
        assert!(parse_extraction(
            r#"{"foodItems":[{"name":"  ","calories":5,"protein":0,"carbs":0,"fats":0}]}"#
        )
        .is_err());
    }

    #[test]
    fn rejects_non_json() {
        assert!(parse_extraction("I think this is an apple").is_err());
    }

    #[tokio::test]
    async fn text_source_uses_text_prompt_without_image() {
        let model = Arc::new(ScriptedModel::extracting(|_| {
            Ok(r#"{"foodItems":[{"name":"oatmeal","calories":150,"protein":5,"carbs":27,"fats":3}]}"#.into())
        }));
        let extractor = NutritionExtractor::new(model.clone());
        let items = extractor
            .extract(&FoodSource::Text("oatmeal".into()))
            .await
            .unwrap();
        assert_eq!(items.len(), 1);

        let calls = model.structured_calls();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].image.is_none());
        assert!(calls[0].prompt.contains("\"oatmeal\""));
    }

    #[tokio::test]
    async fn image_source_attaches_image() {
        let model = Arc::new(ScriptedModel::extracting(|_| Ok(r#"{"foodItems":[]}"#.into())));
        let extractor = NutritionExtractor::new(model.clone());
        let source = FoodSource::image(crate::testing::PNG_URI).unwrap();
        extractor.extract(&source).await.unwrap();

        let calls = model.structured_calls();
        assert_eq!(calls[0].image.as_ref().unwrap().mime_type, "image/png");
    }

    #[tokio::test]
    async fn model_failure_maps_to_model_error() {
        let model = Arc::new(ScriptedModel::extracting(|_| anyhow::bail!("timeout")));
        let extractor = NutritionExtractor::new(model);
        let err = extractor
            .extract(&FoodSource::Text("pizza".into()))
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractionError::Model(_)));
    }
}
