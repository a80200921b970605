use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::{aggregate::{DayGroup, NutritionTotals}, repo_types::FoodEntry};

#[derive(Debug, Deserialize)]
pub struct TextSubmissionRequest {
    pub description: String,
}

#[derive(Debug, Deserialize)]
pub struct ImageSubmissionRequest {
    pub photo_data_uri: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FoodEntryResponse {
    pub id: Uuid,
    pub name: String,
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fats: f64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<FoodEntry> for FoodEntryResponse {
    fn from(e: FoodEntry) -> Self {
        Self {
            id: e.id,
            name: e.name,
            calories: e.calories,
            protein: e.protein,
            carbs: e.carbs,
            fats: e.fats,
            created_at: e.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LogQuery {
    #[serde(default = "default_days")]
    pub days: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub tz_offset_minutes: i32,
}
fn default_days() -> i64 {
    10
}
fn default_limit() -> i64 {
    100
}

#[derive(Debug, Serialize)]
pub struct DayGroupResponse {
    pub label: String,
    pub date: String, // YYYY-MM-DD
    pub totals: NutritionTotals,
    pub entries: Vec<FoodEntryResponse>,
}

impl From<DayGroup> for DayGroupResponse {
    fn from(g: DayGroup) -> Self {
        Self {
            label: g.label,
            date: g.date.to_string(),
            totals: NutritionTotals::of(&g.entries),
            entries: g.entries.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LogResponse {
    pub days: Vec<DayGroupResponse>,
}

#[derive(Debug, Deserialize)]
pub struct SummaryQuery {
    #[serde(default)]
    pub tz_offset_minutes: i32,
    pub date: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DailySummaryResponse {
    pub date: String,
    #[serde(flatten)]
    pub totals: NutritionTotals,
    pub entry_count: usize,
    /// Set when the day held more rows than one summary reads.
    pub truncated: bool,
}
