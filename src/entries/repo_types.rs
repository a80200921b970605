use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::nutrition::NutritionFacts;

/// One logged food item. Nutrition fields never change after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct FoodEntry {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub calories: f64, // kcal
    pub protein: f64,  // g
    pub carbs: f64,    // g
    pub fats: f64,     // g
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl FoodEntry {
    pub fn from_facts(user_id: Uuid, facts: NutritionFacts, created_at: OffsetDateTime) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            name: facts.name,
            calories: facts.calories,
            protein: facts.protein,
            carbs: facts.carbs,
            fats: facts.fats,
            created_at,
        }
    }
}
