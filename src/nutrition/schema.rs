use serde_json::json;

/// Response schema for nutrition extraction.
pub fn extraction_schema() -> serde_json::Value {
    json!({
        "type": "object",
        "properties": {
            "foodItems": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "name": { "type": "string" },
                        "calories": { "type": "number" },
                        "protein": { "type": "number" },
                        "carbs": { "type": "number" },
                        "fats": { "type": "number" }
                    },
                    "required": ["name", "calories", "protein", "carbs", "fats"]
                }
            }
        },
        "required": ["foodItems"]
    })
}

/// Response schema for image recognition. No nutrition fields.
pub fn recognition_schema() -> serde_json::Value {
    json!({
        "type": "object",
        "properties": {
            "foodItems": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "name": { "type": "string" },
                        "description": { "type": "string" }
                    },
                    "required": ["name", "description"]
                }
            }
        },
        "required": ["foodItems"]
    })
}
