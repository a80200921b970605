const BASE_PROMPT: &str = r#"You are a world-class nutrition expert with specialized knowledge in international cuisines, including a deep understanding of Indian food.

Your task is to identify all distinct food items from the provided source and return their estimated nutritional information.

When analyzing food, be mindful of the following:
- Regional variations: the same dish can differ between regions. State any regional assumption in the item name.
- Ingredients: note staple ingredients such as lentils, chickpeas, paneer, vegetables and spices.
- Preparation: frying, tandoori cooking and curries with varying amounts of oil or cream change the nutritional values significantly.

For each item, estimate the quantity (e.g. "1 bowl of dal tadka", "2 pieces of paneer tikka") and include it in the name, then provide calories (kcal), protein, carbs and fats (grams).
"#;

pub fn extraction_text_prompt(description: &str) -> String {
    format!(
        "{BASE_PROMPT}\nThe source is a text description. If it mentions multiple items, identify each one.\n\nDescription: \"{description}\"\n\nRespond in JSON format."
    )
}

pub fn extraction_image_prompt() -> String {
    format!(
        "{BASE_PROMPT}\nThe source is the attached image. Identify every food item present in it.\n\nRespond in JSON format."
    )
}

pub const RECOGNITION_PROMPT: &str = r#"You are an expert food recognition AI with a specialization in diverse world cuisines, including Indian food. Your task is to identify all distinct food items in the attached image.

For each item, provide a simple name and a more detailed description which includes an estimated quantity or serving size.

For example, for a plate with eggs and bacon you might return:
[
  { "name": "Scrambled Eggs", "description": "Two scrambled eggs" },
  { "name": "Bacon Strips", "description": "Three strips of bacon" }
]

Do not provide any nutritional information. If no food is visible, return an empty list."#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_prompt_embeds_description_and_shared_instructions() {
        let p = extraction_text_prompt("two idlis with sambar");
        assert!(p.contains("\"two idlis with sambar\""));
        assert!(p.contains("Regional variations"));
        assert!(p.contains("estimate the quantity"));
    }

    #[test]
    fn image_prompt_shares_instructions() {
        let p = extraction_image_prompt();
        assert!(p.contains("Regional variations"));
        assert!(p.contains("attached image"));
    }
}
