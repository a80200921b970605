pub mod extractor;
mod prompts;
pub mod recognizer;
mod schema;
pub mod source;

pub use extractor::{ExtractionError, NutritionExtractor, NutritionFacts};
pub use recognizer::{FoodRecognizer, RecognitionError, RecognizedItem};
pub use source::{FoodSource, ImagePayload, SubmissionKind};
