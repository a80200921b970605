use axum::http::StatusCode;
use thiserror::Error;

use crate::nutrition::{ExtractionError, RecognitionError, SubmissionKind};

const ANALYZE_FAILED_MSG: &str = "Could not analyze food. Please try again.";
const SAVE_FAILED_MSG: &str = "Could not save your food entries. Please try again.";
const EMPTY_TEXT_MSG: &str = "Could not analyze food. The AI may not recognize this item. Please try again with a different description.";
const EMPTY_IMAGE_MSG: &str =
    "Could not recognize any food in the image. Please try a clearer image.";

/// Terminal outcome of a failed submission. No partial success exists.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("invalid submission: {0}")]
    Validation(&'static str),
    #[error(transparent)]
    Extraction(#[from] ExtractionError),
    #[error(transparent)]
    Recognition(#[from] RecognitionError),
    #[error("nothing recognized in {0} submission")]
    EmptyResult(SubmissionKind),
    #[error("failed to persist entries: {0:#}")]
    Persistence(anyhow::Error),
}

impl IngestError {
    /// Short, non-technical text for the user.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Validation(msg) => msg,
            Self::Extraction(_) | Self::Recognition(_) => ANALYZE_FAILED_MSG,
            Self::EmptyResult(SubmissionKind::Text) => EMPTY_TEXT_MSG,
            Self::EmptyResult(SubmissionKind::Image) => EMPTY_IMAGE_MSG,
            Self::Persistence(_) => SAVE_FAILED_MSG,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::EmptyResult(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Extraction(_) | Self::Recognition(_) => StatusCode::BAD_GATEWAY,
            Self::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<IngestError> for (StatusCode, String) {
    fn from(e: IngestError) -> Self {
        (e.status(), e.user_message().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_result_messages_depend_on_submission_kind() {
        let text = IngestError::EmptyResult(SubmissionKind::Text);
        let image = IngestError::EmptyResult(SubmissionKind::Image);
        assert!(text.user_message().contains("different description"));
        assert!(image.user_message().contains("clearer image"));
        assert_eq!(text.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn internal_causes_are_not_shown_to_users() {
        let err = IngestError::Persistence(anyhow::anyhow!("connection reset by peer"));
        let (status, msg) = <(StatusCode, String)>::from(err);
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!msg.contains("connection"));

        let err = IngestError::from(ExtractionError::InvalidOutput("missing field `fats`".into()));
        assert_eq!(err.status(), StatusCode::BAD_GATEWAY);
        assert!(!err.user_message().contains("fats"));
    }
}
