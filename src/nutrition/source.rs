use base64::{engine::general_purpose, Engine as _};
use bytes::Bytes;
use lazy_static::lazy_static;
use regex::Regex;

/// Minimum number of characters (after trimming) for a text description.
pub const MIN_DESCRIPTION_CHARS: usize = 3;

pub const SHORT_DESCRIPTION_MSG: &str = "Please enter a more descriptive food item.";
pub const INVALID_IMAGE_MSG: &str = "Invalid image format. Must be a data URI.";

/// Decoded image: MIME type plus raw bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePayload {
    pub mime_type: String,
    pub data: Bytes,
}

impl ImagePayload {
    /// Parses `data:image/<subtype>;base64,<payload>`.
    pub fn from_data_uri(uri: &str) -> Result<Self, &'static str> {
        lazy_static! {
            static ref DATA_URI_RE: Regex =
                Regex::new(r"^data:(image/[A-Za-z0-9.+-]+);base64,([A-Za-z0-9+/=\s]+)$").unwrap();
        }
        let caps = DATA_URI_RE.captures(uri.trim()).ok_or(INVALID_IMAGE_MSG)?;
        let mime_type = caps[1].to_ascii_lowercase();
        let encoded: String = caps[2].chars().filter(|c| !c.is_whitespace()).collect();
        let data = general_purpose::STANDARD
            .decode(encoded.as_bytes())
            .map_err(|_| INVALID_IMAGE_MSG)?;
        if data.is_empty() {
            return Err(INVALID_IMAGE_MSG);
        }
        Ok(Self {
            mime_type,
            data: Bytes::from(data),
        })
    }

    pub fn to_base64(&self) -> String {
        general_purpose::STANDARD.encode(&self.data)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionKind {
    Text,
    Image,
}

impl std::fmt::Display for SubmissionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => f.write_str("text"),
            Self::Image => f.write_str("image"),
        }
    }
}

/// What the extractor is asked to analyze. Decided once at the boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FoodSource {
    Text(String),
    Image(ImagePayload),
}

impl FoodSource {
    pub fn text(description: &str) -> Result<Self, &'static str> {
        let trimmed = description.trim();
        if trimmed.chars().count() < MIN_DESCRIPTION_CHARS {
            return Err(SHORT_DESCRIPTION_MSG);
        }
        Ok(Self::Text(trimmed.to_string()))
    }

    pub fn image(data_uri: &str) -> Result<Self, &'static str> {
        ImagePayload::from_data_uri(data_uri).map(Self::Image)
    }

    pub fn kind(&self) -> SubmissionKind {
        match self {
            Self::Text(_) => SubmissionKind::Text,
            Self::Image(_) => SubmissionKind::Image,
        }
    }
}
