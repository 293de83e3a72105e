//! Content extraction from a single `data:` payload.
//!
//! A content-bearing payload is a JSON array of message objects; the first
//! element's `content` string is the cumulative assistant text so far.

use serde_json::Value;

/// Why a payload could not be turned into assistant text.
///
/// Always recovered locally: the payload is skipped and decoding continues.
#[derive(Debug, thiserror::Error)]
pub enum FragmentError {
    /// The payload is not valid JSON.
    #[error("malformed JSON fragment: {0}")]
    Json(#[from] serde_json::Error),

    /// The payload is valid JSON but not shaped like `[{"content": "..."}]`.
    #[error("unexpected fragment shape: {0}")]
    Shape(&'static str),
}

/// Extract `[0].content` from a payload.
pub fn extract_content(data: &str) -> Result<String, FragmentError> {
    let value: Value = serde_json::from_str(data.trim())?;

    let first = value
        .as_array()
        .ok_or(FragmentError::Shape("payload is not an array"))?
        .first()
        .ok_or(FragmentError::Shape("payload array is empty"))?;

    let content = first
        .get("content")
        .ok_or(FragmentError::Shape("first element has no `content` field"))?
        .as_str()
        .ok_or(FragmentError::Shape("`content` is not a string"))?;

    Ok(content.to_string())
}
