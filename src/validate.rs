//! Validation of `POST /import` bodies.
//!
//! Checks run in a fixed order and the first failure wins:
//!
//! | Check | Status | Message |
//! |-------|--------|---------|
//! | body is a JSON object | 400 | `Invalid JSON` |
//! | token matches the stored token | 403 | `Invalid token` |
//! | `id` and `imageBase64` are strings (or absent) | 400 | `Invalid JSON` |
//! | `id` and `imageBase64` non-empty after trim | 400 | `Missing id or image` |
//! | `data:` prefix contains a comma | 400 | `Invalid image data` |
//! | payload is base64 | 400 | `Invalid base64` |
//!
//! The image bytes are not inspected here; a corrupt image is reported by the
//! question-entry view, not to the HTTP client.

use axum::http::StatusCode;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::models::ImportRequest;

/// Standard alphabet, padding optional.
const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("Invalid JSON")]
    InvalidJson,
    #[error("Invalid token")]
    InvalidToken,
    #[error("Missing id or image")]
    MissingFields,
    #[error("Invalid image data")]
    InvalidImageData,
    #[error("Invalid base64")]
    InvalidBase64,
}

impl Rejection {
    pub fn status(self) -> StatusCode {
        match self {
            Rejection::InvalidToken => StatusCode::FORBIDDEN,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

/// Validates a raw request body against `expected_token`.
///
/// An empty `expected_token` disables the token check. The token is checked
/// before the shape of any other field.
pub fn validate_import(body: &[u8], expected_token: &str) -> Result<ImportRequest, Rejection> {
    let value: Value = serde_json::from_slice(body).map_err(|_| Rejection::InvalidJson)?;
    let Value::Object(fields) = value else {
        return Err(Rejection::InvalidJson);
    };

    if !expected_token.is_empty()
        && fields.get("token").and_then(Value::as_str) != Some(expected_token)
    {
        return Err(Rejection::InvalidToken);
    }

    let question_id = string_field(&fields, "id")?.trim();
    let image = string_field(&fields, "imageBase64")?.trim();
    if question_id.is_empty() || image.is_empty() {
        return Err(Rejection::MissingFields);
    }

    let encoded = strip_data_url(image)?;
    let image_bytes = decode_base64(encoded)?;

    Ok(ImportRequest {
        question_id: question_id.to_string(),
        image_bytes,
    })
}

/// Absent and `null` read as empty; any other non-string is malformed.
fn string_field<'a>(fields: &'a Map<String, Value>, key: &str) -> Result<&'a str, Rejection> {
    match fields.get(key) {
        None | Some(Value::Null) => Ok(""),
        Some(Value::String(s)) => Ok(s),
        Some(_) => Err(Rejection::InvalidJson),
    }
}

/// Drops a `data:<mime>;base64,` header if present.
pub fn strip_data_url(value: &str) -> Result<&str, Rejection> {
    if !value.starts_with("data:") {
        return Ok(value);
    }
    value
        .split_once(',')
        .map(|(_, rest)| rest)
        .ok_or(Rejection::InvalidImageData)
}

fn decode_base64(encoded: &str) -> Result<Vec<u8>, Rejection> {
    let compact: String = encoded
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    LENIENT_BASE64
        .decode(compact)
        .map_err(|_| Rejection::InvalidBase64)
}
