//! Quiz Gateway Input Validation
//!
//! Request validation for the two generation endpoints. Both schemas are
//! closed: unknown keys are errors, not ignored. Every violation is collected
//! so a single response can report all of them at once.
//!
//! Malformed input is an expected outcome, so validators return
//! `Result<GenerationRequest, Vec<FieldError>>` and never panic.

use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::errors::ApiError;
use crate::types::{Archetype, Drama, DramaLevel, GenerationRequest};

/// Fixed instruction carried by `/api/genSentence`, which has no free-text field.
pub const SENTENCE_PROMPT_HINT: &str = "Max 25 woorden, speels en niet kwetsend.";

const GENERATE_FIELDS: &[&str] = &["archetype", "drama", "emojiLevel", "prompt"];
const SENTENCE_FIELDS: &[&str] = &[
    "archetype",
    "dramaScore",
    "engagementScore",
    "emojiLevel",
    "locale",
];

lazy_static! {
    static ref LOCALE_PATTERN: Regex = Regex::new(r"^[A-Za-z_-]{2,16}$").unwrap();
}

/// A single field-level violation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

/// Parse a raw request body as JSON. An empty body is treated as `{}` so the
/// validator reports every missing field instead of a parse error.
pub fn parse_json_body(body: &[u8]) -> Result<Value, ApiError> {
    let text = std::str::from_utf8(body)
        .map_err(|_| ApiError::BadJson("Request body is not valid UTF-8.".to_string()))?;

    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(Value::Object(Map::new()));
    }

    serde_json::from_str::<Value>(trimmed)
        .map_err(|_| ApiError::BadJson("Invalid JSON body.".to_string()))
}

/// Validate a `/api/generate` body: `{archetype, drama, emojiLevel, prompt}`.
pub fn validate_generate_request(payload: &Value) -> Result<GenerationRequest, Vec<FieldError>> {
    let obj = require_object(payload)?;
    let mut errors = Vec::new();

    reject_unknown_keys(obj, GENERATE_FIELDS, &mut errors);
    let archetype = archetype_field(obj, &mut errors);
    let drama = enum_field(obj, "drama", DramaLevel::parse, &level_names(), &mut errors);
    let emoji_level = int_field(obj, "emojiLevel", 0, 5, &mut errors);
    let prompt = non_empty_string(obj, "prompt", &mut errors);

    match (archetype, drama, emoji_level, prompt) {
        (Some(archetype), Some(level), Some(emoji_level), Some(prompt_hint)) if errors.is_empty() => {
            Ok(GenerationRequest {
                archetype,
                drama: Drama::Level(level),
                emoji_level,
                prompt_hint,
                engagement_score: None,
                locale: None,
            })
        }
        _ => Err(errors),
    }
}

/// Validate a `/api/genSentence` body:
/// `{archetype, dramaScore, engagementScore, emojiLevel, locale?}`.
pub fn validate_sentence_request(payload: &Value) -> Result<GenerationRequest, Vec<FieldError>> {
    let obj = require_object(payload)?;
    let mut errors = Vec::new();

    reject_unknown_keys(obj, SENTENCE_FIELDS, &mut errors);
    let archetype = archetype_field(obj, &mut errors);
    let drama_score = int_field(obj, "dramaScore", 0, 100, &mut errors);
    let engagement_score = int_field(obj, "engagementScore", 0, 100, &mut errors);
    let emoji_level = int_field(obj, "emojiLevel", 0, 5, &mut errors);
    let locale = locale_field(obj, &mut errors);

    match (archetype, drama_score, engagement_score, emoji_level) {
        (Some(archetype), Some(score), Some(engagement), Some(emoji_level)) if errors.is_empty() => {
            Ok(GenerationRequest {
                archetype,
                drama: Drama::Score(score),
                emoji_level,
                prompt_hint: SENTENCE_PROMPT_HINT.to_string(),
                engagement_score: Some(engagement),
                locale,
            })
        }
        _ => Err(errors),
    }
}

fn require_object(payload: &Value) -> Result<&Map<String, Value>, Vec<FieldError>> {
    payload
        .as_object()
        .ok_or_else(|| vec![FieldError::new("body", "Request body must be a JSON object.")])
}

fn reject_unknown_keys(obj: &Map<String, Value>, allowed: &[&str], errors: &mut Vec<FieldError>) {
    for key in obj.keys() {
        if !allowed.contains(&key.as_str()) {
            errors.push(FieldError::new(key, "Unknown field is not allowed."));
        }
    }
}

fn archetype_names() -> Vec<&'static str> {
    Archetype::ALL.iter().map(|a| a.as_str()).collect()
}

fn level_names() -> Vec<&'static str> {
    DramaLevel::ALL.iter().map(|d| d.as_str()).collect()
}

fn archetype_field(obj: &Map<String, Value>, errors: &mut Vec<FieldError>) -> Option<Archetype> {
    enum_field(obj, "archetype", Archetype::parse, &archetype_names(), errors)
}

fn enum_field<T>(
    obj: &Map<String, Value>,
    name: &str,
    parse: fn(&str) -> Option<T>,
    allowed: &[&str],
    errors: &mut Vec<FieldError>,
) -> Option<T> {
    let parsed = obj
        .get(name)
        .and_then(Value::as_str)
        .and_then(|raw| parse(raw.trim()));

    if parsed.is_none() {
        errors.push(FieldError::new(
            name,
            format!("Must be one of: {}.", allowed.join(", ")),
        ));
    }
    parsed
}

fn int_field(
    obj: &Map<String, Value>,
    name: &str,
    min: i64,
    max: i64,
    errors: &mut Vec<FieldError>,
) -> Option<u8> {
    let value = obj
        .get(name)
        .and_then(integral_value)
        .filter(|v| (min..=max).contains(v))
        .and_then(|v| u8::try_from(v).ok());

    if value.is_none() {
        errors.push(FieldError::new(
            name,
            format!("Must be an integer between {} and {}.", min, max),
        ));
    }
    value
}

/// JSON number with no fractional part; `2.0` counts, `2.5` does not.
fn integral_value(value: &Value) -> Option<i64> {
    if let Some(int) = value.as_i64() {
        return Some(int);
    }
    value
        .as_f64()
        .filter(|f| f.is_finite() && f.fract() == 0.0 && f.abs() <= i64::MAX as f64)
        .map(|f| f as i64)
}

fn non_empty_string(
    obj: &Map<String, Value>,
    name: &str,
    errors: &mut Vec<FieldError>,
) -> Option<String> {
    let value = obj
        .get(name)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    if value.is_none() {
        errors.push(FieldError::new(name, "Must be a non-empty string."));
    }
    value
}

fn locale_field(obj: &Map<String, Value>, errors: &mut Vec<FieldError>) -> Option<String> {
    match obj.get("locale") {
        None | Some(Value::Null) => None,
        Some(Value::String(raw)) if LOCALE_PATTERN.is_match(raw.trim()) => {
            Some(raw.trim().to_string())
        }
        Some(_) => {
            errors.push(FieldError::new(
                "locale",
                "Must be a locale tag of 2 to 16 letters, '-' or '_'.",
            ));
            None
        }
    }
}
