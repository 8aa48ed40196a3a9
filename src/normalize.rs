//! Pulls the useful payload out of loosely shaped service responses.
//!
//! Shape mismatches degrade to a textual rendering of whatever came back.
//! Only bytes that cannot be read as text at all produce an error.

use crate::error::RemoteError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;

static TIMESTAMP_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[\d+\.\d+-\d+\.\d+s\]\s*").expect("timestamp marker pattern is valid")
});

/// Shown in place of a transcript when the service answered with nothing.
pub const EMPTY_TRANSCRIPT: &str = "Transcription completed but no text returned";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PronunciationResult {
    pub transcription: String,
    pub score: Option<f64>,
}

impl PronunciationResult {
    pub fn passes(&self, threshold: f64) -> Option<bool> {
        self.score.map(|score| score >= threshold)
    }
}

/// Removes `[0.00-4.66s]` style markers and trims.
///
/// Input made only of markers is returned trimmed rather than emptied.
pub fn strip_timestamps(text: &str) -> String {
    let cleaned = TIMESTAMP_MARKER.replace_all(text, "");
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        text.trim().to_string()
    } else {
        cleaned.to_string()
    }
}

pub fn translation_text(body: &[u8], field: &str) -> Result<String, RemoteError> {
    match serde_json::from_slice::<Value>(body) {
        Ok(value) => Ok(match value.get(field).and_then(Value::as_str) {
            Some(text) => text.to_string(),
            None => value.to_string(),
        }),
        Err(_) => Ok(body_text(body)?.trim().to_string()),
    }
}

/// Transcript from a text or JSON body. An empty result becomes [`EMPTY_TRANSCRIPT`].
pub fn transcript_text(body: &[u8]) -> Result<String, RemoteError> {
    let raw = match serde_json::from_slice::<Value>(body) {
        Ok(Value::String(text)) => text,
        Ok(value) => match value.get("text").and_then(Value::as_str) {
            Some(text) => text.to_string(),
            None => value.to_string(),
        },
        Err(_) => body_text(body)?.to_string(),
    };

    let text = strip_timestamps(&raw);
    if text.is_empty() {
        return Ok(EMPTY_TRANSCRIPT.to_string());
    }
    Ok(text)
}

pub fn pronunciation(body: &[u8]) -> Result<PronunciationResult, RemoteError> {
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(map)) => Ok(PronunciationResult {
            transcription: map
                .get("transcription")
                .and_then(Value::as_str)
                .map(strip_timestamps)
                .unwrap_or_default(),
            score: map.get("score").and_then(score_value),
        }),
        Ok(Value::String(text)) => Ok(PronunciationResult {
            transcription: strip_timestamps(&text),
            score: None,
        }),
        Ok(other) => Ok(PronunciationResult {
            transcription: other.to_string(),
            score: None,
        }),
        Err(_) => Ok(PronunciationResult {
            transcription: strip_timestamps(body_text(body)?),
            score: None,
        }),
    }
}

fn score_value(value: &Value) -> Option<f64> {
    let score = match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    };
    score.filter(|score| score.is_finite())
}

fn body_text(body: &[u8]) -> Result<&str, RemoteError> {
    std::str::from_utf8(body).map_err(|e| RemoteError::Decode(format!("body is not UTF-8: {}", e)))
}
