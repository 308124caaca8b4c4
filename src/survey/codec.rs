//! Answer encoding
//!
//! Every answer travels and is stored as a string. Multi-select answers are a
//! JSON array of the selected option strings; all other kinds keep the raw
//! text.
//!
//! Decoding is deliberately lenient, and lenient in two different ways:
//!
//! * [`decode`] / [`decode_selections`] serve the input side (wizard
//!   validation, re-populating checkboxes). Malformed multi-select content is
//!   treated as "no selection" so a corrupted draft can never satisfy a
//!   required question.
//! * [`decode_for_display`] serves the read side (evaluation details).
//!   Content that is not a JSON array of strings is shown as the raw string,
//!   so nothing a user once typed is hidden.
//!
//! The two fallbacks differ on the same malformed input. Keep them separate.

use serde::{Deserialize, Serialize};

use crate::models::QuestionKind;

/// A decoded answer value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnswerValue {
    Text(String),
    Selections(Vec<String>),
}

impl AnswerValue {
    /// True when nothing meaningful was entered or selected
    pub fn is_blank(&self) -> bool {
        match self {
            AnswerValue::Text(text) => text.trim().is_empty(),
            AnswerValue::Selections(selected) => selected.is_empty(),
        }
    }
}

/// How a stored answer should be rendered
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum DisplayAnswer {
    Text(String),
    List(Vec<String>),
}

/// Encode a value for the draft or the store
pub fn encode(kind: QuestionKind, value: &AnswerValue) -> String {
    match (kind, value) {
        (QuestionKind::Multiselect, AnswerValue::Selections(selected)) => {
            encode_selections(selected)
        }
        (QuestionKind::Multiselect, AnswerValue::Text(raw)) => raw.clone(),
        // Single-valued kinds keep the text; a stray list collapses to its first entry
        (_, AnswerValue::Text(raw)) => raw.clone(),
        (_, AnswerValue::Selections(selected)) => selected.first().cloned().unwrap_or_default(),
    }
}

/// Multi-select encoding: a JSON array string
pub fn encode_selections(selected: &[String]) -> String {
    serde_json::to_string(selected).unwrap_or_else(|_| "[]".to_string())
}

/// Decode a stored string for the input side
pub fn decode(kind: QuestionKind, raw: &str) -> AnswerValue {
    match kind {
        QuestionKind::Multiselect => AnswerValue::Selections(decode_selections(raw)),
        _ => AnswerValue::Text(raw.to_string()),
    }
}

/// Parse a multi-select answer, falling back to "no selection" on malformed input
pub fn decode_selections(raw: &str) -> Vec<String> {
    if raw.trim().is_empty() {
        return Vec::new();
    }
    match serde_json::from_str::<Vec<String>>(raw) {
        Ok(selected) => selected,
        Err(e) => {
            log::debug!("Treating malformed multi-select answer as empty: {}", e);
            Vec::new()
        }
    }
}

/// Decode a stored answer for display, falling back to the raw string
pub fn decode_for_display(raw: &str) -> DisplayAnswer {
    match serde_json::from_str::<Vec<String>>(raw) {
        Ok(items) => DisplayAnswer::List(items),
        Err(_) => DisplayAnswer::Text(raw.to_string()),
    }
}
