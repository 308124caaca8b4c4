// In-progress answers and per-question validation messages

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Unsaved answers, question id -> encoded value.
///
/// Unanswered questions are absent, never stored as empty strings by the
/// wizard itself.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnswerDraft(BTreeMap<String, String>);

impl AnswerDraft {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, question_id: &str) -> Option<&str> {
        self.0.get(question_id).map(String::as_str)
    }

    pub fn set(&mut self, question_id: impl Into<String>, value: impl Into<String>) {
        self.0.insert(question_id.into(), value.into());
    }

    pub fn remove(&mut self, question_id: &str) -> Option<String> {
        self.0.remove(question_id)
    }

    pub fn contains(&self, question_id: &str) -> bool {
        self.0.contains_key(question_id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.0.iter()
    }

    pub fn as_map(&self) -> &BTreeMap<String, String> {
        &self.0
    }

    pub fn into_map(self) -> BTreeMap<String, String> {
        self.0
    }
}

impl From<BTreeMap<String, String>> for AnswerDraft {
    fn from(map: BTreeMap<String, String>) -> Self {
        Self(map)
    }
}

/// Validation messages keyed by question id
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<String, String>);

impl ValidationErrors {
    pub fn get(&self, question_id: &str) -> Option<&str> {
        self.0.get(question_id).map(String::as_str)
    }

    /// Replace every recorded error with a single one
    pub fn replace_with(&mut self, question_id: &str, message: &str) {
        self.0.clear();
        self.0.insert(question_id.to_string(), message.to_string());
    }

    pub fn clear_for(&mut self, question_id: &str) -> bool {
        self.0.remove(question_id).is_some()
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_draft_serializes_as_plain_map() {
        let mut draft = AnswerDraft::new();
        draft.set("q1", "Finance");
        draft.set("q3", r#"["Code Review"]"#);
        let json = serde_json::to_string(&draft).unwrap();
        assert_eq!(json, r#"{"q1":"Finance","q3":"[\"Code Review\"]"}"#);
    }

    #[test]
    fn test_replace_with_drops_prior_errors() {
        let mut errors = ValidationErrors::default();
        errors.replace_with("q1", "This field is required");
        errors.replace_with("q2", "Please select at least one option");
        assert_eq!(errors.len(), 1);
        assert!(errors.get("q1").is_none());
        assert!(errors.clear_for("q2"));
        assert!(errors.is_empty());
    }
}
