// Survey question definitions

use serde::{Deserialize, Serialize};

/// Input kind of a question
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionKind {
    /// Single-line free text
    Text,
    /// Multi-line free text
    Textarea,
    /// Exactly one of `options`
    Select,
    /// Any subset of `options`, stored as a JSON array string
    Multiselect,
}

impl QuestionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionKind::Text => "text",
            QuestionKind::Textarea => "textarea",
            QuestionKind::Select => "select",
            QuestionKind::Multiselect => "multiselect",
        }
    }

    /// Whether the question offers a fixed list of options
    pub fn has_options(&self) -> bool {
        matches!(self, QuestionKind::Select | QuestionKind::Multiselect)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    /// Stable identifier, referenced by stored responses
    pub id: String,
    /// Position in the survey (ascending)
    pub order: i32,
    pub text: String,
    #[serde(rename = "type")]
    pub kind: QuestionKind,
    pub required: bool,
    /// Inactive questions are hidden from new surveys but still resolve for old responses
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default)]
    pub placeholder: Option<String>,
    #[serde(default)]
    pub help_text: Option<String>,
}

fn default_true() -> bool {
    true
}

impl Question {
    pub fn new(id: impl Into<String>, order: i32, text: impl Into<String>, kind: QuestionKind) -> Self {
        Self {
            id: id.into(),
            order,
            text: text.into(),
            kind,
            required: false,
            active: true,
            category: None,
            options: Vec::new(),
            placeholder: None,
            help_text: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options = options.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = Some(placeholder.into());
        self
    }

    pub fn with_help_text(mut self, help_text: impl Into<String>) -> Self {
        self.help_text = Some(help_text.into());
        self
    }

    /// Check that the definition itself is usable
    pub fn check_definition(&self) -> Result<(), String> {
        if self.id.trim().is_empty() {
            return Err("Question id must not be empty".to_string());
        }
        if self.text.trim().is_empty() {
            return Err(format!("Question '{}' has no text", self.id));
        }
        if self.kind.has_options() && self.options.is_empty() {
            return Err(format!(
                "Question '{}' is a {} question without options",
                self.id,
                self.kind.as_str()
            ));
        }
        if !self.kind.has_options() && !self.options.is_empty() {
            return Err(format!(
                "Question '{}' is a {} question but defines options",
                self.id,
                self.kind.as_str()
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_wire_names() {
        let json = serde_json::to_string(&QuestionKind::Multiselect).unwrap();
        assert_eq!(json, "\"multiselect\"");
        let kind: QuestionKind = serde_json::from_str("\"textarea\"").unwrap();
        assert_eq!(kind, QuestionKind::Textarea);
    }

    #[test]
    fn test_question_serializes_type_field() {
        let q = Question::new("q1", 1, "Domain?", QuestionKind::Text)
            .required()
            .with_help_text("Primary industry");
        let value = serde_json::to_value(&q).unwrap();
        assert_eq!(value["type"], "text");
        assert_eq!(value["helpText"], "Primary industry");
        assert_eq!(value["required"], true);
    }

    #[test]
    fn test_check_definition() {
        let select = Question::new("q2", 2, "Method?", QuestionKind::Select);
        assert!(select.check_definition().is_err());

        let select = select.with_options(["Scrum", "Kanban"]);
        assert!(select.check_definition().is_ok());

        let text = Question::new("q3", 3, "Why?", QuestionKind::Text).with_options(["x"]);
        assert!(text.check_definition().is_err());
    }

    #[test]
    fn test_missing_optional_fields_default() {
        let q: Question = serde_json::from_str(
            r#"{"id":"q1","order":1,"text":"Domain?","type":"text","required":true}"#,
        )
        .unwrap();
        assert!(q.active);
        assert!(q.options.is_empty());
        assert!(q.category.is_none());
    }
}
