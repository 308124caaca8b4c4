// Evaluations, their responses, and the store contract that persists them

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::survey::codec::{decode_for_display, DisplayAnswer};

/// Whether an evaluation records the baseline or the post-adoption state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Before,
    After,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Before => "before",
            Phase::After => "after",
        }
    }

    pub fn parse(value: &str) -> Option<Phase> {
        match value.trim().to_lowercase().as_str() {
            "before" => Some(Phase::Before),
            "after" => Some(Phase::After),
            _ => None,
        }
    }
}

impl Default for Phase {
    fn default() -> Self {
        Phase::Before
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationStatus {
    InProgress,
    Completed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Evaluation {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub description: Option<String>,
    pub phase: Phase,
    pub status: EvaluationStatus,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// One stored answer; immutable once written
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    pub id: String,
    pub evaluation_id: String,
    pub question_id: String,
    pub answer: String,
}

/// Listing view of an evaluation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationSummary {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub phase: Phase,
    pub status: EvaluationStatus,
    pub response_count: usize,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl EvaluationSummary {
    pub fn from_evaluation(evaluation: &Evaluation, response_count: usize) -> Self {
        Self {
            id: evaluation.id.clone(),
            name: evaluation.name.clone(),
            description: evaluation.description.clone(),
            phase: evaluation.phase,
            status: evaluation.status,
            response_count,
            created_at: evaluation.created_at,
            completed_at: evaluation.completed_at,
        }
    }
}

/// A response joined with the question it answers
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseDetail {
    pub question_id: String,
    pub question_text: String,
    pub question_category: Option<String>,
    #[serde(skip)]
    pub question_order: i32,
    pub answer: String,
}

impl ResponseDetail {
    /// The answer as it should be rendered. Unparsable content stays plain text.
    pub fn display_answer(&self) -> DisplayAnswer {
        decode_for_display(&self.answer)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationDetail {
    pub id: String,
    /// Owner of the evaluation; used for the access check, never sent to clients
    #[serde(skip_serializing, default)]
    pub owner_id: String,
    pub name: String,
    pub description: Option<String>,
    pub phase: Phase,
    pub status: EvaluationStatus,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Ordered by question order
    pub responses: Vec<ResponseDetail>,
}

impl EvaluationDetail {
    /// Group responses by question category, "Other" when a question has none.
    ///
    /// Groups appear in the order their first response appears.
    pub fn grouped_by_category(&self) -> Vec<(String, Vec<&ResponseDetail>)> {
        let mut groups: Vec<(String, Vec<&ResponseDetail>)> = Vec::new();
        for response in &self.responses {
            let category = response
                .question_category
                .clone()
                .unwrap_or_else(|| "Other".to_string());
            match groups.iter_mut().find(|(name, _)| *name == category) {
                Some((_, members)) => members.push(response),
                None => groups.push((category, vec![response])),
            }
        }
        groups
    }
}

/// Everything needed to create an evaluation and its responses in one unit
#[derive(Debug, Clone)]
pub struct NewEvaluation {
    pub owner_id: String,
    pub name: String,
    pub description: Option<String>,
    pub phase: Phase,
    /// question id -> encoded answer
    pub responses: BTreeMap<String, String>,
}

#[derive(Debug, Error)]
pub enum StoreError {
    /// The write would break a data constraint; nothing was written
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("Duplicate record: {0}")]
    Duplicate(String),

    #[error("Storage failure: {0}")]
    Io(String),
}

/// Persistence contract for evaluations
///
/// `create` is all-or-nothing: the evaluation row and every response row are
/// persisted together or not at all. Ownership checks are the caller's job.
#[async_trait]
pub trait EvaluationStore: Send + Sync {
    async fn create(&self, new: NewEvaluation) -> Result<Evaluation, StoreError>;

    async fn get_by_id(&self, id: &str) -> Result<Option<EvaluationDetail>, StoreError>;

    /// Newest first
    async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<EvaluationSummary>, StoreError>;

    async fn health_check(&self) -> bool;
}
