//! Submission coordinator
//!
//! Packages a survey header and the complete answer draft into a single
//! create request against the evaluation store. There are no retries here:
//! the wizard moves to `Failed` and the user decides whether to submit again.

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

use super::draft::AnswerDraft;
use super::setup::EvaluationHeader;
use crate::error::{AppError, ErrorCode};
use crate::models::{EvaluationStore, EvaluationSummary, Identity, NewEvaluation, StoreError};

/// Why a submission did not persist
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmissionError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Authentication(String),

    #[error("{0}")]
    Authorization(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    Store(String),
}

impl SubmissionError {
    pub fn code(&self) -> ErrorCode {
        match self {
            SubmissionError::Validation(_) => ErrorCode::ConstraintViolation,
            SubmissionError::Authentication(_) => ErrorCode::Unauthorized,
            SubmissionError::Authorization(_) => ErrorCode::InsufficientPermissions,
            SubmissionError::NotFound(_) => ErrorCode::RecordNotFound,
            SubmissionError::Store(_) => ErrorCode::DatabaseError,
        }
    }

    /// HTTP-style status class of the failure
    pub fn status_class(&self) -> u16 {
        match self {
            SubmissionError::Validation(_) => 400,
            SubmissionError::Authentication(_) => 401,
            SubmissionError::Authorization(_) => 403,
            SubmissionError::NotFound(_) => 404,
            SubmissionError::Store(_) => 500,
        }
    }
}

impl From<StoreError> for SubmissionError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::ConstraintViolation(msg) | StoreError::Duplicate(msg) => {
                SubmissionError::Validation(msg)
            }
            StoreError::Io(msg) => SubmissionError::Store(msg),
        }
    }
}

impl From<SubmissionError> for AppError {
    fn from(err: SubmissionError) -> Self {
        match err {
            SubmissionError::Validation(message) => AppError::Store {
                message,
                code: ErrorCode::ConstraintViolation,
            },
            SubmissionError::Authentication(message) => AppError::unauthenticated(message),
            SubmissionError::Authorization(message) => AppError::forbidden(message),
            SubmissionError::NotFound(resource) => AppError::not_found(resource),
            SubmissionError::Store(message) => AppError::store(message),
        }
    }
}

/// Something the wizard can hand its finished draft to
#[async_trait]
pub trait Submitter: Send + Sync {
    async fn submit(&self, draft: &AnswerDraft) -> Result<EvaluationSummary, SubmissionError>;
}

/// Creates evaluations on behalf of one caller
#[derive(Clone)]
pub struct SubmissionCoordinator {
    store: Arc<dyn EvaluationStore>,
    owner: Identity,
}

impl SubmissionCoordinator {
    pub fn new(store: Arc<dyn EvaluationStore>, owner: Identity) -> Self {
        Self { store, owner }
    }

    pub fn owner(&self) -> &Identity {
        &self.owner
    }

    /// Persist header and answers as one evaluation. Exactly one store call.
    pub async fn create_evaluation(
        &self,
        header: &EvaluationHeader,
        draft: &AnswerDraft,
    ) -> Result<EvaluationSummary, SubmissionError> {
        if self.owner.user_id.is_empty() {
            return Err(SubmissionError::Authentication(
                "Authentication required".to_string(),
            ));
        }

        let new = NewEvaluation {
            owner_id: self.owner.user_id.clone(),
            name: header.name.clone(),
            description: header.description.clone(),
            phase: header.phase,
            responses: draft.as_map().clone(),
        };
        let response_count = new.responses.len();

        log::info!(
            "Creating evaluation '{}' ({}) for user {} with {} responses",
            header.name,
            header.phase.as_str(),
            self.owner.user_id,
            response_count
        );

        match self.store.create(new).await {
            Ok(evaluation) => {
                log::info!(
                    "Evaluation {} created for user {}",
                    evaluation.id,
                    self.owner.user_id
                );
                Ok(EvaluationSummary::from_evaluation(&evaluation, response_count))
            }
            Err(e) => {
                log::warn!("Failed to create evaluation '{}': {}", header.name, e);
                Err(e.into())
            }
        }
    }

    /// Bind a header so the coordinator can act as the wizard's [`Submitter`]
    pub fn with_header<'a>(&'a self, header: &'a EvaluationHeader) -> HeaderedSubmission<'a> {
        HeaderedSubmission {
            coordinator: self,
            header,
        }
    }
}

pub struct HeaderedSubmission<'a> {
    coordinator: &'a SubmissionCoordinator,
    header: &'a EvaluationHeader,
}

#[async_trait]
impl Submitter for HeaderedSubmission<'_> {
    async fn submit(&self, draft: &AnswerDraft) -> Result<EvaluationSummary, SubmissionError> {
        self.coordinator.create_evaluation(self.header, draft).await
    }
}
