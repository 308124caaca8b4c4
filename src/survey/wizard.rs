//! Survey wizard state machine
//!
//! A wizard walks one user through the question catalog a step at a time,
//! validating the current answer before it lets them move forward, and hands
//! the finished draft to a [`Submitter`] exactly once per submit attempt.
//!
//! States:
//!
//! ```text
//!   AtStep(i) --advance/retreat--> AtStep(j)
//!   AtStep(N-1) --begin_submit--> Submitting --ok--> Submitted
//!                                            \--err--> Failed
//!   Failed --edit/navigate--> AtStep(i)
//!   Failed --begin_submit--> Submitting
//! ```
//!
//! Nothing is accepted while `Submitting`, and `Submitted` is terminal.

use serde::Serialize;
use thiserror::Error;

use super::codec::{self, AnswerValue};
use super::draft::{AnswerDraft, ValidationErrors};
use super::submission::{SubmissionError, Submitter};
use crate::error::{AppError, ErrorCode};
use crate::models::{EvaluationSummary, Question, QuestionKind};

pub const REQUIRED_MESSAGE: &str = "This field is required";
pub const SELECT_ONE_MESSAGE: &str = "Please select at least one option";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WizardError {
    #[error("A submission is already in progress")]
    SubmissionInProgress,

    #[error("This survey has already been submitted")]
    AlreadySubmitted,

    #[error("Submission is only possible from the last question")]
    NotAtFinalStep,

    #[error("No submission is in progress")]
    NotSubmitting,

    #[error("Unknown question '{0}'")]
    UnknownQuestion(String),

    #[error("{message}")]
    Validation { question_id: String, message: String },

    #[error("There are no active questions to answer")]
    EmptyCatalog,

    #[error("{0}")]
    Submission(SubmissionError),
}

impl From<WizardError> for AppError {
    fn from(err: WizardError) -> Self {
        match err {
            WizardError::Validation {
                question_id,
                message,
            } => AppError::field(&question_id, message),
            WizardError::UnknownQuestion(_) => AppError::Validation {
                message: err.to_string(),
                code: ErrorCode::InvalidInput,
                context: None,
            },
            WizardError::EmptyCatalog => AppError::Business {
                message: err.to_string(),
                code: ErrorCode::BusinessRuleViolation,
            },
            WizardError::Submission(inner) => inner.into(),
            WizardError::SubmissionInProgress
            | WizardError::AlreadySubmitted
            | WizardError::NotAtFinalStep
            | WizardError::NotSubmitting => AppError::invalid_operation(err.to_string()),
        }
    }
}

/// Externally visible state of a wizard
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WizardState {
    AtStep(usize),
    Submitting,
    Submitted,
    Failed,
}

impl WizardState {
    pub fn as_str(&self) -> &'static str {
        match self {
            WizardState::AtStep(_) => "at_step",
            WizardState::Submitting => "submitting",
            WizardState::Submitted => "submitted",
            WizardState::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifecycle {
    Editing,
    Submitting,
    Submitted,
    Failed,
}

/// Where the user is in the survey
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Progress {
    /// 1-based
    pub step_number: usize,
    pub total_steps: usize,
    pub percent_complete: u8,
    pub is_first: bool,
    pub is_last: bool,
}

/// Check one answer against its question's requirement.
///
/// Optional questions never fail. Multi-select answers are decoded first, so
/// a malformed or empty list counts as no selection.
pub fn validate_answer(question: &Question, raw: Option<&str>) -> Result<(), &'static str> {
    if !question.required {
        return Ok(());
    }

    let blank = match raw {
        None => true,
        Some(raw) => codec::decode(question.kind, raw).is_blank(),
    };
    if !blank {
        return Ok(());
    }

    match question.kind {
        QuestionKind::Multiselect => Err(SELECT_ONE_MESSAGE),
        _ => Err(REQUIRED_MESSAGE),
    }
}

#[derive(Debug, Clone)]
pub struct SurveyWizard {
    questions: Vec<Question>,
    step: usize,
    lifecycle: Lifecycle,
    draft: AnswerDraft,
    errors: ValidationErrors,
    last_error: Option<SubmissionError>,
    submitted: Option<EvaluationSummary>,
}

impl SurveyWizard {
    /// Start a wizard over a catalog. Questions are presented by ascending order.
    pub fn new(mut questions: Vec<Question>) -> Result<Self, WizardError> {
        if questions.is_empty() {
            return Err(WizardError::EmptyCatalog);
        }
        questions.sort_by_key(|q| q.order);

        Ok(Self {
            questions,
            step: 0,
            lifecycle: Lifecycle::Editing,
            draft: AnswerDraft::new(),
            errors: ValidationErrors::default(),
            last_error: None,
            submitted: None,
        })
    }

    pub fn state(&self) -> WizardState {
        match self.lifecycle {
            Lifecycle::Editing => WizardState::AtStep(self.step),
            Lifecycle::Submitting => WizardState::Submitting,
            Lifecycle::Submitted => WizardState::Submitted,
            Lifecycle::Failed => WizardState::Failed,
        }
    }

    /// Index of the current question, kept through the submit lifecycle
    pub fn step(&self) -> usize {
        self.step
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn current_question(&self) -> &Question {
        &self.questions[self.step]
    }

    pub fn question(&self, question_id: &str) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == question_id)
    }

    pub fn draft(&self) -> &AnswerDraft {
        &self.draft
    }

    pub fn errors(&self) -> &ValidationErrors {
        &self.errors
    }

    /// Why the last submit attempt failed, while in `Failed`
    pub fn last_error(&self) -> Option<&SubmissionError> {
        self.last_error.as_ref()
    }

    /// The created evaluation once `Submitted`
    pub fn submitted(&self) -> Option<&EvaluationSummary> {
        self.submitted.as_ref()
    }

    /// The decoded draft value for a question
    pub fn answer(&self, question_id: &str) -> Option<AnswerValue> {
        let question = self.question(question_id)?;
        self.draft
            .get(question_id)
            .map(|raw| codec::decode(question.kind, raw))
    }

    pub fn progress(&self) -> Progress {
        let total = self.questions.len();
        let percent = ((self.step + 1) as f64 / total as f64 * 100.0).round();
        Progress {
            step_number: self.step + 1,
            total_steps: total,
            percent_complete: percent as u8,
            is_first: self.step == 0,
            is_last: self.step + 1 == total,
        }
    }

    /// Move forward if the current answer passes validation.
    ///
    /// At the last step a passing answer leaves the step where it is.
    pub fn advance(&mut self) -> Result<usize, WizardError> {
        self.ensure_editable()?;
        self.validate_current()?;
        self.step = (self.step + 1).min(self.questions.len() - 1);
        Ok(self.step)
    }

    /// Move back one step without validating
    pub fn retreat(&mut self) -> Result<usize, WizardError> {
        self.ensure_editable()?;
        self.step = self.step.saturating_sub(1);
        self.errors.clear();
        Ok(self.step)
    }

    /// Overwrite the raw draft value for a question.
    ///
    /// The error shown for that question is dropped; the new value is only
    /// checked on the next advance or submit.
    pub fn set_answer(
        &mut self,
        question_id: &str,
        value: impl Into<String>,
    ) -> Result<(), WizardError> {
        self.ensure_known(question_id)?;
        self.ensure_editable()?;
        self.draft.set(question_id, value);
        self.errors.clear_for(question_id);
        Ok(())
    }

    /// Store a typed value, encoding it for the question's kind
    pub fn set_value(&mut self, question_id: &str, value: &AnswerValue) -> Result<(), WizardError> {
        let kind = self.ensure_known(question_id)?;
        self.set_answer(question_id, codec::encode(kind, value))
    }

    /// Store a multi-select answer
    pub fn set_selections(
        &mut self,
        question_id: &str,
        selected: &[String],
    ) -> Result<(), WizardError> {
        self.set_answer(question_id, codec::encode_selections(selected))
    }

    /// Forget the answer to a question
    pub fn clear_answer(&mut self, question_id: &str) -> Result<(), WizardError> {
        self.ensure_known(question_id)?;
        self.ensure_editable()?;
        self.draft.remove(question_id);
        self.errors.clear_for(question_id);
        Ok(())
    }

    /// Validate the final step and enter `Submitting`.
    ///
    /// Returns the payload to hand to the submitter. The caller must report
    /// the outcome through [`SurveyWizard::finish_submit`].
    pub fn begin_submit(&mut self) -> Result<AnswerDraft, WizardError> {
        match self.lifecycle {
            Lifecycle::Submitting => return Err(WizardError::SubmissionInProgress),
            Lifecycle::Submitted => return Err(WizardError::AlreadySubmitted),
            Lifecycle::Editing | Lifecycle::Failed => {}
        }
        if self.step + 1 != self.questions.len() {
            return Err(WizardError::NotAtFinalStep);
        }
        self.validate_current()?;

        self.lifecycle = Lifecycle::Submitting;
        self.last_error = None;
        log::debug!(
            "Submitting survey draft with {} answers",
            self.draft.len()
        );
        Ok(self.draft.clone())
    }

    /// Apply the outcome of the submit started by `begin_submit`
    pub fn finish_submit(
        &mut self,
        outcome: Result<EvaluationSummary, SubmissionError>,
    ) -> Result<(), WizardError> {
        if self.lifecycle != Lifecycle::Submitting {
            return Err(WizardError::NotSubmitting);
        }
        match outcome {
            Ok(summary) => {
                self.lifecycle = Lifecycle::Submitted;
                self.submitted = Some(summary);
            }
            Err(err) => {
                log::warn!("Survey submission failed: {}", err);
                self.lifecycle = Lifecycle::Failed;
                self.last_error = Some(err);
            }
        }
        Ok(())
    }

    /// Submit through an exclusively owned wizard
    pub async fn submit<S>(&mut self, submitter: &S) -> Result<EvaluationSummary, WizardError>
    where
        S: Submitter + ?Sized,
    {
        let payload = self.begin_submit()?;
        let outcome = submitter.submit(&payload).await;
        let result = outcome.clone().map_err(WizardError::Submission);
        self.finish_submit(outcome)?;
        result
    }

    fn ensure_editable(&mut self) -> Result<(), WizardError> {
        match self.lifecycle {
            Lifecycle::Editing => Ok(()),
            Lifecycle::Submitting => Err(WizardError::SubmissionInProgress),
            Lifecycle::Submitted => Err(WizardError::AlreadySubmitted),
            Lifecycle::Failed => {
                self.lifecycle = Lifecycle::Editing;
                self.last_error = None;
                Ok(())
            }
        }
    }

    fn ensure_known(&self, question_id: &str) -> Result<QuestionKind, WizardError> {
        self.question(question_id)
            .map(|q| q.kind)
            .ok_or_else(|| WizardError::UnknownQuestion(question_id.to_string()))
    }

    fn validate_current(&mut self) -> Result<(), WizardError> {
        let question = &self.questions[self.step];
        match validate_answer(question, self.draft.get(&question.id)) {
            Ok(()) => {
                self.errors.clear();
                Ok(())
            }
            Err(message) => {
                let question_id = question.id.clone();
                self.errors.replace_with(&question_id, message);
                Err(WizardError::Validation {
                    question_id,
                    message: message.to_string(),
                })
            }
        }
    }
}
