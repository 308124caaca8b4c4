//! Survey session registry
//!
//! Holds the in-progress wizards of every signed-in user, keyed by a
//! generated survey id. Sessions belong to the identity that created them;
//! anyone else gets an authorization error.
//!
//! The map lock is never held across an await. Submission takes the payload
//! with `begin_submit` under the lock, releases it for the store call, and
//! reports the outcome afterwards, so a concurrent second submit is rejected
//! by the wizard itself. If the submitting future is dropped before the store
//! answers, the session is moved to `Failed` so it can be retried or discarded.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use super::codec::AnswerValue;
use super::draft::ValidationErrors;
use super::setup::EvaluationHeader;
use super::submission::{SubmissionCoordinator, SubmissionError};
use super::wizard::{Progress, SurveyWizard, WizardState};
use crate::error::{AppError, AppResult};
use crate::models::{EvaluationSummary, Identity, Phase, Question};
use crate::utils::{generate_id, lock_mutex_recover};

/// Idle sessions older than this are dropped by the cleanup task (24 hours)
pub const SESSION_IDLE_TIMEOUT_HOURS: i64 = 24;

/// Cleanup interval (10 minutes)
const CLEANUP_INTERVAL: std::time::Duration = std::time::Duration::from_secs(10 * 60);

/// One user's survey in progress
#[derive(Debug, Clone)]
pub struct SurveySession {
    pub id: String,
    pub owner_id: String,
    pub header: EvaluationHeader,
    pub wizard: SurveyWizard,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SurveySession {
    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    pub fn view(&self) -> SurveyView {
        let wizard = &self.wizard;
        let answers = wizard
            .draft()
            .iter()
            .filter_map(|(id, _)| wizard.answer(id).map(|value| (id.clone(), value)))
            .collect();

        SurveyView {
            id: self.id.clone(),
            name: self.header.name.clone(),
            description: self.header.description.clone(),
            phase: self.header.phase,
            state: wizard.state().as_str(),
            step: wizard.step(),
            progress: wizard.progress(),
            current_question: wizard.current_question().clone(),
            answers,
            errors: wizard.errors().clone(),
            last_error: wizard.last_error().map(ToString::to_string),
            evaluation: wizard.submitted().cloned(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Client view of a survey session
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SurveyView {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub phase: Phase,
    pub state: &'static str,
    pub step: usize,
    pub progress: Progress,
    pub current_question: Question,
    pub answers: BTreeMap<String, AnswerValue>,
    pub errors: ValidationErrors,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evaluation: Option<EvaluationSummary>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Default)]
pub struct SurveyRegistry {
    sessions: Mutex<HashMap<String, SurveySession>>,
}

impl SurveyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a survey over the given catalog
    pub fn create(
        &self,
        owner: &Identity,
        header: EvaluationHeader,
        questions: Vec<Question>,
    ) -> AppResult<SurveyView> {
        let wizard = SurveyWizard::new(questions)?;
        let now = Utc::now();
        let session = SurveySession {
            id: generate_id(),
            owner_id: owner.user_id.clone(),
            header,
            wizard,
            created_at: now,
            updated_at: now,
        };
        let view = session.view();

        lock_mutex_recover(&self.sessions).insert(session.id.clone(), session);
        log::info!("Started survey {} for user {}", view.id, owner.user_id);
        Ok(view)
    }

    pub fn view(&self, survey_id: &str, owner: &Identity) -> AppResult<SurveyView> {
        self.with_session(survey_id, owner, |session| Ok(session.view()))
    }

    /// Run `f` against an owned session and return its view afterwards.
    ///
    /// The session's timestamp is bumped even if `f` fails, since a failed
    /// validation still changes the recorded errors.
    pub fn update<F>(&self, survey_id: &str, owner: &Identity, f: F) -> AppResult<SurveyView>
    where
        F: FnOnce(&mut SurveyWizard) -> AppResult<()>,
    {
        self.with_session(survey_id, owner, |session| {
            let result = f(&mut session.wizard);
            session.touch();
            result.map(|_| session.view())
        })
    }

    /// Submit a survey through the coordinator
    pub async fn submit(
        &self,
        survey_id: &str,
        coordinator: &SubmissionCoordinator,
    ) -> AppResult<(EvaluationSummary, SurveyView)> {
        let owner = coordinator.owner();
        let (header, payload) = self.with_session(survey_id, owner, |session| {
            let payload = session.wizard.begin_submit()?;
            session.touch();
            Ok((session.header.clone(), payload))
        })?;

        let mut pending = PendingSubmit {
            registry: self,
            survey_id,
            owner,
            armed: true,
        };
        let outcome = coordinator.create_evaluation(&header, &payload).await;
        pending.armed = false;

        let view = self.with_session(survey_id, owner, |session| {
            session.wizard.finish_submit(outcome.clone())?;
            session.touch();
            Ok(session.view())
        })?;

        match outcome {
            Ok(summary) => {
                log::info!("Survey {} submitted as evaluation {}", survey_id, summary.id);
                Ok((summary, view))
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Discard a survey
    pub fn remove(&self, survey_id: &str, owner: &Identity) -> AppResult<()> {
        let mut sessions = lock_mutex_recover(&self.sessions);
        match sessions.get(survey_id) {
            None => Err(AppError::not_found("Survey")),
            Some(session) if session.owner_id != owner.user_id => Err(AppError::forbidden(
                "You do not have access to this survey",
            )),
            Some(session) if session.wizard.state() == WizardState::Submitting => Err(
                AppError::invalid_operation("A submission is already in progress"),
            ),
            Some(_) => {
                sessions.remove(survey_id);
                log::info!("Discarded survey {}", survey_id);
                Ok(())
            }
        }
    }

    pub fn len(&self) -> usize {
        lock_mutex_recover(&self.sessions).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop sessions idle for longer than `max_idle`. In-flight submissions are kept.
    pub fn cleanup_stale_sessions(&self, max_idle: Duration) -> usize {
        let cutoff = Utc::now() - max_idle;
        let mut sessions = lock_mutex_recover(&self.sessions);
        let before = sessions.len();
        sessions.retain(|_, session| {
            session.updated_at > cutoff || session.wizard.state() == WizardState::Submitting
        });
        let removed = before - sessions.len();
        if removed > 0 {
            log::info!("Cleaned up {} stale survey sessions", removed);
        }
        removed
    }

    /// Start the cleanup task
    pub fn start_cleanup_task(registry: Arc<Self>) {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(CLEANUP_INTERVAL);
            loop {
                interval.tick().await;
                registry.cleanup_stale_sessions(Duration::hours(SESSION_IDLE_TIMEOUT_HOURS));
            }
        });
    }

    fn with_session<R, F>(&self, survey_id: &str, owner: &Identity, f: F) -> AppResult<R>
    where
        F: FnOnce(&mut SurveySession) -> AppResult<R>,
    {
        let mut sessions = lock_mutex_recover(&self.sessions);
        let session = sessions
            .get_mut(survey_id)
            .ok_or_else(|| AppError::not_found("Survey"))?;
        if session.owner_id != owner.user_id {
            return Err(AppError::forbidden("You do not have access to this survey"));
        }
        f(session)
    }
}

/// Fails the submission if `submit` is dropped while the store call is pending
struct PendingSubmit<'a> {
    registry: &'a SurveyRegistry,
    survey_id: &'a str,
    owner: &'a Identity,
    armed: bool,
}

impl Drop for PendingSubmit<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let result = self
            .registry
            .with_session(self.survey_id, self.owner, |session| {
                session.wizard.finish_submit(Err(SubmissionError::Store(
                    "Submission was cancelled".to_string(),
                )))?;
                session.touch();
                Ok(())
            });
        match result {
            Ok(()) => log::warn!("Submission of survey {} was cancelled", self.survey_id),
            Err(e) => log::warn!(
                "Could not release cancelled submission of survey {}: {}",
                self.survey_id,
                e
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::models::{
        Evaluation, EvaluationDetail, EvaluationStatus, EvaluationStore, NewEvaluation,
        QuestionKind, StoreError,
    };
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Notify;

    /// Store that fails its first `failures` creates and, when `hold` is set,
    /// waits on `gate` before answering
    #[derive(Default)]
    struct TestStore {
        gate: Notify,
        hold: bool,
        failures: usize,
        calls: AtomicUsize,
    }

    impl TestStore {
        fn held() -> Self {
            Self {
                hold: true,
                ..Self::default()
            }
        }

        fn failing(failures: usize) -> Self {
            Self {
                failures,
                ..Self::default()
            }
        }
    }

    #[async_trait]
    impl EvaluationStore for TestStore {
        async fn create(&self, new: NewEvaluation) -> Result<Evaluation, StoreError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if self.hold {
                self.gate.notified().await;
            }
            if call < self.failures {
                return Err(StoreError::Io("disk unavailable".to_string()));
            }
            let now = Utc::now();
            Ok(Evaluation {
                id: format!("eval-{}", call),
                user_id: new.owner_id,
                name: new.name,
                description: new.description,
                phase: new.phase,
                status: EvaluationStatus::Completed,
                created_at: now,
                completed_at: Some(now),
            })
        }

        async fn get_by_id(&self, _id: &str) -> Result<Option<EvaluationDetail>, StoreError> {
            Ok(None)
        }

        async fn list_by_owner(
            &self,
            _owner_id: &str,
        ) -> Result<Vec<EvaluationSummary>, StoreError> {
            Ok(Vec::new())
        }

        async fn health_check(&self) -> bool {
            true
        }
    }

    /// Start a survey and answer it up to the final step
    fn answered_survey(registry: &SurveyRegistry, owner: &Identity) -> String {
        let view = registry.create(owner, header(), questions()).unwrap();
        registry
            .update(&view.id, owner, |wizard| {
                wizard.set_answer("q1", "Finance")?;
                wizard.advance()?;
                wizard.set_selections("q2", &["Deployment".to_string()])?;
                Ok(())
            })
            .unwrap();
        view.id
    }

    /// Submit, giving up after 20ms so the pending store call is dropped
    async fn cancelled_submit(
        registry: &SurveyRegistry,
        survey_id: &str,
        coordinator: &SubmissionCoordinator,
    ) {
        let result = tokio::time::timeout(
            std::time::Duration::from_millis(20),
            registry.submit(survey_id, coordinator),
        )
        .await;
        assert!(result.is_err());
    }

    fn identity(id: &str) -> Identity {
        Identity {
            user_id: id.to_string(),
            email: format!("{}@example.com", id),
            name: None,
        }
    }

    fn header() -> EvaluationHeader {
        EvaluationHeader {
            name: "Q1 baseline".into(),
            description: None,
            phase: Phase::Before,
        }
    }

    fn questions() -> Vec<Question> {
        vec![
            Question::new("q1", 1, "Domain?", QuestionKind::Text).required(),
            Question::new("q2", 2, "Phases?", QuestionKind::Multiselect)
                .required()
                .with_options(["Testing & QA", "Deployment"]),
        ]
    }

    #[test]
    fn test_create_and_view() {
        let registry = SurveyRegistry::new();
        let view = registry.create(&identity("u1"), header(), questions()).unwrap();
        assert_eq!(view.state, "at_step");
        assert_eq!(view.progress.total_steps, 2);
        assert_eq!(view.current_question.id, "q1");
        assert_eq!(registry.len(), 1);

        let again = registry.view(&view.id, &identity("u1")).unwrap();
        assert_eq!(again.id, view.id);
    }

    #[test]
    fn test_other_owner_is_forbidden() {
        let registry = SurveyRegistry::new();
        let view = registry.create(&identity("u1"), header(), questions()).unwrap();

        let err = registry.view(&view.id, &identity("u2")).unwrap_err();
        assert!(matches!(err, AppError::Authorization(_)));
        let err = registry.remove(&view.id, &identity("u2")).unwrap_err();
        assert!(matches!(err, AppError::Authorization(_)));
        assert!(matches!(
            registry.view("missing", &identity("u1")).unwrap_err(),
            AppError::NotFound(_)
        ));
    }

    #[test]
    fn test_update_returns_decoded_answers() {
        let registry = SurveyRegistry::new();
        let owner = identity("u1");
        let view = registry.create(&owner, header(), questions()).unwrap();

        let view = registry
            .update(&view.id, &owner, |wizard| {
                wizard.set_answer("q1", "Finance")?;
                wizard.advance()?;
                wizard.set_selections("q2", &["Deployment".to_string()])?;
                Ok(())
            })
            .unwrap();
        assert_eq!(view.step, 1);
        assert_eq!(
            view.answers.get("q2"),
            Some(&AnswerValue::Selections(vec!["Deployment".into()]))
        );
    }

    #[test]
    fn test_failed_update_keeps_errors_visible() {
        let registry = SurveyRegistry::new();
        let owner = identity("u1");
        let view = registry.create(&owner, header(), questions()).unwrap();

        let err = registry
            .update(&view.id, &owner, |wizard| wizard.advance().map(|_| ()).map_err(Into::into))
            .unwrap_err();
        assert_eq!(err.to_string(), "This field is required");

        let view = registry.view(&view.id, &owner).unwrap();
        assert_eq!(view.errors.get("q1"), Some("This field is required"));
    }

    #[test]
    fn test_cleanup_stale_sessions() {
        let registry = SurveyRegistry::new();
        registry.create(&identity("u1"), header(), questions()).unwrap();
        assert_eq!(registry.cleanup_stale_sessions(Duration::hours(1)), 0);
        assert_eq!(registry.cleanup_stale_sessions(Duration::seconds(-1)), 1);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_empty_catalog_cannot_start() {
        let registry = SurveyRegistry::new();
        assert!(registry.create(&identity("u1"), header(), vec![]).is_err());
    }

    #[tokio::test]
    async fn test_cancelled_submit_can_be_retried_or_discarded() {
        let registry = SurveyRegistry::new();
        let owner = identity("u1");
        let slow = SubmissionCoordinator::new(Arc::new(TestStore::held()), owner.clone());
        let first = answered_survey(&registry, &owner);
        let second = answered_survey(&registry, &owner);
        let third = answered_survey(&registry, &owner);

        cancelled_submit(&registry, &first, &slow).await;
        let view = registry.view(&first, &owner).unwrap();
        assert_eq!(view.state, "failed");
        assert_eq!(view.last_error.as_deref(), Some("Submission was cancelled"));
        assert_eq!(view.answers.len(), 2);

        let ready = SubmissionCoordinator::new(Arc::new(TestStore::default()), owner.clone());
        let (summary, view) = registry.submit(&first, &ready).await.unwrap();
        assert_eq!(summary.id, "eval-0");
        assert_eq!(view.state, "submitted");

        cancelled_submit(&registry, &second, &slow).await;
        registry.remove(&second, &owner).unwrap();

        cancelled_submit(&registry, &third, &slow).await;
        assert_eq!(registry.cleanup_stale_sessions(Duration::seconds(-1)), 2);
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_pending_submit_blocks_resubmit_discard_and_cleanup() {
        let registry = Arc::new(SurveyRegistry::new());
        let owner = identity("u1");
        let store = Arc::new(TestStore::held());
        let coordinator = SubmissionCoordinator::new(store.clone(), owner.clone());
        let survey_id = answered_survey(&registry, &owner);

        let pending = tokio::spawn({
            let registry = registry.clone();
            let coordinator = coordinator.clone();
            let survey_id = survey_id.clone();
            async move { registry.submit(&survey_id, &coordinator).await }
        });
        while store.calls.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }
        assert_eq!(registry.view(&survey_id, &owner).unwrap().state, "submitting");

        let err = registry.submit(&survey_id, &coordinator).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidOperation);
        let err = registry.remove(&survey_id, &owner).unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidOperation);
        assert_eq!(registry.cleanup_stale_sessions(Duration::seconds(-1)), 0);
        assert_eq!(registry.len(), 1);

        store.gate.notify_one();
        let (summary, view) = pending.await.unwrap().unwrap();
        assert_eq!(view.state, "submitted");
        assert_eq!(view.evaluation.map(|e| e.id), Some(summary.id));
        assert_eq!(store.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_submit_then_retry() {
        let registry = SurveyRegistry::new();
        let owner = identity("u1");
        let store = Arc::new(TestStore::failing(1));
        let coordinator = SubmissionCoordinator::new(store.clone(), owner.clone());
        let survey_id = answered_survey(&registry, &owner);

        let err = registry.submit(&survey_id, &coordinator).await.unwrap_err();
        assert!(matches!(err, AppError::Store { .. }));
        let view = registry.view(&survey_id, &owner).unwrap();
        assert_eq!(view.state, "failed");
        assert!(view.last_error.is_some());
        assert_eq!(view.answers.len(), 2);

        let (summary, view) = registry.submit(&survey_id, &coordinator).await.unwrap();
        assert_eq!(summary.id, "eval-1");
        assert_eq!(view.state, "submitted");
        assert!(view.last_error.is_none());

        let err = registry.submit(&survey_id, &coordinator).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidOperation);
        assert_eq!(store.calls.load(Ordering::SeqCst), 2);
    }
}
