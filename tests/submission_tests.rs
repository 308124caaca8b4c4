//! Wizard submission against real and failing stores

use ai_survey_lib::file_storage::{questions::default_questions, FileEvaluationStore, QuestionCatalog};
use ai_survey_lib::models::{
    Evaluation, EvaluationDetail, EvaluationStore, EvaluationSummary, Identity, NewEvaluation,
    Phase, StoreError,
};
use ai_survey_lib::survey::{
    AnswerValue, EvaluationHeader, SubmissionCoordinator, SubmissionError, SurveyWizard,
    WizardError, WizardState,
};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

fn identity() -> Identity {
    Identity {
        user_id: "user-1".to_string(),
        email: "user@example.com".to_string(),
        name: None,
    }
}

fn header() -> EvaluationHeader {
    EvaluationHeader {
        name: "Platform team".to_string(),
        description: Some("Quarterly check-in".to_string()),
        phase: Phase::Before,
    }
}

/// Fill every default question and walk to the last step
fn completed_wizard() -> SurveyWizard {
    let mut wizard = SurveyWizard::new(default_questions()).unwrap();
    let answers = [
        ("business-domain", AnswerValue::Text("Healthcare".into())),
        ("methodology", AnswerValue::Text("Lean".into())),
        (
            "sdlc-phases",
            AnswerValue::Selections(vec!["Documentation".into()]),
        ),
        ("motivation", AnswerValue::Text("Less rework".into())),
        ("success-measures", AnswerValue::Text("Defects halved".into())),
        (
            "baseline-metrics",
            AnswerValue::Selections(vec!["None".into()]),
        ),
    ];
    for (i, (question_id, value)) in answers.iter().enumerate() {
        wizard.set_value(question_id, value).unwrap();
        if i + 1 < answers.len() {
            wizard.advance().unwrap();
        }
    }
    wizard
}

/// Store that fails its first `failures` creates
struct FlakyStore {
    failures: usize,
    calls: AtomicUsize,
}

#[async_trait]
impl EvaluationStore for FlakyStore {
    async fn create(&self, new: NewEvaluation) -> Result<Evaluation, StoreError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.failures {
            return Err(StoreError::Io("disk unavailable".to_string()));
        }
        let now = chrono::Utc::now();
        Ok(Evaluation {
            id: format!("eval-{}", call),
            user_id: new.owner_id,
            name: new.name,
            description: new.description,
            phase: new.phase,
            status: ai_survey_lib::models::EvaluationStatus::Completed,
            created_at: now,
            completed_at: Some(now),
        })
    }

    async fn get_by_id(&self, _id: &str) -> Result<Option<EvaluationDetail>, StoreError> {
        Ok(None)
    }

    async fn list_by_owner(&self, _owner_id: &str) -> Result<Vec<EvaluationSummary>, StoreError> {
        Ok(Vec::new())
    }

    async fn health_check(&self) -> bool {
        true
    }
}

#[tokio::test]
async fn test_wizard_submits_into_file_store() {
    let temp_dir = TempDir::new().unwrap();
    let catalog = Arc::new(QuestionCatalog::open(temp_dir.path()).unwrap());
    let store: Arc<dyn EvaluationStore> =
        Arc::new(FileEvaluationStore::new(temp_dir.path(), catalog).unwrap());
    let coordinator = SubmissionCoordinator::new(store.clone(), identity());
    let header = header();

    let mut wizard = completed_wizard();
    let summary = wizard
        .submit(&coordinator.with_header(&header))
        .await
        .unwrap();
    assert_eq!(wizard.state(), WizardState::Submitted);
    assert_eq!(summary.response_count, 6);

    let detail = store.get_by_id(&summary.id).await.unwrap().unwrap();
    assert_eq!(detail.owner_id, "user-1");
    assert_eq!(detail.description.as_deref(), Some("Quarterly check-in"));
    assert_eq!(detail.responses[2].answer, r#"["Documentation"]"#);

    let listed = store.list_by_owner("user-1").await.unwrap();
    assert_eq!(listed.len(), 1);
}

#[tokio::test]
async fn test_store_failure_then_retry() {
    let store: Arc<dyn EvaluationStore> = Arc::new(FlakyStore {
        failures: 1,
        calls: AtomicUsize::new(0),
    });
    let coordinator = SubmissionCoordinator::new(store, identity());
    let header = header();
    let submitter = coordinator.with_header(&header);

    let mut wizard = completed_wizard();
    let err = wizard.submit(&submitter).await.unwrap_err();
    assert!(matches!(
        err,
        WizardError::Submission(SubmissionError::Store(_))
    ));
    assert_eq!(wizard.state(), WizardState::Failed);
    assert_eq!(wizard.draft().len(), 6);
    assert!(wizard.last_error().is_some());

    let summary = wizard.submit(&submitter).await.unwrap();
    assert_eq!(summary.id, "eval-1");
    assert_eq!(wizard.state(), WizardState::Submitted);
    assert!(wizard.last_error().is_none());
}

#[tokio::test]
async fn test_anonymous_owner_is_rejected_before_store() {
    let store = Arc::new(FlakyStore {
        failures: 0,
        calls: AtomicUsize::new(0),
    });
    let coordinator = SubmissionCoordinator::new(
        store.clone(),
        Identity {
            user_id: String::new(),
            email: String::new(),
            name: None,
        },
    );

    let wizard = completed_wizard();
    let err = coordinator
        .create_evaluation(&header(), wizard.draft())
        .await
        .unwrap_err();
    assert!(matches!(err, SubmissionError::Authentication(_)));
    assert_eq!(store.calls.load(Ordering::SeqCst), 0);
}
