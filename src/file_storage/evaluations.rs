//! Evaluation storage
//!
//! Each evaluation is one JSON document in `evaluations/{id}.json` holding the
//! header and every response. Writing the document atomically is what makes a
//! create all-or-nothing.

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use super::{ensure_dir, is_writable, read_json, write_json, QuestionCatalog};
use crate::models::{
    Evaluation, EvaluationDetail, EvaluationStatus, EvaluationStore, EvaluationSummary,
    NewEvaluation, Response, ResponseDetail, StoreError,
};
use crate::utils::{evaluations_dir, generate_id, lock_mutex_recover};

/// On-disk document: the evaluation with its responses embedded
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EvaluationRecord {
    #[serde(flatten)]
    evaluation: Evaluation,
    responses: Vec<Response>,
}

pub struct FileEvaluationStore {
    files: Arc<EvaluationFiles>,
}

impl FileEvaluationStore {
    pub fn new(data_dir: &Path, catalog: Arc<QuestionCatalog>) -> Result<Self, StoreError> {
        let dir = evaluations_dir(data_dir);
        ensure_dir(&dir).map_err(StoreError::Io)?;
        Ok(Self {
            files: Arc::new(EvaluationFiles {
                dir,
                catalog,
                write_lock: Mutex::new(()),
            }),
        })
    }

    /// Run file work on the blocking pool
    async fn blocking<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&EvaluationFiles) -> Result<T, StoreError> + Send + 'static,
        T: Send + 'static,
    {
        let files = self.files.clone();
        tokio::task::spawn_blocking(move || f(&files))
            .await
            .map_err(|e| StoreError::Io(format!("Storage task failed: {}", e)))?
    }
}

/// The synchronous file operations behind [`FileEvaluationStore`]
struct EvaluationFiles {
    dir: PathBuf,
    catalog: Arc<QuestionCatalog>,
    /// Serializes writers
    write_lock: Mutex<()>,
}

impl EvaluationFiles {
    /// Path of an evaluation document; `None` for ids that cannot be ours
    fn record_path(&self, id: &str) -> Option<PathBuf> {
        let valid = !id.is_empty() && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-');
        valid.then(|| self.dir.join(format!("{}.json", id)))
    }

    fn read_record(&self, path: &Path) -> Result<EvaluationRecord, StoreError> {
        read_json(path).map_err(StoreError::Io)
    }

    fn check_constraints(&self, new: &NewEvaluation) -> Result<(), StoreError> {
        if new.owner_id.trim().is_empty() {
            return Err(StoreError::ConstraintViolation(
                "Evaluation owner must not be empty".to_string(),
            ));
        }
        if new.name.trim().is_empty() {
            return Err(StoreError::ConstraintViolation(
                "Evaluation name must not be empty".to_string(),
            ));
        }
        if let Some(unknown) = new
            .responses
            .keys()
            .find(|question_id| !self.catalog.contains(question_id))
        {
            return Err(StoreError::ConstraintViolation(format!(
                "Unknown question '{}'",
                unknown
            )));
        }
        Ok(())
    }

    fn to_detail(&self, record: EvaluationRecord) -> EvaluationDetail {
        let mut responses: Vec<ResponseDetail> = record
            .responses
            .into_iter()
            .map(|response| match self.catalog.find(&response.question_id) {
                Some(question) => ResponseDetail {
                    question_id: response.question_id,
                    question_text: question.text,
                    question_category: question.category,
                    question_order: question.order,
                    answer: response.answer,
                },
                None => {
                    log::warn!(
                        "Evaluation {} references missing question {}",
                        record.evaluation.id,
                        response.question_id
                    );
                    ResponseDetail {
                        question_text: response.question_id.clone(),
                        question_id: response.question_id,
                        question_category: None,
                        question_order: i32::MAX,
                        answer: response.answer,
                    }
                }
            })
            .collect();
        responses.sort_by_key(|r| r.question_order);

        let evaluation = record.evaluation;
        EvaluationDetail {
            id: evaluation.id,
            owner_id: evaluation.user_id,
            name: evaluation.name,
            description: evaluation.description,
            phase: evaluation.phase,
            status: evaluation.status,
            created_at: evaluation.created_at,
            completed_at: evaluation.completed_at,
            responses,
        }
    }

    fn create(&self, new: NewEvaluation) -> Result<Evaluation, StoreError> {
        self.check_constraints(&new)?;

        let _guard = lock_mutex_recover(&self.write_lock);

        let id = generate_id();
        let path = self
            .record_path(&id)
            .ok_or_else(|| StoreError::Io(format!("Generated invalid id {}", id)))?;
        if path.exists() {
            return Err(StoreError::Duplicate(format!("Evaluation {}", id)));
        }

        let now = Utc::now();
        let evaluation = Evaluation {
            id: id.clone(),
            user_id: new.owner_id,
            name: new.name.trim().to_string(),
            description: new.description,
            phase: new.phase,
            status: EvaluationStatus::Completed,
            created_at: now,
            completed_at: Some(now),
        };
        let responses = new
            .responses
            .into_iter()
            .map(|(question_id, answer)| Response {
                id: generate_id(),
                evaluation_id: id.clone(),
                question_id,
                answer,
            })
            .collect();

        let record = EvaluationRecord {
            evaluation,
            responses,
        };
        write_json(&path, &record).map_err(StoreError::Io)?;

        log::debug!(
            "Stored evaluation {} with {} responses",
            id,
            record.responses.len()
        );
        Ok(record.evaluation)
    }

    fn get_by_id(&self, id: &str) -> Result<Option<EvaluationDetail>, StoreError> {
        let Some(path) = self.record_path(id) else {
            return Ok(None);
        };
        if !path.exists() {
            return Ok(None);
        }
        let record = self.read_record(&path)?;
        Ok(Some(self.to_detail(record)))
    }

    fn list_by_owner(&self, owner_id: &str) -> Result<Vec<EvaluationSummary>, StoreError> {
        let entries = fs::read_dir(&self.dir)
            .map_err(|e| StoreError::Io(format!("Failed to read {:?}: {}", self.dir, e)))?;

        let mut summaries = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match self.read_record(&path) {
                Ok(record) if record.evaluation.user_id == owner_id => {
                    summaries.push(EvaluationSummary::from_evaluation(
                        &record.evaluation,
                        record.responses.len(),
                    ));
                }
                Ok(_) => {}
                Err(e) => log::warn!("Skipping unreadable evaluation: {}", e),
            }
        }

        summaries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(summaries)
    }

    fn is_healthy(&self) -> bool {
        self.dir.is_dir() && is_writable(&self.dir)
    }
}

#[async_trait]
impl EvaluationStore for FileEvaluationStore {
    async fn create(&self, new: NewEvaluation) -> Result<Evaluation, StoreError> {
        self.blocking(move |files| files.create(new)).await
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<EvaluationDetail>, StoreError> {
        let id = id.to_string();
        self.blocking(move |files| files.get_by_id(&id)).await
    }

    async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<EvaluationSummary>, StoreError> {
        let owner_id = owner_id.to_string();
        self.blocking(move |files| files.list_by_owner(&owner_id)).await
    }

    async fn health_check(&self) -> bool {
        self.blocking(|files| Ok(files.is_healthy()))
            .await
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file_storage::questions::default_questions;
    use crate::models::Phase;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    fn setup() -> (TempDir, FileEvaluationStore) {
        let temp_dir = TempDir::new().unwrap();
        let catalog = Arc::new(QuestionCatalog::in_memory(default_questions()));
        let store = FileEvaluationStore::new(temp_dir.path(), catalog).unwrap();
        (temp_dir, store)
    }

    fn new_evaluation(owner: &str, name: &str, responses: &[(&str, &str)]) -> NewEvaluation {
        NewEvaluation {
            owner_id: owner.to_string(),
            name: name.to_string(),
            description: None,
            phase: Phase::Before,
            responses: responses
                .iter()
                .map(|(q, a)| (q.to_string(), a.to_string()))
                .collect::<BTreeMap<_, _>>(),
        }
    }

    #[tokio::test]
    async fn test_create_and_get_orders_by_question() {
        let (_temp, store) = setup();
        let created = store
            .create(new_evaluation(
                "u1",
                "Q1 baseline",
                &[
                    ("motivation", "Faster reviews"),
                    ("business-domain", "Finance"),
                    ("sdlc-phases", r#"["Code Review"]"#),
                ],
            ))
            .await
            .unwrap();
        assert_eq!(created.status, EvaluationStatus::Completed);
        assert_eq!(created.completed_at, Some(created.created_at));

        let detail = store.get_by_id(&created.id).await.unwrap().unwrap();
        let ids: Vec<&str> = detail
            .responses
            .iter()
            .map(|r| r.question_id.as_str())
            .collect();
        assert_eq!(ids, vec!["business-domain", "sdlc-phases", "motivation"]);
        assert_eq!(detail.responses[0].question_text, "What is your business domain?");
        assert_eq!(
            detail.responses[0].question_category.as_deref(),
            Some("Organization")
        );
        assert_eq!(detail.owner_id, "u1");
    }

    #[tokio::test]
    async fn test_unknown_question_writes_nothing() {
        let (temp, store) = setup();
        let result = store
            .create(new_evaluation(
                "u1",
                "Q1",
                &[("business-domain", "Finance"), ("not-a-question", "x")],
            ))
            .await;
        assert!(matches!(result, Err(StoreError::ConstraintViolation(_))));

        let files = fs::read_dir(temp.path().join("evaluations")).unwrap().count();
        assert_eq!(files, 0);
        assert!(store.list_by_owner("u1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_blank_name_rejected() {
        let (_temp, store) = setup();
        let result = store.create(new_evaluation("u1", "  ", &[])).await;
        assert!(matches!(result, Err(StoreError::ConstraintViolation(_))));
    }

    #[tokio::test]
    async fn test_list_by_owner_newest_first() {
        let (_temp, store) = setup();
        let first = store.create(new_evaluation("u1", "first", &[])).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let second = store
            .create(new_evaluation("u1", "second", &[("business-domain", "Retail")]))
            .await
            .unwrap();
        store.create(new_evaluation("u2", "other", &[])).await.unwrap();

        let list = store.list_by_owner("u1").await.unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].id, second.id);
        assert_eq!(list[0].response_count, 1);
        assert_eq!(list[1].id, first.id);
    }

    #[tokio::test]
    async fn test_get_missing_or_invalid_id() {
        let (_temp, store) = setup();
        assert!(store.get_by_id("missing").await.unwrap().is_none());
        assert!(store.get_by_id("../users").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_deactivated_question_still_resolves() {
        let temp_dir = TempDir::new().unwrap();
        let catalog = Arc::new(QuestionCatalog::in_memory(default_questions()));
        let store = FileEvaluationStore::new(temp_dir.path(), catalog.clone()).unwrap();
        let created = store
            .create(new_evaluation("u1", "Q1", &[("motivation", "Because")]))
            .await
            .unwrap();

        catalog.set_active("motivation", false).unwrap();
        let detail = store.get_by_id(&created.id).await.unwrap().unwrap();
        assert_eq!(detail.responses[0].question_text, "Why are you doing this?");
    }

    #[tokio::test]
    async fn test_health_check() {
        let (_temp, store) = setup();
        assert!(store.health_check().await);
    }
}
