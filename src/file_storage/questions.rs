//! Question catalog
//!
//! Stored in `questions.json` in the data directory. A missing file is seeded
//! with the default AI-adoption questions on first open.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::{read_json, write_json, FileResult};
use crate::models::{Question, QuestionKind};
use crate::utils::{lock_mutex_recover, questions_path};

/// Version of the catalog file format
const CATALOG_FILE_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CatalogFile {
    version: u32,
    updated_at: DateTime<Utc>,
    questions: Vec<Question>,
}

/// The ordered set of survey questions
pub struct QuestionCatalog {
    path: Option<PathBuf>,
    questions: Mutex<Vec<Question>>,
}

impl QuestionCatalog {
    /// Open the catalog in a data directory, seeding it when absent
    pub fn open(data_dir: &Path) -> FileResult<Self> {
        let path = questions_path(data_dir);

        let questions = if path.exists() {
            let file: CatalogFile = read_json(&path)?;
            file.questions
        } else {
            let questions = default_questions();
            write_catalog(&path, &questions)?;
            log::info!(
                "Seeded question catalog with {} questions at {:?}",
                questions.len(),
                path
            );
            questions
        };

        for question in &questions {
            question.check_definition()?;
        }

        Ok(Self {
            path: Some(path),
            questions: Mutex::new(questions),
        })
    }

    /// Catalog that is never written to disk
    pub fn in_memory(questions: Vec<Question>) -> Self {
        Self {
            path: None,
            questions: Mutex::new(questions),
        }
    }

    /// Active questions in survey order
    pub fn list_active(&self) -> Vec<Question> {
        let mut active: Vec<Question> = lock_mutex_recover(&self.questions)
            .iter()
            .filter(|q| q.active)
            .cloned()
            .collect();
        active.sort_by_key(|q| q.order);
        active
    }

    /// Look up any question, active or not
    pub fn find(&self, question_id: &str) -> Option<Question> {
        lock_mutex_recover(&self.questions)
            .iter()
            .find(|q| q.id == question_id)
            .cloned()
    }

    pub fn contains(&self, question_id: &str) -> bool {
        lock_mutex_recover(&self.questions)
            .iter()
            .any(|q| q.id == question_id)
    }

    /// Hide or show a question in new surveys. Past responses still resolve it.
    pub fn set_active(&self, question_id: &str, active: bool) -> FileResult<bool> {
        let mut questions = lock_mutex_recover(&self.questions);
        let Some(question) = questions.iter_mut().find(|q| q.id == question_id) else {
            return Ok(false);
        };
        question.active = active;

        if let Some(path) = &self.path {
            write_catalog(path, &questions)?;
        }
        log::info!(
            "Question {} is now {}",
            question_id,
            if active { "active" } else { "inactive" }
        );
        Ok(true)
    }
}

fn write_catalog(path: &Path, questions: &[Question]) -> FileResult<()> {
    let file = CatalogFile {
        version: CATALOG_FILE_VERSION,
        updated_at: Utc::now(),
        questions: questions.to_vec(),
    };
    write_json(path, &file)
}

/// The default AI-adoption survey
pub fn default_questions() -> Vec<Question> {
    vec![
        Question::new(
            "business-domain",
            1,
            "What is your business domain?",
            QuestionKind::Text,
        )
        .required()
        .with_category("Organization")
        .with_placeholder("e.g., Healthcare, Finance, E-commerce")
        .with_help_text("Specify the primary industry or domain your organization operates in"),
        Question::new(
            "methodology",
            2,
            "What software development methodology do you use?",
            QuestionKind::Select,
        )
        .required()
        .with_category("Process")
        .with_options([
            "Agile (Scrum)",
            "Agile (Kanban)",
            "Waterfall",
            "DevOps",
            "Lean",
            "Hybrid",
            "Other",
        ])
        .with_help_text("Select the primary methodology your team follows"),
        Question::new(
            "sdlc-phases",
            3,
            "What tasks or phase in the software development life cycle are you targeting?",
            QuestionKind::Multiselect,
        )
        .required()
        .with_category("Scope")
        .with_options([
            "Requirements Gathering",
            "Design & Architecture",
            "Development & Coding",
            "Code Review",
            "Testing & QA",
            "Deployment",
            "Monitoring & Maintenance",
            "Documentation",
            "Project Management",
        ])
        .with_help_text(
            "Select all phases you plan to enhance with AI tools (multiple selections allowed)",
        ),
        Question::new("motivation", 4, "Why are you doing this?", QuestionKind::Textarea)
            .required()
            .with_category("Motivation")
            .with_placeholder("Describe your motivation and expected benefits...")
            .with_help_text(
                "Explain the business drivers and objectives for adopting AI-augmented tools",
            ),
        Question::new(
            "success-measures",
            5,
            "How will you measure your success?",
            QuestionKind::Textarea,
        )
        .required()
        .with_category("Success Criteria")
        .with_placeholder("Describe your success metrics and KPIs...")
        .with_help_text("Define specific, measurable outcomes that indicate successful adoption"),
        Question::new(
            "baseline-metrics",
            6,
            "What software measures or metrics do you collect now?",
            QuestionKind::Multiselect,
        )
        .required()
        .with_category("Baseline Metrics")
        .with_options([
            "Velocity/Story Points",
            "Cycle Time",
            "Lead Time",
            "Deployment Frequency",
            "Mean Time to Recovery (MTTR)",
            "Change Failure Rate",
            "Code Coverage",
            "Defect Density",
            "Customer Satisfaction (CSAT/NPS)",
            "Team Satisfaction",
            "Cost per Feature",
            "None",
            "Other",
        ])
        .with_help_text("Select all metrics currently tracked by your team"),
    ]
}
