//! Server application state shared across handlers

use crate::auth::SessionRegistry;
use crate::error::{AppError, AppResult};
use crate::file_storage::{QuestionCatalog, UserStore};
use crate::models::{EvaluationStore, Identity};
use crate::shutdown::ShutdownState;
use crate::survey::{SubmissionCoordinator, SurveyRegistry};
use std::sync::Arc;

/// Shared state for the server, containing the stores and registries
/// every handler works against.
#[derive(Clone)]
pub struct ServerAppState {
    /// Question catalog
    pub catalog: Arc<QuestionCatalog>,

    /// Evaluation persistence
    pub evaluations: Arc<dyn EvaluationStore>,

    /// Registered accounts
    pub users: Arc<UserStore>,

    /// Bearer-token sessions
    pub sessions: Arc<SessionRegistry>,

    /// In-progress surveys
    pub surveys: Arc<SurveyRegistry>,

    /// Shutdown state
    pub shutdown_state: ShutdownState,
}

impl ServerAppState {
    pub fn new(
        catalog: Arc<QuestionCatalog>,
        evaluations: Arc<dyn EvaluationStore>,
        users: Arc<UserStore>,
        sessions: Arc<SessionRegistry>,
        shutdown_state: ShutdownState,
    ) -> Self {
        Self {
            catalog,
            evaluations,
            users,
            sessions,
            surveys: Arc::new(SurveyRegistry::new()),
            shutdown_state,
        }
    }

    /// A submission coordinator acting for `identity`. No new writes start once
    /// shutdown has been requested.
    pub fn coordinator_for(&self, identity: &Identity) -> AppResult<SubmissionCoordinator> {
        if self.shutdown_state.is_shutdown_requested() {
            return Err(AppError::Unavailable("Server is shutting down".to_string()));
        }
        Ok(SubmissionCoordinator::new(
            self.evaluations.clone(),
            identity.clone(),
        ))
    }
}
