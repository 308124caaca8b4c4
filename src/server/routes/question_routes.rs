// Question catalog routes

use axum::{extract::State, Json};
use serde::Serialize;

use crate::models::Question;
use crate::server::ServerAppState;

#[derive(Debug, Serialize)]
pub struct QuestionsResponse {
    pub success: bool,
    pub questions: Vec<Question>,
}

/// Active questions in survey order
pub async fn list_questions(State(state): State<ServerAppState>) -> Json<QuestionsResponse> {
    let questions = state.catalog.list_active();
    log::debug!("Serving {} active questions", questions.len());
    Json(QuestionsResponse {
        success: true,
        questions,
    })
}
