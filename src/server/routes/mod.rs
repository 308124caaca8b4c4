//! HTTP route modules
//!
//! Routes are organized into focused sub-modules by domain:
//! - health: Liveness and storage health
//! - question_routes: Question catalog
//! - auth_routes: Registration, sign-in and sessions
//! - evaluation_routes: Stored evaluations
//! - survey_routes: Server-side survey wizards

pub mod auth_routes;
pub mod evaluation_routes;
pub mod health;
pub mod question_routes;
pub mod survey_routes;

use axum::{
    body::Bytes,
    routing::{get, post, put},
    Router,
};
use serde::de::DeserializeOwned;

use super::ServerAppState;
use crate::error::{AppError, AppResult, ErrorCode};

/// Parse a JSON request body, reporting problems in the API error envelope
pub fn parse_json<T: DeserializeOwned>(body: &Bytes) -> AppResult<T> {
    let body: &[u8] = if body.is_empty() { b"{}" } else { body };
    serde_json::from_slice(body).map_err(|e| AppError::Validation {
        message: format!("Invalid request body: {}", e),
        code: ErrorCode::InvalidInput,
        context: None,
    })
}

/// Every API route
pub fn api_routes() -> Router<ServerAppState> {
    Router::new()
        .route("/api/health", get(health::health_handler))
        .route("/api/questions", get(question_routes::list_questions))
        .route("/api/auth/register", post(auth_routes::register))
        .route("/api/auth/signin", post(auth_routes::sign_in))
        .route("/api/auth/signout", post(auth_routes::sign_out))
        .route("/api/auth/session", get(auth_routes::current_session))
        .route(
            "/api/evaluations",
            get(evaluation_routes::list_evaluations).post(evaluation_routes::create_evaluation),
        )
        .route("/api/evaluations/:id", get(evaluation_routes::get_evaluation))
        .route("/api/surveys", post(survey_routes::create_survey))
        .route(
            "/api/surveys/:id",
            get(survey_routes::get_survey).delete(survey_routes::discard_survey),
        )
        .route(
            "/api/surveys/:id/answers/:question_id",
            put(survey_routes::set_answer),
        )
        .route("/api/surveys/:id/step", post(survey_routes::step))
        .route("/api/surveys/:id/submit", post(survey_routes::submit))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, serde::Deserialize)]
    struct Payload {
        #[serde(default)]
        name: String,
    }

    #[test]
    fn test_parse_json_empty_body_is_empty_object() {
        let parsed: Payload = parse_json(&Bytes::new()).unwrap();
        assert_eq!(parsed.name, "");
    }

    #[test]
    fn test_parse_json_reports_invalid_input() {
        let err = parse_json::<Payload>(&Bytes::from_static(b"{oops")).unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidInput);
        assert!(err.to_string().starts_with("Invalid request body"));
    }
}
