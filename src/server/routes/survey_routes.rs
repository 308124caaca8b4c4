// Server-side survey wizard routes

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use super::parse_json;
use crate::error::AppResult;
use crate::models::EvaluationSummary;
use crate::server::auth::CurrentUser;
use crate::server::ServerAppState;
use crate::survey::{AnswerValue, EvaluationHeader, SetupRequest, SurveyView};

/// Navigation requested by a client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepAction {
    Advance,
    GoBack,
}

#[derive(Debug, Deserialize)]
pub struct StepRequest {
    pub action: StepAction,
}

#[derive(Debug, Default, Deserialize)]
pub struct AnswerRequest {
    /// Absent or null clears the answer
    #[serde(default)]
    pub value: Option<AnswerValue>,
}

#[derive(Debug, Serialize)]
pub struct SurveyResponse {
    pub success: bool,
    pub survey: SurveyView,
}

#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub success: bool,
    pub evaluation: EvaluationSummary,
    pub survey: SurveyView,
}

#[derive(Debug, Serialize)]
pub struct DiscardResponse {
    pub success: bool,
    pub message: &'static str,
}

fn survey_response(survey: SurveyView) -> Json<SurveyResponse> {
    Json(SurveyResponse {
        success: true,
        survey,
    })
}

pub async fn create_survey(
    State(state): State<ServerAppState>,
    CurrentUser(session): CurrentUser,
    body: Bytes,
) -> AppResult<(StatusCode, Json<SurveyResponse>)> {
    let request: SetupRequest = parse_json(&body)?;
    let header = EvaluationHeader::from_setup(request)?;
    let survey = state
        .surveys
        .create(&session.identity, header, state.catalog.list_active())?;

    Ok((StatusCode::CREATED, survey_response(survey)))
}

pub async fn get_survey(
    State(state): State<ServerAppState>,
    CurrentUser(session): CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<SurveyResponse>> {
    let survey = state.surveys.view(&id, &session.identity)?;
    Ok(survey_response(survey))
}

pub async fn set_answer(
    State(state): State<ServerAppState>,
    CurrentUser(session): CurrentUser,
    Path((id, question_id)): Path<(String, String)>,
    body: Bytes,
) -> AppResult<Json<SurveyResponse>> {
    let request: AnswerRequest = parse_json(&body)?;
    let survey = state
        .surveys
        .update(&id, &session.identity, |wizard| {
            match &request.value {
                Some(value) => wizard.set_value(&question_id, value)?,
                None => wizard.clear_answer(&question_id)?,
            }
            Ok(())
        })?;

    Ok(survey_response(survey))
}

pub async fn step(
    State(state): State<ServerAppState>,
    CurrentUser(session): CurrentUser,
    Path(id): Path<String>,
    body: Bytes,
) -> AppResult<Json<SurveyResponse>> {
    let request: StepRequest = parse_json(&body)?;
    let survey = state
        .surveys
        .update(&id, &session.identity, |wizard| {
            let step = match request.action {
                StepAction::Advance => wizard.advance()?,
                StepAction::GoBack => wizard.retreat()?,
            };
            log::debug!("Survey {} moved to step {}", id, step);
            Ok(())
        })?;

    Ok(survey_response(survey))
}

pub async fn submit(
    State(state): State<ServerAppState>,
    CurrentUser(session): CurrentUser,
    Path(id): Path<String>,
) -> AppResult<(StatusCode, Json<SubmitResponse>)> {
    let coordinator = state.coordinator_for(&session.identity)?;
    let (evaluation, survey) = state.surveys.submit(&id, &coordinator).await?;

    Ok((
        StatusCode::CREATED,
        Json(SubmitResponse {
            success: true,
            evaluation,
            survey,
        }),
    ))
}

pub async fn discard_survey(
    State(state): State<ServerAppState>,
    CurrentUser(session): CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<DiscardResponse>> {
    state.surveys.remove(&id, &session.identity)?;
    Ok(Json(DiscardResponse {
        success: true,
        message: "Survey discarded",
    }))
}
