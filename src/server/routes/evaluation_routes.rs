// Evaluation routes: listing, one-shot creation and detail views

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::parse_json;
use crate::error::{AppError, AppResult};
use crate::models::{EvaluationDetail, EvaluationStatus, EvaluationSummary, Phase};
use crate::server::auth::CurrentUser;
use crate::server::ServerAppState;
use crate::survey::{AnswerDraft, DisplayAnswer, EvaluationHeader};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEvaluationRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub phase: Option<String>,
    /// question id -> encoded answer
    #[serde(default)]
    pub responses: BTreeMap<String, String>,
}

impl CreateEvaluationRequest {
    /// Collect every problem with the request, joined into one message
    fn into_header(self) -> AppResult<(EvaluationHeader, AnswerDraft)> {
        let mut problems = Vec::new();

        let name = self
            .name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(String::from);
        if name.is_none() {
            problems.push("Name is required");
        }

        let phase = self.phase.as_deref().and_then(Phase::parse);
        if phase.is_none() {
            problems.push("Phase must be either \"before\" or \"after\"");
        }

        match (name, phase) {
            (Some(name), Some(phase)) => {
                let description = self
                    .description
                    .map(|d| d.trim().to_string())
                    .filter(|d| !d.is_empty());
                Ok((
                    EvaluationHeader {
                        name,
                        description,
                        phase,
                    },
                    AnswerDraft::from(self.responses),
                ))
            }
            _ => Err(AppError::validation(problems.join(", "))),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct EvaluationsResponse {
    pub success: bool,
    pub evaluations: Vec<EvaluationSummary>,
}

#[derive(Debug, Serialize)]
pub struct CreatedEvaluation {
    pub id: String,
    pub name: String,
    pub phase: Phase,
    pub status: EvaluationStatus,
}

#[derive(Debug, Serialize)]
pub struct CreateEvaluationResponse {
    pub success: bool,
    pub message: &'static str,
    pub evaluation: CreatedEvaluation,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryAnswer {
    pub question_id: String,
    pub question_text: String,
    pub answer: DisplayAnswer,
}

#[derive(Debug, Serialize)]
pub struct CategoryGroup {
    pub category: String,
    pub responses: Vec<CategoryAnswer>,
}

#[derive(Debug, Serialize)]
pub struct EvaluationDetailResponse {
    pub success: bool,
    pub evaluation: EvaluationDetail,
    pub categories: Vec<CategoryGroup>,
}

fn category_groups(detail: &EvaluationDetail) -> Vec<CategoryGroup> {
    detail
        .grouped_by_category()
        .into_iter()
        .map(|(category, responses)| CategoryGroup {
            category,
            responses: responses
                .into_iter()
                .map(|r| CategoryAnswer {
                    question_id: r.question_id.clone(),
                    question_text: r.question_text.clone(),
                    answer: r.display_answer(),
                })
                .collect(),
        })
        .collect()
}

pub async fn list_evaluations(
    State(state): State<ServerAppState>,
    CurrentUser(session): CurrentUser,
) -> AppResult<Json<EvaluationsResponse>> {
    let evaluations = state
        .evaluations
        .list_by_owner(&session.identity.user_id)
        .await
        .map_err(|e| AppError::store(e.to_string()))?;

    Ok(Json(EvaluationsResponse {
        success: true,
        evaluations,
    }))
}

pub async fn create_evaluation(
    State(state): State<ServerAppState>,
    CurrentUser(session): CurrentUser,
    body: Bytes,
) -> AppResult<(StatusCode, Json<CreateEvaluationResponse>)> {
    let request: CreateEvaluationRequest = parse_json(&body)?;
    let (header, draft) = request.into_header()?;

    let summary = state
        .coordinator_for(&session.identity)?
        .create_evaluation(&header, &draft)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateEvaluationResponse {
            success: true,
            message: "Evaluation created successfully",
            evaluation: CreatedEvaluation {
                id: summary.id,
                name: summary.name,
                phase: summary.phase,
                status: summary.status,
            },
        }),
    ))
}

pub async fn get_evaluation(
    State(state): State<ServerAppState>,
    CurrentUser(session): CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<EvaluationDetailResponse>> {
    let detail = state
        .evaluations
        .get_by_id(&id)
        .await
        .map_err(|e| AppError::store(e.to_string()))?
        .ok_or_else(|| AppError::not_found("Evaluation"))?;

    if detail.owner_id != session.identity.user_id {
        return Err(AppError::forbidden(
            "You do not have access to this evaluation",
        ));
    }

    let categories = category_groups(&detail);
    Ok(Json(EvaluationDetailResponse {
        success: true,
        evaluation: detail,
        categories,
    }))
}
