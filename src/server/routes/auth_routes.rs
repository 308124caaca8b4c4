// Registration, sign-in and session routes

use axum::{body::Bytes, extract::State, http::StatusCode, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;

use super::parse_json;
use crate::auth::{self, RegisterRequest, SignInRequest};
use crate::error::{AppError, AppResult, ErrorCode};
use crate::models::{Identity, PublicUser};
use crate::server::auth::CurrentUser;
use crate::server::ServerAppState;

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub success: bool,
    pub message: &'static str,
    pub user: PublicUser,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignInResponse {
    pub success: bool,
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub user: PublicUser,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub success: bool,
    pub user: Identity,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: &'static str,
}

pub async fn register(
    State(state): State<ServerAppState>,
    body: Bytes,
) -> AppResult<(StatusCode, Json<RegisterResponse>)> {
    let request: RegisterRequest = parse_json(&body)?;
    let users = state.users.clone();
    let user = tokio::task::spawn_blocking(move || auth::register(&users, request)).await??;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            success: true,
            message: "Registration successful",
            user: PublicUser::from(&user),
        }),
    ))
}

pub async fn sign_in(
    State(state): State<ServerAppState>,
    body: Bytes,
) -> AppResult<Json<SignInResponse>> {
    let request: SignInRequest = parse_json(&body)?;
    let (users, sessions) = (state.users.clone(), state.sessions.clone());
    let (session, user) =
        tokio::task::spawn_blocking(move || auth::sign_in(&users, &sessions, &request)).await??;

    Ok(Json(SignInResponse {
        success: true,
        token: session.token,
        expires_at: session.expires_at,
        user,
    }))
}

pub async fn sign_out(
    State(state): State<ServerAppState>,
    CurrentUser(session): CurrentUser,
) -> Json<MessageResponse> {
    state.sessions.revoke(&session.token);
    log::info!("User {} signed out", session.identity.user_id);
    Json(MessageResponse {
        success: true,
        message: "Signed out",
    })
}

pub async fn current_session(
    State(state): State<ServerAppState>,
    CurrentUser(session): CurrentUser,
) -> AppResult<Json<SessionResponse>> {
    // The middleware resolved this token moments ago; a miss means it expired in between
    let resolved = state
        .sessions
        .resolve(&session.token)
        .ok_or_else(|| AppError::Authentication {
            message: "Session expired".to_string(),
            code: ErrorCode::TokenExpired,
        })?;

    Ok(Json(SessionResponse {
        success: true,
        user: resolved.identity,
        expires_at: resolved.expires_at,
    }))
}
