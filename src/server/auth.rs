//! Authentication middleware for the server
//!
//! Resolves `Authorization: Bearer <token>` against the session registry on
//! every API request except the public ones, and attaches the caller's
//! [`AuthSession`] to the request.

use axum::{
    async_trait,
    extract::{FromRequestParts, Request},
    http::{header::AUTHORIZATION, request::Parts, Method},
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tower::Layer;

use crate::auth::SessionRegistry;
use crate::error::AppError;
use crate::models::Identity;

/// Endpoints reachable without a session
const PUBLIC_PATHS: &[&str] = &[
    "/api/health",
    "/api/questions",
    "/api/auth/register",
    "/api/auth/signin",
];

/// The authenticated caller of a request
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub token: String,
    pub identity: Identity,
}

/// Authentication layer that validates Bearer tokens
#[derive(Clone)]
pub struct AuthLayer {
    sessions: Arc<SessionRegistry>,
}

impl AuthLayer {
    pub fn new(sessions: Arc<SessionRegistry>) -> Self {
        Self { sessions }
    }
}

impl<S> Layer<S> for AuthLayer {
    type Service = AuthMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AuthMiddleware {
            inner,
            sessions: self.sessions.clone(),
        }
    }
}

/// The actual middleware service
#[derive(Clone)]
pub struct AuthMiddleware<S> {
    inner: S,
    sessions: Arc<SessionRegistry>,
}

impl<S> tower::Service<Request> for AuthMiddleware<S>
where
    S: tower::Service<Request, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(
        &mut self,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request) -> Self::Future {
        let sessions = self.sessions.clone();
        let mut inner = self.inner.clone();

        Box::pin(async move {
            // Skip auth for CORS preflight OPTIONS requests
            if req.method() == Method::OPTIONS {
                return inner.call(req).await;
            }

            let path = req.uri().path();
            let requires_auth = path.starts_with("/api/") && !PUBLIC_PATHS.contains(&path);
            if !requires_auth {
                return inner.call(req).await;
            }

            let token = bearer_token(&req);
            let session = token.as_deref().and_then(|t| sessions.resolve(t));

            match session {
                Some(session) => {
                    req.extensions_mut().insert(AuthSession {
                        token: session.token,
                        identity: session.identity,
                    });
                    inner.call(req).await
                }
                None => Ok(AppError::unauthenticated("Authentication required").into_response()),
            }
        })
    }
}

fn bearer_token(req: &Request) -> Option<String> {
    let header = req.headers().get(AUTHORIZATION)?.to_str().ok()?;
    header
        .strip_prefix("Bearer ")
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

/// Extractor for the authenticated caller; 401 when the request has none
#[derive(Debug, Clone)]
pub struct CurrentUser(pub AuthSession);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthSession>()
            .cloned()
            .map(CurrentUser)
            .ok_or_else(|| AppError::unauthenticated("Authentication required"))
    }
}
