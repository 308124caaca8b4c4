//! Application error taxonomy
//!
//! Every failure that can reach an API caller is an [`AppError`]. Each variant
//! carries a machine-readable [`ErrorCode`] and an HTTP status class, and is
//! rendered as the `{ success: false, error: {...} }` JSON envelope.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Error codes shared by every API response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    // Authentication errors (1xxx)
    #[serde(rename = "AUTH_1001")]
    Unauthorized,
    #[serde(rename = "AUTH_1002")]
    InvalidCredentials,
    #[serde(rename = "AUTH_1003")]
    TokenExpired,
    #[serde(rename = "AUTH_1004")]
    InsufficientPermissions,

    // Validation errors (2xxx)
    #[serde(rename = "VAL_2001")]
    ValidationError,
    #[serde(rename = "VAL_2002")]
    InvalidInput,
    #[serde(rename = "VAL_2003")]
    MissingRequiredField,

    // Storage errors (3xxx)
    #[serde(rename = "DB_3001")]
    DatabaseError,
    #[serde(rename = "DB_3002")]
    RecordNotFound,
    #[serde(rename = "DB_3003")]
    DuplicateRecord,
    #[serde(rename = "DB_3004")]
    ConstraintViolation,

    // Business logic errors (4xxx)
    #[serde(rename = "BUS_4001")]
    BusinessRuleViolation,
    #[serde(rename = "BUS_4002")]
    InvalidOperation,

    // System errors (5xxx)
    #[serde(rename = "SYS_5001")]
    InternalError,
    #[serde(rename = "SYS_5002")]
    ServiceUnavailable,
}

impl ErrorCode {
    /// Wire representation of the code
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::Unauthorized => "AUTH_1001",
            ErrorCode::InvalidCredentials => "AUTH_1002",
            ErrorCode::TokenExpired => "AUTH_1003",
            ErrorCode::InsufficientPermissions => "AUTH_1004",
            ErrorCode::ValidationError => "VAL_2001",
            ErrorCode::InvalidInput => "VAL_2002",
            ErrorCode::MissingRequiredField => "VAL_2003",
            ErrorCode::DatabaseError => "DB_3001",
            ErrorCode::RecordNotFound => "DB_3002",
            ErrorCode::DuplicateRecord => "DB_3003",
            ErrorCode::ConstraintViolation => "DB_3004",
            ErrorCode::BusinessRuleViolation => "BUS_4001",
            ErrorCode::InvalidOperation => "BUS_4002",
            ErrorCode::InternalError => "SYS_5001",
            ErrorCode::ServiceUnavailable => "SYS_5002",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    /// User-correctable input problem
    #[error("{message}")]
    Validation {
        message: String,
        code: ErrorCode,
        context: Option<Value>,
    },

    /// Caller identity missing or not established
    #[error("{message}")]
    Authentication { message: String, code: ErrorCode },

    /// Caller is known but may not touch the resource
    #[error("{0}")]
    Authorization(String),

    #[error("{0} not found")]
    NotFound(String),

    /// Operation not allowed in the current state
    #[error("{message}")]
    Business { message: String, code: ErrorCode },

    /// Persistence failed
    #[error("{message}")]
    Store { message: String, code: ErrorCode },

    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("{0}")]
    Internal(String),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        AppError::Validation {
            message: message.into(),
            code: ErrorCode::ValidationError,
            context: None,
        }
    }

    /// Validation error scoped to one survey question
    pub fn field(question_id: &str, message: impl Into<String>) -> Self {
        AppError::Validation {
            message: message.into(),
            code: ErrorCode::MissingRequiredField,
            context: Some(serde_json::json!({ "questionId": question_id })),
        }
    }

    pub fn unauthenticated(message: impl Into<String>) -> Self {
        AppError::Authentication {
            message: message.into(),
            code: ErrorCode::Unauthorized,
        }
    }

    pub fn invalid_credentials() -> Self {
        AppError::Authentication {
            message: "Invalid credentials".to_string(),
            code: ErrorCode::InvalidCredentials,
        }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        AppError::Authorization(message.into())
    }

    pub fn not_found(resource: impl Into<String>) -> Self {
        AppError::NotFound(resource.into())
    }

    pub fn invalid_operation(message: impl Into<String>) -> Self {
        AppError::Business {
            message: message.into(),
            code: ErrorCode::InvalidOperation,
        }
    }

    pub fn store(message: impl Into<String>) -> Self {
        AppError::Store {
            message: message.into(),
            code: ErrorCode::DatabaseError,
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Validation { code, .. } => *code,
            AppError::Authentication { code, .. } => *code,
            AppError::Authorization(_) => ErrorCode::InsufficientPermissions,
            AppError::NotFound(_) => ErrorCode::RecordNotFound,
            AppError::Business { code, .. } => *code,
            AppError::Store { code, .. } => *code,
            AppError::Unavailable(_) => ErrorCode::ServiceUnavailable,
            AppError::Internal(_) => ErrorCode::InternalError,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation { .. } | AppError::Business { .. } => StatusCode::BAD_REQUEST,
            AppError::Authentication { .. } => StatusCode::UNAUTHORIZED,
            AppError::Authorization(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            // Constraint violations are caused by the request payload
            AppError::Store {
                code: ErrorCode::ConstraintViolation | ErrorCode::DuplicateRecord,
                ..
            } => StatusCode::BAD_REQUEST,
            AppError::Store { .. } | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Operational errors are expected failures; anything else is a bug
    pub fn is_operational(&self) -> bool {
        !matches!(self, AppError::Internal(_))
    }

    fn context(&self) -> Option<&Value> {
        match self {
            AppError::Validation { context, .. } => context.as_ref(),
            _ => None,
        }
    }

    /// Build the JSON error envelope for this error
    pub fn to_response_body(&self) -> ErrorResponse {
        ErrorResponse {
            success: false,
            error: ErrorBody {
                code: self.code(),
                message: self.to_string(),
                timestamp: Utc::now().to_rfc3339(),
                context: self.context().cloned(),
            },
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(err: tokio::task::JoinError) -> Self {
        AppError::Internal(format!("Background task failed: {}", err))
    }
}

/// Error response envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: ErrorBody,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: ErrorCode,
    pub message: String,
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if self.is_operational() {
            log::warn!("{} ({}, status {})", self, self.code(), status.as_u16());
        } else {
            log::error!("Unexpected error: {} ({})", self, self.code());
        }
        (status, Json(self.to_response_body())).into_response()
    }
}
