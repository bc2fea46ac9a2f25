use axum::{
    extract::rejection::{JsonRejection, PathRejection},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use domain::services::{JoinCodeError, StoreError};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A missing resource, tagged with its machine code.
    #[error("Not found: {message}")]
    NotFound {
        code: &'static str,
        message: String,
    },

    /// The resource exists but its state rejects the request.
    #[error("State conflict: {message}")]
    StateConflict {
        code: &'static str,
        message: String,
    },

    #[error("Generation exhausted: {0}")]
    GenerationExhausted(String),

    #[error("Rate limited")]
    RateLimited { retry_after_secs: u64 },

    #[error("Internal error: {0}")]
    Internal(String),
}

/// JSON error payload: human message plus machine code.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub code: String,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::StateConflict { .. } => StatusCode::BAD_REQUEST,
            ApiError::GenerationExhausted(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn machine_code(&self) -> &'static str {
        match self {
            ApiError::Unauthenticated(_) => "unauthenticated",
            ApiError::Forbidden(_) => "forbidden",
            ApiError::InvalidInput(_) => "invalid_input",
            ApiError::NotFound { code, .. } | ApiError::StateConflict { code, .. } => *code,
            ApiError::GenerationExhausted(_) => "generation_exhausted",
            ApiError::RateLimited { .. } => "rate_limited",
            ApiError::Internal(_) => "internal_error",
        }
    }

    fn public_message(&self) -> String {
        match self {
            ApiError::Unauthenticated(msg)
            | ApiError::Forbidden(msg)
            | ApiError::InvalidInput(msg)
            | ApiError::GenerationExhausted(msg) => msg.clone(),
            ApiError::NotFound { message, .. } | ApiError::StateConflict { message, .. } => {
                message.clone()
            }
            ApiError::RateLimited { .. } => "Too many attempts. Please try again later.".into(),
            ApiError::Internal(_) => "An internal error occurred".into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Internal(msg) = &self {
            tracing::error!("Internal error: {}", msg);
        }

        let status = self.status();
        let body = ErrorBody {
            error: self.public_message(),
            code: self.machine_code().into(),
        };

        match self {
            ApiError::RateLimited { retry_after_secs } => (
                status,
                [(header::RETRY_AFTER, retry_after_secs.to_string())],
                Json(body),
            )
                .into_response(),
            _ => (status, Json(body)).into_response(),
        }
    }
}

impl From<JoinCodeError> for ApiError {
    fn from(err: JoinCodeError) -> Self {
        let message = err.to_string();
        match err {
            JoinCodeError::InvalidInput(msg) => ApiError::InvalidInput(msg),
            JoinCodeError::Forbidden => ApiError::Forbidden(message),
            JoinCodeError::GroupNotFound => ApiError::NotFound {
                code: "group_not_found",
                message,
            },
            JoinCodeError::CodeNotFound => ApiError::NotFound {
                code: "code_not_found",
                message,
            },
            JoinCodeError::CodeDeactivated => ApiError::StateConflict {
                code: "code_deactivated",
                message,
            },
            JoinCodeError::UsageLimitReached => ApiError::StateConflict {
                code: "usage_limit_reached",
                message,
            },
            JoinCodeError::CodeExpired => ApiError::StateConflict {
                code: "code_expired",
                message,
            },
            JoinCodeError::AlreadyMember => ApiError::StateConflict {
                code: "already_member",
                message,
            },
            JoinCodeError::GenerationExhausted => ApiError::GenerationExhausted(message),
            JoinCodeError::Store(StoreError::Database(db_err)) => db_err.into(),
            JoinCodeError::Store(other) => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        ApiError::Internal(format!("Database error: {}", err))
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut messages: Vec<String> = errors
            .field_errors()
            .iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |e| {
                    e.message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("{} is invalid", field))
                })
            })
            .collect();
        messages.sort();

        let message = match messages.len() {
            0 => "Invalid request".to_string(),
            1 => messages.remove(0),
            _ => messages.join("; "),
        };

        ApiError::InvalidInput(message)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::InvalidInput(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::InvalidInput(rejection.body_text())
    }
}
