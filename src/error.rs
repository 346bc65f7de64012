use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use time::OffsetDateTime;
use tracing::error;

/// Postgres SQLSTATE for a unique constraint violation.
pub const UNIQUE_VIOLATION: &str = "23505";
/// Postgres SQLSTATE for an exclusion constraint violation.
pub const EXCLUSION_VIOLATION: &str = "23P01";

/// Boundary error type. Every handler returns `Result<_, AppError>`.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Upload(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{entity} with id {id} not found")]
    NotFound { entity: &'static str, id: String },
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    AlreadyExists(String),
    #[error("{0}")]
    InvalidState(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// The "already booked" outcome shared by the pre-check and the database guard.
    pub fn booking_conflict() -> Self {
        Self::Conflict("This space is already booked for this date and time slot".into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::Upload(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Conflict(_) | Self::AlreadyExists(_) | Self::InvalidState(_) => {
                StatusCode::CONFLICT
            }
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Upload(_) => "FILE_UPLOAD_ERROR",
            Self::Unauthorized(_) => "AUTH_UNAUTHORIZED",
            Self::Forbidden(_) => "ACCESS_DENIED",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::Conflict(_) => "RESERVATION_CONFLICT",
            Self::AlreadyExists(_) => "IDENTIFIER_ALREADY_EXISTS",
            Self::InvalidState(_) => "RESERVATION_INVALID_STATE",
            Self::Internal(_) => "SERVER_ERROR",
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        Self::Internal(e.into())
    }
}

/// True when `e` is a Postgres error carrying the given SQLSTATE.
pub fn is_db_code(e: &sqlx::Error, code: &str) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.code().as_deref() == Some(code))
}

/// Turns a unique-constraint failure from a repo call into `AlreadyExists`.
pub fn unique_or_internal(e: anyhow::Error, message: &str) -> AppError {
    match e.downcast_ref::<sqlx::Error>() {
        Some(db) if is_db_code(db, UNIQUE_VIOLATION) => AppError::AlreadyExists(message.into()),
        _ => AppError::Internal(e),
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error_code: &'static str,
    pub message: String,
    pub status: u16,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            Self::Internal(e) => {
                error!(error = ?e, "internal error");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };
        let body = ErrorBody {
            error_code: self.code(),
            message,
            status: status.as_u16(),
            timestamp: OffsetDateTime::now_utc(),
        };
        (status, Json(body)).into_response()
    }
}
