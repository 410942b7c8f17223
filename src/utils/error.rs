use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;
use tracing::error;

use crate::jsonapi::{ErrorDocument, ErrorObject, ErrorSource};

#[derive(Debug, Error)]
pub enum AppError {
    /// A referenced entity does not exist; `parameter` names the path or
    /// relationship parameter that carried the unknown id.
    #[error("{detail}")]
    ObjectNotFound { parameter: String, detail: String },

    /// A validation failure; `pointer` locates the offending member in the
    /// request document.
    #[error("{detail}")]
    UnprocessableEntity { pointer: String, detail: String },

    /// Document conflicts with the endpoint (wrong `type`, mismatched id).
    #[error("{detail}")]
    Conflict { pointer: String, detail: String },

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Database error")]
    Database(#[from] sqlx::Error),
}

impl AppError {
    pub fn not_found(parameter: impl Into<String>, detail: impl Into<String>) -> Self {
        AppError::ObjectNotFound {
            parameter: parameter.into(),
            detail: detail.into(),
        }
    }

    pub fn unprocessable(pointer: impl Into<String>, detail: impl Into<String>) -> Self {
        AppError::UnprocessableEntity {
            pointer: pointer.into(),
            detail: detail.into(),
        }
    }

    pub fn conflict(pointer: impl Into<String>, detail: impl Into<String>) -> Self {
        AppError::Conflict {
            pointer: pointer.into(),
            detail: detail.into(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::ObjectNotFound { .. } => StatusCode::NOT_FOUND,
            AppError::UnprocessableEntity { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Conflict { .. } => StatusCode::CONFLICT,
            AppError::Auth(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            AppError::ObjectNotFound { .. } => "Object not found",
            AppError::UnprocessableEntity { .. } => "Unprocessable entity",
            AppError::Conflict { .. } => "Conflict",
            AppError::Auth(_) => "Unauthorized",
            AppError::Forbidden(_) => "Forbidden",
            AppError::Database(_) => "Internal server error",
        }
    }

    fn source(&self) -> Option<ErrorSource> {
        match self {
            AppError::ObjectNotFound { parameter, .. } => {
                Some(ErrorSource::parameter(parameter.clone()))
            }
            AppError::UnprocessableEntity { pointer, .. }
            | AppError::Conflict { pointer, .. } => Some(ErrorSource::pointer(pointer.clone())),
            _ => None,
        }
    }

    fn log(&self) {
        match self {
            AppError::Database(e) => {
                error!(error = ?e, "Database error");
            }
            other => {
                error!(error = ?other, status = %other.status_code(), "Request failed");
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Log internal details
        self.log();

        // Only expose high-level detail to the client
        let detail = match &self {
            AppError::Database(_) => "A database error occurred".to_string(),
            other => other.to_string(),
        };

        let body = ErrorDocument::single(ErrorObject {
            status: status.as_u16().to_string(),
            title: self.title().to_string(),
            detail,
            source: self.source(),
        });

        (status, Json(body)).into_response()
    }
}
