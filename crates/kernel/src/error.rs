//! Application error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::content::ContentError;
use crate::export::ExportError;
use crate::structure::StructureError;

/// Application errors.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("internal server error")]
    Internal(#[from] anyhow::Error),

    #[error("not found")]
    NotFound,

    #[error("unauthorized")]
    Unauthorized,

    #[error("forbidden")]
    Forbidden,

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("database error")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Structure(#[from] StructureError),

    #[error(transparent)]
    Content(#[from] ContentError),

    #[error("export failed")]
    Export(#[from] ExportError),
}

impl AppError {
    /// Validation errors map to 422; infrastructure failures inside a
    /// domain error stay 500.
    fn status(&self) -> StatusCode {
        match self {
            AppError::Internal(_) | AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Structure(StructureError::Internal(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Structure(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Content(ContentError::Internal(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Content(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Export(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Validation messages go to the user verbatim; everything
        // internal is logged and kept vague.
        let body = match &self {
            AppError::Internal(e)
            | AppError::Structure(StructureError::Internal(e))
            | AppError::Content(ContentError::Internal(e)) => {
                tracing::error!(error = %e, "internal server error");
                "internal server error".to_string()
            }
            AppError::Database(e) => {
                tracing::error!(error = %e, "database error");
                "internal server error".to_string()
            }
            AppError::Export(e) => {
                tracing::error!(error = %e, "export failed");
                "export failed".to_string()
            }
            _ => self.to_string(),
        };

        (status, body).into_response()
    }
}

/// Result type alias using AppError.
pub type AppResult<T> = Result<T, AppError>;
