use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use derive_more::Display;
use serde_json::json;

use crate::store::StoreError;

pub type AppResult<T> = Result<T, AppError>;

/// Failure classes surfaced to API callers. Every handler maps into one of
/// these before responding.
#[derive(Debug, Display, Clone, PartialEq, Eq)]
pub enum AppError {
    /// Missing or malformed input. The caller fixes the request.
    #[display(fmt = "{}", _0)]
    Validation(String),
    /// Role or assignment check failed.
    #[display(fmt = "{}", _0)]
    PermissionDenied(String),
    /// Mutation attempted on a finalized register or assessment.
    #[display(fmt = "{}", _0)]
    EditLocked(String),
    /// Finalize requested on something that is already terminal.
    #[display(fmt = "{}", _0)]
    AlreadyFinalized(String),
    #[display(fmt = "{}", _0)]
    NotFound(String),
    /// Natural-key violation.
    #[display(fmt = "{}", _0)]
    Conflict(String),
    /// Store or external service failure. Safe to retry.
    #[display(fmt = "{}", _0)]
    Upstream(String),
}

impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Validation(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        AppError::PermissionDenied(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        AppError::NotFound(msg.into())
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "validation_error",
            AppError::PermissionDenied(_) => "permission_denied",
            AppError::EditLocked(_) => "edit_locked",
            AppError::AlreadyFinalized(_) => "already_finalized",
            AppError::NotFound(_) => "not_found",
            AppError::Conflict(_) => "conflict",
            AppError::Upstream(_) => "upstream_failure",
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::AlreadyFinalized(_) => StatusCode::BAD_REQUEST,
            AppError::PermissionDenied(_) | AppError::EditLocked(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Upstream(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({
            "error": self.code(),
            "message": self.to_string(),
        }))
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate(detail) => {
                tracing::warn!(%detail, "Natural key violation");
                AppError::Conflict("Record already exists".to_string())
            }
            StoreError::MissingReference(detail) => {
                tracing::warn!(%detail, "Foreign key violation");
                AppError::NotFound("Referenced record does not exist".to_string())
            }
            other => {
                tracing::error!(error = %other, "Datastore failure");
                AppError::Upstream("Datastore unavailable, please retry".to_string())
            }
        }
    }
}
