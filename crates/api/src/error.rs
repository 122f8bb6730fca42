use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use domain::{CheckinError, StoreError};
use serde::Serialize;
use shared::encoding::EncodingError;
use thiserror::Error;

use crate::services::artifacts::ArtifactError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Validation error: {message}")]
    Validation {
        message: String,
        details: Option<Vec<ValidationDetail>>,
    },

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::Validation {
            message: message.into(),
            details: None,
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Vec<ValidationDetail>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidationDetail {
    pub field: String,
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message, details) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg, None),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg, None),
            ApiError::Validation { message, details } => {
                (StatusCode::BAD_REQUEST, "validation_error", message, details)
            }
            ApiError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".into(),
                    None,
                )
            }
            ApiError::ServiceUnavailable(msg) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "service_unavailable",
                msg,
                None,
            ),
        };

        let body = ErrorBody {
            error: error_code.into(),
            message,
            details,
        };

        (status, Json(body)).into_response()
    }
}

impl From<CheckinError> for ApiError {
    fn from(err: CheckinError) -> Self {
        match err {
            e if e.is_client_error() => ApiError::validation(e.to_string()),
            CheckinError::NotFound(code) => ApiError::NotFound(format!("Invite not found: {}", code)),
            CheckinError::CameraUnavailable(msg) => ApiError::ServiceUnavailable(msg),
            CheckinError::Storage(StoreError::DuplicateCode(code)) => {
                ApiError::Conflict(format!("Code already issued: {}", code))
            }
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<EncodingError> for ApiError {
    fn from(err: EncodingError) -> Self {
        ApiError::validation(format!("image_data: {}", err))
    }
}

impl From<ArtifactError> for ApiError {
    fn from(err: ArtifactError) -> Self {
        match err {
            ArtifactError::InvalidId(id) => ApiError::NotFound(format!("Artifact not found: {}", id)),
            ArtifactError::Io(e) => ApiError::Internal(format!("Artifact storage error: {}", e)),
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut details: Vec<ValidationDetail> = errors
            .field_errors()
            .iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |e| ValidationDetail {
                    field: field.to_string(),
                    message: e
                        .message
                        .clone()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("{} is invalid", field)),
                })
            })
            .collect();
        details.sort_by(|a, b| a.field.cmp(&b.field));

        let message = if details.len() == 1 {
            details[0].message.clone()
        } else {
            format!("{} validation errors", details.len())
        };

        ApiError::Validation {
            message,
            details: Some(details),
        }
    }
}
