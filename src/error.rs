use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::db::StoreError;
use crate::workflow::{TransitionError, UploadRejection};

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Transition(#[from] TransitionError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Upload(#[from] UploadRejection),

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Authorization error: {0}")]
    Authorization(String),

    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl AppError {
    /// Missing permission outside of a status transition.
    pub fn missing_permission(required: &str) -> Self {
        AppError::Authorization(format!("missing permission {}", required))
    }

    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Transition(err) => match err {
                TransitionError::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "validation_failed"),
                TransitionError::Unauthorized { .. } => (StatusCode::FORBIDDEN, "forbidden"),
                TransitionError::IllegalTransition { .. } => (StatusCode::CONFLICT, "illegal_transition"),
                TransitionError::UnknownStatus(_) => (StatusCode::BAD_REQUEST, "unknown_status"),
            },
            AppError::Store(err) => match err {
                StoreError::ReportNotFound(_) | StoreError::NotificationNotFound(_) => {
                    (StatusCode::NOT_FOUND, "not_found")
                }
                StoreError::NotEditable(_) => (StatusCode::CONFLICT, "not_editable"),
                StoreError::LockPoisoned => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
            },
            AppError::Upload(err) => match err {
                UploadRejection::TooLarge { .. } => (StatusCode::PAYLOAD_TOO_LARGE, "file_too_large"),
                UploadRejection::UnsupportedType(_) => {
                    (StatusCode::UNSUPPORTED_MEDIA_TYPE, "unsupported_file_type")
                }
            },
            AppError::Authentication(_) => (StatusCode::UNAUTHORIZED, "unauthenticated"),
            AppError::Authorization(_) => (StatusCode::FORBIDDEN, "forbidden"),
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let details = if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
            "An internal server error occurred".to_string()
        } else {
            self.to_string()
        };

        let mut error = json!({
            "code": code,
            "message": status.canonical_reason().unwrap_or("Error"),
            "details": details,
        });
        if let AppError::Transition(TransitionError::Validation(fields)) = &self {
            error["fields"] = json!(fields);
        }

        (status, Json(json!({ "error": error }))).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::ReportStatus;

    #[test]
    fn test_illegal_and_unauthorized_are_distinct() {
        let illegal = AppError::from(TransitionError::IllegalTransition {
            from: ReportStatus::Approved,
            to: ReportStatus::Draft,
        });
        let unauthorized = AppError::from(TransitionError::Unauthorized {
            actor_id: uuid::Uuid::nil(),
            required: "reports.submit",
        });

        assert_eq!(illegal.status_and_code(), (StatusCode::CONFLICT, "illegal_transition"));
        assert_eq!(unauthorized.status_and_code(), (StatusCode::FORBIDDEN, "forbidden"));
    }

    #[test]
    fn test_upload_rejections() {
        let too_large = AppError::from(UploadRejection::TooLarge { max_size_mb: 10 });
        assert_eq!(too_large.status_and_code().0, StatusCode::PAYLOAD_TOO_LARGE);
        let wrong_type = AppError::from(UploadRejection::UnsupportedType("text/plain".into()));
        assert_eq!(wrong_type.status_and_code().0, StatusCode::UNSUPPORTED_MEDIA_TYPE);
    }
}
