use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use logbox_core::{ErrorKind, LogboxError};
use serde::Serialize;
use tracing::{error, warn};

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

/// A failed request: status plus a message rendered as `{"error": ...}`.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl From<LogboxError> for ApiError {
    fn from(e: LogboxError) -> Self {
        let status = match e.kind() {
            ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
            ErrorKind::NotFound | ErrorKind::Forbidden => StatusCode::NOT_FOUND,
            ErrorKind::RemoteUnavailable
            | ErrorKind::RemoteNotFound
            | ErrorKind::CorruptArchive
            | ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            error!(error = %e, "request failed");
        } else if e.kind() == ErrorKind::Forbidden {
            warn!(error = %e, "path outside extraction root refused");
        }
        Self {
            status,
            message: e.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorBody {
                error: self.message,
            }),
        )
            .into_response()
    }
}
