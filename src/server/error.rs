use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::error::ServiceError;

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'static str>,
}

/// JSON error response: `{"error": ...}` plus an optional hint
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    error: String,
    message: Option<&'static str>,
}

impl ApiError {
    pub fn bad_request(error: impl std::fmt::Display) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            error: error.to_string(),
            message: None,
        }
    }

    /// Attach a hint to input errors; server-side failures stay bare
    pub fn with_input_hint(mut self, hint: &'static str) -> Self {
        if self.status == StatusCode::BAD_REQUEST {
            self.message = Some(hint);
        }
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::NotLoaded(message) => Self {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                error: message.to_string(),
                message: None,
            },
            ServiceError::Prediction(e) => Self::bad_request(format!("{:#}", e)),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(status = %self.status, "{}", self.error);
        } else {
            tracing::warn!(status = %self.status, "prediction failed: {}", self.error);
        }
        let body = ErrorBody {
            error: self.error,
            message: self.message,
        };
        (self.status, Json(body)).into_response()
    }
}
