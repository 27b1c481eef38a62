//! HTTP error mapping

use crate::{api::ErrorResponse, error::SegmentationError};
use axum::{
    extract::rejection::BytesRejection,
    extract::multipart::{MultipartError, MultipartRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

/// Result type for request handlers
pub type ApiResult<T> = Result<T, ApiError>;

/// Failures surfaced to HTTP clients as `{"error": "..."}`
#[derive(Error, Debug)]
pub enum ApiError {
    /// Malformed request (400)
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Body exceeds the configured limit (413)
    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    /// Pipeline failure, status derived from the error kind
    #[error(transparent)]
    Segmentation(#[from] SegmentationError),

    /// Handler failure outside the pipeline (500)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// Status code sent when legacy status mode is off
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Segmentation(err) if err.is_client_error() => StatusCode::BAD_REQUEST,
            Self::Segmentation(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Error category recorded in request logs
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "bad_request",
            Self::PayloadTooLarge(_) => "payload_too_large",
            Self::Segmentation(err) => err.kind(),
            Self::Internal(_) => "internal_error",
        }
    }

    fn from_status(status: StatusCode, body: String) -> Self {
        if status == StatusCode::PAYLOAD_TOO_LARGE {
            Self::PayloadTooLarge(body)
        } else if status.is_server_error() {
            Self::Internal(body)
        } else {
            Self::BadRequest(body)
        }
    }
}

impl From<BytesRejection> for ApiError {
    fn from(rejection: BytesRejection) -> Self {
        Self::from_status(rejection.status(), rejection.body_text())
    }
}

impl From<MultipartRejection> for ApiError {
    fn from(rejection: MultipartRejection) -> Self {
        Self::from_status(rejection.status(), rejection.body_text())
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        Self::from_status(err.status(), err.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, kind = self.kind(), "Request failed");
        } else {
            tracing::warn!(error = %self, kind = self.kind(), "Request rejected");
        }

        let body = match &self {
            Self::Segmentation(err) => ErrorResponse::from(err),
            other => ErrorResponse::new(other.to_string()),
        };

        (status, Json(body)).into_response()
    }
}
