//! HTTP-facing error type: one place where internal failures become the
//! `{success: false, error}` JSON shape and a status code.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::parser::ParseError;
use crate::resolver::ResolveError;

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
    /// Primary file name, surfaced when resolution was exhausted so the UI
    /// can still show what it was trying to fetch.
    file_name: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    success: bool,
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    file_name: Option<String>,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
            file_name: None,
        }
    }

    pub fn method_not_allowed() -> Self {
        Self {
            status: StatusCode::METHOD_NOT_ALLOWED,
            message: "Method not allowed".to_owned(),
            file_name: None,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
            file_name: None,
        }
    }

    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<ParseError> for ApiError {
    fn from(error: ParseError) -> Self {
        Self::bad_request(error.to_string())
    }
}

impl From<ResolveError> for ApiError {
    fn from(error: ResolveError) -> Self {
        let status = match &error {
            ResolveError::UpstreamApi { .. } => StatusCode::BAD_REQUEST,
            ResolveError::NoFilesFound { .. } => StatusCode::NOT_FOUND,
            ResolveError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            ResolveError::ResolutionExhausted { .. }
            | ResolveError::PageFetch { .. }
            | ResolveError::Unexpected { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let file_name = match &error {
            ResolveError::ResolutionExhausted { file_name } => file_name.clone(),
            _ => None,
        };
        Self {
            status,
            message: error.to_string(),
            file_name,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            success: false,
            error: self.message,
            file_name: self.file_name,
        });
        (self.status, body).into_response()
    }
}
