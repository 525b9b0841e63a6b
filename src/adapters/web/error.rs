//! HTTP error responses for web adapter.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::domain::error::StratsimError;
use crate::domain::response::ErrorResponse;

#[derive(Debug)]
pub struct WebError {
    pub status: StatusCode,
    pub message: String,
}

impl WebError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

pub fn status_from_error(err: &StratsimError) -> StatusCode {
    match err {
        StratsimError::MalformedStrategy { .. } => StatusCode::BAD_REQUEST,
        StratsimError::UnresolvableTicker { .. } => StatusCode::NOT_FOUND,
        StratsimError::InsufficientHistory { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        StratsimError::Computation { .. }
        | StratsimError::ConfigParse { .. }
        | StratsimError::ConfigMissing { .. }
        | StratsimError::ConfigInvalid { .. }
        | StratsimError::Json(_)
        | StratsimError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<StratsimError> for WebError {
    fn from(err: StratsimError) -> Self {
        Self::new(status_from_error(&err), ErrorResponse::from(&err).error)
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            error: self.message,
        };
        (self.status, Json(body)).into_response()
    }
}
