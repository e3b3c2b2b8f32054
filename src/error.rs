use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::fmt;

/// Handler error types
#[derive(Debug)]
pub enum AppError {
    /// Requested resource does not exist
    NotFound(String),
    /// Internal server error
    InternalError(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound(msg) => write!(f, "Not found: {}", msg),
            Self::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

/// Error raised by a handler, carried on the response it turned into
///
/// The logging middleware reads it to write the error line and puts it back,
/// so outer layers still see the same failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerFailure {
    pub status: StatusCode,
    pub detail: String,
}

impl fmt::Display for HandlerFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.detail)
    }
}

impl std::error::Error for HandlerFailure {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let failure = HandlerFailure {
            status,
            detail: self.to_string(),
        };

        let body = Json(json!({
            "error": {
                "message": failure.detail,
                "type": error_type_name(&self),
            }
        }));

        let mut response = (status, body).into_response();
        response.extensions_mut().insert(failure);
        response
    }
}

fn error_type_name(error: &AppError) -> &'static str {
    match error {
        AppError::NotFound(_) => "not_found",
        AppError::InternalError(_) => "internal_error",
    }
}
