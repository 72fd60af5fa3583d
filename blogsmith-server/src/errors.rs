use axum::{
    http,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

pub type WebResult<T> = std::result::Result<T, WebError>;

#[derive(thiserror::Error, Debug)]
pub enum WebError {
    #[error("Internal Server Error: {0}")]
    Internal(#[from] anyhow::Error),
    /// A required request field is missing or malformed. Reported before any
    /// provider call is attempted.
    #[error("{0}")]
    Validation(String),
    /// A provider call failed or returned a shape we could not use. The
    /// detail goes to the logs; the caller gets a generic message.
    #[error("{0}")]
    Provider(String),
    #[error("Not found")]
    NotFound,
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let status = match &self {
            WebError::Internal(_) | WebError::Provider(_) => http::StatusCode::INTERNAL_SERVER_ERROR,
            WebError::Validation(_) => http::StatusCode::BAD_REQUEST,
            WebError::NotFound => http::StatusCode::NOT_FOUND,
        };
        if status == http::StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, "request failed");
        }
        // Internal details never reach the caller as a stack trace, only as
        // a single error string.
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
