//! Relay error types.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::client::ChatErrorBody;

/// Errors surfaced to relay callers as `{"error": ...}`
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("Message is required")]
    MissingMessage,

    #[error("Invalid JSON body")]
    InvalidBody,

    #[error("Method not allowed")]
    MethodNotAllowed,

    /// Upstream answered with a non-200 status
    #[error("API error: {0}")]
    Upstream(u16),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl RelayError {
    pub fn status(&self) -> StatusCode {
        match self {
            RelayError::MissingMessage | RelayError::InvalidBody => StatusCode::BAD_REQUEST,
            RelayError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            RelayError::Upstream(_) | RelayError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let body = Json(ChatErrorBody {
            error: self.to_string(),
        });
        (self.status(), body).into_response()
    }
}

impl From<reqwest::Error> for RelayError {
    fn from(e: reqwest::Error) -> Self {
        RelayError::Internal(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_and_statuses() {
        assert_eq!(RelayError::MissingMessage.to_string(), "Message is required");
        assert_eq!(RelayError::Upstream(503).to_string(), "API error: 503");
        assert_eq!(RelayError::Internal("boom".into()).to_string(), "Internal error: boom");

        assert_eq!(RelayError::InvalidBody.status(), StatusCode::BAD_REQUEST);
        assert_eq!(RelayError::MethodNotAllowed.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(RelayError::Upstream(401).status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
