use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::fmt;

#[derive(Debug)]
pub enum SessionError {
    Unauthorized,
    InvalidPassword,
    InternalError(String),
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::Unauthorized => write!(f, "Authentication required"),
            SessionError::InvalidPassword => write!(f, "Invalid passkey"),
            SessionError::InternalError(e) => write!(f, "Internal error: {}", e),
        }
    }
}

impl std::error::Error for SessionError {}

impl IntoResponse for SessionError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            SessionError::Unauthorized => (StatusCode::UNAUTHORIZED, "Authentication required"),
            SessionError::InvalidPassword => (StatusCode::UNAUTHORIZED, "Invalid passkey"),
            SessionError::InternalError(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        };

        (status, message).into_response()
    }
}
