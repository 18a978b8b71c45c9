use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GalleryError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid section name: {0:?}")]
    InvalidSectionName(String),

    #[error("Section name collides with existing section '{0}'")]
    SectionExists(String),

    #[error("Invalid file name: {0:?}")]
    InvalidFilename(String),

    #[error("Invalid image handle: {0:?}")]
    InvalidHandle(String),

    #[error("Not found")]
    NotFound,
}

impl IntoResponse for GalleryError {
    fn into_response(self) -> Response {
        let status = match &self {
            GalleryError::InvalidSectionName(_)
            | GalleryError::InvalidFilename(_)
            | GalleryError::InvalidHandle(_) => StatusCode::BAD_REQUEST,
            GalleryError::SectionExists(_) => StatusCode::CONFLICT,
            GalleryError::NotFound => StatusCode::NOT_FOUND,
            GalleryError::IoError(_) => {
                tracing::error!("Gallery storage failure: {}", self);
                return (StatusCode::INTERNAL_SERVER_ERROR, "Storage error").into_response();
            }
        };

        (status, self.to_string()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (
                GalleryError::InvalidSectionName("..".to_string()),
                StatusCode::BAD_REQUEST,
            ),
            (
                GalleryError::InvalidHandle("../x.jpg".to_string()),
                StatusCode::BAD_REQUEST,
            ),
            (
                GalleryError::SectionExists("Foo".to_string()),
                StatusCode::CONFLICT,
            ),
            (GalleryError::NotFound, StatusCode::NOT_FOUND),
            (
                GalleryError::IoError(std::io::Error::other("disk full")),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (error, status) in cases {
            assert_eq!(error.into_response().status(), status);
        }
    }
}
