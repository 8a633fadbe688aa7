use crate::{
    config::ConfigError,
    services::{key_service::KeyError, storage_service::StorageError},
};
use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::fmt;

/// An HTTP status paired with the human-readable message sent to the caller.
///
/// Every failure of the ingestion endpoint ends up here; the body is plain text.
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    /// Create a new AppError with a specific status and message.
    pub fn new(status: StatusCode, msg: impl Into<String>) -> Self {
        Self {
            status,
            message: msg.into(),
        }
    }

    /// Shortcut for a 500 Internal Server Error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, msg)
    }

    /// Shortcut for 400 Bad Request
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, msg)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (self.status, self.message).into_response()
    }
}

impl From<ConfigError> for AppError {
    fn from(err: ConfigError) -> Self {
        AppError::internal(err.to_string())
    }
}

impl From<KeyError> for AppError {
    fn from(err: KeyError) -> Self {
        AppError::bad_request(err.to_string())
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        let status = match err {
            StorageError::Network(_) => StatusCode::BAD_GATEWAY,
            StorageError::Authorization(_) | StorageError::Rejected(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        AppError::new(status, err.to_string())
    }
}

/// Oversized bodies surface as 413, anything else malformed as 400.
impl From<MultipartError> for AppError {
    fn from(err: MultipartError) -> Self {
        AppError::new(err.status(), err.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_errors_are_server_side_statuses() {
        let network: AppError = StorageError::Network("reset".into()).into();
        assert_eq!(network.status, StatusCode::BAD_GATEWAY);

        let auth: AppError = StorageError::Authorization("denied".into()).into();
        assert_eq!(auth.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(auth.message.contains("denied"));
    }

    #[test]
    fn config_errors_are_500_with_the_missing_names() {
        let err: AppError = ConfigError::Missing(vec!["BUCKET_NAME"]).into();
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.message, "Missing environment variables: BUCKET_NAME");
    }

    #[test]
    fn key_errors_are_client_errors() {
        let err: AppError = KeyError::MissingExtension("README".into()).into();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);

        let err: AppError = KeyError::UnsupportedExtension {
            filename: "song.mp3 ".into(),
            extension: "mp3 ".into(),
        }
        .into();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert!(err.message.contains("`mp3 `"));
    }
}
