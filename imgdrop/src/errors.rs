use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error as ThisError;

/// Message returned when the upload part cannot be located in the form
pub const RETRIEVE_FAILED: &str = "Error retrieving the file";
/// Message returned when the upload part cannot be read to completion
pub const READ_FAILED: &str = "Invalid file";
/// Message returned when the client-supplied filename is refused
pub const INVALID_FILE_NAME: &str = "Invalid file name";
/// Message returned when the request body exceeds the configured form size
pub const TOO_LARGE: &str = "File too large";

#[derive(ThisError, Debug)]
pub enum Error {
    /// Malformed or incomplete request data
    #[error("{message}")]
    BadRequest { message: String },

    /// Request body exceeded the configured form size
    #[error("{message}")]
    PayloadTooLarge { message: String },

    /// Upload content was sniffed as something other than an image
    #[error("Unsupported media type: {content_type}")]
    UnsupportedMediaType { content_type: String },

    /// Filesystem failure while persisting an upload
    #[error("Failed to {operation}: {source}")]
    Storage {
        operation: String,
        #[source]
        source: std::io::Error,
    },

    /// Generic internal service error
    #[error("Failed to {operation}")]
    Internal { operation: String },
}

impl Error {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Error::BadRequest { message: message.into() }
    }

    pub fn storage(operation: impl Into<String>, source: std::io::Error) -> Self {
        Error::Storage {
            operation: operation.into(),
            source,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Error::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Error::UnsupportedMediaType { .. } => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Error::Storage { .. } | Error::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns a user-safe error message, without leaking filesystem paths or OS error details
    pub fn user_message(&self) -> String {
        match self {
            Error::BadRequest { message } | Error::PayloadTooLarge { message } => message.clone(),
            Error::UnsupportedMediaType { .. } => "Invalid file type".to_string(),
            Error::Storage { .. } => "Error saving the file".to_string(),
            Error::Internal { .. } => "Internal server error".to_string(),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match &self {
            Error::Storage { .. } | Error::Internal { .. } => {
                tracing::error!("Internal service error: {:#}", self);
            }
            Error::PayloadTooLarge { .. } => {
                tracing::warn!("Client error: {}", self);
            }
            Error::BadRequest { .. } | Error::UnsupportedMediaType { .. } => {
                tracing::debug!("Client error: {}", self);
            }
        }

        (self.status_code(), self.user_message()).into_response()
    }
}

/// Type alias for handler results
pub type Result<T> = std::result::Result<T, Error>;
