//! HTTP error responses.
//!
//! Errors are rendered as short plain-text bodies, which is what a browser
//! shows when a link or form submission fails.

use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::{debug, error};

use crate::files::{BrowserError, TransferError};

/// Text shown when the daemon runs without a shared folder.
pub const NO_SHARED_FOLDER: &str = "No folder selected for sharing.";

/// Error returned by request handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    /// No folder is being shared.
    #[error("No folder selected for sharing.")]
    NoSharedFolder,

    /// The listed folder does not exist.
    #[error("Folder not found")]
    FolderNotFound,

    /// The downloaded file does not exist.
    #[error("File not found")]
    FileNotFound,

    /// The path resolves outside the shared folder.
    #[error("Invalid path")]
    PathOutsideRoot,

    /// The upload form had no `files` field.
    #[error("No files part")]
    NoFilesPart,

    /// An uploaded file name was rejected.
    #[error("Invalid file name: {0}")]
    InvalidFileName(String),

    /// An upload would replace a directory.
    #[error("A folder with that name already exists: {0}")]
    IsADirectory(String),

    /// Access to the path was denied by the OS.
    #[error("Permission denied")]
    PermissionDenied,

    /// The multipart body could not be read.
    #[error("Malformed upload: {0}")]
    Multipart(#[from] MultipartError),

    /// Anything else.
    #[error("Internal server error")]
    Internal(String),
}

impl ApiError {
    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NoSharedFolder => StatusCode::OK,
            ApiError::FolderNotFound | ApiError::FileNotFound => StatusCode::NOT_FOUND,
            ApiError::PathOutsideRoot
            | ApiError::NoFilesPart
            | ApiError::InvalidFileName(_)
            | ApiError::IsADirectory(_) => StatusCode::BAD_REQUEST,
            ApiError::PermissionDenied => StatusCode::FORBIDDEN,
            ApiError::Multipart(e) => e.status(),
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Convert an error from the listing path.
    pub fn from_listing(err: BrowserError) -> Self {
        match err {
            BrowserError::PathNotFound(_) | BrowserError::NotADirectory(_) => {
                ApiError::FolderNotFound
            }
            BrowserError::PathOutsideRoot(_) => ApiError::PathOutsideRoot,
            BrowserError::PermissionDenied(_) => ApiError::PermissionDenied,
            BrowserError::Io(e) => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<TransferError> for ApiError {
    fn from(err: TransferError) -> Self {
        match err {
            TransferError::FileNotFound(_) => ApiError::FileNotFound,
            TransferError::PathOutsideRoot(_) => ApiError::PathOutsideRoot,
            TransferError::InvalidFileName(name) => ApiError::InvalidFileName(name),
            TransferError::IsADirectory(name) => ApiError::IsADirectory(name),
            TransferError::PermissionDenied(_) => ApiError::PermissionDenied,
            TransferError::Io(e) if e.kind() == std::io::ErrorKind::NotFound => {
                ApiError::FileNotFound
            }
            TransferError::Io(e) => ApiError::Internal(e.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if let ApiError::Internal(detail) = &self {
            error!("Request failed: {}", detail);
        } else {
            debug!("Request rejected ({}): {}", status, self);
        }
        (status, self.to_string()).into_response()
    }
}
