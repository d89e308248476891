//! Error types and error handling for the application
//!
//! This module defines custom error types that can be converted to HTTP responses.
//! All errors implement `IntoResponse` to provide consistent error formatting.

use crate::services::ProtectError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Body sent when a request carries no `pdfFile` field
pub const NO_FILE_MESSAGE: &str = "No file uploaded.";

/// Application-level error types
///
/// All errors that can occur in the application are represented by this enum.
/// Each variant implements automatic conversion to HTTP responses via `IntoResponse`.
#[derive(Error, Debug)]
pub enum AppError {
    /// Request did not include a `pdfFile` field
    #[error("No file uploaded.")]
    MissingFile,

    /// Request did not include a password and the fallback is disabled
    #[error("No password supplied")]
    MissingPassword,

    /// Multipart body could not be read
    #[error("Invalid multipart request: {0}")]
    InvalidMultipart(String),

    /// Request body exceeded the configured upload limit
    #[error("Upload too large: {0}")]
    PayloadTooLarge(String),

    /// Upload is not a PDF the service can work with
    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    /// Request came from an origin other than the configured one
    #[error("Origin not allowed: {0}")]
    OriginNotAllowed(String),

    /// Encrypting or serializing the document failed
    #[error("Protection failed: {0}")]
    Protection(String),

    /// Scratch storage could not be read or written
    #[error("Storage error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal server error (catch-all for unexpected errors)
    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<ProtectError> for AppError {
    fn from(err: ProtectError) -> Self {
        match err {
            ProtectError::Parse(_)
            | ProtectError::MalformedPageTree(_)
            | ProtectError::AlreadyEncrypted => AppError::InvalidDocument(err.to_string()),
            ProtectError::Encryption(_) | ProtectError::Serialize(_) => {
                AppError::Protection(err.to_string())
            }
            ProtectError::Io(e) => AppError::Io(e),
        }
    }
}

impl AppError {
    /// HTTP status this error is reported with
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::MissingFile => StatusCode::BAD_REQUEST,
            AppError::MissingPassword => StatusCode::BAD_REQUEST,
            AppError::InvalidMultipart(_) => StatusCode::BAD_REQUEST,
            AppError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::InvalidDocument(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::OriginNotAllowed(_) => StatusCode::FORBIDDEN,
            AppError::Protection(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Front-ends match on this exact plain-text body
        if let AppError::MissingFile = self {
            return (status, NO_FILE_MESSAGE).into_response();
        }

        let body = Json(json!({
            "error": self.to_string(),
            "status": status.as_u16(),
        }));

        (status, body).into_response()
    }
}
