#[cfg(feature = "server")]
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
#[cfg(feature = "server")]
use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AdjustError {
    #[error("Invalid image file: {}: {reason}", .path.display())]
    InvalidImage { path: PathBuf, reason: String },

    #[error("Unsupported pixel format: {0}")]
    UnsupportedFormat(String),

    #[error("Failed to process image: {0}")]
    ProcessingError(String),

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid limits: min {min} must be below max {max}")]
    InvalidLimits { min: u8, max: u8 },

    #[error("Invalid cutoff: {0}")]
    InvalidCutoff(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Missing file in request")]
    MissingFile,

    #[error("Image too large: {size} bytes (max: {max} bytes)")]
    ImageTooLarge { size: usize, max: usize },

    #[error("Input closed before an answer was given")]
    InputClosed,

    #[error("Invalid session manifest {}: {reason}", .path.display())]
    Manifest { path: PathBuf, reason: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AdjustError {
    /// Attach the offending path to an I/O error
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidImage { .. } => "INVALID_IMAGE",
            Self::UnsupportedFormat(_) => "UNSUPPORTED_FORMAT",
            Self::ProcessingError(_) => "PROCESSING_ERROR",
            Self::Io { .. } => "IO_ERROR",
            Self::InvalidLimits { .. } => "INVALID_LIMITS",
            Self::InvalidCutoff(_) => "INVALID_CUTOFF",
            Self::InvalidRequest(_) => "INVALID_REQUEST",
            Self::MissingFile => "MISSING_FILE",
            Self::ImageTooLarge { .. } => "IMAGE_TOO_LARGE",
            Self::InputClosed => "INPUT_CLOSED",
            Self::Manifest { .. } => "INVALID_MANIFEST",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

#[cfg(feature = "server")]
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

#[cfg(feature = "server")]
impl IntoResponse for AdjustError {
    fn into_response(self) -> Response {
        let status = match &self {
            AdjustError::InvalidImage { .. }
            | AdjustError::UnsupportedFormat(_)
            | AdjustError::InvalidLimits { .. }
            | AdjustError::InvalidCutoff(_)
            | AdjustError::InvalidRequest(_)
            | AdjustError::MissingFile => StatusCode::BAD_REQUEST,
            AdjustError::ImageTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            AdjustError::ProcessingError(_)
            | AdjustError::Io { .. }
            | AdjustError::InputClosed
            | AdjustError::Manifest { .. }
            | AdjustError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(ErrorResponse {
            error: self.to_string(),
            code: self.code().to_string(),
        });

        (status, body).into_response()
    }
}
