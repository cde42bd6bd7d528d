use serde::{Deserialize, Serialize};
use thiserror::Error;

/// JSON envelope the translation service answers with on rejection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServiceErrorBody {
    pub error: String,
}

impl ServiceErrorBody {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionCode {
    MissingFilePart,
    EmptyFileName,
    UnsupportedFileType,
    Internal,
    Unknown,
}

#[derive(Debug, Clone, Error)]
#[error("{code:?} ({status}): {message}")]
pub struct ServiceRejection {
    pub code: RejectionCode,
    pub status: u16,
    pub message: String,
}

impl ServiceRejection {
    pub fn from_response(status: u16, body: Option<ServiceErrorBody>) -> Self {
        let message = body
            .map(|body| body.error)
            .unwrap_or_else(|| "no error details in response".to_string());
        let lower = message.to_ascii_lowercase();
        let code = if lower.contains("no file part") {
            RejectionCode::MissingFilePart
        } else if lower.contains("no selected file") {
            RejectionCode::EmptyFileName
        } else if lower.contains("not allowed") {
            RejectionCode::UnsupportedFileType
        } else if status >= 500 {
            RejectionCode::Internal
        } else {
            RejectionCode::Unknown
        };

        Self {
            code,
            status,
            message,
        }
    }
}
