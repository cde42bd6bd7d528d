//! Events the controller broadcasts to the presentation layer.

use chrono::{DateTime, Utc};
use shared::{
    domain::{Revision, WorkflowState},
    error::RejectionCode,
};

use crate::error::RequestError;

#[derive(Debug, Clone)]
pub enum ControllerEvent {
    /// State moved on; re-render from a fresh snapshot.
    StateChanged {
        state: WorkflowState,
        revision: Revision,
    },
    Notification(Notification),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Info,
    Error,
}

#[derive(Debug, Clone)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
    pub raised_at: DateTime<Utc>,
}

impl Notification {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Error,
            message: message.into(),
            raised_at: Utc::now(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Info,
            message: message.into(),
            raised_at: Utc::now(),
        }
    }

    /// Error notifications are shown as a blocking alert.
    pub fn is_blocking(&self) -> bool {
        self.level == NotificationLevel::Error
    }
}

pub fn describe_request_failure(err: &RequestError) -> String {
    match err {
        RequestError::Transport(message) => {
            let lower = message.to_ascii_lowercase();
            if lower.contains("timed out") || lower.contains("timeout") {
                "Translation service timed out; retry the translation.".to_string()
            } else if lower.contains("connect")
                || lower.contains("connection refused")
                || lower.contains("dns")
            {
                "Translation service unreachable; check that it is running and retry.".to_string()
            } else {
                format!("Translation request failed: {message}")
            }
        }
        RequestError::Rejected(rejection) => match rejection.code {
            RejectionCode::MissingFilePart | RejectionCode::EmptyFileName => format!(
                "Translation service did not receive the image ({}).",
                rejection.message
            ),
            RejectionCode::UnsupportedFileType => {
                "Translation service only accepts PNG or JPEG images.".to_string()
            }
            RejectionCode::Internal => format!(
                "Translation service failed while processing the image (status {}); retry the translation.",
                rejection.status
            ),
            RejectionCode::Unknown => format!(
                "Translation service rejected the image (status {}): {}",
                rejection.status, rejection.message
            ),
        },
        RequestError::Payload(message) => {
            format!("Translation service returned an unreadable image: {message}")
        }
    }
}
