use shared::error::ServiceRejection;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ControllerError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

/// Any failure of a translation call. The controller treats every variant the
/// same way; the split only exists for logging and message wording.
#[derive(Debug, Clone, Error)]
pub enum RequestError {
    #[error("failed to reach translation service: {0}")]
    Transport(String),
    #[error("translation service rejected the request: {0}")]
    Rejected(ServiceRejection),
    #[error("translation service returned an unusable payload: {0}")]
    Payload(String),
}

impl RequestError {
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Rejected(rejection) => Some(rejection.status),
            _ => None,
        }
    }
}

fn error_chain(err: &dyn std::error::Error) -> String {
    let mut text = err.to_string();
    let mut source = err.source();
    while let Some(inner) = source {
        text.push_str(": ");
        text.push_str(&inner.to_string());
        source = inner.source();
    }
    text
}

impl From<reqwest::Error> for RequestError {
    fn from(err: reqwest::Error) -> Self {
        let detail = error_chain(&err);
        if err.is_timeout() {
            Self::Transport(format!("request timed out: {detail}"))
        } else if err.is_connect() {
            Self::Transport(format!("connection failed: {detail}"))
        } else if err.is_decode() || err.is_body() {
            Self::Payload(detail)
        } else {
            Self::Transport(detail)
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("invalid config file '{path}': {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
    #[error("invalid service url '{url}': {reason}")]
    ServiceUrl { url: String, reason: String },
    #[error("failed to build http client: {0}")]
    HttpClient(#[from] reqwest::Error),
}
