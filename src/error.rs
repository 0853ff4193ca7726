use thiserror::Error;

/// Failures produced while retrieving the entry list.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("network error: {0}")]
    Network(String),
    #[error("http error: status {0}")]
    Http(u16),
    #[error("all {attempts} retrieval strategies failed")]
    FetchExhausted { attempts: usize },
    #[error("malformed proxy envelope: {0}")]
    MalformedEnvelope(String),
    #[error("response body was empty")]
    EmptyPayload,
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => FetchError::Http(status.as_u16()),
            None => FetchError::Network(err.to_string()),
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config file: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("clipboard unavailable: {0}")]
pub struct ClipboardError(pub String);
