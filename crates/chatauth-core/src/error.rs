//! Unified error handling for chatauth-core

use thiserror::Error;

/// Core error type for chatauth-core
#[derive(Error, Debug)]
pub enum Error {
    /// The server refused the request and explained why in `detail`
    #[error("Rejected ({status}): {detail}")]
    Rejected { status: u16, detail: String },

    /// Non-success status without a readable `detail`
    #[error("Unexpected HTTP status: {0}")]
    UnexpectedStatus(u16),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid header value: {0}")]
    InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias for chatauth-core
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a storage error
    pub fn storage(msg: impl Into<String>) -> Self {
        Error::Storage(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Server-provided `detail`, if this error carries a non-empty one
    pub fn detail(&self) -> Option<&str> {
        match self {
            Error::Rejected { detail, .. } if !detail.is_empty() => Some(detail),
            _ => None,
        }
    }

    /// HTTP status of the failed response, if the server answered at all
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Rejected { status, .. } => Some(*status),
            Error::UnexpectedStatus(status) => Some(*status),
            Error::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// True when the server answered 401
    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }
}

impl From<Error> for String {
    fn from(err: Error) -> Self {
        err.to_string()
    }
}
