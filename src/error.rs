//! Error handling for the CloudPOS client

use std::fmt;
use thiserror::Error;

/// Unified error type for the CloudPOS client
#[derive(Error, Debug)]
pub enum Error {
    /// Errors raised by the HTTP stack while building the client or a request
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization or deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parsing errors
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    /// Failure reported by the API or by the transport (status 0).
    ///
    /// Displays only the human-readable message so it can be shown as-is.
    #[error("{message}")]
    Api {
        /// HTTP status, or 0 when the server could not be reached
        status: u16,
        /// Human-readable message extracted from the response
        message: String,
    },

    /// A service precondition was not met
    #[error("{0}")]
    Validation(String),

    /// Linking or login errors
    #[error("{0}")]
    Auth(String),

    /// General errors
    #[error("{0}")]
    General(String),
}

impl Error {
    /// Create a new API error
    pub fn api<T: fmt::Display>(status: u16, msg: T) -> Self {
        Error::Api {
            status,
            message: msg.to_string(),
        }
    }

    /// Create a new validation error
    pub fn validation<T: fmt::Display>(msg: T) -> Self {
        Error::Validation(msg.to_string())
    }

    /// Create a new authentication error
    pub fn auth<T: fmt::Display>(msg: T) -> Self {
        Error::Auth(msg.to_string())
    }

    /// Create a new general error
    pub fn general<T: fmt::Display>(msg: T) -> Self {
        Error::General(msg.to_string())
    }

    /// HTTP status carried by an API error
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
