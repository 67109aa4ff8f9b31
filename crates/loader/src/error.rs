//! Error types for content retrieval

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while retrieving content
#[derive(Error, Debug)]
pub enum Error {
    /// Local file could not be read
    #[error("cannot read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// HTTP request failed
    #[error("HTTP request failed for {location}: {message}")]
    Http {
        location: String,
        message: String,
        status: Option<u16>,
    },

    /// Location string is not something the loader understands
    #[error("invalid location: {0}")]
    InvalidLocation(String),
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn http(location: impl Into<String>, err: &ureq::Error) -> Self {
        match err {
            ureq::Error::StatusCode(code) => Self::Http {
                location: location.into(),
                message: format!("HTTP {code}"),
                status: Some(*code),
            },
            other => Self::Http {
                location: location.into(),
                message: other.to_string(),
                status: None,
            },
        }
    }
}

/// Result type for loader operations
pub type Result<T> = std::result::Result<T, Error>;
