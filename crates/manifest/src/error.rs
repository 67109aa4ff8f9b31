//! Error types for the manifest crate

use thiserror::Error;

/// Errors that can occur while loading a manifest
#[derive(Error, Debug)]
pub enum Error {
    /// Manifest document could not be parsed
    #[error("could not parse manifest: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// Manifest document contains no steps
    #[error("manifest contains no steps")]
    Empty,
}

/// Result type for manifest operations
pub type Result<T> = std::result::Result<T, Error>;
