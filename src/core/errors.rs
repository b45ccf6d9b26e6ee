//! Error types for the debug info library

use std::path::PathBuf;

/// Error types for the library
#[derive(thiserror::Error, Debug)]
pub enum DbgError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("debug info format version {major}.{minor} is no longer supported")]
    UnsupportedVersion { major: u32, minor: u32 },
    #[error("{errors} error(s) in debug info file {}", .path.display())]
    InvalidDebugFile { path: PathBuf, errors: u32 },
}

/// Result type used throughout the library
pub type Result<T> = anyhow::Result<T>;
