//! Error types for the line stack.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for stack operations.
#[derive(Debug, Error)]
pub enum StackError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid value: line delimiter at byte {position}")]
    InvalidValue { position: usize },

    #[error("Stored line is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    #[error("Parent directory does not exist: {}", .0.display())]
    MissingDirectory(PathBuf),
}

/// Result type for stack operations.
pub type Result<T> = std::result::Result<T, StackError>;
