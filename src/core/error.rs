//! Error types for the packaging pipeline

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while packaging a running process
#[derive(Error, Debug)]
pub enum PackError {
    /// No candidate process, or a mandatory input is absent
    #[error("Not found: {0}")]
    NotFound(String),

    /// The diagnostic-attach tool could not be run or reported an error
    #[error("Diagnostic query failed: {0}")]
    QueryFailure(String),

    /// The diagnostic text carries no initial classpath
    #[error("No classpath found in diagnostic output")]
    MissingClasspath,

    /// A recognized diagnostic pattern appeared more than once
    #[error("Diagnostic field '{field}' appears {count} times; refusing to guess")]
    AmbiguousDiagnostics { field: &'static str, count: usize },

    /// A single entry could not be mirrored
    #[error("Failed to copy {source_path:?} -> {destination:?}: {reason}")]
    CopyFailure {
        source_path: PathBuf,
        destination: PathBuf,
        reason: String,
    },

    /// Two distinct sources would land on the same destination
    #[error("Destination collision at '{destination}': {first} and {second}")]
    Collision {
        destination: String,
        first: String,
        second: String,
    },

    /// An external tool exited unsuccessfully
    #[error("{tool} failed: {message}")]
    FatalToolFailure { tool: String, message: String },

    /// A classpath entry cannot be remapped into the package
    #[error("Cannot remap path '{path}': {reason}")]
    InvalidPath { path: String, reason: &'static str },

    /// Configuration is unusable
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),
}
