//! Error handling module for xscript
//!
//! Provides the error taxonomy using thiserror:
//! - `LoadError` - the catalog could not be read at startup
//! - `PersistError` - a run timestamp could not be written back
//! - `ExecError` - a script could not be started
//! - `XScriptError` - application-level errors for the shell and CLI

use std::path::PathBuf;
use thiserror::Error;

/// Failure to load the script catalog.
#[derive(Error, Debug)]
pub enum LoadError {
    /// The catalog file does not exist
    #[error("script catalog not found: {}", path.display())]
    NotFound { path: PathBuf },

    /// The catalog file exists but could not be read
    #[error("failed to read script catalog {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The catalog content is not a valid catalog document
    #[error("malformed script catalog {}: {source}", path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Failure to persist the catalog after a run.
#[derive(Error, Debug)]
pub enum PersistError {
    /// No catalog entry carries the requested name
    #[error("no script named '{0}' in the catalog")]
    UnknownEntry(String),

    #[error("failed to serialize script catalog: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Writing or replacing the catalog file failed
    #[error("failed to write script catalog {}: {source}", path.display())]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failure to start a script.
///
/// A script that starts and then exits non-zero is not an `ExecError`; that
/// outcome is reported through the output feed.
#[derive(Error, Debug)]
pub enum ExecError {
    /// The interpreter could not be launched (missing binary, permissions)
    #[error("failed to start {}: {source}", interpreter.display())]
    SpawnFailed {
        interpreter: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Output capture could not be attached to the child
    #[error("failed to capture script output: {0}")]
    StreamSetupFailed(String),
}

/// Main error type for the xscript application
#[derive(Error, Debug)]
pub enum XScriptError {
    /// IO errors (file operations, terminal, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Persist(#[from] PersistError),

    #[error(transparent)]
    Exec(#[from] ExecError),

    /// Terminal/UI errors
    #[error("Terminal error: {0}")]
    Terminal(String),

    /// State errors (invalid state, worker failures)
    #[error("State error: {0}")]
    State(String),
}

/// Result type alias for xscript operations
pub type Result<T> = std::result::Result<T, XScriptError>;

impl XScriptError {
    /// Create a terminal error
    pub fn terminal(msg: impl Into<String>) -> Self {
        Self::Terminal(msg.into())
    }

    /// Create a state error
    pub fn state(msg: impl Into<String>) -> Self {
        Self::State(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = XScriptError::terminal("raw mode unavailable");
        assert_eq!(err.to_string(), "Terminal error: raw mode unavailable");

        let err = PersistError::UnknownEntry("backup".to_string());
        assert_eq!(err.to_string(), "no script named 'backup' in the catalog");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: XScriptError = io_err.into();
        assert!(matches!(err, XScriptError::Io(_)));
    }

    #[test]
    fn test_exec_error_is_transparent() {
        let err: XScriptError = ExecError::StreamSetupFailed("stdout pipe missing".into()).into();
        assert_eq!(
            err.to_string(),
            "failed to capture script output: stdout pipe missing"
        );
    }

    #[test]
    fn test_load_error_mentions_path() {
        let err = LoadError::NotFound {
            path: PathBuf::from("/tmp/scripts/scripts.json"),
        };
        assert!(err.to_string().contains("/tmp/scripts/scripts.json"));
    }
}
