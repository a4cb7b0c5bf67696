//! Error types for the glider watchdog

use thiserror::Error;

/// Main error type for the watchdog
#[derive(Error, Debug)]
pub enum WatchdogError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Watcher error: {0}")]
    WatcherError(#[from] notify::Error),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Shutdown error: {0}")]
    ShutdownError(String),
}
