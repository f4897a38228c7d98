// SPDX-License-Identifier: MIT OR Apache-2.0
//! Error types for the playback service.

use tether_timeline_core::PersistError;
use thiserror::Error;

/// Settings file failure
#[derive(Debug, Error)]
pub enum SettingsError {
    /// File system error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Settings file is not valid RON
    #[error("Settings parse error: {0}")]
    Parse(#[from] ron::error::SpannedError),

    /// Settings could not be encoded
    #[error("Settings encode error: {0}")]
    Encode(#[from] ron::Error),

    /// Written by a newer version of the service
    #[error("Settings version {found} is newer than supported version {supported}")]
    UnsupportedVersion {
        /// Version found in the file
        found: u32,
        /// Newest supported version
        supported: u32,
    },
}

/// Output sink failure
#[derive(Debug, Error)]
pub enum SinkError {
    /// Writing or opening the output failed
    #[error("Output IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding failed
    #[error("Output JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// RON encoding failed
    #[error("Output RON error: {0}")]
    Ron(#[from] ron::Error),
}

/// Top-level service failure
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Settings could not be loaded
    #[error(transparent)]
    Settings(#[from] SettingsError),

    /// Output could not be opened
    #[error(transparent)]
    Sink(#[from] SinkError),

    /// State file could not be loaded
    #[error("State file error: {0}")]
    State(#[from] PersistError),

    /// State file could not be watched
    #[error("File watcher error: {0}")]
    Watch(#[from] notify::Error),

    /// Runtime or stdin failure
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for the service
pub type ServiceResult<T> = std::result::Result<T, ServiceError>;
