//! # Error Types
//!
//! Typed errors for the fallible edges of the core: the key-value store,
//! the audio output device and the export formats. The measurement model
//! itself is total and never fails.

use thiserror::Error;

/// Errors raised by a [`crate::storage::KeyValueStore`].
#[derive(Error, Debug)]
pub enum StoreError {
    /// Backing file could not be read or written
    #[error("Store I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Stored document or value is not valid JSON
    #[error("Store format error: {0}")]
    Format(#[from] serde_json::Error),

    /// Another thread panicked while holding the store lock
    #[error("Store lock poisoned")]
    LockPoisoned,
}

/// Errors raised while opening or driving the audio output device.
#[derive(Error, Debug)]
pub enum AudioError {
    /// No default output device on the host
    #[error("No output device available")]
    NoOutputDevice,

    /// The device offers no stereo f32 configuration
    #[error("No suitable f32 output format found")]
    NoSuitableFormat,

    /// The platform refused to build or start the stream
    #[error("Failed to open audio stream: {0}")]
    StreamOpenFailed(String),
}

/// Errors raised by the JSON export/import path.
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("JSON export error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Export I/O error: {0}")]
    Io(#[from] std::io::Error),
}
