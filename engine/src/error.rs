//! Error types for the copy engine.
//!
//! `EngineError` covers failures that prevent a copy (or a batch of copies)
//! from starting: pre-flight checks, worklist scanning, control file access
//! and configuration. Failures that happen while bytes are moving are never
//! returned as `EngineError`; they are captured in the task's error cell and
//! observed through `TaskHandle::error_message`.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur before or around a transfer (never during one).
#[derive(Debug, Error)]
pub enum EngineError {
    /// The destination file already exists; nothing was touched.
    #[error("Destination file exists: {}", path.display())]
    DestinationExists { path: PathBuf },

    /// Source file or directory does not exist
    #[error("Source not found: {}", path.display())]
    SourceNotFound { path: PathBuf },

    /// Source is not accessible (permissions, broken mount, ...)
    #[error("Source access denied: {}", path.display())]
    SourceAccessDenied {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Path is unusable for the requested operation
    #[error("Invalid path: {} ({reason})", path.display())]
    InvalidPath { path: PathBuf, reason: String },

    /// Failed to list a source folder
    #[error("Failed to enumerate directory: {}", path.display())]
    EnumerationFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The control file holding folder watermarks is missing
    #[error("Control file not found: {}", path.display())]
    ControlFileNotFound { path: PathBuf },

    /// The control file could not be read or parsed
    #[error("Can't read control file {}: {reason}", path.display())]
    ControlFileInvalid { path: PathBuf, reason: String },

    /// The control file could not be written
    #[error("Can't save control file {}", path.display())]
    ControlFileWrite {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Configuration value out of range or unparsable
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// The background copy thread could not be started
    #[error("Failed to spawn copy thread")]
    Spawn(#[source] io::Error),
}

impl EngineError {
    /// Extract the OS error code from this error, if available.
    pub fn raw_os_error(&self) -> Option<u32> {
        match self {
            Self::SourceAccessDenied { source, .. }
            | Self::EnumerationFailed { source, .. }
            | Self::ControlFileWrite { source, .. }
            | Self::Spawn(source) => source.raw_os_error().map(|e| e as u32),
            _ => None,
        }
    }
}
