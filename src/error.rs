//! Error types for the EEG-to-MIDI system

use std::fmt;

/// Custom error type for EEG-to-MIDI processing
#[derive(Debug, Clone)]
pub enum EegError {
    /// E001: Malformed or empty numeric input to an extraction/mapping function
    InputError(String),
    /// E002: Submitted file failed extension/size validation
    ValidationError(String),
    /// E003: Duplicate active job for the same input file
    ConflictError(String),
    /// E004: Unknown job or file identifier
    NotFoundError(String),
    /// E005: Unexpected failure inside a pipeline stage
    StageFailure(String),
    /// E006: EEG container decoding error
    ReaderError(String),
    /// E007: Configuration validation failed
    ConfigError(String),
    /// E008: Artifact serialization/export error
    ExportError(String),
    /// E009: MIDI encoding error
    MidiError(String),
    /// E010: Plot rendering error
    PlotError(String),
}

impl fmt::Display for EegError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EegError::InputError(msg) => {
                write!(f, "E001: Invalid input - {}", msg)
            }
            EegError::ValidationError(msg) => {
                write!(f, "E002: File validation failed - {}", msg)
            }
            EegError::ConflictError(msg) => {
                write!(f, "E003: Conflicting job - {}", msg)
            }
            EegError::NotFoundError(msg) => {
                write!(f, "E004: Not found - {}", msg)
            }
            EegError::StageFailure(msg) => {
                write!(f, "E005: Pipeline stage failed - {}", msg)
            }
            EegError::ReaderError(msg) => {
                write!(f, "E006: EEG reader error - {}", msg)
            }
            EegError::ConfigError(msg) => {
                write!(f, "E007: Configuration validation failed - {}", msg)
            }
            EegError::ExportError(msg) => {
                write!(f, "E008: Artifact export error - {}", msg)
            }
            EegError::MidiError(msg) => {
                write!(f, "E009: MIDI encoding error - {}", msg)
            }
            EegError::PlotError(msg) => {
                write!(f, "E010: Plot rendering error - {}", msg)
            }
        }
    }
}

impl std::error::Error for EegError {}

// From implementations for common error types
impl From<std::io::Error> for EegError {
    fn from(err: std::io::Error) -> Self {
        EegError::StageFailure(format!("File I/O error: {}", err))
    }
}

impl From<serde_json::Error> for EegError {
    fn from(err: serde_json::Error) -> Self {
        EegError::ExportError(format!("JSON serialization error: {}", err))
    }
}

impl From<anyhow::Error> for EegError {
    fn from(err: anyhow::Error) -> Self {
        EegError::StageFailure(format!("Generic error: {}", err))
    }
}

// Note: Plotters errors are handled manually in the code due to complex type parameters

/// Result type alias for EEG-to-MIDI operations
pub type Result<T> = std::result::Result<T, EegError>;
