//! Error types for wbutil.

use std::path::Path;

/// Boxed error carried by variants that wrap caller-supplied failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that can occur across the wbutil helpers.
///
/// All error variants are marked with `#[non_exhaustive]` to allow
/// adding new error types without breaking changes.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// I/O error (file operations)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// I/O error tied to a specific path
    #[error("I/O error at {path}: {source}")]
    IoPath {
        /// Path that was being accessed
        path: String,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML decoding error
    #[error("TOML error: {0}")]
    TomlDecode(#[from] toml::de::Error),

    /// TOML encoding error
    #[error("TOML error: {0}")]
    TomlEncode(#[from] toml::ser::Error),

    /// CSV reading error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Input validation error
    #[error("Validation error: {message}")]
    Validation {
        /// Field or aspect that failed validation
        field: Option<String>,
        /// What went wrong
        message: String,
    },

    /// An operation that needs at least one element got none
    #[error("Empty input: {operation} requires at least one value")]
    EmptyInput {
        /// Name of the operation
        operation: &'static str,
    },

    /// A label outside the known label set
    #[error("Label {label} is not a known label")]
    UnknownLabel {
        /// The offending label, rendered as text
        label: String,
    },

    /// A cell that could not be parsed into the expected type
    #[error("Cannot parse {value:?}: {message}")]
    Parse {
        /// Raw cell text
        value: String,
        /// What went wrong
        message: String,
    },

    /// A decision tree node had branches but none accepted the instance
    #[error("No branch accepted {instance}")]
    NoBranch {
        /// The rejected instance, rendered as text
        instance: String,
    },

    /// Every permitted attempt of a retried operation failed
    #[error("Function application failed after {attempts} attempts")]
    RetriesExhausted {
        /// Number of attempts made
        attempts: u32,
        /// The last failure, if any attempt ran
        #[source]
        source: Option<BoxError>,
    },

    /// A caller-supplied operation failed
    #[error("Operation failed: {message}")]
    Operation {
        /// Human-readable error message
        message: String,
        /// Source error
        #[source]
        source: Option<BoxError>,
    },

    /// Attempt to start a pipeline twice
    #[error("Pipelines cannot be reused")]
    PipelineReused,

    /// Attempt to submit work to a pipeline that has been shut down
    #[error("This pipeline has already been stopped")]
    PipelineStopped,

    /// Result requested for a key that was never submitted
    #[error("Unknown pipeline key: {key}")]
    UnknownKey {
        /// Key that was not found
        key: String,
    },

    /// Wait timed out
    #[error("Timed out after {millis}ms")]
    Timeout {
        /// Timeout duration in milliseconds
        millis: u64,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    Config {
        /// What configuration is problematic
        message: String,
    },
}

/// Convenience `Result` type alias for wbutil operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Returns whether this error is retryable.
    ///
    /// Retryable errors are transient: I/O failures, timeouts, and failures
    /// of caller-supplied operations.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Io(_) | Error::IoPath { .. } => true,
            Error::Timeout { .. } => true,
            Error::Operation { .. } => true,
            Error::Serialization(_)
            | Error::TomlDecode(_)
            | Error::TomlEncode(_)
            | Error::Csv(_)
            | Error::Validation { .. }
            | Error::EmptyInput { .. }
            | Error::UnknownLabel { .. }
            | Error::Parse { .. }
            | Error::NoBranch { .. }
            | Error::RetriesExhausted { .. }
            | Error::PipelineReused
            | Error::PipelineStopped
            | Error::UnknownKey { .. }
            | Error::Config { .. } => false,
        }
    }

    /// Creates an I/O error that records the path involved.
    pub fn io_with_path(source: std::io::Error, path: impl AsRef<Path>) -> Self {
        Error::IoPath {
            path: path.as_ref().display().to_string(),
            source,
        }
    }

    /// Creates a new validation error.
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Error::Validation {
            field: None,
            message: message.into(),
        }
    }

    /// Creates a new validation error with a field name.
    pub fn validation_field<F, M>(field: F, message: M) -> Self
    where
        F: Into<String>,
        M: Into<String>,
    {
        Error::Validation {
            field: Some(field.into()),
            message: message.into(),
        }
    }

    /// Creates an operation error with a message.
    pub fn operation<S: Into<String>>(message: S) -> Self {
        Error::Operation {
            message: message.into(),
            source: None,
        }
    }

    /// Creates an operation error with a message and source error.
    pub fn operation_with_source<S, E>(message: S, source: E) -> Self
    where
        S: Into<String>,
        E: std::error::Error + Send + Sync + 'static,
    {
        Error::Operation {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Creates a parse error for a raw cell.
    pub fn parse<V, M>(value: V, message: M) -> Self
    where
        V: Into<String>,
        M: Into<String>,
    {
        Error::Parse {
            value: value.into(),
            message: message.into(),
        }
    }

    /// Creates a new configuration error.
    pub fn config<S: Into<String>>(message: S) -> Self {
        Error::Config {
            message: message.into(),
        }
    }
}
