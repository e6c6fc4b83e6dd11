use thiserror::Error;

/// Failures reported by a [`crate::metadata::source::MetadataSource`].
///
/// Connection, prepare and catalog failures are environment problems and are
/// propagated unchanged. [`MetadataError::ParameterType`] is the only variant
/// the pipeline absorbs: it degrades a single parameter to the text type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MetadataError {
    /// The metadata source could not reach its backing database.
    #[error("Connection error: {0}")]
    Connection(String),

    /// The statement could not be prepared for parameter introspection.
    #[error("Prepare error: {0}")]
    Prepare(String),

    /// A catalog lookup (table columns) failed.
    #[error("Catalog error: {0}")]
    Catalog(String),

    /// The driver type of a single bind position could not be determined.
    #[error("Parameter {position} type lookup failed: {message}")]
    ParameterType {
        /// 1-based bind position.
        position: usize,
        /// Driver-provided detail.
        message: String,
    },
}

/// The main error type for generation requests.
#[derive(Debug, Error)]
pub enum Error {
    /// Caller input or statement-shape violation. The message names the
    /// offending argument or rule.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Metadata source failure, propagated as-is.
    #[error(transparent)]
    Metadata(#[from] MetadataError),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create an [`Error::InvalidArgument`] from any message.
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }
}

/// Result type alias for generation operations.
pub type Result<T> = std::result::Result<T, Error>;
