//! Error types for the row store.
//!
//! Store operations themselves never fail: they report problems through
//! statuses and log output. Errors only surface from configuration parsing and
//! as the recorded reason of a failed datasource load.

/// Result type alias for row store operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the row store.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The configuration document could not be decoded.
    #[error("Invalid store configuration: {0}")]
    Config(#[from] toml::de::Error),

    /// A configuration value is out of range.
    #[error("Invalid value for '{field}': {message}")]
    InvalidConfig {
        field: &'static str,
        message: String,
    },

    /// The datasource reported a failed load.
    #[error("Datasource load failed: {0}")]
    Load(String),
}

impl Error {
    /// Create an invalid configuration value error.
    pub fn invalid_config(field: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field,
            message: message.into(),
        }
    }

    /// Create a load failure error.
    pub fn load(message: impl Into<String>) -> Self {
        Self::Load(message.into())
    }
}
