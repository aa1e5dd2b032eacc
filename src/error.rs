use thiserror::Error;

/// Result type for softac operations
pub type Result<T> = std::result::Result<T, SacError>;

/// Main error type for the softac crate
#[derive(Debug, Error)]
pub enum SacError {
    /// Sampling asked for more transitions than the buffer holds
    #[error("Insufficient data: requested {requested} transitions, buffer holds {available}")]
    InsufficientData {
        requested: usize,
        available: usize,
    },

    /// The environment returned something that breaks its declared contract
    #[error("Environment contract violated: {0}")]
    EnvironmentContract(String),

    /// Invalid dimensions for operations
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        expected: String,
        actual: String,
    },

    /// Invalid parameter value
    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParameter {
        name: String,
        reason: String,
    },

    /// IO errors (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Numerical computation errors
    #[error("Numerical error: {0}")]
    Numerical(String),
}

impl From<bincode::Error> for SacError {
    fn from(err: bincode::Error) -> Self {
        SacError::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for SacError {
    fn from(err: serde_json::Error) -> Self {
        SacError::Serialization(err.to_string())
    }
}

// Helper functions for common error patterns
impl SacError {
    pub fn dimension_mismatch<S: Into<String>>(expected: S, actual: S) -> Self {
        SacError::DimensionMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    pub fn invalid_parameter<S: Into<String>>(name: S, reason: S) -> Self {
        SacError::InvalidParameter {
            name: name.into(),
            reason: reason.into(),
        }
    }

    pub fn environment<S: Into<String>>(msg: S) -> Self {
        SacError::EnvironmentContract(msg.into())
    }
}
