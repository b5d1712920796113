//! Error types for ScaryCat

use std::path::PathBuf;

/// Result type alias using ScaryCat's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Boxed cause carried by the wrapping error variants
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Core error type for ScaryCat operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Discovery root (model directory or bundle) does not exist
    #[error("resource not found: {}", .0.display())]
    ResourceNotFound(PathBuf),

    /// No model sources were given, or none were collected
    #[error("no usable models found")]
    ModelNotFound,

    /// A single model failed while loading the catalog
    #[error("failed to load model '{model}': {source}")]
    ModelLoadFailed {
        model: String,
        #[source]
        source: BoxError,
    },

    /// A model's inference call failed while scoring an image
    #[error("prediction failed for model '{model}': {source}")]
    PredictionFailed {
        model: String,
        #[source]
        source: BoxError,
    },

    /// Probability threshold outside [0, 1]
    #[error("invalid probability threshold: {0} (expected a value in [0, 1])")]
    InvalidThreshold(f32),

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),

    /// Filesystem errors
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic internal errors
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a new model load error
    pub fn model_load_failed(model: impl Into<String>, cause: impl Into<BoxError>) -> Self {
        Self::ModelLoadFailed {
            model: model.into(),
            source: cause.into(),
        }
    }

    /// Create a new prediction error
    pub fn prediction_failed(model: impl Into<String>, cause: impl Into<BoxError>) -> Self {
        Self::PredictionFailed {
            model: model.into(),
            source: cause.into(),
        }
    }

    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// True for errors that make a catalog impossible to build
    pub fn is_construction_error(&self) -> bool {
        matches!(
            self,
            Self::ResourceNotFound(_) | Self::ModelNotFound | Self::ModelLoadFailed { .. }
        )
    }
}

/// Error returned by inference backends from `load` and `infer`
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// Plain failure description
    #[error("{0}")]
    Message(String),

    /// Failure with an underlying cause
    #[error("{context}: {source}")]
    Wrapped {
        context: String,
        #[source]
        source: BoxError,
    },
}

impl BackendError {
    /// Create a backend error from a message
    pub fn msg(msg: impl Into<String>) -> Self {
        Self::Message(msg.into())
    }

    /// Wrap an underlying cause with context
    pub fn wrap(context: impl Into<String>, cause: impl Into<BoxError>) -> Self {
        Self::Wrapped {
            context: context.into(),
            source: cause.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_prediction_failed_keeps_cause() {
        let err = Error::prediction_failed("ears_back", BackendError::msg("tensor shape mismatch"));

        assert_eq!(
            err.to_string(),
            "prediction failed for model 'ears_back': tensor shape mismatch"
        );
        assert_eq!(err.source().unwrap().to_string(), "tensor shape mismatch");
        assert!(!err.is_construction_error());
    }

    #[test]
    fn test_construction_errors() {
        assert!(Error::ModelNotFound.is_construction_error());
        assert!(Error::ResourceNotFound(PathBuf::from("/missing")).is_construction_error());
        assert!(Error::model_load_failed("m", BackendError::msg("corrupt")).is_construction_error());
        assert!(!Error::InvalidThreshold(1.5).is_construction_error());
    }

    #[test]
    fn test_backend_error_wrap() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "weights.safetensors");
        let err = BackendError::wrap("failed to read weights", io);

        assert_eq!(err.to_string(), "failed to read weights: weights.safetensors");
        assert!(err.source().is_some());
    }
}
