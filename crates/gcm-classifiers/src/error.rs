use smartcore::error::Failed;
use thiserror::Error;

/// Errors raised by the classifier adapters.
#[derive(Debug, Error)]
pub enum ClassifierError {
    /// An operation that needs learned state was called before `fit`.
    #[error("{model} has not been fitted yet, call fit before using it")]
    UnfittedModel { model: &'static str },

    /// Malformed feature matrix or label vector.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The underlying algorithm failed while training.
    #[error("{model} failed to fit")]
    Fit {
        model: &'static str,
        #[source]
        source: Failed,
    },

    /// The underlying algorithm failed during inference.
    #[error("{model} failed to predict")]
    Prediction {
        model: &'static str,
        #[source]
        source: Failed,
    },

    /// Hyperparameters the chosen algorithm cannot accept.
    #[error("unsupported configuration for {algorithm}: {reason}")]
    UnsupportedAlgorithm { algorithm: String, reason: String },
}

impl ClassifierError {
    pub fn unfitted(model: &'static str) -> Self {
        ClassifierError::UnfittedModel { model }
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        ClassifierError::InvalidInput(msg.into())
    }

    pub fn fit(model: &'static str, source: Failed) -> Self {
        ClassifierError::Fit { model, source }
    }

    pub fn prediction(model: &'static str, source: Failed) -> Self {
        ClassifierError::Prediction { model, source }
    }

    pub fn unsupported(algorithm: impl Into<String>, reason: impl Into<String>) -> Self {
        ClassifierError::UnsupportedAlgorithm {
            algorithm: algorithm.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ClassifierError>;
