use thiserror::Error;

#[derive(Debug, Error)]
pub enum BlendError {
    #[error("Configuration error: {field}: {reason}")]
    Configuration { field: String, reason: String },

    #[error("Data error in {context}: {reason}")]
    Data { context: String, reason: String },

    #[error("Optimization failure: {method} did not converge after {iterations} iterations (last step: {last_step:e})")]
    OptimizationFailure {
        method: String,
        iterations: u32,
        last_step: f64,
    },

    #[error("Weight map provider failed for {symbol}: {reason}")]
    Provider { symbol: String, reason: String },

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl BlendError {
    pub(crate) fn configuration(field: impl Into<String>, reason: impl Into<String>) -> Self {
        BlendError::Configuration {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn data(context: impl Into<String>, reason: impl Into<String>) -> Self {
        BlendError::Data {
            context: context.into(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for BlendError {
    fn from(e: serde_json::Error) -> Self {
        BlendError::SerializationError(e.to_string())
    }
}
