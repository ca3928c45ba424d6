use thiserror::Error;

/// Broad class of a failure, used by callers to pick a corrective message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Malformed or financially impossible inputs; fatal to the valuation.
    Configuration,
    /// Invalid distribution parameters; fatal to the trial (and the run).
    Sampling,
    /// A computation produced a value that is not a finite number.
    Numeric,
}

#[derive(Debug, Error)]
pub enum FcffError {
    #[error("Invalid input: {field} — {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Financial impossibility: {0}")]
    FinancialImpossibility(String),

    #[error("Division by zero in {context}")]
    DivisionByZero { context: String },

    #[error("Non-finite result in {context}")]
    NonFinite { context: String },

    #[error("Invalid distribution for {parameter}: {reason}")]
    InvalidDistribution { parameter: String, reason: String },

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Monte Carlo trial {trial} failed: {source}")]
    TrialFailed {
        trial: usize,
        #[source]
        source: Box<FcffError>,
    },

    #[error("Date error: {0}")]
    DateError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl FcffError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            FcffError::InvalidDistribution { .. } => ErrorCategory::Sampling,
            FcffError::DivisionByZero { .. } | FcffError::NonFinite { .. } => {
                ErrorCategory::Numeric
            }
            FcffError::TrialFailed { source, .. } => source.category(),
            _ => ErrorCategory::Configuration,
        }
    }
}

impl From<serde_json::Error> for FcffError {
    fn from(e: serde_json::Error) -> Self {
        FcffError::SerializationError(e.to_string())
    }
}
