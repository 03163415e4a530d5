use thiserror::Error;

#[derive(Debug, Error)]
pub enum TaxEngineError {
    #[error("Invalid input for {field}: {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Division by zero in {context}")]
    DivisionByZero { context: String },

    #[error("Invalid financial year '{value}': {reason}")]
    InvalidFinancialYear { value: String, reason: String },

    #[error("Date error: {0}")]
    DateError(String),

    #[error("{collaborator} unavailable: {reason}")]
    CollaboratorUnavailable {
        collaborator: String,
        reason: String,
    },

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<serde_json::Error> for TaxEngineError {
    fn from(e: serde_json::Error) -> Self {
        TaxEngineError::SerializationError(e.to_string())
    }
}
