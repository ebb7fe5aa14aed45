use thiserror::Error;

#[derive(Debug, Error)]
pub enum FersError {
    #[error("Configuration error: {field} — {reason}")]
    ConfigurationError { field: String, reason: String },

    #[error("Data missing: series {series} has no entry for year {year}")]
    DataMissingError { series: String, year: i32 },

    #[error("Arithmetic error in {context}")]
    ArithmeticError { context: String },

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<serde_json::Error> for FersError {
    fn from(e: serde_json::Error) -> Self {
        FersError::SerializationError(e.to_string())
    }
}
