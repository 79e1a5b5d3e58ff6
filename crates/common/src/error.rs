use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Trading account not initialized")]
    NotInitialized,

    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Strategy {strategy_id} evaluation failed: {reason}")]
    EvaluatorFailure { strategy_id: String, reason: String },

    #[error("Price source error: {0}")]
    PriceSource(String),

    #[error("Exchange error: {0}")]
    Exchange(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Error::NotFound { kind, id: id.into() }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
