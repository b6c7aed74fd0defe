use thiserror::Error;

#[derive(Debug, Error)]
pub enum HeraldError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Unknown reminder qualifier: {qualifier}")]
    UnknownQualifier { qualifier: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl HeraldError {
    /// Short error code string returned to HTTP clients.
    pub fn code(&self) -> &'static str {
        match self {
            HeraldError::Config(_) => "CONFIG_ERROR",
            HeraldError::Database(_) => "DATABASE_ERROR",
            HeraldError::UnknownQualifier { .. } => "UNKNOWN_QUALIFIER",
            HeraldError::Serialization(_) => "SERIALIZATION_ERROR",
            HeraldError::Io(_) => "IO_ERROR",
            HeraldError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

pub type Result<T> = std::result::Result<T, HeraldError>;
