use thiserror::Error;

/// Errors that can occur within the tracking subsystem.
#[derive(Debug, Error)]
pub enum TrackerError {
    /// Underlying SQLite / rusqlite error.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// A tracking document already exists for this user.
    #[error("User already initialized: {user_id}")]
    AlreadyInitialized { user_id: String },

    /// No tracking document exists for this user.
    #[error("User not tracked: {user_id}")]
    UserNotFound { user_id: String },

    /// The topic name does not map to any tracked column.
    #[error("Unknown tracking topic: {topic}")]
    UnknownTopic { topic: String },

    /// A module update carried an unrecognised status value.
    #[error("Invalid module status: {0}")]
    InvalidStatus(String),

    /// A module update arrived without a status value.
    #[error("Missing value for topic: {topic}")]
    MissingValue { topic: String },
}

pub type Result<T> = std::result::Result<T, TrackerError>;
