use thiserror::Error;

/// Errors that can occur within the scheduling subsystem.
///
/// Every failure path the facade can hit is a distinct variant; callers get
/// a typed value, never a logged-and-swallowed fault.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// Underlying SQLite / rusqlite error.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// The timestamp did not match the `YYYY-MM-DDTHH:MM:SS.sss+HH:MM`
    /// profile. Raised before any store mutation.
    #[error("Invalid timestamp {input:?}: {reason}")]
    InvalidTimestamp { input: String, reason: String },

    /// The command qualifier does not select a known reminder family.
    #[error("Unknown reminder qualifier: {qualifier}")]
    UnknownQualifier { qualifier: String },

    /// Insert with `ReplacePolicy::Reject` hit an existing id.
    #[error("Job already exists: {id}")]
    AlreadyExists { id: String },

    /// No job with the given id exists in the store.
    #[error("Job not found: {id}")]
    JobNotFound { id: String },

    /// The appointment pair was only half-applied: the main slot was stored
    /// but the reminder slot failed. The system is in a detectable
    /// partially-applied state.
    #[error("Appointment pair half-applied: created {created}, failed {failed}: {reason}")]
    AppointmentPartial {
        created: String,
        failed: String,
        reason: String,
    },

    /// A stored payload or trigger column failed to decode.
    #[error("Corrupt job row {id}: {reason}")]
    CorruptRow { id: String, reason: String },
}

impl SchedulerError {
    /// Short error code string returned to HTTP clients.
    pub fn code(&self) -> &'static str {
        match self {
            SchedulerError::Database(_) => "STORE_ERROR",
            SchedulerError::InvalidTimestamp { .. } => "PARSE_ERROR",
            SchedulerError::UnknownQualifier { .. } => "UNKNOWN_QUALIFIER",
            SchedulerError::AlreadyExists { .. } => "ALREADY_EXISTS",
            SchedulerError::JobNotFound { .. } => "NOT_FOUND",
            SchedulerError::AppointmentPartial { .. } => "APPOINTMENT_PARTIAL",
            SchedulerError::CorruptRow { .. } => "STORE_ERROR",
        }
    }
}

pub type Result<T> = std::result::Result<T, SchedulerError>;
