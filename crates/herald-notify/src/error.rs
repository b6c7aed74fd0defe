use thiserror::Error;

/// Errors that can occur delivering a notification.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// Transport-level failure reaching the messaging API.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The messaging API answered with a non-success status.
    #[error("Delivery failed with status {status}")]
    Delivery { status: u16 },
}

pub type Result<T> = std::result::Result<T, NotifyError>;
