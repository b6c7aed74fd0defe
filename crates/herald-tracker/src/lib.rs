//! `herald-tracker` — per-user engagement counters and module-completion
//! state in SQLite.
//!
//! One row per user: raw counters (FAQ usage, reminder interactions),
//! set-once start dates, and the completion status of the four content
//! modules. Deliberately simple plumbing — no scheduling logic lives here.

pub mod db;
pub mod error;
pub mod manager;
pub mod types;

pub use error::{Result, TrackerError};
pub use manager::TrackerManager;
pub use types::{ModuleStatus, TrackingEntry};
