//! `herald-core` — shared config, errors and wire types for the herald
//! scheduling backbone.
//!
//! Nothing in this crate does I/O beyond loading `herald.toml`; the concrete
//! subsystems (scheduler, tracker, notify, gateway) depend on it for the
//! types they exchange.

pub mod command;
pub mod config;
pub mod error;
pub mod event;

pub use command::{CancelCommand, QueryCommand, ReminderKind, ScheduleCommand};
pub use config::HeraldConfig;
pub use error::{HeraldError, Result};
pub use event::{FireBehavior, FirePayload, FiredJob};
