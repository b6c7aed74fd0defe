//! `herald-scheduler` — calendar-aware reminder scheduling with SQLite
//! persistence.
//!
//! # Overview
//!
//! Jobs are persisted to a SQLite `jobs` table keyed by a deterministic id
//! derived from `(user, intent, qualifier)`. The [`engine::TriggerEngine`]
//! keeps an in-memory wake queue of next-due instants, sleeps until the
//! earliest one, and hands due occurrences to the notify dispatcher over a
//! bounded channel. The [`manager::ReminderManager`] is the public facade:
//! it translates schedule/cancel/query commands into concrete job specs,
//! with composite two-slot behaviour for appointments.
//!
//! # Job kinds
//!
//! | Kind              | Trigger                              | After firing |
//! |-------------------|--------------------------------------|--------------|
//! | `RecurringDaily`  | same H:MM:SS every day (operating tz)| rescheduled  |
//! | `OneShot`         | absolute calendar instant            | removed      |
//!
//! A due occurrence not observed within its misfire grace window is skipped,
//! never queued for catch-up.

pub mod clock;
pub mod db;
pub mod engine;
pub mod error;
pub mod identity;
pub mod manager;
pub mod queue;
pub mod schedule;
pub mod store;
pub mod types;

pub use clock::{CalendarPoint, Clock};
pub use engine::{EngineCommand, TriggerEngine};
pub use error::{Result, SchedulerError};
pub use manager::{CancelOutcome, PairCancellation, QueryOutcome, ReminderManager, SlotStatus};
pub use store::JobStore;
pub use types::{JobKind, JobSpec, ReplacePolicy, Trigger};
