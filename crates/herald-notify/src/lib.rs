//! `herald-notify` — outbound notification dispatch.
//!
//! The trigger engine emits [`FiredJob`](herald_core::event::FiredJob)s into
//! a bounded channel; [`dispatch::run_dispatch`] drains it with a capped
//! number of in-flight webhook calls, so one slow delivery can never delay
//! due-job detection. Delivery is best-effort: failures are logged, never
//! retried, never propagated back into the scheduling path.

pub mod dispatch;
pub mod error;
pub mod sink;

pub use dispatch::run_dispatch;
pub use error::{NotifyError, Result};
pub use sink::{NotifySink, WebhookSink};
