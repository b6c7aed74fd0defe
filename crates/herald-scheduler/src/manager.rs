//! Public scheduling operations — translates domain commands into concrete
//! job specs, with composite two-slot behaviour for appointments.

use chrono::Utc;
use herald_core::command::{CancelCommand, QueryCommand, ReminderKind, ScheduleCommand};
use herald_core::event::{FireBehavior, FirePayload};
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::clock::Clock;
use crate::engine::EngineCommand;
use crate::error::{Result, SchedulerError};
use crate::identity::{appointment_slot_ids, JobKey};
use crate::schedule::initial_due;
use crate::store::JobStore;
use crate::types::{JobSpec, ReplacePolicy, Trigger};

/// Intent fired by the 24-hour-prior appointment slot.
pub const APPOINTMENT_REMINDER_INTENT: &str = "appointment_reminder";

/// One queried slot: the stored display label, or the absent-state sentinel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SlotStatus {
    Scheduled { label: Option<String> },
    Empty,
}

/// Result of a query command. Appointment queries always carry exactly two
/// slots (main event, 24 h reminder), whatever is actually stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum QueryOutcome {
    Single(SlotStatus),
    Pair([SlotStatus; 2]),
}

/// Per-slot report of an appointment cancellation. Partial absence is not an
/// error for the pair operation as a whole.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PairCancellation {
    pub main_removed: bool,
    pub reminder_removed: bool,
}

impl PairCancellation {
    pub fn any_removed(&self) -> bool {
        self.main_removed || self.reminder_removed
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum CancelOutcome {
    Removed,
    Pair(PairCancellation),
}

/// Scheduling facade. Shares the store with the engine and nudges it over
/// the command channel after every mutation so the current sleep is
/// re-derived.
#[derive(Clone)]
pub struct ReminderManager {
    store: JobStore,
    clock: Clock,
    cmd_tx: mpsc::Sender<EngineCommand>,
    grace_secs: u64,
}

impl ReminderManager {
    pub fn new(
        store: JobStore,
        clock: Clock,
        cmd_tx: mpsc::Sender<EngineCommand>,
        grace_secs: u64,
    ) -> Self {
        Self {
            store,
            clock,
            cmd_tx,
            grace_secs,
        }
    }

    /// Create the job(s) for a schedule command. Returns every spec stored:
    /// one for medication/snooze, the `[main, reminder]` pair for
    /// appointments.
    ///
    /// The timestamp is resolved before any store mutation, so a parse
    /// failure leaves nothing behind.
    pub async fn schedule(&self, cmd: &ScheduleCommand) -> Result<Vec<JobSpec>> {
        let kind = self.kind_of(&cmd.qualifier)?;
        let point = self.clock.resolve(&cmd.time_point).inspect_err(|e| {
            warn!(user_id = %cmd.user_id, intent_name = %cmd.intent_name, "schedule rejected: {e}");
        })?;
        let key = JobKey::new(&cmd.user_id, &cmd.intent_name, &cmd.qualifier);
        let now = Utc::now();

        match kind {
            ReminderKind::Medication => {
                let trigger = Trigger::Daily {
                    hour: point.hour(),
                    minute: point.minute(),
                    second: point.second(),
                };
                let label = point.clock_label();
                let spec = JobSpec::new(
                    key.id(),
                    trigger.clone(),
                    FirePayload {
                        user_id: cmd.user_id.clone(),
                        intent_name: cmd.intent_name.clone(),
                        qualifier: cmd.qualifier.clone(),
                        display_label: Some(label.clone()),
                        behavior: FireBehavior::Template,
                    },
                    Some(label),
                    self.grace_secs,
                    ReplacePolicy::Replace,
                    initial_due(&trigger, self.clock.timezone(), now),
                    now,
                );
                self.store.put(&spec)?;
                self.nudge(EngineCommand::Upsert { id: spec.id.clone() }).await;
                info!(job_id = %spec.id, next_due = %spec.next_due, "medication reminder scheduled");
                Ok(vec![spec])
            }

            ReminderKind::Appointment => {
                let label = match cmd.display_name.as_deref() {
                    Some(name) => point.event_label(name),
                    None => point.event_stamp(),
                };
                let main = JobSpec::new(
                    key.id(),
                    Trigger::At {
                        instant: point.instant(),
                    },
                    FirePayload {
                        user_id: cmd.user_id.clone(),
                        intent_name: cmd.intent_name.clone(),
                        qualifier: cmd.qualifier.clone(),
                        display_label: Some(label.clone()),
                        behavior: FireBehavior::Intent,
                    },
                    Some(label.clone()),
                    self.grace_secs,
                    ReplacePolicy::Replace,
                    point.instant(),
                    now,
                );
                let prior = point.minus_hours(24);
                let reminder = JobSpec::new(
                    key.reminder_id(),
                    Trigger::At {
                        instant: prior.instant(),
                    },
                    FirePayload {
                        user_id: cmd.user_id.clone(),
                        intent_name: APPOINTMENT_REMINDER_INTENT.to_string(),
                        qualifier: cmd.qualifier.clone(),
                        display_label: Some(label.clone()),
                        behavior: FireBehavior::Intent,
                    },
                    Some(label),
                    self.grace_secs,
                    ReplacePolicy::Replace,
                    prior.instant(),
                    now,
                );

                self.store.put(&main)?;
                if let Err(e) = self.store.put(&reminder) {
                    // Pair creation is two calls; surface the half-applied
                    // state instead of pretending the whole pair exists.
                    error!(
                        created = %main.id,
                        failed = %reminder.id,
                        "appointment pair half-applied: {e}"
                    );
                    self.nudge(EngineCommand::Upsert { id: main.id.clone() }).await;
                    return Err(SchedulerError::AppointmentPartial {
                        created: main.id.clone(),
                        failed: reminder.id.clone(),
                        reason: e.to_string(),
                    });
                }
                self.nudge(EngineCommand::Upsert { id: main.id.clone() }).await;
                self.nudge(EngineCommand::Upsert {
                    id: reminder.id.clone(),
                })
                .await;
                info!(
                    job_id = %main.id,
                    reminder_id = %reminder.id,
                    at = %main.next_due,
                    "appointment pair scheduled"
                );
                Ok(vec![main, reminder])
            }

            ReminderKind::Snooze => {
                let spec = JobSpec::new(
                    key.id(),
                    Trigger::At {
                        instant: point.instant(),
                    },
                    FirePayload {
                        user_id: cmd.user_id.clone(),
                        intent_name: cmd.intent_name.clone(),
                        qualifier: cmd.qualifier.clone(),
                        display_label: None,
                        behavior: FireBehavior::Intent,
                    },
                    None,
                    self.grace_secs,
                    ReplacePolicy::Reject,
                    point.instant(),
                    now,
                );
                if let Err(e) = self.store.put(&spec) {
                    warn!(job_id = %spec.id, "snooze schedule rejected: {e}");
                    return Err(e);
                }
                self.nudge(EngineCommand::Upsert { id: spec.id.clone() }).await;
                info!(job_id = %spec.id, at = %spec.next_due, "snooze follow-up scheduled");
                Ok(vec![spec])
            }
        }
    }

    /// Remove the job(s) for a cancel command. Appointment cancellation
    /// unconditionally attempts both slots and reports each removal.
    pub async fn cancel(&self, cmd: &CancelCommand) -> Result<CancelOutcome> {
        let kind = self.kind_of(&cmd.qualifier)?;
        let key = JobKey::new(&cmd.user_id, &cmd.intent_name, &cmd.qualifier);

        match kind {
            ReminderKind::Appointment => {
                let [main_id, reminder_id] = appointment_slot_ids(&key.id());
                let main_removed = self.store.remove(&main_id)?;
                let reminder_removed = self.store.remove(&reminder_id)?;
                self.nudge(EngineCommand::Remove { id: main_id.clone() }).await;
                self.nudge(EngineCommand::Remove {
                    id: reminder_id.clone(),
                })
                .await;
                info!(
                    job_id = %main_id,
                    main_removed,
                    reminder_removed,
                    "appointment pair cancel processed"
                );
                Ok(CancelOutcome::Pair(PairCancellation {
                    main_removed,
                    reminder_removed,
                }))
            }

            ReminderKind::Medication | ReminderKind::Snooze => {
                let id = key.id();
                let removed = self.store.remove(&id)?;
                self.nudge(EngineCommand::Remove { id: id.clone() }).await;
                if !removed {
                    warn!(job_id = %id, "cancel: no such job");
                    return Err(SchedulerError::JobNotFound { id });
                }
                info!(job_id = %id, "reminder cancelled");
                Ok(CancelOutcome::Removed)
            }
        }
    }

    /// Look up the job(s) for a query command. Appointment queries return a
    /// fixed-size pair — two slots even when zero, one or both are stored.
    pub fn query(&self, cmd: &QueryCommand) -> Result<QueryOutcome> {
        let kind = self.kind_of(&cmd.qualifier)?;
        let key = JobKey::new(&cmd.user_id, &cmd.intent_name, &cmd.qualifier);

        match kind {
            ReminderKind::Appointment => {
                let [main_id, reminder_id] = appointment_slot_ids(&key.id());
                Ok(QueryOutcome::Pair([
                    self.slot(&main_id)?,
                    self.slot(&reminder_id)?,
                ]))
            }
            ReminderKind::Medication | ReminderKind::Snooze => {
                Ok(QueryOutcome::Single(self.slot(&key.id())?))
            }
        }
    }

    // --- private helpers ---------------------------------------------------

    fn kind_of(&self, qualifier: &str) -> Result<ReminderKind> {
        qualifier.parse().map_err(|_| {
            warn!(qualifier, "command with unknown qualifier");
            SchedulerError::UnknownQualifier {
                qualifier: qualifier.to_string(),
            }
        })
    }

    fn slot(&self, id: &str) -> Result<SlotStatus> {
        Ok(match self.store.get(id)? {
            Some(spec) => SlotStatus::Scheduled { label: spec.label },
            None => SlotStatus::Empty,
        })
    }

    /// Best-effort engine nudge; the periodic resync self-heals a lost one.
    async fn nudge(&self, cmd: EngineCommand) {
        if self.cmd_tx.send(cmd).await.is_err() {
            warn!("engine command channel closed — nudge dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::Africa::Lagos;
    use rusqlite::Connection;

    fn test_manager() -> (ReminderManager, mpsc::Receiver<EngineCommand>) {
        let store = JobStore::new(Connection::open_in_memory().expect("open in-memory db"))
            .expect("init schema");
        let (cmd_tx, cmd_rx) = mpsc::channel(64);
        (
            ReminderManager::new(store, Clock::new(Lagos), cmd_tx, 30),
            cmd_rx,
        )
    }

    fn schedule_cmd(
        qualifier: &str,
        time_point: &str,
        display_name: Option<&str>,
    ) -> ScheduleCommand {
        let intent = match qualifier {
            "m" => "take_pill",
            "a" => "visit",
            _ => "snooze_followup",
        };
        ScheduleCommand {
            user_id: "u1".into(),
            intent_name: intent.into(),
            qualifier: qualifier.into(),
            time_point: time_point.into(),
            display_name: display_name.map(String::from),
        }
    }

    #[tokio::test]
    async fn medication_example_scenario() {
        let (manager, _cmd_rx) = test_manager();
        let specs = manager
            .schedule(&schedule_cmd("m", "2024-03-01T08:00:00.000+01:00", None))
            .await
            .expect("schedule");

        assert_eq!(specs.len(), 1);
        let spec = &specs[0];
        assert_eq!(spec.id, "u1take_pillm");
        assert_eq!(
            spec.trigger,
            Trigger::Daily {
                hour: 8,
                minute: 0,
                second: 0
            }
        );
        assert_eq!(spec.label.as_deref(), Some("08:00 AM"));
        assert_eq!(spec.payload.behavior, FireBehavior::Template);
    }

    #[tokio::test]
    async fn medication_reschedule_replaces_in_place() {
        let (manager, _cmd_rx) = test_manager();
        manager
            .schedule(&schedule_cmd("m", "2024-03-01T08:00:00.000+01:00", None))
            .await
            .expect("first schedule");
        manager
            .schedule(&schedule_cmd("m", "2024-03-01T21:15:00.000+01:00", None))
            .await
            .expect("reschedule");

        let outcome = manager
            .query(&QueryCommand {
                user_id: "u1".into(),
                intent_name: "take_pill".into(),
                qualifier: "m".into(),
            })
            .expect("query");
        assert_eq!(
            outcome,
            QueryOutcome::Single(SlotStatus::Scheduled {
                label: Some("09:15 PM".into())
            })
        );
    }

    #[tokio::test]
    async fn appointment_example_scenario() {
        let (manager, _cmd_rx) = test_manager();
        let specs = manager
            .schedule(&schedule_cmd(
                "a",
                "2024-03-05T15:30:00.000+01:00",
                Some("Checkup"),
            ))
            .await
            .expect("schedule");

        assert_eq!(specs.len(), 2);
        let (main, reminder) = (&specs[0], &specs[1]);
        assert_eq!(main.id, "u1visita");
        assert_eq!(reminder.id, "u1visita-reminder24");
        assert_eq!(
            reminder.next_due,
            main.next_due - chrono::Duration::hours(24)
        );
        for spec in specs.iter() {
            assert_eq!(
                spec.label.as_deref(),
                Some("'Checkup' on Tue 2024-03-05 03:30 PM")
            );
        }
        assert_eq!(reminder.payload.intent_name, APPOINTMENT_REMINDER_INTENT);
        assert_eq!(main.payload.intent_name, "visit");
    }

    #[tokio::test]
    async fn appointment_cancel_removes_both_slots() {
        let (manager, _cmd_rx) = test_manager();
        manager
            .schedule(&schedule_cmd(
                "a",
                "2024-03-05T15:30:00.000+01:00",
                Some("Checkup"),
            ))
            .await
            .expect("schedule");

        let outcome = manager
            .cancel(&CancelCommand {
                user_id: "u1".into(),
                intent_name: "visit".into(),
                qualifier: "a".into(),
            })
            .await
            .expect("cancel");
        assert_eq!(
            outcome,
            CancelOutcome::Pair(PairCancellation {
                main_removed: true,
                reminder_removed: true,
            })
        );

        let query = manager
            .query(&QueryCommand {
                user_id: "u1".into(),
                intent_name: "visit".into(),
                qualifier: "a".into(),
            })
            .expect("query");
        assert_eq!(
            query,
            QueryOutcome::Pair([SlotStatus::Empty, SlotStatus::Empty])
        );
    }

    #[tokio::test]
    async fn appointment_query_is_always_two_slots() {
        let (manager, _cmd_rx) = test_manager();
        let query = manager
            .query(&QueryCommand {
                user_id: "nobody".into(),
                intent_name: "visit".into(),
                qualifier: "a".into(),
            })
            .expect("query");
        assert_eq!(
            query,
            QueryOutcome::Pair([SlotStatus::Empty, SlotStatus::Empty])
        );
    }

    #[tokio::test]
    async fn snooze_duplicate_is_rejected() {
        let (manager, _cmd_rx) = test_manager();
        manager
            .schedule(&schedule_cmd("s", "2024-03-01T12:00:00.000+01:00", None))
            .await
            .expect("first snooze");

        let err = manager
            .schedule(&schedule_cmd("s", "2024-03-01T13:00:00.000+01:00", None))
            .await
            .unwrap_err();
        assert!(matches!(err, SchedulerError::AlreadyExists { .. }));
    }

    #[tokio::test]
    async fn parse_failure_mutates_nothing() {
        let (manager, _cmd_rx) = test_manager();
        let err = manager
            .schedule(&schedule_cmd("m", "01-03-2024 08:00", None))
            .await
            .unwrap_err();
        assert!(matches!(err, SchedulerError::InvalidTimestamp { .. }));

        let query = manager
            .query(&QueryCommand {
                user_id: "u1".into(),
                intent_name: "take_pill".into(),
                qualifier: "m".into(),
            })
            .expect("query");
        assert_eq!(query, QueryOutcome::Single(SlotStatus::Empty));
    }

    #[tokio::test]
    async fn unknown_qualifier_is_rejected() {
        let (manager, _cmd_rx) = test_manager();
        let err = manager
            .schedule(&schedule_cmd("z", "2024-03-01T08:00:00.000+01:00", None))
            .await
            .unwrap_err();
        assert!(matches!(err, SchedulerError::UnknownQualifier { .. }));
    }

    #[tokio::test]
    async fn cancel_missing_medication_is_not_found() {
        let (manager, _cmd_rx) = test_manager();
        let err = manager
            .cancel(&CancelCommand {
                user_id: "u1".into(),
                intent_name: "take_pill".into(),
                qualifier: "m".into(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, SchedulerError::JobNotFound { .. }));
    }
}
