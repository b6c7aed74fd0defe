//! The trigger engine: sleeps until the earliest due instant, fires, and
//! reschedules recurring jobs.

use std::time::Duration as StdDuration;

use chrono::{Duration, Utc};
use chrono_tz::Tz;
use herald_core::event::FiredJob;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

use crate::error::Result;
use crate::queue::WakeQueue;
use crate::schedule::next_occurrence;
use crate::store::JobStore;
use crate::types::Trigger;

/// Nudges from the facade so a store mutation reshapes the wake queue
/// without waiting for the current sleep to elapse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineCommand {
    /// A spec was inserted or replaced; re-read it and (re)queue its wake.
    Upsert { id: String },
    /// A spec was removed; drop any pending wake for it.
    Remove { id: String },
}

/// Sleep used when the wake queue is empty. Commands and the resync tick
/// cut it short.
const IDLE_SLEEP: StdDuration = StdDuration::from_secs(3600);

/// Core scheduler loop. One instance per process; constructed by the
/// composition root and driven via [`TriggerEngine::run`].
pub struct TriggerEngine {
    store: JobStore,
    tz: Tz,
    queue: WakeQueue,
    /// Due occurrences are handed to the dispatcher here; a full channel is
    /// the engine waiting for a worker slot.
    fired_tx: mpsc::Sender<FiredJob>,
    resync_interval: StdDuration,
}

impl TriggerEngine {
    pub fn new(
        store: JobStore,
        tz: Tz,
        fired_tx: mpsc::Sender<FiredJob>,
        resync_interval: StdDuration,
    ) -> Self {
        Self {
            store,
            tz,
            queue: WakeQueue::new(),
            fired_tx,
            resync_interval,
        }
    }

    /// Main event loop. Reloads all stored specs before the first wake, then
    /// sleeps until the earliest due instant; facade commands and the
    /// periodic resync re-derive the schedule. Exits when `shutdown`
    /// broadcasts `true`.
    pub async fn run(
        mut self,
        mut cmd_rx: mpsc::Receiver<EngineCommand>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        info!("trigger engine started");
        if let Err(e) = self.resync() {
            error!("initial wake-queue load failed: {e}");
        }

        let mut resync_tick = tokio::time::interval_at(
            tokio::time::Instant::now() + self.resync_interval,
            self.resync_interval,
        );
        resync_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            let sleep_for = match self.queue.peek() {
                Some((due, _)) => (due - Utc::now()).to_std().unwrap_or(StdDuration::ZERO),
                None => IDLE_SLEEP,
            };

            // biased: a shutdown or a cancel command queued at the same
            // moment a job falls due must win over the fire path.
            tokio::select! {
                biased;
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("trigger engine shutting down");
                        break;
                    }
                }
                Some(cmd) = cmd_rx.recv() => {
                    if let Err(e) = self.apply(cmd) {
                        error!("engine command failed: {e}");
                    }
                }
                _ = resync_tick.tick() => {
                    if let Err(e) = self.resync() {
                        error!("wake-queue resync failed: {e}");
                    }
                }
                _ = tokio::time::sleep(sleep_for) => {
                    if let Err(e) = self.fire_due().await {
                        error!("firing due jobs failed: {e}");
                    }
                }
            }
        }
    }

    // --- private helpers ---------------------------------------------------

    fn apply(&mut self, cmd: EngineCommand) -> Result<()> {
        match cmd {
            EngineCommand::Upsert { id } => match self.store.get(&id)? {
                Some(spec) => {
                    debug!(job_id = %id, due = %spec.next_due, "wake queued");
                    self.queue.insert(&id, spec.next_due);
                }
                // Removed again before we got here; nothing to queue.
                None => debug!(job_id = %id, "upsert nudge for absent job"),
            },
            EngineCommand::Remove { id } => {
                self.queue.remove(&id);
            }
        }
        Ok(())
    }

    /// Rebuild the wake queue from the store. Covers restart recovery, lost
    /// nudges and wall-clock adjustments; load order keeps the tie-break
    /// deterministic.
    fn resync(&mut self) -> Result<()> {
        let specs = self.store.load_all()?;
        self.queue.clear();
        for spec in &specs {
            self.queue.insert(&spec.id, spec.next_due);
        }
        debug!(jobs = specs.len(), "wake queue derived from store");
        Ok(())
    }

    /// Process every queue entry whose due instant has arrived.
    async fn fire_due(&mut self) -> Result<()> {
        loop {
            let now = Utc::now();
            match self.queue.peek() {
                Some((due, _)) if due <= now => {}
                _ => return Ok(()),
            }
            let Some((due, id)) = self.queue.pop() else {
                return Ok(());
            };

            // Spec snapshot taken at wake time. A missing row means the job
            // was cancelled while queued: no fire after cancel.
            let Some(spec) = self.store.get(&id)? else {
                debug!(job_id = %id, "due entry dropped, job no longer stored");
                continue;
            };

            let grace = Duration::seconds(spec.grace_secs as i64);
            if now > due + grace {
                // Occurrence abandoned, never queued for catch-up.
                warn!(
                    job_id = %id,
                    due = %due,
                    grace_secs = spec.grace_secs,
                    "misfire: occurrence skipped"
                );
            } else {
                let fired = FiredJob {
                    job_id: id.clone(),
                    due,
                    payload: spec.payload.clone(),
                };
                info!(job_id = %id, due = %due, "job due, dispatching fire");
                if self.fired_tx.send(fired).await.is_err() {
                    warn!(job_id = %id, "fired-job channel closed — dispatcher gone");
                }
            }

            match spec.trigger {
                // One-shot: no residual due entry, fired or misfired.
                Trigger::At { .. } => {
                    self.store.remove(&id)?;
                }
                Trigger::Daily { .. } => {
                    let after = if now > due { now } else { due };
                    if let Some(next) = next_occurrence(&spec.trigger, self.tz, after) {
                        self.store.update_next_due(&id, next)?;
                        self.queue.insert(&id, next);
                        debug!(job_id = %id, next_due = %next, "recurring job rescheduled");
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{JobSpec, ReplacePolicy};
    use chrono::DateTime;
    use chrono_tz::Africa::Lagos;
    use herald_core::event::{FireBehavior, FirePayload};
    use rusqlite::Connection;

    fn test_store() -> JobStore {
        JobStore::new(Connection::open_in_memory().expect("open in-memory db"))
            .expect("init schema")
    }

    fn one_shot(id: &str, due: DateTime<Utc>, grace_secs: u64) -> JobSpec {
        JobSpec::new(
            id.to_string(),
            Trigger::At { instant: due },
            FirePayload {
                user_id: "u1".into(),
                intent_name: "visit".into(),
                qualifier: "s".into(),
                display_label: None,
                behavior: FireBehavior::Intent,
            },
            None,
            grace_secs,
            ReplacePolicy::Replace,
            due,
            Utc::now(),
        )
    }

    fn daily(id: &str, next_due: DateTime<Utc>, grace_secs: u64) -> JobSpec {
        let local = next_due.with_timezone(&Lagos);
        use chrono::Timelike;
        JobSpec::new(
            id.to_string(),
            Trigger::Daily {
                hour: local.hour(),
                minute: local.minute(),
                second: local.second(),
            },
            FirePayload {
                user_id: "u1".into(),
                intent_name: "take_pill".into(),
                qualifier: "m".into(),
                display_label: Some("08:00 AM".into()),
                behavior: FireBehavior::Template,
            },
            Some("08:00 AM".into()),
            grace_secs,
            ReplacePolicy::Replace,
            next_due,
            Utc::now(),
        )
    }

    fn spawn_engine(
        store: JobStore,
    ) -> (
        mpsc::Sender<EngineCommand>,
        mpsc::Receiver<FiredJob>,
        watch::Sender<bool>,
    ) {
        let (cmd_tx, cmd_rx) = mpsc::channel(16);
        let (fired_tx, fired_rx) = mpsc::channel(16);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let engine = TriggerEngine::new(store, Lagos, fired_tx, StdDuration::from_secs(60));
        tokio::spawn(engine.run(cmd_rx, shutdown_rx));
        (cmd_tx, fired_rx, shutdown_tx)
    }

    #[tokio::test]
    async fn one_shot_fires_once_and_is_removed() {
        let store = test_store();
        let due = Utc::now() + Duration::milliseconds(250);
        store.put(&one_shot("u1visits", due, 30)).expect("put");

        let (_cmd_tx, mut fired_rx, shutdown_tx) = spawn_engine(store.clone());

        let fired = tokio::time::timeout(StdDuration::from_secs(5), fired_rx.recv())
            .await
            .expect("fire within deadline")
            .expect("channel open");
        assert_eq!(fired.job_id, "u1visits");
        assert_eq!(fired.due.timestamp(), due.timestamp());

        // No residual due entry after a one-shot fire.
        tokio::time::sleep(StdDuration::from_millis(100)).await;
        assert!(store.get("u1visits").expect("get").is_none());
        let _ = shutdown_tx.send(true);
    }

    #[tokio::test]
    async fn cancel_prevents_fire() {
        let store = test_store();
        let due = Utc::now() + Duration::milliseconds(600);
        store.put(&one_shot("u1visits", due, 30)).expect("put");

        let (cmd_tx, mut fired_rx, shutdown_tx) = spawn_engine(store.clone());

        store.remove("u1visits").expect("remove");
        cmd_tx
            .send(EngineCommand::Remove {
                id: "u1visits".into(),
            })
            .await
            .expect("send");

        let waited =
            tokio::time::timeout(StdDuration::from_millis(1500), fired_rx.recv()).await;
        assert!(waited.is_err(), "cancelled job must not fire");
        let _ = shutdown_tx.send(true);
    }

    #[tokio::test]
    async fn new_earlier_job_shortens_the_sleep() {
        let store = test_store();
        let far = Utc::now() + Duration::hours(6);
        store.put(&one_shot("far-job", far, 30)).expect("put far");

        let (cmd_tx, mut fired_rx, shutdown_tx) = spawn_engine(store.clone());
        tokio::time::sleep(StdDuration::from_millis(100)).await;

        let soon = Utc::now() + Duration::milliseconds(300);
        store.put(&one_shot("soon-job", soon, 30)).expect("put soon");
        cmd_tx
            .send(EngineCommand::Upsert {
                id: "soon-job".into(),
            })
            .await
            .expect("send");

        let fired = tokio::time::timeout(StdDuration::from_secs(5), fired_rx.recv())
            .await
            .expect("fire within deadline")
            .expect("channel open");
        assert_eq!(fired.job_id, "soon-job");
        let _ = shutdown_tx.send(true);
    }

    #[tokio::test]
    async fn one_shot_past_grace_is_dropped_without_firing() {
        let store = test_store();
        let due = Utc::now() - Duration::seconds(120);
        store.put(&one_shot("stale", due, 30)).expect("put");

        let (_cmd_tx, mut fired_rx, shutdown_tx) = spawn_engine(store.clone());

        let waited =
            tokio::time::timeout(StdDuration::from_millis(800), fired_rx.recv()).await;
        assert!(waited.is_err(), "misfired one-shot must not fire");
        assert!(store.get("stale").expect("get").is_none());
        let _ = shutdown_tx.send(true);
    }

    #[tokio::test]
    async fn recurring_misfire_skips_and_reschedules_next_day() {
        let store = test_store();
        let due = Utc::now() - Duration::seconds(120);
        store.put(&daily("u1pillm", due, 30)).expect("put");

        let (_cmd_tx, mut fired_rx, shutdown_tx) = spawn_engine(store.clone());

        let waited =
            tokio::time::timeout(StdDuration::from_millis(800), fired_rx.recv()).await;
        assert!(waited.is_err(), "misfired occurrence must be skipped");

        let spec = store.get("u1pillm").expect("get").expect("still scheduled");
        assert!(spec.next_due > Utc::now());
        let gap = spec.next_due - due;
        assert!(gap <= Duration::days(1), "next occurrence is the following day");
        let _ = shutdown_tx.send(true);
    }

    #[tokio::test]
    async fn recurring_within_grace_fires_and_reschedules() {
        let store = test_store();
        let due = Utc::now() - Duration::seconds(5);
        store.put(&daily("u1pillm", due, 30)).expect("put");

        let (_cmd_tx, mut fired_rx, shutdown_tx) = spawn_engine(store.clone());

        let fired = tokio::time::timeout(StdDuration::from_secs(5), fired_rx.recv())
            .await
            .expect("fire within deadline")
            .expect("channel open");
        assert_eq!(fired.job_id, "u1pillm");

        tokio::time::sleep(StdDuration::from_millis(100)).await;
        let spec = store.get("u1pillm").expect("get").expect("still scheduled");
        assert!(spec.next_due > Utc::now(), "recurring job stays scheduled");
        let _ = shutdown_tx.send(true);
    }
}
