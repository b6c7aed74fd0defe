//! Bounded-concurrency drain of the engine's fired-job channel.

use std::sync::Arc;

use herald_core::event::{FireBehavior, FiredJob};
use tokio::sync::{mpsc, watch, Semaphore};
use tracing::{error, info, warn};

use crate::sink::NotifySink;

/// Route fired jobs to the sink, running at most `max_in_flight` deliveries
/// concurrently.
///
/// Waiting for a permit happens here, not in the engine: the engine's send
/// only blocks once the channel buffer is full, which is the "no worker
/// slot free" condition. Exits when `shutdown` broadcasts `true` or the
/// engine side of the channel is dropped.
pub async fn run_dispatch(
    mut fired_rx: mpsc::Receiver<FiredJob>,
    sink: Arc<dyn NotifySink>,
    max_in_flight: usize,
    mut shutdown: watch::Receiver<bool>,
) {
    info!(max_in_flight, "notify dispatcher started");
    let slots = Arc::new(Semaphore::new(max_in_flight.max(1)));

    loop {
        tokio::select! {
            biased;
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    info!("notify dispatcher shutting down");
                    break;
                }
            }
            maybe_job = fired_rx.recv() => {
                let Some(job) = maybe_job else {
                    warn!("fired-job channel closed — dispatcher exiting");
                    break;
                };
                let Ok(permit) = Arc::clone(&slots).acquire_owned().await else {
                    break;
                };
                let sink = Arc::clone(&sink);
                tokio::spawn(async move {
                    deliver(&*sink, &job).await;
                    drop(permit);
                });
            }
        }
    }
}

/// One best-effort delivery. Failures are logged and dropped — retrying is
/// explicitly not this layer's job.
async fn deliver(sink: &dyn NotifySink, job: &FiredJob) {
    let result = match job.payload.behavior {
        FireBehavior::Template => sink.fire_template(&job.payload.user_id).await,
        FireBehavior::Intent => {
            sink.fire_intent(
                &job.payload.user_id,
                &job.payload.intent_name,
                &job.payload.qualifier,
            )
            .await
        }
    };

    match result {
        Ok(()) => info!(job_id = %job.job_id, "notification fired"),
        Err(e) => error!(job_id = %job.job_id, "delivery failed: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NotifyError;
    use async_trait::async_trait;
    use chrono::Utc;
    use herald_core::event::FirePayload;
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Default)]
    struct RecordingSink {
        calls: Mutex<Vec<String>>,
        fail: bool,
    }

    #[async_trait]
    impl NotifySink for RecordingSink {
        async fn fire_intent(
            &self,
            user_id: &str,
            intent_name: &str,
            qualifier: &str,
        ) -> crate::error::Result<()> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("intent:{user_id}:{intent_name}:{qualifier}"));
            if self.fail {
                return Err(NotifyError::Delivery { status: 500 });
            }
            Ok(())
        }

        async fn fire_template(&self, user_id: &str) -> crate::error::Result<()> {
            self.calls.lock().unwrap().push(format!("template:{user_id}"));
            Ok(())
        }
    }

    fn fired(job_id: &str, behavior: FireBehavior) -> FiredJob {
        FiredJob {
            job_id: job_id.to_string(),
            due: Utc::now(),
            payload: FirePayload {
                user_id: "u1".into(),
                intent_name: "visit".into(),
                qualifier: "a".into(),
                display_label: None,
                behavior,
            },
        }
    }

    #[tokio::test]
    async fn routes_by_fire_behavior() {
        let sink = Arc::new(RecordingSink::default());
        let (tx, rx) = mpsc::channel(8);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(run_dispatch(rx, sink.clone(), 4, shutdown_rx));

        tx.send(fired("job-a", FireBehavior::Intent)).await.expect("send");
        tx.send(fired("job-b", FireBehavior::Template)).await.expect("send");
        tokio::time::sleep(Duration::from_millis(100)).await;

        let calls = sink.calls.lock().unwrap().clone();
        assert!(calls.contains(&"intent:u1:visit:a".to_string()));
        assert!(calls.contains(&"template:u1".to_string()));

        let _ = shutdown_tx.send(true);
        let _ = handle.await;
    }

    #[tokio::test]
    async fn delivery_failure_does_not_stop_the_dispatcher() {
        let sink = Arc::new(RecordingSink {
            calls: Mutex::new(Vec::new()),
            fail: true,
        });
        let (tx, rx) = mpsc::channel(8);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(run_dispatch(rx, sink.clone(), 4, shutdown_rx));

        tx.send(fired("job-a", FireBehavior::Intent)).await.expect("send");
        tx.send(fired("job-b", FireBehavior::Intent)).await.expect("send");
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(sink.calls.lock().unwrap().len(), 2);

        let _ = shutdown_tx.send(true);
        let _ = handle.await;
    }
}
