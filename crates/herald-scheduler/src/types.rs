use chrono::{DateTime, Utc};
use herald_core::event::FirePayload;
use serde::{Deserialize, Serialize};

/// Defines when a job fires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Trigger {
    /// Fire every day at the given wall-clock time in the operating zone.
    /// Year, month and day are wildcarded.
    Daily { hour: u32, minute: u32, second: u32 },

    /// Fire exactly once at the given absolute instant.
    At { instant: DateTime<Utc> },
}

impl Trigger {
    pub fn kind(&self) -> JobKind {
        match self {
            Trigger::Daily { .. } => JobKind::RecurringDaily,
            Trigger::At { .. } => JobKind::OneShot,
        }
    }
}

/// Coarse job classification, stored alongside the trigger for queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    RecurringDaily,
    OneShot,
}

impl std::fmt::Display for JobKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            JobKind::RecurringDaily => "recurring_daily",
            JobKind::OneShot => "one_shot",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for JobKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "recurring_daily" => Ok(JobKind::RecurringDaily),
            "one_shot" => Ok(JobKind::OneShot),
            other => Err(format!("unknown job kind: {other}")),
        }
    }
}

/// What happens when a put hits an id that is already stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplacePolicy {
    /// Overwrite in place — medication reminders are idempotently re-set.
    Replace,
    /// Duplicate creation is unexpected; fail with `AlreadyExists`.
    Reject,
}

impl std::fmt::Display for ReplacePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ReplacePolicy::Replace => "replace",
            ReplacePolicy::Reject => "reject",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for ReplacePolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "replace" => Ok(ReplacePolicy::Replace),
            "reject" => Ok(ReplacePolicy::Reject),
            other => Err(format!("unknown replace policy: {other}")),
        }
    }
}

/// A persisted, schedulable unit of work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSpec {
    /// Deterministic id derived from `(user, intent, qualifier)` — primary key.
    pub id: String,
    pub kind: JobKind,
    pub trigger: Trigger,
    /// Forwarded verbatim to the notify sink when the job fires.
    pub payload: FirePayload,
    /// Human-readable label surfaced by query operations.
    pub label: Option<String>,
    /// Maximum seconds a late fire is still honoured after the due instant.
    pub grace_secs: u64,
    pub replace_policy: ReplacePolicy,
    /// Next due instant (UTC). Recomputed by the engine after each fire of a
    /// recurring job.
    pub next_due: DateTime<Utc>,
    /// ISO-8601 creation timestamp.
    pub created_at: String,
    /// ISO-8601 timestamp of the last mutation.
    pub updated_at: String,
}

impl JobSpec {
    /// Build a spec with `kind` derived from the trigger and both audit
    /// timestamps set to `now`.
    pub fn new(
        id: String,
        trigger: Trigger,
        payload: FirePayload,
        label: Option<String>,
        grace_secs: u64,
        replace_policy: ReplacePolicy,
        next_due: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Self {
        let now_str = now.to_rfc3339();
        Self {
            id,
            kind: trigger.kind(),
            trigger,
            payload,
            label,
            grace_secs,
            replace_policy,
            next_due,
            created_at: now_str.clone(),
            updated_at: now_str,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trigger_kind_is_derived() {
        let daily = Trigger::Daily {
            hour: 8,
            minute: 0,
            second: 0,
        };
        assert_eq!(daily.kind(), JobKind::RecurringDaily);

        let at = Trigger::At {
            instant: Utc::now(),
        };
        assert_eq!(at.kind(), JobKind::OneShot);
    }

    #[test]
    fn trigger_json_is_tagged() {
        let daily = Trigger::Daily {
            hour: 8,
            minute: 30,
            second: 15,
        };
        let json = serde_json::to_string(&daily).expect("serialize");
        assert!(json.contains("\"kind\":\"daily\""));
        let back: Trigger = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, daily);
    }
}
