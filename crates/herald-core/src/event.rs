//! Fire-event types — shared between the trigger engine and the notify
//! dispatcher.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which outbound call a job makes when it fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FireBehavior {
    /// Generic intent call: POST {api_base}/intent.
    Intent,
    /// Template notification path used by medication reminders:
    /// POST {api_base}/template.
    Template,
}

/// Stored as a JSON string in the `jobs.payload` column.
///
/// Written by the scheduling facade; forwarded verbatim to the notify sink
/// when the engine fires the job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirePayload {
    pub user_id: String,
    pub intent_name: String,
    pub qualifier: String,
    /// Human-readable label (`"08:00 AM"`, `"'Checkup' on Tue 2024-03-05 03:30 PM"`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_label: Option<String>,
    pub behavior: FireBehavior,
}

/// A due occurrence handed from the engine to the dispatcher.
#[derive(Debug, Clone)]
pub struct FiredJob {
    /// Originating job id — used for logging only.
    pub job_id: String,
    /// The occurrence's due instant (UTC).
    pub due: DateTime<Utc>,
    pub payload: FirePayload,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_json_shape_is_stable() {
        let payload = FirePayload {
            user_id: "u1".into(),
            intent_name: "take_pill".into(),
            qualifier: "m".into(),
            display_label: Some("08:00 AM".into()),
            behavior: FireBehavior::Template,
        };
        let json = serde_json::to_string(&payload).expect("serialize");
        assert!(json.contains("\"behavior\":\"template\""));
        let back: FirePayload = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, payload);
    }

    #[test]
    fn absent_label_is_omitted() {
        let payload = FirePayload {
            user_id: "u1".into(),
            intent_name: "snooze_followup".into(),
            qualifier: "s".into(),
            display_label: None,
            behavior: FireBehavior::Intent,
        };
        let json = serde_json::to_string(&payload).expect("serialize");
        assert!(!json.contains("display_label"));
    }
}
