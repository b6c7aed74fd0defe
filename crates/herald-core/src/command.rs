use serde::{Deserialize, Serialize};

/// Reminder family selected by the command qualifier.
///
/// The qualifier doubles as the last component of the derived job id, so the
/// canonical single-letter forms are part of the persisted surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReminderKind {
    /// Daily recurring template notification.
    Medication,
    /// One-shot event plus its 24-hour-prior reminder.
    Appointment,
    /// One-shot follow-up at an absolute instant.
    Snooze,
}

impl ReminderKind {
    /// Canonical qualifier letter (`m` / `a` / `s`).
    pub fn qualifier(&self) -> &'static str {
        match self {
            ReminderKind::Medication => "m",
            ReminderKind::Appointment => "a",
            ReminderKind::Snooze => "s",
        }
    }
}

impl std::fmt::Display for ReminderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.qualifier())
    }
}

impl std::str::FromStr for ReminderKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "m" => Ok(ReminderKind::Medication),
            "a" => Ok(ReminderKind::Appointment),
            "s" => Ok(ReminderKind::Snooze),
            other => Err(format!("unknown reminder qualifier: {other}")),
        }
    }
}

/// Inbound "schedule" command, transport-agnostic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleCommand {
    pub user_id: String,
    pub intent_name: String,
    /// Short discriminator selecting the reminder family (`m`/`a`/`s`).
    pub qualifier: String,
    /// Absolute timestamp, `YYYY-MM-DDTHH:MM:SS.sss+HH:MM`.
    pub time_point: String,
    /// Human label used in appointment display strings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

/// Inbound "cancel" command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelCommand {
    pub user_id: String,
    pub intent_name: String,
    pub qualifier: String,
}

/// Inbound "query" command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryCommand {
    pub user_id: String,
    pub intent_name: String,
    pub qualifier: String,
}
