use serde::{Deserialize, Serialize};

/// Completion state of one content module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ModuleStatus {
    #[default]
    NotStarted,
    Initiated,
    Completed,
}

impl std::fmt::Display for ModuleStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ModuleStatus::NotStarted => "not_started",
            ModuleStatus::Initiated => "initiated",
            ModuleStatus::Completed => "completed",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for ModuleStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "not_started" => Ok(ModuleStatus::NotStarted),
            "initiated" => Ok(ModuleStatus::Initiated),
            "completed" => Ok(ModuleStatus::Completed),
            other => Err(format!("unknown module status: {other}")),
        }
    }
}

/// Full per-user engagement document. One row in the `tracking` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackingEntry {
    pub user_id: String,
    /// Timestamp of the initialization command.
    pub general_startdate: String,
    pub general_nickname: String,

    // Raw engagement counters — append-only, never decremented.
    pub faq_question: u64,
    pub faq_rephrase: u64,
    pub faq_threshold: u64,
    pub app_rem_count: u64,
    pub med_rem_count: u64,
    pub med_rem_yes: u64,
    pub med_rem_remind: u64,

    // Stamped on the first matching interaction, then frozen.
    pub app_rem_startdate: Option<String>,
    pub med_rem_startdate: Option<String>,

    // Content-module completion states.
    pub adherence: ModuleStatus,
    pub drug_use_storage: ModuleStatus,
    pub drugs_and_side_effects: ModuleStatus,
    pub sex_h: ModuleStatus,

    pub created_at: String,
    pub updated_at: String,
}
