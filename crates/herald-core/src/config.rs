use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

pub const DEFAULT_PORT: u16 = 8750;
pub const DEFAULT_BIND: &str = "127.0.0.1";
/// Seconds a late fire is still honoured after its due instant.
pub const DEFAULT_MISFIRE_GRACE_SECS: u64 = 30;
/// All calendar maths happens in this zone unless overridden.
pub const DEFAULT_TIMEZONE: &str = "Africa/Lagos";

/// Top-level config (herald.toml + HERALD_* env overrides).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeraldConfig {
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub notify: NotifyConfig,
}

impl Default for HeraldConfig {
    fn default() -> Self {
        Self {
            gateway: GatewayConfig::default(),
            database: DatabaseConfig::default(),
            scheduler: SchedulerConfig::default(),
            notify: NotifyConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            bind: DEFAULT_BIND.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Trigger-engine tuning. The timezone is fixed for the process lifetime;
/// changing it requires a restart because every persisted due instant was
/// derived under the old zone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// IANA zone name the assistant operates in (e.g. "Africa/Lagos").
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default = "default_misfire_grace_secs")]
    pub misfire_grace_secs: u64,
    /// Capacity of the fired-job channel between engine and dispatcher.
    #[serde(default = "default_fired_queue_size")]
    pub fired_queue_size: usize,
    /// Maximum concurrent outbound fire calls.
    #[serde(default = "default_max_in_flight")]
    pub max_in_flight: usize,
    /// How often the engine re-derives its wake queue from the store.
    #[serde(default = "default_resync_interval_secs")]
    pub resync_interval_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            timezone: default_timezone(),
            misfire_grace_secs: default_misfire_grace_secs(),
            fired_queue_size: default_fired_queue_size(),
            max_in_flight: default_max_in_flight(),
            resync_interval_secs: default_resync_interval_secs(),
        }
    }
}

impl SchedulerConfig {
    /// Resolve the configured zone name. A typo here must fail startup, not
    /// fall back to UTC and silently shift every reminder.
    pub fn operating_timezone(&self) -> crate::error::Result<chrono_tz::Tz> {
        self.timezone
            .parse()
            .map_err(|_| crate::error::HeraldError::Config(format!(
                "unknown timezone: {}",
                self.timezone
            )))
    }
}

/// Outbound webhook target — the messaging API that actually delivers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyConfig {
    /// Base URL of the messaging API (no trailing slash).
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// Sender phone number id forwarded with every fire call.
    #[serde(default)]
    pub phone_number_id: String,
    /// Display name attached to outbound payloads.
    #[serde(default = "default_sender_name")]
    pub sender_name: String,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            phone_number_id: String::new(),
            sender_name: default_sender_name(),
        }
    }
}

fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}
fn default_db_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.herald/herald.db", home)
}
fn default_timezone() -> String {
    DEFAULT_TIMEZONE.to_string()
}
fn default_misfire_grace_secs() -> u64 {
    DEFAULT_MISFIRE_GRACE_SECS
}
fn default_fired_queue_size() -> usize {
    256
}
fn default_max_in_flight() -> usize {
    20
}
fn default_resync_interval_secs() -> u64 {
    60
}
fn default_api_base() -> String {
    "http://localhost:9801".to_string()
}
fn default_sender_name() -> String {
    "Herald Scheduler".to_string()
}

impl HeraldConfig {
    /// Load config from a TOML file with HERALD_* env var overrides.
    ///
    /// Checks in order:
    ///   1. Explicit path argument
    ///   2. ~/.herald/herald.toml
    pub fn load(config_path: Option<&str>) -> crate::error::Result<Self> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(default_config_path);

        let config: HeraldConfig = Figment::new()
            .merge(Toml::file(&path))
            .merge(Env::prefixed("HERALD_").split("_"))
            .extract()
            .map_err(|e| crate::error::HeraldError::Config(e.to_string()))?;

        Ok(config)
    }
}

fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.herald/herald.toml", home)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_resolve_operating_timezone() {
        let config = HeraldConfig::default();
        let tz = config.scheduler.operating_timezone().expect("default zone");
        assert_eq!(tz.to_string(), "Africa/Lagos");
    }

    #[test]
    fn bad_timezone_is_a_config_error() {
        let scheduler = SchedulerConfig {
            timezone: "Mars/Olympus_Mons".to_string(),
            ..SchedulerConfig::default()
        };
        assert!(scheduler.operating_timezone().is_err());
    }
}
