//! Engagement-tracking operations: init, atomic counter bumps, set-once
//! start dates, module status updates.

use std::str::FromStr;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use rusqlite::Connection;
use tracing::{debug, info};

use crate::db::init_db;
use crate::error::{Result, TrackerError};
use crate::types::{ModuleStatus, TrackingEntry};

/// Counter topics bumped by one per interaction.
const COUNTER_TOPICS: [&str; 6] = [
    "faq_question",
    "faq_rephrase",
    "faq_threshold",
    "app_rem_count",
    "med_rem_yes",
    "med_rem_remind",
];

/// Content modules whose completion status is tracked.
const MODULE_TOPICS: [&str; 4] = [
    "adherence",
    "drug_use_storage",
    "drugs_and_side_effects",
    "sex_h",
];

/// Handle to the per-user `tracking` table.
#[derive(Clone)]
pub struct TrackerManager {
    conn: Arc<Mutex<Connection>>,
}

impl TrackerManager {
    /// Wrap `conn`, initialising the schema if needed.
    pub fn new(conn: Connection) -> Result<Self> {
        init_db(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Create the engagement document for a new user. Duplicate
    /// initialization is an error, not an overwrite.
    pub fn init_user(&self, user_id: &str, nickname: &str, time_point: &str) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        let conn = self.conn.lock().unwrap();
        let result = conn.execute(
            "INSERT INTO tracking
             (user_id, general_startdate, general_nickname, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?4)",
            rusqlite::params![user_id, time_point, nickname, now],
        );
        match result {
            Ok(_) => {
                info!(%user_id, "tracking document initialized");
                Ok(())
            }
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Err(TrackerError::AlreadyInitialized {
                    user_id: user_id.to_string(),
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Apply one tracking update, dispatched by topic name.
    ///
    /// `i` initializes the document (value = nickname); counter topics bump
    /// their column; `med_rem_startdate` only stamps the date; module topics
    /// set the completion status carried in `value`. Anything else is
    /// `UnknownTopic` — never a silent no-op.
    pub fn record(
        &self,
        user_id: &str,
        topic: &str,
        value: Option<&str>,
        time_point: &str,
    ) -> Result<()> {
        if topic == "i" {
            let nickname = value.ok_or_else(|| TrackerError::MissingValue {
                topic: topic.to_string(),
            })?;
            return self.init_user(user_id, nickname, time_point);
        }

        if COUNTER_TOPICS.contains(&topic) {
            // The first appointment-reminder interaction stamps its start date.
            if topic.starts_with("app_rem") {
                self.stamp_once(user_id, "app_rem_startdate", time_point)?;
            }
            return self.bump(user_id, topic);
        }

        if topic == "med_rem_startdate" {
            return self.stamp_once(user_id, "med_rem_startdate", time_point);
        }

        if MODULE_TOPICS.contains(&topic) {
            let raw = value.ok_or_else(|| TrackerError::MissingValue {
                topic: topic.to_string(),
            })?;
            let status = ModuleStatus::from_str(raw)
                .map_err(|_| TrackerError::InvalidStatus(raw.to_string()))?;
            return self.set_module(user_id, topic, status);
        }

        Err(TrackerError::UnknownTopic {
            topic: topic.to_string(),
        })
    }

    /// Whether a tracking document exists for this user.
    pub fn exists(&self, user_id: &str) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let mut stmt =
            conn.prepare_cached("SELECT 1 FROM tracking WHERE user_id = ?1")?;
        Ok(stmt.exists([user_id])?)
    }

    /// Full engagement document, or `None` if the user was never initialized.
    pub fn get(&self, user_id: &str) -> Result<Option<TrackingEntry>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare_cached(
            "SELECT user_id, general_startdate, general_nickname,
                    faq_question, faq_rephrase, faq_threshold,
                    app_rem_startdate, app_rem_count,
                    med_rem_startdate, med_rem_count, med_rem_yes, med_rem_remind,
                    adherence, drug_use_storage, drugs_and_side_effects, sex_h,
                    created_at, updated_at
             FROM tracking WHERE user_id = ?1",
        )?;
        let mut rows = stmt.query([user_id])?;
        match rows.next()? {
            Some(row) => Ok(Some(row_to_entry(row)?)),
            None => Ok(None),
        }
    }

    /// Delete the user's document. Returns whether a row was removed.
    pub fn delete(&self, user_id: &str) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let n = conn.execute("DELETE FROM tracking WHERE user_id = ?1", [user_id])?;
        if n > 0 {
            info!(%user_id, "tracking document deleted");
        } else {
            debug!(%user_id, "delete: no tracking document");
        }
        Ok(n > 0)
    }

    // --- private helpers ---------------------------------------------------

    /// Atomic `col = col + 1`. The column name comes from the fixed topic
    /// lists above, never from caller input.
    fn bump(&self, user_id: &str, column: &str) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        let conn = self.conn.lock().unwrap();
        let n = conn.execute(
            &format!(
                "UPDATE tracking SET {column} = {column} + 1, updated_at = ?1
                 WHERE user_id = ?2"
            ),
            rusqlite::params![now, user_id],
        )?;
        if n == 0 {
            return Err(TrackerError::UserNotFound {
                user_id: user_id.to_string(),
            });
        }
        debug!(%user_id, column, "counter bumped");
        Ok(())
    }

    /// Stamp a date column only if it is still unset; later calls are no-ops.
    fn stamp_once(&self, user_id: &str, column: &str, time_point: &str) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        let conn = self.conn.lock().unwrap();
        let n = conn.execute(
            &format!(
                "UPDATE tracking SET {column} = ?1, updated_at = ?2
                 WHERE user_id = ?3 AND {column} IS NULL"
            ),
            rusqlite::params![time_point, now, user_id],
        )?;
        if n > 0 {
            debug!(%user_id, column, "start date stamped");
        }
        Ok(())
    }

    fn set_module(&self, user_id: &str, column: &str, status: ModuleStatus) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        let conn = self.conn.lock().unwrap();
        let n = conn.execute(
            &format!(
                "UPDATE tracking SET {column} = ?1, updated_at = ?2
                 WHERE user_id = ?3"
            ),
            rusqlite::params![status.to_string(), now, user_id],
        )?;
        if n == 0 {
            return Err(TrackerError::UserNotFound {
                user_id: user_id.to_string(),
            });
        }
        info!(%user_id, module = column, status = %status, "module status updated");
        Ok(())
    }
}

/// Map a SELECT row (column order from the query in `get`) to an entry.
fn row_to_entry(row: &rusqlite::Row<'_>) -> Result<TrackingEntry> {
    let parse_status = |s: String| ModuleStatus::from_str(&s).unwrap_or_default();
    Ok(TrackingEntry {
        user_id: row.get(0)?,
        general_startdate: row.get(1)?,
        general_nickname: row.get(2)?,
        faq_question: row.get(3)?,
        faq_rephrase: row.get(4)?,
        faq_threshold: row.get(5)?,
        app_rem_startdate: row.get(6)?,
        app_rem_count: row.get(7)?,
        med_rem_startdate: row.get(8)?,
        med_rem_count: row.get(9)?,
        med_rem_yes: row.get(10)?,
        med_rem_remind: row.get(11)?,
        adherence: parse_status(row.get(12)?),
        drug_use_storage: parse_status(row.get(13)?),
        drugs_and_side_effects: parse_status(row.get(14)?),
        sex_h: parse_status(row.get(15)?),
        created_at: row.get(16)?,
        updated_at: row.get(17)?,
    })
}
