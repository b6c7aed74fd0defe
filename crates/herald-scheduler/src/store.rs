//! Durable job table — the single source of truth for scheduled work.

use std::str::FromStr;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use tracing::debug;

use crate::db::init_db;
use crate::error::{Result, SchedulerError};
use crate::types::{JobKind, JobSpec, ReplacePolicy};

/// Handle to the persisted `jobs` table.
///
/// Clones share one connection behind a mutex, so facade commands and the
/// engine's own rescheduling serialise per statement; jobs are independent,
/// so no coarser locking is needed.
#[derive(Clone)]
pub struct JobStore {
    conn: Arc<Mutex<Connection>>,
}

const SELECT_COLUMNS: &str = "id, kind, trigger, payload, label, grace_secs,
        replace_policy, next_due, created_at, updated_at";

impl JobStore {
    /// Wrap `conn`, initialising the schema if needed.
    pub fn new(conn: Connection) -> Result<Self> {
        init_db(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Insert `spec`, honouring its replace policy: `Replace` overwrites an
    /// existing row in place, `Reject` fails with `AlreadyExists`.
    pub fn put(&self, spec: &JobSpec) -> Result<()> {
        let trigger_json = serde_json::to_string(&spec.trigger)
            .map_err(|e| corrupt(&spec.id, e))?;
        let payload_json = serde_json::to_string(&spec.payload)
            .map_err(|e| corrupt(&spec.id, e))?;

        let sql = match spec.replace_policy {
            ReplacePolicy::Replace => {
                "INSERT INTO jobs
                 (id, kind, trigger, payload, label, grace_secs,
                  replace_policy, next_due, created_at, updated_at)
                 VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10)
                 ON CONFLICT(id) DO UPDATE SET
                   kind=?2, trigger=?3, payload=?4, label=?5, grace_secs=?6,
                   replace_policy=?7, next_due=?8, updated_at=?10"
            }
            ReplacePolicy::Reject => {
                "INSERT INTO jobs
                 (id, kind, trigger, payload, label, grace_secs,
                  replace_policy, next_due, created_at, updated_at)
                 VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10)"
            }
        };

        let conn = self.conn.lock().unwrap();
        let result = conn.execute(
            sql,
            rusqlite::params![
                spec.id,
                spec.kind.to_string(),
                trigger_json,
                payload_json,
                spec.label,
                spec.grace_secs as i64,
                spec.replace_policy.to_string(),
                spec.next_due.to_rfc3339(),
                spec.created_at,
                spec.updated_at,
            ],
        );

        match result {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Err(SchedulerError::AlreadyExists {
                    id: spec.id.clone(),
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Fetch one spec; `None` is the absent state, not an error.
    pub fn get(&self, id: &str) -> Result<Option<JobSpec>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare_cached(&format!(
            "SELECT {SELECT_COLUMNS} FROM jobs WHERE id = ?1"
        ))?;
        let mut rows = stmt.query([id])?;
        match rows.next()? {
            Some(row) => Ok(Some(row_to_spec(row)?)),
            None => Ok(None),
        }
    }

    /// Delete one row. Returns whether anything was removed; removal of an
    /// already-absent id is reported, not fatal.
    pub fn remove(&self, id: &str) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let n = conn.execute("DELETE FROM jobs WHERE id = ?1", [id])?;
        if n == 0 {
            debug!(job_id = %id, "remove: id not present");
        }
        Ok(n > 0)
    }

    /// Persist a recurring job's recomputed due instant.
    pub fn update_next_due(&self, id: &str, next_due: DateTime<Utc>) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let n = conn.execute(
            "UPDATE jobs SET next_due = ?1, updated_at = ?2 WHERE id = ?3",
            rusqlite::params![next_due.to_rfc3339(), Utc::now().to_rfc3339(), id],
        )?;
        Ok(n > 0)
    }

    /// Every stored spec, ordered by creation (the engine's deterministic
    /// tie-break after a restart).
    pub fn load_all(&self) -> Result<Vec<JobSpec>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare_cached(&format!(
            "SELECT {SELECT_COLUMNS} FROM jobs ORDER BY created_at, id"
        ))?;
        let mut rows = stmt.query([])?;
        let mut specs = Vec::new();
        while let Some(row) = rows.next()? {
            specs.push(row_to_spec(row)?);
        }
        Ok(specs)
    }
}

fn corrupt(id: &str, e: impl std::fmt::Display) -> SchedulerError {
    SchedulerError::CorruptRow {
        id: id.to_string(),
        reason: e.to_string(),
    }
}

/// Map a SELECT row (column order from SELECT_COLUMNS) to a JobSpec.
/// Centralised here so get and load_all stay consistent.
fn row_to_spec(row: &rusqlite::Row<'_>) -> Result<JobSpec> {
    let id: String = row.get(0)?;
    let kind = JobKind::from_str(&row.get::<_, String>(1)?).map_err(|e| corrupt(&id, e))?;
    let trigger =
        serde_json::from_str(&row.get::<_, String>(2)?).map_err(|e| corrupt(&id, e))?;
    let payload =
        serde_json::from_str(&row.get::<_, String>(3)?).map_err(|e| corrupt(&id, e))?;
    let replace_policy =
        ReplacePolicy::from_str(&row.get::<_, String>(6)?).map_err(|e| corrupt(&id, e))?;
    let next_due = DateTime::parse_from_rfc3339(&row.get::<_, String>(7)?)
        .map_err(|e| corrupt(&id, e))?
        .with_timezone(&Utc);
    Ok(JobSpec {
        id,
        kind,
        trigger,
        payload,
        label: row.get(4)?,
        grace_secs: row.get::<_, i64>(5)? as u64,
        replace_policy,
        next_due,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}
