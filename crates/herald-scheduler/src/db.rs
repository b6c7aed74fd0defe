use rusqlite::Connection;

use crate::error::Result;

/// Initialise the scheduler schema in `conn`.
///
/// Creates the `jobs` table (idempotent) and an index on `next_due` so the
/// engine's resync query stays efficient with thousands of scheduled jobs.
pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS jobs (
            id              TEXT    NOT NULL PRIMARY KEY,
            kind            TEXT    NOT NULL,   -- 'recurring_daily' | 'one_shot'
            trigger         TEXT    NOT NULL,   -- JSON-encoded Trigger enum
            payload         TEXT    NOT NULL,   -- JSON-encoded FirePayload
            label           TEXT,               -- display label or NULL
            grace_secs      INTEGER NOT NULL,
            replace_policy  TEXT    NOT NULL DEFAULT 'replace',
            next_due        TEXT    NOT NULL,   -- ISO-8601 UTC
            created_at      TEXT    NOT NULL,
            updated_at      TEXT    NOT NULL
        ) STRICT;

        CREATE INDEX IF NOT EXISTS idx_jobs_next_due ON jobs (next_due);
        ",
    )?;
    Ok(())
}
