use rusqlite::Connection;

use crate::error::Result;

/// Initialise the tracking schema in `conn`. Safe to call on every startup.
pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS tracking (
            user_id                 TEXT    NOT NULL PRIMARY KEY,
            general_startdate       TEXT    NOT NULL,
            general_nickname        TEXT    NOT NULL,
            faq_question            INTEGER NOT NULL DEFAULT 0,
            faq_rephrase            INTEGER NOT NULL DEFAULT 0,
            faq_threshold           INTEGER NOT NULL DEFAULT 0,
            app_rem_startdate       TEXT,               -- NULL until first use
            app_rem_count           INTEGER NOT NULL DEFAULT 0,
            med_rem_startdate       TEXT,               -- NULL until first use
            med_rem_count           INTEGER NOT NULL DEFAULT 0,
            med_rem_yes             INTEGER NOT NULL DEFAULT 0,
            med_rem_remind          INTEGER NOT NULL DEFAULT 0,
            adherence               TEXT    NOT NULL DEFAULT 'not_started',
            drug_use_storage        TEXT    NOT NULL DEFAULT 'not_started',
            drugs_and_side_effects  TEXT    NOT NULL DEFAULT 'not_started',
            sex_h                   TEXT    NOT NULL DEFAULT 'not_started',
            created_at              TEXT    NOT NULL,
            updated_at              TEXT    NOT NULL
        ) STRICT;
        ",
    )?;
    Ok(())
}
