/*!
 * Cache table layout and schema versioning.
 *
 * The version lives in SQLite's `user_version` pragma. Each entry of
 * `MIGRATIONS` upgrades the schema by one version and runs inside a
 * transaction together with the version bump.
 */

use anyhow::{Context, Result, bail};
use log::{debug, info};
use rusqlite::Connection;

/// Schema version this build reads and writes
pub const SCHEMA_VERSION: i32 = MIGRATIONS.len() as i32;

/// `MIGRATIONS[n]` moves a database from version `n` to `n + 1`
const MIGRATIONS: &[&str] = &[
    // v1: one row per cache key. Timestamps are fixed-precision RFC 3339 UTC
    // strings, so text comparison follows time order.
    r#"
    CREATE TABLE translations (
        text_hash       TEXT PRIMARY KEY,
        original_text   TEXT NOT NULL,
        translated_text TEXT NOT NULL,
        source_lang     TEXT NOT NULL,
        target_lang     TEXT NOT NULL,
        quality_score   REAL NOT NULL CHECK (quality_score BETWEEN 0.0 AND 1.0),
        use_count       INTEGER NOT NULL DEFAULT 1 CHECK (use_count >= 1),
        created_at      TEXT NOT NULL,
        last_used       TEXT NOT NULL,
        metadata        TEXT
    );
    CREATE INDEX idx_translations_last_used ON translations(last_used);
    CREATE INDEX idx_translations_quality ON translations(quality_score);
    "#,
];

/// Bring the schema of `conn` up to [`SCHEMA_VERSION`]
pub fn initialize_schema(conn: &Connection) -> Result<()> {
    let found = schema_version(conn)?;

    if found > SCHEMA_VERSION {
        bail!(
            "Cache database uses schema v{} but this build only knows up to v{}",
            found,
            SCHEMA_VERSION
        );
    }
    if found == SCHEMA_VERSION {
        debug!("Cache schema is current (v{})", found);
        return Ok(());
    }

    for (index, sql) in MIGRATIONS.iter().enumerate().skip(found as usize) {
        let target = index as i32 + 1;
        let tx = conn.unchecked_transaction()?;
        tx.execute_batch(sql)
            .with_context(|| format!("Cache schema migration to v{} failed", target))?;
        tx.pragma_update(None, "user_version", target)?;
        tx.commit()?;
        info!("Cache schema migrated to v{}", target);
    }

    Ok(())
}

fn schema_version(conn: &Connection) -> Result<i32> {
    conn.query_row("PRAGMA user_version", [], |row| row.get(0))
        .context("Cannot read cache schema version")
}
