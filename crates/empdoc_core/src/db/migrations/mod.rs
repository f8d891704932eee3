//! Destination schema versions.
//!
//! Document collections are created on demand by the sink. The
//! `migration_runs` ledger is not: operators query it across releases to
//! audit past runs, so its shape is versioned through `PRAGMA user_version`.
//!
//! # Invariants
//! - Versions start at 1 and grow by exactly one per step.
//! - A store is upgraded in one transaction or not at all.
//! - A store stamped by a newer binary is refused, never downgraded.

use crate::db::{DbError, DbResult};
use log::info;
use rusqlite::Connection;
use std::cmp::Ordering;

/// `(version, ddl)` in application order.
const SINK_SCHEMA_STEPS: &[(u32, &str)] = &[(1, include_str!("0001_migration_runs.sql"))];

/// Highest sink schema version this binary can write.
pub fn latest_version() -> u32 {
    SINK_SCHEMA_STEPS.last().map_or(0, |(version, _)| *version)
}

/// Brings the sink schema at `conn` up to [`latest_version`].
///
/// # Errors
/// - [`DbError::UnsupportedSchemaVersion`] when the store is newer than this binary.
/// - [`DbError::Sqlite`] when a step fails; nothing from the batch is kept.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<()> {
    let applied: u32 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;
    let latest = latest_version();

    match applied.cmp(&latest) {
        Ordering::Greater => {
            return Err(DbError::UnsupportedSchemaVersion {
                db_version: applied,
                latest_supported: latest,
            });
        }
        Ordering::Equal => return Ok(()),
        Ordering::Less => {}
    }

    let tx = conn.transaction()?;
    for &(version, ddl) in pending_steps(applied) {
        tx.execute_batch(ddl)?;
        tx.pragma_update(None, "user_version", version)?;
    }
    tx.commit()?;

    info!(
        "event=db_migrate module=db status=ok role=sink from_version={} to_version={}",
        applied, latest
    );
    Ok(())
}

fn pending_steps(applied: u32) -> impl Iterator<Item = &'static (u32, &'static str)> {
    SINK_SCHEMA_STEPS
        .iter()
        .filter(move |(version, _)| *version > applied)
}
