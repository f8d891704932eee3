//! Connection bootstrap utilities for both migration endpoints.
//!
//! # Responsibility
//! - Open the relational source as an existing SQLite file, attached under
//!   the configured schema name when it is not `main`.
//! - Open file or in-memory destination stores and migrate them.
//!
//! # Invariants
//! - Source connections never trigger schema changes on open.
//! - Source paths are plain file names, never SQLite URIs.
//! - Destination connections have migrations fully applied.

use super::migrations::apply_migrations;
use super::{validate_identifier, DbError, DbResult, SinkLocation};
use log::{error, info};
use rusqlite::{Connection, OpenFlags};
use std::borrow::Cow;
use std::path::Path;
use std::time::{Duration, Instant};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);
const MAIN_SCHEMA: &str = "main";

/// Opens an existing relational source database with its tables visible
/// under `schema`.
///
/// `main` opens the file directly. Any other name opens a private in-memory
/// connection and attaches the file under that name, so queries qualified
/// with `schema` resolve against it. The file must already exist in both
/// cases; helper-index DDL needs write access, so the connection is
/// read-write but never creates the database.
///
/// # Side effects
/// - Emits `db_open` logging events with duration and status.
pub fn open_source_db(path: impl AsRef<Path>, schema: &str) -> DbResult<Connection> {
    let path = path.as_ref();
    let started_at = Instant::now();
    let mode = if is_main_schema(schema) { "file" } else { "attach" };
    info!("event=db_open module=db status=start role=source mode={mode} schema={schema}");

    match open_source(path, schema) {
        Ok(conn) => {
            info!(
                "event=db_open module=db status=ok role=source mode={} schema={} duration_ms={}",
                mode,
                schema,
                started_at.elapsed().as_millis()
            );
            Ok(conn)
        }
        Err(err) => {
            error!(
                "event=db_open module=db status=error role=source mode={} schema={} duration_ms={} error_code=db_open_failed error={}",
                mode,
                schema,
                started_at.elapsed().as_millis(),
                err
            );
            Err(err)
        }
    }
}

fn open_source(path: &Path, schema: &str) -> DbResult<Connection> {
    let schema = validate_identifier(schema)?;
    let path: &Path = &literal_path(path);

    let conn = if is_main_schema(schema) {
        Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?
    } else {
        // ATTACH creates missing files, so existence is checked up front.
        if !path.is_file() {
            return Err(DbError::SourceUnavailable(path.to_path_buf()));
        }
        let file_name = path
            .to_str()
            .ok_or_else(|| DbError::SourceUnavailable(path.to_path_buf()))?;
        let conn = Connection::open_in_memory_with_flags(
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        conn.execute(&format!("ATTACH DATABASE ?1 AS \"{schema}\";"), [file_name])?;
        conn
    };

    conn.busy_timeout(BUSY_TIMEOUT)?;
    Ok(conn)
}

/// Keeps a relative `file:...` source path from being parsed as a SQLite URI.
///
/// SQLite only treats names starting with `file:` as URIs, and the bundled
/// build may enable URI parsing globally regardless of open flags.
fn literal_path(path: &Path) -> Cow<'_, Path> {
    if path.to_string_lossy().starts_with("file:") {
        Cow::Owned(Path::new(".").join(path))
    } else {
        Cow::Borrowed(path)
    }
}

fn is_main_schema(schema: &str) -> bool {
    schema.eq_ignore_ascii_case(MAIN_SCHEMA)
}

/// Opens the destination document store and applies pending migrations.
///
/// # Side effects
/// - Creates the database file when it does not exist.
/// - Emits `db_open` logging events with duration and status.
pub fn open_sink_db(location: &SinkLocation) -> DbResult<Connection> {
    match location {
        SinkLocation::File(path) => open_sink(Connection::open(path), "file"),
        SinkLocation::InMemory => open_sink_db_in_memory(),
    }
}

/// Opens an in-memory destination store and applies pending migrations.
pub fn open_sink_db_in_memory() -> DbResult<Connection> {
    open_sink(Connection::open_in_memory(), "memory")
}

fn open_sink(opened: rusqlite::Result<Connection>, mode: &str) -> DbResult<Connection> {
    let started_at = Instant::now();
    info!("event=db_open module=db status=start role=sink mode={mode}");

    let mut conn = match opened {
        Ok(conn) => conn,
        Err(err) => {
            error!(
                "event=db_open module=db status=error role=sink mode={} duration_ms={} error_code=db_open_failed error={}",
                mode,
                started_at.elapsed().as_millis(),
                err
            );
            return Err(err.into());
        }
    };

    match bootstrap_sink(&mut conn) {
        Ok(()) => {
            info!(
                "event=db_open module=db status=ok role=sink mode={} duration_ms={}",
                mode,
                started_at.elapsed().as_millis()
            );
            Ok(conn)
        }
        Err(err) => {
            error!(
                "event=db_open module=db status=error role=sink mode={} duration_ms={} error_code=db_bootstrap_failed error={}",
                mode,
                started_at.elapsed().as_millis(),
                err
            );
            Err(err)
        }
    }
}

fn bootstrap_sink(conn: &mut Connection) -> DbResult<()> {
    conn.busy_timeout(BUSY_TIMEOUT)?;
    apply_migrations(conn)?;
    Ok(())
}
