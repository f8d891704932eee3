//! SQLite storage bootstrap for both ends of a migration run.
//!
//! # Responsibility
//! - Open the relational source without creating or altering its schema.
//! - Open the destination document store and apply its own migrations.
//! - Guard every identifier that is interpolated into SQL text.
//!
//! # Invariants
//! - Destination migration version is tracked via `PRAGMA user_version`.
//! - Source databases are never created implicitly; a missing file is an error.
//! - Only identifiers accepted by [`validate_identifier`] reach `format!`-built SQL.

use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub mod migrations;
mod open;

pub use open::{open_sink_db, open_sink_db_in_memory, open_source_db};

pub type DbResult<T> = Result<T, DbError>;

static IDENTIFIER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]{0,62}$").expect("valid identifier regex"));

#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
    InvalidIdentifier(String),
    /// Source file to attach is missing or its path is not valid UTF-8.
    SourceUnavailable(PathBuf),
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "database schema version {db_version} is newer than supported {latest_supported}"
            ),
            Self::InvalidIdentifier(value) => write!(f, "invalid SQL identifier `{value}`"),
            Self::SourceUnavailable(path) => {
                write!(f, "source database `{}` cannot be attached", path.display())
            }
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::UnsupportedSchemaVersion { .. } => None,
            Self::InvalidIdentifier(_) => None,
            Self::SourceUnavailable(_) => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

/// Checks that `value` is safe to splice into SQL as a schema, table or
/// index name.
pub fn validate_identifier(value: &str) -> DbResult<&str> {
    if IDENTIFIER_RE.is_match(value) {
        Ok(value)
    } else {
        Err(DbError::InvalidIdentifier(value.to_string()))
    }
}

/// Where the destination document store lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkLocation {
    File(PathBuf),
    InMemory,
}

impl SinkLocation {
    /// Parses a destination URL.
    ///
    /// Accepts `sqlite://<path>`, `sqlite::memory:`, `:memory:` and bare paths.
    /// Returns `None` for an empty value.
    pub fn parse(value: &str) -> Option<Self> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return None;
        }
        if trimmed == ":memory:" || trimmed == "sqlite::memory:" {
            return Some(Self::InMemory);
        }
        let path = trimmed.strip_prefix("sqlite://").unwrap_or(trimmed);
        if path.is_empty() {
            return None;
        }
        Some(Self::File(PathBuf::from(path)))
    }
}

impl Display for SinkLocation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::File(path) => write!(f, "sqlite://{}", path.display()),
            Self::InMemory => write!(f, "sqlite::memory:"),
        }
    }
}
