//! Destination document sink contracts and SQLite implementation.
//!
//! # Responsibility
//! - Store each `EmployeeDocument` as one JSON body in a named collection.
//! - Perform duplicate-tolerant bulk inserts, one transaction per page.
//! - Keep the `migration_runs` ledger.
//!
//! # Invariants
//! - Uniqueness of `emp_no` is enforced by a unique index, not by application checks.
//! - A uniqueness violation skips that one document; any other failure rolls
//!   the whole page back and is returned to the caller.
//! - Documents are never updated or deleted once committed.

use crate::db::validate_identifier;
use crate::model::document::EmployeeDocument;
use crate::model::employee::EmpNo;
use crate::repo::{RepoError, RepoResult};
use rusqlite::{ffi, params, Connection, ErrorCode};
use uuid::Uuid;

/// Per-call result of [`DocumentSink::insert_many_unordered`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InsertOutcome {
    pub inserted: usize,
    /// Identifiers rejected by the uniqueness constraint, in submission order.
    pub duplicates: Vec<EmpNo>,
}

/// Terminal state of one migration run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Done,
    Failed,
}

impl RunStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }
}

/// Ledger row describing one migration run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRecord {
    pub run_id: Uuid,
    /// Unix epoch milliseconds.
    pub started_at: i64,
    /// Unix epoch milliseconds.
    pub finished_at: i64,
    pub status: RunStatus,
    pub pages: u64,
    pub employees: u64,
    pub inserted: u64,
    pub duplicates_skipped: u64,
    pub error: Option<String>,
}

/// Write contract over the destination collection.
pub trait DocumentSink {
    /// Ensures the unique index on `emp_no`. Idempotent.
    fn ensure_unique_index(&self) -> RepoResult<()>;
    /// Inserts every document independently, skipping uniqueness violations.
    fn insert_many_unordered(&self, documents: &[EmployeeDocument]) -> RepoResult<InsertOutcome>;
    /// Returns the number of stored documents.
    fn count_documents(&self) -> RepoResult<u64>;
    /// Appends one run to the ledger.
    fn record_run(&self, run: &RunRecord) -> RepoResult<()>;
}

/// SQLite-backed document collection.
pub struct SqliteDocumentSink<'conn> {
    conn: &'conn Connection,
    collection: String,
}

impl<'conn> SqliteDocumentSink<'conn> {
    /// Binds the sink to `collection`, creating its table when missing.
    ///
    /// The connection must come from `open_sink_db*` so the ledger exists.
    pub fn try_new(conn: &'conn Connection, collection: &str) -> RepoResult<Self> {
        let collection = validate_identifier(collection)?.to_string();
        conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS \"{collection}\" (
                doc_id INTEGER PRIMARY KEY AUTOINCREMENT,
                emp_no INTEGER NOT NULL,
                body TEXT NOT NULL CHECK (json_valid(body)),
                inserted_at INTEGER NOT NULL DEFAULT (CAST(strftime('%s', 'now') AS INTEGER) * 1000)
            );"
        ))?;
        Ok(Self { conn, collection })
    }

    pub fn collection(&self) -> &str {
        self.collection.as_str()
    }

    /// Name of the unique index guarding `emp_no`.
    pub fn unique_index_name(&self) -> String {
        format!("ux_{}_emp_no", self.collection)
    }

    /// Returns the stored document for `emp_no` as JSON.
    ///
    /// When duplicates exist (no unique index), the earliest insert wins.
    pub fn get_document(&self, emp_no: EmpNo) -> RepoResult<Option<serde_json::Value>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT body FROM \"{}\" WHERE emp_no = ?1 ORDER BY doc_id ASC LIMIT 1;",
            self.collection
        ))?;
        let mut rows = stmt.query([emp_no])?;
        if let Some(row) = rows.next()? {
            let body: String = row.get("body")?;
            return Ok(Some(serde_json::from_str(&body)?));
        }
        Ok(None)
    }

    /// Whether the unique index on `emp_no` is present.
    pub fn has_unique_index(&self) -> RepoResult<bool> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'index' AND name = ?1 AND tbl_name = ?2
            );",
            params![self.unique_index_name(), self.collection],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }
}

impl DocumentSink for SqliteDocumentSink<'_> {
    fn ensure_unique_index(&self) -> RepoResult<()> {
        let index_name = self.unique_index_name();
        validate_identifier(&index_name)?;
        self.conn.execute_batch(&format!(
            "CREATE UNIQUE INDEX IF NOT EXISTS \"{index_name}\" ON \"{}\" (emp_no);",
            self.collection
        ))?;
        Ok(())
    }

    fn insert_many_unordered(&self, documents: &[EmployeeDocument]) -> RepoResult<InsertOutcome> {
        let mut outcome = InsertOutcome::default();
        if documents.is_empty() {
            return Ok(outcome);
        }

        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare(&format!(
                "INSERT INTO \"{}\" (emp_no, body) VALUES (?1, ?2);",
                self.collection
            ))?;
            for document in documents {
                let body = serde_json::to_string(document)?;
                match stmt.execute(params![document.emp_no, body]) {
                    Ok(_) => outcome.inserted += 1,
                    Err(err) if is_unique_violation(&err) => outcome.duplicates.push(document.emp_no),
                    Err(err) => return Err(err.into()),
                }
            }
        }
        tx.commit()?;

        Ok(outcome)
    }

    fn count_documents(&self) -> RepoResult<u64> {
        let count: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM \"{}\";", self.collection),
            [],
            |row| row.get(0),
        )?;
        u64::try_from(count)
            .map_err(|_| RepoError::InvalidData(format!("negative document count {count}")))
    }

    fn record_run(&self, run: &RunRecord) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO migration_runs (
                run_id,
                collection,
                started_at,
                finished_at,
                status,
                pages,
                employees,
                inserted,
                duplicates_skipped,
                error
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10);",
            params![
                run.run_id.to_string(),
                self.collection,
                run.started_at,
                run.finished_at,
                run.status.as_str(),
                to_db_count(run.pages)?,
                to_db_count(run.employees)?,
                to_db_count(run.inserted)?,
                to_db_count(run.duplicates_skipped)?,
                run.error.as_deref(),
            ],
        )?;
        Ok(())
    }
}

/// Whether `err` is a uniqueness (or primary-key) constraint violation.
///
/// This is the only insert failure class the loader tolerates.
pub fn is_unique_violation(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(failure, _) => {
            failure.code == ErrorCode::ConstraintViolation
                && (failure.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE
                    || failure.extended_code == ffi::SQLITE_CONSTRAINT_PRIMARYKEY)
        }
        _ => false,
    }
}

fn to_db_count(value: u64) -> RepoResult<i64> {
    i64::try_from(value).map_err(|_| RepoError::InvalidData(format!("count {value} overflows i64")))
}

#[cfg(test)]
mod tests {
    use super::is_unique_violation;
    use rusqlite::Connection;

    #[test]
    fn only_unique_constraint_failures_are_tolerated() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE t (id INTEGER NOT NULL, v TEXT NOT NULL);
             CREATE UNIQUE INDEX ux_t_id ON t (id);
             INSERT INTO t (id, v) VALUES (1, 'a');",
        )
        .unwrap();

        let duplicate = conn
            .execute("INSERT INTO t (id, v) VALUES (1, 'b');", [])
            .unwrap_err();
        assert!(is_unique_violation(&duplicate));

        let not_null = conn
            .execute("INSERT INTO t (id, v) VALUES (2, NULL);", [])
            .unwrap_err();
        assert!(!is_unique_violation(&not_null));

        let missing_table = conn
            .execute("INSERT INTO missing (id) VALUES (1);", [])
            .unwrap_err();
        assert!(!is_unique_violation(&missing_table));
    }
}
