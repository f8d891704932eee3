//! Migration orchestrator.
//!
//! # Responsibility
//! - Drive page fetch, relationship resolution, document build and bulk load
//!   until the source is exhausted.
//! - Bracket the run with index lifecycle steps and the run ledger.
//!
//! # Invariants
//! - One page is fully loaded before the next one is fetched.
//! - Cleanup (helper index drop, ledger entry) runs on success and on failure.
//! - Only uniqueness violations are tolerated; every other error ends the run.
//!
//! # State machine
//! `Init -> Paging { page_index } -> Done`, with `Failed` reachable from
//! `Init` and `Paging`.

use crate::config::{ConfigError, MigrationConfig};
use crate::db::{open_sink_db, open_source_db, DbError};
use crate::model::document::EmployeeDocument;
use crate::model::employee::Employee;
use crate::repo::sink_repo::{DocumentSink, RunRecord, RunStatus, SqliteDocumentSink};
use crate::repo::source_repo::{SourceRepository, SqliteSourceRepository};
use crate::repo::RepoError;
use crate::service::builder::build_document;
use crate::service::indexes::{ensure_unique_constraint, HelperIndexSet};
use crate::service::lookup::{LookupContext, OverlapRule};
use crate::service::resolver::{fetch_page_children, resolve_children};
use chrono::Utc;
use log::{debug, error, info, warn};
use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;
use uuid::Uuid;

pub type MigrationResult<T> = Result<T, MigrationError>;

/// Fatal migration error. Tolerated conditions never surface here.
#[derive(Debug)]
pub enum MigrationError {
    Config(ConfigError),
    Db(DbError),
    Source(RepoError),
    Sink(RepoError),
}

impl Display for MigrationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(err) => write!(f, "invalid configuration: {err}"),
            Self::Db(err) => write!(f, "database bootstrap failed: {err}"),
            Self::Source(err) => write!(f, "source read failed: {err}"),
            Self::Sink(err) => write!(f, "destination write failed: {err}"),
        }
    }
}

impl Error for MigrationError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::Source(err) => Some(err),
            Self::Sink(err) => Some(err),
        }
    }
}

impl From<ConfigError> for MigrationError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<DbError> for MigrationError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

/// Orchestrator state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationState {
    Init,
    Paging { page_index: u64 },
    Done,
    Failed,
}

impl MigrationState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Paging { .. } => "paging",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }
}

/// Behavioral options of one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MigrationOptions {
    pub page_size: u32,
    pub create_helper_indexes: bool,
    pub overlap_rule: OverlapRule,
}

impl From<&MigrationConfig> for MigrationOptions {
    fn from(config: &MigrationConfig) -> Self {
        Self {
            page_size: config.page_size,
            create_helper_indexes: config.create_helper_indexes,
            overlap_rule: config.overlap_rule,
        }
    }
}

/// Counters of a finished run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationReport {
    pub run_id: Uuid,
    /// Non-empty pages loaded.
    pub pages: u64,
    /// Employees read from the source.
    pub employees: u64,
    pub inserted: u64,
    pub duplicates_skipped: u64,
    pub final_state: MigrationState,
}

impl MigrationReport {
    fn new(run_id: Uuid) -> Self {
        Self {
            run_id,
            pages: 0,
            employees: 0,
            inserted: 0,
            duplicates_skipped: 0,
            final_state: MigrationState::Init,
        }
    }
}

/// Page-by-page migration over injected source and sink implementations.
pub struct MigrationService<S: SourceRepository, K: DocumentSink> {
    source: S,
    sink: K,
    options: MigrationOptions,
}

impl<S: SourceRepository, K: DocumentSink> MigrationService<S, K> {
    pub fn new(source: S, sink: K, options: MigrationOptions) -> Self {
        Self {
            source,
            sink,
            options,
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn sink(&self) -> &K {
        &self.sink
    }

    /// Runs the migration to completion.
    ///
    /// Returns the run report on `Done`. On `Failed`, cleanup still runs and
    /// the first fatal error is returned.
    pub fn run(&self) -> MigrationResult<MigrationReport> {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now().timestamp_millis();
        let started = Instant::now();
        let mut report = MigrationReport::new(run_id);
        let mut helper_indexes = HelperIndexSet::default();

        info!(
            "event=migration_run module=migration status=start run_id={} page_size={} helper_indexes={} overlap_rule={}",
            run_id,
            self.options.page_size,
            self.options.create_helper_indexes,
            self.options.overlap_rule
        );

        let outcome = self.execute(&mut report, &mut helper_indexes);

        helper_indexes.drop_all(&self.source);
        report.final_state = if outcome.is_ok() {
            MigrationState::Done
        } else {
            MigrationState::Failed
        };
        log_transition(report.final_state);
        self.record_run(&report, started_at, outcome.as_ref().err());

        match outcome {
            Ok(()) => {
                info!(
                    "event=migration_run module=migration status=ok run_id={} pages={} employees={} inserted={} duplicates_skipped={} duration_ms={}",
                    run_id,
                    report.pages,
                    report.employees,
                    report.inserted,
                    report.duplicates_skipped,
                    started.elapsed().as_millis()
                );
                Ok(report)
            }
            Err(err) => {
                error!(
                    "event=migration_run module=migration status=error run_id={} pages={} inserted={} duration_ms={} error={}",
                    run_id,
                    report.pages,
                    report.inserted,
                    started.elapsed().as_millis(),
                    err
                );
                Err(err)
            }
        }
    }

    fn execute(
        &self,
        report: &mut MigrationReport,
        helper_indexes: &mut HelperIndexSet,
    ) -> MigrationResult<()> {
        log_transition(MigrationState::Init);
        ensure_unique_constraint(&self.sink).map_err(MigrationError::Sink)?;
        if self.options.create_helper_indexes {
            *helper_indexes = HelperIndexSet::create_all(&self.source);
        }
        let lookups = LookupContext::load(&self.source).map_err(MigrationError::Source)?;

        let mut page_index: u64 = 0;
        loop {
            log_transition(MigrationState::Paging { page_index });
            let page = self
                .source
                .fetch_employee_page(page_index, self.options.page_size)
                .map_err(MigrationError::Source)?;
            if page.is_empty() {
                debug!("event=page_fetch module=migration status=ok page={page_index} employees=0");
                return Ok(());
            }

            let documents = self.build_page(&page, &lookups)?;
            let outcome = self
                .sink
                .insert_many_unordered(&documents)
                .map_err(MigrationError::Sink)?;

            if let Some(first_duplicate) = outcome.duplicates.first() {
                warn!(
                    "event=sink_insert module=migration status=skip page={} duplicates={} first_duplicate={}",
                    page_index,
                    outcome.duplicates.len(),
                    first_duplicate
                );
            }
            info!(
                "event=page_load module=migration status=ok page={} employees={} inserted={} duplicates_skipped={}",
                page_index,
                page.len(),
                outcome.inserted,
                outcome.duplicates.len()
            );

            report.pages += 1;
            report.employees += page.len() as u64;
            report.inserted += outcome.inserted as u64;
            report.duplicates_skipped += outcome.duplicates.len() as u64;
            page_index += 1;
        }
    }

    fn build_page(
        &self,
        page: &[Employee],
        lookups: &LookupContext,
    ) -> MigrationResult<Vec<EmployeeDocument>> {
        let mut children =
            fetch_page_children(&self.source, page).map_err(MigrationError::Source)?;

        let mut documents = Vec::with_capacity(page.len());
        for employee in page {
            debug!(
                "event=employee_migrate module=migration status=start emp_no={}",
                employee.emp_no
            );
            let employee_children = children.remove(&employee.emp_no).unwrap_or_default();
            let resolved = resolve_children(employee_children, lookups, self.options.overlap_rule);
            documents.push(build_document(employee, resolved));
        }
        Ok(documents)
    }

    fn record_run(
        &self,
        report: &MigrationReport,
        started_at: i64,
        failure: Option<&MigrationError>,
    ) {
        let record = RunRecord {
            run_id: report.run_id,
            started_at,
            finished_at: Utc::now().timestamp_millis(),
            status: if failure.is_some() {
                RunStatus::Failed
            } else {
                RunStatus::Done
            },
            pages: report.pages,
            employees: report.employees,
            inserted: report.inserted,
            duplicates_skipped: report.duplicates_skipped,
            error: failure.map(ToString::to_string),
        };
        if let Err(err) = self.sink.record_run(&record) {
            warn!(
                "event=run_record module=migration status=error run_id={} error={}",
                report.run_id, err
            );
        }
    }
}

fn log_transition(state: MigrationState) {
    match state {
        MigrationState::Paging { page_index } => debug!(
            "event=state_transition module=migration state={} page={}",
            state.as_str(),
            page_index
        ),
        _ => info!(
            "event=state_transition module=migration state={}",
            state.as_str()
        ),
    }
}

/// Opens both stores from `config`, runs one migration and releases the
/// connections on every exit path.
pub fn run_migration(config: &MigrationConfig) -> MigrationResult<MigrationReport> {
    config.validate()?;

    let source_conn = open_source_db(&config.source_path, &config.source_schema)?;
    let sink_conn = match open_sink_db(&config.sink) {
        Ok(conn) => conn,
        Err(err) => {
            close_connection(source_conn, "source");
            return Err(err.into());
        }
    };

    let outcome = migrate_connections(&source_conn, &sink_conn, config);

    close_connection(source_conn, "source");
    close_connection(sink_conn, "sink");
    outcome
}

fn migrate_connections(
    source_conn: &Connection,
    sink_conn: &Connection,
    config: &MigrationConfig,
) -> MigrationResult<MigrationReport> {
    let source = SqliteSourceRepository::try_new(source_conn, &config.source_schema)
        .map_err(MigrationError::Source)?;
    let sink =
        SqliteDocumentSink::try_new(sink_conn, &config.collection).map_err(MigrationError::Sink)?;
    MigrationService::new(source, sink, MigrationOptions::from(config)).run()
}

fn close_connection(conn: Connection, role: &str) {
    match conn.close() {
        Ok(()) => info!("event=db_close module=db status=ok role={role}"),
        Err((_, err)) => warn!("event=db_close module=db status=error role={role} error={err}"),
    }
}
