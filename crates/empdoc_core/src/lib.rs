//! Core of the employee record-set migration.
//!
//! Reads the normalized `employees` schema page by page, folds every employee
//! and its time-varying child rows into one nested document, and bulk-loads
//! the documents into a duplicate-tolerant destination collection.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{ConfigError, MigrationConfig, DEFAULT_COLLECTION, DEFAULT_PAGE_SIZE};
pub use db::SinkLocation;
pub use logging::{default_log_level, init_logging, logging_status, LogTarget};
pub use model::document::{
    DepartmentEntry, EmployeeDocument, ManagerAtEntry, ManagerEntry, SalaryEntry, TitleEntry,
};
pub use model::employee::{sentinel_end_date, Employee, Gender, Tenure};
pub use repo::sink_repo::{DocumentSink, InsertOutcome, RunRecord, RunStatus, SqliteDocumentSink};
pub use repo::source_repo::{ChildRows, HelperIndex, SourceRepository, SqliteSourceRepository};
pub use repo::{RepoError, RepoResult};
pub use service::lookup::{LookupContext, OverlapRule};
pub use service::migration_service::{
    run_migration, MigrationError, MigrationOptions, MigrationReport, MigrationResult,
    MigrationService, MigrationState,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
