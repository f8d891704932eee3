//! Run configuration.
//!
//! # Responsibility
//! - Hold the connection and paging options supplied once at process start.
//! - Reject values that would make the run unsafe before any store is touched.
//!
//! # Invariants
//! - A validated config is never mutated during a run.

use crate::db::{validate_identifier, SinkLocation};
use crate::service::lookup::OverlapRule;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub const DEFAULT_PAGE_SIZE: u32 = 10_000;
pub const DEFAULT_COLLECTION: &str = "employees";
pub const DEFAULT_SOURCE_SCHEMA: &str = "main";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    ZeroPageSize,
    InvalidSchema(String),
    InvalidCollection(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ZeroPageSize => write!(f, "page size must be greater than zero"),
            Self::InvalidSchema(value) => write!(f, "invalid source schema name `{value}`"),
            Self::InvalidCollection(value) => {
                write!(f, "invalid destination collection name `{value}`")
            }
        }
    }
}

impl Error for ConfigError {}

/// Options for one migration run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationConfig {
    /// Existing SQLite file holding the `employees` schema.
    pub source_path: PathBuf,
    /// Schema qualifier for source tables.
    pub source_schema: String,
    pub sink: SinkLocation,
    pub collection: String,
    /// Employees per page. Must be non-zero.
    pub page_size: u32,
    pub create_helper_indexes: bool,
    pub overlap_rule: OverlapRule,
}

impl MigrationConfig {
    /// Creates a config with default paging, naming and index options.
    pub fn new(source_path: impl Into<PathBuf>, sink: SinkLocation) -> Self {
        Self {
            source_path: source_path.into(),
            source_schema: DEFAULT_SOURCE_SCHEMA.to_string(),
            sink,
            collection: DEFAULT_COLLECTION.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            create_helper_indexes: true,
            overlap_rule: OverlapRule::default(),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.page_size == 0 {
            return Err(ConfigError::ZeroPageSize);
        }
        if validate_identifier(&self.source_schema).is_err() {
            return Err(ConfigError::InvalidSchema(self.source_schema.clone()));
        }
        if validate_identifier(&self.collection).is_err() {
            return Err(ConfigError::InvalidCollection(self.collection.clone()));
        }
        Ok(())
    }
}
