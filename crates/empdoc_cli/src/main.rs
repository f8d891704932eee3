//! `empdoc` migration entry point.
//!
//! # Responsibility
//! - Parse run configuration from flags and environment.
//! - Start logging, run one migration, print a deterministic summary.

use clap::{ArgAction, Parser};
use empdoc_core::{
    default_log_level, init_logging, run_migration, MigrationConfig, OverlapRule, SinkLocation,
    DEFAULT_COLLECTION, DEFAULT_PAGE_SIZE,
};
use log::error;
use std::path::PathBuf;
use std::process::ExitCode;

/// Migrate the relational employees schema into denormalized documents.
#[derive(Debug, Parser)]
#[command(name = "empdoc", version)]
struct Cli {
    /// Existing SQLite database holding the employees schema.
    #[arg(long, env = "EMPDOC_SOURCE")]
    source: PathBuf,

    /// Schema name the source tables are read under. `main` opens the file
    /// directly; any other name attaches it under that name.
    #[arg(long, default_value = "main")]
    source_schema: String,

    /// Destination URL: `sqlite://<path>`, a bare path or `:memory:`.
    #[arg(long, env = "EMPDOC_SINK", value_parser = parse_sink)]
    sink: SinkLocation,

    /// Destination collection name.
    #[arg(long, default_value = DEFAULT_COLLECTION)]
    collection: String,

    /// Employees per page.
    #[arg(long, default_value_t = DEFAULT_PAGE_SIZE, value_parser = clap::value_parser!(u32).range(1..))]
    page_size: u32,

    /// Skip creating transient `emp_no` indexes on the source.
    #[arg(long = "no-helper-indexes", action = ArgAction::SetFalse)]
    helper_indexes: bool,

    /// Manager overlap predicate: `observed` or `intersection`.
    #[arg(long, default_value = "observed")]
    manager_overlap: OverlapRule,

    /// Log level (trace|debug|info|warn|error). Defaults by build mode.
    #[arg(long)]
    log_level: Option<String>,

    /// Absolute directory for rolling log files. Logs go to stderr when unset.
    #[arg(long)]
    log_dir: Option<String>,
}

impl Cli {
    fn to_config(&self) -> MigrationConfig {
        let mut config = MigrationConfig::new(self.source.clone(), self.sink.clone());
        config.source_schema = self.source_schema.clone();
        config.collection = self.collection.clone();
        config.page_size = self.page_size;
        config.create_helper_indexes = self.helper_indexes;
        config.overlap_rule = self.manager_overlap;
        config
    }
}

fn parse_sink(value: &str) -> Result<SinkLocation, String> {
    SinkLocation::parse(value).ok_or_else(|| "destination URL cannot be empty".to_string())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = cli.log_level.as_deref().unwrap_or(default_log_level());
    if let Err(message) = init_logging(level, cli.log_dir.as_deref()) {
        eprintln!("empdoc: {message}");
        return ExitCode::FAILURE;
    }

    let config = cli.to_config();
    match run_migration(&config) {
        Ok(report) => {
            println!("empdoc: data migration completed");
            println!("empdoc run_id={}", report.run_id);
            println!("empdoc pages={}", report.pages);
            println!("empdoc employees={}", report.employees);
            println!("empdoc inserted={}", report.inserted);
            println!("empdoc duplicates_skipped={}", report.duplicates_skipped);
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!("event=cli_exit module=cli status=error error={err}");
            eprintln!("empdoc: migration failed: {err}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Cli;
    use clap::{CommandFactory, Parser};
    use empdoc_core::{OverlapRule, SinkLocation};
    use std::path::PathBuf;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn defaults_produce_documented_config() {
        let cli = Cli::try_parse_from([
            "empdoc",
            "--source",
            "/data/employees.db",
            "--sink",
            "sqlite:///data/documents.db",
        ])
        .unwrap();
        let config = cli.to_config();

        assert_eq!(config.source_path, PathBuf::from("/data/employees.db"));
        assert_eq!(
            config.sink,
            SinkLocation::File(PathBuf::from("/data/documents.db"))
        );
        assert_eq!(config.page_size, 10_000);
        assert_eq!(config.collection, "employees");
        assert!(config.create_helper_indexes);
        assert_eq!(config.overlap_rule, OverlapRule::Observed);
    }

    #[test]
    fn flags_override_defaults() {
        let cli = Cli::try_parse_from([
            "empdoc",
            "--source",
            "employees.db",
            "--sink",
            ":memory:",
            "--page-size",
            "500",
            "--collection",
            "staff",
            "--no-helper-indexes",
            "--manager-overlap",
            "intersection",
            "--source-schema",
            "hr",
        ])
        .unwrap();
        let config = cli.to_config();

        assert_eq!(config.sink, SinkLocation::InMemory);
        assert_eq!(config.source_schema, "hr");
        assert_eq!(config.page_size, 500);
        assert_eq!(config.collection, "staff");
        assert!(!config.create_helper_indexes);
        assert_eq!(config.overlap_rule, OverlapRule::Intersection);
    }

    #[test]
    fn zero_page_size_is_rejected_at_parse_time() {
        let result = Cli::try_parse_from([
            "empdoc",
            "--source",
            "employees.db",
            "--sink",
            ":memory:",
            "--page-size",
            "0",
        ]);
        assert!(result.is_err());
    }
}
