//! Repository layer for the relational source and the document sink.
//!
//! # Responsibility
//! - Define the data access contracts the migration services depend on.
//! - Isolate SQLite query details from orchestration.
//!
//! # Invariants
//! - Source repositories only read rows; the single exception is helper-index DDL.
//! - Sink repositories only append documents; they never update or delete them.
//! - Both contracts are traits so services can run against injected fakes.

pub mod error;
pub mod sink_repo;
pub mod source_repo;

pub use error::{RepoError, RepoResult};
