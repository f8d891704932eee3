//! Migration use-case services.
//!
//! # Responsibility
//! - Build the read-once lookups and resolve relationships per page.
//! - Assemble documents and drive the page loop against repository traits.
//! - Manage index lifecycle around a run.
//!
//! # Invariants
//! - Services stay storage-agnostic; only `repo` knows about SQL.

pub mod builder;
pub mod indexes;
pub mod lookup;
pub mod migration_service;
pub mod resolver;
