//! Index lifecycle around a migration run.
//!
//! # Responsibility
//! - Ensure the destination uniqueness constraint before loading.
//! - Create transient source helper indexes and drop them afterwards.
//!
//! # Invariants
//! - Helper index create/drop failures are logged and never abort a run.
//! - Only helper indexes created by this run are dropped.

use crate::repo::sink_repo::DocumentSink;
use crate::repo::source_repo::{HelperIndex, SourceRepository};
use crate::repo::RepoResult;
use log::{error, info, warn};
use std::time::Instant;

/// Ensures the destination unique index on `emp_no`.
///
/// Failure here is fatal for the run.
pub fn ensure_unique_constraint<K: DocumentSink + ?Sized>(sink: &K) -> RepoResult<()> {
    let started_at = Instant::now();
    match sink.ensure_unique_index() {
        Ok(()) => {
            info!(
                "event=unique_index_ensure module=indexes status=ok duration_ms={}",
                started_at.elapsed().as_millis()
            );
            Ok(())
        }
        Err(err) => {
            error!(
                "event=unique_index_ensure module=indexes status=error duration_ms={} error={}",
                started_at.elapsed().as_millis(),
                err
            );
            Err(err)
        }
    }
}

/// Helper indexes created by the current run.
#[derive(Debug, Default)]
pub struct HelperIndexSet {
    created: Vec<HelperIndex>,
}

impl HelperIndexSet {
    /// Creates every helper index that does not exist yet, best-effort.
    pub fn create_all<S: SourceRepository + ?Sized>(source: &S) -> Self {
        let mut created = Vec::new();
        for index in HelperIndex::all() {
            let started_at = Instant::now();
            match source.create_helper_index(&index) {
                Ok(true) => {
                    info!(
                        "event=helper_index_create module=indexes status=ok index={} duration_ms={}",
                        index.name(),
                        started_at.elapsed().as_millis()
                    );
                    created.push(index);
                }
                Ok(false) => {
                    info!(
                        "event=helper_index_create module=indexes status=skip index={} reason=already_exists",
                        index.name()
                    );
                }
                Err(err) => {
                    warn!(
                        "event=helper_index_create module=indexes status=error index={} error={}",
                        index.name(),
                        err
                    );
                }
            }
        }
        Self { created }
    }

    pub fn created(&self) -> &[HelperIndex] {
        &self.created
    }

    /// Drops every index this set created, best-effort. Leaves the set empty.
    pub fn drop_all<S: SourceRepository + ?Sized>(&mut self, source: &S) {
        for index in self.created.drain(..) {
            match source.drop_helper_index(&index) {
                Ok(()) => info!(
                    "event=helper_index_drop module=indexes status=ok index={}",
                    index.name()
                ),
                Err(err) => warn!(
                    "event=helper_index_drop module=indexes status=error index={} error={}",
                    index.name(),
                    err
                ),
            }
        }
    }
}
