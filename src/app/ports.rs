use std::collections::HashSet;

use crate::domain::{AggregatedRecord, CareerPath, ColumnSpec, IncompleteRecord, RawStudent, StudentJob};
use crate::error::Result;
use crate::pipeline::changelog::{ChangelogEntry, ChangelogVersion};

/// Where pipeline diagnostics go. Passed in so the core stays free of
/// global logger state.
pub trait DiagnosticSink {
    fn info(&self, message: &str);
    fn warn(&self, message: &str);
    fn exception(&self, context: &str, error: &dyn std::error::Error);
}

/// Source-of-truth tables, read in full each run
pub trait RawStorePort {
    fn load_students(&self) -> Result<Vec<RawStudent>>;
    fn load_career_paths(&self) -> Result<Vec<CareerPath>>;
    fn load_student_jobs(&self) -> Result<Vec<StudentJob>>;
}

/// Durable output tables: the aggregate and the quarantine
pub trait CleansedStorePort {
    /// `None` when no aggregate table exists yet
    fn aggregated_uuids(&self) -> Result<Option<HashSet<String>>>;
    fn incomplete_uuids(&self) -> Result<HashSet<String>>;
    /// Declared columns of the existing aggregate table, `None` when absent
    fn aggregated_schema(&self) -> Result<Option<Vec<ColumnSpec>>>;
    /// Appends all rows or none. Returns the number written.
    fn append_incomplete(&self, rows: &[IncompleteRecord]) -> Result<usize>;
    /// Appends all rows or none. Returns the number written.
    fn append_aggregated(&self, rows: &[AggregatedRecord]) -> Result<usize>;
    fn load_aggregated(&self) -> Result<Vec<AggregatedRecord>>;
}

pub trait ChangelogPort {
    fn latest_version(&self) -> Result<Option<ChangelogVersion>>;
    fn prepend(&self, entry: &ChangelogEntry) -> Result<()>;
}

/// Full-table snapshot written after each commit
pub trait SnapshotExportPort {
    fn export(&self, rows: &[AggregatedRecord]) -> Result<()>;
}
