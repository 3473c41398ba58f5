use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

use crate::app::ports::{ChangelogPort, CleansedStorePort, DiagnosticSink, RawStorePort, SnapshotExportPort};
use crate::constants::{AGGREGATED_TABLE, INCOMPLETE_TABLE};
use crate::domain::{AggregatedRecord, CareerPath, ColumnSpec, IncompleteRecord, RawStudent, StudentJob};
use crate::error::{EtlError, Result};
use crate::pipeline::changelog::{ChangelogEntry, ChangelogVersion};

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>> {
    mutex.lock().map_err(|_| EtlError::Store {
        message: "in-memory store lock poisoned".to_string(),
    })
}

/// Rejects the batch if any uuid is already stored or repeats within it,
/// matching the primary key of the SQLite tables.
fn check_unique_uuids<'a, I>(table: &str, mut seen: HashSet<String>, batch: I) -> Result<()>
where
    I: IntoIterator<Item = &'a String>,
{
    for uuid in batch {
        if !seen.insert(uuid.clone()) {
            return Err(EtlError::Store {
                message: format!("duplicate uuid {} in {}", uuid, table),
            });
        }
    }
    Ok(())
}

/// In-memory raw tables for development/testing
#[derive(Debug, Clone, Default)]
pub struct InMemoryRawStore {
    pub students: Vec<RawStudent>,
    pub career_paths: Vec<CareerPath>,
    pub student_jobs: Vec<StudentJob>,
}

impl RawStorePort for InMemoryRawStore {
    fn load_students(&self) -> Result<Vec<RawStudent>> {
        Ok(self.students.clone())
    }

    fn load_career_paths(&self) -> Result<Vec<CareerPath>> {
        Ok(self.career_paths.clone())
    }

    fn load_student_jobs(&self) -> Result<Vec<StudentJob>> {
        Ok(self.student_jobs.clone())
    }
}

/// In-memory cleansed store. Clones share the same tables, so a test can
/// keep a handle while the run owns another.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCleansedStore {
    aggregated: Arc<Mutex<Option<Vec<AggregatedRecord>>>>,
    incomplete: Arc<Mutex<Vec<IncompleteRecord>>>,
    schema_override: Arc<Mutex<Option<Vec<ColumnSpec>>>>,
    unreadable: Arc<Mutex<bool>>,
}

impl InMemoryCleansedStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulates a corrupt store: aggregate reads fail until cleared
    pub fn set_unreadable(&self, unreadable: bool) -> Result<()> {
        *lock(&self.unreadable)? = unreadable;
        Ok(())
    }

    /// Pretends the stored aggregate table was created with another layout
    pub fn set_schema(&self, schema: Vec<ColumnSpec>) -> Result<()> {
        *lock(&self.schema_override)? = Some(schema);
        Ok(())
    }

    pub fn aggregated(&self) -> Result<Vec<AggregatedRecord>> {
        Ok(lock(&self.aggregated)?.clone().unwrap_or_default())
    }

    pub fn incomplete(&self) -> Result<Vec<IncompleteRecord>> {
        Ok(lock(&self.incomplete)?.clone())
    }

    fn check_readable(&self) -> Result<()> {
        if *lock(&self.unreadable)? {
            return Err(EtlError::Store {
                message: "aggregate table is unreadable".to_string(),
            });
        }
        Ok(())
    }
}

impl CleansedStorePort for InMemoryCleansedStore {
    fn aggregated_uuids(&self) -> Result<Option<HashSet<String>>> {
        self.check_readable()?;
        Ok(lock(&self.aggregated)?
            .as_ref()
            .map(|rows| rows.iter().map(|r| r.uuid.clone()).collect()))
    }

    fn incomplete_uuids(&self) -> Result<HashSet<String>> {
        Ok(lock(&self.incomplete)?.iter().map(|r| r.uuid.clone()).collect())
    }

    fn aggregated_schema(&self) -> Result<Option<Vec<ColumnSpec>>> {
        self.check_readable()?;
        if let Some(schema) = lock(&self.schema_override)?.clone() {
            return Ok(Some(schema));
        }
        Ok(lock(&self.aggregated)?
            .as_ref()
            .map(|_| AggregatedRecord::schema()))
    }

    fn append_incomplete(&self, rows: &[IncompleteRecord]) -> Result<usize> {
        let mut incomplete = lock(&self.incomplete)?;
        let stored = incomplete.iter().map(|r| r.uuid.clone()).collect();
        check_unique_uuids(INCOMPLETE_TABLE, stored, rows.iter().map(|r| &r.uuid))?;
        incomplete.extend_from_slice(rows);
        debug!("Appended {} incomplete rows", rows.len());
        Ok(rows.len())
    }

    fn append_aggregated(&self, rows: &[AggregatedRecord]) -> Result<usize> {
        let mut aggregated = lock(&self.aggregated)?;
        let stored = aggregated
            .iter()
            .flatten()
            .map(|r| r.uuid.clone())
            .collect();
        check_unique_uuids(AGGREGATED_TABLE, stored, rows.iter().map(|r| &r.uuid))?;
        aggregated.get_or_insert_with(Vec::new).extend_from_slice(rows);
        debug!("Appended {} aggregated rows", rows.len());
        Ok(rows.len())
    }

    fn load_aggregated(&self) -> Result<Vec<AggregatedRecord>> {
        self.check_readable()?;
        self.aggregated()
    }
}

/// In-memory changelog, newest entry first
#[derive(Debug, Clone, Default)]
pub struct InMemoryChangelog {
    entries: Arc<Mutex<Vec<ChangelogEntry>>>,
    unreadable: Arc<Mutex<bool>>,
}

impl InMemoryChangelog {
    pub fn entries(&self) -> Result<Vec<ChangelogEntry>> {
        Ok(lock(&self.entries)?.clone())
    }

    /// Simulates a corrupt version record: version reads fail until cleared
    pub fn set_unreadable(&self, unreadable: bool) -> Result<()> {
        *lock(&self.unreadable)? = unreadable;
        Ok(())
    }
}

impl ChangelogPort for InMemoryChangelog {
    fn latest_version(&self) -> Result<Option<ChangelogVersion>> {
        if *lock(&self.unreadable)? {
            return Err(EtlError::Changelog("version record is unreadable".to_string()));
        }
        Ok(lock(&self.entries)?.first().map(|e| e.version))
    }

    fn prepend(&self, entry: &ChangelogEntry) -> Result<()> {
        lock(&self.entries)?.insert(0, entry.clone());
        Ok(())
    }
}

/// Keeps the row count of every exported snapshot
#[derive(Debug, Clone, Default)]
pub struct InMemoryExporter {
    snapshots: Arc<Mutex<Vec<usize>>>,
}

impl InMemoryExporter {
    pub fn snapshot_sizes(&self) -> Result<Vec<usize>> {
        Ok(lock(&self.snapshots)?.clone())
    }
}

impl SnapshotExportPort for InMemoryExporter {
    fn export(&self, rows: &[AggregatedRecord]) -> Result<()> {
        lock(&self.snapshots)?.push(rows.len());
        Ok(())
    }
}

/// Diagnostic sink that keeps every message, for assertions
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    messages: Arc<Mutex<Vec<String>>>,
    exceptions: Arc<Mutex<Vec<String>>>,
}

impl MemorySink {
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().map(|m| m.clone()).unwrap_or_default()
    }

    pub fn exceptions(&self) -> Vec<String> {
        self.exceptions.lock().map(|m| m.clone()).unwrap_or_default()
    }
}

impl DiagnosticSink for MemorySink {
    fn info(&self, message: &str) {
        if let Ok(mut messages) = self.messages.lock() {
            messages.push(message.to_string());
        }
    }

    fn warn(&self, message: &str) {
        self.info(message);
    }

    fn exception(&self, context: &str, err: &dyn std::error::Error) {
        if let Ok(mut exceptions) = self.exceptions.lock() {
            exceptions.push(format!("{}: {}", context, err));
        }
    }
}
