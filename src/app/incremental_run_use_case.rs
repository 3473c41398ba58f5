use std::collections::HashSet;
use std::fmt;
use tracing::{debug, info_span};
use uuid::Uuid;

use crate::app::ports::{ChangelogPort, CleansedStorePort, DiagnosticSink, RawStorePort, SnapshotExportPort};
use crate::domain::{AggregatedRecord, IncompleteRecord};
use crate::error::Result;
use crate::observability::metrics;
use crate::pipeline::changelog::{ChangelogEntry, ChangelogVersion};
use crate::pipeline::processing::normalize::RecordNormalizer;
use crate::pipeline::processing::{integrity, merge, novelty};

/// Stages of one run, in the order they execute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Init,
    LoadRaw,
    LoadStore,
    FilterNew,
    Normalize,
    QuarantineUpsert,
    ValidateKeys,
    Merge,
    ValidateSchemaAndNulls,
    CommitAggregate,
    WriteChangelog,
    Done,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// What a finished run did
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub run_id: Uuid,
    pub final_state: RunState,
    pub new_students: usize,
    pub rows_added: usize,
    pub rows_quarantined: usize,
    /// Changelog version written by this run, if any
    pub version: Option<ChangelogVersion>,
}

impl RunReport {
    fn new(run_id: Uuid) -> Self {
        Self {
            run_id,
            final_state: RunState::Init,
            new_students: 0,
            rows_added: 0,
            rows_quarantined: 0,
            version: None,
        }
    }

    /// True when the run found nothing new to aggregate
    pub fn is_noop(&self) -> bool {
        self.rows_added == 0
    }
}

/// Use case for one incremental clean-and-merge run over the raw store
pub struct IncrementalRunUseCase {
    raw_store: Box<dyn RawStorePort>,
    cleansed_store: Box<dyn CleansedStorePort>,
    changelog: Box<dyn ChangelogPort>,
    exporter: Box<dyn SnapshotExportPort>,
    normalizer: Box<dyn RecordNormalizer>,
    sink: Box<dyn DiagnosticSink>,
}

impl IncrementalRunUseCase {
    pub fn new(
        raw_store: Box<dyn RawStorePort>,
        cleansed_store: Box<dyn CleansedStorePort>,
        changelog: Box<dyn ChangelogPort>,
        exporter: Box<dyn SnapshotExportPort>,
        normalizer: Box<dyn RecordNormalizer>,
        sink: Box<dyn DiagnosticSink>,
    ) -> Self {
        Self {
            raw_store,
            cleansed_store,
            changelog,
            exporter,
            normalizer,
            sink,
        }
    }

    fn enter(&self, report: &mut RunReport, state: RunState) {
        report.final_state = state;
        debug!(run_id = %report.run_id, state = %state, "Entering state");
    }

    /// Runs the pipeline and swallows any failure after logging it. This is
    /// the top-level entry point for scheduled runs.
    pub fn run_and_log(&self) -> Option<RunReport> {
        match self.run() {
            Ok(report) => Some(report),
            Err(e) => {
                metrics::run::failed();
                self.sink.exception("Error in incremental run", &e);
                None
            }
        }
    }

    pub fn run(&self) -> Result<RunReport> {
        let mut report = RunReport::new(Uuid::new_v4());
        let span = info_span!("incremental_run", run_id = %report.run_id);
        let _enter = span.enter();

        metrics::run::started();
        self.sink.info("Start Log");

        self.enter(&mut report, RunState::LoadRaw);
        let students = self.raw_store.load_students()?;
        let career_paths = self.raw_store.load_career_paths()?;
        let student_jobs = self.raw_store.load_student_jobs()?;
        self.sink.info(&format!(
            "Loaded raw tables: {} students, {} career paths, {} student jobs",
            students.len(),
            career_paths.len(),
            student_jobs.len()
        ));

        self.enter(&mut report, RunState::LoadStore);
        let existing_uuids = match self.cleansed_store.aggregated_uuids() {
            Ok(Some(uuids)) => Some(uuids),
            Ok(None) => {
                self.sink.info("No cleansed aggregate yet, processing every raw student");
                None
            }
            Err(e) => {
                self.sink.exception("Error accessing cleansed database", &e);
                None
            }
        };
        // Read before any write so a bad version record cannot strand committed rows
        let latest_version = self.changelog.latest_version()?;
        let stored_incomplete = match self.cleansed_store.incomplete_uuids() {
            Ok(uuids) => uuids,
            Err(e) => {
                self.sink.exception("Error comparing missing data", &e);
                HashSet::new()
            }
        };

        self.enter(&mut report, RunState::FilterNew);
        let new_students = novelty::select_new(&students, existing_uuids.as_ref());
        report.new_students = new_students.len();
        metrics::rows::new_students(new_students.len());
        self.sink.info(&format!("{} new students", new_students.len()));

        self.enter(&mut report, RunState::Normalize);
        let partition = self.normalizer.normalize_students(&new_students);
        for (uuid, note) in &partition.warnings {
            self.sink.warn(&format!("Student {}: {}", uuid, note));
        }
        metrics::rows::parse_warnings(partition.warnings.len());

        self.enter(&mut report, RunState::QuarantineUpsert);
        let new_incomplete = unseen_incomplete(partition.quarantined, stored_incomplete);
        if !new_incomplete.is_empty() {
            report.rows_quarantined = self.cleansed_store.append_incomplete(&new_incomplete)?;
            metrics::rows::quarantined(report.rows_quarantined);
            self.sink.info(&format!(
                "Quarantined {} incomplete students",
                report.rows_quarantined
            ));
        }

        let cleaned = partition.cleaned;
        if cleaned.is_empty() {
            self.sink.info("No new data");
            metrics::run::noop();
            self.enter(&mut report, RunState::Done);
            self.sink.info("End Log");
            return Ok(report);
        }

        let clean_paths = self.normalizer.clean_career_paths(&career_paths);
        let clean_jobs = self.normalizer.clean_student_jobs(&student_jobs);

        self.enter(&mut report, RunState::ValidateKeys);
        integrity::check_job_ids(&cleaned, &clean_jobs, &*self.sink)?;
        integrity::check_career_path_ids(&cleaned, &clean_paths, &*self.sink)?;

        self.enter(&mut report, RunState::Merge);
        let aggregated = merge::merge(&cleaned, &clean_paths, &clean_jobs);

        self.enter(&mut report, RunState::ValidateSchemaAndNulls);
        if existing_uuids.is_some() {
            if let Some(stored_schema) = self.cleansed_store.aggregated_schema()? {
                integrity::check_schema(&AggregatedRecord::schema(), &stored_schema, &*self.sink)?;
            }
        }
        integrity::check_no_nulls(&aggregated, &*self.sink)?;

        self.enter(&mut report, RunState::CommitAggregate);
        report.rows_added = self.cleansed_store.append_aggregated(&aggregated)?;
        metrics::rows::aggregated(report.rows_added);
        self.sink.info(&format!("Committed {} aggregated rows", report.rows_added));
        self.export_snapshot();

        self.enter(&mut report, RunState::WriteChangelog);
        let version = ChangelogVersion::following(latest_version);
        self.changelog.prepend(&ChangelogEntry {
            version,
            rows_added: report.rows_added,
            rows_quarantined: report.rows_quarantined,
        })?;
        report.version = Some(version);
        self.sink.info(&format!("Changelog updated to {}", version));

        self.enter(&mut report, RunState::Done);
        metrics::run::completed();
        self.sink.info("End Log");
        Ok(report)
    }

    /// The snapshot always reflects the full table. A failed export leaves
    /// the committed rows in place and is repaired by the next commit.
    fn export_snapshot(&self) {
        let result = self
            .cleansed_store
            .load_aggregated()
            .and_then(|rows| self.exporter.export(&rows).map(|_| rows.len()));
        match result {
            Ok(count) => self.sink.info(&format!("Exported snapshot of {} rows", count)),
            Err(e) => self.sink.exception("Error exporting aggregate snapshot", &e),
        }
    }
}

/// Quarantined rows not stored yet, first occurrence per uuid
fn unseen_incomplete(rows: Vec<IncompleteRecord>, mut seen: HashSet<String>) -> Vec<IncompleteRecord> {
    rows.into_iter()
        .filter(|row| seen.insert(row.uuid.clone()))
        .collect()
}
