//! Run metrics for the student ETL job
//!
//! Metrics go through the `metrics` facade. Without an installed recorder
//! every call is a no-op, so the pipeline can always record.

use std::fmt;

/// Enum representing all metric names used in the system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricName {
    // Run lifecycle
    RunsStarted,
    RunsCompleted,
    RunsNoop,
    RunsFailed,

    // Row flow
    StudentsNew,
    RowsAggregated,
    RowsQuarantined,
    ParseWarnings,

    // Integrity checks
    ValidationFailures,
}

impl MetricName {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricName::RunsStarted => "student_etl_runs_started_total",
            MetricName::RunsCompleted => "student_etl_runs_completed_total",
            MetricName::RunsNoop => "student_etl_runs_noop_total",
            MetricName::RunsFailed => "student_etl_runs_failed_total",
            MetricName::StudentsNew => "student_etl_students_new_total",
            MetricName::RowsAggregated => "student_etl_rows_aggregated_total",
            MetricName::RowsQuarantined => "student_etl_rows_quarantined_total",
            MetricName::ParseWarnings => "student_etl_parse_warnings_total",
            MetricName::ValidationFailures => "student_etl_validation_failures_total",
        }
    }
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

pub mod run {
    use super::MetricName;

    pub fn started() {
        ::metrics::counter!(MetricName::RunsStarted.as_str()).increment(1);
    }

    pub fn completed() {
        ::metrics::counter!(MetricName::RunsCompleted.as_str()).increment(1);
    }

    /// A run that found no new students
    pub fn noop() {
        ::metrics::counter!(MetricName::RunsNoop.as_str()).increment(1);
    }

    pub fn failed() {
        ::metrics::counter!(MetricName::RunsFailed.as_str()).increment(1);
    }
}

pub mod rows {
    use super::MetricName;

    pub fn new_students(count: usize) {
        ::metrics::counter!(MetricName::StudentsNew.as_str()).increment(count as u64);
    }

    pub fn aggregated(count: usize) {
        ::metrics::counter!(MetricName::RowsAggregated.as_str()).increment(count as u64);
    }

    pub fn quarantined(count: usize) {
        ::metrics::counter!(MetricName::RowsQuarantined.as_str()).increment(count as u64);
    }

    pub fn parse_warnings(count: usize) {
        ::metrics::counter!(MetricName::ParseWarnings.as_str()).increment(count as u64);
    }
}

pub mod integrity {
    use super::MetricName;

    /// Record a failed pre-commit check
    pub fn validation_failed(check: &'static str) {
        ::metrics::counter!(MetricName::ValidationFailures.as_str(), "check" => check).increment(1);
    }
}
