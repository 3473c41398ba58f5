//! Row shapes shared across the pipeline stages and the stores.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A student row as read from the raw store. Every cell is schema-on-read
/// text; the normalizer owns coercion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawStudent {
    pub uuid: String,
    pub name: Option<String>,
    pub dob: Option<String>,
    pub sex: Option<String>,
    pub contact_info: Option<String>,
    pub job_id: Option<String>,
    pub num_course_taken: Option<String>,
    pub current_career_path_id: Option<String>,
    pub time_spent_hrs: Option<String>,
}

impl RawStudent {
    /// Convenience constructor with every optional cell empty
    pub fn new(uuid: impl Into<String>) -> Self {
        Self {
            uuid: uuid.into(),
            name: None,
            dob: None,
            sex: None,
            contact_info: None,
            job_id: None,
            num_course_taken: None,
            current_career_path_id: None,
            time_spent_hrs: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CareerPath {
    pub career_path_id: i64,
    pub career_path_name: Option<String>,
    pub hours_to_complete: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StudentJob {
    pub job_id: i64,
    pub job_category: Option<String>,
    pub avg_salary: Option<i64>,
}

/// A student that passed the completeness checks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleanStudent {
    pub uuid: String,
    pub name: Option<String>,
    pub dob: Option<String>,
    pub sex: Option<String>,
    pub job_id: i64,
    pub num_course_taken: f64,
    pub current_career_path_id: i64,
    pub time_spent_hrs: f64,
    pub age: Option<i64>,
    pub age_group: Option<i64>,
    pub email: String,
    pub street: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
}

/// A quarantined student. Normalized fields stay nullable so the record
/// shows exactly what was missing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncompleteRecord {
    pub uuid: String,
    pub name: Option<String>,
    pub dob: Option<String>,
    pub sex: Option<String>,
    pub job_id: Option<i64>,
    pub num_course_taken: Option<f64>,
    pub current_career_path_id: Option<i64>,
    pub time_spent_hrs: Option<f64>,
    pub age: Option<i64>,
    pub age_group: Option<i64>,
    pub email: String,
    pub street: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    /// Comma separated names of the failed completeness checks
    pub missing_fields: String,
}

/// One row of the aggregated table: a clean student joined with its career
/// path and job. Join columns are nullable because the joins are left joins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedRecord {
    pub uuid: String,
    pub name: Option<String>,
    pub dob: Option<String>,
    pub sex: Option<String>,
    pub job_id: i64,
    pub num_course_taken: f64,
    pub current_career_path_id: i64,
    pub time_spent_hrs: f64,
    pub age: Option<i64>,
    pub age_group: Option<i64>,
    pub email: String,
    pub street: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub career_path_id: Option<i64>,
    pub career_path_name: Option<String>,
    pub hours_to_complete: Option<i64>,
    pub job_category: Option<String>,
    pub avg_salary: Option<i64>,
}

/// Column layout of the aggregated table, in insert order.
pub const AGGREGATED_COLUMNS: &[(&str, &str)] = &[
    ("uuid", "TEXT"),
    ("name", "TEXT"),
    ("dob", "TEXT"),
    ("sex", "TEXT"),
    ("job_id", "INTEGER"),
    ("num_course_taken", "REAL"),
    ("current_career_path_id", "INTEGER"),
    ("time_spent_hrs", "REAL"),
    ("age", "INTEGER"),
    ("age_group", "INTEGER"),
    ("email", "TEXT"),
    ("street", "TEXT"),
    ("city", "TEXT"),
    ("state", "TEXT"),
    ("zip_code", "TEXT"),
    ("career_path_id", "INTEGER"),
    ("career_path_name", "TEXT"),
    ("hours_to_complete", "INTEGER"),
    ("job_category", "TEXT"),
    ("avg_salary", "INTEGER"),
];

/// Column layout of the quarantine table, in insert order.
pub const INCOMPLETE_COLUMNS: &[(&str, &str)] = &[
    ("uuid", "TEXT"),
    ("name", "TEXT"),
    ("dob", "TEXT"),
    ("sex", "TEXT"),
    ("job_id", "INTEGER"),
    ("num_course_taken", "REAL"),
    ("current_career_path_id", "INTEGER"),
    ("time_spent_hrs", "REAL"),
    ("age", "INTEGER"),
    ("age_group", "INTEGER"),
    ("email", "TEXT"),
    ("street", "TEXT"),
    ("city", "TEXT"),
    ("state", "TEXT"),
    ("zip_code", "TEXT"),
    ("missing_fields", "TEXT"),
];

impl AggregatedRecord {
    pub fn from_parts(
        student: &CleanStudent,
        career_path: Option<&CareerPath>,
        job: Option<&StudentJob>,
    ) -> Self {
        Self {
            uuid: student.uuid.clone(),
            name: student.name.clone(),
            dob: student.dob.clone(),
            sex: student.sex.clone(),
            job_id: student.job_id,
            num_course_taken: student.num_course_taken,
            current_career_path_id: student.current_career_path_id,
            time_spent_hrs: student.time_spent_hrs,
            age: student.age,
            age_group: student.age_group,
            email: student.email.clone(),
            street: student.street.clone(),
            city: student.city.clone(),
            state: student.state.clone(),
            zip_code: student.zip_code.clone(),
            career_path_id: career_path.map(|c| c.career_path_id),
            career_path_name: career_path.and_then(|c| c.career_path_name.clone()),
            hours_to_complete: career_path.and_then(|c| c.hours_to_complete),
            job_category: job.and_then(|j| j.job_category.clone()),
            avg_salary: job.and_then(|j| j.avg_salary),
        }
    }

    /// Names of the columns holding a null in this row
    pub fn null_columns(&self) -> Vec<&'static str> {
        let checks: [(&'static str, bool); 10] = [
            ("name", self.name.is_none()),
            ("dob", self.dob.is_none()),
            ("sex", self.sex.is_none()),
            ("age", self.age.is_none()),
            ("age_group", self.age_group.is_none()),
            ("career_path_id", self.career_path_id.is_none()),
            ("career_path_name", self.career_path_name.is_none()),
            ("hours_to_complete", self.hours_to_complete.is_none()),
            ("job_category", self.job_category.is_none()),
            ("avg_salary", self.avg_salary.is_none()),
        ];
        let mut columns: Vec<&'static str> = checks
            .iter()
            .filter(|(_, is_null)| *is_null)
            .map(|(name, _)| *name)
            .collect();
        if self.num_course_taken.is_nan() {
            columns.push("num_course_taken");
        }
        if self.time_spent_hrs.is_nan() {
            columns.push("time_spent_hrs");
        }
        columns
    }

    pub fn has_nulls(&self) -> bool {
        !self.null_columns().is_empty()
    }

    /// Static schema of every batch this crate produces
    pub fn schema() -> Vec<ColumnSpec> {
        AGGREGATED_COLUMNS
            .iter()
            .map(|(name, declared)| ColumnSpec::new(*name, ColumnType::from_declared(declared)))
            .collect()
    }
}

/// SQLite storage class of a column, derived from its declared type with the
/// usual affinity rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnType {
    Integer,
    Real,
    Text,
    Other(String),
}

impl ColumnType {
    pub fn from_declared(declared: &str) -> Self {
        let upper = declared.trim().to_uppercase();
        if upper.contains("INT") {
            ColumnType::Integer
        } else if upper.contains("CHAR") || upper.contains("CLOB") || upper.contains("TEXT") {
            ColumnType::Text
        } else if upper.contains("REAL") || upper.contains("FLOA") || upper.contains("DOUB") {
            ColumnType::Real
        } else {
            ColumnType::Other(upper)
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnType::Integer => write!(f, "INTEGER"),
            ColumnType::Real => write!(f, "REAL"),
            ColumnType::Text => write!(f, "TEXT"),
            ColumnType::Other(declared) => write!(f, "{}", declared),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSpec {
    pub name: String,
    pub column_type: ColumnType,
}

impl ColumnSpec {
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
        }
    }
}
