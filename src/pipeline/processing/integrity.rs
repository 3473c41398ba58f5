//! Pre-commit checks. Each returns `Ok(())` or the typed violation and
//! reports the outcome through the diagnostic sink.

use std::collections::{BTreeSet, HashSet};

use crate::app::ports::DiagnosticSink;
use crate::constants::{CAREER_PATHS_LABEL, STUDENT_JOBS_LABEL};
use crate::domain::{AggregatedRecord, CareerPath, CleanStudent, ColumnSpec, StudentJob};
use crate::error::ValidationError;
use crate::observability::metrics;

type CheckResult = std::result::Result<(), ValidationError>;

fn missing_ids<I, J>(referenced: I, available: J) -> Vec<i64>
where
    I: IntoIterator<Item = i64>,
    J: IntoIterator<Item = i64>,
{
    let available: HashSet<i64> = available.into_iter().collect();
    referenced
        .into_iter()
        .filter(|id| !available.contains(id))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

fn report(sink: &dyn DiagnosticSink, check: &'static str, result: CheckResult, ok_message: &str) -> CheckResult {
    match &result {
        Ok(()) => sink.info(ok_message),
        Err(violation) => {
            metrics::integrity::validation_failed(check);
            sink.exception(check, violation);
        }
    }
    result
}

/// Every student `job_id` must exist in the cleaned job table
pub fn check_job_ids(students: &[CleanStudent], jobs: &[StudentJob], sink: &dyn DiagnosticSink) -> CheckResult {
    let ids = missing_ids(students.iter().map(|s| s.job_id), jobs.iter().map(|j| j.job_id));
    let result = if ids.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::MissingForeignKeys {
            table: STUDENT_JOBS_LABEL,
            column: "job_id",
            ids,
        })
    };
    report(sink, "job_id coverage", result, "All job_ids are present.")
}

/// Every student `current_career_path_id` must exist in the cleaned career paths
pub fn check_career_path_ids(
    students: &[CleanStudent],
    career_paths: &[CareerPath],
    sink: &dyn DiagnosticSink,
) -> CheckResult {
    let ids = missing_ids(
        students.iter().map(|s| s.current_career_path_id),
        career_paths.iter().map(|c| c.career_path_id),
    );
    let result = if ids.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::MissingForeignKeys {
            table: CAREER_PATHS_LABEL,
            column: "career_path_id",
            ids,
        })
    };
    report(sink, "career_path_id coverage", result, "All career_path_ids are present.")
}

/// The merged batch must not contain a single null cell
pub fn check_no_nulls(rows: &[AggregatedRecord], sink: &dyn DiagnosticSink) -> CheckResult {
    let count = rows.iter().filter(|r| r.has_nulls()).count();
    let result = if count == 0 {
        Ok(())
    } else {
        Err(ValidationError::NullRows { count })
    };
    report(sink, "null-freedom", result, "No null rows found")
}

/// Batch columns must match the stored aggregate in count, name and type
pub fn check_schema(batch: &[ColumnSpec], store: &[ColumnSpec], sink: &dyn DiagnosticSink) -> CheckResult {
    let result = if batch.len() != store.len() {
        Err(ValidationError::ColumnCountMismatch {
            batch: batch.len(),
            store: store.len(),
        })
    } else {
        let columns: Vec<String> = store
            .iter()
            .filter(|stored| {
                batch
                    .iter()
                    .find(|col| col.name == stored.name)
                    .map_or(true, |col| col.column_type != stored.column_type)
            })
            .map(|stored| stored.name.clone())
            .collect();
        if columns.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::ColumnTypeMismatch { columns })
        }
    };
    report(sink, "schema parity", result, "Number of columns and dtypes are the same.")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ColumnType;
    use crate::pipeline::processing::merge::merge;
    use crate::pipeline::processing::normalize::not_applicable_career_path;
    use std::cell::RefCell;

    #[derive(Default)]
    struct RecordingSink {
        infos: RefCell<Vec<String>>,
        exceptions: RefCell<Vec<String>>,
    }

    impl DiagnosticSink for RecordingSink {
        fn info(&self, message: &str) {
            self.infos.borrow_mut().push(message.to_string());
        }

        fn warn(&self, message: &str) {
            self.infos.borrow_mut().push(message.to_string());
        }

        fn exception(&self, context: &str, err: &dyn std::error::Error) {
            self.exceptions.borrow_mut().push(format!("{}: {}", context, err));
        }
    }

    fn student(uuid: &str, path_id: i64, job_id: i64) -> CleanStudent {
        CleanStudent {
            uuid: uuid.to_string(),
            name: Some("Name".to_string()),
            dob: Some("1990-01-01".to_string()),
            sex: Some("N".to_string()),
            job_id,
            num_course_taken: 1.0,
            current_career_path_id: path_id,
            time_spent_hrs: 2.5,
            age: Some(34),
            age_group: Some(30),
            email: String::new(),
            street: String::new(),
            city: String::new(),
            state: String::new(),
            zip_code: String::new(),
        }
    }

    fn job(id: i64) -> StudentJob {
        StudentJob {
            job_id: id,
            job_category: Some("engineer".to_string()),
            avg_salary: Some(101_000),
        }
    }

    #[test]
    fn test_missing_job_ids_are_named_once_sorted() {
        let sink = RecordingSink::default();
        let students = vec![student("a", 0, 999), student("b", 0, 7), student("c", 0, 999), student("d", 0, 12)];

        let err = check_job_ids(&students, &[job(7)], &sink).unwrap_err();
        assert_eq!(
            err,
            ValidationError::MissingForeignKeys {
                table: "student_jobs",
                column: "job_id",
                ids: vec![12, 999],
            }
        );
        assert_eq!(err.to_string(), "Missing job_id(s): [12, 999] in 'student_jobs' table");
        assert_eq!(sink.exceptions.borrow().len(), 1);
    }

    #[test]
    fn test_sentinel_resolves_default_path() {
        let sink = RecordingSink::default();
        let students = vec![student("a2", 0, 7)];

        assert!(check_career_path_ids(&students, &[not_applicable_career_path()], &sink).is_ok());
        assert_eq!(sink.infos.borrow().clone(), vec!["All career_path_ids are present.".to_string()]);

        let err = check_career_path_ids(&[student("x", 3, 7)], &[not_applicable_career_path()], &sink).unwrap_err();
        assert!(matches!(err, ValidationError::MissingForeignKeys { ids, .. } if ids == vec![3]));
    }

    #[test]
    fn test_null_rows_are_counted() {
        let sink = RecordingSink::default();
        let rows = merge(
            &[student("a", 0, 7), student("b", 5, 7), student("c", 0, 8)],
            &[not_applicable_career_path()],
            &[job(7)],
        );

        let err = check_no_nulls(&rows, &sink).unwrap_err();
        assert_eq!(err, ValidationError::NullRows { count: 2 });
        assert_eq!(err.to_string(), "There are 2 nulls in the table.");

        assert!(check_no_nulls(&rows[..1], &sink).is_ok());
    }

    #[test]
    fn test_schema_parity() {
        let sink = RecordingSink::default();
        let batch = AggregatedRecord::schema();

        assert!(check_schema(&batch, &batch, &sink).is_ok());

        let mut short = batch.clone();
        short.pop();
        assert_eq!(
            check_schema(&batch, &short, &sink).unwrap_err(),
            ValidationError::ColumnCountMismatch {
                batch: batch.len(),
                store: batch.len() - 1,
            }
        );

        let mut retyped = batch.clone();
        retyped[4].column_type = ColumnType::Real;
        retyped[1].name = "full_name".to_string();
        assert_eq!(
            check_schema(&batch, &retyped, &sink).unwrap_err(),
            ValidationError::ColumnTypeMismatch {
                columns: vec!["full_name".to_string(), "job_id".to_string()],
            }
        );
        assert_eq!(sink.exceptions.borrow().len(), 2);
    }
}
