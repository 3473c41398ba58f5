use std::collections::HashMap;

use crate::domain::{AggregatedRecord, CareerPath, CleanStudent, StudentJob};

/// Left joins students to career paths on `current_career_path_id`, then to
/// jobs on `job_id`. Every student yields exactly one row; a missing match
/// leaves the joined columns null. When a lookup repeats an id the first row
/// wins.
pub fn merge(
    students: &[CleanStudent],
    career_paths: &[CareerPath],
    student_jobs: &[StudentJob],
) -> Vec<AggregatedRecord> {
    let mut paths_by_id: HashMap<i64, &CareerPath> = HashMap::new();
    for path in career_paths {
        paths_by_id.entry(path.career_path_id).or_insert(path);
    }

    let mut jobs_by_id: HashMap<i64, &StudentJob> = HashMap::new();
    for job in student_jobs {
        jobs_by_id.entry(job.job_id).or_insert(job);
    }

    students
        .iter()
        .map(|student| {
            AggregatedRecord::from_parts(
                student,
                paths_by_id.get(&student.current_career_path_id).copied(),
                jobs_by_id.get(&student.job_id).copied(),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::processing::normalize::not_applicable_career_path;

    fn student(uuid: &str, path_id: i64, job_id: i64) -> CleanStudent {
        CleanStudent {
            uuid: uuid.to_string(),
            name: Some("Name".to_string()),
            dob: Some("1995-06-01".to_string()),
            sex: Some("M".to_string()),
            job_id,
            num_course_taken: 3.0,
            current_career_path_id: path_id,
            time_spent_hrs: 0.0,
            age: Some(28),
            age_group: Some(20),
            email: "n@x.com".to_string(),
            street: "1 Main".to_string(),
            city: "Town".to_string(),
            state: "State".to_string(),
            zip_code: "00000".to_string(),
        }
    }

    fn job(id: i64, category: &str) -> StudentJob {
        StudentJob {
            job_id: id,
            job_category: Some(category.to_string()),
            avg_salary: Some(50_000),
        }
    }

    #[test]
    fn test_defaulted_student_joins_sentinel() {
        let rows = merge(
            &[student("a2", 0, 7)],
            &[not_applicable_career_path()],
            &[job(7, "engineer")],
        );

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].career_path_name.as_deref(), Some("not applicable"));
        assert_eq!(rows[0].career_path_id, Some(0));
        assert_eq!(rows[0].job_category.as_deref(), Some("engineer"));
        assert!(!rows[0].has_nulls());
    }

    #[test]
    fn test_unmatched_rows_survive_with_nulls() {
        let rows = merge(&[student("b", 4, 999)], &[not_applicable_career_path()], &[job(7, "engineer")]);

        assert_eq!(rows.len(), 1);
        assert!(rows[0].career_path_name.is_none());
        assert!(rows[0].avg_salary.is_none());
        assert_eq!(
            rows[0].null_columns(),
            vec!["career_path_id", "career_path_name", "hours_to_complete", "job_category", "avg_salary"]
        );
    }

    #[test]
    fn test_null_lookup_values_reach_the_row() {
        let mut unpaid = job(8, "HR");
        unpaid.avg_salary = None;
        let rows = merge(
            &[student("d", 0, 8), student("e", 0, 7)],
            &[not_applicable_career_path()],
            &[job(7, "engineer"), unpaid],
        );

        assert_eq!(rows[0].null_columns(), vec!["avg_salary"]);
        assert!(!rows[1].has_nulls());
    }

    #[test]
    fn test_repeated_lookup_ids_do_not_fan_out() {
        let rows = merge(
            &[student("c", 0, 7)],
            &[not_applicable_career_path()],
            &[job(7, "engineer"), job(7, "analytics")],
        );

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].job_category.as_deref(), Some("engineer"));
    }
}
