use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags, Row};
use std::path::Path;

use crate::app::ports::RawStorePort;
use crate::constants::{RAW_CAREER_PATHS_TABLE, RAW_STUDENTS_TABLE, RAW_STUDENT_JOBS_TABLE};
use crate::domain::{CareerPath, RawStudent, StudentJob};
use crate::error::{EtlError, Result};
use crate::pipeline::processing::normalize::coerce_id;

/// Reads any storage class as text. Blobs are treated as missing.
pub(crate) fn cell_text(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<String>> {
    Ok(match row.get_ref(idx)? {
        ValueRef::Null | ValueRef::Blob(_) => None,
        ValueRef::Integer(i) => Some(i.to_string()),
        ValueRef::Real(f) => Some(f.to_string()),
        ValueRef::Text(t) => Some(String::from_utf8_lossy(t).into_owned()),
    })
}

fn required<T>(value: Option<T>, table: &str, column: &str) -> Result<T> {
    value.ok_or_else(|| EtlError::Store {
        message: format!("{} has a row with an empty or non-numeric {}", table, column),
    })
}

/// Read-only view over the raw SQLite database. Lookup ids are required;
/// lookup values stay nullable until a merged row picks them up.
pub struct SqliteRawStore {
    conn: Connection,
}

impl SqliteRawStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open_with_flags(
            path.as_ref(),
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        Ok(Self { conn })
    }

    pub fn from_connection(conn: Connection) -> Self {
        Self { conn }
    }
}

impl RawStorePort for SqliteRawStore {
    fn load_students(&self) -> Result<Vec<RawStudent>> {
        let sql = format!(
            "SELECT uuid, name, dob, sex, contact_info, job_id, num_course_taken, \
             current_career_path_id, time_spent_hrs FROM {}",
            RAW_STUDENTS_TABLE
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], |row| {
            Ok((
                cell_text(row, 0)?,
                RawStudent {
                    uuid: String::new(),
                    name: cell_text(row, 1)?,
                    dob: cell_text(row, 2)?,
                    sex: cell_text(row, 3)?,
                    contact_info: cell_text(row, 4)?,
                    job_id: cell_text(row, 5)?,
                    num_course_taken: cell_text(row, 6)?,
                    current_career_path_id: cell_text(row, 7)?,
                    time_spent_hrs: cell_text(row, 8)?,
                },
            ))
        })?;

        let mut students = Vec::new();
        for row in rows {
            let (uuid, mut student) = row?;
            student.uuid = required(uuid, RAW_STUDENTS_TABLE, "uuid")?;
            students.push(student);
        }
        Ok(students)
    }

    fn load_career_paths(&self) -> Result<Vec<CareerPath>> {
        let sql = format!(
            "SELECT career_path_id, career_path_name, hours_to_complete FROM {}",
            RAW_CAREER_PATHS_TABLE
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], |row| Ok((cell_text(row, 0)?, cell_text(row, 1)?, cell_text(row, 2)?)))?;

        let mut paths = Vec::new();
        for row in rows {
            let (id, name, hours) = row?;
            paths.push(CareerPath {
                career_path_id: required(id.as_deref().and_then(coerce_id), RAW_CAREER_PATHS_TABLE, "career_path_id")?,
                career_path_name: name,
                hours_to_complete: hours.as_deref().and_then(coerce_id),
            });
        }
        Ok(paths)
    }

    fn load_student_jobs(&self) -> Result<Vec<StudentJob>> {
        let sql = format!(
            "SELECT job_id, job_category, avg_salary FROM {}",
            RAW_STUDENT_JOBS_TABLE
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], |row| Ok((cell_text(row, 0)?, cell_text(row, 1)?, cell_text(row, 2)?)))?;

        let mut jobs = Vec::new();
        for row in rows {
            let (id, category, salary) = row?;
            jobs.push(StudentJob {
                job_id: required(id.as_deref().and_then(coerce_id), RAW_STUDENT_JOBS_TABLE, "job_id")?,
                job_category: category,
                avg_salary: salary.as_deref().and_then(coerce_id),
            });
        }
        Ok(jobs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded() -> SqliteRawStore {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            r#"
            CREATE TABLE cademycode_students (
                uuid INTEGER, name TEXT, dob TEXT, sex TEXT, contact_info TEXT,
                job_id TEXT, num_course_taken TEXT, current_career_path_id TEXT, time_spent_hrs TEXT
            );
            INSERT INTO cademycode_students VALUES
                (1, 'Annabelle Avery', '1943-07-03', 'F', '{"mailing_address": "303 N Timber Key, Irondale, Wisconsin, 84736", "email": "a@b.com"}', '7.0', '6.0', '1.0', '4.99'),
                (2, 'Micah Rubio', '1991-02-07', 'M', NULL, NULL, '5.0', NULL, NULL);
            CREATE TABLE cademycode_courses (career_path_id INTEGER, career_path_name TEXT, hours_to_complete INTEGER);
            INSERT INTO cademycode_courses VALUES (1, 'data scientist', 20);
            CREATE TABLE cademycode_student_jobs (job_id INTEGER, job_category TEXT, avg_salary INTEGER);
            INSERT INTO cademycode_student_jobs VALUES (7, 'engineer', 101000), (7, 'engineer', 101000);
            "#,
        )
        .unwrap();
        SqliteRawStore::from_connection(conn)
    }

    #[test]
    fn test_reads_cells_as_text() {
        let store = seeded();
        let students = store.load_students().unwrap();

        assert_eq!(students.len(), 2);
        assert_eq!(students[0].uuid, "1");
        assert_eq!(students[0].job_id.as_deref(), Some("7.0"));
        assert_eq!(students[1].job_id, None);
        assert_eq!(students[1].contact_info, None);
    }

    #[test]
    fn test_reads_lookups_as_is() {
        let store = seeded();
        assert_eq!(store.load_career_paths().unwrap().len(), 1);
        // Duplicates are the normalizer's job
        assert_eq!(store.load_student_jobs().unwrap().len(), 2);
    }

    #[test]
    fn test_null_lookup_values_are_kept() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            r#"
            CREATE TABLE cademycode_courses (career_path_id INTEGER, career_path_name TEXT, hours_to_complete INTEGER);
            INSERT INTO cademycode_courses VALUES (1, NULL, 20), (2, 'data engineer', NULL);
            CREATE TABLE cademycode_student_jobs (job_id INTEGER, job_category TEXT, avg_salary INTEGER);
            INSERT INTO cademycode_student_jobs VALUES (7, 'engineer', 101000), (8, 'HR', NULL);
            "#,
        )
        .unwrap();
        let store = SqliteRawStore::from_connection(conn);

        let paths = store.load_career_paths().unwrap();
        assert_eq!(paths[0].career_path_name, None);
        assert_eq!(paths[1].hours_to_complete, None);

        let jobs = store.load_student_jobs().unwrap();
        assert_eq!(jobs[1].job_category.as_deref(), Some("HR"));
        assert_eq!(jobs[1].avg_salary, None);
    }

    #[test]
    fn test_null_lookup_id_is_an_error() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE cademycode_student_jobs (job_id INTEGER, job_category TEXT, avg_salary INTEGER);
             INSERT INTO cademycode_student_jobs VALUES (NULL, 'HR', 50000);",
        )
        .unwrap();
        let store = SqliteRawStore::from_connection(conn);
        assert!(matches!(store.load_student_jobs(), Err(EtlError::Store { .. })));
    }

    #[test]
    fn test_missing_table_is_an_error() {
        let store = SqliteRawStore::from_connection(Connection::open_in_memory().unwrap());
        assert!(matches!(store.load_students(), Err(EtlError::Sqlite(_))));
    }
}
