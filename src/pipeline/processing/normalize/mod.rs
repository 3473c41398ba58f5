pub mod contact;

use chrono::{Datelike, NaiveDate};
use std::collections::HashSet;

use crate::constants::{NOT_APPLICABLE_CAREER_PATH_ID, NOT_APPLICABLE_CAREER_PATH_NAME};
use crate::domain::{CareerPath, CleanStudent, IncompleteRecord, RawStudent, StudentJob};

use self::contact::decode_contact_info;

/// Result of cleaning a student batch. Every input row lands in exactly one
/// of `cleaned` or `quarantined`.
#[derive(Debug, Clone, Default)]
pub struct StudentPartition {
    pub cleaned: Vec<CleanStudent>,
    pub quarantined: Vec<IncompleteRecord>,
    /// Per-row notes for recoverable decode problems, keyed by uuid
    pub warnings: Vec<(String, String)>,
}

impl StudentPartition {
    pub fn len(&self) -> usize {
        self.cleaned.len() + self.quarantined.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Trait for the per-table cleaning rules
pub trait RecordNormalizer {
    /// Clean a batch of raw students, splitting off incomplete rows
    fn normalize_students(&self, rows: &[RawStudent]) -> StudentPartition;

    /// Clean the career path lookup, guaranteeing the "not applicable" row
    fn clean_career_paths(&self, rows: &[CareerPath]) -> Vec<CareerPath>;

    /// Clean the student job lookup by dropping exact duplicates
    fn clean_student_jobs(&self, rows: &[StudentJob]) -> Vec<StudentJob>;
}

/// Default cleaning rules. Ages are computed relative to `as_of`.
pub struct DefaultNormalizer {
    pub as_of: NaiveDate,
}

impl DefaultNormalizer {
    pub fn new(as_of: NaiveDate) -> Self {
        Self { as_of }
    }

    fn normalize_student(&self, raw: &RawStudent) -> NormalizedStudent {
        let (contact, note) = decode_contact_info(raw.contact_info.as_deref()).flatten();
        let age = raw
            .dob
            .as_deref()
            .and_then(parse_date)
            .map(|dob| age_on(dob, self.as_of));

        NormalizedStudent {
            uuid: raw.uuid.clone(),
            name: raw.name.clone(),
            dob: raw.dob.clone(),
            sex: raw.sex.clone(),
            job_id: raw.job_id.as_deref().and_then(coerce_id),
            num_course_taken: raw.num_course_taken.as_deref().and_then(coerce_number),
            current_career_path_id: raw.current_career_path_id.as_deref().and_then(coerce_id),
            time_spent_hrs: raw.time_spent_hrs.as_deref().and_then(coerce_number),
            age,
            age_group: age.map(age_group),
            email: contact.email,
            street: contact.address.street,
            city: contact.address.city,
            state: contact.address.state,
            zip_code: contact.address.zip_code,
            note,
        }
    }
}

impl RecordNormalizer for DefaultNormalizer {
    fn normalize_students(&self, rows: &[RawStudent]) -> StudentPartition {
        let mut partition = StudentPartition::default();

        for raw in rows {
            let mut student = self.normalize_student(raw);
            if let Some(note) = student.note.take() {
                partition.warnings.push((student.uuid.clone(), note));
            }

            match student.split() {
                Ok(clean) => partition.cleaned.push(clean),
                Err(incomplete) => partition.quarantined.push(incomplete),
            }
        }

        partition
    }

    fn clean_career_paths(&self, rows: &[CareerPath]) -> Vec<CareerPath> {
        let mut cleaned = rows.to_vec();
        let has_sentinel = cleaned
            .iter()
            .any(|c| c.career_path_id == NOT_APPLICABLE_CAREER_PATH_ID);
        if !has_sentinel {
            cleaned.push(not_applicable_career_path());
        }
        cleaned
    }

    fn clean_student_jobs(&self, rows: &[StudentJob]) -> Vec<StudentJob> {
        let mut seen = HashSet::new();
        rows.iter()
            .filter(|job| seen.insert((*job).clone()))
            .cloned()
            .collect()
    }
}

pub fn not_applicable_career_path() -> CareerPath {
    CareerPath {
        career_path_id: NOT_APPLICABLE_CAREER_PATH_ID,
        career_path_name: Some(NOT_APPLICABLE_CAREER_PATH_NAME.to_string()),
        hours_to_complete: Some(0),
    }
}

/// Intermediate row with every coerced field still optional
struct NormalizedStudent {
    uuid: String,
    name: Option<String>,
    dob: Option<String>,
    sex: Option<String>,
    job_id: Option<i64>,
    num_course_taken: Option<f64>,
    current_career_path_id: Option<i64>,
    time_spent_hrs: Option<f64>,
    age: Option<i64>,
    age_group: Option<i64>,
    email: String,
    street: String,
    city: String,
    state: String,
    zip_code: String,
    note: Option<String>,
}

impl NormalizedStudent {
    fn split(self) -> Result<CleanStudent, IncompleteRecord> {
        match (self.num_course_taken, self.job_id) {
            (Some(num_course_taken), Some(job_id)) => Ok(CleanStudent {
                uuid: self.uuid,
                name: self.name,
                dob: self.dob,
                sex: self.sex,
                job_id,
                num_course_taken,
                current_career_path_id: self
                    .current_career_path_id
                    .unwrap_or(NOT_APPLICABLE_CAREER_PATH_ID),
                time_spent_hrs: self.time_spent_hrs.unwrap_or(0.0),
                age: self.age,
                age_group: self.age_group,
                email: self.email,
                street: self.street,
                city: self.city,
                state: self.state,
                zip_code: self.zip_code,
            }),
            (num_course_taken, job_id) => {
                let mut missing = Vec::new();
                if num_course_taken.is_none() {
                    missing.push("num_course_taken");
                }
                if job_id.is_none() {
                    missing.push("job_id");
                }
                Err(IncompleteRecord {
                    uuid: self.uuid,
                    name: self.name,
                    dob: self.dob,
                    sex: self.sex,
                    job_id: self.job_id,
                    num_course_taken: self.num_course_taken,
                    current_career_path_id: self.current_career_path_id,
                    time_spent_hrs: self.time_spent_hrs,
                    age: self.age,
                    age_group: self.age_group,
                    email: self.email,
                    street: self.street,
                    city: self.city,
                    state: self.state,
                    zip_code: self.zip_code,
                    missing_fields: missing.join(","),
                })
            }
        }
    }
}

/// Numeric cells arrive as text such as `"7"`, `"7.0"` or `"nan"`.
pub fn coerce_number(cell: &str) -> Option<f64> {
    cell.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Identifier cells must be whole numbers once coerced
pub fn coerce_id(cell: &str) -> Option<i64> {
    coerce_number(cell)
        .filter(|v| v.fract() == 0.0)
        .map(|v| v as i64)
}

fn parse_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    let date_part = text.get(..10).unwrap_or(text);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}

/// Whole calendar years between `dob` and `as_of`
pub fn age_on(dob: NaiveDate, as_of: NaiveDate) -> i64 {
    let mut years = i64::from(as_of.year() - dob.year());
    if (as_of.month(), as_of.day()) < (dob.month(), dob.day()) {
        years -= 1;
    }
    years
}

pub fn age_group(age: i64) -> i64 {
    (age / 10) * 10
}

#[cfg(test)]
mod tests {
    use super::*;

    fn as_of() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
    }

    fn raw(uuid: &str) -> RawStudent {
        RawStudent {
            uuid: uuid.to_string(),
            name: Some("Annabelle Avery".to_string()),
            dob: Some("2000-01-01".to_string()),
            sex: Some("F".to_string()),
            contact_info: Some(
                r#"{"mailing_address": "303 N Timber Key, Irondale, Wisconsin, 84736", "email": "a@b.com"}"#
                    .to_string(),
            ),
            job_id: Some("7.0".to_string()),
            num_course_taken: Some("6.0".to_string()),
            current_career_path_id: Some("1.0".to_string()),
            time_spent_hrs: Some("4.99".to_string()),
        }
    }

    #[test]
    fn test_clean_student_shape() {
        let normalizer = DefaultNormalizer::new(as_of());
        let partition = normalizer.normalize_students(&[raw("1")]);

        assert_eq!(partition.cleaned.len(), 1);
        let student = &partition.cleaned[0];
        assert_eq!(student.job_id, 7);
        assert_eq!(student.num_course_taken, 6.0);
        assert_eq!(student.current_career_path_id, 1);
        assert_eq!(student.age, Some(24));
        assert_eq!(student.age_group, Some(20));
        assert_eq!(student.city, "Irondale");
        assert!(partition.warnings.is_empty());
    }

    #[test]
    fn test_missing_num_course_taken_is_quarantined() {
        let mut a1 = raw("a1");
        a1.num_course_taken = None;
        a1.job_id = Some("5".to_string());
        a1.current_career_path_id = Some("2".to_string());

        let partition = DefaultNormalizer::new(as_of()).normalize_students(&[a1]);

        assert!(partition.cleaned.is_empty());
        assert_eq!(partition.quarantined.len(), 1);
        assert_eq!(partition.quarantined[0].uuid, "a1");
        assert_eq!(partition.quarantined[0].missing_fields, "num_course_taken");
        assert_eq!(partition.quarantined[0].job_id, Some(5));
    }

    #[test]
    fn test_defaults_for_optional_numbers() {
        let mut a2 = raw("a2");
        a2.dob = Some("1995-06-01".to_string());
        a2.num_course_taken = Some("3".to_string());
        a2.current_career_path_id = None;
        a2.time_spent_hrs = Some("nan".to_string());

        let partition = DefaultNormalizer::new(as_of()).normalize_students(&[a2]);

        let student = &partition.cleaned[0];
        assert_eq!(student.current_career_path_id, 0);
        assert_eq!(student.time_spent_hrs, 0.0);
        assert_eq!(student.age, Some(28));
    }

    #[test]
    fn test_partition_is_exact() {
        let mut rows = Vec::new();
        for i in 0..20 {
            let mut row = raw(&i.to_string());
            if i % 3 == 0 {
                row.job_id = None;
            }
            if i % 4 == 0 {
                row.num_course_taken = Some("".to_string());
            }
            if i % 5 == 0 {
                row.contact_info = Some("not json".to_string());
            }
            rows.push(row);
        }

        let partition = DefaultNormalizer::new(as_of()).normalize_students(&rows);
        assert_eq!(partition.len(), rows.len());

        let cleaned: HashSet<&str> = partition.cleaned.iter().map(|s| s.uuid.as_str()).collect();
        let quarantined: HashSet<&str> = partition.quarantined.iter().map(|s| s.uuid.as_str()).collect();
        assert!(cleaned.is_disjoint(&quarantined));
        assert_eq!(cleaned.len() + quarantined.len(), rows.len());

        // Malformed contact info never decides which side a row lands on
        let row_15 = partition.cleaned.iter().find(|s| s.uuid == "15");
        assert!(row_15.is_none());
        let row_5 = partition.cleaned.iter().find(|s| s.uuid == "5").unwrap();
        assert_eq!(row_5.email, "");
        assert_eq!(row_5.street, "");
        assert_eq!(partition.warnings.iter().filter(|(uuid, _)| uuid == "5").count(), 1);
    }

    #[test]
    fn test_empty_text_cells_are_not_null() {
        let mut row = raw("blank");
        row.name = Some(String::new());
        row.sex = Some("  ".to_string());

        let partition = DefaultNormalizer::new(as_of()).normalize_students(&[row]);

        let student = &partition.cleaned[0];
        assert_eq!(student.name.as_deref(), Some(""));
        assert_eq!(student.sex.as_deref(), Some("  "));
    }

    #[test]
    fn test_both_missing_fields_are_named() {
        let mut row = raw("x");
        row.job_id = None;
        row.num_course_taken = None;
        let partition = DefaultNormalizer::new(as_of()).normalize_students(&[row]);
        assert_eq!(partition.quarantined[0].missing_fields, "num_course_taken,job_id");
    }

    #[test]
    fn test_sentinel_added_once() {
        let normalizer = DefaultNormalizer::new(as_of());
        let paths = vec![CareerPath {
            career_path_id: 1,
            career_path_name: Some("data scientist".to_string()),
            hours_to_complete: Some(20),
        }];

        let once = normalizer.clean_career_paths(&paths);
        let twice = normalizer.clean_career_paths(&once);

        assert_eq!(once.len(), 2);
        assert_eq!(twice, once);
        assert_eq!(once[1], not_applicable_career_path());
    }

    #[test]
    fn test_job_dedup_keeps_first_occurrence_order() {
        let job = |id: i64, cat: &str| StudentJob {
            job_id: id,
            job_category: Some(cat.to_string()),
            avg_salary: Some(1000 * id),
        };
        let rows = vec![job(3, "analytics"), job(1, "engineer"), job(3, "analytics"), job(2, "HR"), job(1, "engineer")];

        let normalizer = DefaultNormalizer::new(as_of());
        let cleaned = normalizer.clean_student_jobs(&rows);

        assert_eq!(cleaned, vec![job(3, "analytics"), job(1, "engineer"), job(2, "HR")]);
        assert_eq!(normalizer.clean_student_jobs(&cleaned), cleaned);
    }

    #[test]
    fn test_coercion_rules() {
        assert_eq!(coerce_id("7.0"), Some(7));
        assert_eq!(coerce_id("7.5"), None);
        assert_eq!(coerce_id(" 12 "), Some(12));
        assert_eq!(coerce_number("NaN"), None);
        assert_eq!(coerce_number("abc"), None);
        assert_eq!(age_on(NaiveDate::from_ymd_opt(2000, 3, 2).unwrap(), as_of()), 23);
        assert_eq!(age_group(39), 30);
    }
}
