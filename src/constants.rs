/// Table names shared by the raw and cleansed SQLite stores.
/// These match the layout the upstream producer writes.

// Raw store
pub const RAW_STUDENTS_TABLE: &str = "cademycode_students";
pub const RAW_CAREER_PATHS_TABLE: &str = "cademycode_courses";
pub const RAW_STUDENT_JOBS_TABLE: &str = "cademycode_student_jobs";

// Cleansed store
pub const AGGREGATED_TABLE: &str = "cademycode_aggregated";
pub const INCOMPLETE_TABLE: &str = "incomplete_data";

// Names used in validation messages
pub const CAREER_PATHS_LABEL: &str = "courses";
pub const STUDENT_JOBS_LABEL: &str = "student_jobs";

/// Sentinel career path matched by students without a current path
pub const NOT_APPLICABLE_CAREER_PATH_ID: i64 = 0;
pub const NOT_APPLICABLE_CAREER_PATH_NAME: &str = "not applicable";

/// Suffix of the structured version file kept next to the changelog
pub const CHANGELOG_VERSION_SUFFIX: &str = "version.json";
