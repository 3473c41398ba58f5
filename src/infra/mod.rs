pub mod changelog_file;
pub mod csv_export;
pub mod sqlite_cleansed_store;
pub mod sqlite_raw_store;
