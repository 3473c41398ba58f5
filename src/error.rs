use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("CSV export failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Store error: {message}")]
    Store { message: String },

    #[error("Changelog error: {0}")]
    Changelog(String),

    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),
}

/// Pre-commit check failures. Any of these aborts the run before the
/// aggregate table or the changelog is touched.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Missing {column}(s): {ids:?} in '{table}' table")]
    MissingForeignKeys {
        table: &'static str,
        column: &'static str,
        ids: Vec<i64>,
    },

    #[error("There are {count} nulls in the table.")]
    NullRows { count: usize },

    #[error("Number of columns differ: batch has {batch}, store has {store}")]
    ColumnCountMismatch { batch: usize, store: usize },

    #[error("{} column(s) dtypes aren't the same: {}", columns.len(), columns.join(", "))]
    ColumnTypeMismatch { columns: Vec<String> },
}

pub type Result<T> = std::result::Result<T, EtlError>;
