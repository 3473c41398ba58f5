use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{EtlError, Result};

pub const DEFAULT_CONFIG_PATH: &str = "student_etl.toml";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub raw: RawConfig,
    pub cleansed: CleansedConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RawConfig {
    pub database: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CleansedConfig {
    pub database: PathBuf,
    pub csv_export: PathBuf,
    pub changelog: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub directory: PathBuf,
    pub file_name: String,
}

impl Default for RawConfig {
    fn default() -> Self {
        Self {
            database: PathBuf::from("cademycode.db"),
        }
    }
}

impl Default for CleansedConfig {
    fn default() -> Self {
        Self {
            database: PathBuf::from("prod/cademycode_cleansed.db"),
            csv_export: PathBuf::from("prod/cademycode_cleansed.csv"),
            changelog: PathBuf::from("prod/changelog.md"),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("logs"),
            file_name: "cleanse_db.log".to_string(),
        }
    }
}

impl Config {
    pub fn load_from(config_path: &Path) -> Result<Self> {
        let config_content = fs::read_to_string(config_path).map_err(|e| {
            EtlError::Config(format!(
                "Failed to read config file '{}': {}",
                config_path.display(),
                e
            ))
        })?;

        let config: Config = toml::from_str(&config_content)?;
        Ok(config)
    }

    /// Loads the explicit path if given, otherwise the default file when it
    /// exists, otherwise built-in defaults. Environment overrides apply last.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut config = match explicit {
            Some(path) => Self::load_from(path)?,
            None if Path::new(DEFAULT_CONFIG_PATH).exists() => {
                Self::load_from(Path::new(DEFAULT_CONFIG_PATH))?
            }
            None => Self::default(),
        };
        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("STUDENT_ETL_RAW_DB") {
            self.raw.database = PathBuf::from(v);
        }
        if let Some(v) = lookup("STUDENT_ETL_CLEANSED_DB") {
            self.cleansed.database = PathBuf::from(v);
        }
        if let Some(v) = lookup("STUDENT_ETL_CSV_EXPORT") {
            self.cleansed.csv_export = PathBuf::from(v);
        }
        if let Some(v) = lookup("STUDENT_ETL_CHANGELOG") {
            self.cleansed.changelog = PathBuf::from(v);
        }
        if let Some(v) = lookup("STUDENT_ETL_LOG_DIR") {
            self.logging.directory = PathBuf::from(v);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: Config = toml::from_str(
            r#"
            [raw]
            database = "data/raw.db"

            [cleansed]
            changelog = "out/CHANGELOG.md"
            "#,
        )
        .unwrap();

        assert_eq!(config.raw.database, PathBuf::from("data/raw.db"));
        assert_eq!(config.cleansed.changelog, PathBuf::from("out/CHANGELOG.md"));
        assert_eq!(
            config.cleansed.database,
            PathBuf::from("prod/cademycode_cleansed.db")
        );
        assert_eq!(config.logging.file_name, "cleanse_db.log");
    }

    #[test]
    fn test_env_overrides_win() {
        let mut config = Config::default();
        config.apply_env_overrides(|key| match key {
            "STUDENT_ETL_CLEANSED_DB" => Some("/tmp/clean.db".to_string()),
            _ => None,
        });

        assert_eq!(config.cleansed.database, PathBuf::from("/tmp/clean.db"));
        assert_eq!(config.raw.database, PathBuf::from("cademycode.db"));
    }

    #[test]
    fn test_missing_explicit_file_is_config_error() {
        let err = Config::load_from(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, EtlError::Config(_)));
    }
}
