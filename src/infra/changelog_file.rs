use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::app::ports::ChangelogPort;
use crate::constants::CHANGELOG_VERSION_SUFFIX;
use crate::error::{EtlError, Result};
use crate::pipeline::changelog::{ChangelogEntry, ChangelogVersion};

/// Markdown changelog, newest entry on top, with the latest version kept
/// as JSON in a sidecar file next to it.
pub struct MarkdownChangelog {
    path: PathBuf,
    version_path: PathBuf,
}

fn read_optional(path: &Path) -> Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Writes next to the target and renames over it, so readers never see a
/// half written file.
fn write_replacing(path: &Path, contents: &str) -> Result<()> {
    let staging = staging_path(path);
    fs::write(&staging, contents)?;
    fs::rename(&staging, path)?;
    Ok(())
}

impl MarkdownChangelog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let version_path = path.with_extension(CHANGELOG_VERSION_SUFFIX);
        Self { path, version_path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn version_path(&self) -> &Path {
        &self.version_path
    }
}

impl ChangelogPort for MarkdownChangelog {
    fn latest_version(&self) -> Result<Option<ChangelogVersion>> {
        if let Some(json) = read_optional(&self.version_path)? {
            return Ok(Some(serde_json::from_str(&json)?));
        }
        // Changelogs written before the sidecar existed carry the version in their newest heading
        let text = match read_optional(&self.path)? {
            Some(text) if !text.trim().is_empty() => text,
            _ => return Ok(None),
        };
        match ChangelogVersion::from_markdown(&text) {
            Some(version) => Ok(Some(version)),
            None => Err(EtlError::Changelog(format!(
                "{} has content but no `## X.Y.Z` heading",
                self.path.display()
            ))),
        }
    }

    fn prepend(&self, entry: &ChangelogEntry) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let history = read_optional(&self.path)?.unwrap_or_default();

        // Sidecar first: if the markdown write is lost the next version is skipped, never repeated
        write_replacing(&self.version_path, &serde_json::to_string(&entry.version)?)?;
        write_replacing(&self.path, &format!("{}{}", entry.render(), history))?;
        Ok(())
    }
}
