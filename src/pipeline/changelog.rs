use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

static VERSION_HEADING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^##\s+(\d+)\.(\d+)\.(\d+)\s*$").expect("valid version heading regex"));

/// `MAJOR.MINOR.PATCH` of a changelog entry
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChangelogVersion {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

impl ChangelogVersion {
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self { major, minor, patch }
    }

    pub fn next_patch(self) -> Self {
        Self {
            patch: self.patch + 1,
            ..self
        }
    }

    /// Version for the entry that follows `latest`. Cold start is `0.0.0`.
    pub fn following(latest: Option<Self>) -> Self {
        latest.map(Self::next_patch).unwrap_or_default()
    }

    /// Reads the newest `## X.Y.Z` heading of a markdown changelog, skipping
    /// titles and prose above it
    pub fn from_markdown(text: &str) -> Option<Self> {
        text.lines().find_map(|line| {
            let caps = VERSION_HEADING.captures(line.trim())?;
            Some(Self {
                major: caps[1].parse().ok()?,
                minor: caps[2].parse().ok()?,
                patch: caps[3].parse().ok()?,
            })
        })
    }
}

impl fmt::Display for ChangelogVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Effect of one committing run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangelogEntry {
    pub version: ChangelogVersion,
    pub rows_added: usize,
    pub rows_quarantined: usize,
}

impl ChangelogEntry {
    pub fn render(&self) -> String {
        format!(
            "## {}\n### Added\n- {} more data to the database of raw data\n- {} new missing data to incomplete_data table\n\n",
            self.version, self.rows_added, self.rows_quarantined
        )
    }
}
