use std::fs;
use std::path::PathBuf;
use tracing::debug;

use crate::app::ports::SnapshotExportPort;
use crate::domain::AggregatedRecord;
use crate::error::Result;

/// Writes the whole aggregate table to a CSV file. The file is written
/// next to the target first and then renamed over it.
pub struct CsvSnapshotExporter {
    path: PathBuf,
}

impl CsvSnapshotExporter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SnapshotExportPort for CsvSnapshotExporter {
    fn export(&self, rows: &[AggregatedRecord]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let staging = self.path.with_extension("csv.tmp");

        let mut writer = csv::Writer::from_path(&staging)?;
        for row in rows {
            writer.serialize(row)?;
        }
        writer.flush()?;
        drop(writer);

        fs::rename(&staging, &self.path)?;
        debug!("Exported {} rows to {}", rows.len(), self.path.display());
        Ok(())
    }
}
