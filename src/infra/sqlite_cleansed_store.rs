use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashSet;
use std::path::Path;
use tracing::debug;

use crate::app::ports::CleansedStorePort;
use crate::constants::{AGGREGATED_TABLE, INCOMPLETE_TABLE};
use crate::domain::{
    AggregatedRecord, ColumnSpec, ColumnType, IncompleteRecord, AGGREGATED_COLUMNS, INCOMPLETE_COLUMNS,
};
use crate::error::Result;
use crate::infra::sqlite_raw_store::cell_text;

fn create_table_sql(table: &str, columns: &[(&str, &str)]) -> String {
    let defs: Vec<String> = columns
        .iter()
        .enumerate()
        .map(|(i, (name, declared))| {
            if i == 0 {
                format!("{} {} PRIMARY KEY", name, declared)
            } else {
                format!("{} {}", name, declared)
            }
        })
        .collect();
    format!("CREATE TABLE IF NOT EXISTS {} ({})", table, defs.join(", "))
}

fn insert_sql(table: &str, columns: &[(&str, &str)]) -> String {
    let names: Vec<&str> = columns.iter().map(|(name, _)| *name).collect();
    let slots: Vec<String> = (1..=columns.len()).map(|i| format!("?{}", i)).collect();
    format!("INSERT INTO {} ({}) VALUES ({})", table, names.join(", "), slots.join(", "))
}

/// The cleansed SQLite database: aggregate and quarantine tables, each
/// appended inside its own transaction.
pub struct SqliteCleansedStore {
    conn: Connection,
}

impl SqliteCleansedStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        Ok(Self::from_connection(conn))
    }

    pub fn from_connection(conn: Connection) -> Self {
        Self { conn }
    }

    fn table_exists(&self, table: &str) -> Result<bool> {
        let found: Option<i64> = self
            .conn
            .query_row(
                "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1",
                params![table],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn uuids_of(&self, table: &str) -> Result<HashSet<String>> {
        let mut stmt = self.conn.prepare(&format!("SELECT uuid FROM {}", table))?;
        let rows = stmt.query_map([], |row| cell_text(row, 0))?;
        let mut uuids = HashSet::new();
        for uuid in rows {
            if let Some(uuid) = uuid? {
                uuids.insert(uuid);
            }
        }
        Ok(uuids)
    }

    /// Row count of a table, zero when it does not exist yet
    pub fn count(&self, table: &str) -> Result<usize> {
        if !self.table_exists(table)? {
            return Ok(0);
        }
        let count: i64 = self
            .conn
            .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

impl CleansedStorePort for SqliteCleansedStore {
    fn aggregated_uuids(&self) -> Result<Option<HashSet<String>>> {
        if !self.table_exists(AGGREGATED_TABLE)? {
            return Ok(None);
        }
        Ok(Some(self.uuids_of(AGGREGATED_TABLE)?))
    }

    fn incomplete_uuids(&self) -> Result<HashSet<String>> {
        if !self.table_exists(INCOMPLETE_TABLE)? {
            return Ok(HashSet::new());
        }
        self.uuids_of(INCOMPLETE_TABLE)
    }

    fn aggregated_schema(&self) -> Result<Option<Vec<ColumnSpec>>> {
        let mut stmt = self
            .conn
            .prepare(&format!("PRAGMA table_info({})", AGGREGATED_TABLE))?;
        let rows = stmt.query_map([], |row| {
            let name: String = row.get(1)?;
            let declared: String = row.get(2)?;
            Ok(ColumnSpec::new(name, ColumnType::from_declared(&declared)))
        })?;
        let columns = rows.collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(if columns.is_empty() { None } else { Some(columns) })
    }

    fn append_incomplete(&self, rows: &[IncompleteRecord]) -> Result<usize> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(&create_table_sql(INCOMPLETE_TABLE, INCOMPLETE_COLUMNS), [])?;
        {
            let mut stmt = tx.prepare(&insert_sql(INCOMPLETE_TABLE, INCOMPLETE_COLUMNS))?;
            for r in rows {
                stmt.execute(params![
                    r.uuid,
                    r.name,
                    r.dob,
                    r.sex,
                    r.job_id,
                    r.num_course_taken,
                    r.current_career_path_id,
                    r.time_spent_hrs,
                    r.age,
                    r.age_group,
                    r.email,
                    r.street,
                    r.city,
                    r.state,
                    r.zip_code,
                    r.missing_fields,
                ])?;
            }
        }
        tx.commit()?;
        debug!("Appended {} rows to {}", rows.len(), INCOMPLETE_TABLE);
        Ok(rows.len())
    }

    fn append_aggregated(&self, rows: &[AggregatedRecord]) -> Result<usize> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(&create_table_sql(AGGREGATED_TABLE, AGGREGATED_COLUMNS), [])?;
        {
            let mut stmt = tx.prepare(&insert_sql(AGGREGATED_TABLE, AGGREGATED_COLUMNS))?;
            for r in rows {
                stmt.execute(params![
                    r.uuid,
                    r.name,
                    r.dob,
                    r.sex,
                    r.job_id,
                    r.num_course_taken,
                    r.current_career_path_id,
                    r.time_spent_hrs,
                    r.age,
                    r.age_group,
                    r.email,
                    r.street,
                    r.city,
                    r.state,
                    r.zip_code,
                    r.career_path_id,
                    r.career_path_name,
                    r.hours_to_complete,
                    r.job_category,
                    r.avg_salary,
                ])?;
            }
        }
        tx.commit()?;
        debug!("Appended {} rows to {}", rows.len(), AGGREGATED_TABLE);
        Ok(rows.len())
    }

    fn load_aggregated(&self) -> Result<Vec<AggregatedRecord>> {
        if !self.table_exists(AGGREGATED_TABLE)? {
            return Ok(Vec::new());
        }
        let names: Vec<&str> = AGGREGATED_COLUMNS.iter().map(|(name, _)| *name).collect();
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM {} ORDER BY rowid",
            names.join(", "),
            AGGREGATED_TABLE
        ))?;
        let rows = stmt.query_map([], |row| {
            Ok(AggregatedRecord {
                uuid: row.get(0)?,
                name: row.get(1)?,
                dob: row.get(2)?,
                sex: row.get(3)?,
                job_id: row.get(4)?,
                num_course_taken: row.get(5)?,
                current_career_path_id: row.get(6)?,
                time_spent_hrs: row.get(7)?,
                age: row.get(8)?,
                age_group: row.get(9)?,
                email: row.get(10)?,
                street: row.get(11)?,
                city: row.get(12)?,
                state: row.get(13)?,
                zip_code: row.get(14)?,
                career_path_id: row.get(15)?,
                career_path_name: row.get(16)?,
                hours_to_complete: row.get(17)?,
                job_category: row.get(18)?,
                avg_salary: row.get(19)?,
            })
        })?;
        let records = rows.collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }
}
