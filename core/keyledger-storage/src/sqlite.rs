//! Durable license storage backed by SQLite.
//!
//! Every record is stored as a JSON blob keyed by its license key, with the
//! status copied into its own column for inspection. All records are loaded
//! into a [`RecordTable`] at open; reads are served from memory and every
//! change is written through before it becomes visible.

use crate::error::{StorageError, StorageResult};
use crate::store::LicenseStore;
use crate::table::RecordTable;
use chrono::Utc;
use keyledger_license::{LicenseKey, LicenseRecord};
use rusqlite::types::ValueRef;
use rusqlite::{Connection, ErrorCode, Row, params};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use tracing::{debug, info, warn};

/// A [`LicenseStore`] persisted to a SQLite database.
pub struct SqliteStore {
    table: RecordTable,
    conn: Mutex<Connection>,
    path: Option<PathBuf>,
}

impl SqliteStore {
    /// Opens (or creates) a store at the given path.
    ///
    /// If the existing file is not a readable license database (not SQLite,
    /// corrupt pages, or rows that fail to decode), it is renamed to
    /// `<name>.corrupt-<unix-ts>` and an empty store is created in its place.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened for reasons other than
    /// corruption (permissions, missing directory), or if the quarantine
    /// rename fails.
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let path = path.as_ref();
        match Self::open_at(path) {
            Ok(store) => Ok(store),
            Err(err) if is_corruption(&err) => {
                let quarantine = quarantine_path(path);
                warn!(
                    path = %path.display(),
                    quarantine = %quarantine.display(),
                    error = %err,
                    "persisted license state is unreadable, starting with an empty store"
                );
                std::fs::rename(path, &quarantine)?;
                for suffix in ["-journal", "-wal", "-shm"] {
                    let sidecar = sidecar_path(path, suffix);
                    if sidecar.exists() {
                        std::fs::rename(&sidecar, sidecar_path(&quarantine, suffix))?;
                    }
                }
                Self::open_at(path)
            }
            Err(err) => Err(err),
        }
    }

    /// Opens an in-memory store (for testing).
    pub fn open_in_memory() -> StorageResult<Self> {
        Self::from_connection(Connection::open_in_memory()?, None)
    }

    /// Returns the database path, or `None` for an in-memory store.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn open_at(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;
        Self::from_connection(conn, Some(path.to_path_buf()))
    }

    fn from_connection(conn: Connection, path: Option<PathBuf>) -> StorageResult<Self> {
        init_schema(&conn)?;
        let records = load_records(&conn)?;
        info!(count = records.len(), "loaded license records");
        Ok(Self {
            table: RecordTable::from_records(records),
            conn: Mutex::new(conn),
            path,
        })
    }

    fn write_record(&self, record: &LicenseRecord) -> StorageResult<()> {
        let json = serde_json::to_string(record)?;
        let conn = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
        conn.execute(
            "INSERT OR REPLACE INTO licenses (key, status, record, updated_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                record.key().as_str(),
                record.status().as_str(),
                json,
                Utc::now().to_rfc3339(),
            ],
        )
        .map_err(|e| {
            warn!(key = %record.key(), error = %e, "failed to persist license record");
            StorageError::Unavailable(format!("failed to write license {}: {e}", record.key()))
        })?;
        debug!(key = %record.key(), status = %record.status(), "persisted license record");
        Ok(())
    }
}

impl LicenseStore for SqliteStore {
    fn get(&self, key: &LicenseKey) -> StorageResult<Option<LicenseRecord>> {
        Ok(self.table.get(key))
    }

    fn put(&self, record: LicenseRecord) -> StorageResult<()> {
        self.table.put(record, |r| self.write_record(r))
    }

    fn insert_new(&self, record: LicenseRecord) -> StorageResult<bool> {
        self.table.insert_new(record, |r| self.write_record(r))
    }

    fn compare_and_mutate(
        &self,
        key: &LicenseKey,
        mutate: &mut dyn FnMut(&mut LicenseRecord) -> bool,
    ) -> StorageResult<Option<LicenseRecord>> {
        self.table
            .mutate(key, |record| mutate(record), |r| self.write_record(r))
    }

    fn list_all(&self) -> StorageResult<Vec<LicenseRecord>> {
        Ok(self.table.snapshot())
    }

    fn len(&self) -> StorageResult<usize> {
        Ok(self.table.len())
    }
}

fn init_schema(conn: &Connection) -> StorageResult<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS licenses (
            key TEXT PRIMARY KEY,
            status TEXT NOT NULL,
            record TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        ",
    )?;
    check_schema(conn)
}

/// Rejects a pre-existing `licenses` table that lacks the expected columns.
fn check_schema(conn: &Connection) -> StorageResult<()> {
    let mut stmt = conn.prepare("SELECT name FROM pragma_table_info('licenses')")?;
    let columns = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    for required in ["key", "status", "record", "updated_at"] {
        if !columns.iter().any(|c| c == required) {
            return Err(StorageError::InvalidData(format!(
                "licenses table has no {required} column"
            )));
        }
    }
    Ok(())
}

fn load_records(conn: &Connection) -> StorageResult<Vec<LicenseRecord>> {
    let mut stmt = conn.prepare("SELECT key, record FROM licenses ORDER BY key")?;
    let mut rows = stmt.query([])?;

    let mut records = Vec::new();
    while let Some(row) = rows.next()? {
        let key = text_column(row, 0)?;
        let json = text_column(row, 1)?;
        let record: LicenseRecord = serde_json::from_str(&json)?;
        if record.key().as_str() != key {
            return Err(StorageError::InvalidData(format!(
                "row {key} holds record for {}",
                record.key()
            )));
        }
        record
            .verify()
            .map_err(|e| StorageError::InvalidData(e.to_string()))?;
        records.push(record);
    }
    Ok(records)
}

// SQLite columns are dynamically typed, so a TEXT column can still hold a
// blob, a number or bytes that are not UTF-8.
fn text_column(row: &Row<'_>, idx: usize) -> StorageResult<String> {
    match row.get_ref(idx)? {
        ValueRef::Text(bytes) => std::str::from_utf8(bytes)
            .map(str::to_owned)
            .map_err(|e| StorageError::InvalidData(format!("column {idx} is not UTF-8: {e}"))),
        other => Err(StorageError::InvalidData(format!(
            "column {idx} holds {} instead of text",
            other.data_type()
        ))),
    }
}

fn is_corruption(err: &StorageError) -> bool {
    match err {
        StorageError::Database(rusqlite::Error::SqliteFailure(e, _)) => {
            matches!(e.code, ErrorCode::NotADatabase | ErrorCode::DatabaseCorrupt)
        }
        StorageError::Database(
            rusqlite::Error::InvalidColumnType(..)
            | rusqlite::Error::FromSqlConversionFailure(..)
            | rusqlite::Error::Utf8Error(_),
        ) => true,
        StorageError::Serialization(_) | StorageError::InvalidData(_) => true,
        _ => false,
    }
}

/// Picks `<path>.corrupt-<unix-ts>`, adding a counter if that name is taken.
fn quarantine_path(path: &Path) -> PathBuf {
    let stamp = Utc::now().timestamp();
    let mut candidate = sidecar_path(path, &format!(".corrupt-{stamp}"));
    let mut attempt = 1u32;
    while candidate.exists() {
        candidate = sidecar_path(path, &format!(".corrupt-{stamp}-{attempt}"));
        attempt += 1;
    }
    candidate
}

fn sidecar_path(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(suffix);
    PathBuf::from(name)
}
