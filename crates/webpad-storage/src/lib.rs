use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use thiserror::Error;
use tracing::debug;
use webpad_core::OpenTab;

pub const SNAPSHOT_SCHEMA_VERSION: i64 = 1;
pub const OPEN_FILES_KEY: &str = "editor_open_files";
pub const ACTIVE_FILE_KEY: &str = "editor_active_file";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("timestamp parse error: {0}")]
    Timestamp(String),
    #[error("unsupported schema version {found}, max supported {supported}")]
    UnsupportedSchemaVersion { found: i64, supported: i64 },
}

/// The open-tab set and active selection as persisted between runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub open_tabs: Vec<OpenTab>,
    pub active_id: Option<String>,
}

impl SessionSnapshot {
    pub fn new(open_tabs: Vec<OpenTab>, active_id: Option<String>) -> Self {
        Self {
            open_tabs,
            active_id,
        }
    }
}

/// Durable home for the session snapshot.
pub trait SnapshotBackend: Send {
    /// `Ok(None)` when nothing has been saved yet.
    fn load(&mut self) -> Result<Option<SessionSnapshot>, StorageError>;
    /// Overwrites whatever was saved before.
    fn save(&mut self, snapshot: &SessionSnapshot) -> Result<(), StorageError>;
    fn clear(&mut self) -> Result<(), StorageError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredEntry {
    pub key: String,
    pub value: String,
    pub updated_at: DateTime<Utc>,
}

pub struct SnapshotStore {
    conn: Connection,
}

impl SnapshotStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        let store = Self { conn };
        store.migrate()?;
        debug!(event = "snapshot_store_open", path = %path.display());
        Ok(store)
    }

    pub fn open_in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.migrate()?;
        Ok(store)
    }

    pub fn schema_version(&self) -> Result<i64, StorageError> {
        Ok(self
            .conn
            .query_row("PRAGMA user_version", [], |row| row.get(0))?)
    }

    pub fn migrate(&self) -> Result<(), StorageError> {
        let current = self.schema_version()?;
        if current > SNAPSHOT_SCHEMA_VERSION {
            return Err(StorageError::UnsupportedSchemaVersion {
                found: current,
                supported: SNAPSHOT_SCHEMA_VERSION,
            });
        }

        if current < 1 {
            let sql = include_str!("../migrations/0001_session_entries.sql");
            self.conn.execute_batch(sql)?;
            self.conn
                .execute("PRAGMA user_version = 1", [])
                .map(|_| ())?;
        }

        Ok(())
    }

    pub fn put_entry(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.conn.execute(
            "
            INSERT INTO session_entries (key, value, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET
                value=excluded.value,
                updated_at=excluded.updated_at
            ",
            params![key, value, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    pub fn entry(&self, key: &str) -> Result<Option<StoredEntry>, StorageError> {
        let row = self
            .conn
            .query_row(
                "
                SELECT key, value, updated_at
                FROM session_entries
                WHERE key = ?1
                ",
                [key],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                    ))
                },
            )
            .optional()?;

        let Some((key, value, updated_at)) = row else {
            return Ok(None);
        };
        Ok(Some(StoredEntry {
            key,
            value,
            updated_at: parse_ts(&updated_at)?,
        }))
    }

    pub fn remove_entry(&self, key: &str) -> Result<bool, StorageError> {
        let changes = self
            .conn
            .execute("DELETE FROM session_entries WHERE key = ?1", [key])?;
        Ok(changes > 0)
    }

    pub fn load_snapshot(&self) -> Result<Option<SessionSnapshot>, StorageError> {
        let Some(open_files) = self.entry(OPEN_FILES_KEY)? else {
            return Ok(None);
        };
        let open_tabs: Vec<OpenTab> = serde_json::from_str(&open_files.value)
            .map_err(|err| StorageError::Serialization(err.to_string()))?;
        let active_id = self
            .entry(ACTIVE_FILE_KEY)?
            .map(|entry| entry.value)
            .filter(|value| !value.is_empty());

        Ok(Some(SessionSnapshot {
            open_tabs,
            active_id,
        }))
    }

    pub fn save_snapshot(&self, snapshot: &SessionSnapshot) -> Result<(), StorageError> {
        let open_files = serde_json::to_string(&snapshot.open_tabs)
            .map_err(|err| StorageError::Serialization(err.to_string()))?;
        let active = snapshot.active_id.as_deref().unwrap_or("");

        let tx = self.conn.unchecked_transaction()?;
        self.put_entry(OPEN_FILES_KEY, &open_files)?;
        self.put_entry(ACTIVE_FILE_KEY, active)?;
        tx.commit()?;

        debug!(
            event = "snapshot_saved",
            tabs = snapshot.open_tabs.len(),
            active = active
        );
        Ok(())
    }

    pub fn clear_snapshot(&self) -> Result<(), StorageError> {
        let tx = self.conn.unchecked_transaction()?;
        self.remove_entry(OPEN_FILES_KEY)?;
        self.remove_entry(ACTIVE_FILE_KEY)?;
        tx.commit()?;
        debug!(event = "snapshot_cleared");
        Ok(())
    }

    pub fn table_exists(&self, table_name: &str) -> Result<bool, StorageError> {
        let exists = self
            .conn
            .query_row(
                "
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
                ",
                [table_name],
                |row| row.get::<_, i64>(0),
            )
            .optional()?;
        Ok(exists.is_some())
    }
}

impl SnapshotBackend for SnapshotStore {
    fn load(&mut self) -> Result<Option<SessionSnapshot>, StorageError> {
        self.load_snapshot()
    }

    fn save(&mut self, snapshot: &SessionSnapshot) -> Result<(), StorageError> {
        self.save_snapshot(snapshot)
    }

    fn clear(&mut self) -> Result<(), StorageError> {
        self.clear_snapshot()
    }
}

fn parse_ts(value: &str) -> Result<DateTime<Utc>, StorageError> {
    DateTime::parse_from_rfc3339(value)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|err| StorageError::Timestamp(err.to_string()))
}
