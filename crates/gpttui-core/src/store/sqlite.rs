//! SQLite-backed message store.
//!
//! One table per session: `(id, role, content, timestamp)`. Reads order by
//! `timestamp` and fall back to the autoincrement `id`, so rows written within
//! the same second keep their write order.
//!
//! SQLite resolves table names case-insensitively, so every operation works on
//! the lowercased [`session_key`].

use super::{session_key, MessageStore};
use crate::error::{GptError, Result};
use crate::message::{Message, Role, TimestampedMessage};
use rusqlite::{params, Connection, OptionalExtension};
use std::fs;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

pub struct SqliteStore {
    conn: Mutex<Option<Connection>>,
}

impl SqliteStore {
    /// Open (or create) the database file at `path`, creating parent directories.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| {
                    GptError::StoreUnavailable(format!(
                        "Failed to create database directory {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }
        let conn = Connection::open(path)?;
        debug!("Opened SQLite store at {}", path.display());
        Ok(Self::from_connection(conn))
    }

    /// Private in-memory database (useful for testing)
    pub fn open_in_memory() -> Result<Self> {
        Ok(Self::from_connection(Connection::open_in_memory()?))
    }

    fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(Some(conn)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<Connection>> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Run `f` against the open connection, or fail with `StoreClosed`.
    fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let guard = self.lock();
        let conn = guard.as_ref().ok_or(GptError::StoreClosed)?;
        f(conn)
    }

    fn table_exists(conn: &Connection, name: &str) -> Result<bool> {
        let found = conn
            .query_row(
                "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1 COLLATE NOCASE",
                params![name],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn require_table(conn: &Connection, name: &str) -> Result<()> {
        if Self::table_exists(conn, name)? {
            Ok(())
        } else {
            Err(GptError::NotFound(name.to_string()))
        }
    }

    fn row_to_message(role: String, content: String) -> Result<Message> {
        let role: Role = role
            .parse()
            .map_err(|e: String| GptError::StoreUnavailable(format!("Corrupt message row: {e}")))?;
        Ok(Message { role, content })
    }
}

impl MessageStore for SqliteStore {
    fn create_session(&self, name: &str) -> Result<()> {
        let name = session_key(name)?;
        self.with_conn(|conn| {
            conn.execute_batch(&format!(
                "CREATE TABLE IF NOT EXISTS \"{name}\" (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    role TEXT NOT NULL,
                    content TEXT NOT NULL,
                    timestamp INTEGER NOT NULL
                );"
            ))?;
            Ok(())
        })
    }

    fn delete_session(&self, name: &str) -> Result<()> {
        let name = session_key(name)?;
        self.with_conn(|conn| {
            Self::require_table(conn, &name)?;
            conn.execute_batch(&format!("DROP TABLE \"{name}\";"))?;
            debug!("Dropped session table {}", name);
            Ok(())
        })
    }

    fn append_message(&self, name: &str, message: &TimestampedMessage) -> Result<()> {
        let name = session_key(name)?;
        self.with_conn(|conn| {
            Self::require_table(conn, &name)?;
            conn.execute(
                &format!("INSERT INTO \"{name}\" (role, content, timestamp) VALUES (?1, ?2, ?3)"),
                params![
                    message.message.role.as_str(),
                    message.message.content,
                    message.timestamp
                ],
            )?;
            Ok(())
        })
    }

    fn list_messages(&self, name: &str) -> Result<Vec<Message>> {
        let name = session_key(name)?;
        self.with_conn(|conn| {
            Self::require_table(conn, &name)?;
            let mut stmt = conn.prepare(&format!(
                "SELECT role, content FROM \"{name}\" ORDER BY timestamp ASC, id ASC"
            ))?;
            let rows = stmt.query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?;

            let mut messages = Vec::new();
            for row in rows {
                let (role, content) = row?;
                messages.push(Self::row_to_message(role, content)?);
            }
            Ok(messages)
        })
    }

    fn last_message(&self, name: &str) -> Result<Option<Message>> {
        let name = session_key(name)?;
        self.with_conn(|conn| {
            Self::require_table(conn, &name)?;
            let row = conn
                .query_row(
                    &format!(
                        "SELECT role, content FROM \"{name}\" ORDER BY timestamp DESC, id DESC LIMIT 1"
                    ),
                    [],
                    |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
                )
                .optional()?;
            row.map(|(role, content)| Self::row_to_message(role, content))
                .transpose()
        })
    }

    fn last_timestamp(&self, name: &str) -> Result<Option<i64>> {
        let name = session_key(name)?;
        self.with_conn(|conn| {
            Self::require_table(conn, &name)?;
            let max = conn.query_row(
                &format!("SELECT MAX(timestamp) FROM \"{name}\""),
                [],
                |row| row.get::<_, Option<i64>>(0),
            )?;
            Ok(max)
        })
    }

    fn session_exists(&self, name: &str) -> Result<bool> {
        let name = session_key(name)?;
        self.with_conn(|conn| Self::table_exists(conn, &name))
    }

    fn list_sessions(&self) -> Result<Vec<String>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT lower(name) AS session FROM sqlite_master
                 WHERE type = 'table' AND lower(substr(name, 1, 7)) <> 'sqlite_'
                 ORDER BY session",
            )?;
            let names = stmt
                .query_map([], |row| row.get::<_, String>(0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(names)
        })
    }

    fn close(&self) -> Result<()> {
        let mut guard = self.lock();
        if let Some(conn) = guard.take() {
            conn.close().map_err(|(_, e)| GptError::from(e))?;
            debug!("Closed SQLite store");
        }
        Ok(())
    }
}
