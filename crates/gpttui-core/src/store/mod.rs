mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use crate::constants::storage;
use crate::error::{GptError, Result};
use crate::message::{Message, TimestampedMessage};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

/// Durable, append-only message logs keyed by session name.
///
/// Every mutating call is committed before it returns, so a read on the same
/// store instance always observes earlier writes. After [`close`](Self::close)
/// every call fails with [`GptError::StoreClosed`].
pub trait MessageStore: Send + Sync {
    /// Create an empty log named `name`. No error if it already exists.
    fn create_session(&self, name: &str) -> Result<()>;

    /// Drop the log and all of its messages.
    fn delete_session(&self, name: &str) -> Result<()>;

    /// Append one entry to the tail of the log.
    fn append_message(&self, name: &str, message: &TimestampedMessage) -> Result<()>;

    /// All messages in ascending timestamp order, ties in write order.
    fn list_messages(&self, name: &str) -> Result<Vec<Message>>;

    /// The most recently written message, if any.
    fn last_message(&self, name: &str) -> Result<Option<Message>>;

    /// Highest stored timestamp, `None` for an empty log.
    fn last_timestamp(&self, name: &str) -> Result<Option<i64>>;

    fn session_exists(&self, name: &str) -> Result<bool>;

    /// Names of all stored sessions, sorted.
    fn list_sessions(&self) -> Result<Vec<String>>;

    /// Release the underlying connection. Closing twice is a no-op.
    fn close(&self) -> Result<()>;
}

/// Supported storage backends.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    Sqlite,
    Memory,
}

impl std::str::FromStr for StoreKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sqlite" => Ok(StoreKind::Sqlite),
            "memory" => Ok(StoreKind::Memory),
            other => Err(format!("unknown database kind '{other}' (expected sqlite or memory)")),
        }
    }
}

/// Open a store of the given kind. `path` is ignored for the memory store.
pub fn open_store(kind: StoreKind, path: &Path) -> Result<Arc<dyn MessageStore>> {
    match kind {
        StoreKind::Sqlite => Ok(Arc::new(SqliteStore::open(path)?)),
        StoreKind::Memory => Ok(Arc::new(MemoryStore::new())),
    }
}

/// Session names double as storage namespaces (SQLite table names), so only
/// plain identifiers are accepted.
pub fn validate_session_name(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let valid_start = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    let valid_rest = chars.all(|c| c.is_ascii_alphanumeric() || c == '_');

    if !valid_start
        || !valid_rest
        || name.len() > storage::MAX_SESSION_NAME_LEN
        || name.to_ascii_lowercase().starts_with(storage::RESERVED_PREFIX)
    {
        return Err(GptError::InvalidSessionName(name.to_string()));
    }
    Ok(())
}

/// Storage key for a session. Names are case-insensitive: `Chat` and `chat`
/// address the same log.
pub fn session_key(name: &str) -> Result<String> {
    validate_session_name(name)?;
    Ok(name.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_session_name_accepts_identifiers() {
        for name in ["default_session", "chat0", "_private", "A"] {
            assert!(validate_session_name(name).is_ok(), "{name}");
        }
    }

    #[test]
    fn test_session_key_folds_case() {
        assert_eq!(session_key("Chat").unwrap(), "chat");
        assert_eq!(session_key("chat").unwrap(), "chat");
        assert!(session_key("Sqlite_x").is_err());
    }

    #[test]
    fn test_validate_session_name_rejects_injection_and_reserved() {
        let too_long = "a".repeat(65);
        for name in [
            "",
            "0chat",
            "drop table x",
            "a;b",
            "x\"y",
            "sqlite_master",
            "SQLITE_seq",
            too_long.as_str(),
        ] {
            assert!(
                matches!(validate_session_name(name), Err(GptError::InvalidSessionName(_))),
                "{name}"
            );
        }
    }
}
