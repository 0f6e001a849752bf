//! Durable key-value collection store and blob codec.
//!
//! # Responsibility
//! - Provide a minimal `get`/`put` contract over durable key-value storage.
//! - Encode/decode the full people sequence as one JSON blob.
//!
//! # Invariants
//! - `put` replaces the whole value for a key; there are no partial writes.
//! - Decoded collections are validated; invalid persisted state is rejected
//!   instead of masked.

use crate::db::DbError;
use crate::model::person::{required_text, validate_dimension, Person};
use log::debug;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::{Arc, Mutex};

/// Storage key under which the people sequence is persisted.
pub const PEOPLE_KEY: &str = "people";

pub type CollectionResult<T> = Result<T, CollectionStoreError>;

/// Errors from durable collection storage and blob encoding.
#[derive(Debug)]
pub enum CollectionStoreError {
    Db(DbError),
    /// In-memory backend lock was poisoned by a panicking writer.
    LockPoisoned(&'static str),
    Encode(serde_json::Error),
    Decode(serde_json::Error),
    /// Blob is well-formed JSON but violates model invariants.
    InvalidData(String),
}

impl Display for CollectionStoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::LockPoisoned(op) => write!(f, "collection store lock poisoned during {op}"),
            Self::Encode(err) => write!(f, "failed to encode people collection: {err}"),
            Self::Decode(err) => write!(f, "failed to decode people collection: {err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted people data: {message}"),
        }
    }
}

impl Error for CollectionStoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Encode(err) | Self::Decode(err) => Some(err),
            Self::LockPoisoned(_) | Self::InvalidData(_) => None,
        }
    }
}

impl From<DbError> for CollectionStoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for CollectionStoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Durable key-value persistence used for the whole collection.
pub trait CollectionStore {
    /// Returns the stored value, or `None` when the key was never written.
    fn get(&self, key: &str) -> CollectionResult<Option<String>>;
    /// Replaces the stored value for `key`.
    fn put(&self, key: &str, value: &str) -> CollectionResult<()>;
}

/// SQLite-backed store over the `kv_entries` table.
///
/// Owns its connection so a record store can hold it for the process
/// lifetime.
pub struct SqliteCollectionStore {
    conn: Connection,
}

impl SqliteCollectionStore {
    /// Wraps a connection returned by [`open_db`](crate::db::open_db) or
    /// [`open_db_in_memory`](crate::db::open_db_in_memory).
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl CollectionStore for SqliteCollectionStore {
    fn get(&self, key: &str) -> CollectionResult<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM kv_entries WHERE key = ?1;",
                [key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    fn put(&self, key: &str, value: &str) -> CollectionResult<()> {
        self.conn.execute(
            "INSERT INTO kv_entries (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = (strftime('%s', 'now') * 1000);",
            params![key, value],
        )?;
        debug!(
            "event=kv_put module=repo status=ok key={key} bytes={}",
            value.len()
        );
        Ok(())
    }
}

/// In-memory store. Clones share the same underlying map.
#[derive(Debug, Clone, Default)]
pub struct MemoryCollectionStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryCollectionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CollectionStore for MemoryCollectionStore {
    fn get(&self, key: &str) -> CollectionResult<Option<String>> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| CollectionStoreError::LockPoisoned("get"))?;
        Ok(entries.get(key).cloned())
    }

    fn put(&self, key: &str, value: &str) -> CollectionResult<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| CollectionStoreError::LockPoisoned("put"))?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Serializes the full people sequence.
pub fn encode_people(people: &[Person]) -> CollectionResult<String> {
    serde_json::to_string(people).map_err(CollectionStoreError::Encode)
}

/// Deserializes and validates a people sequence.
pub fn decode_people(blob: &str) -> CollectionResult<Vec<Person>> {
    let people: Vec<Person> = serde_json::from_str(blob).map_err(CollectionStoreError::Decode)?;
    for person in &people {
        validate_persisted(person)?;
    }
    Ok(people)
}

fn validate_persisted(person: &Person) -> CollectionResult<()> {
    let invalid = |detail: String| {
        CollectionStoreError::InvalidData(format!("person `{}`: {detail}", person.id))
    };

    if person.id.is_empty() {
        return Err(CollectionStoreError::InvalidData(
            "person with empty id".to_string(),
        ));
    }
    required_text("name", &person.name).map_err(|err| invalid(err.to_string()))?;

    for idea in &person.ideas {
        if idea.id.is_empty() {
            return Err(invalid("idea with empty id".to_string()));
        }
        required_text("text", &idea.text)
            .and_then(|_| required_text("image", &idea.img))
            .and_then(|_| validate_dimension("width", idea.width))
            .and_then(|_| validate_dimension("height", idea.height))
            .map_err(|err| invalid(format!("idea `{}`: {err}", idea.id)))?;
    }
    Ok(())
}
