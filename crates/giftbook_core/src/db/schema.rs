//! Key/value table holding the serialized collection.
//!
//! The people blob is stored as JSON under a single key, so the table shape
//! is the only thing versioned here. `PRAGMA user_version` records it.

use super::{DbError, DbResult};
use log::info;
use rusqlite::Connection;

/// Table layout version written by this build.
pub const SCHEMA_VERSION: u32 = 1;

const KV_TABLE_SQL: &str = "
CREATE TABLE IF NOT EXISTS kv_entries (
    key TEXT PRIMARY KEY NOT NULL,
    value TEXT NOT NULL,
    updated_at INTEGER NOT NULL DEFAULT (strftime('%s', 'now') * 1000)
);";

/// Creates the key/value table on a fresh database and stamps its version.
///
/// A database already at [`SCHEMA_VERSION`] is left alone; one stamped with
/// a higher version is rejected with [`DbError::SchemaTooNew`].
pub fn ensure_schema(conn: &mut Connection) -> DbResult<()> {
    let found = stored_version(conn)?;
    if found > SCHEMA_VERSION {
        return Err(DbError::SchemaTooNew {
            found,
            supported: SCHEMA_VERSION,
        });
    }
    if found == SCHEMA_VERSION {
        return Ok(());
    }

    let tx = conn.transaction()?;
    tx.execute_batch(KV_TABLE_SQL)?;
    tx.pragma_update(None, "user_version", SCHEMA_VERSION)?;
    tx.commit()?;
    info!(
        "event=db_schema module=db status=ok from_version={found} to_version={SCHEMA_VERSION}"
    );
    Ok(())
}

/// Version stamped in `PRAGMA user_version`; `0` for a fresh file.
pub fn stored_version(conn: &Connection) -> DbResult<u32> {
    Ok(conn.pragma_query_value(None, "user_version", |row| row.get(0))?)
}
