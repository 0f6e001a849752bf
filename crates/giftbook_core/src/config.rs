//! Storage location configuration and store bootstrap.
//!
//! # Responsibility
//! - Resolve where the collection database and asset directory live.
//! - Open a fully wired, loaded record store from that configuration.
//!
//! # Invariants
//! - Database file and asset directory always live under one data directory.

use crate::asset::asset_store::{AssetError, FsAssetStore};
use crate::db::{open_db, DbError};
use crate::repo::collection_repo::SqliteCollectionStore;
use crate::service::record_store::{LoadOutcome, RecordStore};
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "GIFTBOOK_DATA_DIR";
const DB_FILE_NAME: &str = "giftbook.sqlite3";
const ASSET_DIR_NAME: &str = "assets";
const DEFAULT_DIR_NAME: &str = "giftbook";

/// Record store backed by SQLite and the local filesystem.
pub type LocalRecordStore = RecordStore<SqliteCollectionStore, FsAssetStore>;

/// Resolved storage locations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub db_path: PathBuf,
    pub asset_dir: PathBuf,
}

impl StoreConfig {
    /// Lays out the database file and asset directory under `data_dir`.
    pub fn from_data_dir(data_dir: impl AsRef<Path>) -> Self {
        let data_dir = data_dir.as_ref();
        Self {
            db_path: data_dir.join(DB_FILE_NAME),
            asset_dir: data_dir.join(ASSET_DIR_NAME),
        }
    }

    /// Uses `GIFTBOOK_DATA_DIR` when set and non-blank, otherwise a
    /// `giftbook` directory under the system temp dir.
    pub fn from_env() -> Self {
        let data_dir = std::env::var(DATA_DIR_ENV)
            .ok()
            .map(|raw| raw.trim().to_string())
            .filter(|value| !value.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| std::env::temp_dir().join(DEFAULT_DIR_NAME));
        Self::from_data_dir(data_dir)
    }

    /// Opens storage and loads the collection.
    pub fn open(&self) -> Result<(LocalRecordStore, LoadOutcome), OpenStoreError> {
        let conn = open_db(&self.db_path)?;
        let assets = FsAssetStore::new(&self.asset_dir)?;
        info!(
            "event=store_open module=config status=ok db_path={} asset_dir={}",
            self.db_path.display(),
            assets.root().display()
        );
        let mut store = RecordStore::new(SqliteCollectionStore::new(conn), assets);
        let outcome = store.load();
        Ok((store, outcome))
    }
}

/// Failure to bring up local storage.
#[derive(Debug)]
pub enum OpenStoreError {
    Db(DbError),
    Asset(AssetError),
}

impl Display for OpenStoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Asset(err) => write!(f, "{err}"),
        }
    }
}

impl Error for OpenStoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Asset(err) => Some(err),
        }
    }
}

impl From<DbError> for OpenStoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<AssetError> for OpenStoreError {
    fn from(value: AssetError) -> Self {
        Self::Asset(value)
    }
}
