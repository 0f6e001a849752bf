//! Core persistence logic for GiftBook.
//! This crate owns the people/idea collection and its image assets.

pub mod asset;
pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use asset::asset_store::{AssetError, AssetResult, AssetStore, FsAssetStore};
pub use config::{LocalRecordStore, OpenStoreError, StoreConfig, DATA_DIR_ENV};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::id::{IdGenerator, UuidIdGenerator};
pub use model::person::{Idea, IdeaId, Person, PersonId, ValidationError, DOB_FORMAT};
pub use repo::collection_repo::{
    decode_people, encode_people, CollectionResult, CollectionStore, CollectionStoreError,
    MemoryCollectionStore, SqliteCollectionStore, PEOPLE_KEY,
};
pub use service::record_store::{LoadOutcome, RecordStore, StoreError, StoreResult};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
