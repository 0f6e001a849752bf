//! Durable storage contracts for the people collection.
//!
//! # Responsibility
//! - Define the key-value persistence contract used by the record store.
//! - Isolate SQLite and JSON details from store orchestration.
//!
//! # Invariants
//! - The collection is always written in full under one key.

pub mod collection_repo;
