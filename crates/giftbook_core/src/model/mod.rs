//! Domain model for people and their gift ideas.
//!
//! # Responsibility
//! - Define the records held in the in-memory collection.
//! - Keep input validation next to the types it protects.
//!
//! # Invariants
//! - Every person and idea carries an opaque id from an injected generator.
//! - Ideas are owned exclusively by one person.

pub mod id;
pub mod person;
