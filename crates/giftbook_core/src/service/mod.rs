//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate collection storage and asset storage into record operations.
//! - Keep UI/FFI layers decoupled from storage details.

pub mod record_store;
