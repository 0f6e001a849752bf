//! Binary assets (idea photographs).
//!
//! # Responsibility
//! - Relocate transient captures into app-owned storage.
//! - Remove assets whose owning idea was deleted.
//!
//! # Invariants
//! - Each asset is referenced by exactly one idea; no reference counting.

pub mod asset_store;
