//! Flutter bridge surface for GiftBook core.
//!
//! Exposes the record store through plain-data, never-panicking calls.

pub mod api;
