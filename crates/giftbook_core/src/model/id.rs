//! Identifier generation capability.
//!
//! The record store trusts its generator for uniqueness and never checks
//! for collisions itself.

use uuid::Uuid;

/// Produces a fresh opaque identifier on every call.
pub trait IdGenerator {
    fn next_id(&self) -> String;
}

/// Default generator backed by random UUID v4 strings.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidIdGenerator;

impl IdGenerator for UuidIdGenerator {
    fn next_id(&self) -> String {
        Uuid::new_v4().to_string()
    }
}

/// Any `Fn() -> String` closure can stand in for a generator, which keeps
/// deterministic ids cheap to set up in tests.
impl<F> IdGenerator for F
where
    F: Fn() -> String,
{
    fn next_id(&self) -> String {
        self()
    }
}
