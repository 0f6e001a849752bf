//! FFI use-case API for Flutter-facing calls.
//!
//! # Responsibility
//! - Expose the record store operations to Dart via FRB.
//! - Hold the one process-wide store session and the shared error slot.
//!
//! # Invariants
//! - Exported functions must not panic across FFI boundary.
//! - Every failed operation overwrites the error slot; only `clear_error`
//!   or a later failure changes it.
//! - Calls are serialized through one session lock.

use giftbook_core::{
    core_version as core_version_inner, init_logging as init_logging_inner, ping as ping_inner,
    default_log_level, Idea, LoadOutcome, LocalRecordStore, Person, StoreConfig, DOB_FORMAT,
};
use log::warn;
use std::sync::{Mutex, MutexGuard, PoisonError};

static SESSION: Mutex<Option<LocalRecordStore>> = Mutex::new(None);
static LAST_ERROR: Mutex<Option<String>> = Mutex::new(None);

/// Minimal health-check API for FRB smoke integration.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Expose core crate version through FFI.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes Rust core logging once per process.
///
/// A blank `level` selects the build-mode default (`debug`/`info`).
///
/// # FFI contract
/// - Safe to call repeatedly with the same `level + log_dir` (idempotent).
/// - Never panics; returns empty string on success and error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(effective_log_level(&level), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err.to_string(),
    }
}

/// Person row returned to the UI.
#[derive(Debug, Clone, PartialEq)]
pub struct PersonItem {
    pub id: String,
    pub name: String,
    /// `YYYY-MM-DD`.
    pub dob: String,
    pub idea_count: u32,
}

/// Idea row returned to the UI.
#[derive(Debug, Clone, PartialEq)]
pub struct IdeaItem {
    pub id: String,
    pub text: String,
    /// Permanent asset path.
    pub img: String,
    pub width: f64,
    pub height: f64,
}

/// Opens storage and loads the collection.
///
/// `data_dir` falls back to `GIFTBOOK_DATA_DIR`, then the system temp dir.
/// An already open session is flushed and replaced.
///
/// # FFI contract
/// - Returns empty string on success and error message on failure.
/// - A corrupt stored collection is not an error; it starts empty.
#[flutter_rust_bridge::frb(sync)]
pub fn init_store(data_dir: Option<String>) -> String {
    let config = match data_dir.as_deref().map(str::trim) {
        Some(dir) if !dir.is_empty() => StoreConfig::from_data_dir(dir),
        _ => StoreConfig::from_env(),
    };

    let mut session = lock(&SESSION);
    if let Some(previous) = session.as_mut() {
        if let Err(err) = previous.flush() {
            warn!("event=store_replace module=ffi status=error error={err}");
        }
    }

    match config.open() {
        Ok((store, outcome)) => {
            if let LoadOutcome::Recovered { reason } = &outcome {
                warn!("event=store_open module=ffi status=recovered reason={reason}");
            }
            *session = Some(store);
            String::new()
        }
        Err(err) => {
            *session = None;
            let message = format!("init_store failed: {err}");
            set_error(message.clone());
            message
        }
    }
}

/// Flushes and closes the session. No-op when nothing is open.
#[flutter_rust_bridge::frb(sync)]
pub fn shutdown_store() -> String {
    let Some(mut store) = lock(&SESSION).take() else {
        return String::new();
    };
    match store.flush() {
        Ok(()) => String::new(),
        Err(err) => {
            let message = format!("shutdown_store failed: {err}");
            set_error(message.clone());
            message
        }
    }
}

/// Adds a person; returns `None` and sets the error slot on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn add_person(name: String, dob: String) -> Option<PersonItem> {
    with_store("add_person", |store| store.add_person(&name, &dob))
        .map(|person| to_person_item(&person))
}

/// Deletes a person with all ideas and their photos.
#[flutter_rust_bridge::frb(sync)]
pub fn delete_person(person_id: String) -> bool {
    with_store("delete_person", |store| store.delete_person(&person_id)).is_some()
}

/// Ideas of one person; empty when the person or session is missing.
#[flutter_rust_bridge::frb(sync)]
pub fn get_person_ideas(person_id: String) -> Vec<IdeaItem> {
    read_store(|store| {
        store
            .get_person_ideas(&person_id)
            .iter()
            .map(to_idea_item)
            .collect()
    })
}

/// Adds an idea; `image_path` is the transient capture to take ownership of.
///
/// Returns `None` when the person does not exist (error slot untouched) or
/// when the operation failed (error slot set).
#[flutter_rust_bridge::frb(sync)]
pub fn add_idea(
    person_id: String,
    text: String,
    image_path: String,
    width: f64,
    height: f64,
) -> Option<IdeaItem> {
    with_store("add_idea", |store| {
        store.add_idea(&person_id, &text, image_path.as_str(), width, height)
    })
    .flatten()
    .map(|idea| to_idea_item(&idea))
}

/// Deletes one idea and its photo.
#[flutter_rust_bridge::frb(sync)]
pub fn delete_idea(person_id: String, idea_id: String) -> bool {
    with_store("delete_idea", |store| store.delete_idea(&person_id, &idea_id)).is_some()
}

/// People ordered by upcoming-birthday position in the year.
#[flutter_rust_bridge::frb(sync)]
pub fn get_sorted_people() -> Vec<PersonItem> {
    read_store(|store| {
        store
            .get_sorted_people()
            .into_iter()
            .map(to_person_item)
            .collect()
    })
}

/// Current error message, if any.
#[flutter_rust_bridge::frb(sync)]
pub fn last_error() -> Option<String> {
    lock(&LAST_ERROR).clone()
}

/// Puts a UI-side message (e.g. form validation) into the error slot.
#[flutter_rust_bridge::frb(sync)]
pub fn set_error(message: String) {
    *lock(&LAST_ERROR) = Some(message);
}

/// Empties the error slot.
#[flutter_rust_bridge::frb(sync)]
pub fn clear_error() {
    *lock(&LAST_ERROR) = None;
}

fn effective_log_level(level: &str) -> &str {
    if level.trim().is_empty() {
        default_log_level()
    } else {
        level
    }
}

fn with_store<T>(
    op: &'static str,
    f: impl FnOnce(&mut LocalRecordStore) -> giftbook_core::StoreResult<T>,
) -> Option<T> {
    let mut session = lock(&SESSION);
    let Some(store) = session.as_mut() else {
        set_error(format!("{op} failed: store is not initialized"));
        return None;
    };
    match f(store) {
        Ok(value) => Some(value),
        Err(err) => {
            set_error(format!("{op} failed: {err}"));
            None
        }
    }
}

fn read_store<T: Default>(f: impl FnOnce(&LocalRecordStore) -> T) -> T {
    lock(&SESSION).as_ref().map(f).unwrap_or_default()
}

// A panic inside a previous call must not make every later call panic too.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn to_person_item(person: &Person) -> PersonItem {
    PersonItem {
        id: person.id.clone(),
        name: person.name.clone(),
        dob: person.dob.format(DOB_FORMAT).to_string(),
        idea_count: u32::try_from(person.ideas.len()).unwrap_or(u32::MAX),
    }
}

fn to_idea_item(idea: &Idea) -> IdeaItem {
    IdeaItem {
        id: idea.id.clone(),
        text: idea.text.clone(),
        img: idea.img.clone(),
        width: idea.width,
        height: idea.height,
    }
}
