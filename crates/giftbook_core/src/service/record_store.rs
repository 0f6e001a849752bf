//! Record store: the single in-memory source of truth for people and ideas.
//!
//! # Responsibility
//! - Own the people collection for the process lifetime.
//! - Apply validated mutations, coordinating asset commits/removals.
//! - Persist the full collection after every successful mutation.
//!
//! # Invariants
//! - Validation and asset-commit failures leave the collection untouched.
//! - A persist failure keeps the in-memory mutation and marks the store
//!   dirty until a later persist succeeds.
//! - Asset removal failures are logged and never undo a record deletion.
//! - Stored order is insertion order; sorting happens at read time only.

use crate::asset::asset_store::{AssetError, AssetStore};
use crate::model::id::{IdGenerator, UuidIdGenerator};
use crate::model::person::{
    parse_dob, required_text, validate_dimension, Idea, Person, ValidationError,
};
use crate::repo::collection_repo::{
    decode_people, encode_people, CollectionStore, CollectionStoreError, PEOPLE_KEY,
};
use log::{debug, error, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;

pub type StoreResult<T> = Result<T, StoreError>;

/// Typed failure of a record store operation.
#[derive(Debug)]
pub enum StoreError {
    /// Missing or malformed input; nothing was mutated.
    Validation(ValidationError),
    /// Asset commit failed; nothing was mutated.
    Asset(AssetError),
    /// Durable write failed; the in-memory mutation was kept.
    Persist(CollectionStoreError),
}

impl StoreError {
    /// Stable machine-readable error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::Asset(_) => "asset_io",
            Self::Persist(_) => "persist",
        }
    }
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Asset(err) => write!(f, "{err}"),
            Self::Persist(err) => write!(f, "failed to save people: {err}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Asset(err) => Some(err),
            Self::Persist(err) => Some(err),
        }
    }
}

impl From<ValidationError> for StoreError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<AssetError> for StoreError {
    fn from(value: AssetError) -> Self {
        Self::Asset(value)
    }
}

/// Result of the startup load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Nothing stored yet; started with an empty collection.
    Empty,
    /// Stored collection restored.
    Loaded { people: usize },
    /// Stored collection was unreadable or malformed; started empty.
    Recovered { reason: String },
}

/// In-memory people collection synchronized with durable storage.
pub struct RecordStore<S: CollectionStore, A: AssetStore> {
    collection: S,
    assets: A,
    ids: Box<dyn IdGenerator + Send>,
    people: Vec<Person>,
    dirty: bool,
}

impl<S: CollectionStore, A: AssetStore> RecordStore<S, A> {
    /// Creates an empty store using random UUID identifiers.
    ///
    /// Call [`load`](Self::load) before serving reads.
    pub fn new(collection: S, assets: A) -> Self {
        Self::with_id_generator(collection, assets, UuidIdGenerator)
    }

    /// Creates an empty store with a caller-provided identifier generator.
    pub fn with_id_generator(
        collection: S,
        assets: A,
        ids: impl IdGenerator + Send + 'static,
    ) -> Self {
        Self {
            collection,
            assets,
            ids: Box::new(ids),
            people: Vec::new(),
            dirty: false,
        }
    }

    /// Replaces the in-memory collection with the durable one.
    ///
    /// Never fails: unreadable or malformed state degrades to an empty
    /// collection and is reported as [`LoadOutcome::Recovered`].
    ///
    /// In-memory changes that never reached durable storage (see
    /// [`is_dirty`](Self::is_dirty)) are discarded; call
    /// [`flush`](Self::flush) first to keep them.
    pub fn load(&mut self) -> LoadOutcome {
        if self.dirty {
            warn!(
                "event=store_load module=service status=warn error_code=unsaved_changes_discarded people={}",
                self.people.len()
            );
        }
        self.dirty = false;
        let loaded = self
            .collection
            .get(PEOPLE_KEY)
            .and_then(|blob| blob.map(|blob| decode_people(&blob)).transpose());

        match loaded {
            Ok(None) => {
                self.people = Vec::new();
                info!("event=store_load module=service status=ok people=0 source=empty");
                LoadOutcome::Empty
            }
            Ok(Some(people)) => {
                self.people = people;
                info!(
                    "event=store_load module=service status=ok people={} source=stored",
                    self.people.len()
                );
                LoadOutcome::Loaded {
                    people: self.people.len(),
                }
            }
            Err(err) => {
                self.people = Vec::new();
                warn!(
                    "event=store_load module=service status=recovered error_code=load_failed error={}",
                    err
                );
                LoadOutcome::Recovered {
                    reason: err.to_string(),
                }
            }
        }
    }

    /// People in stored (insertion) order.
    pub fn people(&self) -> &[Person] {
        &self.people
    }

    pub fn get_person(&self, person_id: &str) -> Option<&Person> {
        self.people.iter().find(|person| person.id == person_id)
    }

    /// Whether memory holds changes the durable store has not accepted.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Adds a person with no ideas and persists the collection.
    ///
    /// `dob` must be a `YYYY-MM-DD` date.
    pub fn add_person(&mut self, name: &str, dob: &str) -> StoreResult<Person> {
        let name = required_text("name", name)?;
        let dob = parse_dob(dob)?;
        let person = Person::new(self.ids.next_id(), &name, dob)?;

        self.people.push(person.clone());
        info!(
            "event=person_add module=service status=ok person_id={}",
            person.id
        );
        self.persist("person_add")?;
        Ok(person)
    }

    /// Removes a person and all owned ideas, then removes their assets.
    ///
    /// Unknown ids are a no-op.
    pub fn delete_person(&mut self, person_id: &str) -> StoreResult<()> {
        let Some(index) = self.people.iter().position(|person| person.id == person_id) else {
            debug!("event=person_delete module=service status=skip person_id={person_id}");
            return Ok(());
        };

        let removed = self.people.remove(index);
        for idea in &removed.ideas {
            self.remove_asset_best_effort(&idea.img);
        }
        info!(
            "event=person_delete module=service status=ok person_id={} ideas={}",
            removed.id,
            removed.ideas.len()
        );
        self.persist("person_delete")
    }

    /// Ideas of one person in insertion order; empty when the person is unknown.
    pub fn get_person_ideas(&self, person_id: &str) -> &[Idea] {
        self.get_person(person_id)
            .map(|person| person.ideas.as_slice())
            .unwrap_or_default()
    }

    /// Commits `source_image` as an asset and appends a new idea.
    ///
    /// Returns `Ok(None)` without touching the asset when the person does
    /// not exist.
    pub fn add_idea(
        &mut self,
        person_id: &str,
        text: &str,
        source_image: impl AsRef<Path>,
        width: f64,
        height: f64,
    ) -> StoreResult<Option<Idea>> {
        let source_image = source_image.as_ref();
        let text = required_text("text", text)?;
        if source_image
            .to_str()
            .is_some_and(|value| value.trim().is_empty())
        {
            return Err(ValidationError::MissingField("image").into());
        }
        validate_dimension("width", width)?;
        validate_dimension("height", height)?;

        let Some(index) = self.people.iter().position(|person| person.id == person_id) else {
            debug!("event=idea_add module=service status=skip person_id={person_id}");
            return Ok(None);
        };

        let stored = self.assets.commit(source_image).map_err(|err| {
            error!(
                "event=idea_add module=service status=error error_code=asset_commit_failed person_id={} error={}",
                person_id, err
            );
            err
        })?;
        let img = stored.to_string_lossy().into_owned();
        let idea = match Idea::new(self.ids.next_id(), &text, img, width, height) {
            Ok(idea) => idea,
            Err(err) => {
                self.remove_asset_best_effort(&stored.to_string_lossy());
                return Err(err.into());
            }
        };

        self.people[index].ideas.push(idea.clone());
        info!(
            "event=idea_add module=service status=ok person_id={} idea_id={}",
            person_id, idea.id
        );
        self.persist("idea_add")?;
        Ok(Some(idea))
    }

    /// Removes one idea and requests removal of its asset.
    ///
    /// Unknown person or idea ids are a no-op.
    pub fn delete_idea(&mut self, person_id: &str, idea_id: &str) -> StoreResult<()> {
        let removed = self
            .people
            .iter_mut()
            .find(|person| person.id == person_id)
            .and_then(|person| person.take_idea(idea_id));
        let Some(idea) = removed else {
            debug!(
                "event=idea_delete module=service status=skip person_id={person_id} idea_id={idea_id}"
            );
            return Ok(());
        };

        self.remove_asset_best_effort(&idea.img);
        info!(
            "event=idea_delete module=service status=ok person_id={} idea_id={}",
            person_id, idea.id
        );
        self.persist("idea_delete")
    }

    /// People ordered by birthday within the year (month, then day).
    ///
    /// Birth year is ignored and ties keep insertion order.
    pub fn get_sorted_people(&self) -> Vec<&Person> {
        let mut sorted = self.people.iter().collect::<Vec<_>>();
        sorted.sort_by_key(|person| person.birthday_key());
        sorted
    }

    /// Rewrites the full collection to durable storage.
    pub fn flush(&mut self) -> StoreResult<()> {
        self.persist("flush")
    }

    fn persist(&mut self, op: &'static str) -> StoreResult<()> {
        let result =
            encode_people(&self.people).and_then(|blob| self.collection.put(PEOPLE_KEY, &blob));
        match result {
            Ok(()) => {
                self.dirty = false;
                Ok(())
            }
            Err(err) => {
                self.dirty = true;
                error!(
                    "event=store_persist module=service status=error op={op} error_code=persist_failed error={}",
                    err
                );
                Err(StoreError::Persist(err))
            }
        }
    }

    fn remove_asset_best_effort(&self, img: &str) {
        if let Err(err) = self.assets.remove(Path::new(img)) {
            warn!(
                "event=asset_remove module=service status=error error_code=asset_remove_failed path={} error={}",
                img, err
            );
        }
    }
}
