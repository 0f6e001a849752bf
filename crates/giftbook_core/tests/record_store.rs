use giftbook_core::db::open_db;
use giftbook_core::{
    CollectionResult, CollectionStore, CollectionStoreError, FsAssetStore, LoadOutcome,
    MemoryCollectionStore, RecordStore, SqliteCollectionStore, StoreError, ValidationError,
};
use std::cell::Cell;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

struct Fixture {
    _root: TempDir,
    db_path: PathBuf,
    asset_dir: PathBuf,
    capture_dir: PathBuf,
}

impl Fixture {
    fn new() -> Self {
        let root = tempfile::tempdir().unwrap();
        // Asset paths are stored canonical; compare against the same form.
        let base = fs::canonicalize(root.path()).unwrap();
        let capture_dir = base.join("captures");
        fs::create_dir_all(&capture_dir).unwrap();
        Self {
            db_path: base.join("giftbook.sqlite3"),
            asset_dir: base.join("assets"),
            capture_dir,
            _root: root,
        }
    }

    fn open(&self) -> RecordStore<SqliteCollectionStore, FsAssetStore> {
        let conn = open_db(&self.db_path).unwrap();
        let assets = FsAssetStore::new(&self.asset_dir).unwrap();
        let mut store = RecordStore::new(SqliteCollectionStore::new(conn), assets);
        store.load();
        store
    }

    fn capture(&self, name: &str) -> PathBuf {
        let path = self.capture_dir.join(name);
        fs::write(&path, b"jpeg-bytes").unwrap();
        path
    }
}

#[test]
fn add_person_survives_reload_with_empty_ideas() {
    let fixture = Fixture::new();
    let mut store = fixture.open();

    let alice = store.add_person("Alice", "2000-03-15").unwrap();
    drop(store);

    let reloaded = fixture.open();
    let person = reloaded.get_person(&alice.id).expect("person should reload");
    assert_eq!(person.name, "Alice");
    assert_eq!(person.dob.to_string(), "2000-03-15");
    assert!(person.ideas.is_empty());
}

#[test]
fn add_person_rejects_missing_fields_without_mutation() {
    let fixture = Fixture::new();
    let mut store = fixture.open();

    let err = store.add_person("", "2020-01-01").unwrap_err();
    assert!(matches!(
        err,
        StoreError::Validation(ValidationError::MissingField("name"))
    ));
    let err = store.add_person("X", "").unwrap_err();
    assert!(matches!(
        err,
        StoreError::Validation(ValidationError::MissingField("dob"))
    ));
    let err = store.add_person("X", "not-a-date").unwrap_err();
    assert_eq!(err.kind(), "validation");

    assert!(store.people().is_empty());
    drop(store);
    assert!(fixture.open().people().is_empty());
}

#[test]
fn deleted_person_is_absent_from_sorted_people() {
    let fixture = Fixture::new();
    let mut store = fixture.open();
    let alice = store.add_person("Alice", "2000-03-15").unwrap();
    let bob = store.add_person("Bob", "1990-01-10").unwrap();

    store.delete_person(&alice.id).unwrap();

    let ids = store
        .get_sorted_people()
        .iter()
        .map(|person| person.id.clone())
        .collect::<Vec<_>>();
    assert_eq!(ids, vec![bob.id]);
    drop(store);
    assert!(fixture.open().get_person(&alice.id).is_none());
}

#[test]
fn sorted_people_order_by_month_and_day_ignoring_year() {
    let fixture = Fixture::new();
    let mut store = fixture.open();
    store.add_person("Alice", "2000-03-15").unwrap();
    store.add_person("Bob", "1990-01-10").unwrap();
    store.add_person("Cleo", "2015-01-02").unwrap();
    store.add_person("Dan", "1960-12-31").unwrap();

    let names = store
        .get_sorted_people()
        .iter()
        .map(|person| person.name.as_str())
        .collect::<Vec<_>>();
    assert_eq!(names, vec!["Cleo", "Bob", "Alice", "Dan"]);

    let stored = store
        .people()
        .iter()
        .map(|person| person.name.as_str())
        .collect::<Vec<_>>();
    assert_eq!(stored, vec!["Alice", "Bob", "Cleo", "Dan"]);
}

#[test]
fn sorted_people_keep_insertion_order_for_shared_birthdays() {
    let fixture = Fixture::new();
    let mut store = fixture.open();
    store.add_person("Zed", "2001-07-04").unwrap();
    store.add_person("Amy", "1980-07-04").unwrap();
    store.add_person("Early", "1999-02-01").unwrap();
    store.add_person("Max", "2010-07-04").unwrap();

    let names = store
        .get_sorted_people()
        .iter()
        .map(|person| person.name.as_str())
        .collect::<Vec<_>>();
    assert_eq!(names, vec!["Early", "Zed", "Amy", "Max"]);
}

#[test]
fn add_idea_commits_asset_and_rewrites_image_path() {
    let fixture = Fixture::new();
    let mut store = fixture.open();
    let alice = store.add_person("Alice", "2000-03-15").unwrap();
    let capture = fixture.capture("x.jpg");

    let idea = store
        .add_idea(&alice.id, "Book", &capture, 240.0, 160.0)
        .unwrap()
        .expect("person exists");

    let expected = fixture.asset_dir.join("x.jpg");
    assert_eq!(Path::new(&idea.img), expected);
    assert_ne!(Path::new(&idea.img), capture);
    assert!(expected.is_file());
    assert!(!capture.exists());

    let ideas = store.get_person_ideas(&alice.id);
    assert_eq!(ideas.len(), 1);
    assert_eq!(ideas[0].text, "Book");
    assert_eq!(ideas[0].width, 240.0);
    assert_eq!(ideas[0].height, 160.0);

    drop(store);
    assert_eq!(fixture.open().get_person_ideas(&alice.id).to_vec(), vec![idea]);
}

#[test]
fn add_idea_for_unknown_person_leaves_capture_and_collection_alone() {
    let fixture = Fixture::new();
    let mut store = fixture.open();
    let alice = store.add_person("Alice", "2000-03-15").unwrap();
    let capture = fixture.capture("orphan.jpg");

    let added = store
        .add_idea("no-such-person", "Book", &capture, 1.0, 1.0)
        .unwrap();

    assert!(added.is_none());
    assert!(capture.exists());
    assert!(!fixture.asset_dir.join("orphan.jpg").exists());
    assert!(store.get_person_ideas(&alice.id).is_empty());
}

#[test]
fn add_idea_with_missing_capture_reports_asset_error() {
    let fixture = Fixture::new();
    let mut store = fixture.open();
    let alice = store.add_person("Alice", "2000-03-15").unwrap();

    let err = store
        .add_idea(&alice.id, "Book", fixture.capture_dir.join("gone.jpg"), 1.0, 1.0)
        .unwrap_err();

    assert!(matches!(err, StoreError::Asset(_)));
    assert!(store.get_person_ideas(&alice.id).is_empty());
}

#[test]
fn delete_idea_removes_record_and_asset() {
    let fixture = Fixture::new();
    let mut store = fixture.open();
    let alice = store.add_person("Alice", "2000-03-15").unwrap();
    let idea = store
        .add_idea(&alice.id, "Book", fixture.capture("x.jpg"), 1.0, 1.0)
        .unwrap()
        .unwrap();

    store.delete_idea(&alice.id, &idea.id).unwrap();

    assert!(store.get_person_ideas(&alice.id).is_empty());
    assert!(!Path::new(&idea.img).exists());
    drop(store);
    assert!(fixture.open().get_person_ideas(&alice.id).is_empty());
}

#[test]
fn delete_idea_succeeds_when_asset_is_already_gone() {
    let fixture = Fixture::new();
    let mut store = fixture.open();
    let alice = store.add_person("Alice", "2000-03-15").unwrap();
    let idea = store
        .add_idea(&alice.id, "Book", fixture.capture("x.jpg"), 1.0, 1.0)
        .unwrap()
        .unwrap();
    fs::remove_file(&idea.img).unwrap();

    store.delete_idea(&alice.id, &idea.id).unwrap();
    assert!(store.get_person_ideas(&alice.id).is_empty());
}

#[test]
fn delete_person_cascades_to_idea_assets() {
    let fixture = Fixture::new();
    let mut store = fixture.open();
    let alice = store.add_person("Alice", "2000-03-15").unwrap();
    let bob = store.add_person("Bob", "1990-01-10").unwrap();
    let first = store
        .add_idea(&alice.id, "Book", fixture.capture("a.jpg"), 1.0, 1.0)
        .unwrap()
        .unwrap();
    let second = store
        .add_idea(&alice.id, "Scarf", fixture.capture("b.jpg"), 1.0, 1.0)
        .unwrap()
        .unwrap();
    let kept = store
        .add_idea(&bob.id, "Pen", fixture.capture("c.jpg"), 1.0, 1.0)
        .unwrap()
        .unwrap();

    store.delete_person(&alice.id).unwrap();

    assert!(!Path::new(&first.img).exists());
    assert!(!Path::new(&second.img).exists());
    assert!(Path::new(&kept.img).exists());
    assert_eq!(store.get_person_ideas(&bob.id).len(), 1);
}

#[test]
fn ideas_keep_insertion_order() {
    let fixture = Fixture::new();
    let mut store = fixture.open();
    let alice = store.add_person("Alice", "2000-03-15").unwrap();
    for (index, caption) in ["one", "two", "three"].iter().enumerate() {
        store
            .add_idea(
                &alice.id,
                caption,
                fixture.capture(&format!("{index}.jpg")),
                1.0,
                1.0,
            )
            .unwrap();
    }

    let captions = store
        .get_person_ideas(&alice.id)
        .iter()
        .map(|idea| idea.text.as_str())
        .collect::<Vec<_>>();
    assert_eq!(captions, vec!["one", "two", "three"]);
}

#[test]
fn injected_generator_controls_every_id() {
    let fixture = Fixture::new();
    let conn = open_db(&fixture.db_path).unwrap();
    let assets = FsAssetStore::new(&fixture.asset_dir).unwrap();
    let counter = Cell::new(0_u32);
    let mut store = RecordStore::with_id_generator(
        SqliteCollectionStore::new(conn),
        assets,
        move || {
            counter.set(counter.get() + 1);
            format!("fixed-{}", counter.get())
        },
    );
    store.load();

    let alice = store.add_person("Alice", "2000-03-15").unwrap();
    let idea = store
        .add_idea(&alice.id, "Book", fixture.capture("x.jpg"), 1.0, 1.0)
        .unwrap()
        .unwrap();

    assert_eq!(alice.id, "fixed-1");
    assert_eq!(idea.id, "fixed-2");
}

/// Collection store whose writes can be switched off.
#[derive(Clone, Default)]
struct FlakyStore {
    inner: MemoryCollectionStore,
    fail_writes: Arc<AtomicBool>,
}

impl CollectionStore for FlakyStore {
    fn get(&self, key: &str) -> CollectionResult<Option<String>> {
        self.inner.get(key)
    }

    fn put(&self, key: &str, value: &str) -> CollectionResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(CollectionStoreError::InvalidData(
                "disk unavailable".to_string(),
            ));
        }
        self.inner.put(key, value)
    }
}

#[test]
fn persist_failure_keeps_memory_state_and_marks_dirty_until_flush() {
    let fixture = Fixture::new();
    let backing = FlakyStore::default();
    let assets = FsAssetStore::new(&fixture.asset_dir).unwrap();
    let mut store = RecordStore::new(backing.clone(), assets);
    store.load();

    backing.fail_writes.store(true, Ordering::SeqCst);
    let err = store.add_person("Alice", "2000-03-15").unwrap_err();
    assert_eq!(err.kind(), "persist");
    assert_eq!(store.people().len(), 1);
    assert!(store.is_dirty());
    assert_eq!(backing.get("people").unwrap(), None);

    backing.fail_writes.store(false, Ordering::SeqCst);
    store.flush().unwrap();
    assert!(!store.is_dirty());

    let assets = FsAssetStore::new(&fixture.asset_dir).unwrap();
    let mut reloaded = RecordStore::new(backing.clone(), assets);
    assert_eq!(reloaded.load(), LoadOutcome::Loaded { people: 1 });
}

#[test]
fn malformed_blob_recovers_to_empty_collection() {
    let fixture = Fixture::new();
    let backing = MemoryCollectionStore::new();
    backing.put("people", "{not json").unwrap();
    let assets = FsAssetStore::new(&fixture.asset_dir).unwrap();
    let mut store = RecordStore::new(backing, assets);

    let outcome = store.load();

    assert!(matches!(outcome, LoadOutcome::Recovered { .. }));
    assert!(store.people().is_empty());
    assert!(!store.is_dirty());
}

#[test]
fn reload_discards_unsaved_changes_and_clears_dirty() {
    let fixture = Fixture::new();
    let backing = FlakyStore::default();
    let assets = FsAssetStore::new(&fixture.asset_dir).unwrap();
    let mut store = RecordStore::new(backing.clone(), assets);
    store.load();
    store.add_person("Alice", "2000-03-15").unwrap();

    backing.fail_writes.store(true, Ordering::SeqCst);
    store.add_person("Bob", "1990-07-01").unwrap_err();
    assert!(store.is_dirty());
    assert_eq!(store.people().len(), 2);

    assert_eq!(store.load(), LoadOutcome::Loaded { people: 1 });
    assert!(!store.is_dirty());
    let names = store.people().iter().map(|p| p.name.as_str()).collect::<Vec<_>>();
    assert_eq!(names, vec!["Alice"]);
}
