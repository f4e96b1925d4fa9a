//! Integration tests for the quotes crate
//!
//! These tests exercise the store, storage backends and sync engine together.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread;

use quotes::storage::{InMemoryKeyValueStore, KeyValueStore, SqliteKeyValueStore};
use quotes::{
    CategoryFilter, Quote, QuoteError, QuoteId, QuoteSource, QuoteStore, SyncEngine, SyncOutcome,
    default_quotes,
};
use tempfile::TempDir;

/// Source serving a fixed snapshot
struct StaticSource(Vec<Quote>);

impl QuoteSource for StaticSource {
    fn fetch(&self) -> quotes::Result<Vec<Quote>> {
        Ok(self.0.clone())
    }

    fn push(&self, _quotes: &[Quote]) -> quotes::Result<()> {
        Ok(())
    }
}

/// Source whose endpoint is down
struct OfflineSource;

impl QuoteSource for OfflineSource {
    fn fetch(&self) -> quotes::Result<Vec<Quote>> {
        Err(QuoteError::Transport("connection refused".to_string()))
    }

    fn push(&self, _quotes: &[Quote]) -> quotes::Result<()> {
        Err(QuoteError::Transport("connection refused".to_string()))
    }
}

/// Source that blocks inside `fetch` until released
struct BlockingSource {
    entered: Mutex<Sender<()>>,
    release: Mutex<Receiver<()>>,
    snapshot: Vec<Quote>,
}

impl QuoteSource for BlockingSource {
    fn fetch(&self) -> quotes::Result<Vec<Quote>> {
        self.entered.lock().unwrap().send(()).unwrap();
        self.release.lock().unwrap().recv().unwrap();
        Ok(self.snapshot.clone())
    }

    fn push(&self, _quotes: &[Quote]) -> quotes::Result<()> {
        Ok(())
    }
}

/// Source that edits the shared store while a push is out
struct EditingSource {
    store: Arc<Mutex<QuoteStore>>,
    store_was_free: AtomicBool,
}

impl QuoteSource for EditingSource {
    fn fetch(&self) -> quotes::Result<Vec<Quote>> {
        Ok(Vec::new())
    }

    fn push(&self, _quotes: &[Quote]) -> quotes::Result<()> {
        if let Ok(mut store) = self.store.try_lock() {
            store.add("typed during push", "Life").unwrap();
            self.store_was_free.store(true, Ordering::SeqCst);
        }
        Ok(())
    }
}

fn sqlite_store(dir: &TempDir) -> Arc<dyn KeyValueStore> {
    Arc::new(SqliteKeyValueStore::new(dir.path().join("quotebook.test.sqlite")).unwrap())
}

fn session() -> Arc<dyn KeyValueStore> {
    Arc::new(InMemoryKeyValueStore::new())
}

#[test]
fn test_added_quote_survives_restore() {
    let dir = TempDir::new().unwrap();

    {
        let mut store = QuoteStore::restore(sqlite_store(&dir), session());
        assert_eq!(store.len(), default_quotes().len());
        store.add("hello", "life").unwrap();
    }

    let restored = QuoteStore::restore(sqlite_store(&dir), session());
    let added: Vec<_> = restored
        .quotes()
        .iter()
        .filter(|q| q.text == "hello" && q.category == "life")
        .collect();
    assert_eq!(added.len(), 1);
    assert_eq!(restored.len(), default_quotes().len() + 1);
    assert!(restored.sync_state().has_unsynced_changes);
}

#[test]
fn test_failed_validation_is_not_persisted() {
    let dir = TempDir::new().unwrap();
    let mut store = QuoteStore::restore(sqlite_store(&dir), session());

    assert!(matches!(store.add("", "x"), Err(QuoteError::Validation(_))));
    assert!(matches!(store.add("x", ""), Err(QuoteError::Validation(_))));
    assert_eq!(store.len(), 3);

    let restored = QuoteStore::restore(sqlite_store(&dir), session());
    assert_eq!(restored.len(), 3);
}

#[test]
fn test_export_import_round_trip() {
    let source = QuoteStore::with_quotes(
        vec![
            Quote::with_id(1, "server quote", "Server"),
            Quote::with_id(-1, "local quote", "Life"),
            Quote::new("plain quote", "Motivation"),
        ],
        session(),
        session(),
    );
    let exported = source.export_json().unwrap();

    let mut target = QuoteStore::with_quotes(Vec::new(), session(), session());
    let count = target.import_json(&exported).unwrap();

    assert_eq!(count, 3);
    assert_eq!(target.quotes(), source.quotes());
}

#[test]
fn test_export_import_through_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("exports").join("quotes.json");

    let source = QuoteStore::with_quotes(default_quotes(), session(), session());
    source.export_to_file(&path).unwrap();

    let mut target = QuoteStore::with_quotes(Vec::new(), session(), session());
    target.import_file(&path).unwrap();
    assert_eq!(target.quotes(), source.quotes());
}

#[test]
fn test_import_non_array_leaves_collection() {
    let mut store = QuoteStore::with_quotes(default_quotes(), session(), session());
    let result = store.import_json(r#"{"text":"a","category":"b"}"#);
    assert!(matches!(result, Err(QuoteError::Format(_))));
    assert_eq!(store.quotes(), default_quotes().as_slice());
}

#[test]
fn test_category_filter_survives_restore() {
    let dir = TempDir::new().unwrap();

    {
        let store = QuoteStore::restore(sqlite_store(&dir), session());
        store
            .set_category_filter(&CategoryFilter::parse("motivation"))
            .unwrap();
    }

    let restored = QuoteStore::restore(sqlite_store(&dir), session());
    let filter = restored.category_filter();
    assert_eq!(filter, CategoryFilter::parse("motivation"));

    let picked = restored.select_random(&filter).unwrap().unwrap();
    assert_eq!(picked.category, "Motivation");
}

#[test]
fn test_sync_merge_scenario() {
    let engine = SyncEngine::new(Arc::new(StaticSource(vec![
        Quote::with_id(1, "A", "Server"),
        Quote::with_id(3, "c", "Server"),
    ])));
    let mut store = QuoteStore::with_quotes(
        vec![Quote::with_id(1, "a", "Server"), Quote::with_id(2, "b", "Server")],
        session(),
        session(),
    );

    engine.sync_once(&mut store).unwrap();

    assert_eq!(
        store.quotes(),
        &[
            Quote::with_id(1, "A", "Server"),
            Quote::with_id(2, "b", "Server"),
            Quote::with_id(3, "c", "Server"),
        ]
    );
}

#[test]
fn test_sync_result_is_persisted() {
    let dir = TempDir::new().unwrap();
    let engine = SyncEngine::new(Arc::new(StaticSource(vec![Quote::with_id(
        7, "remote", "Server",
    )])));

    {
        let mut store = QuoteStore::restore(sqlite_store(&dir), session());
        engine.sync_once(&mut store).unwrap();
    }

    let restored = QuoteStore::restore(sqlite_store(&dir), session());
    assert!(restored.get(QuoteId::new(7)).is_some());
    assert!(restored.sync_state().has_synced());
}

#[test]
fn test_failed_sync_is_byte_identical() {
    let dir = TempDir::new().unwrap();
    let durable = sqlite_store(&dir);
    let mut store = QuoteStore::restore(durable.clone(), session());
    store.add("pending", "Life").unwrap();

    let before_memory = store.export_json().unwrap();
    let before_disk = durable.get("quotes").unwrap();

    let engine = SyncEngine::new(Arc::new(OfflineSource));
    assert!(matches!(
        engine.sync_once(&mut store),
        Err(QuoteError::Transport(_))
    ));

    assert_eq!(store.export_json().unwrap(), before_memory);
    assert_eq!(durable.get("quotes").unwrap(), before_disk);
}

#[test]
fn test_overlapping_sync_is_rejected() {
    let (entered_tx, entered_rx) = mpsc::channel();
    let (release_tx, release_rx) = mpsc::channel();
    let source = BlockingSource {
        entered: Mutex::new(entered_tx),
        release: Mutex::new(release_rx),
        snapshot: vec![Quote::with_id(1, "remote", "Server")],
    };

    let engine = Arc::new(SyncEngine::new(Arc::new(source)));
    let store = Arc::new(Mutex::new(QuoteStore::with_quotes(
        Vec::new(),
        session(),
        session(),
    )));

    let background = {
        let engine = engine.clone();
        let store = store.clone();
        thread::spawn(move || engine.sync_shared(&store))
    };

    // Wait until the background sync is blocked on the network
    entered_rx.recv().unwrap();
    assert!(engine.status().is_syncing());

    // The store is not locked while fetching, so user edits still go through
    store.lock().unwrap().add("typed meanwhile", "Life").unwrap();

    let second = engine.sync_shared(&store).unwrap();
    assert_eq!(second, SyncOutcome::AlreadyRunning);

    release_tx.send(()).unwrap();
    let first = background.join().unwrap().unwrap();
    assert!(matches!(first, SyncOutcome::Completed(_)));

    let store = store.lock().unwrap();
    assert_eq!(store.len(), 2);
}

#[test]
fn test_reimport_then_sync_keeps_ids_unique() {
    let mut store = QuoteStore::with_quotes(
        vec![Quote::with_id(1, "a", "Server")],
        session(),
        session(),
    );
    let exported = store.export_json().unwrap();
    assert_eq!(store.import_json(&exported).unwrap(), 0);

    let engine = SyncEngine::new(Arc::new(StaticSource(vec![Quote::with_id(1, "A", "Server")])));
    engine.sync_once(&mut store).unwrap();

    assert_eq!(store.quotes(), &[Quote::with_id(1, "A", "Server")]);
}

#[test]
fn test_sync_never_stores_invalid_remote_quotes() {
    let dir = TempDir::new().unwrap();
    let engine = SyncEngine::new(Arc::new(StaticSource(vec![
        Quote::with_id(1, "t", "All"),
        Quote::with_id(2, "fine", "Server"),
    ])));

    let synced = {
        let mut store = QuoteStore::with_quotes(Vec::new(), sqlite_store(&dir), session());
        engine.sync_once(&mut store).unwrap();
        store.quotes().to_vec()
    };
    assert_eq!(synced, vec![Quote::with_id(2, "fine", "Server")]);

    let restored = QuoteStore::restore(sqlite_store(&dir), session());
    assert_eq!(restored.quotes(), synced.as_slice());
}

#[test]
fn test_shared_push_releases_store() {
    let store = Arc::new(Mutex::new(QuoteStore::with_quotes(
        vec![Quote::with_id(-1, "local", "Life")],
        session(),
        session(),
    )));
    store.lock().unwrap().add("pending", "Life").unwrap();

    let source = Arc::new(EditingSource {
        store: store.clone(),
        store_was_free: AtomicBool::new(false),
    });
    let engine = SyncEngine::new(source.clone());

    let pushed = engine.push_shared(&store).unwrap();

    assert_eq!(pushed, 2);
    assert!(source.store_was_free.load(Ordering::SeqCst));

    // The edit made during the push has not reached the server yet
    let store = store.lock().unwrap();
    assert_eq!(store.len(), 3);
    assert!(store.sync_state().has_unsynced_changes);
}
