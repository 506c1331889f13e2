//! Integration tests for the link store over each storage backend
//!
//! Tests can be filtered by database backend using the DATABASE_BACKEND environment variable:
//! - `DATABASE_BACKEND=memory cargo test` - Run only in-memory tests
//! - `DATABASE_BACKEND=sqlite cargo test` - Run only SQLite tests
//! - `DATABASE_BACKEND=postgres cargo test` - Run only PostgreSQL tests (needs DATABASE_URL)
//! - By default, memory and SQLite are tested, PostgreSQL when DATABASE_URL is set

use snipper::allocator::{build_allocator, CodePolicy, SequenceSource};
use snipper::links::{LinkError, LinkStore, LinkStoreOptions};
use snipper::storage::{MemoryStorage, PostgresStorage, SqliteStorage, Storage};
use std::collections::HashSet;
use std::sync::Arc;

/// Get the database backend to test from environment variable
fn should_test_backend(backend: &str) -> bool {
    match std::env::var("DATABASE_BACKEND") {
        Ok(val) => val.to_lowercase() == backend.to_lowercase(),
        Err(_) => true, // Test all backends if not specified
    }
}

fn link_store(
    storage: Arc<dyn Storage>,
    sequence: Arc<dyn SequenceSource>,
    policy: CodePolicy,
) -> LinkStore {
    LinkStore::new(
        storage,
        build_allocator(policy, 7, sequence),
        LinkStoreOptions::default(),
    )
}

fn memory_store(policy: CodePolicy) -> LinkStore {
    let storage = Arc::new(MemoryStorage::new());
    link_store(storage.clone(), storage, policy)
}

/// Helper to create SQLite test storage
async fn sqlite_store(policy: CodePolicy) -> LinkStore {
    let storage = Arc::new(SqliteStorage::new("sqlite::memory:", 1).await.unwrap());
    storage.init().await.unwrap();
    link_store(storage.clone(), storage, policy)
}

/// Helper to create PostgreSQL test storage
async fn postgres_store(policy: CodePolicy) -> Option<LinkStore> {
    let db_url = std::env::var("DATABASE_URL").ok()?;
    if !db_url.starts_with("postgres") {
        return None;
    }
    let storage = Arc::new(PostgresStorage::new(&db_url, 5).await.ok()?);
    storage.init().await.ok()?;
    storage.clear().await.ok()?;
    Some(link_store(storage.clone(), storage, policy))
}

async fn assert_concrete_scenario(store: &LinkStore) {
    let a = store.create("https://example.com/a").await.unwrap();
    let b = store.create("https://example.com/b").await.unwrap();
    assert_ne!(a.short_code, b.short_code);

    let listed = store.list().await.unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].short_code, b.short_code);
    assert_eq!(listed[0].original_url, "https://example.com/b");
    assert_eq!(listed[1].short_code, a.short_code);
    assert_eq!(listed[1].original_url, "https://example.com/a");

    assert_eq!(store.clear_all().await.unwrap(), 2);
    assert!(store.list().await.unwrap().is_empty());
}

async fn assert_ordering(store: &LinkStore) {
    let a = store.create("https://example.com/A").await.unwrap();
    let b = store.create("https://example.com/B").await.unwrap();
    let c = store.create("https://example.com/C").await.unwrap();

    let codes: Vec<String> = store
        .list()
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.short_code)
        .collect();
    assert_eq!(codes, vec![c.short_code, b.short_code, a.short_code]);
}

async fn assert_round_trip(store: &LinkStore) {
    let url = "https://example.com/very/long/path?with=query#and-fragment";
    let created = store.create(url).await.unwrap();
    let found = store.lookup(&created.short_code).await.unwrap();

    assert_eq!(found.original_url, url);
    assert_eq!(found.created_at, created.created_at);
    assert!(matches!(
        store.lookup("nope000").await,
        Err(LinkError::NotFound(_))
    ));
}

async fn assert_idempotent_clear(store: &LinkStore) {
    store.create("https://example.com/1").await.unwrap();
    assert_eq!(store.clear_all().await.unwrap(), 1);
    assert!(store.list().await.unwrap().is_empty());
    assert_eq!(store.clear_all().await.unwrap(), 0);
}

async fn assert_concurrent_uniqueness(store: Arc<LinkStore>, n: usize) {
    let mut handles = Vec::with_capacity(n);
    for i in 0..n {
        let store = Arc::clone(&store);
        handles.push(tokio::spawn(async move {
            store.create(&format!("https://example.com/{i}")).await
        }));
    }

    let mut codes = HashSet::with_capacity(n);
    for handle in handles {
        let record = handle.await.unwrap().unwrap();
        assert!(codes.insert(record.short_code));
    }
    assert_eq!(codes.len(), n);
    assert_eq!(store.list().await.unwrap().len(), n);
}

#[tokio::test]
async fn test_concrete_scenario_memory() {
    if !should_test_backend("memory") {
        return;
    }
    assert_concrete_scenario(&memory_store(CodePolicy::Random)).await;
}

#[tokio::test]
async fn test_concrete_scenario_sqlite() {
    if !should_test_backend("sqlite") {
        return;
    }
    assert_concrete_scenario(&sqlite_store(CodePolicy::Random).await).await;
}

#[tokio::test]
async fn test_ordering_memory() {
    if !should_test_backend("memory") {
        return;
    }
    assert_ordering(&memory_store(CodePolicy::Random)).await;
}

#[tokio::test]
async fn test_ordering_sqlite() {
    if !should_test_backend("sqlite") {
        return;
    }
    assert_ordering(&sqlite_store(CodePolicy::Sequential).await).await;
}

#[tokio::test]
async fn test_round_trip_memory() {
    if !should_test_backend("memory") {
        return;
    }
    assert_round_trip(&memory_store(CodePolicy::Sequential)).await;
}

#[tokio::test]
async fn test_round_trip_sqlite() {
    if !should_test_backend("sqlite") {
        return;
    }
    assert_round_trip(&sqlite_store(CodePolicy::Random).await).await;
}

#[tokio::test]
async fn test_idempotent_clear_memory() {
    if !should_test_backend("memory") {
        return;
    }
    assert_idempotent_clear(&memory_store(CodePolicy::Random)).await;
}

#[tokio::test]
async fn test_idempotent_clear_sqlite() {
    if !should_test_backend("sqlite") {
        return;
    }
    assert_idempotent_clear(&sqlite_store(CodePolicy::Random).await).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_uniqueness_memory_random() {
    if !should_test_backend("memory") {
        return;
    }
    assert_concurrent_uniqueness(Arc::new(memory_store(CodePolicy::Random)), 10_000).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_uniqueness_memory_sequential() {
    if !should_test_backend("memory") {
        return;
    }
    assert_concurrent_uniqueness(Arc::new(memory_store(CodePolicy::Sequential)), 10_000).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_uniqueness_sqlite() {
    if !should_test_backend("sqlite") {
        return;
    }
    assert_concurrent_uniqueness(Arc::new(sqlite_store(CodePolicy::Random).await), 500).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_uniqueness_sqlite_sequential() {
    if !should_test_backend("sqlite") {
        return;
    }
    assert_concurrent_uniqueness(Arc::new(sqlite_store(CodePolicy::Sequential).await), 500)
        .await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_create_racing_clear_memory() {
    if !should_test_backend("memory") {
        return;
    }
    // Every record is either gone with the clear or fully visible afterwards
    let store = Arc::new(memory_store(CodePolicy::Random));
    let mut handles = Vec::new();
    for i in 0..200 {
        let store = Arc::clone(&store);
        handles.push(tokio::spawn(async move {
            store.create(&format!("https://example.com/{i}")).await
        }));
    }
    let cleared = {
        let store = Arc::clone(&store);
        tokio::spawn(async move { store.clear_all().await })
    };

    let mut created = Vec::new();
    for handle in handles {
        created.push(handle.await.unwrap().unwrap());
    }
    let removed = cleared.await.unwrap().unwrap();

    let remaining = store.list().await.unwrap();
    assert_eq!(remaining.len() as u64 + removed, created.len() as u64);
    for record in remaining {
        let found = store.lookup(&record.short_code).await.unwrap();
        assert_eq!(found, record);
    }
}

/// Newest first must agree with insertion order
async fn assert_history_follows_insertion(store: &LinkStore) {
    let listed = store.list().await.unwrap();
    for pair in listed.windows(2) {
        assert!(
            pair[0].id > pair[1].id,
            "record {} listed above later record {}",
            pair[0].id,
            pair[1].id
        );
        assert!(pair[0].created_at >= pair[1].created_at);
    }
}

/// Many writers over a file-backed pool with several connections
async fn assert_pooled_sqlite_writers(policy: CodePolicy, name: &str) {
    let path = std::env::temp_dir().join(format!(
        "snipper-pool-{name}-{}.db",
        std::process::id()
    ));
    let _ = std::fs::remove_file(&path);
    let url = format!("sqlite://{}", path.display());

    let storage = Arc::new(SqliteStorage::new(&url, 5).await.unwrap());
    storage.init().await.unwrap();
    let store = Arc::new(link_store(storage.clone(), storage, policy));

    assert_concurrent_uniqueness(Arc::clone(&store), 1000).await;
    assert_history_follows_insertion(&store).await;

    let _ = std::fs::remove_file(&path);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_pooled_sqlite_writers_random() {
    if !should_test_backend("sqlite") {
        return;
    }
    assert_pooled_sqlite_writers(CodePolicy::Random, "random").await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_pooled_sqlite_writers_sequential() {
    if !should_test_backend("sqlite") {
        return;
    }
    assert_pooled_sqlite_writers(CodePolicy::Sequential, "sequential").await;
}

#[tokio::test]
async fn test_sqlite_file_persists_links_and_counter() {
    if !should_test_backend("sqlite") {
        return;
    }
    let path = std::env::temp_dir().join(format!("snipper-test-{}.db", std::process::id()));
    let _ = std::fs::remove_file(&path);
    let url = format!("sqlite://{}", path.display());

    let first_code = {
        let storage = Arc::new(SqliteStorage::new(&url, 1).await.unwrap());
        storage.init().await.unwrap();
        let store = link_store(storage.clone(), storage, CodePolicy::Sequential);
        store.create("https://example.com/kept").await.unwrap().short_code
    };

    let storage = Arc::new(SqliteStorage::new(&url, 1).await.unwrap());
    storage.init().await.unwrap();
    // The counter resumes where the previous process left it
    assert_eq!(storage.next_sequence().await.unwrap(), 2);

    let store = link_store(storage.clone(), storage, CodePolicy::Sequential);
    let kept = store.lookup(&first_code).await.unwrap();
    assert_eq!(kept.original_url, "https://example.com/kept");

    let second = store.create("https://example.com/next").await.unwrap();
    assert_ne!(second.short_code, first_code);

    let _ = std::fs::remove_file(&path);
}

#[tokio::test]
async fn test_postgres_scenarios() {
    if !should_test_backend("postgres") {
        return;
    }
    let Some(store) = postgres_store(CodePolicy::Sequential).await else {
        return;
    };
    assert_concrete_scenario(&store).await;
    assert_ordering(&store).await;
    store.clear_all().await.unwrap();
    assert_round_trip(&store).await;
    store.clear_all().await.unwrap();
    assert_idempotent_clear(&store).await;

    let store = Arc::new(store);
    assert_concurrent_uniqueness(Arc::clone(&store), 500).await;
    assert_history_follows_insertion(&store).await;
    store.clear_all().await.unwrap();
}
