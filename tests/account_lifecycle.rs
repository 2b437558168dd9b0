use account_store::auth::{AccountBackend, AccountError, AccountStore, MemoryBackend, SqliteBackend};
use account_store::config::DatabaseConfig;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

fn sqlite_store() -> (TempDir, AccountStore) {
    let tmp = TempDir::new().unwrap();
    let config = DatabaseConfig {
        path: tmp.path().join("accounts.db").display().to_string(),
        pool_size: 8,
        busy_timeout_ms: 10_000,
    };
    let store = AccountStore::open(&config).unwrap();
    (tmp, store)
}

fn assert_not_found<T: std::fmt::Debug>(result: Result<T, AccountError>) {
    match result {
        Err(AccountError::AccountNotFound { .. }) => {}
        other => panic!("expected AccountNotFound, got {other:?}"),
    }
}

#[test]
fn alice_lifecycle() {
    let (_tmp, store) = sqlite_store();

    store.create_account("alice", "pw1").unwrap();
    let id = store.get_id_by_username("alice").unwrap();
    assert!(id > 0);

    store.update_password("alice", "pw2").unwrap();
    assert!(!store.check_password("alice", "pw1").unwrap());
    assert!(store.check_password("alice", "pw2").unwrap());
    assert_eq!(store.get_id_by_username("alice").unwrap(), id);

    store.delete_account("alice").unwrap();
    assert_not_found(store.get_id_by_username("alice"));
    assert_not_found(store.check_password("alice", "pw2"));
}

#[test]
fn duplicate_create_leaves_exactly_one_account() {
    let (_tmp, store) = sqlite_store();

    store.create_account("bob", "first").unwrap();
    let err = store.create_account("bob", "second").unwrap_err();
    assert!(matches!(err, AccountError::DuplicateUsername { .. }));
    assert_eq!(err.status_code(), 409);

    assert_eq!(store.account_count().unwrap(), 1);
    assert!(store.check_password("bob", "first").unwrap());
}

#[test]
fn operations_on_unknown_username_are_not_found() {
    let (_tmp, store) = sqlite_store();

    assert_not_found(store.check_password("nobody", "pw"));
    assert_not_found(store.delete_account("nobody"));
    assert_not_found(store.get_id_by_username("nobody"));
    assert_not_found(store.update_password("nobody", "pw"));
}

#[test]
fn identical_passwords_store_different_hashes() {
    let backend = Arc::new(SqliteBackend::open_in_memory().unwrap());
    let store = AccountStore::new(backend.clone());

    store.create_account("a", "shared").unwrap();
    store.create_account("b", "shared").unwrap();

    let a = backend.find_by_username("a").unwrap().unwrap();
    let b = backend.find_by_username("b").unwrap().unwrap();
    assert_ne!(a.credential.salt, b.credential.salt);
    assert_ne!(a.credential.hash, b.credential.hash);
}

fn race_creates(store: &AccountStore, contenders: usize) -> (usize, usize) {
    let results: Vec<_> = std::thread::scope(|s| {
        let handles: Vec<_> = (0..contenders)
            .map(|i| {
                let store = store.clone();
                s.spawn(move || store.create_account("carol", &format!("pw{i}")))
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let successes = results.iter().filter(|r| r.is_ok()).count();
    let duplicates = results
        .iter()
        .filter(|r| matches!(r, Err(AccountError::DuplicateUsername { .. })))
        .count();
    (successes, duplicates)
}

#[test]
fn concurrent_creates_sqlite_yield_one_winner() {
    let (_tmp, store) = sqlite_store();

    let (successes, duplicates) = race_creates(&store, 16);
    assert_eq!(successes, 1);
    assert_eq!(duplicates, 15);
    assert_eq!(store.account_count().unwrap(), 1);
}

#[test]
fn concurrent_creates_memory_yield_one_winner() {
    let store = AccountStore::new(Arc::new(MemoryBackend::new()));

    let (successes, duplicates) = race_creates(&store, 16);
    assert_eq!(successes, 1);
    assert_eq!(duplicates, 15);
}

#[test]
fn concurrent_distinct_creates_all_succeed() {
    let tmp = TempDir::new().unwrap();
    let backend =
        SqliteBackend::open(&tmp.path().join("accounts.db"), 4, Duration::from_secs(10)).unwrap();
    let store = AccountStore::new(Arc::new(backend));

    std::thread::scope(|s| {
        for i in 0..12 {
            let store = store.clone();
            s.spawn(move || {
                let name = format!("user_{i}");
                store.create_account(&name, "pw").unwrap();
                assert!(store.check_password(&name, "pw").unwrap());
            });
        }
    });

    assert_eq!(store.account_count().unwrap(), 12);
}
