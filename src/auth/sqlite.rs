//! SQLite-backed account table.
//!
//! Table:
//! - `users`: id (autoincrement), username (UNIQUE, case-sensitive), password_hash, salt
//!
//! Connections come from an r2d2 pool. Each trait method checks one out and the
//! guard hands it back when the method returns, whichever way it returns.

use super::backend::{AccountBackend, AccountRecord, InsertOutcome};
use super::error::BackendError;
use super::hash::SaltedHash;
use crate::config::DatabaseConfig;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, Connection};
use std::path::Path;
use std::time::Duration;

/// How long `pool.get()` waits for a free connection.
const CONNECTION_TIMEOUT_SECS: u64 = 30;

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    username TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,
    salt TEXT NOT NULL
);";

type SqlitePool = r2d2::Pool<SqliteConnectionManager>;

pub struct SqliteBackend {
    pool: SqlitePool,
    label: String,
}

impl SqliteBackend {
    /// Open (or create) the account database at the given path.
    pub fn open(
        db_path: &Path,
        pool_size: u32,
        busy_timeout: Duration,
    ) -> Result<Self, BackendError> {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        // Journal mode and schema are set up once on a dedicated connection so
        // pooled connections never race each other switching to WAL.
        {
            let conn = Connection::open(db_path)?;
            conn.busy_timeout(busy_timeout)?;
            let mode: String =
                conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
            tracing::debug!(journal_mode = %mode, "Account database journal mode");
            conn.execute_batch(SCHEMA)?;
        }

        let manager = SqliteConnectionManager::file(db_path)
            .with_init(move |conn| configure_connection(conn, busy_timeout));
        let pool = r2d2::Pool::builder()
            .max_size(pool_size.max(1))
            .connection_timeout(Duration::from_secs(CONNECTION_TIMEOUT_SECS))
            .build(manager)?;

        tracing::debug!(path = %db_path.display(), pool_size, "Account database opened");

        Ok(Self {
            pool,
            label: format!("sqlite:{}", db_path.display()),
        })
    }

    pub fn from_config(config: &DatabaseConfig) -> Result<Self, BackendError> {
        Self::open(
            &config.resolved_path(),
            config.pool_size,
            Duration::from_millis(config.busy_timeout_ms),
        )
    }

    /// In-memory database. Every pooled SQLite `:memory:` connection would be a
    /// separate database, so the pool holds exactly one connection and never
    /// recycles it.
    pub fn open_in_memory() -> Result<Self, BackendError> {
        let manager = SqliteConnectionManager::memory();
        let pool = r2d2::Pool::builder()
            .max_size(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connection_timeout(Duration::from_secs(CONNECTION_TIMEOUT_SECS))
            .build(manager)?;
        pool.get()?.execute_batch(SCHEMA)?;

        Ok(Self {
            pool,
            label: "sqlite::memory:".to_string(),
        })
    }
}

fn configure_connection(conn: &mut Connection, busy_timeout: Duration) -> rusqlite::Result<()> {
    conn.busy_timeout(busy_timeout)?;
    conn.execute_batch("PRAGMA synchronous = NORMAL;")
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

/// Only a UNIQUE violation means the username is taken. NOT NULL, CHECK and
/// other constraint failures are storage errors.
fn insert_outcome(
    conn: &Connection,
    result: rusqlite::Result<usize>,
) -> Result<InsertOutcome, BackendError> {
    match result {
        Ok(_) => Ok(InsertOutcome::Inserted(conn.last_insert_rowid())),
        Err(e) if is_unique_violation(&e) => Ok(InsertOutcome::UsernameTaken),
        Err(e) => Err(e.into()),
    }
}

impl AccountBackend for SqliteBackend {
    fn name(&self) -> &str {
        &self.label
    }

    fn insert(
        &self,
        username: &str,
        credential: &SaltedHash,
    ) -> Result<InsertOutcome, BackendError> {
        let conn = self.pool.get()?;
        let result = conn.execute(
            "INSERT INTO users (username, password_hash, salt) VALUES (?1, ?2, ?3)",
            params![username, credential.hash, credential.salt],
        );

        insert_outcome(&conn, result)
    }

    fn find_by_username(&self, username: &str) -> Result<Option<AccountRecord>, BackendError> {
        let conn = self.pool.get()?;
        let row = conn.query_row(
            "SELECT id, username, password_hash, salt FROM users WHERE username = ?1",
            params![username],
            |row| {
                Ok(AccountRecord {
                    id: row.get(0)?,
                    username: row.get(1)?,
                    credential: SaltedHash {
                        hash: row.get(2)?,
                        salt: row.get(3)?,
                    },
                })
            },
        );

        match row {
            Ok(record) => Ok(Some(record)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn update_credentials(
        &self,
        username: &str,
        credential: &SaltedHash,
    ) -> Result<usize, BackendError> {
        let conn = self.pool.get()?;
        let updated = conn.execute(
            "UPDATE users SET salt = ?1, password_hash = ?2 WHERE username = ?3",
            params![credential.salt, credential.hash, username],
        )?;
        Ok(updated)
    }

    fn delete_by_username(&self, username: &str) -> Result<usize, BackendError> {
        let conn = self.pool.get()?;
        let deleted = conn.execute("DELETE FROM users WHERE username = ?1", params![username])?;
        Ok(deleted)
    }

    fn count(&self) -> Result<u64, BackendError> {
        let conn = self.pool.get()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::hash::generate_salted_hash;
    use tempfile::TempDir;

    fn test_backend() -> (TempDir, SqliteBackend) {
        let tmp = TempDir::new().unwrap();
        let db_path = tmp.path().join("accounts.db");
        let backend = SqliteBackend::open(&db_path, 4, Duration::from_secs(5)).unwrap();
        (tmp, backend)
    }

    #[test]
    fn insert_then_find_roundtrips_credential() {
        let (_tmp, backend) = test_backend();
        let cred = generate_salted_hash("pw");

        let InsertOutcome::Inserted(id) = backend.insert("alice", &cred).unwrap() else {
            panic!("expected insert to succeed");
        };

        let record = backend.find_by_username("alice").unwrap().unwrap();
        assert_eq!(record.id, id);
        assert_eq!(record.username, "alice");
        assert_eq!(record.credential, cred);
    }

    #[test]
    fn unique_constraint_reports_taken_username() {
        let (_tmp, backend) = test_backend();
        backend.insert("alice", &generate_salted_hash("a")).unwrap();
        let outcome = backend.insert("alice", &generate_salted_hash("b")).unwrap();
        assert_eq!(outcome, InsertOutcome::UsernameTaken);
        assert_eq!(backend.count().unwrap(), 1);
    }

    #[test]
    fn not_null_violation_is_a_backend_error() {
        let (_tmp, backend) = test_backend();
        let conn = backend.pool.get().unwrap();
        let result = conn.execute(
            "INSERT INTO users (username, password_hash, salt) VALUES (?1, NULL, ?2)",
            params!["alice", "00"],
        );

        let err = insert_outcome(&conn, result).unwrap_err();
        match err {
            BackendError::Sqlite(rusqlite::Error::SqliteFailure(e, _)) => {
                assert_eq!(e.code, rusqlite::ErrorCode::ConstraintViolation);
                assert_ne!(e.extended_code, rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE);
            }
            other => panic!("expected sqlite constraint failure, got {other:?}"),
        }
        drop(conn);
        assert_eq!(backend.count().unwrap(), 0);
    }

    #[test]
    fn raw_duplicate_insert_is_classified_as_taken() {
        let (_tmp, backend) = test_backend();
        backend.insert("alice", &generate_salted_hash("a")).unwrap();
        let conn = backend.pool.get().unwrap();
        let result = conn.execute(
            "INSERT INTO users (username, password_hash, salt) VALUES (?1, ?2, ?3)",
            params!["alice", "ff", "00"],
        );
        assert_eq!(
            insert_outcome(&conn, result).unwrap(),
            InsertOutcome::UsernameTaken
        );
    }

    #[test]
    fn usernames_are_case_sensitive() {
        let (_tmp, backend) = test_backend();
        backend.insert("Alice", &generate_salted_hash("a")).unwrap();
        let outcome = backend.insert("alice", &generate_salted_hash("b")).unwrap();
        assert!(matches!(outcome, InsertOutcome::Inserted(_)));
        assert!(backend.find_by_username("ALICE").unwrap().is_none());
    }

    #[test]
    fn update_and_delete_report_zero_rows_for_missing_user() {
        let (_tmp, backend) = test_backend();
        let cred = generate_salted_hash("pw");
        assert_eq!(backend.update_credentials("ghost", &cred).unwrap(), 0);
        assert_eq!(backend.delete_by_username("ghost").unwrap(), 0);
    }

    #[test]
    fn update_replaces_both_columns_and_keeps_id() {
        let (_tmp, backend) = test_backend();
        backend.insert("alice", &generate_salted_hash("old")).unwrap();
        let before = backend.find_by_username("alice").unwrap().unwrap();

        let rotated = generate_salted_hash("new");
        assert_eq!(backend.update_credentials("alice", &rotated).unwrap(), 1);

        let after = backend.find_by_username("alice").unwrap().unwrap();
        assert_eq!(after.id, before.id);
        assert_eq!(after.credential, rotated);
    }

    #[test]
    fn ids_are_not_reused_after_delete() {
        let (_tmp, backend) = test_backend();
        let InsertOutcome::Inserted(first) =
            backend.insert("a", &generate_salted_hash("pw")).unwrap()
        else {
            panic!("expected insert to succeed");
        };
        assert_eq!(backend.delete_by_username("a").unwrap(), 1);
        let InsertOutcome::Inserted(second) =
            backend.insert("a", &generate_salted_hash("pw")).unwrap()
        else {
            panic!("expected insert to succeed");
        };
        assert!(second > first);
    }

    #[test]
    fn data_survives_reopen() {
        let tmp = TempDir::new().unwrap();
        let db_path = tmp.path().join("nested").join("accounts.db");
        {
            let backend = SqliteBackend::open(&db_path, 2, Duration::from_secs(5)).unwrap();
            backend.insert("alice", &generate_salted_hash("pw")).unwrap();
        }
        let backend = SqliteBackend::open(&db_path, 2, Duration::from_secs(5)).unwrap();
        assert!(backend.find_by_username("alice").unwrap().is_some());
    }

    #[test]
    fn in_memory_backend_keeps_rows_across_checkouts() {
        let backend = SqliteBackend::open_in_memory().unwrap();
        backend.insert("alice", &generate_salted_hash("pw")).unwrap();
        assert_eq!(backend.count().unwrap(), 1);
        assert!(backend.find_by_username("alice").unwrap().is_some());
        assert_eq!(backend.name(), "sqlite::memory:");
    }
}
