//! Persistence contract for account records.
//!
//! Backends report "nothing matched" and "username already taken" as plain
//! values (`None`, `0` rows, [`InsertOutcome::UsernameTaken`]) and reserve
//! `Err` for genuine storage failures. The store turns those values into
//! typed [`AccountError`](super::AccountError)s.

use super::error::BackendError;
use super::hash::SaltedHash;
use parking_lot::Mutex;
use std::collections::HashMap;

/// Backend-assigned surrogate key.
pub type AccountId = i64;

/// A stored account row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountRecord {
    pub id: AccountId,
    pub username: String,
    pub credential: SaltedHash,
}

/// Result of an insert attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted(AccountId),
    /// The backend's uniqueness constraint on `username` rejected the row.
    UsernameTaken,
}

/// Storage operations the account store relies on.
///
/// Every call is self-contained: implementations acquire whatever connection
/// they need and release it before returning, on success and on error.
pub trait AccountBackend: Send + Sync {
    /// Human-readable backend name for logs.
    fn name(&self) -> &str;

    fn insert(&self, username: &str, credential: &SaltedHash)
        -> Result<InsertOutcome, BackendError>;

    fn find_by_username(&self, username: &str) -> Result<Option<AccountRecord>, BackendError>;

    /// Replace salt and hash in one write. Returns the affected row count.
    fn update_credentials(
        &self,
        username: &str,
        credential: &SaltedHash,
    ) -> Result<usize, BackendError>;

    /// Hard-delete the row. Returns the affected row count.
    fn delete_by_username(&self, username: &str) -> Result<usize, BackendError>;

    fn count(&self) -> Result<u64, BackendError>;
}

// ── In-memory backend ───────────────────────────────────────────

#[derive(Debug, Default)]
struct MemoryTable {
    next_id: AccountId,
    rows: HashMap<String, (AccountId, SaltedHash)>,
}

/// Map-backed store for tests and throwaway deployments.
///
/// The single mutex gives the same guarantees the SQLite backend gets from its
/// UNIQUE constraint: the existence check and the insert happen under one lock.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    table: Mutex<MemoryTable>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AccountBackend for MemoryBackend {
    fn name(&self) -> &str {
        "memory"
    }

    fn insert(
        &self,
        username: &str,
        credential: &SaltedHash,
    ) -> Result<InsertOutcome, BackendError> {
        let mut table = self.table.lock();
        if table.rows.contains_key(username) {
            return Ok(InsertOutcome::UsernameTaken);
        }
        table.next_id += 1;
        let id = table.next_id;
        table
            .rows
            .insert(username.to_string(), (id, credential.clone()));
        Ok(InsertOutcome::Inserted(id))
    }

    fn find_by_username(&self, username: &str) -> Result<Option<AccountRecord>, BackendError> {
        let table = self.table.lock();
        Ok(table.rows.get(username).map(|(id, credential)| AccountRecord {
            id: *id,
            username: username.to_string(),
            credential: credential.clone(),
        }))
    }

    fn update_credentials(
        &self,
        username: &str,
        credential: &SaltedHash,
    ) -> Result<usize, BackendError> {
        let mut table = self.table.lock();
        match table.rows.get_mut(username) {
            Some((_, stored)) => {
                *stored = credential.clone();
                Ok(1)
            }
            None => Ok(0),
        }
    }

    fn delete_by_username(&self, username: &str) -> Result<usize, BackendError> {
        let mut table = self.table.lock();
        Ok(usize::from(table.rows.remove(username).is_some()))
    }

    fn count(&self) -> Result<u64, BackendError> {
        Ok(self.table.lock().rows.len() as u64)
    }
}
