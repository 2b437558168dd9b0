//! Account operations on top of an injected [`AccountBackend`].

use super::backend::{AccountBackend, AccountId, InsertOutcome};
use super::error::{AccountError, BackendError, Result};
use super::hash;
use super::sqlite::SqliteBackend;
use crate::config::DatabaseConfig;
use std::sync::Arc;

/// Salted-password account store.
///
/// Holds no state of its own beyond the backend handle; clones share it.
#[derive(Clone)]
pub struct AccountStore {
    backend: Arc<dyn AccountBackend>,
}

impl std::fmt::Debug for AccountStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountStore")
            .field("backend", &self.backend.name())
            .finish()
    }
}

impl AccountStore {
    pub fn new(backend: Arc<dyn AccountBackend>) -> Self {
        Self { backend }
    }

    /// Open the SQLite database described by `config`.
    pub fn open(config: &DatabaseConfig) -> Result<Self> {
        let backend = SqliteBackend::from_config(config).map_err(|e| {
            tracing::error!(error = %e, "Failed to open account database");
            AccountError::from(e)
        })?;
        Ok(Self::new(Arc::new(backend)))
    }

    // ── Operations ──────────────────────────────────────────────────

    /// Register a new account. Returns its id.
    pub fn create_account(&self, username: &str, password: &str) -> Result<AccountId> {
        let credential = hash::generate_salted_hash(password);

        match self
            .backend
            .insert(username, &credential)
            .map_err(|e| backend_failure("create_account", username, e))?
        {
            InsertOutcome::Inserted(id) => {
                tracing::info!(username = %username, id, "Account created");
                Ok(id)
            }
            InsertOutcome::UsernameTaken => {
                tracing::info!(username = %username, "Duplicate username");
                Err(AccountError::DuplicateUsername {
                    username: username.to_string(),
                })
            }
        }
    }

    /// Whether `password` matches the stored credential.
    /// A wrong password is `Ok(false)`, not an error.
    pub fn check_password(&self, username: &str, password: &str) -> Result<bool> {
        let record = self
            .backend
            .find_by_username(username)
            .map_err(|e| backend_failure("check_password", username, e))?
            .ok_or_else(|| not_found(username))?;

        let matches = hash::verify(password, &record.credential.salt, &record.credential.hash);
        tracing::debug!(username = %username, matches, "Password checked");
        Ok(matches)
    }

    /// Hard-delete the account.
    pub fn delete_account(&self, username: &str) -> Result<()> {
        let deleted = self
            .backend
            .delete_by_username(username)
            .map_err(|e| backend_failure("delete_account", username, e))?;
        if deleted == 0 {
            return Err(not_found(username));
        }
        tracing::info!(username = %username, "Account deleted");
        Ok(())
    }

    pub fn get_id_by_username(&self, username: &str) -> Result<AccountId> {
        let record = self
            .backend
            .find_by_username(username)
            .map_err(|e| backend_failure("get_id_by_username", username, e))?
            .ok_or_else(|| not_found(username))?;
        tracing::debug!(username = %username, id = record.id, "Account id resolved");
        Ok(record.id)
    }

    /// Replace the password. A new salt is always generated.
    pub fn update_password(&self, username: &str, new_password: &str) -> Result<()> {
        let credential = hash::generate_salted_hash(new_password);
        let updated = self
            .backend
            .update_credentials(username, &credential)
            .map_err(|e| backend_failure("update_password", username, e))?;
        if updated == 0 {
            return Err(not_found(username));
        }
        tracing::info!(username = %username, "Password updated");
        Ok(())
    }

    /// Count registered accounts.
    pub fn account_count(&self) -> Result<u64> {
        self.backend.count().map_err(|e| {
            tracing::error!(op = "account_count", error = %e, "Account backend failure");
            AccountError::from(e)
        })
    }
}

fn not_found(username: &str) -> AccountError {
    tracing::info!(username = %username, "Account not found");
    AccountError::AccountNotFound {
        username: username.to_string(),
    }
}

fn backend_failure(op: &'static str, username: &str, err: BackendError) -> AccountError {
    tracing::error!(op, username = %username, error = %err, "Account backend failure");
    AccountError::Backend(err)
}
