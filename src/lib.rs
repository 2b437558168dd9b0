//! Salted-password account store.
//!
//! ```no_run
//! use account_store::auth::{AccountStore, SqliteBackend};
//! use std::sync::Arc;
//!
//! # fn main() -> Result<(), account_store::auth::AccountError> {
//! let store = AccountStore::new(Arc::new(SqliteBackend::open_in_memory()?));
//! store.create_account("alice", "pw1")?;
//! assert!(store.check_password("alice", "pw1")?);
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod config;
pub mod logging;

pub use auth::{AccountError, AccountStore};
pub use config::Config;
