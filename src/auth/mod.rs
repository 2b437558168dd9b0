//! User account store with salted-password credentials.
//!
//! Provides:
//! - Account creation, password verification, password rotation, deletion and id lookup
//! - Salted SHA-256 digests (16-byte random hex salt per account, regenerated on rotation)
//! - A pluggable persistence backend, SQLite (pooled) or in-memory
//!
//! ## Design Decisions
//! - The backend is handed to [`AccountStore::new`] rather than reached through
//!   a global, so tests and hosts control its lifetime.
//! - Username uniqueness is the backend's UNIQUE constraint, never a
//!   check-then-insert in application code.
//! - "Nothing matched" is detected from returned rows / affected-row counts,
//!   since SQL UPDATE and DELETE succeed silently on zero rows.

pub mod backend;
pub mod error;
pub mod hash;
pub mod sqlite;
pub mod store;

pub use backend::{AccountBackend, AccountId, AccountRecord, InsertOutcome, MemoryBackend};
pub use error::{AccountError, BackendError};
pub use hash::SaltedHash;
pub use sqlite::SqliteBackend;
pub use store::AccountStore;
