use thiserror::Error;

/// Failures surfaced by [`AccountStore`](super::AccountStore) operations.
///
/// The `Display` text of the first two variants leaves the username out so a
/// hosting layer can forward it to end users without confirming which
/// accounts exist. The field is kept for operator diagnostics.
#[derive(Debug, Error)]
pub enum AccountError {
    #[error("username is already taken")]
    DuplicateUsername { username: String },

    #[error("account not found")]
    AccountNotFound { username: String },

    #[error("account backend error: {0}")]
    Backend(#[from] BackendError),
}

impl AccountError {
    /// HTTP status a hosting layer should answer with.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::AccountNotFound { .. } => 404,
            Self::DuplicateUsername { .. } => 409,
            Self::Backend(_) => 500,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::AccountNotFound { .. })
    }

    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::DuplicateUsername { .. })
    }

    /// Username the failed operation referred to, if any.
    pub fn username(&self) -> Option<&str> {
        match self {
            Self::DuplicateUsername { username } | Self::AccountNotFound { username } => {
                Some(username)
            }
            Self::Backend(_) => None,
        }
    }
}

/// Persistence-layer failures other than "nothing matched" and
/// "username already taken", which backends report as ordinary values.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("connection pool: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T, E = AccountError> = std::result::Result<T, E>;
