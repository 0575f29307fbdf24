// Error types for the storage layer
// Decision: One enum per subsystem, declared with thiserror
// Decision: Engine failures are carried unchanged; nothing here retries or logs

use uuid::Uuid;

/// Error type for storage operations
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Update addressed an id that does not exist
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: Uuid },

    /// A uniqueness rule was violated (tenant-scoped email)
    #[error("{entity} conflict: {message}")]
    Conflict {
        entity: &'static str,
        message: String,
    },

    /// Insert reported success but returned no row
    #[error("insert into {entity} returned no row")]
    MissingRow { entity: &'static str },

    /// Backend could not be built from the supplied settings
    #[error("configuration error: {0}")]
    Config(String),

    /// Database error
    #[error("database error: {0}")]
    Backend(#[from] sqlx::Error),
}

impl StorageError {
    pub fn not_found(entity: &'static str, id: Uuid) -> Self {
        Self::NotFound { entity, id }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }

    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Error type for credential hashing
#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    /// Stored form could not be split into digest and salt
    #[error("malformed credential form: {0}")]
    Malformed(String),

    /// Key derivation rejected its inputs
    #[error("key derivation failed: {0}")]
    Derivation(String),
}
