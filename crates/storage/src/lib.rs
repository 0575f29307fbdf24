//! Persistence layer for the Agentic RAG platform
//!
//! - [`Storage`]: one async contract for every multi-tenant entity
//! - [`InMemoryStorage`] and [`PostgresStorage`]: interchangeable implementations
//! - [`password`]: salted Argon2id credential hashing
//! - [`SessionManager`]: token registry with a background TTL sweep

pub mod backend;
pub mod clock;
pub mod config;
pub mod error;
pub mod memory;
pub mod models;
pub mod password;
pub mod postgres;
pub mod sessions;
pub mod store;

pub use backend::open_storage;
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{SessionConfig, StorageBackendKind, StorageConfig};
pub use error::{CredentialError, StorageError, StorageResult};
pub use memory::InMemoryStorage;
pub use models::*;
pub use password::{hash_password, verify_password};
pub use postgres::PostgresStorage;
pub use sessions::{SessionManager, SessionRecord, SessionSweeper, MIN_SWEEP_INTERVAL};
pub use store::Storage;
