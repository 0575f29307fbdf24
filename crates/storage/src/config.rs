// Storage and session configuration loaded from environment variables.
// Decision: Default to the in-memory backend for local development
// Decision: Unparseable numbers fall back to their defaults

use std::time::Duration;

const DEFAULT_MAX_CONNECTIONS: u32 = 10;
const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(24 * 60 * 60);
const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Which Storage implementation to build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StorageBackendKind {
    /// Transient maps (dev mode)
    #[default]
    Memory,
    /// PostgreSQL (production)
    Postgres,
}

impl StorageBackendKind {
    pub fn from_str(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "postgres" | "postgresql" => Self::Postgres,
            _ => Self::Memory,
        }
    }
}

/// Backend selection and connection settings
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub backend: StorageBackendKind,
    /// Required when `backend` is `Postgres`
    pub database_url: Option<String>,
    pub max_connections: u32,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackendKind::Memory,
            database_url: None,
            max_connections: DEFAULT_MAX_CONNECTIONS,
        }
    }
}

impl StorageConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let backend = lookup("STORAGE_BACKEND")
            .map(|s| StorageBackendKind::from_str(&s))
            .unwrap_or_default();

        let database_url = lookup("DATABASE_URL").filter(|s| !s.is_empty());

        let max_connections = lookup("DATABASE_MAX_CONNECTIONS")
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_MAX_CONNECTIONS);

        Self {
            backend,
            database_url,
            max_connections,
        }
    }

    pub fn in_memory() -> Self {
        Self::default()
    }

    pub fn postgres(database_url: impl Into<String>) -> Self {
        Self {
            backend: StorageBackendKind::Postgres,
            database_url: Some(database_url.into()),
            ..Self::default()
        }
    }
}

/// Session lifetime settings
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Age after which a session is no longer valid (default: 24 hours)
    pub ttl: Duration,
    /// Period of the background sweep (default: 1 hour)
    pub sweep_interval: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_SESSION_TTL,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
        }
    }
}

impl SessionConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let ttl = lookup("SESSION_TTL_SECS")
            .and_then(|s| s.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_SESSION_TTL);

        let sweep_interval = lookup("SESSION_SWEEP_INTERVAL_SECS")
            .and_then(|s| s.parse().ok())
            .filter(|secs: &u64| *secs > 0)
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_SWEEP_INTERVAL);

        Self {
            ttl,
            sweep_interval,
        }
    }
}
