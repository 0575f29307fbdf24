// Storage backend selection
// Decision: Callers hold `Arc<dyn Storage>`; the concrete backend is chosen once at startup
// Decision: The database backend applies the bundled schema when it connects

use std::sync::Arc;

use tracing::info;

use crate::config::{StorageBackendKind, StorageConfig};
use crate::error::{StorageError, StorageResult};
use crate::memory::InMemoryStorage;
use crate::postgres::PostgresStorage;
use crate::store::Storage;

/// Build the Storage implementation named by `config`
pub async fn open_storage(config: &StorageConfig) -> StorageResult<Arc<dyn Storage>> {
    match config.backend {
        StorageBackendKind::Memory => {
            info!("Using in-memory storage (data is lost on restart)");
            Ok(Arc::new(InMemoryStorage::new()))
        }
        StorageBackendKind::Postgres => {
            let url = config
                .database_url
                .as_deref()
                .ok_or_else(|| {
                    StorageError::Config(
                        "DATABASE_URL is required for the postgres backend".to_string(),
                    )
                })?;

            let store = PostgresStorage::connect(url, config.max_connections).await?;
            store.ensure_schema().await?;

            info!(
                max_connections = config.max_connections,
                "Using PostgreSQL storage"
            );
            Ok(Arc::new(store))
        }
    }
}
