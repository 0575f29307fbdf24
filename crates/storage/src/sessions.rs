//! Session registry
//!
//! Maps opaque bearer tokens to the user and tenant they authenticate.
//! Entries live in process memory only and are evicted once older than the
//! configured TTL, both on read and by a periodic [`SessionSweeper`].

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};
use uuid::Uuid;

use crate::clock::{Clock, SystemClock};
use crate::config::SessionConfig;

/// Random bytes per token; hex-encoded to twice this many characters
pub const TOKEN_BYTES: usize = 32;

/// Shortest sweep period; tokio intervals reject a zero period
pub const MIN_SWEEP_INTERVAL: Duration = Duration::from_millis(1);

/// What a token resolves to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRecord {
    pub user_id: Uuid,
    pub tenant_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Process-wide token registry
///
/// Construct once at startup and share through an `Arc`.
pub struct SessionManager {
    sessions: RwLock<HashMap<String, SessionRecord>>,
    clock: Arc<dyn Clock>,
    rng: Mutex<Box<dyn RngCore + Send>>,
    ttl: chrono::Duration,
}

impl SessionManager {
    /// Registry on the wall clock with an OS-seeded token source
    pub fn new(config: &SessionConfig) -> Self {
        Self::with_sources(config, Arc::new(SystemClock), StdRng::from_entropy())
    }

    /// Registry on the given clock with an OS-seeded token source
    pub fn with_clock(config: &SessionConfig, clock: Arc<dyn Clock>) -> Self {
        Self::with_sources(config, clock, StdRng::from_entropy())
    }

    /// Registry with an explicit clock and token source
    pub fn with_sources(
        config: &SessionConfig,
        clock: Arc<dyn Clock>,
        rng: impl RngCore + Send + 'static,
    ) -> Self {
        // Out-of-range TTLs saturate at a century
        let ttl = chrono::Duration::from_std(config.ttl)
            .unwrap_or_else(|_| chrono::Duration::days(365 * 100));

        Self {
            sessions: RwLock::new(HashMap::new()),
            clock,
            rng: Mutex::new(Box::new(rng)),
            ttl,
        }
    }

    /// Time source that stamps `created_at`
    pub fn clock(&self) -> Arc<dyn Clock> {
        self.clock.clone()
    }

    fn is_expired(&self, record: &SessionRecord, now: DateTime<Utc>) -> bool {
        now - record.created_at > self.ttl
    }

    fn generate_token(&self) -> String {
        let mut bytes = [0u8; TOKEN_BYTES];
        self.rng.lock().fill_bytes(&mut bytes);
        hex::encode(bytes)
    }

    /// Register a new session and return its token
    pub fn create_session(&self, user_id: Uuid, tenant_id: Uuid) -> String {
        let token = self.generate_token();
        let record = SessionRecord {
            user_id,
            tenant_id,
            created_at: self.clock.now(),
        };
        self.sessions.write().insert(token.clone(), record);

        debug!(%user_id, %tenant_id, "session created");
        token
    }

    /// Resolve a token; `None` if unknown, deleted, or past its TTL
    pub fn get_session(&self, token: &str) -> Option<SessionRecord> {
        let now = self.clock.now();
        self.sessions
            .read()
            .get(token)
            .filter(|record| !self.is_expired(record, now))
            .cloned()
    }

    /// Remove a token; unknown tokens are ignored
    pub fn delete_session(&self, token: &str) {
        self.sessions.write().remove(token);
    }

    /// Evict every expired entry, returning how many were removed
    pub fn sweep_expired(&self) -> usize {
        let now = self.clock.now();
        let mut sessions = self.sessions.write();
        let before = sessions.len();
        sessions.retain(|_, record| !self.is_expired(record, now));
        before - sessions.len()
    }

    /// Entries currently held, including expired ones not yet swept
    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }
}

/// Handle to the background sweep task
///
/// # Example
///
/// ```ignore
/// let sweeper = SessionSweeper::start(manager.clone(), config.sweep_interval);
/// // ... later, on shutdown
/// sweeper.shutdown().await;
/// ```
pub struct SessionSweeper {
    shutdown_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl SessionSweeper {
    /// Spawn the sweep loop; the first pass runs immediately
    ///
    /// Periods below [`MIN_SWEEP_INTERVAL`] are raised to it.
    pub fn start(manager: Arc<SessionManager>, interval: Duration) -> Self {
        let interval = interval.max(MIN_SWEEP_INTERVAL);
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let evicted = manager.sweep_expired();
                        if evicted > 0 {
                            info!(count = evicted, "Evicted expired sessions");
                        }
                    }
                    _ = shutdown_rx.changed() => {
                        debug!("Session sweep: shutdown requested");
                        break;
                    }
                }
            }

            debug!("Session sweep exited");
        });

        info!(
            interval_ms = interval.as_millis() as u64,
            "Session sweeper started"
        );
        Self {
            shutdown_tx,
            handle,
        }
    }

    /// Stop the loop and wait for it to finish
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        if let Err(e) = self.handle.await {
            tracing::error!("Session sweep task failed: {}", e);
        }
        info!("Session sweeper stopped");
    }
}
