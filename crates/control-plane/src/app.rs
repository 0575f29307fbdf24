// Process-level wiring of storage and sessions
// Decision: One AppState per process, shared by reference with whatever serves requests
// Decision: The session sweeper is started with the state and stopped explicitly on shutdown

use std::sync::Arc;

use agentic_storage::{
    open_storage, verify_password, Clock, SessionConfig, SessionManager, SessionRecord,
    SessionSweeper, Storage, StorageConfig, UpdateUserProfile,
};
use anyhow::{Context, Result};
use tracing::{debug, info};
use uuid::Uuid;

/// Shared handles for request handlers
#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<dyn Storage>,
    pub sessions: Arc<SessionManager>,
    clock: Arc<dyn Clock>,
}

impl AppState {
    /// Login times are read from the session registry's clock
    pub fn new(storage: Arc<dyn Storage>, sessions: Arc<SessionManager>) -> Self {
        let clock = sessions.clock();
        Self {
            storage,
            sessions,
            clock,
        }
    }

    /// Exchange credentials for a session token
    ///
    /// Returns `Ok(None)` for an unknown email, an inactive user, a user without
    /// a stored credential, or a wrong secret.
    pub async fn login(
        &self,
        tenant_id: Uuid,
        email: &str,
        secret: &str,
    ) -> Result<Option<String>> {
        let Some(user) = self
            .storage
            .get_user_profile_by_email(tenant_id, email)
            .await
            .context("Failed to look up user")?
        else {
            return Ok(None);
        };

        if !user.is_active {
            debug!(user_id = %user.id, "login rejected: user inactive");
            return Ok(None);
        }

        let Some(stored) = user.password_hash.as_deref() else {
            return Ok(None);
        };

        if !verify_password(secret, stored).context("Stored credential is unreadable")? {
            debug!(user_id = %user.id, "login rejected: wrong secret");
            return Ok(None);
        }

        self.storage
            .update_user_profile(
                user.id,
                UpdateUserProfile {
                    last_login_at: Some(self.clock.now()),
                    ..Default::default()
                },
            )
            .await
            .context("Failed to record login")?;

        Ok(Some(self.sessions.create_session(user.id, user.tenant_id)))
    }

    /// Resolve a bearer token to its session
    pub fn authenticate(&self, token: &str) -> Option<SessionRecord> {
        self.sessions.get_session(token)
    }

    pub fn logout(&self, token: &str) {
        self.sessions.delete_session(token);
    }
}

/// Running process: state plus the background tasks it owns
pub struct ControlPlane {
    state: AppState,
    sweeper: SessionSweeper,
}

impl ControlPlane {
    /// Open storage, build the session registry and start the sweeper
    pub async fn start(
        storage_config: &StorageConfig,
        session_config: &SessionConfig,
    ) -> Result<Self> {
        let storage = open_storage(storage_config)
            .await
            .context("Failed to open storage")?;
        let sessions = Arc::new(SessionManager::new(session_config));

        Ok(Self::from_parts(
            AppState::new(storage, sessions),
            session_config,
        ))
    }

    /// Start the sweeper over an already-built state
    pub fn from_parts(state: AppState, session_config: &SessionConfig) -> Self {
        info!(
            ttl_secs = session_config.ttl.as_secs(),
            "Session registry ready"
        );
        let sweeper = SessionSweeper::start(state.sessions.clone(), session_config.sweep_interval);
        Self { state, sweeper }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Stop background tasks
    pub async fn shutdown(self) {
        info!("Shutting down control plane");
        self.sweeper.shutdown().await;
    }
}
