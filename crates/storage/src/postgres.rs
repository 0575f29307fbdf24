//! PostgreSQL implementation of Storage
//!
//! One statement per operation, no explicit transactions:
//! - ids and timestamps are bound from the store, matching the in-memory store
//! - updates use `COALESCE` so absent fields keep their stored value
//! - zero rows from an update means the id does not exist
//! - deletes are unconditional; cascades come from the schema

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::clock::{now_micros, Clock, SystemClock};
use crate::error::{StorageError, StorageResult};
use crate::models::*;
use crate::store::Storage;

/// DDL for every table this store reads and writes
pub const SCHEMA: &str = include_str!("../schema/postgres.sql");

/// Map a unique-constraint violation to `Conflict`; everything else passes through
fn conflict_or_backend(entity: &'static str, err: sqlx::Error) -> StorageError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            return StorageError::Conflict {
                entity,
                message: db.message().to_string(),
            };
        }
    }
    StorageError::Backend(err)
}

/// PostgreSQL implementation of Storage
///
/// Expects the tables declared in `schema/postgres.sql`.
///
/// # Example
///
/// ```ignore
/// use agentic_storage::PostgresStorage;
///
/// let store = PostgresStorage::connect("postgres://localhost/agentic", 10).await?;
/// ```
#[derive(Clone)]
pub struct PostgresStorage {
    pool: PgPool,
    clock: Arc<dyn Clock>,
}

impl PostgresStorage {
    /// Create a store over an existing connection pool
    pub fn new(pool: PgPool) -> Self {
        Self::with_clock(pool, Arc::new(SystemClock))
    }

    pub fn with_clock(pool: PgPool, clock: Arc<dyn Clock>) -> Self {
        Self { pool, clock }
    }

    /// Create database connection from URL
    pub async fn connect(database_url: &str, max_connections: u32) -> StorageResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        debug!(max_connections, "connected to PostgreSQL");
        Ok(Self::new(pool))
    }

    /// Get a reference to the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Apply the bundled table definitions; idempotent
    pub async fn ensure_schema(&self) -> StorageResult<()> {
        sqlx::raw_sql(SCHEMA).execute(&self.pool).await?;
        debug!("storage schema ensured");
        Ok(())
    }

    fn now(&self) -> DateTime<Utc> {
        now_micros(self.clock.as_ref())
    }
}

#[async_trait]
impl Storage for PostgresStorage {
    // ============================================
    // Tenants
    // ============================================

    #[instrument(skip(self))]
    async fn get_tenant(&self, id: Uuid) -> StorageResult<Option<Tenant>> {
        let row = sqlx::query_as::<_, Tenant>(
            r#"
            SELECT id, name, created_at, updated_at
            FROM tenants
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    #[instrument(skip(self, input))]
    async fn create_tenant(&self, input: NewTenant) -> StorageResult<Tenant> {
        let row = sqlx::query_as::<_, Tenant>(
            r#"
            INSERT INTO tenants (id, name, created_at, updated_at)
            VALUES ($1, $2, $3, $3)
            RETURNING id, name, created_at, updated_at
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(&input.name)
        .bind(self.now())
        .fetch_optional(&self.pool)
        .await?;

        row.ok_or(StorageError::MissingRow { entity: "tenant" })
    }

    #[instrument(skip(self, input))]
    async fn update_tenant(&self, id: Uuid, input: UpdateTenant) -> StorageResult<Tenant> {
        let row = sqlx::query_as::<_, Tenant>(
            r#"
            UPDATE tenants
            SET
                name = COALESCE($2, name),
                updated_at = GREATEST($3, updated_at + INTERVAL '1 microsecond')
            WHERE id = $1
            RETURNING id, name, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(&input.name)
        .bind(self.now())
        .fetch_optional(&self.pool)
        .await?;

        row.ok_or_else(|| StorageError::not_found("tenant", id))
    }

    #[instrument(skip(self))]
    async fn delete_tenant(&self, id: Uuid) -> StorageResult<()> {
        sqlx::query("DELETE FROM tenants WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    // ============================================
    // User profiles
    // ============================================

    #[instrument(skip(self))]
    async fn get_user_profile(&self, id: Uuid) -> StorageResult<Option<UserProfile>> {
        let row = sqlx::query_as::<_, UserProfile>(
            r#"
            SELECT id, tenant_id, email, full_name, role, password_hash, is_active,
                   last_login_at, created_at, updated_at
            FROM user_profiles
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    #[instrument(skip(self, email))]
    async fn get_user_profile_by_email(
        &self,
        tenant_id: Uuid,
        email: &str,
    ) -> StorageResult<Option<UserProfile>> {
        let row = sqlx::query_as::<_, UserProfile>(
            r#"
            SELECT id, tenant_id, email, full_name, role, password_hash, is_active,
                   last_login_at, created_at, updated_at
            FROM user_profiles
            WHERE tenant_id = $1 AND lower(email) = lower($2)
            "#,
        )
        .bind(tenant_id)
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    #[instrument(skip(self))]
    async fn get_user_profiles_by_tenant(
        &self,
        tenant_id: Uuid,
    ) -> StorageResult<Vec<UserProfile>> {
        let rows = sqlx::query_as::<_, UserProfile>(
            r#"
            SELECT id, tenant_id, email, full_name, role, password_hash, is_active,
                   last_login_at, created_at, updated_at
            FROM user_profiles
            WHERE tenant_id = $1
            "#,
        )
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    #[instrument(skip(self, input), fields(tenant_id = %input.tenant_id))]
    async fn create_user_profile(&self, input: NewUserProfile) -> StorageResult<UserProfile> {
        let row = sqlx::query_as::<_, UserProfile>(
            r#"
            INSERT INTO user_profiles (id, tenant_id, email, full_name, role, password_hash,
                                       is_active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, TRUE, $7, $7)
            RETURNING id, tenant_id, email, full_name, role, password_hash, is_active,
                      last_login_at, created_at, updated_at
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(input.tenant_id)
        .bind(&input.email)
        .bind(&input.full_name)
        .bind(input.role)
        .bind(&input.password_hash)
        .bind(self.now())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| conflict_or_backend("user_profile", e))?;

        row.ok_or(StorageError::MissingRow {
            entity: "user_profile",
        })
    }

    #[instrument(skip(self, input))]
    async fn update_user_profile(
        &self,
        id: Uuid,
        input: UpdateUserProfile,
    ) -> StorageResult<UserProfile> {
        let row = sqlx::query_as::<_, UserProfile>(
            r#"
            UPDATE user_profiles
            SET
                email = COALESCE($2, email),
                full_name = COALESCE($3, full_name),
                role = COALESCE($4, role),
                password_hash = COALESCE($5, password_hash),
                is_active = COALESCE($6, is_active),
                last_login_at = COALESCE($7, last_login_at),
                updated_at = GREATEST($8, updated_at + INTERVAL '1 microsecond')
            WHERE id = $1
            RETURNING id, tenant_id, email, full_name, role, password_hash, is_active,
                      last_login_at, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(&input.email)
        .bind(&input.full_name)
        .bind(input.role)
        .bind(&input.password_hash)
        .bind(input.is_active)
        .bind(input.last_login_at)
        .bind(self.now())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| conflict_or_backend("user_profile", e))?;

        row.ok_or_else(|| StorageError::not_found("user_profile", id))
    }

    #[instrument(skip(self))]
    async fn delete_user_profile(&self, id: Uuid) -> StorageResult<()> {
        sqlx::query("DELETE FROM user_profiles WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    // ============================================
    // Documents
    // ============================================

    #[instrument(skip(self))]
    async fn get_document(&self, id: Uuid) -> StorageResult<Option<Document>> {
        let row = sqlx::query_as::<_, Document>(
            r#"
            SELECT id, tenant_id, title, file_type, file_path, file_size, status, metadata,
                   processed_at, created_at, updated_at
            FROM documents
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    #[instrument(skip(self))]
    async fn get_documents_by_tenant(&self, tenant_id: Uuid) -> StorageResult<Vec<Document>> {
        let rows = sqlx::query_as::<_, Document>(
            r#"
            SELECT id, tenant_id, title, file_type, file_path, file_size, status, metadata,
                   processed_at, created_at, updated_at
            FROM documents
            WHERE tenant_id = $1
            "#,
        )
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    #[instrument(skip(self, input), fields(tenant_id = %input.tenant_id))]
    async fn create_document(&self, input: NewDocument) -> StorageResult<Document> {
        let row = sqlx::query_as::<_, Document>(
            r#"
            INSERT INTO documents (id, tenant_id, title, file_type, file_path, file_size,
                                   status, metadata, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $9)
            RETURNING id, tenant_id, title, file_type, file_path, file_size, status, metadata,
                      processed_at, created_at, updated_at
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(input.tenant_id)
        .bind(&input.title)
        .bind(&input.file_type)
        .bind(&input.file_path)
        .bind(input.file_size)
        .bind(DocumentStatus::Pending)
        .bind(&input.metadata)
        .bind(self.now())
        .fetch_optional(&self.pool)
        .await?;

        row.ok_or(StorageError::MissingRow { entity: "document" })
    }

    #[instrument(skip(self, input))]
    async fn update_document(&self, id: Uuid, input: UpdateDocument) -> StorageResult<Document> {
        let row = sqlx::query_as::<_, Document>(
            r#"
            UPDATE documents
            SET
                title = COALESCE($2, title),
                file_path = COALESCE($3, file_path),
                file_size = COALESCE($4, file_size),
                status = COALESCE($5, status),
                metadata = COALESCE($6, metadata),
                processed_at = COALESCE($7, processed_at),
                updated_at = GREATEST($8, updated_at + INTERVAL '1 microsecond')
            WHERE id = $1
            RETURNING id, tenant_id, title, file_type, file_path, file_size, status, metadata,
                      processed_at, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(&input.title)
        .bind(&input.file_path)
        .bind(input.file_size)
        .bind(input.status)
        .bind(&input.metadata)
        .bind(input.processed_at)
        .bind(self.now())
        .fetch_optional(&self.pool)
        .await?;

        row.ok_or_else(|| StorageError::not_found("document", id))
    }

    #[instrument(skip(self))]
    async fn delete_document(&self, id: Uuid) -> StorageResult<()> {
        sqlx::query("DELETE FROM documents WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    // ============================================
    // Document chunks
    // ============================================

    #[instrument(skip(self))]
    async fn get_document_chunk(&self, id: Uuid) -> StorageResult<Option<DocumentChunk>> {
        let row = sqlx::query_as::<_, DocumentChunk>(
            r#"
            SELECT id, document_id, chunk_index, content, metadata, created_at
            FROM document_chunks
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    #[instrument(skip(self))]
    async fn get_document_chunks_by_document(
        &self,
        document_id: Uuid,
    ) -> StorageResult<Vec<DocumentChunk>> {
        let rows = sqlx::query_as::<_, DocumentChunk>(
            r#"
            SELECT id, document_id, chunk_index, content, metadata, created_at
            FROM document_chunks
            WHERE document_id = $1
            "#,
        )
        .bind(document_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    #[instrument(skip(self, input), fields(document_id = %input.document_id))]
    async fn create_document_chunk(
        &self,
        input: NewDocumentChunk,
    ) -> StorageResult<DocumentChunk> {
        let row = sqlx::query_as::<_, DocumentChunk>(
            r#"
            INSERT INTO document_chunks (id, document_id, chunk_index, content, metadata, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, document_id, chunk_index, content, metadata, created_at
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(input.document_id)
        .bind(input.chunk_index)
        .bind(&input.content)
        .bind(&input.metadata)
        .bind(self.now())
        .fetch_optional(&self.pool)
        .await?;

        row.ok_or(StorageError::MissingRow {
            entity: "document_chunk",
        })
    }

    #[instrument(skip(self, input))]
    async fn update_document_chunk(
        &self,
        id: Uuid,
        input: UpdateDocumentChunk,
    ) -> StorageResult<DocumentChunk> {
        let row = sqlx::query_as::<_, DocumentChunk>(
            r#"
            UPDATE document_chunks
            SET
                chunk_index = COALESCE($2, chunk_index),
                content = COALESCE($3, content),
                metadata = COALESCE($4, metadata)
            WHERE id = $1
            RETURNING id, document_id, chunk_index, content, metadata, created_at
            "#,
        )
        .bind(id)
        .bind(input.chunk_index)
        .bind(&input.content)
        .bind(&input.metadata)
        .fetch_optional(&self.pool)
        .await?;

        row.ok_or_else(|| StorageError::not_found("document_chunk", id))
    }

    #[instrument(skip(self))]
    async fn delete_document_chunk(&self, id: Uuid) -> StorageResult<()> {
        sqlx::query("DELETE FROM document_chunks WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    // ============================================
    // Chat sessions
    // ============================================

    #[instrument(skip(self))]
    async fn get_chat_session(&self, id: Uuid) -> StorageResult<Option<ChatSession>> {
        let row = sqlx::query_as::<_, ChatSession>(
            r#"
            SELECT id, user_id, title, created_at, updated_at
            FROM chat_sessions
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    #[instrument(skip(self))]
    async fn get_chat_sessions_by_user(&self, user_id: Uuid) -> StorageResult<Vec<ChatSession>> {
        let rows = sqlx::query_as::<_, ChatSession>(
            r#"
            SELECT id, user_id, title, created_at, updated_at
            FROM chat_sessions
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    #[instrument(skip(self, input), fields(user_id = %input.user_id))]
    async fn create_chat_session(&self, input: NewChatSession) -> StorageResult<ChatSession> {
        let row = sqlx::query_as::<_, ChatSession>(
            r#"
            INSERT INTO chat_sessions (id, user_id, title, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $4)
            RETURNING id, user_id, title, created_at, updated_at
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(input.user_id)
        .bind(&input.title)
        .bind(self.now())
        .fetch_optional(&self.pool)
        .await?;

        row.ok_or(StorageError::MissingRow {
            entity: "chat_session",
        })
    }

    #[instrument(skip(self, input))]
    async fn update_chat_session(
        &self,
        id: Uuid,
        input: UpdateChatSession,
    ) -> StorageResult<ChatSession> {
        let row = sqlx::query_as::<_, ChatSession>(
            r#"
            UPDATE chat_sessions
            SET
                title = COALESCE($2, title),
                updated_at = GREATEST($3, updated_at + INTERVAL '1 microsecond')
            WHERE id = $1
            RETURNING id, user_id, title, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(&input.title)
        .bind(self.now())
        .fetch_optional(&self.pool)
        .await?;

        row.ok_or_else(|| StorageError::not_found("chat_session", id))
    }

    #[instrument(skip(self))]
    async fn delete_chat_session(&self, id: Uuid) -> StorageResult<()> {
        sqlx::query("DELETE FROM chat_sessions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    // ============================================
    // Chat messages
    // ============================================

    #[instrument(skip(self))]
    async fn get_chat_message(&self, id: Uuid) -> StorageResult<Option<ChatMessage>> {
        let row = sqlx::query_as::<_, ChatMessage>(
            r#"
            SELECT id, session_id, role, content, metadata, created_at
            FROM chat_messages
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    #[instrument(skip(self))]
    async fn get_chat_messages_by_session(
        &self,
        session_id: Uuid,
    ) -> StorageResult<Vec<ChatMessage>> {
        let rows = sqlx::query_as::<_, ChatMessage>(
            r#"
            SELECT id, session_id, role, content, metadata, created_at
            FROM chat_messages
            WHERE session_id = $1
            "#,
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    #[instrument(skip(self, input), fields(session_id = %input.session_id))]
    async fn create_chat_message(&self, input: NewChatMessage) -> StorageResult<ChatMessage> {
        let row = sqlx::query_as::<_, ChatMessage>(
            r#"
            INSERT INTO chat_messages (id, session_id, role, content, metadata, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, session_id, role, content, metadata, created_at
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(input.session_id)
        .bind(input.role)
        .bind(&input.content)
        .bind(&input.metadata)
        .bind(self.now())
        .fetch_optional(&self.pool)
        .await?;

        row.ok_or(StorageError::MissingRow {
            entity: "chat_message",
        })
    }

    #[instrument(skip(self, input))]
    async fn update_chat_message(
        &self,
        id: Uuid,
        input: UpdateChatMessage,
    ) -> StorageResult<ChatMessage> {
        let row = sqlx::query_as::<_, ChatMessage>(
            r#"
            UPDATE chat_messages
            SET
                content = COALESCE($2, content),
                metadata = COALESCE($3, metadata)
            WHERE id = $1
            RETURNING id, session_id, role, content, metadata, created_at
            "#,
        )
        .bind(id)
        .bind(&input.content)
        .bind(&input.metadata)
        .fetch_optional(&self.pool)
        .await?;

        row.ok_or_else(|| StorageError::not_found("chat_message", id))
    }

    #[instrument(skip(self))]
    async fn delete_chat_message(&self, id: Uuid) -> StorageResult<()> {
        sqlx::query("DELETE FROM chat_messages WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    // ============================================
    // Data sources
    // ============================================

    #[instrument(skip(self))]
    async fn get_data_source(&self, id: Uuid) -> StorageResult<Option<DataSource>> {
        let row = sqlx::query_as::<_, DataSource>(
            r#"
            SELECT id, tenant_id, name, source_type, config, is_active, sync_status,
                   last_sync_at, created_at, updated_at
            FROM data_sources
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    #[instrument(skip(self))]
    async fn get_data_sources_by_tenant(&self, tenant_id: Uuid) -> StorageResult<Vec<DataSource>> {
        let rows = sqlx::query_as::<_, DataSource>(
            r#"
            SELECT id, tenant_id, name, source_type, config, is_active, sync_status,
                   last_sync_at, created_at, updated_at
            FROM data_sources
            WHERE tenant_id = $1
            "#,
        )
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    #[instrument(skip(self, input), fields(tenant_id = %input.tenant_id))]
    async fn create_data_source(&self, input: NewDataSource) -> StorageResult<DataSource> {
        let row = sqlx::query_as::<_, DataSource>(
            r#"
            INSERT INTO data_sources (id, tenant_id, name, source_type, config, is_active,
                                      sync_status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, TRUE, $6, $7, $7)
            RETURNING id, tenant_id, name, source_type, config, is_active, sync_status,
                      last_sync_at, created_at, updated_at
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(input.tenant_id)
        .bind(&input.name)
        .bind(&input.source_type)
        .bind(&input.config)
        .bind(SyncStatus::Idle)
        .bind(self.now())
        .fetch_optional(&self.pool)
        .await?;

        row.ok_or(StorageError::MissingRow {
            entity: "data_source",
        })
    }

    #[instrument(skip(self, input))]
    async fn update_data_source(
        &self,
        id: Uuid,
        input: UpdateDataSource,
    ) -> StorageResult<DataSource> {
        let row = sqlx::query_as::<_, DataSource>(
            r#"
            UPDATE data_sources
            SET
                name = COALESCE($2, name),
                config = COALESCE($3, config),
                is_active = COALESCE($4, is_active),
                sync_status = COALESCE($5, sync_status),
                last_sync_at = COALESCE($6, last_sync_at),
                updated_at = GREATEST($7, updated_at + INTERVAL '1 microsecond')
            WHERE id = $1
            RETURNING id, tenant_id, name, source_type, config, is_active, sync_status,
                      last_sync_at, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(&input.name)
        .bind(&input.config)
        .bind(input.is_active)
        .bind(input.sync_status)
        .bind(input.last_sync_at)
        .bind(self.now())
        .fetch_optional(&self.pool)
        .await?;

        row.ok_or_else(|| StorageError::not_found("data_source", id))
    }

    #[instrument(skip(self))]
    async fn delete_data_source(&self, id: Uuid) -> StorageResult<()> {
        sqlx::query("DELETE FROM data_sources WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    // ============================================
    // Custom agents
    // ============================================

    #[instrument(skip(self))]
    async fn get_custom_agent(&self, id: Uuid) -> StorageResult<Option<CustomAgent>> {
        let row = sqlx::query_as::<_, CustomAgent>(
            r#"
            SELECT id, tenant_id, name, description, agent_type, config, is_active,
                   last_executed_at, created_at, updated_at
            FROM custom_agents
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    #[instrument(skip(self))]
    async fn get_custom_agents_by_tenant(
        &self,
        tenant_id: Uuid,
    ) -> StorageResult<Vec<CustomAgent>> {
        let rows = sqlx::query_as::<_, CustomAgent>(
            r#"
            SELECT id, tenant_id, name, description, agent_type, config, is_active,
                   last_executed_at, created_at, updated_at
            FROM custom_agents
            WHERE tenant_id = $1
            "#,
        )
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    #[instrument(skip(self, input), fields(tenant_id = %input.tenant_id))]
    async fn create_custom_agent(&self, input: NewCustomAgent) -> StorageResult<CustomAgent> {
        let row = sqlx::query_as::<_, CustomAgent>(
            r#"
            INSERT INTO custom_agents (id, tenant_id, name, description, agent_type, config,
                                       is_active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, TRUE, $7, $7)
            RETURNING id, tenant_id, name, description, agent_type, config, is_active,
                      last_executed_at, created_at, updated_at
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(input.tenant_id)
        .bind(&input.name)
        .bind(&input.description)
        .bind(&input.agent_type)
        .bind(&input.config)
        .bind(self.now())
        .fetch_optional(&self.pool)
        .await?;

        row.ok_or(StorageError::MissingRow {
            entity: "custom_agent",
        })
    }

    #[instrument(skip(self, input))]
    async fn update_custom_agent(
        &self,
        id: Uuid,
        input: UpdateCustomAgent,
    ) -> StorageResult<CustomAgent> {
        let row = sqlx::query_as::<_, CustomAgent>(
            r#"
            UPDATE custom_agents
            SET
                name = COALESCE($2, name),
                description = COALESCE($3, description),
                agent_type = COALESCE($4, agent_type),
                config = COALESCE($5, config),
                is_active = COALESCE($6, is_active),
                last_executed_at = COALESCE($7, last_executed_at),
                updated_at = GREATEST($8, updated_at + INTERVAL '1 microsecond')
            WHERE id = $1
            RETURNING id, tenant_id, name, description, agent_type, config, is_active,
                      last_executed_at, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(&input.name)
        .bind(&input.description)
        .bind(&input.agent_type)
        .bind(&input.config)
        .bind(input.is_active)
        .bind(input.last_executed_at)
        .bind(self.now())
        .fetch_optional(&self.pool)
        .await?;

        row.ok_or_else(|| StorageError::not_found("custom_agent", id))
    }

    #[instrument(skip(self))]
    async fn delete_custom_agent(&self, id: Uuid) -> StorageResult<()> {
        sqlx::query("DELETE FROM custom_agents WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    // ============================================
    // Agent executions
    // ============================================

    #[instrument(skip(self))]
    async fn get_agent_execution(&self, id: Uuid) -> StorageResult<Option<AgentExecution>> {
        let row = sqlx::query_as::<_, AgentExecution>(
            r#"
            SELECT id, agent_id, status, input_data, output_data, error, started_at, completed_at
            FROM agent_executions
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    #[instrument(skip(self))]
    async fn get_agent_executions_by_agent(
        &self,
        agent_id: Uuid,
    ) -> StorageResult<Vec<AgentExecution>> {
        let rows = sqlx::query_as::<_, AgentExecution>(
            r#"
            SELECT id, agent_id, status, input_data, output_data, error, started_at, completed_at
            FROM agent_executions
            WHERE agent_id = $1
            "#,
        )
        .bind(agent_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    #[instrument(skip(self, input), fields(agent_id = %input.agent_id))]
    async fn create_agent_execution(
        &self,
        input: NewAgentExecution,
    ) -> StorageResult<AgentExecution> {
        let row = sqlx::query_as::<_, AgentExecution>(
            r#"
            INSERT INTO agent_executions (id, agent_id, status, input_data, started_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, agent_id, status, input_data, output_data, error, started_at, completed_at
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(input.agent_id)
        .bind(ExecutionStatus::Running)
        .bind(&input.input_data)
        .bind(self.now())
        .fetch_optional(&self.pool)
        .await?;

        row.ok_or(StorageError::MissingRow {
            entity: "agent_execution",
        })
    }

    #[instrument(skip(self, input))]
    async fn update_agent_execution(
        &self,
        id: Uuid,
        input: UpdateAgentExecution,
    ) -> StorageResult<AgentExecution> {
        // completed_at is terminal: the stored value wins once present
        let row = sqlx::query_as::<_, AgentExecution>(
            r#"
            UPDATE agent_executions
            SET
                status = COALESCE($2, status),
                output_data = COALESCE($3, output_data),
                error = COALESCE($4, error),
                completed_at = COALESCE(completed_at, $5)
            WHERE id = $1
            RETURNING id, agent_id, status, input_data, output_data, error, started_at, completed_at
            "#,
        )
        .bind(id)
        .bind(input.status)
        .bind(&input.output_data)
        .bind(&input.error)
        .bind(input.completed_at)
        .fetch_optional(&self.pool)
        .await?;

        row.ok_or_else(|| StorageError::not_found("agent_execution", id))
    }

    #[instrument(skip(self))]
    async fn delete_agent_execution(&self, id: Uuid) -> StorageResult<()> {
        sqlx::query("DELETE FROM agent_executions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
