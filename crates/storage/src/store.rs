//! Storage trait definition

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::StorageResult;
use crate::models::*;

/// Persistence contract for every domain entity
///
/// Implemented by [`crate::InMemoryStorage`] and [`crate::PostgresStorage`];
/// both must be indistinguishable to callers apart from durability and speed.
///
/// Uniform shape per entity:
/// - `get_*` returns `Ok(None)` for an unknown id
/// - `get_*s_by_*` returns an unordered, possibly empty collection
/// - `create_*` assigns the id and timestamps
/// - `update_*` applies only the supplied fields and fails with
///   [`crate::StorageError::NotFound`] for an unknown id
/// - `delete_*` is idempotent and removes descendants with the entity
#[async_trait]
pub trait Storage: Send + Sync + 'static {
    // =========================================================================
    // Tenants
    // =========================================================================

    async fn get_tenant(&self, id: Uuid) -> StorageResult<Option<Tenant>>;

    async fn create_tenant(&self, input: NewTenant) -> StorageResult<Tenant>;

    async fn update_tenant(&self, id: Uuid, input: UpdateTenant) -> StorageResult<Tenant>;

    async fn delete_tenant(&self, id: Uuid) -> StorageResult<()>;

    // =========================================================================
    // User profiles
    // =========================================================================

    async fn get_user_profile(&self, id: Uuid) -> StorageResult<Option<UserProfile>>;

    /// Case-insensitive lookup within one tenant
    async fn get_user_profile_by_email(
        &self,
        tenant_id: Uuid,
        email: &str,
    ) -> StorageResult<Option<UserProfile>>;

    async fn get_user_profiles_by_tenant(&self, tenant_id: Uuid)
        -> StorageResult<Vec<UserProfile>>;

    async fn create_user_profile(&self, input: NewUserProfile) -> StorageResult<UserProfile>;

    async fn update_user_profile(
        &self,
        id: Uuid,
        input: UpdateUserProfile,
    ) -> StorageResult<UserProfile>;

    async fn delete_user_profile(&self, id: Uuid) -> StorageResult<()>;

    // =========================================================================
    // Documents
    // =========================================================================

    async fn get_document(&self, id: Uuid) -> StorageResult<Option<Document>>;

    async fn get_documents_by_tenant(&self, tenant_id: Uuid) -> StorageResult<Vec<Document>>;

    async fn create_document(&self, input: NewDocument) -> StorageResult<Document>;

    async fn update_document(&self, id: Uuid, input: UpdateDocument) -> StorageResult<Document>;

    async fn delete_document(&self, id: Uuid) -> StorageResult<()>;

    // =========================================================================
    // Document chunks
    // =========================================================================

    async fn get_document_chunk(&self, id: Uuid) -> StorageResult<Option<DocumentChunk>>;

    async fn get_document_chunks_by_document(
        &self,
        document_id: Uuid,
    ) -> StorageResult<Vec<DocumentChunk>>;

    async fn create_document_chunk(&self, input: NewDocumentChunk)
        -> StorageResult<DocumentChunk>;

    async fn update_document_chunk(
        &self,
        id: Uuid,
        input: UpdateDocumentChunk,
    ) -> StorageResult<DocumentChunk>;

    async fn delete_document_chunk(&self, id: Uuid) -> StorageResult<()>;

    // =========================================================================
    // Chat sessions
    // =========================================================================

    async fn get_chat_session(&self, id: Uuid) -> StorageResult<Option<ChatSession>>;

    async fn get_chat_sessions_by_user(&self, user_id: Uuid) -> StorageResult<Vec<ChatSession>>;

    async fn create_chat_session(&self, input: NewChatSession) -> StorageResult<ChatSession>;

    async fn update_chat_session(
        &self,
        id: Uuid,
        input: UpdateChatSession,
    ) -> StorageResult<ChatSession>;

    async fn delete_chat_session(&self, id: Uuid) -> StorageResult<()>;

    // =========================================================================
    // Chat messages
    // =========================================================================

    async fn get_chat_message(&self, id: Uuid) -> StorageResult<Option<ChatMessage>>;

    async fn get_chat_messages_by_session(
        &self,
        session_id: Uuid,
    ) -> StorageResult<Vec<ChatMessage>>;

    async fn create_chat_message(&self, input: NewChatMessage) -> StorageResult<ChatMessage>;

    async fn update_chat_message(
        &self,
        id: Uuid,
        input: UpdateChatMessage,
    ) -> StorageResult<ChatMessage>;

    async fn delete_chat_message(&self, id: Uuid) -> StorageResult<()>;

    // =========================================================================
    // Data sources
    // =========================================================================

    async fn get_data_source(&self, id: Uuid) -> StorageResult<Option<DataSource>>;

    async fn get_data_sources_by_tenant(&self, tenant_id: Uuid) -> StorageResult<Vec<DataSource>>;

    async fn create_data_source(&self, input: NewDataSource) -> StorageResult<DataSource>;

    async fn update_data_source(
        &self,
        id: Uuid,
        input: UpdateDataSource,
    ) -> StorageResult<DataSource>;

    async fn delete_data_source(&self, id: Uuid) -> StorageResult<()>;

    // =========================================================================
    // Custom agents
    // =========================================================================

    async fn get_custom_agent(&self, id: Uuid) -> StorageResult<Option<CustomAgent>>;

    async fn get_custom_agents_by_tenant(&self, tenant_id: Uuid)
        -> StorageResult<Vec<CustomAgent>>;

    async fn create_custom_agent(&self, input: NewCustomAgent) -> StorageResult<CustomAgent>;

    async fn update_custom_agent(
        &self,
        id: Uuid,
        input: UpdateCustomAgent,
    ) -> StorageResult<CustomAgent>;

    async fn delete_custom_agent(&self, id: Uuid) -> StorageResult<()>;

    // =========================================================================
    // Agent executions
    // =========================================================================

    async fn get_agent_execution(&self, id: Uuid) -> StorageResult<Option<AgentExecution>>;

    async fn get_agent_executions_by_agent(
        &self,
        agent_id: Uuid,
    ) -> StorageResult<Vec<AgentExecution>>;

    async fn create_agent_execution(
        &self,
        input: NewAgentExecution,
    ) -> StorageResult<AgentExecution>;

    /// `completed_at` is terminal: once set, later values are ignored
    async fn update_agent_execution(
        &self,
        id: Uuid,
        input: UpdateAgentExecution,
    ) -> StorageResult<AgentExecution>;

    async fn delete_agent_execution(&self, id: Uuid) -> StorageResult<()>;
}
