// In-memory storage implementation for dev mode
// Decision: Use parking_lot for thread-safe access, one RwLock per collection
// Decision: UUIDs generated via uuid v7 (time-ordered)
//
// This implementation provides the same contract as the PostgreSQL store,
// backed by HashMaps, so the platform can run without a database.
// Deletes remove descendants the same way the schema's ON DELETE CASCADE does.
// Locks are taken one collection at a time, never nested.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use uuid::Uuid;

use crate::clock::{next_updated_at, now_micros, truncate_micros, Clock, SystemClock};
use crate::error::{StorageError, StorageResult};
use crate::models::*;
use crate::store::Storage;

type Table<T> = RwLock<HashMap<Uuid, T>>;

/// Remove every row matching `pred` and return the removed ids
fn remove_where<T>(table: &Table<T>, pred: impl Fn(&T) -> bool) -> HashSet<Uuid> {
    let mut rows = table.write();
    let ids: HashSet<Uuid> = rows
        .iter()
        .filter(|(_, row)| pred(row))
        .map(|(id, _)| *id)
        .collect();
    for id in &ids {
        rows.remove(id);
    }
    ids
}

fn select_where<T: Clone>(table: &Table<T>, pred: impl Fn(&T) -> bool) -> Vec<T> {
    table.read().values().filter(|row| pred(row)).cloned().collect()
}

/// In-memory database for dev mode
/// All data is stored in memory and lost on restart
pub struct InMemoryStorage {
    tenants: Table<Tenant>,
    user_profiles: Table<UserProfile>,
    documents: Table<Document>,
    document_chunks: Table<DocumentChunk>,
    chat_sessions: Table<ChatSession>,
    chat_messages: Table<ChatMessage>,
    data_sources: Table<DataSource>,
    custom_agents: Table<CustomAgent>,
    agent_executions: Table<AgentExecution>,
    clock: Arc<dyn Clock>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            tenants: RwLock::default(),
            user_profiles: RwLock::default(),
            documents: RwLock::default(),
            document_chunks: RwLock::default(),
            chat_sessions: RwLock::default(),
            chat_messages: RwLock::default(),
            data_sources: RwLock::default(),
            custom_agents: RwLock::default(),
            agent_executions: RwLock::default(),
            clock,
        }
    }

    fn now(&self) -> DateTime<Utc> {
        now_micros(self.clock.as_ref())
    }

    fn ensure_email_free(
        users: &HashMap<Uuid, UserProfile>,
        tenant_id: Uuid,
        email: &str,
        except: Option<Uuid>,
    ) -> StorageResult<()> {
        let wanted = email.to_lowercase();
        let taken = users.values().any(|u| {
            u.tenant_id == tenant_id && Some(u.id) != except && u.email.to_lowercase() == wanted
        });
        if taken {
            return Err(StorageError::Conflict {
                entity: "user_profile",
                message: format!("email {} already exists in tenant {}", email, tenant_id),
            });
        }
        Ok(())
    }

    // ============================================
    // Cascades
    // ============================================

    fn cascade_documents(&self, document_ids: &HashSet<Uuid>) {
        if document_ids.is_empty() {
            return;
        }
        remove_where(&self.document_chunks, |c| document_ids.contains(&c.document_id));
    }

    fn cascade_chat_sessions(&self, session_ids: &HashSet<Uuid>) {
        if session_ids.is_empty() {
            return;
        }
        remove_where(&self.chat_messages, |m| session_ids.contains(&m.session_id));
    }

    fn cascade_user_profiles(&self, user_ids: &HashSet<Uuid>) {
        if user_ids.is_empty() {
            return;
        }
        let sessions = remove_where(&self.chat_sessions, |s| user_ids.contains(&s.user_id));
        self.cascade_chat_sessions(&sessions);
    }

    fn cascade_custom_agents(&self, agent_ids: &HashSet<Uuid>) {
        if agent_ids.is_empty() {
            return;
        }
        remove_where(&self.agent_executions, |e| agent_ids.contains(&e.agent_id));
    }
}

impl Default for InMemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Storage for InMemoryStorage {
    // ============================================
    // Tenants
    // ============================================

    async fn get_tenant(&self, id: Uuid) -> StorageResult<Option<Tenant>> {
        Ok(self.tenants.read().get(&id).cloned())
    }

    async fn create_tenant(&self, input: NewTenant) -> StorageResult<Tenant> {
        let now = self.now();
        let row = Tenant {
            id: Uuid::now_v7(),
            name: input.name,
            created_at: now,
            updated_at: now,
        };
        self.tenants.write().insert(row.id, row.clone());
        Ok(row)
    }

    async fn update_tenant(&self, id: Uuid, input: UpdateTenant) -> StorageResult<Tenant> {
        let now = self.now();
        let mut tenants = self.tenants.write();
        let tenant = tenants
            .get_mut(&id)
            .ok_or_else(|| StorageError::not_found("tenant", id))?;
        if let Some(name) = input.name {
            tenant.name = name;
        }
        tenant.updated_at = next_updated_at(now, tenant.updated_at);
        Ok(tenant.clone())
    }

    async fn delete_tenant(&self, id: Uuid) -> StorageResult<()> {
        if self.tenants.write().remove(&id).is_none() {
            return Ok(());
        }
        let users = remove_where(&self.user_profiles, |u| u.tenant_id == id);
        self.cascade_user_profiles(&users);
        let documents = remove_where(&self.documents, |d| d.tenant_id == id);
        self.cascade_documents(&documents);
        remove_where(&self.data_sources, |s| s.tenant_id == id);
        let agents = remove_where(&self.custom_agents, |a| a.tenant_id == id);
        self.cascade_custom_agents(&agents);
        Ok(())
    }

    // ============================================
    // User profiles
    // ============================================

    async fn get_user_profile(&self, id: Uuid) -> StorageResult<Option<UserProfile>> {
        Ok(self.user_profiles.read().get(&id).cloned())
    }

    async fn get_user_profile_by_email(
        &self,
        tenant_id: Uuid,
        email: &str,
    ) -> StorageResult<Option<UserProfile>> {
        let wanted = email.to_lowercase();
        Ok(self
            .user_profiles
            .read()
            .values()
            .find(|u| u.tenant_id == tenant_id && u.email.to_lowercase() == wanted)
            .cloned())
    }

    async fn get_user_profiles_by_tenant(
        &self,
        tenant_id: Uuid,
    ) -> StorageResult<Vec<UserProfile>> {
        Ok(select_where(&self.user_profiles, |u| u.tenant_id == tenant_id))
    }

    async fn create_user_profile(&self, input: NewUserProfile) -> StorageResult<UserProfile> {
        let now = self.now();
        let mut users = self.user_profiles.write();
        Self::ensure_email_free(&users, input.tenant_id, &input.email, None)?;
        let row = UserProfile {
            id: Uuid::now_v7(),
            tenant_id: input.tenant_id,
            email: input.email,
            full_name: input.full_name,
            role: input.role,
            password_hash: input.password_hash,
            is_active: true,
            last_login_at: None,
            created_at: now,
            updated_at: now,
        };
        users.insert(row.id, row.clone());
        Ok(row)
    }

    async fn update_user_profile(
        &self,
        id: Uuid,
        input: UpdateUserProfile,
    ) -> StorageResult<UserProfile> {
        let now = self.now();
        let mut users = self.user_profiles.write();
        let tenant_id = users
            .get(&id)
            .map(|u| u.tenant_id)
            .ok_or_else(|| StorageError::not_found("user_profile", id))?;
        if let Some(email) = &input.email {
            Self::ensure_email_free(&users, tenant_id, email, Some(id))?;
        }
        let user = users
            .get_mut(&id)
            .ok_or_else(|| StorageError::not_found("user_profile", id))?;
        if let Some(email) = input.email {
            user.email = email;
        }
        if let Some(full_name) = input.full_name {
            user.full_name = Some(full_name);
        }
        if let Some(role) = input.role {
            user.role = role;
        }
        if let Some(password_hash) = input.password_hash {
            user.password_hash = Some(password_hash);
        }
        if let Some(is_active) = input.is_active {
            user.is_active = is_active;
        }
        if let Some(last_login_at) = input.last_login_at {
            user.last_login_at = Some(truncate_micros(last_login_at));
        }
        user.updated_at = next_updated_at(now, user.updated_at);
        Ok(user.clone())
    }

    async fn delete_user_profile(&self, id: Uuid) -> StorageResult<()> {
        if self.user_profiles.write().remove(&id).is_some() {
            self.cascade_user_profiles(&HashSet::from([id]));
        }
        Ok(())
    }

    // ============================================
    // Documents
    // ============================================

    async fn get_document(&self, id: Uuid) -> StorageResult<Option<Document>> {
        Ok(self.documents.read().get(&id).cloned())
    }

    async fn get_documents_by_tenant(&self, tenant_id: Uuid) -> StorageResult<Vec<Document>> {
        Ok(select_where(&self.documents, |d| d.tenant_id == tenant_id))
    }

    async fn create_document(&self, input: NewDocument) -> StorageResult<Document> {
        let now = self.now();
        let row = Document {
            id: Uuid::now_v7(),
            tenant_id: input.tenant_id,
            title: input.title,
            file_type: input.file_type,
            file_path: input.file_path,
            file_size: input.file_size,
            status: DocumentStatus::Pending,
            metadata: input.metadata,
            processed_at: None,
            created_at: now,
            updated_at: now,
        };
        self.documents.write().insert(row.id, row.clone());
        Ok(row)
    }

    async fn update_document(&self, id: Uuid, input: UpdateDocument) -> StorageResult<Document> {
        let now = self.now();
        let mut documents = self.documents.write();
        let document = documents
            .get_mut(&id)
            .ok_or_else(|| StorageError::not_found("document", id))?;
        if let Some(title) = input.title {
            document.title = title;
        }
        if let Some(file_path) = input.file_path {
            document.file_path = Some(file_path);
        }
        if let Some(file_size) = input.file_size {
            document.file_size = Some(file_size);
        }
        if let Some(status) = input.status {
            document.status = status;
        }
        if let Some(metadata) = input.metadata {
            document.metadata = metadata;
        }
        if let Some(processed_at) = input.processed_at {
            document.processed_at = Some(truncate_micros(processed_at));
        }
        document.updated_at = next_updated_at(now, document.updated_at);
        Ok(document.clone())
    }

    async fn delete_document(&self, id: Uuid) -> StorageResult<()> {
        if self.documents.write().remove(&id).is_some() {
            self.cascade_documents(&HashSet::from([id]));
        }
        Ok(())
    }

    // ============================================
    // Document chunks
    // ============================================

    async fn get_document_chunk(&self, id: Uuid) -> StorageResult<Option<DocumentChunk>> {
        Ok(self.document_chunks.read().get(&id).cloned())
    }

    async fn get_document_chunks_by_document(
        &self,
        document_id: Uuid,
    ) -> StorageResult<Vec<DocumentChunk>> {
        Ok(select_where(&self.document_chunks, |c| {
            c.document_id == document_id
        }))
    }

    async fn create_document_chunk(
        &self,
        input: NewDocumentChunk,
    ) -> StorageResult<DocumentChunk> {
        let row = DocumentChunk {
            id: Uuid::now_v7(),
            document_id: input.document_id,
            chunk_index: input.chunk_index,
            content: input.content,
            metadata: input.metadata,
            created_at: self.now(),
        };
        self.document_chunks.write().insert(row.id, row.clone());
        Ok(row)
    }

    async fn update_document_chunk(
        &self,
        id: Uuid,
        input: UpdateDocumentChunk,
    ) -> StorageResult<DocumentChunk> {
        let mut chunks = self.document_chunks.write();
        let chunk = chunks
            .get_mut(&id)
            .ok_or_else(|| StorageError::not_found("document_chunk", id))?;
        if let Some(chunk_index) = input.chunk_index {
            chunk.chunk_index = chunk_index;
        }
        if let Some(content) = input.content {
            chunk.content = content;
        }
        if let Some(metadata) = input.metadata {
            chunk.metadata = metadata;
        }
        Ok(chunk.clone())
    }

    async fn delete_document_chunk(&self, id: Uuid) -> StorageResult<()> {
        self.document_chunks.write().remove(&id);
        Ok(())
    }

    // ============================================
    // Chat sessions
    // ============================================

    async fn get_chat_session(&self, id: Uuid) -> StorageResult<Option<ChatSession>> {
        Ok(self.chat_sessions.read().get(&id).cloned())
    }

    async fn get_chat_sessions_by_user(&self, user_id: Uuid) -> StorageResult<Vec<ChatSession>> {
        Ok(select_where(&self.chat_sessions, |s| s.user_id == user_id))
    }

    async fn create_chat_session(&self, input: NewChatSession) -> StorageResult<ChatSession> {
        let now = self.now();
        let row = ChatSession {
            id: Uuid::now_v7(),
            user_id: input.user_id,
            title: input.title,
            created_at: now,
            updated_at: now,
        };
        self.chat_sessions.write().insert(row.id, row.clone());
        Ok(row)
    }

    async fn update_chat_session(
        &self,
        id: Uuid,
        input: UpdateChatSession,
    ) -> StorageResult<ChatSession> {
        let now = self.now();
        let mut sessions = self.chat_sessions.write();
        let session = sessions
            .get_mut(&id)
            .ok_or_else(|| StorageError::not_found("chat_session", id))?;
        if let Some(title) = input.title {
            session.title = title;
        }
        session.updated_at = next_updated_at(now, session.updated_at);
        Ok(session.clone())
    }

    async fn delete_chat_session(&self, id: Uuid) -> StorageResult<()> {
        if self.chat_sessions.write().remove(&id).is_some() {
            self.cascade_chat_sessions(&HashSet::from([id]));
        }
        Ok(())
    }

    // ============================================
    // Chat messages
    // ============================================

    async fn get_chat_message(&self, id: Uuid) -> StorageResult<Option<ChatMessage>> {
        Ok(self.chat_messages.read().get(&id).cloned())
    }

    async fn get_chat_messages_by_session(
        &self,
        session_id: Uuid,
    ) -> StorageResult<Vec<ChatMessage>> {
        Ok(select_where(&self.chat_messages, |m| m.session_id == session_id))
    }

    async fn create_chat_message(&self, input: NewChatMessage) -> StorageResult<ChatMessage> {
        let row = ChatMessage {
            id: Uuid::now_v7(),
            session_id: input.session_id,
            role: input.role,
            content: input.content,
            metadata: input.metadata,
            created_at: self.now(),
        };
        self.chat_messages.write().insert(row.id, row.clone());
        Ok(row)
    }

    async fn update_chat_message(
        &self,
        id: Uuid,
        input: UpdateChatMessage,
    ) -> StorageResult<ChatMessage> {
        let mut messages = self.chat_messages.write();
        let message = messages
            .get_mut(&id)
            .ok_or_else(|| StorageError::not_found("chat_message", id))?;
        if let Some(content) = input.content {
            message.content = content;
        }
        if let Some(metadata) = input.metadata {
            message.metadata = metadata;
        }
        Ok(message.clone())
    }

    async fn delete_chat_message(&self, id: Uuid) -> StorageResult<()> {
        self.chat_messages.write().remove(&id);
        Ok(())
    }

    // ============================================
    // Data sources
    // ============================================

    async fn get_data_source(&self, id: Uuid) -> StorageResult<Option<DataSource>> {
        Ok(self.data_sources.read().get(&id).cloned())
    }

    async fn get_data_sources_by_tenant(&self, tenant_id: Uuid) -> StorageResult<Vec<DataSource>> {
        Ok(select_where(&self.data_sources, |s| s.tenant_id == tenant_id))
    }

    async fn create_data_source(&self, input: NewDataSource) -> StorageResult<DataSource> {
        let now = self.now();
        let row = DataSource {
            id: Uuid::now_v7(),
            tenant_id: input.tenant_id,
            name: input.name,
            source_type: input.source_type,
            config: input.config,
            is_active: true,
            sync_status: SyncStatus::Idle,
            last_sync_at: None,
            created_at: now,
            updated_at: now,
        };
        self.data_sources.write().insert(row.id, row.clone());
        Ok(row)
    }

    async fn update_data_source(
        &self,
        id: Uuid,
        input: UpdateDataSource,
    ) -> StorageResult<DataSource> {
        let now = self.now();
        let mut sources = self.data_sources.write();
        let source = sources
            .get_mut(&id)
            .ok_or_else(|| StorageError::not_found("data_source", id))?;
        if let Some(name) = input.name {
            source.name = name;
        }
        if let Some(config) = input.config {
            source.config = config;
        }
        if let Some(is_active) = input.is_active {
            source.is_active = is_active;
        }
        if let Some(sync_status) = input.sync_status {
            source.sync_status = sync_status;
        }
        if let Some(last_sync_at) = input.last_sync_at {
            source.last_sync_at = Some(truncate_micros(last_sync_at));
        }
        source.updated_at = next_updated_at(now, source.updated_at);
        Ok(source.clone())
    }

    async fn delete_data_source(&self, id: Uuid) -> StorageResult<()> {
        self.data_sources.write().remove(&id);
        Ok(())
    }

    // ============================================
    // Custom agents
    // ============================================

    async fn get_custom_agent(&self, id: Uuid) -> StorageResult<Option<CustomAgent>> {
        Ok(self.custom_agents.read().get(&id).cloned())
    }

    async fn get_custom_agents_by_tenant(
        &self,
        tenant_id: Uuid,
    ) -> StorageResult<Vec<CustomAgent>> {
        Ok(select_where(&self.custom_agents, |a| a.tenant_id == tenant_id))
    }

    async fn create_custom_agent(&self, input: NewCustomAgent) -> StorageResult<CustomAgent> {
        let now = self.now();
        let row = CustomAgent {
            id: Uuid::now_v7(),
            tenant_id: input.tenant_id,
            name: input.name,
            description: input.description,
            agent_type: input.agent_type,
            config: input.config,
            is_active: true,
            last_executed_at: None,
            created_at: now,
            updated_at: now,
        };
        self.custom_agents.write().insert(row.id, row.clone());
        Ok(row)
    }

    async fn update_custom_agent(
        &self,
        id: Uuid,
        input: UpdateCustomAgent,
    ) -> StorageResult<CustomAgent> {
        let now = self.now();
        let mut agents = self.custom_agents.write();
        let agent = agents
            .get_mut(&id)
            .ok_or_else(|| StorageError::not_found("custom_agent", id))?;
        if let Some(name) = input.name {
            agent.name = name;
        }
        if let Some(description) = input.description {
            agent.description = Some(description);
        }
        if let Some(agent_type) = input.agent_type {
            agent.agent_type = agent_type;
        }
        if let Some(config) = input.config {
            agent.config = config;
        }
        if let Some(is_active) = input.is_active {
            agent.is_active = is_active;
        }
        if let Some(last_executed_at) = input.last_executed_at {
            agent.last_executed_at = Some(truncate_micros(last_executed_at));
        }
        agent.updated_at = next_updated_at(now, agent.updated_at);
        Ok(agent.clone())
    }

    async fn delete_custom_agent(&self, id: Uuid) -> StorageResult<()> {
        if self.custom_agents.write().remove(&id).is_some() {
            self.cascade_custom_agents(&HashSet::from([id]));
        }
        Ok(())
    }

    // ============================================
    // Agent executions
    // ============================================

    async fn get_agent_execution(&self, id: Uuid) -> StorageResult<Option<AgentExecution>> {
        Ok(self.agent_executions.read().get(&id).cloned())
    }

    async fn get_agent_executions_by_agent(
        &self,
        agent_id: Uuid,
    ) -> StorageResult<Vec<AgentExecution>> {
        Ok(select_where(&self.agent_executions, |e| e.agent_id == agent_id))
    }

    async fn create_agent_execution(
        &self,
        input: NewAgentExecution,
    ) -> StorageResult<AgentExecution> {
        let row = AgentExecution {
            id: Uuid::now_v7(),
            agent_id: input.agent_id,
            status: ExecutionStatus::Running,
            input_data: input.input_data,
            output_data: None,
            error: None,
            started_at: self.now(),
            completed_at: None,
        };
        self.agent_executions.write().insert(row.id, row.clone());
        Ok(row)
    }

    async fn update_agent_execution(
        &self,
        id: Uuid,
        input: UpdateAgentExecution,
    ) -> StorageResult<AgentExecution> {
        let mut executions = self.agent_executions.write();
        let execution = executions
            .get_mut(&id)
            .ok_or_else(|| StorageError::not_found("agent_execution", id))?;
        if let Some(status) = input.status {
            execution.status = status;
        }
        if let Some(output_data) = input.output_data {
            execution.output_data = Some(output_data);
        }
        if let Some(error) = input.error {
            execution.error = Some(error);
        }
        if execution.completed_at.is_none() {
            execution.completed_at = input.completed_at.map(truncate_micros);
        }
        Ok(execution.clone())
    }

    async fn delete_agent_execution(&self, id: Uuid) -> StorageResult<()> {
        self.agent_executions.write().remove(&id);
        Ok(())
    }
}
