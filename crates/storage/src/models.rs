// Entity schema shared by both storage backends
// Decision: One struct per entity, plus New* (insertable) and Update* (partial) variants
// Decision: Closed vocabularies are enums stored as snake_case TEXT columns
//
// The in-memory store and the database store both produce exactly these
// shapes, so callers never see which backend served them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Returned when a stored string does not name a known enum variant
#[derive(Debug, Clone, thiserror::Error)]
#[error("unknown {kind} value: {value:?}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

/// Declares an enum that serializes as snake_case and is stored as TEXT.
macro_rules! text_enum {
    (
        $(#[$meta:meta])*
        $name:ident { $($variant:ident => $text:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    other => Err(UnknownVariant {
                        kind: stringify!($name),
                        value: other.to_string(),
                    }),
                }
            }
        }

        impl sqlx::Type<sqlx::Postgres> for $name {
            fn type_info() -> sqlx::postgres::PgTypeInfo {
                <String as sqlx::Type<sqlx::Postgres>>::type_info()
            }

            fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
                <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
            }
        }

        impl<'q> sqlx::Encode<'q, sqlx::Postgres> for $name {
            fn encode_by_ref(
                &self,
                buf: &mut sqlx::postgres::PgArgumentBuffer,
            ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
                <&str as sqlx::Encode<'q, sqlx::Postgres>>::encode(self.as_str(), buf)
            }
        }

        impl<'r> sqlx::Decode<'r, sqlx::Postgres> for $name {
            fn decode(
                value: sqlx::postgres::PgValueRef<'r>,
            ) -> Result<Self, sqlx::error::BoxDynError> {
                let text = <&str as sqlx::Decode<'r, sqlx::Postgres>>::decode(value)?;
                Ok(text.parse::<Self>()?)
            }
        }
    };
}

text_enum! {
    /// Role of a user within its tenant
    UserRole {
        Admin => "admin",
        User => "user",
        Viewer => "viewer",
    }
}

impl Default for UserRole {
    fn default() -> Self {
        Self::User
    }
}

text_enum! {
    /// Ingestion state of an uploaded document
    DocumentStatus {
        Pending => "pending",
        Processing => "processing",
        Completed => "completed",
        Failed => "failed",
    }
}

text_enum! {
    /// Author of a chat message
    MessageRole {
        User => "user",
        Assistant => "assistant",
        System => "system",
    }
}

text_enum! {
    /// Synchronisation state of an external data source
    SyncStatus {
        Idle => "idle",
        Syncing => "syncing",
        Error => "error",
    }
}

text_enum! {
    /// Lifecycle of one agent run
    ExecutionStatus {
        Running => "running",
        Completed => "completed",
        Failed => "failed",
    }
}

fn empty_object() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

// ============================================
// Tenants
// ============================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Tenant {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTenant {
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateTenant {
    pub name: Option<String>,
}

// ============================================
// User profiles
// ============================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct UserProfile {
    pub id: Uuid,
    pub tenant_id: Uuid,
    /// Unique within the tenant, compared case-insensitively
    pub email: String,
    pub full_name: Option<String>,
    pub role: UserRole,
    /// Stored credential form produced by [`crate::password::hash_password`]
    #[serde(skip_serializing, default)]
    pub password_hash: Option<String>,
    pub is_active: bool,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUserProfile {
    pub tenant_id: Uuid,
    pub email: String,
    pub full_name: Option<String>,
    #[serde(default)]
    pub role: UserRole,
    #[serde(skip_serializing, default)]
    pub password_hash: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateUserProfile {
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub role: Option<UserRole>,
    #[serde(skip_serializing, default)]
    pub password_hash: Option<String>,
    pub is_active: Option<bool>,
    pub last_login_at: Option<DateTime<Utc>>,
}

// ============================================
// Documents
// ============================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Document {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub title: String,
    /// File type (pdf, docx, txt, ...)
    pub file_type: String,
    pub file_path: Option<String>,
    /// Size in bytes
    pub file_size: Option<i64>,
    pub status: DocumentStatus,
    pub metadata: serde_json::Value,
    pub processed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewDocument {
    pub tenant_id: Uuid,
    pub title: String,
    pub file_type: String,
    pub file_path: Option<String>,
    pub file_size: Option<i64>,
    #[serde(default = "empty_object")]
    pub metadata: serde_json::Value,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateDocument {
    pub title: Option<String>,
    pub file_path: Option<String>,
    pub file_size: Option<i64>,
    pub status: Option<DocumentStatus>,
    pub metadata: Option<serde_json::Value>,
    pub processed_at: Option<DateTime<Utc>>,
}

// ============================================
// Document chunks
// ============================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct DocumentChunk {
    pub id: Uuid,
    pub document_id: Uuid,
    /// Position of the chunk within its document
    pub chunk_index: i32,
    pub content: String,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewDocumentChunk {
    pub document_id: Uuid,
    pub chunk_index: i32,
    pub content: String,
    #[serde(default = "empty_object")]
    pub metadata: serde_json::Value,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateDocumentChunk {
    pub chunk_index: Option<i32>,
    pub content: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

// ============================================
// Chat sessions
// ============================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct ChatSession {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewChatSession {
    pub user_id: Uuid,
    pub title: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateChatSession {
    pub title: Option<String>,
}

// ============================================
// Chat messages
// ============================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct ChatMessage {
    pub id: Uuid,
    pub session_id: Uuid,
    pub role: MessageRole,
    pub content: String,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewChatMessage {
    pub session_id: Uuid,
    pub role: MessageRole,
    pub content: String,
    #[serde(default = "empty_object")]
    pub metadata: serde_json::Value,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateChatMessage {
    pub content: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

// ============================================
// Data sources
// ============================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct DataSource {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub name: String,
    /// Connector kind (s3, google_drive, sharepoint, confluence, ...)
    pub source_type: String,
    pub config: serde_json::Value,
    pub is_active: bool,
    pub sync_status: SyncStatus,
    pub last_sync_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewDataSource {
    pub tenant_id: Uuid,
    pub name: String,
    pub source_type: String,
    #[serde(default = "empty_object")]
    pub config: serde_json::Value,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateDataSource {
    pub name: Option<String>,
    pub config: Option<serde_json::Value>,
    pub is_active: Option<bool>,
    pub sync_status: Option<SyncStatus>,
    pub last_sync_at: Option<DateTime<Utc>>,
}

// ============================================
// Custom agents
// ============================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct CustomAgent {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub agent_type: String,
    pub config: serde_json::Value,
    pub is_active: bool,
    pub last_executed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCustomAgent {
    pub tenant_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub agent_type: String,
    #[serde(default = "empty_object")]
    pub config: serde_json::Value,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateCustomAgent {
    pub name: Option<String>,
    pub description: Option<String>,
    pub agent_type: Option<String>,
    pub config: Option<serde_json::Value>,
    pub is_active: Option<bool>,
    pub last_executed_at: Option<DateTime<Utc>>,
}

// ============================================
// Agent executions
// ============================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct AgentExecution {
    pub id: Uuid,
    pub agent_id: Uuid,
    pub status: ExecutionStatus,
    pub input_data: serde_json::Value,
    pub output_data: Option<serde_json::Value>,
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    /// Terminal timestamp, written at most once
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAgentExecution {
    pub agent_id: Uuid,
    #[serde(default = "empty_object")]
    pub input_data: serde_json::Value,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateAgentExecution {
    pub status: Option<ExecutionStatus>,
    pub output_data: Option<serde_json::Value>,
    pub error: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
}
