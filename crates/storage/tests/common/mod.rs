// Behaviour every Storage implementation must share.
// Each check creates its own tenants, so checks can run against a shared database.

#![allow(dead_code)]

use agentic_storage::*;
use chrono::{Duration, TimeZone, Utc};
use std::sync::Arc;
use serde_json::json;
use uuid::Uuid;

/// One row of every entity, wired parent to child
pub struct Fixture {
    pub tenant: Tenant,
    pub user: UserProfile,
    pub document: Document,
    pub chunk: DocumentChunk,
    pub session: ChatSession,
    pub message: ChatMessage,
    pub source: DataSource,
    pub agent: CustomAgent,
    pub execution: AgentExecution,
}

fn unique(label: &str) -> String {
    format!("{label}-{}", Uuid::now_v7().simple())
}

pub async fn seed(store: &dyn Storage, label: &str) -> Fixture {
    let tenant = store
        .create_tenant(NewTenant {
            name: unique(label),
        })
        .await
        .unwrap();

    let user = store
        .create_user_profile(NewUserProfile {
            tenant_id: tenant.id,
            email: format!("{}@x.com", unique(label)),
            full_name: Some("Test User".to_string()),
            role: UserRole::Admin,
            password_hash: None,
        })
        .await
        .unwrap();

    let document = store
        .create_document(NewDocument {
            tenant_id: tenant.id,
            title: "D1".to_string(),
            file_type: "pdf".to_string(),
            file_path: Some("/uploads/d1.pdf".to_string()),
            file_size: Some(2048),
            metadata: json!({"pages": 3}),
        })
        .await
        .unwrap();

    let chunk = store
        .create_document_chunk(NewDocumentChunk {
            document_id: document.id,
            chunk_index: 0,
            content: "chunk-1".to_string(),
            metadata: json!({}),
        })
        .await
        .unwrap();

    let session = store
        .create_chat_session(NewChatSession {
            user_id: user.id,
            title: "First chat".to_string(),
        })
        .await
        .unwrap();

    let message = store
        .create_chat_message(NewChatMessage {
            session_id: session.id,
            role: MessageRole::User,
            content: "hello".to_string(),
            metadata: json!({}),
        })
        .await
        .unwrap();

    let source = store
        .create_data_source(NewDataSource {
            tenant_id: tenant.id,
            name: "Bucket".to_string(),
            source_type: "s3".to_string(),
            config: json!({"bucket": "docs"}),
        })
        .await
        .unwrap();

    let agent = store
        .create_custom_agent(NewCustomAgent {
            tenant_id: tenant.id,
            name: "Summarizer".to_string(),
            description: None,
            agent_type: "workflow".to_string(),
            config: json!({"steps": []}),
        })
        .await
        .unwrap();

    let execution = store
        .create_agent_execution(NewAgentExecution {
            agent_id: agent.id,
            input_data: json!({"query": "q"}),
        })
        .await
        .unwrap();

    Fixture {
        tenant,
        user,
        document,
        chunk,
        session,
        message,
        source,
        agent,
        execution,
    }
}

pub async fn create_then_get_returns_same_entity(store: &dyn Storage) {
    let f = seed(store, "roundtrip").await;

    assert_eq!(store.get_tenant(f.tenant.id).await.unwrap(), Some(f.tenant.clone()));
    assert_eq!(store.get_user_profile(f.user.id).await.unwrap(), Some(f.user.clone()));
    assert_eq!(store.get_document(f.document.id).await.unwrap(), Some(f.document.clone()));
    assert_eq!(store.get_document_chunk(f.chunk.id).await.unwrap(), Some(f.chunk.clone()));
    assert_eq!(store.get_chat_session(f.session.id).await.unwrap(), Some(f.session.clone()));
    assert_eq!(store.get_chat_message(f.message.id).await.unwrap(), Some(f.message.clone()));
    assert_eq!(store.get_data_source(f.source.id).await.unwrap(), Some(f.source.clone()));
    assert_eq!(store.get_custom_agent(f.agent.id).await.unwrap(), Some(f.agent.clone()));
    assert_eq!(
        store.get_agent_execution(f.execution.id).await.unwrap(),
        Some(f.execution.clone())
    );

    // Store-assigned defaults
    assert_eq!(f.tenant.created_at, f.tenant.updated_at);
    assert!(f.user.is_active);
    assert_eq!(f.document.status, DocumentStatus::Pending);
    assert_eq!(f.source.sync_status, SyncStatus::Idle);
    assert_eq!(f.execution.status, ExecutionStatus::Running);
    assert_eq!(f.execution.completed_at, None);
}

pub async fn update_applies_only_supplied_fields(store: &dyn Storage) {
    let f = seed(store, "partial").await;

    let tenant = store
        .update_tenant(
            f.tenant.id,
            UpdateTenant {
                name: Some("Renamed".to_string()),
            },
        )
        .await
        .unwrap();
    assert_eq!(tenant.name, "Renamed");
    assert_eq!(tenant.created_at, f.tenant.created_at);
    assert!(tenant.updated_at > f.tenant.updated_at);

    let user = store
        .update_user_profile(
            f.user.id,
            UpdateUserProfile {
                role: Some(UserRole::Viewer),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(user.role, UserRole::Viewer);
    assert_eq!(user.email, f.user.email);
    assert_eq!(user.full_name, f.user.full_name);
    assert!(user.updated_at > f.user.updated_at);

    let document = store
        .update_document(
            f.document.id,
            UpdateDocument {
                status: Some(DocumentStatus::Completed),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(document.status, DocumentStatus::Completed);
    assert_eq!(document.title, f.document.title);
    assert_eq!(document.file_size, f.document.file_size);
    assert_eq!(document.metadata, f.document.metadata);
    assert!(document.updated_at > f.document.updated_at);

    // Caller timestamps far from the epoch still lose sub-microsecond digits
    let processed_at = Utc.with_ymd_and_hms(3000, 1, 1, 0, 0, 0).unwrap()
        + Duration::nanoseconds(123_456_789);
    let document = store
        .update_document(
            f.document.id,
            UpdateDocument {
                processed_at: Some(processed_at),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    let stored_at = document.processed_at.unwrap();
    assert_eq!(stored_at.timestamp(), processed_at.timestamp());
    assert_eq!(stored_at.timestamp_subsec_nanos(), 123_456_000);
    assert_eq!(stored_at.timestamp_subsec_nanos() % 1_000, 0);
    assert_eq!(document.status, DocumentStatus::Completed);

    let chunk = store
        .update_document_chunk(
            f.chunk.id,
            UpdateDocumentChunk {
                content: Some("rewritten".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(chunk.content, "rewritten");
    assert_eq!(chunk.chunk_index, f.chunk.chunk_index);
    assert_eq!(chunk.created_at, f.chunk.created_at);

    let session = store
        .update_chat_session(
            f.session.id,
            UpdateChatSession {
                title: Some("Renamed chat".to_string()),
            },
        )
        .await
        .unwrap();
    assert_eq!(session.title, "Renamed chat");
    assert_eq!(session.user_id, f.session.user_id);
    assert!(session.updated_at > f.session.updated_at);

    let message = store
        .update_chat_message(
            f.message.id,
            UpdateChatMessage {
                metadata: Some(json!({"edited": true})),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(message.metadata, json!({"edited": true}));
    assert_eq!(message.content, f.message.content);
    assert_eq!(message.role, f.message.role);

    let source = store
        .update_data_source(
            f.source.id,
            UpdateDataSource {
                sync_status: Some(SyncStatus::Syncing),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(source.sync_status, SyncStatus::Syncing);
    assert_eq!(source.config, f.source.config);
    assert!(source.is_active);
    assert!(source.updated_at > f.source.updated_at);

    let ran_at = Utc::now();
    let agent = store
        .update_custom_agent(
            f.agent.id,
            UpdateCustomAgent {
                last_executed_at: Some(ran_at),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(agent.last_executed_at.is_some());
    assert_eq!(agent.name, f.agent.name);
    assert_eq!(agent.config, f.agent.config);
    assert!(agent.updated_at > f.agent.updated_at);

    let execution = store
        .update_agent_execution(
            f.execution.id,
            UpdateAgentExecution {
                output_data: Some(json!({"answer": 42})),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(execution.output_data, Some(json!({"answer": 42})));
    assert_eq!(execution.status, ExecutionStatus::Running);
    assert_eq!(execution.input_data, f.execution.input_data);
    assert_eq!(execution.started_at, f.execution.started_at);

    // Re-read matches what update returned
    assert_eq!(store.get_document(f.document.id).await.unwrap(), Some(document));
}

pub async fn repeated_updates_keep_increasing_updated_at(store: &dyn Storage) {
    let f = seed(store, "monotonic").await;

    let mut previous = f.tenant.updated_at;
    for round in 0..5 {
        let tenant = store
            .update_tenant(
                f.tenant.id,
                UpdateTenant {
                    name: Some(format!("round {round}")),
                },
            )
            .await
            .unwrap();
        assert!(tenant.updated_at > previous);
        previous = tenant.updated_at;
    }
}

pub async fn update_missing_id_is_not_found(store: &dyn Storage) {
    let missing = Uuid::now_v7();

    let errors = vec![
        store.update_tenant(missing, Default::default()).await.err(),
        store.update_user_profile(missing, Default::default()).await.err(),
        store.update_document(missing, Default::default()).await.err(),
        store.update_document_chunk(missing, Default::default()).await.err(),
        store.update_chat_session(missing, Default::default()).await.err(),
        store.update_chat_message(missing, Default::default()).await.err(),
        store.update_data_source(missing, Default::default()).await.err(),
        store.update_custom_agent(missing, Default::default()).await.err(),
        store.update_agent_execution(missing, Default::default()).await.err(),
    ];

    for err in errors {
        let err = err.expect("update on a missing id must fail");
        assert!(err.is_not_found(), "unexpected error: {err}");
    }
}

pub async fn get_missing_id_is_none(store: &dyn Storage) {
    let missing = Uuid::now_v7();

    assert!(store.get_tenant(missing).await.unwrap().is_none());
    assert!(store.get_user_profile(missing).await.unwrap().is_none());
    assert!(store.get_document(missing).await.unwrap().is_none());
    assert!(store.get_document_chunk(missing).await.unwrap().is_none());
    assert!(store.get_chat_session(missing).await.unwrap().is_none());
    assert!(store.get_chat_message(missing).await.unwrap().is_none());
    assert!(store.get_data_source(missing).await.unwrap().is_none());
    assert!(store.get_custom_agent(missing).await.unwrap().is_none());
    assert!(store.get_agent_execution(missing).await.unwrap().is_none());
}

pub async fn delete_is_idempotent(store: &dyn Storage) {
    let missing = Uuid::now_v7();

    store.delete_tenant(missing).await.unwrap();
    store.delete_user_profile(missing).await.unwrap();
    store.delete_document(missing).await.unwrap();
    store.delete_document_chunk(missing).await.unwrap();
    store.delete_chat_session(missing).await.unwrap();
    store.delete_chat_message(missing).await.unwrap();
    store.delete_data_source(missing).await.unwrap();
    store.delete_custom_agent(missing).await.unwrap();
    store.delete_agent_execution(missing).await.unwrap();

    // Leaf first, so each delete targets a row that still exists
    let f = seed(store, "delete").await;

    store.delete_agent_execution(f.execution.id).await.unwrap();
    store.delete_agent_execution(f.execution.id).await.unwrap();
    assert!(store.get_agent_execution(f.execution.id).await.unwrap().is_none());

    store.delete_custom_agent(f.agent.id).await.unwrap();
    assert!(store.get_custom_agent(f.agent.id).await.unwrap().is_none());

    store.delete_data_source(f.source.id).await.unwrap();
    assert!(store.get_data_source(f.source.id).await.unwrap().is_none());

    store.delete_chat_message(f.message.id).await.unwrap();
    assert!(store.get_chat_message(f.message.id).await.unwrap().is_none());

    store.delete_chat_session(f.session.id).await.unwrap();
    assert!(store.get_chat_session(f.session.id).await.unwrap().is_none());

    store.delete_document_chunk(f.chunk.id).await.unwrap();
    assert!(store.get_document_chunk(f.chunk.id).await.unwrap().is_none());

    store.delete_document(f.document.id).await.unwrap();
    assert!(store.get_document(f.document.id).await.unwrap().is_none());

    store.delete_user_profile(f.user.id).await.unwrap();
    assert!(store.get_user_profile(f.user.id).await.unwrap().is_none());

    store.delete_tenant(f.tenant.id).await.unwrap();
    store.delete_tenant(f.tenant.id).await.unwrap();
    assert!(store.get_tenant(f.tenant.id).await.unwrap().is_none());
}

pub async fn scoped_listings_do_not_leak(store: &dyn Storage) {
    let a = seed(store, "tenant-a").await;
    let b = seed(store, "tenant-b").await;

    assert_eq!(
        store.get_user_profiles_by_tenant(a.tenant.id).await.unwrap(),
        vec![a.user.clone()]
    );
    assert_eq!(
        store.get_documents_by_tenant(b.tenant.id).await.unwrap(),
        vec![b.document.clone()]
    );
    assert_eq!(
        store.get_data_sources_by_tenant(a.tenant.id).await.unwrap(),
        vec![a.source.clone()]
    );
    assert_eq!(
        store.get_custom_agents_by_tenant(b.tenant.id).await.unwrap(),
        vec![b.agent.clone()]
    );
    assert_eq!(
        store.get_document_chunks_by_document(a.document.id).await.unwrap(),
        vec![a.chunk.clone()]
    );
    assert_eq!(
        store.get_chat_sessions_by_user(b.user.id).await.unwrap(),
        vec![b.session.clone()]
    );
    assert_eq!(
        store.get_chat_messages_by_session(a.session.id).await.unwrap(),
        vec![a.message.clone()]
    );
    assert_eq!(
        store.get_agent_executions_by_agent(b.agent.id).await.unwrap(),
        vec![b.execution.clone()]
    );

    // Unknown scope is an empty listing, not an error
    assert!(store
        .get_documents_by_tenant(Uuid::now_v7())
        .await
        .unwrap()
        .is_empty());
}

pub async fn tenant_document_chunk_scenario(store: &dyn Storage) {
    let tenant_a = store
        .create_tenant(NewTenant {
            name: unique("Tenant A"),
        })
        .await
        .unwrap();

    store
        .create_user_profile(NewUserProfile {
            tenant_id: tenant_a.id,
            email: "alice@x.com".to_string(),
            full_name: None,
            role: UserRole::User,
            password_hash: Some(hash_password("alice-secret").unwrap()),
        })
        .await
        .unwrap();

    let d1 = store
        .create_document(NewDocument {
            tenant_id: tenant_a.id,
            title: "D1".to_string(),
            file_type: "txt".to_string(),
            file_path: None,
            file_size: None,
            metadata: json!({}),
        })
        .await
        .unwrap();

    store
        .create_document_chunk(NewDocumentChunk {
            document_id: d1.id,
            chunk_index: 0,
            content: "chunk-1".to_string(),
            metadata: json!({}),
        })
        .await
        .unwrap();

    let chunks = store.get_document_chunks_by_document(d1.id).await.unwrap();
    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].content, "chunk-1");

    let documents = store.get_documents_by_tenant(tenant_a.id).await.unwrap();
    assert_eq!(documents.len(), 1);
    assert_eq!(documents[0].title, "D1");

    let tenant_b = store
        .create_tenant(NewTenant {
            name: unique("Tenant B"),
        })
        .await
        .unwrap();
    assert!(store
        .get_documents_by_tenant(tenant_b.id)
        .await
        .unwrap()
        .is_empty());

    let alice = store
        .get_user_profile_by_email(tenant_a.id, "Alice@X.com")
        .await
        .unwrap()
        .unwrap();
    assert!(verify_password("alice-secret", alice.password_hash.as_deref().unwrap()).unwrap());
    assert!(store
        .get_user_profile_by_email(tenant_b.id, "alice@x.com")
        .await
        .unwrap()
        .is_none());
}

pub async fn email_is_unique_per_tenant(store: &dyn Storage) {
    let a = seed(store, "email-a").await;
    let b = seed(store, "email-b").await;

    let duplicate = store
        .create_user_profile(NewUserProfile {
            tenant_id: a.tenant.id,
            email: a.user.email.to_uppercase(),
            full_name: None,
            role: UserRole::User,
            password_hash: None,
        })
        .await
        .err()
        .expect("duplicate email within a tenant must be rejected");
    assert!(duplicate.is_conflict(), "unexpected error: {duplicate}");

    // Same address in another tenant is fine
    store
        .create_user_profile(NewUserProfile {
            tenant_id: b.tenant.id,
            email: a.user.email.clone(),
            full_name: None,
            role: UserRole::User,
            password_hash: None,
        })
        .await
        .unwrap();

    let second = store
        .create_user_profile(NewUserProfile {
            tenant_id: a.tenant.id,
            email: format!("second-{}", a.user.email),
            full_name: None,
            role: UserRole::User,
            password_hash: None,
        })
        .await
        .unwrap();
    let err = store
        .update_user_profile(
            second.id,
            UpdateUserProfile {
                email: Some(a.user.email.clone()),
                ..Default::default()
            },
        )
        .await
        .err()
        .expect("renaming onto a taken email must be rejected");
    assert!(err.is_conflict(), "unexpected error: {err}");
}

pub async fn delete_cascades_to_descendants(store: &dyn Storage) {
    let f = seed(store, "cascade").await;

    store.delete_document(f.document.id).await.unwrap();
    assert!(store.get_document_chunk(f.chunk.id).await.unwrap().is_none());

    store.delete_tenant(f.tenant.id).await.unwrap();
    assert!(store.get_user_profile(f.user.id).await.unwrap().is_none());
    assert!(store
        .get_chat_sessions_by_user(f.user.id)
        .await
        .unwrap()
        .is_empty());
    assert!(store
        .get_chat_messages_by_session(f.session.id)
        .await
        .unwrap()
        .is_empty());
    assert!(store
        .get_data_sources_by_tenant(f.tenant.id)
        .await
        .unwrap()
        .is_empty());
    assert!(store
        .get_agent_executions_by_agent(f.agent.id)
        .await
        .unwrap()
        .is_empty());
}

pub async fn execution_completes_once(store: &dyn Storage) {
    let f = seed(store, "execution").await;

    let first = store
        .update_agent_execution(
            f.execution.id,
            UpdateAgentExecution {
                status: Some(ExecutionStatus::Completed),
                completed_at: Some(f.execution.started_at + chrono::Duration::seconds(5)),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(first.status, ExecutionStatus::Completed);
    assert!(first.completed_at.is_some());

    let second = store
        .update_agent_execution(
            f.execution.id,
            UpdateAgentExecution {
                completed_at: Some(f.execution.started_at + chrono::Duration::hours(1)),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(second.completed_at, first.completed_at);
}

pub async fn concurrent_updates_to_one_row_are_serialized(store: Arc<dyn Storage>) {
    let f = seed(store.as_ref(), "concurrent").await;

    let handles: Vec<_> = (0..12)
        .map(|i| {
            let store = store.clone();
            let id = f.tenant.id;
            tokio::spawn(async move {
                store
                    .update_tenant(
                        id,
                        UpdateTenant {
                            name: Some(format!("name-{i}")),
                        },
                    )
                    .await
                    .unwrap()
            })
        })
        .collect();

    let mut results = Vec::new();
    for handle in handles {
        results.push(handle.await.unwrap());
    }
    results.sort_by_key(|t| t.updated_at);
    for pair in results.windows(2) {
        assert!(pair[0].updated_at < pair[1].updated_at);
    }
    assert!(results[0].updated_at > f.tenant.updated_at);

    // Last writer wins
    let last = results.last().unwrap();
    let stored = store.get_tenant(f.tenant.id).await.unwrap().unwrap();
    assert_eq!(stored.name, last.name);
    assert_eq!(stored.updated_at, last.updated_at);
    assert!(stored.name.starts_with("name-"));
}

pub async fn concurrent_updates_to_different_fields_all_land(store: Arc<dyn Storage>) {
    let f = seed(store.as_ref(), "fields").await;
    let processed_at = Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap();
    let id = f.document.id;

    let changes = vec![
        UpdateDocument {
            title: Some("Retitled".to_string()),
            ..Default::default()
        },
        UpdateDocument {
            file_path: Some("/uploads/moved.pdf".to_string()),
            ..Default::default()
        },
        UpdateDocument {
            file_size: Some(4096),
            ..Default::default()
        },
        UpdateDocument {
            status: Some(DocumentStatus::Processing),
            ..Default::default()
        },
        UpdateDocument {
            metadata: Some(json!({"pages": 7})),
            ..Default::default()
        },
        UpdateDocument {
            processed_at: Some(processed_at),
            ..Default::default()
        },
    ];

    let handles: Vec<_> = changes
        .into_iter()
        .map(|change| {
            let store = store.clone();
            tokio::spawn(async move { store.update_document(id, change).await.unwrap() })
        })
        .collect();

    let mut stamps = Vec::new();
    for handle in handles {
        stamps.push(handle.await.unwrap().updated_at);
    }
    stamps.sort();
    for pair in stamps.windows(2) {
        assert!(pair[0] < pair[1]);
    }

    let document = store.get_document(id).await.unwrap().unwrap();
    assert_eq!(document.title, "Retitled");
    assert_eq!(document.file_path.as_deref(), Some("/uploads/moved.pdf"));
    assert_eq!(document.file_size, Some(4096));
    assert_eq!(document.status, DocumentStatus::Processing);
    assert_eq!(document.metadata, json!({"pages": 7}));
    assert_eq!(document.processed_at, Some(processed_at));
    assert_eq!(document.updated_at, *stamps.last().unwrap());
    assert_eq!(document.file_type, f.document.file_type);
}
