//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use contentgraph_db_memory::InMemoryStore;
use contentgraph_graphql::{ContentGraph, GraphQLConfig, GraphQLRequest};
use contentgraph_storage::{
    AccessOperation, AccessResult, AccessTarget, Account, Capability, ContentStore,
    EntityId, EntityKindDescriptor, EntityQuery, EntityRecord, FieldDescriptor, FieldType,
    RevisionId, RevisionIndex, StorageError, ValueDomain,
};
use serde_json::Value;
use tracing_subscriber::EnvFilter;

pub const NOTES_PERMISSION: &str = "view editorial notes";

/// Registers the content model shared by most tests.
///
/// - `node` with `article` and `page` sub-kinds
/// - `taxonomy_term` with a `tags` sub-kind
/// - `user` without sub-kinds
/// - `comment`, which is never exposed
pub fn content_model(store: &InMemoryStore) {
    store.register_kind(
        EntityKindDescriptor::new("node", "Content")
            .with_sub_kind("article", "Article")
            .with_sub_kind("page", "Basic page")
            .with_capability(Capability::Linkable)
            .with_capability(Capability::Translatable)
            .with_capability(Capability::Revisionable)
            .with_base_field(FieldDescriptor::new("body", FieldType::Text)),
    );
    store.register_kind(
        EntityKindDescriptor::new("taxonomy_term", "Taxonomy term")
            .with_sub_kind("tags", "Tags")
            .with_capability(Capability::Translatable),
    );
    store.register_kind(EntityKindDescriptor::new("user", "User"));
    store.register_kind(EntityKindDescriptor::new("comment", "Comment"));
    store.register_domain(ValueDomain::new("menu", &["main", "footer", "404_pages"]));

    store
        .register_fields(
            "node",
            "article",
            vec![
                FieldDescriptor::new("field_tags", FieldType::EntityReference)
                    .targeting("taxonomy_term", &["tags"])
                    .multiple(),
                FieldDescriptor::new("field_author", FieldType::EntityReference)
                    .targeting("user", &[]),
                FieldDescriptor::new("field_related", FieldType::EntityReference)
                    .targeting("node", &[])
                    .multiple(),
                FieldDescriptor::new("field_attachments", FieldType::EntityReference).multiple(),
                FieldDescriptor::new("field_link", FieldType::Link),
                FieldDescriptor::new(
                    "field_menu",
                    FieldType::Choice {
                        domain: "menu".into(),
                    },
                ),
                FieldDescriptor::new("field_rating", FieldType::Integer),
                FieldDescriptor::new("field_notes", FieldType::String),
            ],
        )
        .expect("article fields");
    store.restrict_field("node", "field_notes", NOTES_PERMISSION);
}

/// A store with the shared content model and no content.
pub fn store() -> Arc<InMemoryStore> {
    let store = Arc::new(InMemoryStore::new());
    content_model(&store);
    store
}

/// Enables `node`, `taxonomy_term` and `user`.
pub fn config() -> GraphQLConfig {
    GraphQLConfig::default()
        .with_kind("node")
        .with_kind("taxonomy_term")
        .with_kind("user")
}

/// Routes logs to the test writer; `RUST_LOG=contentgraph_graphql=debug`
/// shows synthesis and resolution details for a failing test.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn graph(store: Arc<dyn ContentStore>) -> ContentGraph {
    init_tracing();
    ContentGraph::new(store, config())
}

/// Runs a query and returns the response body.
pub async fn run(graph: &ContentGraph, query: &str, account: Account) -> Value {
    graph
        .execute(GraphQLRequest::new(query), account, None)
        .await
        .to_json()
}

/// Runs a query in `langcode` and returns the response body.
pub async fn run_in(graph: &ContentGraph, query: &str, account: Account, langcode: &str) -> Value {
    graph
        .execute(GraphQLRequest::new(query), account, Some(langcode))
        .await
        .to_json()
}

/// Asserts a response has no errors and returns its data.
pub fn data(body: &Value) -> &Value {
    assert!(body.get("errors").is_none(), "unexpected errors: {body}");
    &body["data"]
}

/// First error code of a response.
pub fn error_code(body: &Value) -> &str {
    body["errors"][0]["extensions"]["code"]
        .as_str()
        .unwrap_or_default()
}

/// Store wrapper counting loads, used to observe batching.
pub struct CountingStore {
    inner: Arc<InMemoryStore>,
    pub load_by_id_calls: AtomicUsize,
    pub load_multiple_calls: AtomicUsize,
    pub load_translation_calls: AtomicUsize,
}

impl CountingStore {
    pub fn new(inner: Arc<InMemoryStore>) -> Self {
        Self {
            inner,
            load_by_id_calls: AtomicUsize::new(0),
            load_multiple_calls: AtomicUsize::new(0),
            load_translation_calls: AtomicUsize::new(0),
        }
    }

    pub fn load_by_id_calls(&self) -> usize {
        self.load_by_id_calls.load(Ordering::SeqCst)
    }

    pub fn load_multiple_calls(&self) -> usize {
        self.load_multiple_calls.load(Ordering::SeqCst)
    }

    pub fn load_translation_calls(&self) -> usize {
        self.load_translation_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContentStore for CountingStore {
    async fn list_kinds(&self) -> Result<Vec<EntityKindDescriptor>, StorageError> {
        self.inner.list_kinds().await
    }

    async fn describe_fields(
        &self,
        kind: &str,
        sub_kind: Option<&str>,
    ) -> Result<Vec<FieldDescriptor>, StorageError> {
        self.inner.describe_fields(kind, sub_kind).await
    }

    async fn value_domains(&self) -> Result<Vec<ValueDomain>, StorageError> {
        self.inner.value_domains().await
    }

    async fn load_by_id(
        &self,
        kind: &str,
        id: EntityId,
    ) -> Result<Option<EntityRecord>, StorageError> {
        self.load_by_id_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.load_by_id(kind, id).await
    }

    async fn load_multiple(
        &self,
        kind: &str,
        ids: &[EntityId],
    ) -> Result<HashMap<EntityId, EntityRecord>, StorageError> {
        self.load_multiple_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.load_multiple(kind, ids).await
    }

    async fn load_translation(
        &self,
        record: &EntityRecord,
        langcode: &str,
    ) -> Result<Option<EntityRecord>, StorageError> {
        self.load_translation_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.load_translation(record, langcode).await
    }

    async fn revision_index(
        &self,
        kind: &str,
        id: EntityId,
    ) -> Result<Option<RevisionIndex>, StorageError> {
        self.inner.revision_index(kind, id).await
    }

    async fn load_revision(
        &self,
        kind: &str,
        revision_id: RevisionId,
        langcode: Option<&str>,
    ) -> Result<Option<EntityRecord>, StorageError> {
        self.inner.load_revision(kind, revision_id, langcode).await
    }

    async fn query_by_kind(
        &self,
        kind: &str,
        query: &EntityQuery,
    ) -> Result<Vec<EntityRecord>, StorageError> {
        self.inner.query_by_kind(kind, query).await
    }

    async fn check_access(
        &self,
        target: AccessTarget<'_>,
        operation: AccessOperation,
        account: &Account,
    ) -> Result<AccessResult, StorageError> {
        self.inner.check_access(target, operation, account).await
    }

    fn backend_name(&self) -> &'static str {
        "counting"
    }
}
