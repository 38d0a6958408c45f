//! Query execution.
//!
//! [`ContentGraph`] ties the store, the lazily built schema and the live
//! site settings together. Each call to [`ContentGraph::execute`] gets a
//! fresh [`ResolutionContext`]; nothing resolved for one request leaks into
//! another.

use std::sync::Arc;

use async_graphql::dynamic::Schema;
use async_graphql::{Request, Response, ServerError, Variables};
use contentgraph_storage::{Account, CacheMetadata, DynContentStore};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::{GraphQLConfig, SharedSiteSettings};
use crate::context::ResolutionContext;
use crate::error::GraphQLError;
use crate::schema::{ContentSchemaBuilder, LazySchema};

/// Header carrying the cache tags of a response.
pub const CACHE_TAGS_HEADER: &str = "X-Cache-Tags";

/// Header carrying the cache contexts of a response.
pub const CACHE_CONTEXTS_HEADER: &str = "X-Cache-Contexts";

/// GraphQL request body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GraphQLRequest {
    pub query: String,

    /// Operation to run from a multi-operation document.
    #[serde(rename = "operationName", default)]
    pub operation_name: Option<String>,

    #[serde(default)]
    pub variables: Option<serde_json::Value>,
}

impl GraphQLRequest {
    #[must_use]
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_variables(mut self, variables: serde_json::Value) -> Self {
        self.variables = Some(variables);
        self
    }

    #[must_use]
    pub fn with_operation_name(mut self, name: impl Into<String>) -> Self {
        self.operation_name = Some(name.into());
        self
    }
}

/// GraphQL response plus the cacheability collected while resolving it.
#[derive(Debug, Clone, Serialize)]
pub struct GraphQLResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<serde_json::Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub extensions: Option<serde_json::Value>,

    /// Not part of the GraphQL body; the transport layer turns it into headers.
    #[serde(skip)]
    pub cache: CacheMetadata,
}

impl GraphQLResponse {
    fn from_response(resp: Response, cache: CacheMetadata) -> Self {
        let data_json = serde_json::to_value(&resp.data).unwrap_or(serde_json::Value::Null);
        let data = if data_json.is_null() {
            None
        } else {
            Some(data_json)
        };

        Self {
            data,
            errors: resp.errors.into_iter().map(error_to_json).collect(),
            extensions: if resp.extensions.is_empty() {
                None
            } else {
                Some(serde_json::to_value(&resp.extensions).unwrap_or(serde_json::Value::Null))
            },
            cache,
        }
    }

    /// A response carrying a single request-level error.
    #[must_use]
    pub fn from_error(error: &GraphQLError) -> Self {
        let mut extensions = serde_json::json!({ "code": error.error_code() });
        if let Some(seconds) = error.retry_after() {
            extensions["retryAfter"] = serde_json::json!(seconds);
        }
        Self {
            data: None,
            errors: vec![serde_json::json!({
                "message": error.to_string(),
                "extensions": extensions,
            })],
            extensions: None,
            cache: CacheMetadata::new(),
        }
    }

    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    /// Space-separated cache tags.
    #[must_use]
    pub fn cache_tags_header(&self) -> String {
        join(&self.cache.tags)
    }

    /// Space-separated cache contexts.
    #[must_use]
    pub fn cache_contexts_header(&self) -> String {
        join(&self.cache.contexts)
    }

    /// The full response body as JSON.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

fn join(values: &std::collections::BTreeSet<String>) -> String {
    values.iter().map(String::as_str).collect::<Vec<_>>().join(" ")
}

fn error_to_json(error: ServerError) -> serde_json::Value {
    let mut error_obj = serde_json::json!({ "message": error.message });

    if !error.locations.is_empty() {
        error_obj["locations"] =
            serde_json::to_value(&error.locations).unwrap_or(serde_json::Value::Null);
    }
    if !error.path.is_empty() {
        error_obj["path"] = serde_json::to_value(&error.path).unwrap_or(serde_json::Value::Null);
    }
    if let Some(extensions) = &error.extensions {
        error_obj["extensions"] =
            serde_json::to_value(extensions).unwrap_or(serde_json::Value::Null);
    }

    error_obj
}

fn is_introspection_query(query: &str) -> bool {
    let query = query.replace("__typename", "");
    query.contains("__schema") || query.contains("__type") || query.contains("IntrospectionQuery")
}

/// The content GraphQL service.
///
/// # Example
///
/// ```ignore
/// let graph = ContentGraph::new(store, GraphQLConfig::default().with_kind("node"));
/// let response = graph
///     .execute(GraphQLRequest::new("{ nodeItems { total } }"), Account::anonymous(), None)
///     .await;
/// ```
pub struct ContentGraph {
    store: DynContentStore,
    schema: Arc<LazySchema>,
    settings: SharedSiteSettings,
}

impl ContentGraph {
    #[must_use]
    pub fn new(store: DynContentStore, config: GraphQLConfig) -> Self {
        let settings = SharedSiteSettings::new(config.site_settings());
        let builder = ContentSchemaBuilder::new(store.clone(), config.to_schema_builder_config());
        Self {
            store,
            schema: Arc::new(LazySchema::new(builder)),
            settings,
        }
    }

    /// Live site settings; changes apply to the next resolved field.
    #[must_use]
    pub fn settings(&self) -> &SharedSiteSettings {
        &self.settings
    }

    /// The schema, built on first use.
    ///
    /// # Errors
    ///
    /// Returns an error if the schema cannot be built.
    pub async fn schema(&self) -> Result<Arc<Schema>, GraphQLError> {
        self.schema.get_or_build_wait().await
    }

    /// Rebuilds the schema after a content-model change.
    ///
    /// # Errors
    ///
    /// Returns an error if the new schema cannot be built; the previous one
    /// stays in service.
    pub async fn rebuild(&self) -> Result<Arc<Schema>, GraphQLError> {
        self.schema.rebuild().await
    }

    /// The schema in SDL form.
    ///
    /// # Errors
    ///
    /// Returns an error if the schema cannot be built.
    pub async fn sdl(&self) -> Result<String, GraphQLError> {
        Ok(self.schema().await?.sdl())
    }

    /// Executes a request on behalf of `account`.
    ///
    /// `langcode` selects the request language; `None` uses the site default.
    /// Request-level failures are reported in `errors` like field errors:
    /// an empty query is `INVALID_QUERY`, and while the first schema build
    /// runs, queries other than introspection get `SCHEMA_INITIALIZING`.
    pub async fn execute(
        &self,
        request: GraphQLRequest,
        account: Account,
        langcode: Option<&str>,
    ) -> GraphQLResponse {
        if request.query.trim().is_empty() {
            return GraphQLResponse::from_error(&GraphQLError::InvalidQuery(
                "query must not be empty".into(),
            ));
        }

        // Introspection waits for a running build; other queries are told to retry
        let schema = if is_introspection_query(&request.query) {
            self.schema.get_or_build_wait().await
        } else {
            self.schema.get_or_build().await
        };
        let schema = match schema {
            Ok(schema) => schema,
            Err(e) => {
                if e.is_client_error() {
                    debug!(error = %e, "Rejected request");
                } else {
                    warn!(error = %e, "Schema unavailable");
                }
                return GraphQLResponse::from_error(&e);
            }
        };

        let mut builder = ResolutionContext::builder()
            .with_store(self.store.clone())
            .with_account(account)
            .with_settings(self.settings.clone())
            .with_request_id(uuid::Uuid::new_v4().to_string());
        if let Some(langcode) = langcode {
            builder = builder.with_language(langcode);
        }
        let context = match builder.build() {
            Ok(context) => context,
            Err(e) => {
                return GraphQLResponse::from_error(&GraphQLError::Internal(e.to_string()));
            }
        };

        let mut gql_request = Request::new(&request.query);
        if let Some(op_name) = request.operation_name {
            gql_request = gql_request.operation_name(op_name);
        }
        if let Some(vars) = request.variables {
            gql_request = gql_request.variables(Variables::from_json(vars));
        }
        gql_request = gql_request.data(context.clone());

        debug!(
            request_id = %context.request_id,
            language = %context.language(),
            query = %request.query,
            "Executing GraphQL query"
        );
        let response = schema.execute(gql_request).await;

        let mut cache = context.cacheability();
        cache.contexts.insert(format!("languages:{}", context.language()));
        GraphQLResponse::from_response(response, cache)
    }
}
