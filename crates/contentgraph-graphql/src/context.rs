//! Per-request resolution context.
//!
//! The context holds everything resolvers need: the content store, the
//! requesting account, the negotiated language, site settings, DataLoaders,
//! and the cacheability accumulated while the response is built. It is
//! constructed per request and handed to async-graphql as request data.
//!
//! # Example
//!
//! ```ignore
//! use contentgraph_graphql::ResolutionContextBuilder;
//!
//! let context = ResolutionContextBuilder::new()
//!     .with_store(store.clone())
//!     .with_account(account)
//!     .with_language("de")
//!     .with_settings(settings.clone())
//!     .with_request_id("req-123")
//!     .build()?;
//! ```

use std::sync::{Arc, Mutex, PoisonError};

use contentgraph_storage::{Account, CacheMetadata, DynContentStore, EntityId, EntityRecord};
use dashmap::DashMap;

use crate::config::SharedSiteSettings;
use crate::error::GraphQLError;
use crate::loaders::{DataLoaders, EntityKey};

/// Resolution context for one GraphQL request.
///
/// Cheap to clone; shared state lives behind `Arc`.
#[derive(Clone)]
pub struct ResolutionContext {
    /// Content store backing the schema.
    pub store: DynContentStore,

    /// Account the request is made on behalf of.
    pub account: Account,

    /// Language negotiated for the request.
    pub language: String,

    /// Live site settings (page-size bound, default language).
    pub settings: SharedSiteSettings,

    /// Request ID for tracing and correlation.
    pub request_id: String,

    /// DataLoaders for batched entity loading.
    pub loaders: DataLoaders,

    /// Language narrowed for a response subtree, keyed by response path.
    overrides: Arc<DashMap<String, String>>,

    /// Cacheability collected while resolving.
    cache: Arc<Mutex<CacheMetadata>>,
}

impl ResolutionContext {
    /// Creates a new builder for ResolutionContext.
    #[must_use]
    pub fn builder() -> ResolutionContextBuilder {
        ResolutionContextBuilder::default()
    }

    /// The request language.
    #[must_use]
    pub fn language(&self) -> &str {
        &self.language
    }

    /// Language narrowed at exactly `path`, if any.
    #[must_use]
    pub fn language_override(&self, path: &str) -> Option<String> {
        self.overrides.get(path).map(|entry| entry.value().clone())
    }

    /// Narrows the language for the subtree rooted at `path`.
    pub fn set_language_override(&self, path: impl Into<String>, langcode: impl Into<String>) {
        self.overrides.insert(path.into(), langcode.into());
    }

    /// Folds cacheability into the response metadata.
    pub fn add_cacheability(&self, metadata: &CacheMetadata) {
        if metadata.is_empty() {
            return;
        }
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .merge(metadata);
    }

    /// Adds a single cache tag.
    pub fn add_cache_tag(&self, tag: impl Into<String>) {
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .tags
            .insert(tag.into());
    }

    /// Snapshot of the cacheability collected so far.
    #[must_use]
    pub fn cacheability(&self) -> CacheMetadata {
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Loads the default revision of an entity through the DataLoader.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub async fn load_entity(
        &self,
        kind: &str,
        id: EntityId,
    ) -> Result<Option<Arc<EntityRecord>>, GraphQLError> {
        self.loaders
            .entity_loader
            .load_one(EntityKey::new(kind, id))
            .await
            .map_err(|e| GraphQLError::clone(&e))
    }

    /// Loads several entities at once, preserving the order of `keys` and
    /// skipping missing ones.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub async fn load_entities(
        &self,
        keys: Vec<EntityKey>,
    ) -> Result<Vec<Arc<EntityRecord>>, GraphQLError> {
        let loaded = self
            .loaders
            .entity_loader
            .load_many(keys.iter().cloned())
            .await
            .map_err(|e| GraphQLError::clone(&e))?;

        Ok(keys
            .iter()
            .filter_map(|key| loaded.get(key).cloned())
            .collect())
    }
}

/// Builder for constructing ResolutionContext.
#[derive(Default)]
pub struct ResolutionContextBuilder {
    store: Option<DynContentStore>,
    account: Option<Account>,
    language: Option<String>,
    settings: Option<SharedSiteSettings>,
    request_id: Option<String>,
}

impl ResolutionContextBuilder {
    /// Creates a new builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the content store.
    #[must_use]
    pub fn with_store(mut self, store: DynContentStore) -> Self {
        self.store = Some(store);
        self
    }

    /// Sets the requesting account. Defaults to anonymous.
    #[must_use]
    pub fn with_account(mut self, account: Account) -> Self {
        self.account = Some(account);
        self
    }

    /// Sets the request language. Defaults to the site default language.
    #[must_use]
    pub fn with_language(mut self, langcode: impl Into<String>) -> Self {
        self.language = Some(langcode.into());
        self
    }

    /// Sets the shared site settings.
    #[must_use]
    pub fn with_settings(mut self, settings: SharedSiteSettings) -> Self {
        self.settings = Some(settings);
        self
    }

    /// Sets the request ID.
    #[must_use]
    pub fn with_request_id(mut self, id: impl Into<String>) -> Self {
        self.request_id = Some(id.into());
        self
    }

    /// Builds the ResolutionContext.
    ///
    /// # Errors
    ///
    /// Returns an error if required fields are missing.
    pub fn build(self) -> Result<ResolutionContext, ContextBuilderError> {
        let store = self
            .store
            .ok_or(ContextBuilderError::MissingField("store"))?;

        let request_id = self
            .request_id
            .ok_or(ContextBuilderError::MissingField("request_id"))?;

        let settings = self.settings.unwrap_or_default();
        let language = self
            .language
            .filter(|l| !l.trim().is_empty())
            .unwrap_or_else(|| settings.current().default_langcode.clone());

        // Each request gets its own loaders so batching stays request-scoped
        let loaders = DataLoaders::new(store.clone());

        Ok(ResolutionContext {
            store,
            account: self.account.unwrap_or_default(),
            language,
            settings,
            request_id,
            loaders,
            overrides: Arc::new(DashMap::new()),
            cache: Arc::new(Mutex::new(CacheMetadata::new())),
        })
    }
}

/// Errors that can occur when building a ResolutionContext.
#[derive(Debug, thiserror::Error)]
pub enum ContextBuilderError {
    /// A required field was not provided.
    #[error("Missing required field: {0}")]
    MissingField(&'static str),
}
