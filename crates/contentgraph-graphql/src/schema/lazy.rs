//! Lazy schema loading.
//!
//! `LazySchema` defers the schema build until first access and keeps the
//! result for the lifetime of the service. Content-model changes are
//! picked up by calling [`LazySchema::rebuild`]; the schema is never
//! rebuilt implicitly.

use std::sync::Arc;

use async_graphql::dynamic::Schema;
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};

use super::ContentSchemaBuilder;
use crate::error::GraphQLError;

/// State of the lazy schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SchemaState {
    /// Schema has not been built yet.
    Uninitialized,
    /// Schema is currently being built.
    Building,
    /// Schema is ready for use.
    Ready,
    /// Schema build failed.
    Failed,
}

/// Thread-safe lazy schema holder.
///
/// # Example
///
/// ```ignore
/// let lazy_schema = LazySchema::new(schema_builder);
///
/// // First access triggers build
/// let schema = lazy_schema.get_or_build_wait().await?;
///
/// // After adding a field to a sub-kind
/// let schema = lazy_schema.rebuild().await?;
/// ```
pub struct LazySchema {
    /// The cached schema (None if not built yet or invalidated).
    schema: RwLock<Option<Arc<Schema>>>,

    /// Build lock to ensure only one build at a time.
    build_lock: Mutex<()>,

    state: RwLock<SchemaState>,

    builder: Arc<ContentSchemaBuilder>,

    /// Last build error message, kept for diagnostics.
    last_error: RwLock<Option<String>>,
}

impl LazySchema {
    /// Creates a new lazy schema with the given builder.
    #[must_use]
    pub fn new(builder: ContentSchemaBuilder) -> Self {
        Self {
            schema: RwLock::new(None),
            build_lock: Mutex::new(()),
            state: RwLock::new(SchemaState::Uninitialized),
            builder: Arc::new(builder),
            last_error: RwLock::new(None),
        }
    }

    /// Gets the schema, building it if necessary.
    ///
    /// Concurrent callers receive [`GraphQLError::SchemaInitializing`] while a
    /// build is in progress instead of blocking.
    ///
    /// # Errors
    ///
    /// Returns `SchemaInitializing` if another build is in progress, or
    /// `SchemaBuildFailed` if the build fails.
    pub async fn get_or_build(&self) -> Result<Arc<Schema>, GraphQLError> {
        if let Some(schema) = self.get().await {
            return Ok(schema);
        }

        if *self.state.read().await == SchemaState::Building {
            return Err(GraphQLError::SchemaInitializing);
        }

        let Ok(_guard) = self.build_lock.try_lock() else {
            return Err(GraphQLError::SchemaInitializing);
        };

        if let Some(schema) = self.get().await {
            return Ok(schema);
        }

        self.build_locked().await
    }

    /// Gets the schema, waiting for an in-progress build instead of failing.
    ///
    /// A previous failed build is reported without retrying; call
    /// [`rebuild`](Self::rebuild) to try again.
    ///
    /// # Errors
    ///
    /// Returns `SchemaBuildFailed` if the build fails.
    pub async fn get_or_build_wait(&self) -> Result<Arc<Schema>, GraphQLError> {
        if let Some(schema) = self.get().await {
            return Ok(schema);
        }

        let _guard = self.build_lock.lock().await;

        if let Some(schema) = self.get().await {
            return Ok(schema);
        }

        if *self.state.read().await == SchemaState::Failed {
            if let Some(err) = self.last_error.read().await.as_ref() {
                return Err(GraphQLError::SchemaBuildFailed(err.clone()));
            }
        }

        self.build_locked().await
    }

    /// Gets the schema if it is already built, without triggering a build.
    async fn get(&self) -> Option<Arc<Schema>> {
        self.schema.read().await.clone()
    }

    /// Rebuilds the schema now.
    ///
    /// On failure the previous schema is kept in service.
    ///
    /// # Errors
    ///
    /// Returns `SchemaBuildFailed` if the build fails.
    pub async fn rebuild(&self) -> Result<Arc<Schema>, GraphQLError> {
        let _guard = self.build_lock.lock().await;
        let previous = self.get().await;

        // A failed build leaves the cached schema untouched
        match self.build_locked().await {
            Ok(schema) => Ok(schema),
            Err(e) => {
                if previous.is_some() {
                    *self.state.write().await = SchemaState::Ready;
                }
                Err(e)
            }
        }
    }

    /// Runs a build. The caller holds `build_lock`.
    async fn build_locked(&self) -> Result<Arc<Schema>, GraphQLError> {
        *self.state.write().await = SchemaState::Building;
        info!("Building GraphQL schema...");

        match self.builder.build().await {
            Ok(schema) => {
                let schema = Arc::new(schema);
                *self.schema.write().await = Some(Arc::clone(&schema));
                *self.state.write().await = SchemaState::Ready;
                *self.last_error.write().await = None;
                info!("GraphQL schema built successfully");
                Ok(schema)
            }
            Err(e) => {
                let error_msg = e.to_string();
                warn!(error = %error_msg, "Failed to build GraphQL schema");
                *self.state.write().await = SchemaState::Failed;
                *self.last_error.write().await = Some(error_msg.clone());
                Err(GraphQLError::SchemaBuildFailed(error_msg))
            }
        }
    }
}
