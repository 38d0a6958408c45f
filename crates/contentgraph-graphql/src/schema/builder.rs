//! Content GraphQL schema builder.
//!
//! `ContentSchemaBuilder` introspects the content model, synthesizes the
//! type system and assembles it into an async-graphql dynamic schema.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_graphql::dynamic::Schema;
use contentgraph_storage::DynContentStore;
use tracing::{debug, info};

use crate::config::{KindExposure, UnionMode};
use crate::error::GraphQLError;
use crate::schema::introspect::ContentModelIntrospector;
use crate::schema::synthesizer::{QUERY_TYPE, TypeSynthesizer};

/// Configuration for the schema builder.
#[derive(Debug, Clone)]
pub struct SchemaBuilderConfig {
    /// Maximum query depth allowed.
    pub max_depth: usize,

    /// Maximum query complexity allowed.
    pub max_complexity: usize,

    /// Whether to enable introspection queries.
    pub introspection_enabled: bool,

    /// Whether to add value accessors next to raw field accessors.
    pub value_fields: bool,

    /// How multi-target reference fields are typed.
    pub union_mode: UnionMode,

    /// Enabled entity kinds.
    pub entities: BTreeMap<String, KindExposure>,
}

impl Default for SchemaBuilderConfig {
    fn default() -> Self {
        Self {
            max_depth: 15,
            max_complexity: 500,
            introspection_enabled: true,
            value_fields: true,
            union_mode: UnionMode::Simple,
            entities: BTreeMap::new(),
        }
    }
}

/// Builds the GraphQL schema from the content model.
///
/// # Example
///
/// ```ignore
/// let builder = ContentSchemaBuilder::new(store, SchemaBuilderConfig::default());
/// let schema = builder.build().await?;
/// ```
pub struct ContentSchemaBuilder {
    /// Store the content model is read from.
    store: DynContentStore,

    /// Configuration options.
    config: SchemaBuilderConfig,
}

impl ContentSchemaBuilder {
    /// Creates a new schema builder.
    #[must_use]
    pub fn new(store: DynContentStore, config: SchemaBuilderConfig) -> Self {
        Self { store, config }
    }

    #[must_use]
    pub fn config(&self) -> &SchemaBuilderConfig {
        &self.config
    }

    /// Builds the GraphQL schema.
    ///
    /// The schema index is attached as schema data so resolvers can map
    /// entities to their concrete types.
    ///
    /// # Errors
    ///
    /// Returns an error if the content model cannot be read or the
    /// synthesized types do not form a valid schema.
    pub async fn build(&self) -> Result<Schema, GraphQLError> {
        debug!(backend = self.store.backend_name(), "Starting GraphQL schema build");

        let model = ContentModelIntrospector::new(self.store.clone(), self.config.entities.clone())
            .introspect()
            .await?;
        let output = TypeSynthesizer::new(&model, &self.config).synthesize();

        let mut schema_builder = Schema::build(QUERY_TYPE, None, None);
        for generated in output.registry.iter() {
            schema_builder = schema_builder.register(generated.materialize());
        }

        schema_builder = schema_builder
            .data(Arc::new(output.index))
            .limit_depth(self.config.max_depth)
            .limit_complexity(self.config.max_complexity);

        if !self.config.introspection_enabled {
            schema_builder = schema_builder.disable_introspection();
        }

        let schema = schema_builder
            .finish()
            .map_err(|e| GraphQLError::SchemaBuildFailed(e.to_string()))?;

        info!(
            kinds = model.kinds.len(),
            types = output.registry.len(),
            "GraphQL schema build complete"
        );
        Ok(schema)
    }
}
