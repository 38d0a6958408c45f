//! # contentgraph-graphql
//!
//! GraphQL layer synthesized from a content model.
//!
//! This crate reads entity kinds, sub-kinds and fields from a
//! [`ContentStore`](contentgraph_storage::ContentStore) and generates a
//! complete GraphQL schema for them. It supports:
//!
//! - One type per exposed sub-kind, sharing an interface per kind
//! - Raw field wrappers and simplified value fields
//! - Single-entity loads with language and revision selection
//! - Cursor-paginated connections per kind and sub-kind
//! - Access checks that hide entities and fields instead of failing
//! - DataLoader batching of entity references
//! - Cache tag and context collection per response
//!
//! ## Overview
//!
//! The schema is built lazily on first use and cached. Content-model changes
//! are picked up by an explicit [`ContentGraph::rebuild`].
//!
//! ## Configuration
//!
//! ```toml
//! [graphql]
//! max_depth = 15
//! max_complexity = 500
//! max_page_size = 100
//! default_langcode = "en"
//!
//! [graphql.entities.node]
//! sub_kinds = ["article", "page"]
//!
//! [graphql.entities.taxonomy_term]
//! ```
//!
//! ## Modules
//!
//! - [`config`] - Configuration and live site settings
//! - [`schema`] - Introspection, synthesis and lazy loading
//! - [`resolvers`] - Field resolution, languages, revisions, connections
//! - [`context`] - Per-request resolution context
//! - [`executor`] - Query execution
//! - [`error`] - Error types

pub mod config;
pub mod context;
pub mod error;
pub mod executor;
pub mod loaders;
pub mod resolvers;
pub mod schema;
pub mod types;

pub use crate::config::{GraphQLConfig, KindExposure, SharedSiteSettings, SiteSettings, UnionMode};
pub use context::{ContextBuilderError, ResolutionContext, ResolutionContextBuilder};
pub use error::GraphQLError;
pub use executor::{ContentGraph, GraphQLRequest, GraphQLResponse};
pub use schema::{ContentSchemaBuilder, LazySchema, SchemaBuilderConfig};

/// Result type for GraphQL operations.
pub type Result<T> = std::result::Result<T, GraphQLError>;
