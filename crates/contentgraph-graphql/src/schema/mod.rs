//! GraphQL schema synthesis and lazy loading.
//!
//! ## Components
//!
//! - [`ContentModelIntrospector`] - Reads the enabled part of the content model
//! - [`TypeRegistry`] - Name-keyed store of synthesized types
//! - [`TypeSynthesizer`] - Compiles the content model into types
//! - [`ContentSchemaBuilder`] - Assembles the async-graphql schema
//! - [`LazySchema`] - Builds on first use, rebuilds on request
//!
//! ## Lifecycle
//!
//! 1. The first request triggers a build
//! 2. The schema is cached after a successful build
//! 3. Content-model changes take effect after an explicit `rebuild()`

mod builder;
mod introspect;
mod lazy;
pub mod naming;
mod registry;
mod synthesizer;

pub use builder::{ContentSchemaBuilder, SchemaBuilderConfig};
pub use introspect::{ContentModel, ContentModelIntrospector, KindModel, SubKindModel};
pub use lazy::LazySchema;
pub use registry::{ArgumentPlan, FieldPlan, GeneratedType, TypeDefinition, TypeRegistry};
pub use synthesizer::{
    CURSOR_SCALAR, ENTITY_INTERFACE, ENTITY_UNION, MAP_DATA_SCALAR, QUERY_TYPE, SynthesisOutput,
    TypeSynthesizer,
};
