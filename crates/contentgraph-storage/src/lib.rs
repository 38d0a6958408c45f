//! # contentgraph-storage
//!
//! Content store abstraction for contentgraph.
//!
//! This crate defines the traits and types every content backend implements.
//! It does not contain any implementations; those live in separate crates
//! (`contentgraph-db-memory`).
//!
//! ## Overview
//!
//! The main trait is [`ContentStore`], which covers:
//! - The content model: kinds, sub-kinds, fields, value domains
//! - Entity reads: by id, batched, translations, revisions
//! - Listing queries used by connections
//! - Access checks carrying cache metadata
//!
//! ## Storage Backends
//!
//! ```ignore
//! use async_trait::async_trait;
//! use contentgraph_storage::{ContentStore, StorageError, EntityKindDescriptor};
//!
//! struct MyStore;
//!
//! #[async_trait]
//! impl ContentStore for MyStore {
//!     async fn list_kinds(&self) -> Result<Vec<EntityKindDescriptor>, StorageError> {
//!         // Implementation
//!     }
//!     // ... other methods
//! }
//! ```

mod access;
mod error;
mod model;
mod traits;
mod types;

pub use access::{
    AccessOperation, AccessResult, AccessTarget, Account, CONTEXT_USER_PERMISSIONS,
    CacheMetadata, PERMISSION_VIEW_LATEST_VERSION, PERMISSION_VIEW_UNPUBLISHED,
};
pub use error::StorageError;
pub use model::{
    Capability, Cardinality, EntityKindDescriptor, FieldDescriptor, FieldType,
    PropertyDescriptor, PropertyKind, ScalarKind, SubKindDescriptor, ValueDomain,
};
pub use traits::ContentStore;
pub use types::{
    EntityId, EntityQuery, EntityRecord, RevisionId, RevisionIndex, RevisionSelector,
    SortDirection, SortKey, SortValue,
};

/// Type alias for a storage result.
pub type StorageResult<T> = Result<T, StorageError>;

/// Type alias for a shared content store.
pub type DynContentStore = std::sync::Arc<dyn ContentStore>;

/// Prelude module for convenient imports.
///
/// ```ignore
/// use contentgraph_storage::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        AccessOperation, AccessResult, AccessTarget, Account, CacheMetadata, ContentStore,
        DynContentStore, EntityId, EntityKindDescriptor, EntityQuery, EntityRecord,
        FieldDescriptor, FieldType, RevisionId, RevisionSelector, StorageError, StorageResult,
    };
}
