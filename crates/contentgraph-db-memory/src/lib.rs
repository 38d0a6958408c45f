//! In-memory content store for contentgraph.
//!
//! This crate provides an in-memory implementation of the `ContentStore`
//! trait from `contentgraph-storage`, using papaya lock-free HashMaps for
//! concurrent access. It supports sub-kinds, translations, forward drafts and
//! permission-driven access, which makes it the backend of choice for tests.
//!
//! # Example
//!
//! ```ignore
//! use contentgraph_db_memory::{InMemoryStore, NewEntity};
//! use contentgraph_storage::EntityKindDescriptor;
//!
//! let store = InMemoryStore::new();
//! store.register_kind(EntityKindDescriptor::new("node", "Content").with_sub_kind("article", "Article"));
//! let article = store.create(NewEntity::new("node", "Launch").sub_kind("article"))?;
//! ```

mod content_impl;
pub mod entity;
pub mod storage;

pub use contentgraph_storage::{ContentStore, StorageError};
pub use entity::{NewEntity, TranslationData};
pub use storage::InMemoryStore;

/// Creates a new shared in-memory store.
pub fn create_content_store() -> std::sync::Arc<InMemoryStore> {
    std::sync::Arc::new(InMemoryStore::new())
}
