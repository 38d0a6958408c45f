//! DataLoaders for efficient batched data loading.
//!
//! DataLoaders batch load requests within a single GraphQL execution,
//! preventing N+1 reads when many sibling fields reference other entities.
//!
//! - [`EntityLoader`] - Loads default revisions by `(kind, id)` pairs
//!
//! Loaders are created per request by the [`ResolutionContext`] builder so
//! batching never crosses request boundaries.
//!
//! [`ResolutionContext`]: crate::ResolutionContext

mod entity;

pub use entity::{EntityKey, EntityLoader};

use std::sync::Arc;

use async_graphql::dataloader::DataLoader;
use contentgraph_storage::DynContentStore;

/// Collection of all DataLoaders for a GraphQL request.
#[derive(Clone)]
pub struct DataLoaders {
    /// Loader for fetching entities by `(kind, id)`.
    pub entity_loader: Arc<DataLoader<EntityLoader>>,
}

impl DataLoaders {
    /// Creates a new set of DataLoaders.
    #[must_use]
    pub fn new(store: DynContentStore) -> Self {
        Self {
            entity_loader: Arc::new(DataLoader::new(EntityLoader::new(store), tokio::spawn)),
        }
    }
}
