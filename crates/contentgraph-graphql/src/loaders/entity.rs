//! Entity DataLoader for batched entity loading.
//!
//! Requests for entities made while resolving sibling fields are coalesced
//! into one `load_multiple` call per kind.

use std::collections::HashMap;
use std::sync::Arc;

use async_graphql::dataloader::Loader;
use contentgraph_storage::{DynContentStore, EntityId, EntityRecord};
use tracing::{debug, instrument, trace};

use crate::error::GraphQLError;

/// Key for looking up an entity by kind and id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntityKey {
    pub kind: String,
    pub id: EntityId,
}

impl EntityKey {
    /// Creates a new entity key.
    #[must_use]
    pub fn new(kind: impl Into<String>, id: EntityId) -> Self {
        Self {
            kind: kind.into(),
            id,
        }
    }

    /// Parses an internal entity URI (`entity:node/12`).
    ///
    /// Returns `None` for anything else.
    #[must_use]
    pub fn from_uri(uri: &str) -> Option<Self> {
        let (kind, id) = uri.strip_prefix("entity:")?.split_once('/')?;
        if kind.is_empty() {
            return None;
        }
        id.parse().ok().map(|id| Self::new(kind, id))
    }
}

impl std::fmt::Display for EntityKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.kind, self.id)
    }
}

/// DataLoader fetching default revisions by `(kind, id)`.
pub struct EntityLoader {
    store: DynContentStore,
}

impl EntityLoader {
    /// Creates a new entity loader.
    #[must_use]
    pub fn new(store: DynContentStore) -> Self {
        Self { store }
    }
}

impl Loader<EntityKey> for EntityLoader {
    type Value = Arc<EntityRecord>;
    type Error = Arc<GraphQLError>;

    #[instrument(skip(self, keys), fields(key_count = keys.len()))]
    async fn load(
        &self,
        keys: &[EntityKey],
    ) -> Result<HashMap<EntityKey, Self::Value>, Self::Error> {
        debug!(key_count = keys.len(), "Loading entity batch");

        let mut by_kind: HashMap<&str, Vec<EntityId>> = HashMap::new();
        for key in keys {
            by_kind.entry(&key.kind).or_default().push(key.id);
        }

        let mut results: HashMap<EntityKey, Self::Value> = HashMap::with_capacity(keys.len());

        for (kind, ids) in by_kind {
            trace!(kind, count = ids.len(), "Fetching entity kind batch");

            let loaded = self
                .store
                .load_multiple(kind, &ids)
                .await
                .map_err(|e| Arc::new(GraphQLError::from(e)))?;

            for (id, record) in loaded {
                results.insert(EntityKey::new(kind, id), Arc::new(record));
            }
        }

        debug!(
            requested = keys.len(),
            found = results.len(),
            "Entity batch load complete"
        );

        Ok(results)
    }
}
