//! Revision selection for single-entity loads.

use std::sync::Arc;

use contentgraph_storage::{AccessOperation, EntityRecord, RevisionSelector};
use tracing::debug;

use crate::context::ResolutionContext;
use crate::error::GraphQLError;
use crate::resolvers::access::EntityAccess;

/// Picks the revision of an entity a query asked for.
pub struct RevisionResolver;

impl RevisionResolver {
    /// Selects a revision of `entity`, the default revision as loaded.
    ///
    /// - `Current` returns `entity` itself.
    /// - `Latest` needs the latest-version permission and yields `None`
    ///   without it. With a language, that language's newest revision is
    ///   used, falling back to the entity's newest revision.
    /// - `Explicit` loads the revision; `None` if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns `GraphQLError::RevisionOwnership` when an explicit revision
    /// belongs to another entity, or a storage error.
    pub async fn select(
        ctx: &ResolutionContext,
        entity: Arc<EntityRecord>,
        selector: RevisionSelector,
        langcode: Option<&str>,
    ) -> Result<Option<Arc<EntityRecord>>, GraphQLError> {
        match selector {
            RevisionSelector::Current => Ok(Some(entity)),
            RevisionSelector::Latest => {
                if !EntityAccess::can(ctx, &entity, AccessOperation::ViewLatestVersion).await? {
                    return Ok(None);
                }

                let Some(index) = ctx.store.revision_index(&entity.kind, entity.id).await? else {
                    return Ok(None);
                };
                let revision_id = langcode
                    .and_then(|l| index.latest_by_language.get(l).copied())
                    .unwrap_or(index.latest_revision);

                debug!(
                    entity = %entity.cache_tag(),
                    revision_id,
                    langcode = ?langcode,
                    "Selecting latest revision"
                );

                Ok(ctx
                    .store
                    .load_revision(&entity.kind, revision_id, langcode)
                    .await?
                    .map(Arc::new))
            }
            RevisionSelector::Explicit(revision_id) => {
                let Some(record) = ctx
                    .store
                    .load_revision(&entity.kind, revision_id, langcode)
                    .await?
                else {
                    return Ok(None);
                };

                if record.id != entity.id {
                    return Err(GraphQLError::RevisionOwnership {
                        revision_id,
                        entity: format!("{}/{}", entity.kind, entity.id),
                    });
                }
                Ok(Some(Arc::new(record)))
            }
        }
    }
}
