//! Single-entity load on the query root.

use async_graphql::dynamic::{FieldValue, ResolverContext};
use async_graphql::{ErrorExtensions, Value};
use contentgraph_storage::{EntityId, RevisionSelector};
use tracing::{debug, trace};

use crate::error::GraphQLError;
use crate::resolvers::access::EntityAccess;
use crate::resolvers::language::LanguageNegotiator;
use crate::resolvers::revision::RevisionResolver;
use crate::resolvers::{TargetShape, resolution_context, schema_index};

/// Resolves `<kind>(id:, langcode:, revision:)`.
pub struct EntityLoadResolver;

impl EntityLoadResolver {
    /// Loads one entity.
    ///
    /// Missing entities, unexposed sub-kinds and denied access resolve to
    /// `null`. The returned record is the selected revision in the current
    /// language, substituted before the access check.
    ///
    /// # Errors
    ///
    /// Returns an error for malformed arguments, a revision belonging to
    /// another entity, or a storage failure.
    pub async fn resolve<'a>(
        ctx: &ResolverContext<'a>,
        kind: &str,
        target: &TargetShape,
    ) -> Result<Option<FieldValue<'a>>, async_graphql::Error> {
        let rctx = resolution_context(ctx)?;
        let index = schema_index(ctx)?;
        let node = ctx.path_node.as_ref();

        let id = Self::entity_id(ctx).map_err(|e| e.extend())?;
        let selector = match Self::id_argument(ctx, "revision") {
            Some(raw) => raw
                .parse::<RevisionSelector>()
                .map_err(|e| GraphQLError::Validation(e).extend())?,
            None => RevisionSelector::Current,
        };

        if let Some(langcode) = ctx
            .args
            .get("langcode")
            .and_then(|v| v.string().ok())
            .filter(|l| !l.is_empty())
        {
            LanguageNegotiator::narrow(rctx, node, langcode);
        }
        let language = LanguageNegotiator::current_language(rctx, node);

        trace!(kind, id, %selector, language = %language, "Loading entity");

        let Some(entity) = rctx.load_entity(kind, id).await.map_err(|e| e.extend())? else {
            debug!(kind, id, "Entity not found");
            return Ok(None);
        };
        rctx.add_cache_tag(entity.cache_tag());

        let Some(record) = RevisionResolver::select(rctx, entity, selector, Some(&language))
            .await
            .map_err(|e| e.extend())?
        else {
            return Ok(None);
        };

        let record = LanguageNegotiator::translate(rctx, node, record)
            .await
            .map_err(|e| e.extend())?;

        if index.concrete_type(&record).is_none() {
            trace!(entity = %record.cache_tag(), "Sub-kind not exposed");
            return Ok(None);
        }
        if !EntityAccess::can_view(rctx, &record)
            .await
            .map_err(|e| e.extend())?
        {
            return Ok(None);
        }

        Ok(target.wrap(index, record))
    }

    fn entity_id(ctx: &ResolverContext<'_>) -> Result<EntityId, GraphQLError> {
        let raw = Self::id_argument(ctx, "id")
            .ok_or_else(|| GraphQLError::Validation("Argument \"id\" is required".into()))?;
        raw.parse()
            .map_err(|_| GraphQLError::Validation(format!("Invalid entity id: {raw}")))
    }

    /// Reads an `ID` argument given either as a string or an integer.
    fn id_argument(ctx: &ResolverContext<'_>, name: &str) -> Option<String> {
        match ctx.args.get(name)?.as_value() {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}
