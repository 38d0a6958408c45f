//! Field resolution dispatch.
//!
//! One entry point, [`ResolverDispatcher::resolve`], serves every field of
//! the synthesized schema. Each call matches on the field's
//! [`FieldResolver`] and reads its parent value by type.

use std::sync::Arc;

use async_graphql::dynamic::{FieldValue, ResolverContext};
use async_graphql::{ErrorExtensions, QueryPathNode, Value};
use contentgraph_storage::{EntityRecord, FieldDescriptor};
use serde_json::Value as Json;
use tracing::trace;

use crate::context::ResolutionContext;
use crate::error::GraphQLError;
use crate::loaders::EntityKey;
use crate::resolvers::access::EntityAccess;
use crate::resolvers::connection::{
    ConnectionArgs, ConnectionEngine, ConnectionValue, EdgeValue, PageInfoValue,
};
use crate::resolvers::language::LanguageNegotiator;
use crate::resolvers::read::EntityLoadResolver;
use crate::resolvers::{
    Coercion, EntityProperty, FieldResolver, TargetShape, ValueShape, resolution_context,
    schema_index,
};
use crate::types::{EntityValue, FieldItemValue, FieldListValue, RecordValue, SchemaIndex};

/// Dispatches field resolution by [`FieldResolver`].
pub struct ResolverDispatcher;

type ResolveResult<'a> = Result<Option<FieldValue<'a>>, async_graphql::Error>;

impl ResolverDispatcher {
    /// Resolves one field.
    ///
    /// # Errors
    ///
    /// Returns an error for invalid arguments or storage failures. Denied
    /// access is never an error: it yields `null` or drops list elements.
    pub async fn resolve<'a>(
        ctx: ResolverContext<'a>,
        resolver: &FieldResolver,
    ) -> ResolveResult<'a> {
        match resolver {
            FieldResolver::Version => Ok(Some(FieldValue::value(Value::String(
                env!("CARGO_PKG_VERSION").to_string(),
            )))),
            FieldResolver::RootLoad { kind, target } => {
                EntityLoadResolver::resolve(&ctx, kind, target).await
            }
            FieldResolver::RootConnection {
                kind,
                sub_kinds,
                target,
            } => Self::root_connection(&ctx, kind, sub_kinds, target).await,
            FieldResolver::Entity(property) => Self::entity_property(&ctx, *property).await,
            FieldResolver::Value { field, shape } => Self::value_field(&ctx, field, shape).await,
            FieldResolver::Raw { field } => Self::raw_field(&ctx, field).await,
            FieldResolver::ListCount => {
                let list = ctx.parent_value.try_downcast_ref::<FieldListValue>()?;
                Ok(Some(FieldValue::value(graphql_int(list.items().len()))))
            }
            FieldResolver::ListFirst => {
                let list = ctx.parent_value.try_downcast_ref::<FieldListValue>()?;
                Ok(list.item(0).map(FieldValue::owned_any))
            }
            FieldResolver::ListItems => {
                let list = ctx.parent_value.try_downcast_ref::<FieldListValue>()?;
                let items = (0..list.items().len())
                    .filter_map(|delta| list.item(delta))
                    .map(FieldValue::owned_any);
                Ok(Some(FieldValue::list(items)))
            }
            FieldResolver::ItemProperty { property, coercion } => {
                let item = ctx.parent_value.try_downcast_ref::<FieldItemValue>()?;
                Ok(item
                    .property(property)
                    .and_then(|v| coercion.apply(v))
                    .map(FieldValue::value))
            }
            FieldResolver::ItemProcessed => {
                let item = ctx.parent_value.try_downcast_ref::<FieldItemValue>()?;
                let rctx = resolution_context(&ctx)?;
                Ok(Self::processed_text(rctx, &item.item).map(FieldValue::value))
            }
            FieldResolver::ItemData => {
                let item = ctx.parent_value.try_downcast_ref::<FieldItemValue>()?;
                Ok(Coercion::Map.apply(&item.item).map(FieldValue::value))
            }
            FieldResolver::ItemTargetType => {
                let item = ctx.parent_value.try_downcast_ref::<FieldItemValue>()?;
                let kind = item
                    .property("target_type")
                    .and_then(Json::as_str)
                    .or(item.field.target_kind.as_deref());
                Ok(kind.map(|k| FieldValue::value(Value::String(k.to_string()))))
            }
            FieldResolver::ItemUrl => {
                let item = ctx.parent_value.try_downcast_ref::<FieldItemValue>()?;
                let rctx = resolution_context(&ctx)?;
                let url = Self::link_url(rctx, ctx.path_node.as_ref(), &item.item)
                    .await
                    .map_err(|e| e.extend())?;
                Ok(url.map(|u| FieldValue::value(Value::String(u))))
            }
            FieldResolver::ItemEntity { target } => {
                let item = ctx.parent_value.try_downcast_ref::<FieldItemValue>()?;
                let Some(key) = Self::reference_key(&item.field, &item.item) else {
                    return Ok(None);
                };
                Self::single_reference(&ctx, key, target).await
            }
            FieldResolver::RecordProperty {
                property,
                coercion,
                nested,
            } => {
                let record = ctx.parent_value.try_downcast_ref::<RecordValue>()?;
                let Some(value) = record.0.get(property.as_str()).filter(|v| !v.is_null()) else {
                    return Ok(None);
                };
                if *nested {
                    return Ok(value
                        .is_object()
                        .then(|| FieldValue::owned_any(RecordValue(value.clone()))));
                }
                Ok(coercion.apply(value).map(FieldValue::value))
            }
            FieldResolver::ConnectionEdges => {
                let connection = ctx.parent_value.try_downcast_ref::<ConnectionValue>()?;
                Ok(Some(FieldValue::list(
                    connection.edges.iter().cloned().map(FieldValue::owned_any),
                )))
            }
            FieldResolver::ConnectionNodes => {
                let connection = ctx.parent_value.try_downcast_ref::<ConnectionValue>()?;
                let rctx = resolution_context(&ctx)?;
                let index = schema_index(&ctx)?;
                let node = ctx.path_node.as_ref();
                let language = LanguageNegotiator::current_language(rctx, node);

                let mut nodes = Vec::with_capacity(connection.edges.len());
                for edge in &connection.edges {
                    if let Some(value) = edge.target.wrap(index, edge.node.clone()) {
                        if edge.node.langcode != language {
                            LanguageNegotiator::narrow_element(
                                rctx,
                                node,
                                nodes.len(),
                                &edge.node.langcode,
                            );
                        }
                        nodes.push(value);
                    }
                }
                Ok(Some(FieldValue::list(nodes)))
            }
            FieldResolver::ConnectionPageInfo => {
                let connection = ctx.parent_value.try_downcast_ref::<ConnectionValue>()?;
                Ok(Some(FieldValue::owned_any(connection.page_info.clone())))
            }
            FieldResolver::ConnectionTotal => {
                let connection = ctx.parent_value.try_downcast_ref::<ConnectionValue>()?;
                Ok(Some(FieldValue::value(graphql_int(connection.total))))
            }
            FieldResolver::EdgeCursor => {
                let edge = ctx.parent_value.try_downcast_ref::<EdgeValue>()?;
                Ok(Some(FieldValue::value(Value::String(edge.cursor.clone()))))
            }
            FieldResolver::EdgeNode => {
                let edge = ctx.parent_value.try_downcast_ref::<EdgeValue>()?;
                let rctx = resolution_context(&ctx)?;
                let index = schema_index(&ctx)?;
                let node = ctx.path_node.as_ref();
                if edge.node.langcode != LanguageNegotiator::current_language(rctx, node) {
                    LanguageNegotiator::narrow(rctx, node, &edge.node.langcode);
                }
                Ok(edge.target.wrap(index, edge.node.clone()))
            }
            FieldResolver::PageInfoHasNextPage => {
                let info = ctx.parent_value.try_downcast_ref::<PageInfoValue>()?;
                Ok(Some(FieldValue::value(info.has_next_page)))
            }
            FieldResolver::PageInfoHasPreviousPage => {
                let info = ctx.parent_value.try_downcast_ref::<PageInfoValue>()?;
                Ok(Some(FieldValue::value(info.has_previous_page)))
            }
            FieldResolver::PageInfoStartCursor => {
                let info = ctx.parent_value.try_downcast_ref::<PageInfoValue>()?;
                Ok(info
                    .start_cursor
                    .clone()
                    .map(|c| FieldValue::value(Value::String(c))))
            }
            FieldResolver::PageInfoEndCursor => {
                let info = ctx.parent_value.try_downcast_ref::<PageInfoValue>()?;
                Ok(info
                    .end_cursor
                    .clone()
                    .map(|c| FieldValue::value(Value::String(c))))
            }
            FieldResolver::Unsupported => Ok(Some(FieldValue::value(true))),
        }
    }

    async fn root_connection<'a>(
        ctx: &ResolverContext<'a>,
        kind: &str,
        sub_kinds: &[String],
        target: &TargetShape,
    ) -> ResolveResult<'a> {
        let rctx = resolution_context(ctx)?;
        let index = schema_index(ctx)?;
        let args = ConnectionArgs::from_args(&ctx.args).map_err(|e| e.extend())?;

        let connection = ConnectionEngine::query(
            rctx,
            ctx.path_node.as_ref(),
            index,
            kind,
            sub_kinds,
            target,
            &args,
        )
        .await
        .map_err(|e| e.extend())?;

        Ok(Some(FieldValue::owned_any(connection)))
    }

    async fn entity_property<'a>(
        ctx: &ResolverContext<'a>,
        property: EntityProperty,
    ) -> ResolveResult<'a> {
        let entity = ctx.parent_value.try_downcast_ref::<EntityValue>()?;
        let record = &entity.record;

        let value = match property {
            EntityProperty::Id => Value::String(record.id.to_string()),
            EntityProperty::EntityType => Value::String(record.kind.clone()),
            EntityProperty::EntityBundle => Value::String(record.sub_kind.clone()),
            EntityProperty::Label => Value::String(record.label.clone()),
            EntityProperty::Langcode => Value::String(record.langcode.clone()),
            EntityProperty::TranslationLangcodes => Value::List(
                record
                    .translations
                    .iter()
                    .map(|l| Value::String(l.clone()))
                    .collect(),
            ),
            EntityProperty::Url => {
                let rctx = resolution_context(ctx)?;
                Value::String(Self::entity_url(rctx, record))
            }
            EntityProperty::RevisionId => Value::String(record.revision_id.to_string()),
            EntityProperty::DefaultRevision => Value::Boolean(record.default_revision),
            EntityProperty::Description => match &record.description {
                Some(description) => Value::String(description.clone()),
                None => return Ok(None),
            },
        };

        Ok(Some(FieldValue::value(value)))
    }

    async fn raw_field<'a>(
        ctx: &ResolverContext<'a>,
        field: &Arc<FieldDescriptor>,
    ) -> ResolveResult<'a> {
        let entity = ctx.parent_value.try_downcast_ref::<EntityValue>()?;
        let rctx = resolution_context(ctx)?;

        if !EntityAccess::field_visible(rctx, &entity.record, field)
            .await
            .map_err(|e| e.extend())?
        {
            return Ok(None);
        }

        Ok(Some(FieldValue::owned_any(FieldListValue {
            entity: entity.record.clone(),
            field: field.clone(),
        })))
    }

    async fn value_field<'a>(
        ctx: &ResolverContext<'a>,
        field: &Arc<FieldDescriptor>,
        shape: &ValueShape,
    ) -> ResolveResult<'a> {
        let entity = ctx.parent_value.try_downcast_ref::<EntityValue>()?;
        let rctx = resolution_context(ctx)?;
        let record = &entity.record;

        if !EntityAccess::field_visible(rctx, record, field)
            .await
            .map_err(|e| e.extend())?
        {
            return Ok(None);
        }

        let items = record.field_items(&field.machine_name);
        trace!(
            entity = %record.cache_tag(),
            field = %field.machine_name,
            items = items.len(),
            "Resolving value field"
        );

        let values: Vec<FieldValue<'a>> = match shape {
            ValueShape::Property { property, coercion } => items
                .iter()
                .filter_map(|item| item.get(*property).and_then(|v| coercion.apply(v)))
                .map(FieldValue::value)
                .collect(),
            ValueShape::Item => (0..items.len())
                .map(|delta| {
                    FieldValue::owned_any(FieldItemValue {
                        entity: record.clone(),
                        field: field.clone(),
                        delta,
                        item: items[delta].clone(),
                    })
                })
                .collect(),
            ValueShape::Record => items
                .iter()
                .filter(|item| item.is_object())
                .map(|item| FieldValue::owned_any(RecordValue(item.clone())))
                .collect(),
            ValueShape::Map => items
                .iter()
                .filter_map(|item| Coercion::Map.apply(item))
                .map(FieldValue::value)
                .collect(),
            ValueShape::Entity(target) => {
                let keys: Vec<EntityKey> = items
                    .iter()
                    .filter_map(|item| Self::reference_key(field, item))
                    .collect();
                if !field.is_multiple() {
                    return match keys.into_iter().next() {
                        Some(key) => Self::single_reference(ctx, key, target).await,
                        None => Ok(None),
                    };
                }
                Self::reference_list(ctx, keys, target).await?
            }
        };

        if field.is_multiple() {
            Ok(Some(FieldValue::list(values)))
        } else {
            Ok(values.into_iter().next())
        }
    }

    /// Loads one referenced entity, substituted and access-checked.
    async fn single_reference<'a>(
        ctx: &ResolverContext<'a>,
        key: EntityKey,
        target: &TargetShape,
    ) -> ResolveResult<'a> {
        let rctx = resolution_context(ctx)?;
        let index = schema_index(ctx)?;

        let Some(record) = rctx
            .load_entity(&key.kind, key.id)
            .await
            .map_err(|e| e.extend())?
        else {
            return Ok(None);
        };
        let record = LanguageNegotiator::translate(rctx, ctx.path_node.as_ref(), record)
            .await
            .map_err(|e| e.extend())?;

        Self::visible(rctx, index, record, target)
            .await
            .map_err(|e| e.extend())
    }

    /// Loads referenced entities in one batch, dropping denied ones.
    async fn reference_list<'a>(
        ctx: &ResolverContext<'a>,
        keys: Vec<EntityKey>,
        target: &TargetShape,
    ) -> Result<Vec<FieldValue<'a>>, async_graphql::Error> {
        let rctx = resolution_context(ctx)?;
        let index = schema_index(ctx)?;
        let node = ctx.path_node.as_ref();
        let language = LanguageNegotiator::current_language(rctx, node);

        let records = rctx.load_entities(keys).await.map_err(|e| e.extend())?;

        let mut values = Vec::with_capacity(records.len());
        for record in records {
            let record = LanguageNegotiator::translate_to(rctx, record, &language)
                .await
                .map_err(|e| e.extend())?;
            let langcode = record.langcode.clone();
            if let Some(value) = Self::visible(rctx, index, record, target)
                .await
                .map_err(|e| e.extend())?
            {
                if langcode != language {
                    LanguageNegotiator::narrow_element(rctx, node, values.len(), &langcode);
                }
                values.push(value);
            }
        }
        Ok(values)
    }

    /// Wraps an entity if the account may view it.
    async fn visible<'a>(
        rctx: &ResolutionContext,
        index: &SchemaIndex,
        record: Arc<EntityRecord>,
        target: &TargetShape,
    ) -> Result<Option<FieldValue<'a>>, GraphQLError> {
        rctx.add_cache_tag(record.cache_tag());
        if !EntityAccess::can_view(rctx, &record).await? {
            return Ok(None);
        }
        Ok(target.wrap(index, record))
    }

    /// Key of the entity a reference item points at.
    fn reference_key(field: &FieldDescriptor, item: &Json) -> Option<EntityKey> {
        let kind = item
            .get("target_type")
            .and_then(Json::as_str)
            .or(field.target_kind.as_deref())?;
        let id = match item.get("target_id")? {
            Json::Number(n) => n.as_u64()?,
            Json::String(s) => s.parse().ok()?,
            _ => return None,
        };
        Some(EntityKey::new(kind, id))
    }

    /// Public URL of an entity in its own language.
    ///
    /// Records outside the site default language carry a `/<langcode>`
    /// prefix.
    fn entity_url(rctx: &ResolutionContext, record: &EntityRecord) -> String {
        let path = record
            .path
            .clone()
            .unwrap_or_else(|| format!("/{}/{}", record.kind, record.id));
        if record.langcode == rctx.settings.current().default_langcode {
            path
        } else {
            format!("/{}{path}", record.langcode)
        }
    }

    /// Resolves the URL of a link item.
    ///
    /// `entity:<kind>/<id>` targets are loaded through the batched loader in
    /// the current language; an inaccessible target has no URL.
    async fn link_url(
        rctx: &ResolutionContext,
        node: Option<&QueryPathNode<'_>>,
        item: &Json,
    ) -> Result<Option<String>, GraphQLError> {
        let Some(uri) = item.get("uri").and_then(Json::as_str) else {
            return Ok(None);
        };

        if let Some(key) = EntityKey::from_uri(uri) {
            let Some(record) = rctx.load_entity(&key.kind, key.id).await? else {
                return Ok(None);
            };
            let language = LanguageNegotiator::current_language(rctx, node);
            let record = LanguageNegotiator::translate_to(rctx, record, &language).await?;
            rctx.add_cache_tag(record.cache_tag());
            if !EntityAccess::can_view(rctx, &record).await? {
                return Ok(None);
            }
            return Ok(Some(Self::entity_url(rctx, &record)));
        }

        if let Some(path) = uri
            .strip_prefix("internal:")
            .or_else(|| uri.strip_prefix("base:"))
        {
            let path = if path.starts_with('/') {
                path.to_string()
            } else {
                format!("/{path}")
            };
            return Ok(Some(path));
        }

        if uri == "route:<nolink>" || uri == "route:<none>" {
            return Ok(None);
        }
        if uri == "route:<front>" {
            return Ok(Some("/".into()));
        }

        Ok(Some(uri.to_string()))
    }

    /// Renders a formatted text item.
    ///
    /// `plain_text` and unformatted values are escaped, with paragraphs split
    /// on blank lines; any other format is trusted markup.
    fn processed_text(rctx: &ResolutionContext, item: &Json) -> Option<Value> {
        let value = item.get("value").and_then(Json::as_str)?;
        let format = item
            .get("format")
            .and_then(Json::as_str)
            .unwrap_or("plain_text");
        rctx.add_cache_tag(format!("config:filter.format.{format}"));

        let rendered = if format == "plain_text" {
            value
                .split("\n\n")
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(|p| format!("<p>{}</p>", escape_html(p).replace('\n', "<br>\n")))
                .collect::<Vec<_>>()
                .join("\n")
        } else {
            value.to_string()
        };

        Some(Value::String(rendered))
    }
}

/// Counts above `Int` range saturate.
fn graphql_int(count: usize) -> i32 {
    i32::try_from(count).unwrap_or(i32::MAX)
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use contentgraph_storage::FieldType;
    use serde_json::json;

    #[test]
    fn test_reference_key() {
        let field = FieldDescriptor::new("field_tags", FieldType::EntityReference)
            .targeting("taxonomy_term", &["tags"]);

        assert_eq!(
            ResolverDispatcher::reference_key(&field, &json!({"target_id": 3})),
            Some(EntityKey::new("taxonomy_term", 3))
        );
        assert_eq!(
            ResolverDispatcher::reference_key(
                &field,
                &json!({"target_id": "4", "target_type": "node"})
            ),
            Some(EntityKey::new("node", 4))
        );
        assert_eq!(
            ResolverDispatcher::reference_key(&field, &json!({"target_id": null})),
            None
        );

        let dynamic = FieldDescriptor::new("field_related", FieldType::EntityReference);
        assert_eq!(
            ResolverDispatcher::reference_key(&dynamic, &json!({"target_id": 1})),
            None
        );
    }

    #[test]
    fn test_counts_saturate() {
        assert_eq!(graphql_int(7), 7);
        assert_eq!(graphql_int(i32::MAX as usize), i32::MAX);
        assert_eq!(graphql_int(usize::MAX), i32::MAX);
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html("<b>Fish & \"Chips\"</b>"),
            "&lt;b&gt;Fish &amp; &quot;Chips&quot;&lt;/b&gt;"
        );
    }
}
