//! Resolver runtime.
//!
//! Every synthesized field carries a [`FieldResolver`] describing how its
//! value is computed. At query time the [`ResolverDispatcher`] matches on it:
//!
//! - Entity properties and field values read from an [`EntityValue`] parent
//! - Raw field wrappers and their items read from list/item parents
//! - Entity references go through the batched loader, translation
//!   substitution and access filtering
//! - Root fields delegate to the load and connection resolvers
//!
//! [`EntityValue`]: crate::types::EntityValue

mod access;
mod connection;
mod dispatcher;
mod language;
mod read;
mod revision;

pub use access::EntityAccess;
pub use connection::{
    ConnectionArgs, ConnectionEngine, ConnectionValue, CursorData, EdgeValue, PageInfoValue,
    PageRequest,
};
pub use dispatcher::ResolverDispatcher;
pub use language::LanguageNegotiator;
pub use read::EntityLoadResolver;
pub use revision::RevisionResolver;

use std::sync::Arc;

use async_graphql::dynamic::{FieldValue, ResolverContext};
use async_graphql::{ErrorExtensions, Name, Value};
use contentgraph_storage::{EntityRecord, FieldDescriptor};

use crate::context::ResolutionContext;
use crate::error::GraphQLError;
use crate::schema::naming;
use crate::types::{
    EntityValue, SchemaIndex, UNSUPPORTED_TYPE, UnsupportedValue, json_to_graphql_value,
};

/// Fixed properties every exposed entity type may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityProperty {
    Id,
    EntityType,
    EntityBundle,
    Label,
    Langcode,
    TranslationLangcodes,
    Url,
    RevisionId,
    DefaultRevision,
    Description,
}

/// How a stored scalar is coerced into its GraphQL representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coercion {
    String,
    Int,
    Float,
    Boolean,
    Id,
    /// Machine name rendered as an enum value.
    Enum,
    /// Opaque map passed through as-is.
    Map,
}

impl Coercion {
    /// Coerces a stored JSON value; `None` when it cannot be represented.
    #[must_use]
    pub fn apply(self, value: &serde_json::Value) -> Option<Value> {
        use serde_json::Value as Json;

        match (self, value) {
            (_, Json::Null) => None,
            (Self::String, Json::String(s)) => Some(Value::String(s.clone())),
            (Self::String, Json::Number(n)) => Some(Value::String(n.to_string())),
            (Self::String, Json::Bool(b)) => Some(Value::String(b.to_string())),
            (Self::Id, Json::String(s)) => Some(Value::String(s.clone())),
            (Self::Id, Json::Number(n)) => Some(Value::String(n.to_string())),
            (Self::Int, Json::Number(n)) => n
                .as_i64()
                .or_else(|| n.as_f64().map(|f| f as i64))
                .map(|i| Value::Number(i.into())),
            (Self::Int, Json::String(s)) => s.parse::<i64>().ok().map(|i| Value::Number(i.into())),
            (Self::Float, Json::Number(n)) => n
                .as_f64()
                .and_then(async_graphql::Number::from_f64)
                .map(Value::Number),
            (Self::Float, Json::String(s)) => s
                .parse::<f64>()
                .ok()
                .and_then(async_graphql::Number::from_f64)
                .map(Value::Number),
            (Self::Boolean, Json::Bool(b)) => Some(Value::Boolean(*b)),
            (Self::Boolean, Json::Number(n)) => Some(Value::Boolean(n.as_i64() != Some(0))),
            (Self::Boolean, Json::String(s)) => match s.as_str() {
                "1" | "true" => Some(Value::Boolean(true)),
                "0" | "false" | "" => Some(Value::Boolean(false)),
                _ => None,
            },
            (Self::Enum, Json::String(s)) => {
                naming::encode_enum_value(s).map(|v| Value::Enum(Name::new(v)))
            }
            (Self::Map, other) => Some(json_to_graphql_value(other)),
            _ => None,
        }
    }
}

/// How the items of an entity reference field are typed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetShape {
    /// A single concrete object type.
    Object(String),
    /// A union; targets outside `members` resolve to the sentinel type.
    Union { name: String, members: Vec<String> },
}

impl TargetShape {
    /// The GraphQL type name the field is declared with.
    #[must_use]
    pub fn type_name(&self) -> &str {
        match self {
            Self::Object(name) | Self::Union { name, .. } => name,
        }
    }

    /// Wraps an entity for this shape.
    ///
    /// Returns `None` when an object-typed field meets an entity of another
    /// type; union-typed fields fall back to the sentinel instead.
    #[must_use]
    pub fn wrap<'a>(
        &self,
        index: &SchemaIndex,
        record: Arc<EntityRecord>,
    ) -> Option<FieldValue<'a>> {
        let concrete = index.concrete_type(&record).map(str::to_string);
        match self {
            Self::Object(name) => concrete
                .filter(|c| c == name)
                .map(|_| FieldValue::owned_any(EntityValue::new(record))),
            Self::Union { members, .. } => Some(match concrete {
                Some(c) if members.contains(&c) => {
                    FieldValue::owned_any(EntityValue::new(record)).with_type(c)
                }
                _ => FieldValue::owned_any(UnsupportedValue).with_type(UNSUPPORTED_TYPE),
            }),
        }
    }
}

/// Shape of a simplified value field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueShape {
    /// One property of each item, coerced to a scalar or enum.
    Property {
        property: &'static str,
        coercion: Coercion,
    },
    /// The item itself, typed as its `FieldItemType*` wrapper.
    Item,
    /// The item as a structured record.
    Record,
    /// The item as an opaque map.
    Map,
    /// The referenced entities.
    Entity(TargetShape),
}

/// Computation behind one synthesized field.
#[derive(Debug, Clone)]
pub enum FieldResolver {
    /// `_version` on the query root.
    Version,
    /// Single-entity load on the query root.
    RootLoad { kind: String, target: TargetShape },
    /// Connection on the query root.
    RootConnection {
        kind: String,
        sub_kinds: Vec<String>,
        target: TargetShape,
    },
    Entity(EntityProperty),
    /// Simplified value field.
    Value {
        field: Arc<FieldDescriptor>,
        shape: ValueShape,
    },
    /// Raw field wrapper (`FieldItemList*`).
    Raw { field: Arc<FieldDescriptor> },
    ListCount,
    ListFirst,
    ListItems,
    /// Named item property.
    ItemProperty {
        property: String,
        coercion: Coercion,
    },
    /// Rendered text of a formatted text item.
    ItemProcessed,
    /// Whole item as an opaque map.
    ItemData,
    /// Target kind of a reference item, defaulting to the field's target.
    ItemTargetType,
    /// Resolved URL of a link item.
    ItemUrl,
    /// Target entity of a reference item.
    ItemEntity { target: TargetShape },
    /// Named property of a record value.
    RecordProperty {
        property: String,
        coercion: Coercion,
        /// Set when the property is itself a record type.
        nested: bool,
    },
    ConnectionEdges,
    ConnectionNodes,
    ConnectionPageInfo,
    ConnectionTotal,
    EdgeCursor,
    EdgeNode,
    PageInfoHasNextPage,
    PageInfoHasPreviousPage,
    PageInfoStartCursor,
    PageInfoEndCursor,
    /// The sentinel's boolean marker.
    Unsupported,
}

/// Gets the per-request resolution context.
pub(crate) fn resolution_context<'a>(
    ctx: &ResolverContext<'a>,
) -> Result<&'a ResolutionContext, async_graphql::Error> {
    ctx.data::<ResolutionContext>()
        .map_err(|_| GraphQLError::Internal("Resolution context not available".into()).extend())
}

/// Gets the schema index shared through schema data.
pub(crate) fn schema_index<'a>(
    ctx: &ResolverContext<'a>,
) -> Result<&'a Arc<SchemaIndex>, async_graphql::Error> {
    ctx.data::<Arc<SchemaIndex>>()
        .map_err(|_| GraphQLError::Internal("Schema index not available".into()).extend())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_coercion_scalars() {
        assert_eq!(
            Coercion::Int.apply(&json!("42")),
            Some(Value::Number(42.into()))
        );
        assert_eq!(
            Coercion::String.apply(&json!(7)),
            Some(Value::String("7".into()))
        );
        assert_eq!(
            Coercion::Boolean.apply(&json!(1)),
            Some(Value::Boolean(true))
        );
        assert_eq!(Coercion::Boolean.apply(&json!("maybe")), None);
        assert_eq!(Coercion::Float.apply(&json!(null)), None);
        assert_eq!(Coercion::Id.apply(&json!(12)), Some(Value::String("12".into())));
    }

    #[test]
    fn test_coercion_enum_uses_encoding() {
        assert_eq!(
            Coercion::Enum.apply(&json!("main")),
            Some(Value::Enum(Name::new("MAIN")))
        );
        assert_eq!(
            Coercion::Enum.apply(&json!("404_links")),
            Some(Value::Enum(Name::new("__404_LINKS")))
        );
        assert_eq!(Coercion::Enum.apply(&json!("Not-A-Machine-Name")), None);
    }

    #[test]
    fn test_target_shape_names() {
        let object = TargetShape::Object("User".into());
        assert_eq!(object.type_name(), "User");

        let union = TargetShape::Union {
            name: "NodeUnion".into(),
            members: vec!["NodeArticle".into()],
        };
        assert_eq!(union.type_name(), "NodeUnion");
    }
}
