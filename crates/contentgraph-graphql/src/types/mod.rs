//! Runtime values flowing between resolvers, and the schema index that maps
//! entities to their concrete GraphQL types.

use std::collections::HashMap;
use std::sync::Arc;

use contentgraph_storage::{EntityRecord, FieldDescriptor};
use serde_json::Value;

/// Name of the sentinel type returned for unexposed reference targets.
pub const UNSUPPORTED_TYPE: &str = "UnsupportedType";

/// An entity as a parent value.
#[derive(Debug, Clone)]
pub struct EntityValue {
    pub record: Arc<EntityRecord>,
}

impl EntityValue {
    #[must_use]
    pub fn new(record: Arc<EntityRecord>) -> Self {
        Self { record }
    }
}

/// All items of one field, as the parent of a `FieldItemList*` type.
#[derive(Debug, Clone)]
pub struct FieldListValue {
    pub entity: Arc<EntityRecord>,
    pub field: Arc<FieldDescriptor>,
}

impl FieldListValue {
    #[must_use]
    pub fn items(&self) -> &[Value] {
        self.entity.field_items(&self.field.machine_name)
    }

    /// Returns the item at `delta` as a parent value.
    #[must_use]
    pub fn item(&self, delta: usize) -> Option<FieldItemValue> {
        self.items().get(delta).map(|item| FieldItemValue {
            entity: self.entity.clone(),
            field: self.field.clone(),
            delta,
            item: item.clone(),
        })
    }
}

/// One field item, as the parent of a `FieldItemType*` type.
#[derive(Debug, Clone)]
pub struct FieldItemValue {
    pub entity: Arc<EntityRecord>,
    pub field: Arc<FieldDescriptor>,
    pub delta: usize,
    pub item: Value,
}

impl FieldItemValue {
    /// Returns a named property of the item.
    #[must_use]
    pub fn property(&self, name: &str) -> Option<&Value> {
        self.item.get(name).filter(|v| !v.is_null())
    }
}

/// A structured (mapping) value, as the parent of a record type.
#[derive(Debug, Clone)]
pub struct RecordValue(pub Value);

/// Marker value for the sentinel type.
#[derive(Debug, Clone, Copy)]
pub struct UnsupportedValue;

/// Maps `(kind, sub_kind)` to the concrete object type exposed for it.
///
/// Built during synthesis and shared with resolvers through schema data.
/// Entities whose sub-kind is not in the index are not exposed.
#[derive(Debug, Clone, Default)]
pub struct SchemaIndex {
    concrete: HashMap<(String, String), String>,
}

impl SchemaIndex {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the concrete type of a sub-kind (or of a kind, with
    /// `sub_kind == kind`).
    pub fn register(&mut self, kind: &str, sub_kind: &str, type_name: impl Into<String>) {
        self.concrete
            .insert((kind.to_string(), sub_kind.to_string()), type_name.into());
    }

    /// Returns the concrete type for an entity, or `None` if it is not exposed.
    #[must_use]
    pub fn concrete_type(&self, record: &EntityRecord) -> Option<&str> {
        self.concrete_type_of(&record.kind, &record.sub_kind)
    }

    #[must_use]
    pub fn concrete_type_of(&self, kind: &str, sub_kind: &str) -> Option<&str> {
        self.concrete
            .get(&(kind.to_string(), sub_kind.to_string()))
            .map(String::as_str)
    }

    /// All exposed concrete types, sorted by name.
    #[must_use]
    pub fn all_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.concrete.values().map(String::as_str).collect();
        types.sort_unstable();
        types
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.concrete.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.concrete.is_empty()
    }
}

/// Converts a JSON value to a GraphQL value.
#[must_use]
pub fn json_to_graphql_value(value: &Value) -> async_graphql::Value {
    match value {
        Value::Null => async_graphql::Value::Null,
        Value::Bool(b) => async_graphql::Value::Boolean(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                async_graphql::Value::Number(i.into())
            } else if let Some(f) = n.as_f64() {
                async_graphql::Number::from_f64(f)
                    .map(async_graphql::Value::Number)
                    .unwrap_or(async_graphql::Value::Null)
            } else {
                async_graphql::Value::Null
            }
        }
        Value::String(s) => async_graphql::Value::String(s.clone()),
        Value::Array(arr) => {
            async_graphql::Value::List(arr.iter().map(json_to_graphql_value).collect())
        }
        Value::Object(obj) => {
            let map = obj
                .iter()
                .map(|(k, v)| (async_graphql::Name::new(k), json_to_graphql_value(v)))
                .collect();
            async_graphql::Value::Object(map)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contentgraph_storage::FieldType;
    use serde_json::json;

    fn record(kind: &str, sub_kind: &str) -> EntityRecord {
        serde_json::from_value(json!({
            "kind": kind,
            "id": 1,
            "sub_kind": sub_kind,
            "revision_id": 1,
            "default_revision": true,
            "langcode": "en",
            "default_langcode": "en",
            "translations": ["en"],
            "label": "Hello",
            "published": true,
            "created": 0,
            "changed": 0,
            "fields": {"field_tags": [{"target_id": 3}, {"target_id": 4, "extra": null}]}
        }))
        .unwrap()
    }

    #[test]
    fn test_schema_index_lookup() {
        let mut index = SchemaIndex::new();
        index.register("node", "article", "NodeArticle");
        index.register("node", "page", "NodePage");
        index.register("user", "user", "User");

        assert_eq!(index.concrete_type(&record("node", "article")), Some("NodeArticle"));
        assert_eq!(index.concrete_type(&record("node", "recipe")), None);
        assert_eq!(index.concrete_type_of("user", "user"), Some("User"));
        assert_eq!(index.all_types().len(), 3);
    }

    #[test]
    fn test_field_list_items() {
        let list = FieldListValue {
            entity: Arc::new(record("node", "article")),
            field: Arc::new(FieldDescriptor::new("field_tags", FieldType::EntityReference)),
        };
        assert_eq!(list.items().len(), 2);

        let second = list.item(1).unwrap();
        assert_eq!(second.delta, 1);
        assert_eq!(second.property("target_id"), Some(&json!(4)));
        assert_eq!(second.property("extra"), None);
        assert!(list.item(2).is_none());
    }

    #[test]
    fn test_json_to_graphql_value() {
        let value = json_to_graphql_value(&json!({"a": [1, 2.5, "x", true, null]}));
        let async_graphql::Value::Object(map) = value else {
            panic!("expected object");
        };
        let async_graphql::Value::List(items) = &map["a"] else {
            panic!("expected list");
        };
        assert_eq!(items.len(), 5);
        assert_eq!(items[0], async_graphql::Value::Number(1.into()));
        assert_eq!(items[4], async_graphql::Value::Null);
    }
}
