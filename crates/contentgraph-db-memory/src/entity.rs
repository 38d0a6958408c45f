//! Input types used to seed the in-memory store.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Per-language content of one revision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslationData {
    pub label: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default = "default_published")]
    pub published: bool,
    #[serde(default)]
    pub changed: i64,
    #[serde(default)]
    pub fields: IndexMap<String, Vec<Value>>,
}

fn default_published() -> bool {
    true
}

impl TranslationData {
    #[must_use]
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            description: None,
            path: None,
            published: true,
            changed: 0,
            fields: IndexMap::new(),
        }
    }

    #[must_use]
    pub fn unpublished(mut self) -> Self {
        self.published = false;
        self
    }

    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn with_changed(mut self, changed: i64) -> Self {
        self.changed = changed;
        self
    }

    /// Sets the items of a field. A non-array value is stored as a single item.
    #[must_use]
    pub fn with_field(mut self, machine_name: impl Into<String>, items: Value) -> Self {
        let items = match items {
            Value::Array(items) => items,
            Value::Null => Vec::new(),
            single => vec![single],
        };
        self.fields.insert(machine_name.into(), items);
        self
    }
}

/// A new entity, created with its first (default) revision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewEntity {
    pub kind: String,
    /// Sub-kind; defaults to the kind for kinds without sub-kinds.
    #[serde(default)]
    pub sub_kind: Option<String>,
    pub langcode: String,
    #[serde(default)]
    pub created: i64,
    #[serde(flatten)]
    pub content: TranslationData,
}

impl NewEntity {
    #[must_use]
    pub fn new(kind: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            sub_kind: None,
            langcode: "en".to_string(),
            created: 0,
            content: TranslationData::new(label),
        }
    }

    #[must_use]
    pub fn sub_kind(mut self, sub_kind: impl Into<String>) -> Self {
        self.sub_kind = Some(sub_kind.into());
        self
    }

    #[must_use]
    pub fn langcode(mut self, langcode: impl Into<String>) -> Self {
        self.langcode = langcode.into();
        self
    }

    /// Sets both the created and changed timestamps.
    #[must_use]
    pub fn created(mut self, created: i64) -> Self {
        self.created = created;
        self.content.changed = created;
        self
    }

    #[must_use]
    pub fn unpublished(mut self) -> Self {
        self.content.published = false;
        self
    }

    #[must_use]
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.content.path = Some(path.into());
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.content.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn field(mut self, machine_name: impl Into<String>, items: Value) -> Self {
        self.content = self.content.with_field(machine_name, items);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_single_item_wrapped() {
        let data = TranslationData::new("Hello")
            .with_field("body", json!({"value": "x", "format": "basic_html"}))
            .with_field("field_tags", json!([{"target_id": 1}, {"target_id": 2}]))
            .with_field("field_empty", Value::Null);

        assert_eq!(data.fields["body"].len(), 1);
        assert_eq!(data.fields["field_tags"].len(), 2);
        assert!(data.fields["field_empty"].is_empty());
    }

    #[test]
    fn test_new_entity_deserialize() {
        let entity: NewEntity = serde_json::from_value(json!({
            "kind": "node",
            "sub_kind": "article",
            "langcode": "en",
            "label": "Launch"
        }))
        .unwrap();
        assert!(entity.content.published);
        assert_eq!(entity.content.label, "Launch");
    }
}
