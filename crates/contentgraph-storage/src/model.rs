//! Content model descriptors.
//!
//! These types describe the *shape* of content: which entity kinds exist,
//! which sub-kinds (bundles) they have, and which fields each carries. They
//! are produced by a [`ContentStore`](crate::ContentStore) and consumed by
//! schema synthesis; they never carry entity data.

use serde::{Deserialize, Serialize};

/// Whether a field holds one value or a list of values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Cardinality {
    /// At most one item.
    #[default]
    Single,
    /// Any number of items.
    Multiple,
}

/// Optional behaviours an entity kind supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Entities have a canonical URL path.
    Linkable,
    /// Entities can be translated.
    Translatable,
    /// Entities keep a revision history.
    Revisionable,
    /// Entities carry a description.
    Describable,
}

/// Primitive kinds that can appear inside a mapping field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalarKind {
    String,
    Int,
    Float,
    Boolean,
}

/// A named property inside a mapping field item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyDescriptor {
    /// Property name as stored in the item (snake_case).
    pub name: String,
    /// Scalar leaf or nested record.
    pub kind: PropertyKind,
}

impl PropertyDescriptor {
    /// Creates a scalar property.
    #[must_use]
    pub fn scalar(name: impl Into<String>, scalar: ScalarKind) -> Self {
        Self {
            name: name.into(),
            kind: PropertyKind::Scalar(scalar),
        }
    }

    /// Creates a nested record property.
    #[must_use]
    pub fn record(name: impl Into<String>, properties: Vec<PropertyDescriptor>) -> Self {
        Self {
            name: name.into(),
            kind: PropertyKind::Record(properties),
        }
    }

    /// Returns `true` if this property, or anything nested below it, is a scalar.
    #[must_use]
    pub fn has_scalar_leaf(&self) -> bool {
        match &self.kind {
            PropertyKind::Scalar(_) => true,
            PropertyKind::Record(properties) => properties.iter().any(Self::has_scalar_leaf),
        }
    }
}

/// Shape of a mapping property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyKind {
    Scalar(ScalarKind),
    Record(Vec<PropertyDescriptor>),
}

/// The storage type of a field (its type tag).
///
/// The set is closed: every tag has a fixed GraphQL rendition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldType {
    /// Plain string; items carry `value`.
    String,
    /// Formatted text; items carry `value` and `format`.
    Text,
    /// Integer; items carry `value`.
    Integer,
    /// Decimal number; items carry `value`.
    Decimal,
    /// Boolean; items carry `value`.
    Boolean,
    /// Unix timestamp; items carry `value`.
    Timestamp,
    /// Language code; items carry `value`.
    Language,
    /// Link; items carry `uri` and optional `title`.
    Link,
    /// Reference to another entity; items carry `target_id` and, for
    /// references without a fixed target kind, `target_type`.
    EntityReference,
    /// Value from a fixed value domain; items carry `value`.
    Choice {
        /// Name of the [`ValueDomain`] the values come from.
        domain: String,
    },
    /// Structured value; the item itself is the record.
    Mapping {
        /// Top-level properties of the record.
        properties: Vec<PropertyDescriptor>,
    },
}

impl FieldType {
    /// Stable tag used when naming per-type wrapper types.
    #[must_use]
    pub fn tag(&self) -> &str {
        match self {
            Self::String => "string",
            Self::Text => "text",
            Self::Integer => "integer",
            Self::Decimal => "decimal",
            Self::Boolean => "boolean",
            Self::Timestamp => "timestamp",
            Self::Language => "language",
            Self::Link => "link",
            Self::EntityReference => "entity_reference",
            Self::Choice { domain } => domain,
            Self::Mapping { .. } => "mapping",
        }
    }

    /// Returns `true` for entity reference fields.
    #[must_use]
    pub fn is_reference(&self) -> bool {
        matches!(self, Self::EntityReference)
    }
}

/// Describes one field of an entity kind or sub-kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    /// Human-facing field name (`tags`).
    pub name: String,
    /// Storage machine name (`field_tags`), unique within the kind.
    pub machine_name: String,
    pub field_type: FieldType,
    #[serde(default)]
    pub cardinality: Cardinality,
    /// Target kind for references; `None` means any kind.
    #[serde(default)]
    pub target_kind: Option<String>,
    /// Allowed target sub-kinds; empty means all sub-kinds of the target kind.
    #[serde(default)]
    pub target_sub_kinds: Vec<String>,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub description: Option<String>,
}

impl FieldDescriptor {
    /// Creates a single-valued field whose name equals its machine name.
    #[must_use]
    pub fn new(machine_name: impl Into<String>, field_type: FieldType) -> Self {
        let machine_name = machine_name.into();
        Self {
            name: machine_name
                .strip_prefix("field_")
                .unwrap_or(&machine_name)
                .to_string(),
            machine_name,
            field_type,
            cardinality: Cardinality::Single,
            target_kind: None,
            target_sub_kinds: Vec::new(),
            required: false,
            description: None,
        }
    }

    /// Overrides the human-facing name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Marks the field as multi-valued.
    #[must_use]
    pub fn multiple(mut self) -> Self {
        self.cardinality = Cardinality::Multiple;
        self
    }

    /// Marks the field as required.
    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Sets the reference target kind and allowed sub-kinds.
    #[must_use]
    pub fn targeting(mut self, kind: impl Into<String>, sub_kinds: &[&str]) -> Self {
        self.target_kind = Some(kind.into());
        self.target_sub_kinds = sub_kinds.iter().map(|s| (*s).to_string()).collect();
        self
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Returns `true` if the field may hold more than one item.
    #[must_use]
    pub fn is_multiple(&self) -> bool {
        self.cardinality == Cardinality::Multiple
    }
}

/// A sub-kind (bundle) of an entity kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubKindDescriptor {
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl SubKindDescriptor {
    #[must_use]
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            description: None,
        }
    }
}

/// Describes an entity kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityKindDescriptor {
    /// Kind identifier (`node`, `taxonomy_term`).
    pub id: String,
    pub label: String,
    /// Sub-kinds; an empty list means the kind has none.
    #[serde(default)]
    pub sub_kinds: Vec<SubKindDescriptor>,
    /// Fields shared by every entity of the kind.
    #[serde(default)]
    pub base_fields: Vec<FieldDescriptor>,
    #[serde(default)]
    pub capabilities: Vec<Capability>,
}

impl EntityKindDescriptor {
    #[must_use]
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            sub_kinds: Vec::new(),
            base_fields: Vec::new(),
            capabilities: Vec::new(),
        }
    }

    /// Adds a sub-kind.
    #[must_use]
    pub fn with_sub_kind(mut self, id: impl Into<String>, label: impl Into<String>) -> Self {
        self.sub_kinds.push(SubKindDescriptor::new(id, label));
        self
    }

    /// Adds a base field.
    #[must_use]
    pub fn with_base_field(mut self, field: FieldDescriptor) -> Self {
        self.base_fields.push(field);
        self
    }

    /// Adds a capability.
    #[must_use]
    pub fn with_capability(mut self, capability: Capability) -> Self {
        if !self.capabilities.contains(&capability) {
            self.capabilities.push(capability);
        }
        self
    }

    /// Returns `true` if the kind is split into sub-kinds.
    #[must_use]
    pub fn has_sub_kinds(&self) -> bool {
        !self.sub_kinds.is_empty()
    }

    #[must_use]
    pub fn has_capability(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }

    #[must_use]
    pub fn sub_kind(&self, id: &str) -> Option<&SubKindDescriptor> {
        self.sub_kinds.iter().find(|s| s.id == id)
    }
}

/// A live, fixed set of values (menu names, workflow states, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueDomain {
    pub name: String,
    pub values: Vec<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl ValueDomain {
    #[must_use]
    pub fn new(name: impl Into<String>, values: &[&str]) -> Self {
        Self {
            name: name.into(),
            values: values.iter().map(|v| (*v).to_string()).collect(),
            description: None,
        }
    }
}
