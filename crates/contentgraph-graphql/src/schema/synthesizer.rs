//! Type synthesis.
//!
//! Compiles a [`ContentModel`] into a [`TypeRegistry`] of GraphQL types plus
//! the [`SchemaIndex`] resolvers use to map entities to concrete types.
//!
//! ## Shape
//!
//! - A kind without sub-kinds becomes one object type (`User`).
//! - A kind with sub-kinds becomes an interface (`NodeInterface`) carrying
//!   the base fields, and one object per exposed sub-kind (`NodeArticle`).
//! - Every entity type implements `EntityInterface` and the capability
//!   interfaces of its kind.
//! - Each field yields a raw accessor (`fieldTagsRaw`) typed as a
//!   `FieldItemList*` wrapper and, when value fields are enabled, a value
//!   accessor (`tags`) typed as the field's value itself.
//! - Reference fields whose target kind is not enabled are omitted.
//! - Value domains become enums; mapping fields become record types, or
//!   `MapData` when no scalar leaf exists.
//!
//! Base field plans are computed once per kind and shared by the kind
//! interface and all of its sub-kind objects, so their field types agree.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_graphql::dynamic::TypeRef;
use async_graphql::{Name, Value};
use contentgraph_storage::{
    Capability, FieldDescriptor, FieldType, PropertyDescriptor, PropertyKind, ScalarKind, SortKey,
};
use tracing::{debug, info, warn};

use crate::config::UnionMode;
use crate::resolvers::{Coercion, EntityProperty, FieldResolver, TargetShape, ValueShape};
use crate::schema::SchemaBuilderConfig;
use crate::schema::introspect::{ContentModel, KindModel};
use crate::schema::naming;
use crate::schema::registry::{ArgumentPlan, FieldPlan, GeneratedType, TypeDefinition, TypeRegistry};
use crate::types::{SchemaIndex, UNSUPPORTED_TYPE};

pub const QUERY_TYPE: &str = "Query";
pub const ENTITY_INTERFACE: &str = "EntityInterface";
pub const LINKABLE_INTERFACE: &str = "EntityLinkable";
pub const TRANSLATABLE_INTERFACE: &str = "EntityTranslatable";
pub const REVISIONABLE_INTERFACE: &str = "EntityRevisionable";
pub const DESCRIBABLE_INTERFACE: &str = "EntityDescribable";
pub const ENTITY_UNION: &str = "EntityUnion";
pub const TIMESTAMP_SCALAR: &str = "Timestamp";
pub const CURSOR_SCALAR: &str = "Cursor";
pub const MAP_DATA_SCALAR: &str = "MapData";
pub const PAGE_INFO_TYPE: &str = "ConnectionPageInfo";
pub const SORT_KEYS_ENUM: &str = "ConnectionSortKeys";

const FIXED_INTERFACES: [&str; 5] = [
    ENTITY_INTERFACE,
    LINKABLE_INTERFACE,
    TRANSLATABLE_INTERFACE,
    REVISIONABLE_INTERFACE,
    DESCRIBABLE_INTERFACE,
];

/// Result of a synthesis run.
#[derive(Debug)]
pub struct SynthesisOutput {
    pub registry: TypeRegistry,
    pub index: SchemaIndex,
}

/// Compiles a content model into GraphQL types.
pub struct TypeSynthesizer<'m> {
    model: &'m ContentModel,
    value_fields: bool,
    union_mode: UnionMode,
    registry: TypeRegistry,
    index: SchemaIndex,
    /// Enum type per value domain.
    enums: HashMap<String, String>,
    /// Base field plans per kind.
    base_plans: HashMap<String, Vec<FieldPlan>>,
}

impl<'m> TypeSynthesizer<'m> {
    /// Prepares synthesis: fixed types, the schema index and enums.
    #[must_use]
    pub fn new(model: &'m ContentModel, config: &SchemaBuilderConfig) -> Self {
        let mut synthesizer = Self {
            model,
            value_fields: config.value_fields,
            union_mode: config.union_mode,
            registry: TypeRegistry::new(),
            index: SchemaIndex::new(),
            enums: HashMap::new(),
            base_plans: HashMap::new(),
        };
        synthesizer.define_fixed_types();
        synthesizer.index_kinds();
        synthesizer.define_enums();
        synthesizer
    }

    /// Synthesizes every enabled kind and the query root.
    #[must_use]
    pub fn synthesize(mut self) -> SynthesisOutput {
        let model = self.model;
        for kind in &model.kinds {
            self.synthesize_kind(kind.id());
        }
        self.define_interfaces();
        self.define_query();

        info!(
            types = self.registry.len(),
            entity_types = self.index.len(),
            "Synthesized schema types"
        );

        SynthesisOutput {
            registry: self.registry,
            index: self.index,
        }
    }

    /// Synthesizes the concrete types of one kind.
    ///
    /// Calling it again returns the same type objects.
    pub fn synthesize_kind(&mut self, kind: &str) -> Vec<Arc<GeneratedType>> {
        let model = self.model;
        let Some(km) = model.kind(kind) else {
            return Vec::new();
        };
        let capabilities = &km.descriptor.capabilities;

        if !km.has_sub_kinds() {
            let name = naming::kind_type_name(kind);
            if let Some(existing) = self.registry.get(&name) {
                return vec![existing.clone()];
            }
            if !self.registry.reserve(&name) {
                return Vec::new();
            }

            let mut fields = entity_field_plans(capabilities);
            let mut taken = names_of(&fields);
            fields.extend(self.plan_fields(&name, &km.base_fields, &mut taken));

            debug!(kind, type_name = %name, fields = fields.len(), "Synthesized entity type");
            return vec![self.registry.define(
                &name,
                TypeDefinition::Object {
                    description: Some(km.descriptor.label.clone()),
                    implements: entity_interfaces(capabilities),
                    fields,
                },
            )];
        }

        if km.sub_kinds.is_empty() {
            debug!(kind, "No exposed sub-kinds");
            return Vec::new();
        }

        let interface = naming::kind_interface_name(kind);
        let base = self.base_plans(km);
        if self.registry.get(&interface).is_none() {
            let mut fields = entity_field_plans(capabilities);
            fields.extend(base.iter().cloned());
            self.registry.define(
                &interface,
                TypeDefinition::Interface {
                    description: Some(format!("Fields shared by every {}", km.descriptor.label)),
                    implements: entity_interfaces(capabilities),
                    fields,
                },
            );
        }

        let mut implements = vec![interface];
        implements.extend(entity_interfaces(capabilities));

        let mut generated = Vec::with_capacity(km.sub_kinds.len());
        for sub in &km.sub_kinds {
            let name = naming::sub_kind_type_name(kind, &sub.descriptor.id);
            if let Some(existing) = self.registry.get(&name) {
                generated.push(existing.clone());
                continue;
            }
            if !self.registry.reserve(&name) {
                continue;
            }

            let mut fields = entity_field_plans(capabilities);
            fields.extend(base.iter().cloned());
            let mut taken = names_of(&fields);

            let own: Vec<FieldDescriptor> = sub
                .fields
                .iter()
                .filter(|f| !km.base_fields.iter().any(|b| b.machine_name == f.machine_name))
                .cloned()
                .collect();
            fields.extend(self.plan_fields(&name, &own, &mut taken));

            debug!(
                kind,
                sub_kind = %sub.descriptor.id,
                type_name = %name,
                fields = fields.len(),
                "Synthesized sub-kind type"
            );

            let description = sub
                .descriptor
                .description
                .clone()
                .unwrap_or_else(|| sub.descriptor.label.clone());
            generated.push(self.registry.define(
                &name,
                TypeDefinition::Object {
                    description: Some(description),
                    implements: implements.clone(),
                    fields,
                },
            ));
        }
        generated
    }

    // ==================== Setup ====================

    fn define_fixed_types(&mut self) {
        let scalars = [
            (TIMESTAMP_SCALAR, "Unix timestamp in seconds"),
            (CURSOR_SCALAR, "Opaque connection cursor"),
            (MAP_DATA_SCALAR, "Unstructured key/value data"),
        ];
        for (name, description) in scalars {
            self.registry.define(
                name,
                TypeDefinition::Scalar {
                    description: Some(description.into()),
                },
            );
        }

        self.registry.define(
            UNSUPPORTED_TYPE,
            TypeDefinition::Object {
                description: Some("Entity of a type that is not exposed".into()),
                implements: Vec::new(),
                fields: vec![FieldPlan::new(
                    "unsupported",
                    TypeRef::named_nn(TypeRef::BOOLEAN),
                    FieldResolver::Unsupported,
                )],
            },
        );

        self.registry.define(
            PAGE_INFO_TYPE,
            TypeDefinition::Object {
                description: Some("Pagination state of a connection".into()),
                implements: Vec::new(),
                fields: vec![
                    FieldPlan::new(
                        "hasNextPage",
                        TypeRef::named_nn(TypeRef::BOOLEAN),
                        FieldResolver::PageInfoHasNextPage,
                    ),
                    FieldPlan::new(
                        "hasPreviousPage",
                        TypeRef::named_nn(TypeRef::BOOLEAN),
                        FieldResolver::PageInfoHasPreviousPage,
                    ),
                    FieldPlan::new(
                        "startCursor",
                        TypeRef::named(CURSOR_SCALAR),
                        FieldResolver::PageInfoStartCursor,
                    ),
                    FieldPlan::new(
                        "endCursor",
                        TypeRef::named(CURSOR_SCALAR),
                        FieldResolver::PageInfoEndCursor,
                    ),
                ],
            },
        );

        self.registry.define(
            SORT_KEYS_ENUM,
            TypeDefinition::Enum {
                description: Some("Keys connections can be sorted by".into()),
                values: SortKey::ALL
                    .iter()
                    .filter_map(|k| naming::encode_enum_value(k.as_str()))
                    .collect(),
            },
        );
    }

    fn index_kinds(&mut self) {
        let model = self.model;
        for km in &model.kinds {
            if km.has_sub_kinds() {
                for sub in &km.sub_kinds {
                    self.index.register(
                        km.id(),
                        &sub.descriptor.id,
                        naming::sub_kind_type_name(km.id(), &sub.descriptor.id),
                    );
                }
            } else {
                self.index
                    .register(km.id(), km.id(), naming::kind_type_name(km.id()));
            }
        }
    }

    fn define_enums(&mut self) {
        let model = self.model;
        let kind_names: HashSet<String> = model
            .kinds
            .iter()
            .flat_map(|k| {
                [
                    naming::kind_type_name(k.id()),
                    naming::kind_interface_name(k.id()),
                    naming::kind_union_name(k.id()),
                ]
            })
            .chain(self.index.all_types().into_iter().map(str::to_string))
            .collect();

        for domain in &model.domains {
            let name = naming::type_name(&domain.name);
            if kind_names.contains(&name) || self.registry.contains(&name) {
                warn!(domain = %domain.name, type_name = %name, "Enum name already taken, skipping");
                continue;
            }

            let mut values = Vec::with_capacity(domain.values.len());
            for raw in &domain.values {
                match naming::encode_enum_value(raw) {
                    Some(value) if !values.contains(&value) => values.push(value),
                    Some(_) => {}
                    None => {
                        warn!(domain = %domain.name, value = %raw, "Skipping value that is not a machine name");
                    }
                }
            }
            if values.is_empty() {
                warn!(domain = %domain.name, "Value domain has no usable values");
                continue;
            }

            self.registry.define(
                &name,
                TypeDefinition::Enum {
                    description: domain.description.clone(),
                    values,
                },
            );
            self.enums.insert(domain.name.clone(), name);
        }
    }

    /// Registers each fixed interface that some type implements.
    fn define_interfaces(&mut self) {
        for interface in FIXED_INTERFACES {
            if self.registry.implementors(interface).is_empty() {
                continue;
            }
            self.registry.define(
                interface,
                TypeDefinition::Interface {
                    description: Some(interface_description(interface).into()),
                    implements: Vec::new(),
                    fields: interface_field_plans(interface),
                },
            );
        }
    }

    // ==================== Fields ====================

    fn base_plans(&mut self, km: &KindModel) -> Vec<FieldPlan> {
        if let Some(plans) = self.base_plans.get(km.id()) {
            return plans.clone();
        }
        let owner = naming::kind_type_name(km.id());
        let mut taken = names_of(&entity_field_plans(&km.descriptor.capabilities));
        let plans = self.plan_fields(&owner, &km.base_fields, &mut taken);
        self.base_plans.insert(km.id().to_string(), plans.clone());
        plans
    }

    /// Plans the raw and value accessors of `fields`.
    ///
    /// `taken` holds the names already used on the owning type and is
    /// extended with every planned name.
    fn plan_fields(
        &mut self,
        owner: &str,
        fields: &[FieldDescriptor],
        taken: &mut HashSet<String>,
    ) -> Vec<FieldPlan> {
        let mut plans = Vec::new();

        for descriptor in fields {
            let field = Arc::new(descriptor.clone());

            let target = if field.field_type.is_reference() {
                match self.reference_target(owner, &field) {
                    Some(target) => Some(target),
                    None => {
                        debug!(
                            owner,
                            field = %field.machine_name,
                            "Omitting reference field without an exposed target"
                        );
                        continue;
                    }
                }
            } else {
                None
            };

            let raw_name = naming::raw_field_name(&field.machine_name);
            if taken.insert(raw_name.clone()) {
                let list_type = self.item_list_type(&field);
                plans.push(
                    FieldPlan::new(
                        raw_name,
                        TypeRef::named(list_type),
                        FieldResolver::Raw {
                            field: field.clone(),
                        },
                    )
                    .with_description(field.description.clone()),
                );
            } else {
                warn!(owner, field = %field.machine_name, "Raw field name collides, skipping");
            }

            if !self.value_fields {
                continue;
            }
            let Some((type_name, shape)) = self.value_shape(owner, &field, target) else {
                continue;
            };

            let cased = naming::field_name(&field.name);
            let name = if !taken.contains(&cased) {
                cased
            } else if naming::is_valid_graphql_name(&field.machine_name)
                && !taken.contains(&field.machine_name)
            {
                debug!(
                    owner,
                    field = %field.machine_name,
                    collided = %cased,
                    "Value field name collides, using machine name"
                );
                field.machine_name.clone()
            } else {
                warn!(
                    owner,
                    field = %field.machine_name,
                    "Value field name collides twice, skipping"
                );
                continue;
            };
            taken.insert(name.clone());

            let type_ref = if field.is_multiple() {
                TypeRef::named_nn_list(type_name)
            } else {
                TypeRef::named(type_name)
            };
            plans.push(
                FieldPlan::new(name, type_ref, FieldResolver::Value { field, shape })
                    .with_description(descriptor.description.clone()),
            );
        }

        plans
    }

    /// Value accessor type and shape for a field.
    fn value_shape(
        &mut self,
        owner: &str,
        field: &FieldDescriptor,
        target: Option<TargetShape>,
    ) -> Option<(String, ValueShape)> {
        let property = |type_name: &str, coercion: Coercion| {
            Some((
                type_name.to_string(),
                ValueShape::Property {
                    property: "value",
                    coercion,
                },
            ))
        };

        match &field.field_type {
            FieldType::String | FieldType::Language => property(TypeRef::STRING, Coercion::String),
            FieldType::Integer => property(TypeRef::INT, Coercion::Int),
            FieldType::Decimal => property(TypeRef::FLOAT, Coercion::Float),
            FieldType::Boolean => property(TypeRef::BOOLEAN, Coercion::Boolean),
            FieldType::Timestamp => property(TIMESTAMP_SCALAR, Coercion::Int),
            FieldType::Text | FieldType::Link => {
                let item = self.item_type(field);
                Some((item, ValueShape::Item))
            }
            FieldType::EntityReference => {
                let target = target?;
                Some((target.type_name().to_string(), ValueShape::Entity(target)))
            }
            FieldType::Choice { domain } => match self.enums.get(domain) {
                Some(enum_name) => {
                    let enum_name = enum_name.clone();
                    property(&enum_name, Coercion::Enum)
                }
                None => property(TypeRef::STRING, Coercion::String),
            },
            FieldType::Mapping { properties } => {
                match define_record(&mut self.registry, owner, &field.machine_name, properties) {
                    Some(record) => Some((record, ValueShape::Record)),
                    None => Some((MAP_DATA_SCALAR.to_string(), ValueShape::Map)),
                }
            }
        }
    }

    /// Wrapper tag of a field; choice fields without an enum fall back to
    /// plain strings.
    fn item_tag(&self, field: &FieldDescriptor) -> String {
        match &field.field_type {
            FieldType::Choice { domain } if !self.enums.contains_key(domain) => "string".into(),
            other => other.tag().to_string(),
        }
    }

    /// Defines (once) and returns the `FieldItemType*` of a field.
    fn item_type(&mut self, field: &FieldDescriptor) -> String {
        let tag = self.item_tag(field);
        let name = naming::item_type_name(&tag);
        if self.registry.contains(&name) {
            return name;
        }

        let value = |type_name: &str, coercion: Coercion| {
            FieldPlan::new(
                "value",
                TypeRef::named(type_name),
                FieldResolver::ItemProperty {
                    property: "value".into(),
                    coercion,
                },
            )
        };
        let string_property = |graphql: &str, property: &str| {
            FieldPlan::new(
                graphql,
                TypeRef::named(TypeRef::STRING),
                FieldResolver::ItemProperty {
                    property: property.into(),
                    coercion: Coercion::String,
                },
            )
        };

        let fields = match &field.field_type {
            FieldType::String | FieldType::Language => vec![value(TypeRef::STRING, Coercion::String)],
            FieldType::Integer => vec![value(TypeRef::INT, Coercion::Int)],
            FieldType::Decimal => vec![value(TypeRef::FLOAT, Coercion::Float)],
            FieldType::Boolean => vec![value(TypeRef::BOOLEAN, Coercion::Boolean)],
            FieldType::Timestamp => vec![value(TIMESTAMP_SCALAR, Coercion::Int)],
            FieldType::Text => vec![
                string_property("value", "value"),
                string_property("format", "format"),
                FieldPlan::new(
                    "processed",
                    TypeRef::named(TypeRef::STRING),
                    FieldResolver::ItemProcessed,
                ),
            ],
            FieldType::Link => vec![
                string_property("uri", "uri"),
                string_property("title", "title"),
                FieldPlan::new("url", TypeRef::named(TypeRef::STRING), FieldResolver::ItemUrl),
            ],
            FieldType::EntityReference => {
                let mut fields = vec![
                    FieldPlan::new(
                        "targetId",
                        TypeRef::named(TypeRef::ID),
                        FieldResolver::ItemProperty {
                            property: "target_id".into(),
                            coercion: Coercion::Id,
                        },
                    ),
                    FieldPlan::new(
                        "targetType",
                        TypeRef::named(TypeRef::STRING),
                        FieldResolver::ItemTargetType,
                    ),
                ];
                if let Some(target) = self.entity_union() {
                    fields.push(FieldPlan::new(
                        "entity",
                        TypeRef::named(target.type_name()),
                        FieldResolver::ItemEntity { target },
                    ));
                }
                fields
            }
            FieldType::Choice { domain } => match self.enums.get(domain) {
                Some(enum_name) => vec![value(enum_name, Coercion::Enum)],
                None => vec![value(TypeRef::STRING, Coercion::String)],
            },
            FieldType::Mapping { .. } => vec![FieldPlan::new(
                "value",
                TypeRef::named(MAP_DATA_SCALAR),
                FieldResolver::ItemData,
            )],
        };

        self.registry.define(
            &name,
            TypeDefinition::Object {
                description: Some(format!("A single {} field item", tag.replace('_', " "))),
                implements: Vec::new(),
                fields,
            },
        );
        name
    }

    /// Defines (once) and returns the `FieldItemList*` of a field.
    fn item_list_type(&mut self, field: &FieldDescriptor) -> String {
        let tag = self.item_tag(field);
        let name = naming::item_list_name(&tag);
        if self.registry.contains(&name) {
            return name;
        }

        let item = self.item_type(field);
        self.registry.define(
            &name,
            TypeDefinition::Object {
                description: Some(format!("All {} field items", tag.replace('_', " "))),
                implements: Vec::new(),
                fields: vec![
                    FieldPlan::new("count", TypeRef::named_nn(TypeRef::INT), FieldResolver::ListCount),
                    FieldPlan::new("first", TypeRef::named(&item), FieldResolver::ListFirst),
                    FieldPlan::new(
                        "list",
                        TypeRef::named_nn_list_nn(&item),
                        FieldResolver::ListItems,
                    ),
                ],
            },
        );
        name
    }

    // ==================== References ====================

    /// Decides the type of a reference field; `None` omits the field.
    fn reference_target(&mut self, owner: &str, field: &FieldDescriptor) -> Option<TargetShape> {
        let Some(kind) = field.target_kind.as_deref() else {
            return match self.union_mode {
                UnionMode::Simple => self.entity_union(),
                UnionMode::Specific => {
                    let members: Vec<String> =
                        self.index.all_types().into_iter().map(str::to_string).collect();
                    self.union(naming::field_union_name(owner, &field.name), members)
                }
            };
        };

        let model = self.model;
        let km = model.kind(kind)?;
        if !km.has_sub_kinds() {
            return Some(TargetShape::Object(naming::kind_type_name(kind)));
        }

        let exposed = km.sub_kind_ids();
        let targets: Vec<String> = if field.target_sub_kinds.is_empty() {
            exposed
        } else {
            field
                .target_sub_kinds
                .iter()
                .filter(|s| exposed.contains(s))
                .cloned()
                .collect()
        };

        match targets.as_slice() {
            [] => None,
            [only] if field.target_sub_kinds.len() == 1 => {
                Some(TargetShape::Object(naming::sub_kind_type_name(kind, only)))
            }
            _ => match self.union_mode {
                UnionMode::Simple => self.kind_union(km),
                UnionMode::Specific => {
                    let members = targets
                        .iter()
                        .map(|s| naming::sub_kind_type_name(kind, s))
                        .collect();
                    self.union(naming::field_union_name(owner, &field.name), members)
                }
            },
        }
    }

    /// Union over every exposed entity type.
    fn entity_union(&mut self) -> Option<TargetShape> {
        let members: Vec<String> = self.index.all_types().into_iter().map(str::to_string).collect();
        self.union(ENTITY_UNION.to_string(), members)
    }

    /// Union over the exposed sub-kinds of a kind.
    fn kind_union(&mut self, km: &KindModel) -> Option<TargetShape> {
        let members = km
            .sub_kinds
            .iter()
            .map(|s| naming::sub_kind_type_name(km.id(), &s.descriptor.id))
            .collect();
        self.union(naming::kind_union_name(km.id()), members)
    }

    /// Defines (once) a union of `members` and the sentinel type.
    fn union(&mut self, name: String, members: Vec<String>) -> Option<TargetShape> {
        if members.is_empty() {
            return None;
        }
        let mut possible = members.clone();
        possible.push(UNSUPPORTED_TYPE.to_string());
        self.registry.define(
            &name,
            TypeDefinition::Union {
                description: None,
                members: possible,
            },
        );
        Some(TargetShape::Union { name, members })
    }

    // ==================== Query root ====================

    fn define_query(&mut self) {
        let mut fields = vec![FieldPlan::new(
            "_version",
            TypeRef::named_nn(TypeRef::STRING),
            FieldResolver::Version,
        )];
        let mut taken = names_of(&fields);

        let model = self.model;
        for km in &model.kinds {
            let kind = km.id();
            let target = if !km.has_sub_kinds() {
                TargetShape::Object(naming::kind_type_name(kind))
            } else {
                match self.kind_union(km) {
                    Some(target) => target,
                    None => continue,
                }
            };

            if km.exposure.load {
                let name = naming::load_field_name(kind);
                if taken.insert(name.clone()) {
                    fields.push(
                        FieldPlan::new(
                            name,
                            TypeRef::named(target.type_name()),
                            FieldResolver::RootLoad {
                                kind: kind.to_string(),
                                target: target.clone(),
                            },
                        )
                        .with_description(Some(format!("Loads one {}", km.descriptor.label)))
                        .with_argument(ArgumentPlan::new("id", TypeRef::named_nn(TypeRef::ID)))
                        .with_argument(
                            ArgumentPlan::new("langcode", TypeRef::named(TypeRef::STRING))
                                .with_description("Language to load the entity in"),
                        )
                        .with_argument(
                            ArgumentPlan::new("revision", TypeRef::named(TypeRef::ID))
                                .with_description("\"current\", \"latest\" or a revision id"),
                        ),
                    );
                } else {
                    warn!(kind, field = %name, "Query field name collides, skipping");
                }
            }

            if km.exposure.connection {
                let sub_kinds = if km.has_sub_kinds() {
                    km.sub_kind_ids()
                } else {
                    Vec::new()
                };
                if let Some(plan) = self.connection_field(kind, None, sub_kinds, target, &taken) {
                    taken.insert(plan.name.clone());
                    fields.push(plan);
                }

                if km.has_sub_kinds() {
                    for sub in &km.sub_kinds {
                        let id = &sub.descriptor.id;
                        let target = TargetShape::Object(naming::sub_kind_type_name(kind, id));
                        if let Some(plan) = self.connection_field(
                            kind,
                            Some(id.as_str()),
                            vec![id.clone()],
                            target,
                            &taken,
                        ) {
                            taken.insert(plan.name.clone());
                            fields.push(plan);
                        }
                    }
                }
            }
        }

        self.registry.define(
            QUERY_TYPE,
            TypeDefinition::Object {
                description: None,
                implements: Vec::new(),
                fields,
            },
        );
    }

    /// Defines the connection and edge types of a listing and plans its
    /// root field.
    fn connection_field(
        &mut self,
        kind: &str,
        sub_kind: Option<&str>,
        sub_kinds: Vec<String>,
        target: TargetShape,
        taken: &HashSet<String>,
    ) -> Option<FieldPlan> {
        let field_name = naming::connection_field_name(kind, sub_kind);
        if taken.contains(&field_name) {
            warn!(kind, field = %field_name, "Query field name collides, skipping");
            return None;
        }

        let edge = naming::edge_type_name(kind, sub_kind);
        let connection = naming::connection_type_name(kind, sub_kind);
        let node_type = target.type_name().to_string();

        self.registry.define(
            &edge,
            TypeDefinition::Object {
                description: None,
                implements: Vec::new(),
                fields: vec![
                    FieldPlan::new("cursor", TypeRef::named_nn(CURSOR_SCALAR), FieldResolver::EdgeCursor),
                    FieldPlan::new("node", TypeRef::named_nn(&node_type), FieldResolver::EdgeNode),
                ],
            },
        );
        self.registry.define(
            &connection,
            TypeDefinition::Object {
                description: None,
                implements: Vec::new(),
                fields: vec![
                    FieldPlan::new(
                        "edges",
                        TypeRef::named_nn_list_nn(&edge),
                        FieldResolver::ConnectionEdges,
                    ),
                    FieldPlan::new(
                        "nodes",
                        TypeRef::named_nn_list_nn(&node_type),
                        FieldResolver::ConnectionNodes,
                    ),
                    FieldPlan::new(
                        "pageInfo",
                        TypeRef::named_nn(PAGE_INFO_TYPE),
                        FieldResolver::ConnectionPageInfo,
                    ),
                    FieldPlan::new("total", TypeRef::named_nn(TypeRef::INT), FieldResolver::ConnectionTotal),
                ],
            },
        );

        let default_sort = naming::encode_enum_value(SortKey::default().as_str())
            .map(|v| Value::Enum(Name::new(v)));
        let mut sort_argument = ArgumentPlan::new("sortKey", TypeRef::named(SORT_KEYS_ENUM));
        if let Some(default) = default_sort {
            sort_argument = sort_argument.with_default(default);
        }

        Some(
            FieldPlan::new(
                field_name,
                TypeRef::named(&connection),
                FieldResolver::RootConnection {
                    kind: kind.to_string(),
                    sub_kinds,
                    target,
                },
            )
            .with_argument(ArgumentPlan::new("first", TypeRef::named(TypeRef::INT)))
            .with_argument(ArgumentPlan::new("after", TypeRef::named(CURSOR_SCALAR)))
            .with_argument(ArgumentPlan::new("last", TypeRef::named(TypeRef::INT)))
            .with_argument(ArgumentPlan::new("before", TypeRef::named(CURSOR_SCALAR)))
            .with_argument(
                ArgumentPlan::new("reverse", TypeRef::named(TypeRef::BOOLEAN))
                    .with_default(Value::Boolean(false)),
            )
            .with_argument(sort_argument)
            .with_argument(
                ArgumentPlan::new("langcode", TypeRef::named(TypeRef::STRING))
                    .with_description("Only entities available in this language"),
            ),
        )
    }
}

fn names_of(plans: &[FieldPlan]) -> HashSet<String> {
    plans.iter().map(|p| p.name.clone()).collect()
}

/// Defines (once) the record type of a mapping; `None` when no scalar leaf
/// exists anywhere below `properties`.
///
/// Records are named after their owning type, so same-named mappings on
/// different owners never share a definition.
fn define_record(
    registry: &mut TypeRegistry,
    owner: &str,
    path: &str,
    properties: &[PropertyDescriptor],
) -> Option<String> {
    if !properties.iter().any(PropertyDescriptor::has_scalar_leaf) {
        return None;
    }

    let name = naming::record_type_name(owner, path);
    registry.get_or_define(&name, |registry| TypeDefinition::Object {
        description: None,
        implements: Vec::new(),
        fields: record_fields(registry, owner, &name, path, properties),
    });
    Some(name)
}

fn record_fields(
    registry: &mut TypeRegistry,
    owner: &str,
    name: &str,
    path: &str,
    properties: &[PropertyDescriptor],
) -> Vec<FieldPlan> {
    let mut fields = Vec::with_capacity(properties.len());
    let mut taken = HashSet::new();
    for property in properties {
        let field_name = naming::field_name(&property.name);
        if !naming::is_valid_graphql_name(&field_name) || !taken.insert(field_name.clone()) {
            warn!(record = %name, property = %property.name, "Skipping record property");
            continue;
        }

        let plan = match &property.kind {
            PropertyKind::Scalar(scalar) => {
                let (type_name, coercion) = scalar_type(*scalar);
                FieldPlan::new(
                    field_name,
                    TypeRef::named(type_name),
                    FieldResolver::RecordProperty {
                        property: property.name.clone(),
                        coercion,
                        nested: false,
                    },
                )
            }
            PropertyKind::Record(nested) => {
                let nested_path = format!("{path}_{}", property.name);
                match define_record(registry, owner, &nested_path, nested) {
                    Some(record) => FieldPlan::new(
                        field_name,
                        TypeRef::named(record),
                        FieldResolver::RecordProperty {
                            property: property.name.clone(),
                            coercion: Coercion::Map,
                            nested: true,
                        },
                    ),
                    None => FieldPlan::new(
                        field_name,
                        TypeRef::named(MAP_DATA_SCALAR),
                        FieldResolver::RecordProperty {
                            property: property.name.clone(),
                            coercion: Coercion::Map,
                            nested: false,
                        },
                    ),
                }
            }
        };
        fields.push(plan);
    }
    fields
}

fn scalar_type(scalar: ScalarKind) -> (&'static str, Coercion) {
    match scalar {
        ScalarKind::String => (TypeRef::STRING, Coercion::String),
        ScalarKind::Int => (TypeRef::INT, Coercion::Int),
        ScalarKind::Float => (TypeRef::FLOAT, Coercion::Float),
        ScalarKind::Boolean => (TypeRef::BOOLEAN, Coercion::Boolean),
    }
}

/// Interfaces an entity type of a kind implements.
fn entity_interfaces(capabilities: &[Capability]) -> Vec<String> {
    let mut interfaces = vec![ENTITY_INTERFACE.to_string()];
    interfaces.extend(
        capabilities
            .iter()
            .map(|c| capability_interface(*c).to_string()),
    );
    interfaces
}

/// Fixed fields of an entity type of a kind.
fn entity_field_plans(capabilities: &[Capability]) -> Vec<FieldPlan> {
    let mut plans = interface_field_plans(ENTITY_INTERFACE);
    for capability in capabilities {
        plans.extend(interface_field_plans(capability_interface(*capability)));
    }
    plans
}

fn capability_interface(capability: Capability) -> &'static str {
    match capability {
        Capability::Linkable => LINKABLE_INTERFACE,
        Capability::Translatable => TRANSLATABLE_INTERFACE,
        Capability::Revisionable => REVISIONABLE_INTERFACE,
        Capability::Describable => DESCRIBABLE_INTERFACE,
    }
}

fn interface_description(interface: &str) -> &'static str {
    match interface {
        ENTITY_INTERFACE => "Any exposed entity",
        LINKABLE_INTERFACE => "Entity with a public URL",
        TRANSLATABLE_INTERFACE => "Entity available in several languages",
        REVISIONABLE_INTERFACE => "Entity keeping a revision history",
        _ => "Entity with a description",
    }
}

fn interface_field_plans(interface: &str) -> Vec<FieldPlan> {
    let property = |name: &str, type_ref: TypeRef, property: EntityProperty| {
        FieldPlan::new(name, type_ref, FieldResolver::Entity(property))
    };

    match interface {
        ENTITY_INTERFACE => vec![
            property("id", TypeRef::named_nn(TypeRef::ID), EntityProperty::Id),
            property("entityType", TypeRef::named_nn(TypeRef::STRING), EntityProperty::EntityType),
            property(
                "entityBundle",
                TypeRef::named_nn(TypeRef::STRING),
                EntityProperty::EntityBundle,
            ),
            property("label", TypeRef::named_nn(TypeRef::STRING), EntityProperty::Label),
        ],
        LINKABLE_INTERFACE => vec![property("url", TypeRef::named(TypeRef::STRING), EntityProperty::Url)],
        TRANSLATABLE_INTERFACE => vec![
            property("langcode", TypeRef::named_nn(TypeRef::STRING), EntityProperty::Langcode),
            property(
                "translationLangcodes",
                TypeRef::named_nn_list_nn(TypeRef::STRING),
                EntityProperty::TranslationLangcodes,
            ),
        ],
        REVISIONABLE_INTERFACE => vec![
            property("revisionId", TypeRef::named(TypeRef::ID), EntityProperty::RevisionId),
            property(
                "defaultRevision",
                TypeRef::named_nn(TypeRef::BOOLEAN),
                EntityProperty::DefaultRevision,
            ),
        ],
        DESCRIBABLE_INTERFACE => vec![property(
            "description",
            TypeRef::named(TypeRef::STRING),
            EntityProperty::Description,
        )],
        _ => Vec::new(),
    }
}
