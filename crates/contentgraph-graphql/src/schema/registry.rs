//! Registry of synthesized types.
//!
//! Types are keyed by name. Defining a name twice returns the first
//! definition, which makes synthesis idempotent and breaks cycles between
//! kinds that reference each other: a name is reserved before its fields are
//! planned, so a nested reference back to it sees the reservation and stops.

use std::collections::HashSet;
use std::sync::Arc;

use async_graphql::Value;
use async_graphql::dynamic::{
    Enum, EnumItem, Field, FieldFuture, InputValue, Interface, InterfaceField, Object, Scalar,
    Type, TypeRef, Union,
};
use indexmap::IndexMap;
use tracing::{trace, warn};

use crate::resolvers::{FieldResolver, ResolverDispatcher};

/// An argument of a synthesized field.
#[derive(Debug, Clone)]
pub struct ArgumentPlan {
    pub name: String,
    pub type_ref: TypeRef,
    pub default_value: Option<Value>,
    pub description: Option<String>,
}

impl ArgumentPlan {
    #[must_use]
    pub fn new(name: impl Into<String>, type_ref: TypeRef) -> Self {
        Self {
            name: name.into(),
            type_ref,
            default_value: None,
            description: None,
        }
    }

    #[must_use]
    pub fn with_default(mut self, value: Value) -> Self {
        self.default_value = Some(value);
        self
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    fn materialize(&self) -> InputValue {
        let mut input = InputValue::new(&self.name, self.type_ref.clone());
        if let Some(value) = &self.default_value {
            input = input.default_value(value.clone());
        }
        if let Some(description) = &self.description {
            input = input.description(description);
        }
        input
    }
}

/// A field of a synthesized object or interface.
#[derive(Debug, Clone)]
pub struct FieldPlan {
    pub name: String,
    pub type_ref: TypeRef,
    pub description: Option<String>,
    pub arguments: Vec<ArgumentPlan>,
    pub resolver: Arc<FieldResolver>,
}

impl FieldPlan {
    #[must_use]
    pub fn new(name: impl Into<String>, type_ref: TypeRef, resolver: FieldResolver) -> Self {
        Self {
            name: name.into(),
            type_ref,
            description: None,
            arguments: Vec::new(),
            resolver: Arc::new(resolver),
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: Option<impl Into<String>>) -> Self {
        self.description = description.map(Into::into);
        self
    }

    #[must_use]
    pub fn with_argument(mut self, argument: ArgumentPlan) -> Self {
        self.arguments.push(argument);
        self
    }

    fn materialize_field(&self) -> Field {
        let resolver = self.resolver.clone();
        let mut field = Field::new(&self.name, self.type_ref.clone(), move |ctx| {
            let resolver = resolver.clone();
            FieldFuture::new(async move { ResolverDispatcher::resolve(ctx, &resolver).await })
        });
        if let Some(description) = &self.description {
            field = field.description(description);
        }
        for argument in &self.arguments {
            field = field.argument(argument.materialize());
        }
        field
    }

    fn materialize_interface_field(&self) -> InterfaceField {
        let mut field = InterfaceField::new(&self.name, self.type_ref.clone());
        if let Some(description) = &self.description {
            field = field.description(description);
        }
        for argument in &self.arguments {
            field = field.argument(argument.materialize());
        }
        field
    }
}

/// Shape of a synthesized type.
#[derive(Debug, Clone)]
pub enum TypeDefinition {
    Object {
        description: Option<String>,
        implements: Vec<String>,
        fields: Vec<FieldPlan>,
    },
    Interface {
        description: Option<String>,
        implements: Vec<String>,
        fields: Vec<FieldPlan>,
    },
    Union {
        description: Option<String>,
        members: Vec<String>,
    },
    Enum {
        description: Option<String>,
        values: Vec<String>,
    },
    Scalar {
        description: Option<String>,
    },
}

impl TypeDefinition {
    /// Kind of the definition, as named by GraphQL.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Object { .. } => "OBJECT",
            Self::Interface { .. } => "INTERFACE",
            Self::Union { .. } => "UNION",
            Self::Enum { .. } => "ENUM",
            Self::Scalar { .. } => "SCALAR",
        }
    }
}

/// A named, synthesized type.
#[derive(Debug, Clone)]
pub struct GeneratedType {
    pub name: String,
    pub definition: TypeDefinition,
}

impl GeneratedType {
    /// Field names, for objects and interfaces.
    #[must_use]
    pub fn field_names(&self) -> Vec<&str> {
        match &self.definition {
            TypeDefinition::Object { fields, .. } | TypeDefinition::Interface { fields, .. } => {
                fields.iter().map(|f| f.name.as_str()).collect()
            }
            _ => Vec::new(),
        }
    }

    /// Builds the async-graphql type.
    #[must_use]
    pub fn materialize(&self) -> Type {
        match &self.definition {
            TypeDefinition::Object {
                description,
                implements,
                fields,
            } => {
                let mut object = Object::new(&self.name);
                if let Some(description) = description {
                    object = object.description(description);
                }
                for interface in implements {
                    object = object.implement(interface);
                }
                for field in fields {
                    object = object.field(field.materialize_field());
                }
                object.into()
            }
            TypeDefinition::Interface {
                description,
                implements,
                fields,
            } => {
                let mut interface = Interface::new(&self.name);
                if let Some(description) = description {
                    interface = interface.description(description);
                }
                for parent in implements {
                    interface = interface.implement(parent);
                }
                for field in fields {
                    interface = interface.field(field.materialize_interface_field());
                }
                interface.into()
            }
            TypeDefinition::Union {
                description,
                members,
            } => {
                let mut union = Union::new(&self.name);
                if let Some(description) = description {
                    union = union.description(description);
                }
                for member in members {
                    union = union.possible_type(member);
                }
                union.into()
            }
            TypeDefinition::Enum {
                description,
                values,
            } => {
                let mut enum_type = Enum::new(&self.name);
                if let Some(description) = description {
                    enum_type = enum_type.description(description);
                }
                for value in values {
                    enum_type = enum_type.item(EnumItem::new(value));
                }
                enum_type.into()
            }
            TypeDefinition::Scalar { description } => {
                let mut scalar = Scalar::new(&self.name);
                if let Some(description) = description {
                    scalar = scalar.description(description);
                }
                scalar.into()
            }
        }
    }
}

/// Name-keyed registry of synthesized types, in definition order.
#[derive(Debug, Default)]
pub struct TypeRegistry {
    types: IndexMap<String, Arc<GeneratedType>>,
    reserved: HashSet<String>,
}

impl TypeRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the name is defined or reserved.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name) || self.reserved.contains(name)
    }

    /// Reserves a name whose definition is being planned.
    ///
    /// Returns `false` if the name is already defined or reserved.
    pub fn reserve(&mut self, name: &str) -> bool {
        if self.contains(name) {
            return false;
        }
        trace!(name, "Reserved type name");
        self.reserved.insert(name.to_string())
    }

    /// Defines a type.
    ///
    /// An existing definition is never replaced; it is returned instead.
    pub fn define(&mut self, name: &str, definition: TypeDefinition) -> Arc<GeneratedType> {
        if let Some(existing) = self.types.get(name) {
            if existing.definition.kind() != definition.kind() {
                warn!(
                    name,
                    existing = existing.definition.kind(),
                    requested = definition.kind(),
                    "Type name already taken by a different kind of type"
                );
            }
            return existing.clone();
        }

        self.reserved.remove(name);
        let generated = Arc::new(GeneratedType {
            name: name.to_string(),
            definition,
        });
        self.types.insert(name.to_string(), generated.clone());
        generated
    }

    /// Returns the type, defining it with `build` first if needed.
    pub fn get_or_define(
        &mut self,
        name: &str,
        build: impl FnOnce(&mut Self) -> TypeDefinition,
    ) -> Arc<GeneratedType> {
        if let Some(existing) = self.types.get(name) {
            return existing.clone();
        }
        self.reserved.insert(name.to_string());
        let definition = build(self);
        self.define(name, definition)
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Arc<GeneratedType>> {
        self.types.get(name)
    }

    /// All defined types, in definition order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<GeneratedType>> {
        self.types.values()
    }

    /// Names of all objects implementing `interface`.
    #[must_use]
    pub fn implementors(&self, interface: &str) -> Vec<&str> {
        self.types
            .values()
            .filter(|t| match &t.definition {
                TypeDefinition::Object { implements, .. }
                | TypeDefinition::Interface { implements, .. } => {
                    implements.iter().any(|i| i == interface)
                }
                _ => false,
            })
            .map(|t| t.name.as_str())
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.types.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scalar() -> TypeDefinition {
        TypeDefinition::Scalar { description: None }
    }

    #[test]
    fn test_define_is_idempotent() {
        let mut registry = TypeRegistry::new();
        let first = registry.define("Timestamp", scalar());
        let second = registry.define(
            "Timestamp",
            TypeDefinition::Enum {
                description: None,
                values: vec!["A".into()],
            },
        );

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.definition.kind(), "SCALAR");
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_reserve_blocks_reentry() {
        let mut registry = TypeRegistry::new();
        assert!(registry.reserve("NodeArticle"));
        assert!(!registry.reserve("NodeArticle"));
        assert!(registry.contains("NodeArticle"));
        assert!(registry.get("NodeArticle").is_none());

        registry.define(
            "NodeArticle",
            TypeDefinition::Object {
                description: None,
                implements: vec!["EntityInterface".into()],
                fields: vec![FieldPlan::new(
                    "id",
                    TypeRef::named_nn(TypeRef::ID),
                    FieldResolver::Entity(crate::resolvers::EntityProperty::Id),
                )],
            },
        );
        assert_eq!(registry.implementors("EntityInterface"), vec!["NodeArticle"]);
        assert_eq!(registry.get("NodeArticle").unwrap().field_names(), vec!["id"]);
    }

    #[test]
    fn test_get_or_define_builds_once() {
        let mut registry = TypeRegistry::new();
        let mut calls = 0;
        for _ in 0..2 {
            registry.get_or_define("Cursor", |_| {
                calls += 1;
                scalar()
            });
        }
        assert_eq!(calls, 1);
    }
}
