//! Content model discovery.
//!
//! Reads kinds, fields and value domains from the store and narrows them to
//! what the exposure configuration enables.

use std::collections::BTreeMap;

use contentgraph_storage::{
    DynContentStore, EntityKindDescriptor, FieldDescriptor, SubKindDescriptor, ValueDomain,
};
use tracing::{debug, warn};

use crate::config::KindExposure;
use crate::error::GraphQLError;

/// An exposed sub-kind and its full field list (base fields first).
#[derive(Debug, Clone)]
pub struct SubKindModel {
    pub descriptor: SubKindDescriptor,
    pub fields: Vec<FieldDescriptor>,
}

/// An enabled entity kind.
#[derive(Debug, Clone)]
pub struct KindModel {
    pub descriptor: EntityKindDescriptor,
    pub exposure: KindExposure,
    pub base_fields: Vec<FieldDescriptor>,
    /// Exposed sub-kinds; empty for kinds without sub-kinds.
    pub sub_kinds: Vec<SubKindModel>,
}

impl KindModel {
    #[must_use]
    pub fn id(&self) -> &str {
        &self.descriptor.id
    }

    #[must_use]
    pub fn has_sub_kinds(&self) -> bool {
        self.descriptor.has_sub_kinds()
    }

    /// Returns the exposed sub-kind, if any.
    #[must_use]
    pub fn sub_kind(&self, id: &str) -> Option<&SubKindModel> {
        self.sub_kinds.iter().find(|s| s.descriptor.id == id)
    }

    /// Ids of the exposed sub-kinds.
    #[must_use]
    pub fn sub_kind_ids(&self) -> Vec<String> {
        self.sub_kinds
            .iter()
            .map(|s| s.descriptor.id.clone())
            .collect()
    }
}

/// The part of the content model the schema is synthesized from.
#[derive(Debug, Clone, Default)]
pub struct ContentModel {
    /// Enabled kinds, sorted by id.
    pub kinds: Vec<KindModel>,
    /// Value domains, sorted by name.
    pub domains: Vec<ValueDomain>,
}

impl ContentModel {
    #[must_use]
    pub fn kind(&self, id: &str) -> Option<&KindModel> {
        self.kinds.iter().find(|k| k.id() == id)
    }

    #[must_use]
    pub fn domain(&self, name: &str) -> Option<&ValueDomain> {
        self.domains.iter().find(|d| d.name == name)
    }
}

/// Discovers the content model behind a store.
pub struct ContentModelIntrospector {
    store: DynContentStore,
    entities: BTreeMap<String, KindExposure>,
}

impl ContentModelIntrospector {
    #[must_use]
    pub fn new(store: DynContentStore, entities: BTreeMap<String, KindExposure>) -> Self {
        Self { store, entities }
    }

    /// Reads the enabled part of the content model.
    ///
    /// Kinds without an exposure entry are left out. Exposure entries naming
    /// kinds or sub-kinds the store does not know are logged and ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub async fn introspect(&self) -> Result<ContentModel, GraphQLError> {
        let descriptors = self.store.list_kinds().await?;

        for configured in self.entities.keys() {
            if !descriptors.iter().any(|d| &d.id == configured) {
                warn!(kind = %configured, "Configured entity kind is unknown to the store");
            }
        }

        let mut kinds = Vec::new();
        for descriptor in descriptors {
            let Some(exposure) = self.entities.get(&descriptor.id) else {
                debug!(kind = %descriptor.id, "Entity kind not enabled");
                continue;
            };

            let base_fields = self.store.describe_fields(&descriptor.id, None).await?;

            let mut sub_kinds = Vec::new();
            for sub_kind in &descriptor.sub_kinds {
                if !exposure.exposes_sub_kind(&sub_kind.id) {
                    debug!(kind = %descriptor.id, sub_kind = %sub_kind.id, "Sub-kind not exposed");
                    continue;
                }
                let fields = self
                    .store
                    .describe_fields(&descriptor.id, Some(&sub_kind.id))
                    .await?;
                sub_kinds.push(SubKindModel {
                    descriptor: sub_kind.clone(),
                    fields,
                });
            }

            if let Some(listed) = &exposure.sub_kinds {
                for id in listed {
                    if descriptor.sub_kind(id).is_none() {
                        warn!(kind = %descriptor.id, sub_kind = %id, "Configured sub-kind is unknown");
                    }
                }
            }

            debug!(
                kind = %descriptor.id,
                base_fields = base_fields.len(),
                sub_kinds = sub_kinds.len(),
                "Introspected entity kind"
            );

            kinds.push(KindModel {
                descriptor,
                exposure: exposure.clone(),
                base_fields,
                sub_kinds,
            });
        }
        kinds.sort_by(|a, b| a.descriptor.id.cmp(&b.descriptor.id));

        let mut domains = self.store.value_domains().await?;
        domains.sort_by(|a, b| a.name.cmp(&b.name));

        Ok(ContentModel { kinds, domains })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contentgraph_db_memory::InMemoryStore;
    use contentgraph_storage::FieldType;
    use std::sync::Arc;

    fn store() -> Arc<InMemoryStore> {
        let store = InMemoryStore::new();
        store.register_kind(
            EntityKindDescriptor::new("node", "Content")
                .with_sub_kind("article", "Article")
                .with_sub_kind("page", "Basic page"),
        );
        store.register_kind(EntityKindDescriptor::new("user", "User"));
        store
            .register_fields(
                "node",
                "article",
                vec![FieldDescriptor::new("field_tags", FieldType::EntityReference)],
            )
            .unwrap();
        store.register_domain(ValueDomain::new("menu", &["main", "footer"]));
        Arc::new(store)
    }

    #[tokio::test]
    async fn test_only_enabled_kinds() {
        let mut entities = BTreeMap::new();
        entities.insert(
            "node".to_string(),
            KindExposure {
                sub_kinds: Some(vec!["article".into(), "recipe".into()]),
                ..Default::default()
            },
        );

        let model = ContentModelIntrospector::new(store(), entities)
            .introspect()
            .await
            .unwrap();

        assert_eq!(model.kinds.len(), 1);
        let node = model.kind("node").unwrap();
        assert_eq!(node.sub_kind_ids(), vec!["article".to_string()]);
        assert!(node.sub_kind("article").unwrap().fields.iter().any(|f| f.machine_name == "field_tags"));
        assert!(model.kind("user").is_none());
        assert!(model.domain("menu").is_some());
    }
}
