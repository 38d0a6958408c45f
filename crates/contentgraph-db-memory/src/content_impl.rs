//! Implementation of the ContentStore trait for InMemoryStore.

use std::collections::HashMap;

use async_trait::async_trait;
use contentgraph_storage::{
    AccessOperation, AccessResult, AccessTarget, Account, CONTEXT_USER_PERMISSIONS,
    CacheMetadata, ContentStore, EntityId, EntityKindDescriptor, EntityQuery, EntityRecord,
    FieldDescriptor, PERMISSION_VIEW_LATEST_VERSION, PERMISSION_VIEW_UNPUBLISHED, RevisionId,
    RevisionIndex, StorageError, ValueDomain,
};
use tracing::trace;

use crate::storage::InMemoryStore;

#[async_trait]
impl ContentStore for InMemoryStore {
    async fn list_kinds(&self) -> Result<Vec<EntityKindDescriptor>, StorageError> {
        let mut kinds: Vec<_> = self.kinds.pin().values().cloned().collect();
        kinds.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(kinds)
    }

    async fn describe_fields(
        &self,
        kind: &str,
        sub_kind: Option<&str>,
    ) -> Result<Vec<FieldDescriptor>, StorageError> {
        let descriptor = self.kind(kind)?;
        let mut fields = descriptor.base_fields.clone();

        if let Some(sub_kind) = sub_kind {
            if descriptor.sub_kind(sub_kind).is_none() {
                return Err(StorageError::unknown_sub_kind(kind, sub_kind));
            }
            let guard = self.bundle_fields.pin();
            if let Some(bundle) = guard.get(&(kind.to_string(), sub_kind.to_string())) {
                let own: Vec<_> = bundle
                    .iter()
                    .filter(|f| !fields.iter().any(|b| b.machine_name == f.machine_name))
                    .cloned()
                    .collect();
                fields.extend(own);
            }
        }

        Ok(fields)
    }

    async fn value_domains(&self) -> Result<Vec<ValueDomain>, StorageError> {
        let mut domains: Vec<_> = self.domains.pin().values().cloned().collect();
        domains.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(domains)
    }

    async fn load_by_id(
        &self,
        kind: &str,
        id: EntityId,
    ) -> Result<Option<EntityRecord>, StorageError> {
        let entities = self.entities.pin();
        let Some(entity) = entities.get(&(kind.to_string(), id)) else {
            return Ok(None);
        };
        let revisions = self.revisions.pin();
        let Some(revision) = revisions.get(&(kind.to_string(), entity.default_revision)) else {
            return Err(StorageError::internal(format!(
                "Missing default revision for {kind}/{id}"
            )));
        };
        Ok(Some(self.to_record(
            entity,
            entity.default_revision,
            revision,
            &entity.default_langcode,
        )))
    }

    async fn load_multiple(
        &self,
        kind: &str,
        ids: &[EntityId],
    ) -> Result<HashMap<EntityId, EntityRecord>, StorageError> {
        let entities = self.entities.pin();
        let revisions = self.revisions.pin();
        let mut loaded = HashMap::with_capacity(ids.len());

        for id in ids {
            let Some(entity) = entities.get(&(kind.to_string(), *id)) else {
                continue;
            };
            if let Some(revision) = revisions.get(&(kind.to_string(), entity.default_revision)) {
                loaded.insert(
                    *id,
                    self.to_record(
                        entity,
                        entity.default_revision,
                        revision,
                        &entity.default_langcode,
                    ),
                );
            }
        }

        trace!(kind, requested = ids.len(), found = loaded.len(), "Batch load");
        Ok(loaded)
    }

    async fn load_translation(
        &self,
        record: &EntityRecord,
        langcode: &str,
    ) -> Result<Option<EntityRecord>, StorageError> {
        let entities = self.entities.pin();
        let Some(entity) = entities.get(&(record.kind.clone(), record.id)) else {
            return Ok(None);
        };
        let revisions = self.revisions.pin();
        Ok(revisions
            .get(&(record.kind.clone(), record.revision_id))
            .filter(|revision| revision.translations.contains_key(langcode))
            .map(|revision| self.to_record(entity, record.revision_id, revision, langcode)))
    }

    async fn revision_index(
        &self,
        kind: &str,
        id: EntityId,
    ) -> Result<Option<RevisionIndex>, StorageError> {
        let entity = self.entities.pin().get(&(kind.to_string(), id)).cloned();
        Ok(entity.map(|entity| self.index_for(&entity)))
    }

    async fn load_revision(
        &self,
        kind: &str,
        revision_id: RevisionId,
        langcode: Option<&str>,
    ) -> Result<Option<EntityRecord>, StorageError> {
        let revisions = self.revisions.pin();
        let Some(revision) = revisions.get(&(kind.to_string(), revision_id)) else {
            return Ok(None);
        };
        let entities = self.entities.pin();
        let Some(entity) = entities.get(&(kind.to_string(), revision.entity_id)) else {
            return Ok(None);
        };
        let langcode = langcode.unwrap_or(&entity.default_langcode);
        Ok(Some(self.to_record(entity, revision_id, revision, langcode)))
    }

    async fn query_by_kind(
        &self,
        kind: &str,
        query: &EntityQuery,
    ) -> Result<Vec<EntityRecord>, StorageError> {
        self.kind(kind)?;

        let entities = self.entities.pin();
        let revisions = self.revisions.pin();
        let mut records = Vec::new();

        for ((entity_kind, _), entity) in entities.iter() {
            if entity_kind != kind {
                continue;
            }
            if !query.sub_kinds.is_empty() && !query.sub_kinds.contains(&entity.sub_kind) {
                continue;
            }
            let Some(revision) = revisions.get(&(kind.to_string(), entity.default_revision))
            else {
                continue;
            };
            let langcode = match (&query.langcode, &query.preferred_langcode) {
                (Some(langcode), _) if revision.translations.contains_key(langcode) => langcode,
                (Some(_), _) => continue,
                (None, Some(preferred)) if revision.translations.contains_key(preferred) => {
                    preferred
                }
                (None, _) => &entity.default_langcode,
            };
            records.push(self.to_record(entity, entity.default_revision, revision, langcode));
        }

        let (key, direction) = query.sort.unwrap_or_default();
        records.sort_by(|a, b| {
            direction.apply(
                a.sort_value(key)
                    .cmp(&b.sort_value(key))
                    .then(a.id.cmp(&b.id)),
            )
        });

        let limit = query.limit.unwrap_or(usize::MAX);
        Ok(records.into_iter().skip(query.offset).take(limit).collect())
    }

    async fn check_access(
        &self,
        target: AccessTarget<'_>,
        operation: AccessOperation,
        account: &Account,
    ) -> Result<AccessResult, StorageError> {
        let entity = target.entity();
        let cacheability = CacheMetadata::new()
            .with_tag(entity.cache_tag())
            .with_context(CONTEXT_USER_PERMISSIONS);

        let result = match (target, operation) {
            (AccessTarget::Entity(record), AccessOperation::View) => AccessResult::allowed_if(
                record.published
                    || account.has_permission(PERMISSION_VIEW_UNPUBLISHED)
                    || (!record.default_revision
                        && account.has_permission(PERMISSION_VIEW_LATEST_VERSION)),
                cacheability,
            ),
            (_, AccessOperation::ViewLatestVersion) => AccessResult::allowed_if(
                account.has_permission(PERMISSION_VIEW_LATEST_VERSION),
                cacheability,
            ),
            (AccessTarget::Field { entity, field }, AccessOperation::View) => {
                let required = self
                    .field_permissions
                    .pin()
                    .get(&(entity.kind.clone(), field.machine_name.clone()))
                    .cloned();
                AccessResult::allowed_if(
                    required.is_none_or(|permission| account.has_permission(&permission)),
                    cacheability,
                )
            }
        };

        trace!(
            entity = %entity.cache_tag(),
            ?operation,
            allowed = result.allowed,
            "Access check"
        );
        Ok(result)
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{NewEntity, TranslationData};
    use contentgraph_storage::{FieldType, SortDirection, SortKey};
    use serde_json::json;

    fn seeded() -> InMemoryStore {
        let store = InMemoryStore::new();
        store.register_kind(
            EntityKindDescriptor::new("node", "Content")
                .with_sub_kind("article", "Article")
                .with_sub_kind("page", "Basic page")
                .with_base_field(FieldDescriptor::new("title", FieldType::String)),
        );
        store
            .register_fields(
                "node",
                "article",
                vec![FieldDescriptor::new("field_subtitle", FieldType::String)],
            )
            .unwrap();
        store
    }

    #[tokio::test]
    async fn test_describe_fields_base_then_bundle() {
        let store = seeded();

        let base = store.describe_fields("node", None).await.unwrap();
        assert_eq!(base.len(), 1);

        let article = store.describe_fields("node", Some("article")).await.unwrap();
        let names: Vec<_> = article.iter().map(|f| f.machine_name.as_str()).collect();
        assert_eq!(names, vec!["title", "field_subtitle"]);

        let page = store.describe_fields("node", Some("page")).await.unwrap();
        assert_eq!(page.len(), 1);

        assert!(store.describe_fields("node", Some("recipe")).await.is_err());
        assert!(store.describe_fields("block", None).await.is_err());
    }

    #[tokio::test]
    async fn test_translation_and_revision_fallback() {
        let store = seeded();
        let node = store
            .create(NewEntity::new("node", "Hello").sub_kind("article"))
            .unwrap();

        assert!(store.load_translation(&node, "ja").await.unwrap().is_none());

        let ja = store
            .add_translation("node", node.id, "ja", TranslationData::new("Konnichiwa"))
            .unwrap();
        let loaded = store.load_by_id("node", node.id).await.unwrap().unwrap();
        assert_eq!(loaded.langcode, "en");
        assert_eq!(loaded.translations, vec!["en", "ja"]);

        let translated = store.load_translation(&loaded, "ja").await.unwrap().unwrap();
        assert_eq!(translated.label, "Konnichiwa");
        assert_eq!(translated.revision_id, ja.revision_id);

        // The first revision predates the translation: falls back to English.
        let old = store
            .load_revision("node", node.revision_id, Some("ja"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(old.langcode, "en");
        assert_eq!(old.label, "Hello");
        assert!(!old.default_revision);
    }

    #[tokio::test]
    async fn test_query_by_kind_sorts_and_filters_language() {
        let store = seeded();
        for (label, created, lang) in [("B", 20, "en"), ("A", 10, "en"), ("C", 30, "ja")] {
            store
                .create(
                    NewEntity::new("node", label)
                        .sub_kind("article")
                        .langcode(lang)
                        .created(created),
                )
                .unwrap();
        }
        store
            .create(NewEntity::new("node", "Page").sub_kind("page").created(5))
            .unwrap();

        let query = EntityQuery::new()
            .with_sub_kinds(vec!["article".to_string()])
            .with_sort(SortKey::Created, SortDirection::Descending);
        let labels: Vec<_> = store
            .query_by_kind("node", &query)
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.label)
            .collect();
        assert_eq!(labels, vec!["C", "B", "A"]);

        let ja = store
            .query_by_kind("node", &EntityQuery::new().with_langcode("ja"))
            .await
            .unwrap();
        assert_eq!(ja.len(), 1);
        assert_eq!(ja[0].langcode, "ja");
    }

    #[tokio::test]
    async fn test_query_by_kind_prefers_translation() {
        let store = seeded();
        let hello = store
            .create(NewEntity::new("node", "Hello").sub_kind("article").created(1))
            .unwrap();
        store
            .add_translation("node", hello.id, "de", TranslationData::new("Hallo"))
            .unwrap();
        store
            .create(NewEntity::new("node", "Only English").sub_kind("article").created(2))
            .unwrap();

        let records = store
            .query_by_kind("node", &EntityQuery::new().with_preferred_langcode("de"))
            .await
            .unwrap();
        let labels: Vec<_> = records
            .iter()
            .map(|r| (r.label.as_str(), r.langcode.as_str()))
            .collect();
        assert_eq!(labels, vec![("Hallo", "de"), ("Only English", "en")]);

        // A language filter wins over the preference
        let ja = EntityQuery::new()
            .with_langcode("ja")
            .with_preferred_langcode("de");
        assert!(store.query_by_kind("node", &ja).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_access_rules() {
        let store = seeded();
        store.restrict_field("node", "field_subtitle", "administer nodes");
        let draft = store
            .create(
                NewEntity::new("node", "Secret")
                    .sub_kind("article")
                    .unpublished()
                    .field("field_subtitle", json!({"value": "hidden"})),
            )
            .unwrap();

        let anonymous = Account::anonymous();
        let editor = Account::new(2).with_permission(PERMISSION_VIEW_UNPUBLISHED);

        let denied = store
            .check_access(AccessTarget::Entity(&draft), AccessOperation::View, &anonymous)
            .await
            .unwrap();
        assert!(!denied.allowed);
        assert!(denied.cacheability.tags.contains("node:1"));
        assert!(denied.cacheability.contexts.contains(CONTEXT_USER_PERMISSIONS));

        let allowed = store
            .check_access(AccessTarget::Entity(&draft), AccessOperation::View, &editor)
            .await
            .unwrap();
        assert!(allowed.allowed);

        let fields = store.describe_fields("node", Some("article")).await.unwrap();
        let subtitle = &fields[1];
        let field_access = store
            .check_access(
                AccessTarget::Field {
                    entity: &draft,
                    field: subtitle,
                },
                AccessOperation::View,
                &editor,
            )
            .await
            .unwrap();
        assert!(!field_access.allowed);

        let latest = store
            .check_access(
                AccessTarget::Entity(&draft),
                AccessOperation::ViewLatestVersion,
                &editor,
            )
            .await
            .unwrap();
        assert!(!latest.allowed);
    }
}
