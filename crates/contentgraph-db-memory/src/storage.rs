use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use contentgraph_storage::{
    EntityId, EntityKindDescriptor, EntityRecord, FieldDescriptor, RevisionId, RevisionIndex,
    StorageError, ValueDomain,
};
use papaya::HashMap as PapayaHashMap;
use tracing::debug;

use crate::entity::{NewEntity, TranslationData};

pub type EntityKey = (String, EntityId);
pub type RevisionKey = (String, RevisionId);

/// Entity-level bookkeeping; content lives in revisions.
#[derive(Debug, Clone)]
pub(crate) struct StoredEntity {
    pub(crate) kind: String,
    pub(crate) id: EntityId,
    pub(crate) sub_kind: String,
    pub(crate) default_langcode: String,
    pub(crate) created: i64,
    pub(crate) default_revision: RevisionId,
    pub(crate) latest_revision: RevisionId,
}

/// One revision: every translation as it stood when the revision was saved.
#[derive(Debug, Clone)]
pub(crate) struct StoredRevision {
    pub(crate) entity_id: EntityId,
    pub(crate) translations: BTreeMap<String, TranslationData>,
    /// Languages changed by this revision.
    pub(crate) affected: Vec<String>,
}

/// In-memory content store using papaya lock-free HashMaps.
///
/// Every save creates a new revision. A revision is either a default
/// revision (it becomes the published state) or a forward draft that only
/// moves the latest-revision pointer.
#[derive(Debug)]
pub struct InMemoryStore {
    pub(crate) kinds: Arc<PapayaHashMap<String, EntityKindDescriptor>>,
    /// Sub-kind fields keyed by `(kind, sub_kind)`.
    pub(crate) bundle_fields: Arc<PapayaHashMap<(String, String), Vec<FieldDescriptor>>>,
    pub(crate) domains: Arc<PapayaHashMap<String, ValueDomain>>,
    /// Permission required to view a field, keyed by `(kind, machine_name)`.
    pub(crate) field_permissions: Arc<PapayaHashMap<(String, String), String>>,
    pub(crate) entities: Arc<PapayaHashMap<EntityKey, StoredEntity>>,
    pub(crate) revisions: Arc<PapayaHashMap<RevisionKey, StoredRevision>>,
    id_counter: AtomicU64,
    revision_counter: AtomicU64,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self {
            kinds: Arc::new(PapayaHashMap::new()),
            bundle_fields: Arc::new(PapayaHashMap::new()),
            domains: Arc::new(PapayaHashMap::new()),
            field_permissions: Arc::new(PapayaHashMap::new()),
            entities: Arc::new(PapayaHashMap::new()),
            revisions: Arc::new(PapayaHashMap::new()),
            id_counter: AtomicU64::new(1),
            revision_counter: AtomicU64::new(1),
        }
    }

    fn next_id(&self) -> EntityId {
        self.id_counter.fetch_add(1, Ordering::SeqCst)
    }

    fn next_revision(&self) -> RevisionId {
        self.revision_counter.fetch_add(1, Ordering::SeqCst)
    }

    // ==================== Content model ====================

    /// Registers (or replaces) an entity kind.
    pub fn register_kind(&self, kind: EntityKindDescriptor) {
        debug!(kind = %kind.id, sub_kinds = kind.sub_kinds.len(), "Registering entity kind");
        self.kinds.pin().insert(kind.id.clone(), kind);
    }

    /// Registers the fields of one sub-kind.
    ///
    /// # Errors
    ///
    /// Returns an error if the kind or sub-kind is unknown.
    pub fn register_fields(
        &self,
        kind: &str,
        sub_kind: &str,
        fields: Vec<FieldDescriptor>,
    ) -> Result<(), StorageError> {
        let descriptor = self.kind(kind)?;
        if descriptor.sub_kind(sub_kind).is_none() {
            return Err(StorageError::unknown_sub_kind(kind, sub_kind));
        }
        self.bundle_fields
            .pin()
            .insert((kind.to_string(), sub_kind.to_string()), fields);
        Ok(())
    }

    /// Registers (or replaces) a value domain.
    pub fn register_domain(&self, domain: ValueDomain) {
        self.domains.pin().insert(domain.name.clone(), domain);
    }

    /// Requires `permission` to view a field of a kind.
    pub fn restrict_field(&self, kind: &str, machine_name: &str, permission: impl Into<String>) {
        self.field_permissions.pin().insert(
            (kind.to_string(), machine_name.to_string()),
            permission.into(),
        );
    }

    pub(crate) fn kind(&self, kind: &str) -> Result<EntityKindDescriptor, StorageError> {
        self.kinds
            .pin()
            .get(kind)
            .cloned()
            .ok_or_else(|| StorageError::unknown_kind(kind))
    }

    // ==================== Content ====================

    /// Creates an entity with its first revision and returns it.
    ///
    /// # Errors
    ///
    /// Returns an error if the kind or sub-kind is unknown.
    pub fn create(&self, entity: NewEntity) -> Result<EntityRecord, StorageError> {
        let descriptor = self.kind(&entity.kind)?;
        let sub_kind = match (&entity.sub_kind, descriptor.has_sub_kinds()) {
            (Some(sub_kind), true) if descriptor.sub_kind(sub_kind).is_some() => sub_kind.clone(),
            (Some(sub_kind), _) => {
                return Err(StorageError::unknown_sub_kind(&entity.kind, sub_kind));
            }
            (None, true) => {
                return Err(StorageError::invalid_content(format!(
                    "Entity kind '{}' requires a sub-kind",
                    entity.kind
                )));
            }
            (None, false) => entity.kind.clone(),
        };

        let id = self.next_id();
        let revision_id = self.next_revision();
        let mut content = entity.content;
        if content.changed == 0 {
            content.changed = entity.created;
        }

        let stored = StoredEntity {
            kind: entity.kind.clone(),
            id,
            sub_kind,
            default_langcode: entity.langcode.clone(),
            created: entity.created,
            default_revision: revision_id,
            latest_revision: revision_id,
        };
        let revision = StoredRevision {
            entity_id: id,
            translations: BTreeMap::from([(entity.langcode.clone(), content)]),
            affected: vec![entity.langcode.clone()],
        };

        self.revisions
            .pin()
            .insert((entity.kind.clone(), revision_id), revision.clone());
        self.entities
            .pin()
            .insert((entity.kind.clone(), id), stored.clone());

        debug!(kind = %entity.kind, id, revision_id, "Created entity");
        Ok(self.to_record(&stored, revision_id, &revision, &entity.langcode))
    }

    /// Adds or replaces a translation in a new default revision.
    ///
    /// # Errors
    ///
    /// Returns an error if the entity does not exist.
    pub fn add_translation(
        &self,
        kind: &str,
        id: EntityId,
        langcode: &str,
        content: TranslationData,
    ) -> Result<EntityRecord, StorageError> {
        self.save_revision(kind, id, langcode, content, true)
    }

    /// Saves a forward draft of one translation. The default revision is
    /// left untouched.
    ///
    /// # Errors
    ///
    /// Returns an error if the entity or translation does not exist.
    pub fn save_draft(
        &self,
        kind: &str,
        id: EntityId,
        langcode: &str,
        content: TranslationData,
    ) -> Result<EntityRecord, StorageError> {
        self.save_revision(kind, id, langcode, content, false)
    }

    /// Saves a new revision built from the latest one with `langcode` replaced.
    ///
    /// # Errors
    ///
    /// Returns an error if the entity does not exist.
    pub fn save_revision(
        &self,
        kind: &str,
        id: EntityId,
        langcode: &str,
        content: TranslationData,
        default: bool,
    ) -> Result<EntityRecord, StorageError> {
        let key = (kind.to_string(), id);
        let mut stored = self
            .entities
            .pin()
            .get(&key)
            .cloned()
            .ok_or_else(|| StorageError::not_found(kind, id))?;

        let mut translations = self
            .revisions
            .pin()
            .get(&(kind.to_string(), stored.latest_revision))
            .map(|r| r.translations.clone())
            .ok_or_else(|| StorageError::internal(format!("Missing revision for {kind}/{id}")))?;
        translations.insert(langcode.to_string(), content);

        let revision_id = self.next_revision();
        let revision = StoredRevision {
            entity_id: id,
            translations,
            affected: vec![langcode.to_string()],
        };

        stored.latest_revision = revision_id;
        if default {
            stored.default_revision = revision_id;
        }

        self.revisions
            .pin()
            .insert((kind.to_string(), revision_id), revision.clone());
        self.entities.pin().insert(key, stored.clone());

        debug!(kind, id, revision_id, default, langcode, "Saved revision");
        Ok(self.to_record(&stored, revision_id, &revision, langcode))
    }

    /// Builds the record for one language of one revision.
    pub(crate) fn to_record(
        &self,
        entity: &StoredEntity,
        revision_id: RevisionId,
        revision: &StoredRevision,
        langcode: &str,
    ) -> EntityRecord {
        let (langcode, content) = match revision.translations.get(langcode) {
            Some(content) => (langcode.to_string(), content.clone()),
            None => {
                let fallback = revision
                    .translations
                    .get(&entity.default_langcode)
                    .cloned()
                    .unwrap_or_else(|| TranslationData::new(String::new()));
                (entity.default_langcode.clone(), fallback)
            }
        };

        EntityRecord {
            kind: entity.kind.clone(),
            id: entity.id,
            sub_kind: entity.sub_kind.clone(),
            revision_id,
            default_revision: revision_id == entity.default_revision,
            langcode,
            default_langcode: entity.default_langcode.clone(),
            translations: revision.translations.keys().cloned().collect(),
            label: content.label,
            description: content.description,
            path: content.path,
            published: content.published,
            created: entity.created,
            changed: content.changed,
            fields: content.fields,
        }
    }

    /// Computes the revision index of one entity.
    pub(crate) fn index_for(&self, entity: &StoredEntity) -> RevisionIndex {
        let mut index = RevisionIndex {
            default_revision: entity.default_revision,
            latest_revision: entity.latest_revision,
            ..Default::default()
        };

        let guard = self.revisions.pin();
        for ((kind, revision_id), revision) in guard.iter() {
            if kind != &entity.kind || revision.entity_id != entity.id {
                continue;
            }
            for langcode in &revision.affected {
                let latest = index
                    .latest_by_language
                    .entry(langcode.clone())
                    .or_insert(*revision_id);
                *latest = (*latest).max(*revision_id);
            }
        }
        index
    }

    /// Returns the number of entities stored.
    pub fn len(&self) -> usize {
        self.entities.pin().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contentgraph_storage::EntityKindDescriptor;

    fn store() -> InMemoryStore {
        let store = InMemoryStore::new();
        store.register_kind(
            EntityKindDescriptor::new("node", "Content").with_sub_kind("article", "Article"),
        );
        store.register_kind(EntityKindDescriptor::new("user", "User"));
        store
    }

    #[test]
    fn test_create_assigns_sub_kind() {
        let store = store();
        let user = store.create(NewEntity::new("user", "admin")).unwrap();
        assert_eq!(user.sub_kind, "user");
        assert!(user.default_revision);

        let err = store.create(NewEntity::new("node", "No bundle")).unwrap_err();
        assert!(err.to_string().contains("requires a sub-kind"));

        let err = store
            .create(NewEntity::new("node", "Bad").sub_kind("recipe"))
            .unwrap_err();
        assert!(matches!(err, StorageError::UnknownSubKind { .. }));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_revision_index_tracks_languages() {
        let store = store();
        let node = store
            .create(NewEntity::new("node", "Hello").sub_kind("article"))
            .unwrap();
        let ja = store
            .add_translation("node", node.id, "ja", TranslationData::new("Konnichiwa"))
            .unwrap();
        let draft = store
            .save_draft("node", node.id, "en", TranslationData::new("Hello v2").unpublished())
            .unwrap();

        let stored = store
            .entities
            .pin()
            .get(&("node".to_string(), node.id))
            .cloned()
            .unwrap();
        let index = store.index_for(&stored);

        assert_eq!(index.default_revision, ja.revision_id);
        assert_eq!(index.latest_revision, draft.revision_id);
        assert_eq!(index.latest_by_language["ja"], ja.revision_id);
        assert_eq!(index.latest_by_language["en"], draft.revision_id);
        assert!(!draft.default_revision);
        assert_eq!(draft.translations, vec!["en".to_string(), "ja".to_string()]);
    }
}
