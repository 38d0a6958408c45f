//! The content store contract.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::access::{Account, AccessOperation, AccessResult, AccessTarget};
use crate::error::StorageError;
use crate::model::{EntityKindDescriptor, FieldDescriptor, ValueDomain};
use crate::types::{EntityId, EntityQuery, EntityRecord, RevisionId, RevisionIndex};

/// The interface every content backend implements.
///
/// A store answers two kinds of questions: what the content model looks like
/// (kinds, fields, value domains) and what the content is (entities,
/// translations, revisions, access). Implementations must be thread-safe.
///
/// # Example
///
/// ```ignore
/// use contentgraph_storage::{ContentStore, StorageError};
///
/// async fn title(store: &dyn ContentStore, id: u64) -> Result<String, StorageError> {
///     store
///         .load_by_id("node", id)
///         .await?
///         .map(|record| record.label)
///         .ok_or_else(|| StorageError::not_found("node", id))
/// }
/// ```
#[async_trait]
pub trait ContentStore: Send + Sync {
    // ==================== Content model ====================

    /// Lists every entity kind known to the store.
    ///
    /// # Errors
    ///
    /// Returns an error only for infrastructure issues.
    async fn list_kinds(&self) -> Result<Vec<EntityKindDescriptor>, StorageError>;

    /// Describes the fields of a kind.
    ///
    /// With `sub_kind = None` only the base fields are returned. With a
    /// sub-kind, the base fields come first, followed by the sub-kind's own
    /// fields.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::UnknownKind` or `StorageError::UnknownSubKind`
    /// for identifiers the store does not know.
    async fn describe_fields(
        &self,
        kind: &str,
        sub_kind: Option<&str>,
    ) -> Result<Vec<FieldDescriptor>, StorageError>;

    /// Lists the fixed value domains enums are synthesized from.
    ///
    /// # Errors
    ///
    /// Returns an error only for infrastructure issues.
    async fn value_domains(&self) -> Result<Vec<ValueDomain>, StorageError>;

    // ==================== Entities ====================

    /// Loads the default revision of an entity in its original language.
    ///
    /// Returns `None` if the entity does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error only for infrastructure issues, not for missing entities.
    async fn load_by_id(
        &self,
        kind: &str,
        id: EntityId,
    ) -> Result<Option<EntityRecord>, StorageError>;

    /// Loads many entities of one kind at once.
    ///
    /// Missing ids are absent from the result. The default implementation
    /// loads one entity at a time; backends should override it with a real
    /// batch read.
    ///
    /// # Errors
    ///
    /// Returns an error only for infrastructure issues.
    async fn load_multiple(
        &self,
        kind: &str,
        ids: &[EntityId],
    ) -> Result<HashMap<EntityId, EntityRecord>, StorageError> {
        let mut loaded = HashMap::with_capacity(ids.len());
        for id in ids {
            if let Some(record) = self.load_by_id(kind, *id).await? {
                loaded.insert(*id, record);
            }
        }
        Ok(loaded)
    }

    /// Loads the same revision of `record` in another language.
    ///
    /// Returns `None` if that revision has no translation for `langcode`.
    ///
    /// # Errors
    ///
    /// Returns an error only for infrastructure issues.
    async fn load_translation(
        &self,
        record: &EntityRecord,
        langcode: &str,
    ) -> Result<Option<EntityRecord>, StorageError>;

    /// Returns the revision bookkeeping of an entity.
    ///
    /// # Errors
    ///
    /// Returns an error only for infrastructure issues.
    async fn revision_index(
        &self,
        kind: &str,
        id: EntityId,
    ) -> Result<Option<RevisionIndex>, StorageError>;

    /// Loads a revision by id.
    ///
    /// With a `langcode`, the translation in that revision is returned; if the
    /// revision has none, the revision's original language is returned
    /// instead. Returns `None` if no revision with that id exists for the kind.
    ///
    /// # Errors
    ///
    /// Returns an error only for infrastructure issues.
    async fn load_revision(
        &self,
        kind: &str,
        revision_id: RevisionId,
        langcode: Option<&str>,
    ) -> Result<Option<EntityRecord>, StorageError>;

    /// Lists entities of one kind.
    ///
    /// Results are not access-filtered; callers apply access checks
    /// themselves.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::UnknownKind` for unknown kinds.
    async fn query_by_kind(
        &self,
        kind: &str,
        query: &EntityQuery,
    ) -> Result<Vec<EntityRecord>, StorageError>;

    // ==================== Access ====================

    /// Checks whether `account` may perform `operation` on `target`.
    ///
    /// The result carries the cacheability of the decision, which callers
    /// must fold into the response's cache metadata.
    ///
    /// # Errors
    ///
    /// Returns an error only for infrastructure issues.
    async fn check_access(
        &self,
        target: AccessTarget<'_>,
        operation: AccessOperation,
        account: &Account,
    ) -> Result<AccessResult, StorageError>;

    /// Returns a human-readable name for the backend.
    fn backend_name(&self) -> &'static str {
        "unknown"
    }
}
