//! Access checks and cacheability metadata.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::model::FieldDescriptor;
use crate::types::EntityRecord;

/// Permission required to see unpublished content.
pub const PERMISSION_VIEW_UNPUBLISHED: &str = "view any unpublished content";

/// Permission required to see forward drafts.
pub const PERMISSION_VIEW_LATEST_VERSION: &str = "view latest version";

/// Cache context that varies on the requesting account's permissions.
pub const CONTEXT_USER_PERMISSIONS: &str = "user.permissions";

/// The account a request is made on behalf of.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Account id; `0` is anonymous.
    pub id: u64,
    pub permissions: BTreeSet<String>,
}

impl Account {
    /// The anonymous account, without permissions.
    #[must_use]
    pub fn anonymous() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn new(id: u64) -> Self {
        Self {
            id,
            permissions: BTreeSet::new(),
        }
    }

    /// Grants a permission.
    #[must_use]
    pub fn with_permission(mut self, permission: impl Into<String>) -> Self {
        self.permissions.insert(permission.into());
        self
    }

    #[must_use]
    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.contains(permission)
    }

    #[must_use]
    pub fn is_anonymous(&self) -> bool {
        self.id == 0
    }
}

/// Operation being checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessOperation {
    /// Read the entity or field.
    View,
    /// Read a revision newer than the default one.
    ViewLatestVersion,
}

/// What an access check is about.
#[derive(Debug, Clone, Copy)]
pub enum AccessTarget<'a> {
    Entity(&'a EntityRecord),
    Field {
        entity: &'a EntityRecord,
        field: &'a FieldDescriptor,
    },
}

impl AccessTarget<'_> {
    /// The entity the check is about.
    #[must_use]
    pub fn entity(&self) -> &EntityRecord {
        match self {
            Self::Entity(entity) | Self::Field { entity, .. } => entity,
        }
    }
}

/// Cacheability of a computed result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheMetadata {
    /// Invalidation tags (`node:1`).
    pub tags: BTreeSet<String>,
    /// Request dimensions the result varies by (`user.permissions`).
    pub contexts: BTreeSet<String>,
    /// Maximum age in seconds; `None` is permanent.
    pub max_age: Option<u32>,
}

impl CacheMetadata {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    #[must_use]
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.contexts.insert(context.into());
        self
    }

    #[must_use]
    pub fn with_max_age(mut self, seconds: u32) -> Self {
        self.max_age = Some(seconds);
        self
    }

    /// Merges another set of metadata into this one.
    ///
    /// Tags and contexts are unioned; the lower max-age wins.
    pub fn merge(&mut self, other: &CacheMetadata) {
        self.tags.extend(other.tags.iter().cloned());
        self.contexts.extend(other.contexts.iter().cloned());
        self.max_age = match (self.max_age, other.max_age) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty() && self.contexts.is_empty() && self.max_age.is_none()
    }
}

/// Outcome of an access check, with the cacheability of the decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessResult {
    pub allowed: bool,
    pub cacheability: CacheMetadata,
}

impl AccessResult {
    #[must_use]
    pub fn allowed(cacheability: CacheMetadata) -> Self {
        Self {
            allowed: true,
            cacheability,
        }
    }

    #[must_use]
    pub fn forbidden(cacheability: CacheMetadata) -> Self {
        Self {
            allowed: false,
            cacheability,
        }
    }

    /// Allowed or forbidden depending on `condition`.
    #[must_use]
    pub fn allowed_if(condition: bool, cacheability: CacheMetadata) -> Self {
        Self {
            allowed: condition,
            cacheability,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_metadata_merge() {
        let mut a = CacheMetadata::new().with_tag("node:1").with_max_age(600);
        let b = CacheMetadata::new()
            .with_tag("node:2")
            .with_context(CONTEXT_USER_PERMISSIONS)
            .with_max_age(60);

        a.merge(&b);
        assert_eq!(a.tags.len(), 2);
        assert!(a.contexts.contains(CONTEXT_USER_PERMISSIONS));
        assert_eq!(a.max_age, Some(60));

        let mut permanent = CacheMetadata::new();
        permanent.merge(&CacheMetadata::new().with_max_age(30));
        assert_eq!(permanent.max_age, Some(30));
    }

    #[test]
    fn test_account_permissions() {
        let account = Account::new(5).with_permission(PERMISSION_VIEW_LATEST_VERSION);
        assert!(account.has_permission(PERMISSION_VIEW_LATEST_VERSION));
        assert!(!account.has_permission(PERMISSION_VIEW_UNPUBLISHED));
        assert!(!account.is_anonymous());
        assert!(Account::anonymous().is_anonymous());
    }
}
