//! Entity data types shared between stores and the query layer.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Entity identifier, unique within a kind.
pub type EntityId = u64;

/// Revision identifier, unique within a kind.
pub type RevisionId = u64;

/// One entity, in one language, at one revision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityRecord {
    pub kind: String,
    pub id: EntityId,
    /// Sub-kind; equals `kind` for kinds without sub-kinds.
    pub sub_kind: String,
    pub revision_id: RevisionId,
    /// Whether this is the default (published) revision.
    pub default_revision: bool,
    /// Language of this record.
    pub langcode: String,
    /// Language the entity was created in.
    pub default_langcode: String,
    /// All languages the entity is available in, including the default.
    pub translations: Vec<String>,
    pub label: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Canonical path without language prefix (`/news/launch`).
    #[serde(default)]
    pub path: Option<String>,
    pub published: bool,
    pub created: i64,
    pub changed: i64,
    /// Field items keyed by field machine name.
    #[serde(default)]
    pub fields: IndexMap<String, Vec<Value>>,
}

impl EntityRecord {
    /// Returns the cache tag identifying this entity (`node:1`).
    #[must_use]
    pub fn cache_tag(&self) -> String {
        format!("{}:{}", self.kind, self.id)
    }

    /// Returns the items stored for a field; empty if the field has no value.
    #[must_use]
    pub fn field_items(&self, machine_name: &str) -> &[Value] {
        self.fields
            .get(machine_name)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Returns `true` if the entity exists in the given language.
    #[must_use]
    pub fn has_translation(&self, langcode: &str) -> bool {
        self.translations.iter().any(|l| l == langcode)
    }

    /// Returns `true` if this record is the entity's original language.
    #[must_use]
    pub fn is_default_translation(&self) -> bool {
        self.langcode == self.default_langcode
    }

    /// Returns the value this record sorts by for the given key.
    #[must_use]
    pub fn sort_value(&self, key: SortKey) -> SortValue {
        match key {
            SortKey::Created => SortValue::Int(self.created),
            SortKey::Changed => SortValue::Int(self.changed),
            SortKey::Title => SortValue::Text(self.label.clone()),
            SortKey::Id => SortValue::Int(self.id as i64),
        }
    }
}

/// Revision bookkeeping for one entity.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RevisionIndex {
    /// The default (published) revision.
    pub default_revision: RevisionId,
    /// The newest revision, possibly a draft.
    pub latest_revision: RevisionId,
    /// Newest revision that touched each language.
    #[serde(default)]
    pub latest_by_language: BTreeMap<String, RevisionId>,
}

impl RevisionIndex {
    /// Returns `true` if a draft newer than the default revision exists.
    #[must_use]
    pub fn has_pending_draft(&self) -> bool {
        self.latest_revision > self.default_revision
    }
}

/// Which revision of an entity to load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RevisionSelector {
    /// The default (published) revision.
    #[default]
    Current,
    /// The newest revision, possibly an unpublished draft.
    Latest,
    /// A specific revision id.
    Explicit(RevisionId),
}

impl FromStr for RevisionSelector {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "" | "current" => Ok(Self::Current),
            "latest" => Ok(Self::Latest),
            other => other
                .parse::<RevisionId>()
                .map(Self::Explicit)
                .map_err(|_| format!("Invalid revision selector: {other}")),
        }
    }
}

impl fmt::Display for RevisionSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Current => write!(f, "current"),
            Self::Latest => write!(f, "latest"),
            Self::Explicit(id) => write!(f, "{id}"),
        }
    }
}

/// Keys connections can be sorted by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    #[default]
    Created,
    Changed,
    Title,
    Id,
}

impl SortKey {
    /// All sort keys, in declaration order.
    pub const ALL: [SortKey; 4] = [Self::Created, Self::Changed, Self::Title, Self::Id];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Changed => "changed",
            Self::Title => "title",
            Self::Id => "id",
        }
    }
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| format!("Unknown sort key: {s}"))
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A comparable sort value. Integers order before text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SortValue {
    Int(i64),
    Text(String),
}

/// Direction of a store-side sort.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortDirection {
    /// Applies this direction to an ascending ordering.
    #[must_use]
    pub fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            Self::Ascending => ordering,
            Self::Descending => ordering.reverse(),
        }
    }
}

/// Listing query against one entity kind.
///
/// Stores do not apply access checks to query results.
#[derive(Debug, Clone, Default)]
pub struct EntityQuery {
    /// Restrict to these sub-kinds; empty means all.
    pub sub_kinds: Vec<String>,
    /// Only entities available in this language, returned as that translation.
    pub langcode: Option<String>,
    /// Entities translated into this language are returned as that
    /// translation; the rest in their default language. Ignored when
    /// `langcode` is set.
    pub preferred_langcode: Option<String>,
    pub sort: Option<(SortKey, SortDirection)>,
    pub offset: usize,
    pub limit: Option<usize>,
}

impl EntityQuery {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_sub_kinds(mut self, sub_kinds: Vec<String>) -> Self {
        self.sub_kinds = sub_kinds;
        self
    }

    #[must_use]
    pub fn with_langcode(mut self, langcode: impl Into<String>) -> Self {
        self.langcode = Some(langcode.into());
        self
    }

    #[must_use]
    pub fn with_preferred_langcode(mut self, langcode: impl Into<String>) -> Self {
        self.preferred_langcode = Some(langcode.into());
        self
    }

    #[must_use]
    pub fn with_sort(mut self, key: SortKey, direction: SortDirection) -> Self {
        self.sort = Some((key, direction));
        self
    }

    #[must_use]
    pub fn with_limit(mut self, offset: usize, limit: usize) -> Self {
        self.offset = offset;
        self.limit = Some(limit);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_revision_selector_parse() {
        assert_eq!(
            "current".parse::<RevisionSelector>().unwrap(),
            RevisionSelector::Current
        );
        assert_eq!(
            "latest".parse::<RevisionSelector>().unwrap(),
            RevisionSelector::Latest
        );
        assert_eq!(
            "42".parse::<RevisionSelector>().unwrap(),
            RevisionSelector::Explicit(42)
        );
        assert!("draft".parse::<RevisionSelector>().is_err());
        assert_eq!(RevisionSelector::Explicit(7).to_string(), "7");
    }

    #[test]
    fn test_sort_key_roundtrip() {
        for key in SortKey::ALL {
            assert_eq!(key.as_str().parse::<SortKey>().unwrap(), key);
        }
        assert!("weight".parse::<SortKey>().is_err());
    }

    #[test]
    fn test_sort_value_ordering() {
        assert!(SortValue::Int(1) < SortValue::Int(2));
        assert!(SortValue::Text("a".into()) < SortValue::Text("b".into()));
        assert!(SortValue::Int(i64::MAX) < SortValue::Text(String::new()));
    }

    #[test]
    fn test_sort_direction_apply() {
        assert_eq!(
            SortDirection::Descending.apply(Ordering::Less),
            Ordering::Greater
        );
        assert_eq!(SortDirection::Ascending.apply(Ordering::Less), Ordering::Less);
    }

    #[test]
    fn test_pending_draft() {
        let index = RevisionIndex {
            default_revision: 3,
            latest_revision: 5,
            ..Default::default()
        };
        assert!(index.has_pending_draft());
    }
}
