//! Cursor-based connections over entity kinds.
//!
//! Connections follow the Relay shape: `edges { cursor node }`, `nodes`,
//! `pageInfo` and `total`. Entities are ordered by `(sort value, id)`, which
//! is a total order, so cursors stay stable between requests. A cursor
//! encodes that pair; decoding it gives back a position that can be located
//! with a binary search instead of a re-scan.
//!
//! ```text
//! cursor = base64url(json {"k": <sort key>, "v": <sort value>, "id": <entity id>})
//! ```
//!
//! The page-size bound is read from the live site settings on every call, so
//! a lowered maximum applies to the next query without a schema rebuild.

use std::cmp::Ordering;
use std::sync::Arc;

use async_graphql::QueryPathNode;
use async_graphql::dynamic::ObjectAccessor;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use contentgraph_storage::{EntityQuery, EntityRecord, SortDirection, SortKey, SortValue};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::context::ResolutionContext;
use crate::error::GraphQLError;
use crate::resolvers::TargetShape;
use crate::resolvers::access::EntityAccess;
use crate::resolvers::language::LanguageNegotiator;
use crate::schema::naming;
use crate::types::SchemaIndex;

/// Decoded connection cursor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CursorData {
    /// Sort key the cursor was issued for.
    pub k: String,
    /// Sort value of the edge.
    pub v: SortValue,
    /// Entity id of the edge.
    pub id: u64,
}

impl CursorData {
    /// Cursor naming `record`'s position under `key`.
    #[must_use]
    pub fn for_record(record: &EntityRecord, key: SortKey) -> Self {
        Self {
            k: key.as_str().to_string(),
            v: record.sort_value(key),
            id: record.id,
        }
    }

    /// Encodes to the opaque wire form.
    #[must_use]
    pub fn encode(&self) -> String {
        // Serializing a struct of strings and integers cannot fail
        let json = serde_json::to_vec(self).unwrap_or_default();
        URL_SAFE_NO_PAD.encode(json)
    }

    /// Decodes a cursor.
    ///
    /// # Errors
    ///
    /// Returns `GraphQLError::InvalidCursor` for malformed input.
    pub fn decode(cursor: &str) -> Result<Self, GraphQLError> {
        let bytes = URL_SAFE_NO_PAD
            .decode(cursor)
            .map_err(|_| GraphQLError::InvalidCursor("not base64url".into()))?;
        serde_json::from_slice(&bytes)
            .map_err(|_| GraphQLError::InvalidCursor("unrecognized payload".into()))
    }

    fn position(&self) -> (&SortValue, u64) {
        (&self.v, self.id)
    }
}

/// Page size requested by a connection call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageRequest {
    /// The first `n` entities of the window.
    First(usize),
    /// The last `n` entities of the window.
    Last(usize),
}

/// Arguments of a connection field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionArgs {
    pub first: Option<i64>,
    pub after: Option<String>,
    pub last: Option<i64>,
    pub before: Option<String>,
    pub reverse: bool,
    pub sort_key: Option<SortKey>,
    pub langcode: Option<String>,
}

impl ConnectionArgs {
    /// Reads connection arguments from a field's arguments.
    ///
    /// # Errors
    ///
    /// Returns a validation error for an unknown sort key.
    pub fn from_args(args: &ObjectAccessor<'_>) -> Result<Self, GraphQLError> {
        let int = |name: &str| {
            args.get(name)
                .filter(|v| !v.is_null())
                .and_then(|v| v.i64().ok())
        };
        let string = |name: &str| {
            args.get(name)
                .filter(|v| !v.is_null())
                .and_then(|v| v.string().ok().map(str::to_string))
        };

        let sort_key = match args.get("sortKey").filter(|v| !v.is_null()) {
            Some(value) => {
                let name = value
                    .enum_name()
                    .map_err(|e| GraphQLError::Validation(e.message))?;
                Some(
                    naming::decode_enum_value(name)
                        .parse::<SortKey>()
                        .map_err(GraphQLError::Validation)?,
                )
            }
            None => None,
        };

        Ok(Self {
            first: int("first"),
            after: string("after"),
            last: int("last"),
            before: string("before"),
            reverse: args
                .get("reverse")
                .and_then(|v| v.boolean().ok())
                .unwrap_or(false),
            sort_key,
            langcode: string("langcode").filter(|l| !l.is_empty()),
        })
    }

    /// Validates `first`/`last` against `max_page_size`.
    ///
    /// Without either, the first `max_page_size` entities are returned.
    ///
    /// # Errors
    ///
    /// Returns an error if both are given, if one is negative, or if one
    /// exceeds `max_page_size`.
    pub fn page(&self, max_page_size: usize) -> Result<PageRequest, GraphQLError> {
        let check = |argument: &'static str, value: i64| -> Result<usize, GraphQLError> {
            if value < 0 {
                return Err(GraphQLError::Validation(format!(
                    "Argument \"{argument}\" must not be negative"
                )));
            }
            let size = usize::try_from(value).unwrap_or(usize::MAX);
            if size > max_page_size {
                return Err(GraphQLError::PageSizeExceeded {
                    argument,
                    requested: value,
                    max: max_page_size,
                });
            }
            Ok(size)
        };

        match (self.first, self.last) {
            (Some(_), Some(_)) => Err(GraphQLError::MutuallyExclusive {
                first: "first",
                second: "last",
            }),
            (Some(first), None) => check("first", first).map(PageRequest::First),
            (None, Some(last)) => check("last", last).map(PageRequest::Last),
            (None, None) => Ok(PageRequest::First(max_page_size)),
        }
    }
}

/// One edge of a resolved connection.
#[derive(Debug, Clone)]
pub struct EdgeValue {
    pub cursor: String,
    pub node: Arc<EntityRecord>,
    pub target: TargetShape,
}

/// Page info of a resolved connection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageInfoValue {
    pub has_next_page: bool,
    pub has_previous_page: bool,
    pub start_cursor: Option<String>,
    pub end_cursor: Option<String>,
}

/// A resolved connection, as the parent of a `*Connection` type.
#[derive(Debug, Clone)]
pub struct ConnectionValue {
    pub edges: Vec<EdgeValue>,
    pub page_info: PageInfoValue,
    /// Accessible entities across all pages.
    pub total: usize,
}

/// Executes connection queries.
pub struct ConnectionEngine;

impl ConnectionEngine {
    /// Resolves one page of a connection over `kind`.
    ///
    /// `sub_kinds` restricts the listing; empty lists every exposed
    /// sub-kind. Entities without an exposed type, or failing the view
    /// check in the language they are returned in, are excluded and do not
    /// count towards `total`.
    ///
    /// # Errors
    ///
    /// Returns validation, cursor or storage errors.
    pub async fn query(
        ctx: &ResolutionContext,
        node: Option<&QueryPathNode<'_>>,
        index: &SchemaIndex,
        kind: &str,
        sub_kinds: &[String],
        target: &TargetShape,
        args: &ConnectionArgs,
    ) -> Result<ConnectionValue, GraphQLError> {
        let max_page_size = ctx.settings.current().max_page_size;
        let page = args.page(max_page_size)?;
        let sort_key = args.sort_key.unwrap_or_default();

        let after = args
            .after
            .as_deref()
            .map(|c| Self::decode_for(c, sort_key))
            .transpose()?;
        let before = args
            .before
            .as_deref()
            .map(|c| Self::decode_for(c, sort_key))
            .transpose()?;

        if let Some(langcode) = &args.langcode {
            LanguageNegotiator::narrow(ctx, node, langcode);
        }
        let language = LanguageNegotiator::current_language(ctx, node);

        let direction = if args.reverse {
            SortDirection::Descending
        } else {
            SortDirection::Ascending
        };
        let mut query = EntityQuery::new()
            .with_sub_kinds(sub_kinds.to_vec())
            .with_sort(sort_key, direction);
        query = match &args.langcode {
            Some(langcode) => query.with_langcode(langcode.clone()),
            None => query.with_preferred_langcode(language.clone()),
        };

        let candidates = ctx.store.query_by_kind(kind, &query).await?;
        ctx.add_cache_tag(format!("{kind}_list"));
        trace!(kind, candidates = candidates.len(), "Connection candidates loaded");

        let mut items = Vec::with_capacity(candidates.len());
        for record in candidates {
            // Only stores that ignore the preferred language reach the store here
            let record = if args.langcode.is_some() {
                Arc::new(record)
            } else {
                LanguageNegotiator::translate_to(ctx, Arc::new(record), &language).await?
            };
            if index.concrete_type(&record).is_none() {
                continue;
            }
            if !EntityAccess::can_view(ctx, &record).await? {
                continue;
            }
            items.push((record.sort_value(sort_key), record));
        }

        let compare = |a: (&SortValue, u64), b: (&SortValue, u64)| -> Ordering {
            let ordering = a.0.cmp(b.0).then(a.1.cmp(&b.1));
            if args.reverse {
                ordering.reverse()
            } else {
                ordering
            }
        };
        // Stable sort; input already in store order is a single run
        items.sort_by(|(av, a), (bv, b)| compare((av, a.id), (bv, b.id)));

        let total = items.len();
        let window_start = after.as_ref().map_or(0, |c| {
            items.partition_point(|(v, r)| compare((v, r.id), c.position()) != Ordering::Greater)
        });
        let window_end = before
            .as_ref()
            .map_or(total, |c| {
                items.partition_point(|(v, r)| compare((v, r.id), c.position()) == Ordering::Less)
            })
            .max(window_start);

        let (start, end) = match page {
            PageRequest::First(n) => (window_start, window_end.min(window_start + n)),
            PageRequest::Last(n) => (window_end.saturating_sub(n).max(window_start), window_end),
        };

        let edges: Vec<EdgeValue> = items[start..end]
            .iter()
            .map(|(_, record)| {
                ctx.add_cache_tag(record.cache_tag());
                EdgeValue {
                    cursor: CursorData::for_record(record, sort_key).encode(),
                    node: record.clone(),
                    target: target.clone(),
                }
            })
            .collect();

        let page_info = PageInfoValue {
            has_next_page: end < total,
            has_previous_page: start > 0,
            start_cursor: edges.first().map(|e| e.cursor.clone()),
            end_cursor: edges.last().map(|e| e.cursor.clone()),
        };

        debug!(
            kind,
            total,
            returned = edges.len(),
            sort_key = %sort_key,
            reverse = args.reverse,
            "Connection resolved"
        );

        Ok(ConnectionValue {
            edges,
            page_info,
            total,
        })
    }

    fn decode_for(cursor: &str, sort_key: SortKey) -> Result<CursorData, GraphQLError> {
        let data = CursorData::decode(cursor)?;
        if data.k != sort_key.as_str() {
            return Err(GraphQLError::InvalidCursor(format!(
                "cursor was issued for sort key \"{}\", not \"{sort_key}\"",
                data.k
            )));
        }
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(first: Option<i64>, last: Option<i64>) -> ConnectionArgs {
        ConnectionArgs {
            first,
            last,
            ..Default::default()
        }
    }

    #[test]
    fn test_page_defaults_to_max() {
        assert_eq!(args(None, None).page(100).unwrap(), PageRequest::First(100));
    }

    #[test]
    fn test_page_limit_enforced() {
        let err = args(Some(500), None).page(100).unwrap_err();
        assert_eq!(err.error_code(), "PAGE_SIZE_EXCEEDED");
        assert!(err.to_string().contains("100"));

        let err = args(None, Some(11)).page(10).unwrap_err();
        assert!(err.to_string().contains("10"));
        assert!(err.to_string().contains("\"last\""));

        assert_eq!(args(Some(10), None).page(10).unwrap(), PageRequest::First(10));
    }

    #[test]
    fn test_page_rejects_invalid_combinations() {
        let err = args(Some(1), Some(1)).page(100).unwrap_err();
        assert!(matches!(err, GraphQLError::MutuallyExclusive { .. }));

        let err = args(Some(-1), None).page(100).unwrap_err();
        assert_eq!(err.error_code(), "VALIDATION_ERROR");
    }

    #[test]
    fn test_cursor_roundtrip() {
        let cursor = CursorData {
            k: "title".into(),
            v: SortValue::Text("Hello, world".into()),
            id: 42,
        };
        let encoded = cursor.encode();
        assert!(!encoded.contains('='));
        assert_eq!(CursorData::decode(&encoded).unwrap(), cursor);
    }

    #[test]
    fn test_cursor_rejects_garbage() {
        assert!(matches!(
            CursorData::decode("%%%"),
            Err(GraphQLError::InvalidCursor(_))
        ));
        let not_json = URL_SAFE_NO_PAD.encode(b"plain");
        assert!(CursorData::decode(&not_json).is_err());
    }

    #[test]
    fn test_cursor_sort_key_mismatch() {
        let cursor = CursorData {
            k: "created".into(),
            v: SortValue::Int(10),
            id: 1,
        }
        .encode();

        assert!(ConnectionEngine::decode_for(&cursor, SortKey::Created).is_ok());
        let err = ConnectionEngine::decode_for(&cursor, SortKey::Title).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_CURSOR");
    }
}
