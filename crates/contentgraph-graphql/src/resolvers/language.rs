//! Per-subtree language negotiation.
//!
//! The request carries a language, but a field that returns a specific
//! translation narrows the language for everything resolved beneath it. The
//! narrowed language is recorded on the [`ResolutionContext`] keyed by the
//! response path, and lookups walk from a field up to the root.

use std::fmt::Write;
use std::sync::Arc;

use async_graphql::{QueryPathNode, QueryPathSegment};
use contentgraph_storage::EntityRecord;
use tracing::trace;

use crate::context::ResolutionContext;
use crate::error::GraphQLError;

/// Resolves the current language of a field and applies translation
/// substitution.
pub struct LanguageNegotiator;

impl LanguageNegotiator {
    /// Renders a response path as `a.b.0.c`.
    #[must_use]
    pub fn path_key(node: &QueryPathNode<'_>) -> String {
        let mut segments = Vec::new();
        let mut current = Some(node);
        while let Some(n) = current {
            segments.push(&n.segment);
            current = n.parent;
        }

        let mut key = String::new();
        for (i, segment) in segments.iter().rev().enumerate() {
            if i > 0 {
                key.push('.');
            }
            match segment {
                QueryPathSegment::Index(index) => {
                    let _ = write!(key, "{index}");
                }
                QueryPathSegment::Name(name) => key.push_str(name),
            }
        }
        key
    }

    /// Returns the language in effect at `node`.
    ///
    /// The nearest override on the path wins; otherwise the request language.
    #[must_use]
    pub fn current_language(ctx: &ResolutionContext, node: Option<&QueryPathNode<'_>>) -> String {
        let mut current = node;
        while let Some(n) = current {
            if let Some(langcode) = ctx.language_override(&Self::path_key(n)) {
                return langcode;
            }
            current = n.parent;
        }
        ctx.language().to_string()
    }

    /// Narrows the language for the subtree rooted at `node`.
    pub fn narrow(ctx: &ResolutionContext, node: Option<&QueryPathNode<'_>>, langcode: &str) {
        if let Some(node) = node {
            let key = Self::path_key(node);
            trace!(path = %key, langcode, "Narrowing language");
            ctx.set_language_override(key, langcode);
        }
    }

    /// Narrows the language for element `index` of the list at `node`.
    pub fn narrow_element(
        ctx: &ResolutionContext,
        node: Option<&QueryPathNode<'_>>,
        index: usize,
        langcode: &str,
    ) {
        if let Some(node) = node {
            let key = format!("{}.{index}", Self::path_key(node));
            trace!(path = %key, langcode, "Narrowing element language");
            ctx.set_language_override(key, langcode);
        }
    }

    /// Substitutes the translation in the current language, if the entity
    /// has one, and records the returned record's language for its subtree.
    ///
    /// Must run before access checks so they see the record actually returned.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub async fn translate(
        ctx: &ResolutionContext,
        node: Option<&QueryPathNode<'_>>,
        record: Arc<EntityRecord>,
    ) -> Result<Arc<EntityRecord>, GraphQLError> {
        let langcode = Self::current_language(ctx, node);
        let record = Self::translate_to(ctx, record, &langcode).await?;
        if record.langcode != langcode {
            Self::narrow(ctx, node, &record.langcode);
        }
        Ok(record)
    }

    /// Substitutes the translation in `langcode` without touching overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub async fn translate_to(
        ctx: &ResolutionContext,
        record: Arc<EntityRecord>,
        langcode: &str,
    ) -> Result<Arc<EntityRecord>, GraphQLError> {
        if record.langcode == langcode || !record.has_translation(langcode) {
            return Ok(record);
        }

        match ctx.store.load_translation(&record, langcode).await? {
            Some(translation) => {
                trace!(
                    entity = %record.cache_tag(),
                    langcode,
                    "Substituted translation"
                );
                Ok(Arc::new(translation))
            }
            None => Ok(record),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contentgraph_db_memory::create_content_store;

    fn context(language: &str) -> ResolutionContext {
        ResolutionContext::builder()
            .with_store(create_content_store())
            .with_language(language)
            .with_request_id("req-lang")
            .build()
            .unwrap()
    }

    #[test]
    fn test_path_key() {
        let root = QueryPathNode {
            parent: None,
            segment: QueryPathSegment::Name("nodeItems"),
        };
        let nodes = QueryPathNode {
            parent: Some(&root),
            segment: QueryPathSegment::Name("nodes"),
        };
        let first = QueryPathNode {
            parent: Some(&nodes),
            segment: QueryPathSegment::Index(0),
        };
        assert_eq!(LanguageNegotiator::path_key(&first), "nodeItems.nodes.0");
    }

    #[test]
    fn test_current_language_walks_up() {
        let ctx = context("en");
        let root = QueryPathNode {
            parent: None,
            segment: QueryPathSegment::Name("article"),
        };
        let child = QueryPathNode {
            parent: Some(&root),
            segment: QueryPathSegment::Name("fieldTags"),
        };

        assert_eq!(LanguageNegotiator::current_language(&ctx, Some(&child)), "en");

        LanguageNegotiator::narrow(&ctx, Some(&root), "ja");
        assert_eq!(LanguageNegotiator::current_language(&ctx, Some(&child)), "ja");
        assert_eq!(LanguageNegotiator::current_language(&ctx, None), "en");
    }
}
