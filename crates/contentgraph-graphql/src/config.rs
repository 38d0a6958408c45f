//! GraphQL configuration.
//!
//! Configuration lives under the `[graphql]` table of `contentgraph.toml` and
//! can be overridden with `CONTENTGRAPH__GRAPHQL__*` environment variables.
//!
//! # Example Configuration
//!
//! ```toml
//! [graphql]
//! max_depth = 15
//! max_complexity = 500
//! introspection = true
//! max_page_size = 100
//! default_langcode = "en"
//! value_fields = true
//! union_mode = "simple"
//!
//! [graphql.entities.node]
//! sub_kinds = ["article", "page"]
//! load = true
//! connection = true
//!
//! [graphql.entities.taxonomy_term]
//! ```

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use arc_swap::ArcSwap;
use serde::{Deserialize, Serialize};
use tracing::info;

/// How reference fields with several possible targets are typed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnionMode {
    /// One shared union per target kind (`NodeUnion`).
    #[default]
    Simple,
    /// One union per field, limited to the field's allowed targets.
    Specific,
}

/// Exposure settings for one entity kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KindExposure {
    /// Sub-kinds to expose; `None` exposes all of them.
    #[serde(default)]
    pub sub_kinds: Option<Vec<String>>,

    /// Add a single-entity load field to the query root.
    #[serde(default = "default_true")]
    pub load: bool,

    /// Add connection fields to the query root.
    #[serde(default = "default_true")]
    pub connection: bool,
}

impl Default for KindExposure {
    fn default() -> Self {
        Self {
            sub_kinds: None,
            load: true,
            connection: true,
        }
    }
}

impl KindExposure {
    /// Returns `true` if the sub-kind is exposed.
    #[must_use]
    pub fn exposes_sub_kind(&self, sub_kind: &str) -> bool {
        self.sub_kinds
            .as_ref()
            .is_none_or(|list| list.iter().any(|s| s == sub_kind))
    }
}

/// GraphQL layer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphQLConfig {
    /// Maximum query depth allowed.
    /// Default: 15
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    /// Maximum query complexity allowed.
    /// Default: 500
    #[serde(default = "default_max_complexity")]
    pub max_complexity: usize,

    /// Enable GraphQL introspection queries.
    /// Default: true
    #[serde(default = "default_true")]
    pub introspection: bool,

    /// Upper bound for `first`/`last` on connections.
    /// Site settings may lower it at runtime.
    /// Default: 100
    #[serde(default = "default_max_page_size")]
    pub max_page_size: usize,

    /// Site default language, used when a request names none.
    /// Default: "en"
    #[serde(default = "default_langcode")]
    pub default_langcode: String,

    /// Emit simplified value fields next to the raw field wrappers.
    /// Default: true
    #[serde(default = "default_true")]
    pub value_fields: bool,

    /// Typing of multi-target reference fields.
    /// Default: simple
    #[serde(default)]
    pub union_mode: UnionMode,

    /// Entity kinds enabled in the schema, keyed by kind id.
    #[serde(default)]
    pub entities: BTreeMap<String, KindExposure>,
}

fn default_max_depth() -> usize {
    15
}

fn default_max_complexity() -> usize {
    500
}

fn default_true() -> bool {
    true
}

fn default_max_page_size() -> usize {
    100
}

fn default_langcode() -> String {
    "en".to_string()
}

impl Default for GraphQLConfig {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
            max_complexity: default_max_complexity(),
            introspection: default_true(),
            max_page_size: default_max_page_size(),
            default_langcode: default_langcode(),
            value_fields: default_true(),
            union_mode: UnionMode::default(),
            entities: BTreeMap::new(),
        }
    }
}

impl GraphQLConfig {
    /// Enables a kind with default exposure.
    #[must_use]
    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.entities.insert(kind.into(), KindExposure::default());
        self
    }

    /// Enables a kind with explicit exposure settings.
    #[must_use]
    pub fn with_kind_exposure(mut self, kind: impl Into<String>, exposure: KindExposure) -> Self {
        self.entities.insert(kind.into(), exposure);
        self
    }

    /// Returns the exposure of a kind, or `None` if it is disabled.
    #[must_use]
    pub fn exposure(&self, kind: &str) -> Option<&KindExposure> {
        self.entities.get(kind)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration values are invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_depth == 0 {
            return Err("graphql.max_depth must be > 0".into());
        }
        if self.max_complexity == 0 {
            return Err("graphql.max_complexity must be > 0".into());
        }
        if self.max_page_size == 0 {
            return Err("graphql.max_page_size must be > 0".into());
        }
        if self.default_langcode.trim().is_empty() {
            return Err("graphql.default_langcode must not be empty".into());
        }
        for (kind, exposure) in &self.entities {
            if exposure.sub_kinds.as_ref().is_some_and(Vec::is_empty) {
                return Err(format!(
                    "graphql.entities.{kind}.sub_kinds must not be empty; omit it to expose all"
                ));
            }
        }
        Ok(())
    }

    /// Loads configuration from an optional TOML file plus environment.
    ///
    /// Values are read from the `[graphql]` table; environment variables
    /// such as `CONTENTGRAPH__GRAPHQL__MAX_PAGE_SIZE=50` take precedence.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be parsed or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, String> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        builder = builder.add_source(
            config::Environment::with_prefix("CONTENTGRAPH")
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder.build().map_err(|e| e.to_string())?;
        let config: GraphQLConfig = match settings.get::<GraphQLConfig>("graphql") {
            Ok(config) => config,
            Err(config::ConfigError::NotFound(_)) => GraphQLConfig::default(),
            Err(e) => return Err(e.to_string()),
        };
        config.validate()?;
        info!(
            kinds = config.entities.len(),
            max_page_size = config.max_page_size,
            "Loaded GraphQL configuration"
        );
        Ok(config)
    }

    /// Converts this config to a SchemaBuilderConfig.
    #[must_use]
    pub fn to_schema_builder_config(&self) -> crate::SchemaBuilderConfig {
        crate::SchemaBuilderConfig {
            max_depth: self.max_depth,
            max_complexity: self.max_complexity,
            introspection_enabled: self.introspection,
            value_fields: self.value_fields,
            union_mode: self.union_mode,
            entities: self.entities.clone(),
        }
    }

    /// Site settings seeded from this configuration.
    #[must_use]
    pub fn site_settings(&self) -> SiteSettings {
        SiteSettings {
            max_page_size: self.max_page_size,
            default_langcode: self.default_langcode.clone(),
        }
    }
}

/// Site-level settings that may change while the schema stays the same.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteSettings {
    /// Current maximum for `first`/`last`.
    pub max_page_size: usize,
    pub default_langcode: String,
}

impl Default for SiteSettings {
    fn default() -> Self {
        GraphQLConfig::default().site_settings()
    }
}

/// Shared, atomically swappable site settings.
///
/// Readers always see a complete snapshot; the page-size bound is read from
/// here on every connection call, so a change applies to the next query.
#[derive(Debug, Clone)]
pub struct SharedSiteSettings {
    inner: Arc<ArcSwap<SiteSettings>>,
}

impl SharedSiteSettings {
    #[must_use]
    pub fn new(settings: SiteSettings) -> Self {
        Self {
            inner: Arc::new(ArcSwap::from_pointee(settings)),
        }
    }

    /// Returns the current snapshot.
    #[must_use]
    pub fn current(&self) -> Arc<SiteSettings> {
        self.inner.load_full()
    }

    /// Replaces the maximum page size.
    ///
    /// # Errors
    ///
    /// Returns an error if `max_page_size` is zero.
    pub fn set_max_page_size(&self, max_page_size: usize) -> Result<(), String> {
        if max_page_size == 0 {
            return Err("max_page_size must be > 0".into());
        }
        self.inner.rcu(|current| SiteSettings {
            max_page_size,
            ..SiteSettings::clone(current)
        });
        info!(max_page_size, "Updated site page size limit");
        Ok(())
    }

    /// Replaces the whole snapshot.
    pub fn store(&self, settings: SiteSettings) {
        self.inner.store(Arc::new(settings));
    }
}

impl Default for SharedSiteSettings {
    fn default() -> Self {
        Self::new(SiteSettings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = GraphQLConfig::default();
        assert_eq!(config.max_depth, 15);
        assert_eq!(config.max_complexity, 500);
        assert!(config.introspection);
        assert_eq!(config.max_page_size, 100);
        assert_eq!(config.default_langcode, "en");
        assert!(config.value_fields);
        assert_eq!(config.union_mode, UnionMode::Simple);
        assert!(config.entities.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_values() {
        let mut config = GraphQLConfig::default();
        config.max_page_size = 0;
        assert!(config.validate().is_err());

        let mut config = GraphQLConfig::default();
        config.default_langcode = " ".into();
        assert!(config.validate().is_err());

        let config = GraphQLConfig::default().with_kind_exposure(
            "node",
            KindExposure {
                sub_kinds: Some(vec![]),
                ..Default::default()
            },
        );
        let err = config.validate().unwrap_err();
        assert!(err.contains("graphql.entities.node.sub_kinds"));
    }

    #[test]
    fn test_deserialize_from_toml() {
        let toml = r#"
            max_page_size = 50
            union_mode = "specific"
            value_fields = false

            [entities.node]
            sub_kinds = ["article"]
            connection = false

            [entities.user]
        "#;

        let config: GraphQLConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.max_page_size, 50);
        assert_eq!(config.union_mode, UnionMode::Specific);
        assert!(!config.value_fields);

        let node = config.exposure("node").unwrap();
        assert!(node.load);
        assert!(!node.connection);
        assert!(node.exposes_sub_kind("article"));
        assert!(!node.exposes_sub_kind("page"));

        let user = config.exposure("user").unwrap();
        assert!(user.exposes_sub_kind("anything"));
        assert!(config.exposure("comment").is_none());
    }

    #[test]
    fn test_shared_settings_swap() {
        let shared = SharedSiteSettings::default();
        let before = shared.current();
        assert_eq!(before.max_page_size, 100);

        shared.set_max_page_size(10).unwrap();
        assert_eq!(shared.current().max_page_size, 10);
        assert_eq!(shared.current().default_langcode, "en");
        // Earlier snapshots are unaffected.
        assert_eq!(before.max_page_size, 100);

        assert!(shared.set_max_page_size(0).is_err());
        assert_eq!(shared.current().max_page_size, 10);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("contentgraph.toml");
        std::fs::write(
            &path,
            "[graphql]\nmax_page_size = 25\n\n[graphql.entities.node]\nsub_kinds = [\"article\"]\n",
        )
        .unwrap();

        let config = GraphQLConfig::load(Some(&path)).unwrap();
        assert_eq!(config.max_page_size, 25);
        assert!(config.exposure("node").is_some());
    }
}
