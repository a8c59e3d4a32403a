//! Extraction settings
//!
//! Which heads are measured, which relations count as dependents, and how
//! spans are built. Every field is optional in a TOML file:
//!
//! ```toml
//! head_tags = ["VERB", "AUX"]
//! include_bastards = false
//! min_count = 10
//! ```

use crate::tree::SpanOptions;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Argument and modifier relations measured by default
pub const DEFAULT_RELATIONS: &[&str] = &[
    "nsubj",
    "obj",
    "iobj",
    "csubj",
    "ccomp",
    "xcomp",
    "obl",
    "expl",
    "dislocated",
    "advcl",
    "advmod",
    "nmod",
    "appos",
    "nummod",
    "acl",
    "amod",
];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {path}: {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// UPOS tags of measured heads
    #[serde(default = "default_head_tags")]
    pub head_tags: Vec<String>,

    /// Primary relations that make a child a dependent
    #[serde(default = "default_relations")]
    pub relations: Vec<String>,

    /// Primary relations left out of every span
    #[serde(default = "default_excluded")]
    pub excluded_relations: Vec<String>,

    /// Reattach discontinuous descendants and measure direct spans
    #[serde(default = "default_true")]
    pub include_bastards: bool,

    #[serde(default = "default_max_climb")]
    pub max_climb: usize,

    /// Relation counted by the VO head-initiality score
    #[serde(default = "default_object_relation")]
    pub object_relation: String,

    /// Also accumulate sizes measured in characters
    #[serde(default = "default_true")]
    pub char_sizes: bool,

    /// Keys observed fewer times are left out of reported means
    #[serde(default = "default_min_count")]
    pub min_count: u64,
}

fn default_head_tags() -> Vec<String> {
    vec!["VERB".to_string()]
}

fn default_relations() -> Vec<String> {
    DEFAULT_RELATIONS.iter().map(|r| r.to_string()).collect()
}

fn default_excluded() -> Vec<String> {
    vec!["punct".to_string()]
}

fn default_true() -> bool {
    true
}

fn default_max_climb() -> usize {
    256
}

fn default_object_relation() -> String {
    "obj".to_string()
}

fn default_min_count() -> u64 {
    1
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            head_tags: default_head_tags(),
            relations: default_relations(),
            excluded_relations: default_excluded(),
            include_bastards: true,
            max_climb: default_max_climb(),
            object_relation: default_object_relation(),
            char_sizes: true,
            min_count: default_min_count(),
        }
    }
}

impl ExtractionConfig {
    /// Load from a TOML file; missing fields take their defaults
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Toml {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn with_bastards(mut self, include: bool) -> Self {
        self.include_bastards = include;
        self
    }

    pub fn with_min_count(mut self, min_count: u64) -> Self {
        self.min_count = min_count;
        self
    }

    pub fn span_options(&self) -> SpanOptions {
        SpanOptions {
            excluded_relations: self.excluded_relations.clone(),
            compute_bastards: self.include_bastards,
            max_climb: self.max_climb,
        }
    }

    pub fn criteria(&self) -> Criteria {
        Criteria {
            head_tags: self.head_tags.iter().cloned().collect(),
            relations: self.relations.iter().cloned().collect(),
        }
    }
}

/// Lookup sets built once from an [`ExtractionConfig`]
#[derive(Debug, Clone, Default)]
pub struct Criteria {
    pub head_tags: FxHashSet<String>,
    pub relations: FxHashSet<String>,
}

impl Criteria {
    #[inline]
    pub fn is_head_tag(&self, upos: &str) -> bool {
        self.head_tags.contains(upos)
    }

    /// Whether a primary relation is on the allow-list
    #[inline]
    pub fn qualifies(&self, relation: &str) -> bool {
        self.relations.contains(relation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_defaults() {
        let config = ExtractionConfig::default();
        assert_eq!(config.head_tags, vec!["VERB"]);
        assert_eq!(config.relations.len(), 16);
        assert!(config.include_bastards);
        assert_eq!(config.min_count, 1);

        let criteria = config.criteria();
        assert!(criteria.qualifies("acl"));
        assert!(!criteria.qualifies("det"));
        assert!(criteria.is_head_tag("VERB"));
        assert!(!criteria.is_head_tag("NOUN"));
    }

    #[test]
    fn test_partial_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("depsize.toml");
        fs::write(
            &path,
            "head_tags = [\"VERB\", \"AUX\"]\ninclude_bastards = false\nmin_count = 10\n",
        )
        .unwrap();

        let config = ExtractionConfig::from_file(&path).unwrap();
        assert_eq!(config.head_tags, vec!["VERB", "AUX"]);
        assert!(!config.include_bastards);
        assert_eq!(config.relations, default_relations());
        assert_eq!(config.max_climb, 256);
        assert_eq!(config.min_count, 10);
        assert!(!config.span_options().compute_bastards);
    }

    #[test]
    fn test_config_errors() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.toml");
        assert!(matches!(
            ExtractionConfig::from_file(&missing),
            Err(ConfigError::Io { .. })
        ));

        let bad = dir.path().join("bad.toml");
        fs::write(&bad, "max_climb = \"many\"").unwrap();
        assert!(matches!(
            ExtractionConfig::from_file(&bad),
            Err(ConfigError::Toml { .. })
        ));
    }
}
