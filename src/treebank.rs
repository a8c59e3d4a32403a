//! Treebank files and their languages
//!
//! A treebank is a set of CoNLL-U shard files. Each shard belongs to the
//! language named by its file stem up to the first `_` (`en_ewt-ud-train.conllu`
//! → `en`). Glob expansion is sorted so runs are reproducible.

use crate::conllu::TreeIterator;
use std::collections::BTreeMap;
use std::io::BufRead;
use std::path::{Path, PathBuf};

/// Language identifier of a shard path
pub fn language_of(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy())
        .unwrap_or_default();
    match name.split_once('_') {
        Some((prefix, _)) => prefix.to_string(),
        None => name.split('.').next().unwrap_or_default().to_string(),
    }
}

/// One input file
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Shard {
    pub path: PathBuf,
    pub language: String,
}

impl Shard {
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let language = language_of(&path);
        Self { path, language }
    }

    pub fn with_language(path: impl AsRef<Path>, language: &str) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            language: language.to_string(),
        }
    }

    /// Open the shard's sentence stream
    pub fn trees(&self) -> std::io::Result<TreeIterator<Box<dyn BufRead + Send>>> {
        TreeIterator::from_file(&self.path)
    }
}

/// Collection of shard files from explicit paths or glob patterns
#[derive(Debug, Clone, Default)]
pub struct Treebank {
    shards: Vec<Shard>,
}

impl Treebank {
    /// Create from a single file path
    pub fn from_file(path: impl AsRef<Path>) -> Self {
        Self {
            shards: vec![Shard::new(path)],
        }
    }

    /// Create from a glob pattern
    ///
    /// Files are processed in sorted order for deterministic results.
    pub fn from_glob(pattern: &str) -> Result<Self, glob::PatternError> {
        Self::from_globs(&[pattern])
    }

    /// Create from several inputs; each is a glob pattern or a literal path
    ///
    /// A pattern with no matches is kept as a literal path so a missing file
    /// surfaces later as a shard failure instead of vanishing.
    pub fn from_globs<S: AsRef<str>>(patterns: &[S]) -> Result<Self, glob::PatternError> {
        let mut paths = Vec::new();
        for pattern in patterns {
            let pattern = pattern.as_ref();
            let matched: Vec<PathBuf> = glob::glob(pattern)?.filter_map(Result::ok).collect();
            if matched.is_empty() {
                tracing::warn!(pattern, "input matched no files");
                paths.push(PathBuf::from(pattern));
            } else {
                paths.extend(matched);
            }
        }
        Ok(Self::from_paths(paths))
    }

    /// Create from explicit file paths
    pub fn from_paths(mut paths: Vec<PathBuf>) -> Self {
        paths.sort();
        paths.dedup();
        Self {
            shards: paths.into_iter().map(Shard::new).collect(),
        }
    }

    pub fn shards(&self) -> &[Shard] {
        &self.shards
    }

    pub fn len(&self) -> usize {
        self.shards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shards.is_empty()
    }

    /// Shard paths grouped by language
    pub fn languages(&self) -> BTreeMap<String, Vec<PathBuf>> {
        let mut groups: BTreeMap<String, Vec<PathBuf>> = BTreeMap::new();
        for shard in &self.shards {
            groups
                .entry(shard.language.clone())
                .or_default()
                .push(shard.path.clone());
        }
        groups
    }
}

impl IntoIterator for Treebank {
    type Item = Shard;
    type IntoIter = std::vec::IntoIter<Shard>;

    fn into_iter(self) -> Self::IntoIter {
        self.shards.into_iter()
    }
}
