//! Shard processing
//!
//! One file in, one [`LanguageStats`] out. A file that cannot be read
//! contributes empty statistics and a [`Diagnostic`]; it never stops the run.

use crate::accumulator::LanguageStats;
use crate::extract::Extractor;
use crate::treebank::Shard;
use serde::Serialize;
use std::path::PathBuf;
use tracing::{debug, warn};

/// Per-file failure record
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct Diagnostic {
    pub path: PathBuf,
    pub language: String,
    pub message: String,
}

/// Result of processing one shard
#[derive(Debug, Clone)]
pub struct ShardOutcome {
    pub language: String,
    pub stats: LanguageStats,
    pub diagnostic: Option<Diagnostic>,
}

impl ShardOutcome {
    fn failed(shard: &Shard, error: impl std::fmt::Display) -> Self {
        warn!(path = %shard.path.display(), language = %shard.language, %error, "shard failed");
        Self {
            language: shard.language.clone(),
            stats: LanguageStats::default(),
            diagnostic: Some(Diagnostic {
                path: shard.path.clone(),
                language: shard.language.clone(),
                message: error.to_string(),
            }),
        }
    }
}

/// Accumulate every tree of one shard
pub fn process_shard(shard: &Shard, extractor: &Extractor) -> ShardOutcome {
    let trees = match shard.trees() {
        Ok(trees) => trees,
        Err(e) => return ShardOutcome::failed(shard, e),
    };

    match extractor.accumulate_trees(trees) {
        Ok(stats) => {
            debug!(
                path = %shard.path.display(),
                trees = stats.trees,
                heads = stats.heads,
                malformed = stats.malformed_trees,
                "shard done"
            );
            ShardOutcome {
                language: shard.language.clone(),
                stats,
                diagnostic: None,
            }
        }
        Err(e) => ShardOutcome::failed(shard, e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::{PositionKey, Side};
    use std::fs;

    const TWO_HEADS: &str = "1\tate\teat\tVERB\t_\t_\t0\troot\t_\t_
2\tthe\tthe\tDET\t_\t_\t5\tdet\t_\t_
3\tvery\tvery\tADV\t_\t_\t4\tadvmod\t_\t_
4\tbig\tbig\tADJ\t_\t_\t5\tamod\t_\t_
5\tpie\tpie\tNOUN\t_\t_\t1\tobj\t_\t_

1\tread\tread\tVERB\t_\t_\t0\troot\t_\t_
2\tall\tall\tDET\t_\t_\t5\tdet\t_\t_
3\tthe\tthe\tDET\t_\t_\t5\tdet\t_\t_
4\tnew\tnew\tADJ\t_\t_\t5\tamod\t_\t_
5\tbooks\tbook\tNOUN\t_\t_\t1\tobj\t_\t_

";

    #[test]
    fn test_process_shard() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("en_test.conllu");
        fs::write(&path, TWO_HEADS).unwrap();

        let outcome = process_shard(&Shard::new(&path), &Extractor::default());
        assert_eq!(outcome.language, "en");
        assert!(outcome.diagnostic.is_none());

        let key = PositionKey::InContext {
            side: Side::Right,
            offset: 1,
            total: 1,
        };
        assert_eq!(outcome.stats.sizes.count(&key), 2);
        assert!((outcome.stats.sizes.log_sum(&key) - 2.0 * 4f64.ln()).abs() < 1e-12);
        assert!((outcome.stats.sizes.geometric_mean(&key).unwrap() - 4.0).abs() < 1e-12);
        assert_eq!(outcome.stats.trees, 2);
    }

    #[test]
    fn test_missing_shard_yields_diagnostic() {
        let shard = Shard::with_language("/nonexistent/de_missing.conllu", "de");
        let outcome = process_shard(&shard, &Extractor::default());

        assert_eq!(outcome.language, "de");
        assert_eq!(outcome.stats, LanguageStats::default());
        let diagnostic = outcome.diagnostic.unwrap();
        assert_eq!(diagnostic.language, "de");
        assert_eq!(diagnostic.path, PathBuf::from("/nonexistent/de_missing.conllu"));
        assert!(!diagnostic.message.is_empty());
    }

    #[test]
    fn test_unreadable_shard_discards_partial_results() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("en_bad.conllu");
        let mut bytes = TWO_HEADS.as_bytes().to_vec();
        bytes.extend_from_slice(b"1\t\xff\xfe\tx\tVERB\t_\t_\t0\troot\t_\t_\n");
        fs::write(&path, bytes).unwrap();

        let outcome = process_shard(&Shard::new(&path), &Extractor::default());
        assert!(outcome.diagnostic.is_some());
        assert_eq!(outcome.stats, LanguageStats::default());
    }
}
