//! Parallel reduction of shard results into per-language totals
//!
//! Shards are processed on a dedicated rayon pool; each fold branch owns its
//! own [`Totals`] and branches are merged pairwise. Because every accumulator
//! merge is associative and commutative, the totals do not depend on the
//! number of workers or the order shards finish in.

use crate::accumulator::{LanguageStats, Merge};
use crate::extract::Extractor;
use crate::keys::PositionKey;
use crate::shard::{Diagnostic, ShardOutcome, process_shard};
use crate::treebank::{Shard, Treebank};
use rayon::prelude::*;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum RunError {
    #[error("failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("invalid input pattern: {0}")]
    Glob(#[from] glob::PatternError),
}

/// Per-language totals plus the shards that failed
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Totals {
    pub languages: BTreeMap<String, LanguageStats>,
    pub diagnostics: Vec<Diagnostic>,
    pub shards: usize,
}

impl Totals {
    /// Fold one shard outcome into the totals
    pub fn absorb(&mut self, outcome: ShardOutcome) {
        self.shards += 1;
        self.languages
            .entry(outcome.language)
            .or_default()
            .merge(outcome.stats);
        self.diagnostics.extend(outcome.diagnostic);
    }

    pub fn language(&self, language: &str) -> Option<&LanguageStats> {
        self.languages.get(language)
    }

    /// Geometric means for every language
    pub fn geometric_means(&self) -> BTreeMap<&str, BTreeMap<PositionKey, f64>> {
        self.languages
            .iter()
            .map(|(language, stats)| (language.as_str(), stats.sizes.geometric_means()))
            .collect()
    }

    fn finish(mut self) -> Self {
        self.diagnostics.sort();
        self
    }
}

impl Merge for Totals {
    fn merge(&mut self, other: Self) {
        self.languages.merge(other.languages);
        self.diagnostics.extend(other.diagnostics);
        self.shards += other.shards;
    }
}

/// Sequential fold of shard outcomes
pub fn reduce(outcomes: impl IntoIterator<Item = ShardOutcome>) -> Totals {
    let mut totals = Totals::default();
    for outcome in outcomes {
        totals.absorb(outcome);
    }
    totals.finish()
}

/// Process shards on `workers` threads (rayon's default when `None`)
pub fn run(shards: &[Shard], extractor: &Extractor, workers: Option<usize>) -> Result<Totals, RunError> {
    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(n) = workers {
        builder = builder.num_threads(n);
    }
    let pool = builder.build()?;
    info!(shards = shards.len(), workers = pool.current_num_threads(), "processing shards");

    let totals = pool.install(|| {
        shards
            .par_iter()
            .map(|shard| process_shard(shard, extractor))
            .fold(Totals::default, |mut totals, outcome| {
                totals.absorb(outcome);
                totals
            })
            .reduce(Totals::default, |mut a, b| {
                a.merge(b);
                a
            })
    });
    let totals = totals.finish();

    info!(
        languages = totals.languages.len(),
        failed = totals.diagnostics.len(),
        "run complete"
    );
    Ok(totals)
}

/// Expand file paths or glob patterns and process them
pub fn run_inputs<S: AsRef<str>>(
    inputs: &[S],
    extractor: &Extractor,
    workers: Option<usize>,
) -> Result<Totals, RunError> {
    let treebank = Treebank::from_globs(inputs)?;
    run(treebank.shards(), extractor, workers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::Side;
    use std::fs;
    use std::path::Path;

    const SIZE_FOUR: &str = "1\tate\teat\tVERB\t_\t_\t0\troot\t_\t_
2\tthe\tthe\tDET\t_\t_\t5\tdet\t_\t_
3\tvery\tvery\tADV\t_\t_\t4\tadvmod\t_\t_
4\tbig\tbig\tADJ\t_\t_\t5\tamod\t_\t_
5\tpie\tpie\tNOUN\t_\t_\t1\tobj\t_\t_

";

    const SIZE_TWO: &str = "1\tKim\tKim\tPROPN\t_\t_\t2\tnsubj\t_\t_
2\tate\teat\tVERB\t_\t_\t0\troot\t_\t_
3\tthe\tthe\tDET\t_\t_\t4\tdet\t_\t_
4\tapple\tapple\tNOUN\t_\t_\t2\tobj\t_\t_

";

    fn write(dir: &Path, name: &str, text: &str) -> Shard {
        let path = dir.join(name);
        fs::write(&path, text).unwrap();
        Shard::new(path)
    }

    fn right_one() -> PositionKey {
        PositionKey::InContext {
            side: Side::Right,
            offset: 1,
            total: 1,
        }
    }

    #[test]
    fn test_two_shards_merge() {
        let dir = tempfile::tempdir().unwrap();
        let shards = vec![
            write(dir.path(), "en_a.conllu", SIZE_FOUR),
            write(dir.path(), "en_b.conllu", SIZE_FOUR),
        ];

        let totals = run(&shards, &Extractor::default(), Some(2)).unwrap();
        let en = totals.language("en").unwrap();
        assert_eq!(en.sizes.count(&right_one()), 2);
        assert!((en.sizes.log_sum(&right_one()) - 2.0 * 4f64.ln()).abs() < 1e-12);
        assert!((en.sizes.geometric_mean(&right_one()).unwrap() - 4.0).abs() < 1e-12);
        assert_eq!(totals.shards, 2);
        assert!(totals.diagnostics.is_empty());
    }

    #[test]
    fn test_languages_are_isolated() {
        let dir = tempfile::tempdir().unwrap();
        let shards = vec![
            write(dir.path(), "en_a.conllu", SIZE_FOUR),
            write(dir.path(), "fr_a.conllu", SIZE_TWO),
            Shard::new(dir.path().join("fr_missing.conllu")),
        ];

        let totals = run(&shards, &Extractor::default(), Some(3)).unwrap();
        assert!((totals.language("en").unwrap().sizes.geometric_mean(&right_one()).unwrap() - 4.0).abs() < 1e-12);

        let fr = totals.language("fr").unwrap();
        assert_eq!(fr.sizes.count(&right_one()), 1);
        assert_eq!(fr.trees, 1);
        assert_eq!(totals.diagnostics.len(), 1);
        assert_eq!(totals.diagnostics[0].language, "fr");

        let gms = totals.geometric_means();
        assert_eq!(gms.keys().copied().collect::<Vec<_>>(), vec!["en", "fr"]);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let dir = tempfile::tempdir().unwrap();
        let shards: Vec<Shard> = (0..6)
            .map(|i| {
                let text = if i % 2 == 0 { SIZE_FOUR } else { SIZE_TWO };
                write(dir.path(), &format!("xx_{i}.conllu"), text)
            })
            .collect();
        let extractor = Extractor::default();

        let sequential = reduce(shards.iter().map(|s| process_shard(s, &extractor)));
        for workers in [1, 2, 4] {
            let parallel = run(&shards, &extractor, Some(workers)).unwrap();
            let (a, b) = (&sequential.languages["xx"], &parallel.languages["xx"]);
            assert_eq!(a.sizes.len(), b.sizes.len());
            for (key, stat) in a.sizes.iter() {
                let other = b.sizes.get(key).unwrap();
                assert_eq!(stat.count, other.count);
                assert!((stat.log_sum - other.log_sum).abs() <= 1e-9 * stat.log_sum.abs().max(1.0));
            }
            assert_eq!(a.ordering, b.ordering);
            assert_eq!(a.trees, b.trees);
        }
    }

    #[test]
    fn test_bad_pattern() {
        assert!(matches!(
            run_inputs(&["[unclosed"], &Extractor::default(), Some(1)),
            Err(RunError::Glob(_))
        ));
    }
}
