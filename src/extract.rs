//! Per-tree statistics extraction
//!
//! For every measurable head in a tree: select its dependents, optionally
//! promote discontinuous descendants, measure each dependent and fold the
//! measurements into a [`LanguageStats`].

use crate::accumulator::{BastardExample, LanguageStats, Observation};
use crate::config::{Criteria, ExtractionConfig};
use crate::conllu::{ParseError, TreeIterator};
use crate::keys::{PositionKey, RowKey, Side, XVX_ROW};
use crate::resolver::resolve;
use crate::selector::{Dependents, select_dependents};
use crate::tree::{NodeId, SpanOptions, Tree, Word};
use tracing::warn;

/// Size of one dependent in words and characters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Measure {
    pub id: NodeId,
    pub size: usize,
    pub chars: Option<usize>,
}

impl Measure {
    fn observation(&self) -> Option<Observation> {
        Observation::of(self.size, self.chars)
    }
}

/// Applies one [`ExtractionConfig`] to trees
#[derive(Debug, Clone)]
pub struct Extractor {
    config: ExtractionConfig,
    criteria: Criteria,
    span_options: SpanOptions,
}

impl Default for Extractor {
    fn default() -> Self {
        Self::new(ExtractionConfig::default())
    }
}

impl Extractor {
    pub fn new(config: ExtractionConfig) -> Self {
        let criteria = config.criteria();
        let span_options = config.span_options();
        Self {
            config,
            criteria,
            span_options,
        }
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    /// Fill in spans the way this extractor measures them
    pub fn prepare(&self, tree: &mut Tree) {
        tree.compute_spans(&self.span_options);
    }

    /// Dependents of `head` after optional discontinuous resolution
    pub fn dependents(&self, tree: &Tree, head: NodeId) -> Option<Dependents> {
        let mut deps = select_dependents(tree, head, &self.criteria)?;
        if self.config.include_bastards {
            resolve(tree, &mut deps, self.config.max_climb);
        }
        Some(deps)
    }

    /// Measure dependents on one side, head-outward
    pub fn measure(&self, tree: &Tree, ids: &[NodeId]) -> Vec<Measure> {
        ids.iter()
            .filter_map(|&id| tree.word(id))
            .map(|word| {
                let span = if self.config.include_bastards {
                    &word.direct_span
                } else {
                    &word.span
                };
                Measure {
                    id: word.id,
                    size: span.len(),
                    chars: self.config.char_sizes.then(|| tree.char_size(span)),
                }
            })
            .collect()
    }

    /// Accumulate one already-spanned tree
    pub fn accumulate_tree(&self, tree: &Tree, stats: &mut LanguageStats) {
        stats.trees += 1;

        for word in &tree.words {
            if !self.criteria.is_head_tag(&word.upos) {
                continue;
            }
            self.count_head(tree, word, stats);

            let Some(deps) = self.dependents(tree, word.id) else {
                continue;
            };
            stats.heads += 1;

            let left = self.measure(tree, &deps.left);
            let right = self.measure(tree, &deps.right);
            record_side(Side::Left, &left, stats);
            record_side(Side::Right, &right, stats);
            if let ([l], [r]) = (left.as_slice(), right.as_slice()) {
                record_xvx(l, r, stats);
            }
        }
    }

    /// Parse, span and accumulate every tree of a CoNLL-U text
    ///
    /// Malformed sentences are counted and skipped.
    pub fn accumulate_str(&self, text: &str) -> Result<LanguageStats, std::io::Error> {
        self.accumulate_trees(TreeIterator::from_string(text))
    }

    /// Accumulate a stream of parsed trees; an I/O error aborts the stream
    pub fn accumulate_trees<I>(&self, trees: I) -> Result<LanguageStats, std::io::Error>
    where
        I: IntoIterator<Item = Result<Tree, ParseError>>,
    {
        let mut stats = LanguageStats::default();
        for result in trees {
            match result {
                Ok(mut tree) => {
                    self.prepare(&mut tree);
                    self.accumulate_tree(&tree, &mut stats);
                }
                Err(ParseError::Malformed { line, message }) => {
                    warn!(line, %message, "skipping malformed sentence");
                    stats.malformed_trees += 1;
                }
                Err(ParseError::Io(e)) => return Err(e),
            }
        }
        Ok(stats)
    }

    fn count_head(&self, tree: &Tree, head: &Word, stats: &mut LanguageStats) {
        for &kid in &head.children {
            let Some(child) = tree.word(kid) else {
                continue;
            };
            // full labels: `obl:tmod` is not `obl` here
            let relation = child.deprel.as_str();
            if self.criteria.qualifies(relation) {
                stats
                    .head_initiality
                    .record(relation == self.config.object_relation, kid > head.id);
            }
        }

        stats.discontinuity.record_head();
        for &bastard in &head.bastards {
            if let Some(word) = tree.word(bastard) {
                let example = BastardExample {
                    words: tree.len(),
                    sentence: tree.text(),
                    head: head.id,
                    bastard,
                };
                stats.discontinuity.record_bastard(word.relation(), example);
            }
        }
    }
}

fn record_side(side: Side, measures: &[Measure], stats: &mut LanguageStats) {
    let total = measures.len();
    if total == 0 {
        return;
    }

    let mut observations = Vec::with_capacity(total);
    for (i, measure) in measures.iter().enumerate() {
        let Some(obs) = measure.observation() else {
            continue;
        };
        for key in PositionKey::for_dependent(side, i + 1, total) {
            stats.sizes.record(key, obs);
        }
        observations.push(obs);
    }

    let average = PositionKey::Average { side, total };
    if let Some(mean) = Observation::mean(&observations) {
        stats.sizes.record(average, mean);
    }
    stats
        .distributions
        .record(average, measures.iter().map(|m| m.size).collect());

    if total >= 2 {
        let row = RowKey::new(side, total);
        stats.ordering.record_row(row);
        for (i, pair) in measures.windows(2).enumerate() {
            let (near, far) = (pair[0].size, pair[1].size);
            let (first, second) = match side {
                Side::Right => (near, far),
                Side::Left => (far, near),
            };
            stats.ordering.compare(row.pair(i), first, second);
        }
    }
}

fn record_xvx(left: &Measure, right: &Measure, stats: &mut LanguageStats) {
    for (side, measure) in [(Side::Left, left), (Side::Right, right)] {
        if let Some(obs) = measure.observation() {
            stats.sizes.record(PositionKey::Xvx { side }, obs);
        }
    }
    stats.ordering.record_row(XVX_ROW);
    stats.ordering.compare(XVX_ROW.pair(0), left.size, right.size);
}
