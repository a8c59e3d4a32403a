//! Size and ordering accumulators
//!
//! Every accumulator here is a commutative monoid under [`Merge`]: shards are
//! accumulated independently and added together in any order. Sizes are kept
//! as `(count, Σ ln size)` so that geometric means survive merging exactly;
//! they are only turned into means at the very end.

use crate::keys::{PairKey, PositionKey, RowKey, Side};
use crate::tree::NodeId;
use rustc_hash::FxHashMap;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::hash::{BuildHasher, Hash};

/// Associative, commutative combination of partial results
pub trait Merge {
    fn merge(&mut self, other: Self);
}

impl Merge for u64 {
    fn merge(&mut self, other: Self) {
        *self += other;
    }
}

impl<K, V, S> Merge for HashMap<K, V, S>
where
    K: Eq + Hash,
    V: Merge,
    S: BuildHasher,
{
    fn merge(&mut self, other: Self) {
        for (key, value) in other {
            match self.get_mut(&key) {
                Some(existing) => existing.merge(value),
                None => {
                    self.insert(key, value);
                }
            }
        }
    }
}

impl<K: Ord, V: Merge> Merge for BTreeMap<K, V> {
    fn merge(&mut self, other: Self) {
        for (key, value) in other {
            match self.get_mut(&key) {
                Some(existing) => existing.merge(value),
                None => {
                    self.insert(key, value);
                }
            }
        }
    }
}

/// One size measurement in log space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observation {
    pub log_size: f64,
    pub log_chars: Option<f64>,
}

impl Observation {
    /// `None` for an empty span (the log is undefined)
    pub fn of(size: usize, chars: Option<usize>) -> Option<Self> {
        if size == 0 {
            return None;
        }
        Some(Self {
            log_size: (size as f64).ln(),
            log_chars: chars.filter(|&c| c > 0).map(|c| (c as f64).ln()),
        })
    }

    /// Per-head aggregate: mean log size of the given observations
    pub fn mean(observations: &[Observation]) -> Option<Self> {
        if observations.is_empty() {
            return None;
        }
        let n = observations.len() as f64;
        let log_size = observations.iter().map(|o| o.log_size).sum::<f64>() / n;
        let log_chars = observations
            .iter()
            .map(|o| o.log_chars)
            .sum::<Option<f64>>()
            .map(|sum| sum / n);
        Some(Self {
            log_size,
            log_chars,
        })
    }
}

/// Running totals for one position key
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SizeStat {
    pub count: u64,
    pub log_sum: f64,
    pub char_count: u64,
    pub char_log_sum: f64,
}

impl SizeStat {
    pub fn add(&mut self, obs: Observation) {
        self.count += 1;
        self.log_sum += obs.log_size;
        if let Some(log_chars) = obs.log_chars {
            self.char_count += 1;
            self.char_log_sum += log_chars;
        }
    }

    /// `exp(Σ ln size / count)`
    pub fn geometric_mean(&self) -> Option<f64> {
        (self.count > 0).then(|| (self.log_sum / self.count as f64).exp())
    }

    pub fn char_geometric_mean(&self) -> Option<f64> {
        (self.char_count > 0).then(|| (self.char_log_sum / self.char_count as f64).exp())
    }
}

impl Merge for SizeStat {
    fn merge(&mut self, other: Self) {
        self.count += other.count;
        self.log_sum += other.log_sum;
        self.char_count += other.char_count;
        self.char_log_sum += other.char_log_sum;
    }
}

/// Size totals by position key; a key is present only once observed
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SizeAccumulator {
    stats: FxHashMap<PositionKey, SizeStat>,
}

impl SizeAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, key: PositionKey, obs: Observation) {
        self.stats.entry(key).or_default().add(obs);
    }

    /// Record a raw size; returns `false` (and records nothing) for size 0
    pub fn observe(&mut self, key: PositionKey, size: usize, chars: Option<usize>) -> bool {
        match Observation::of(size, chars) {
            Some(obs) => {
                self.record(key, obs);
                true
            }
            None => false,
        }
    }

    pub fn get(&self, key: &PositionKey) -> Option<&SizeStat> {
        self.stats.get(key)
    }

    pub fn count(&self, key: &PositionKey) -> u64 {
        self.stats.get(key).map_or(0, |s| s.count)
    }

    pub fn log_sum(&self, key: &PositionKey) -> f64 {
        self.stats.get(key).map_or(0.0, |s| s.log_sum)
    }

    pub fn geometric_mean(&self, key: &PositionKey) -> Option<f64> {
        self.stats.get(key).and_then(SizeStat::geometric_mean)
    }

    pub fn len(&self) -> usize {
        self.stats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stats.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PositionKey, &SizeStat)> {
        self.stats.iter()
    }

    fn frequent(&self, min_count: u64) -> impl Iterator<Item = (&PositionKey, &SizeStat)> {
        self.stats.iter().filter(move |(_, stat)| stat.count >= min_count)
    }

    /// Geometric mean for every key, sorted by key
    pub fn geometric_means(&self) -> BTreeMap<PositionKey, f64> {
        self.geometric_means_min(1)
    }

    /// Geometric means of the keys observed at least `min_count` times
    pub fn geometric_means_min(&self, min_count: u64) -> BTreeMap<PositionKey, f64> {
        self.frequent(min_count)
            .filter_map(|(key, stat)| stat.geometric_mean().map(|gm| (*key, gm)))
            .collect()
    }

    pub fn char_geometric_means(&self) -> BTreeMap<PositionKey, f64> {
        self.char_geometric_means_min(1)
    }

    pub fn char_geometric_means_min(&self, min_count: u64) -> BTreeMap<PositionKey, f64> {
        self.frequent(min_count)
            .filter_map(|(key, stat)| stat.char_geometric_mean().map(|gm| (*key, gm)))
            .collect()
    }

    /// Mean aggregate length of `n` right dependents, for every observed `n`
    ///
    /// `MAL_n = exp(Σ log_sum / Σ count)` over `right_i_totright_n` for
    /// `i = 1..=n`. Keys seen fewer than `min_count` times are left out.
    pub fn mean_aggregate_lengths(&self, min_count: u64) -> BTreeMap<usize, f64> {
        let totals: BTreeSet<usize> = self
            .stats
            .keys()
            .filter_map(|key| match *key {
                PositionKey::InContext {
                    side: Side::Right,
                    total,
                    ..
                } => Some(total),
                _ => None,
            })
            .collect();

        let mut mal = BTreeMap::new();
        for total in totals {
            let (mut log_sum, mut count) = (0.0, 0);
            for offset in 1..=total {
                let key = PositionKey::InContext {
                    side: Side::Right,
                    offset,
                    total,
                };
                if let Some(stat) = self.stats.get(&key).filter(|s| s.count >= min_count) {
                    log_sum += stat.log_sum;
                    count += stat.count;
                }
            }
            if count > 0 {
                mal.insert(total, (log_sum / count as f64).exp());
            }
        }
        mal
    }
}

impl Merge for SizeAccumulator {
    fn merge(&mut self, other: Self) {
        self.stats.merge(other.stats);
    }
}

/// Outcomes of comparing the first member of a pair with the second
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct OrderingCounts {
    pub lt: u64,
    pub eq: u64,
    pub gt: u64,
}

impl OrderingCounts {
    pub fn record(&mut self, ordering: Ordering) {
        match ordering {
            Ordering::Less => self.lt += 1,
            Ordering::Equal => self.eq += 1,
            Ordering::Greater => self.gt += 1,
        }
    }

    pub fn total(&self) -> u64 {
        self.lt + self.eq + self.gt
    }

    /// `(lt%, eq%, gt%)`, or `None` when nothing was compared
    pub fn percentages(&self) -> Option<(f64, f64, f64)> {
        let total = self.total();
        if total == 0 {
            return None;
        }
        let pct = |n: u64| 100.0 * n as f64 / total as f64;
        Some((pct(self.lt), pct(self.eq), pct(self.gt)))
    }
}

impl Merge for OrderingCounts {
    fn merge(&mut self, other: Self) {
        self.lt += other.lt;
        self.eq += other.eq;
        self.gt += other.gt;
    }
}

/// Adjacent-pair comparisons and per-row head counts
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderingAccumulator {
    pairs: FxHashMap<PairKey, OrderingCounts>,
    rows: FxHashMap<RowKey, u64>,
}

impl OrderingAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one head in `row`
    pub fn record_row(&mut self, row: RowKey) {
        *self.rows.entry(row).or_insert(0) += 1;
    }

    /// Compare two sizes in surface order; zero sizes are not comparable
    pub fn compare(&mut self, pair: PairKey, first: usize, second: usize) -> bool {
        if first == 0 || second == 0 {
            return false;
        }
        self.pairs.entry(pair).or_default().record(first.cmp(&second));
        true
    }

    pub fn pair(&self, key: &PairKey) -> OrderingCounts {
        self.pairs.get(key).copied().unwrap_or_default()
    }

    /// Heads counted in `row`; rows without a counter fall back to the
    /// first pair's comparison count
    pub fn row_total(&self, row: &RowKey) -> Option<u64> {
        self.rows
            .get(row)
            .copied()
            .or_else(|| self.pairs.get(&row.pair(0)).map(OrderingCounts::total))
    }

    pub fn pairs(&self) -> impl Iterator<Item = (&PairKey, &OrderingCounts)> {
        self.pairs.iter()
    }

    pub fn rows(&self) -> impl Iterator<Item = (&RowKey, &u64)> {
        self.rows.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty() && self.rows.is_empty()
    }
}

impl Merge for OrderingAccumulator {
    fn merge(&mut self, other: Self) {
        self.pairs.merge(other.pairs);
        self.rows.merge(other.rows);
    }
}

/// Frequency of exact head-outward size tuples, keyed by `Average` key
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SizeDistributions {
    tuples: FxHashMap<PositionKey, FxHashMap<Vec<usize>, u64>>,
}

impl SizeDistributions {
    pub fn record(&mut self, key: PositionKey, sizes: Vec<usize>) {
        *self.tuples.entry(key).or_default().entry(sizes).or_insert(0) += 1;
    }

    pub fn get(&self, key: &PositionKey) -> Option<&FxHashMap<Vec<usize>, u64>> {
        self.tuples.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PositionKey, &FxHashMap<Vec<usize>, u64>)> {
        self.tuples.iter()
    }
}

impl Merge for SizeDistributions {
    fn merge(&mut self, other: Self) {
        self.tuples.merge(other.tuples);
    }
}

/// Example sentences kept per bastard relation
pub const MAX_BASTARD_EXAMPLES: usize = 3;

/// A sentence in which `bastard` was reattached to `head`
///
/// Ordered shortest sentence first, so the kept examples do not depend on
/// the order shards are merged in.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, serde::Serialize)]
pub struct BastardExample {
    pub words: usize,
    pub sentence: String,
    pub head: NodeId,
    pub bastard: NodeId,
}

/// How many head-tag words had discontinuous descendants reattached
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiscontinuityStats {
    pub heads: u64,
    pub bastards: u64,
    pub relations: FxHashMap<String, u64>,
    pub examples: BTreeMap<String, BTreeSet<BastardExample>>,
}

impl DiscontinuityStats {
    pub fn record_head(&mut self) {
        self.heads += 1;
    }

    pub fn record_bastard(&mut self, relation: &str, example: BastardExample) {
        self.bastards += 1;
        *self.relations.entry(relation.to_string()).or_insert(0) += 1;

        let kept = self.examples.entry(relation.to_string()).or_default();
        kept.insert(example);
        keep_shortest(kept);
    }
}

fn keep_shortest(examples: &mut BTreeSet<BastardExample>) {
    while examples.len() > MAX_BASTARD_EXAMPLES {
        examples.pop_last();
    }
}

impl Merge for DiscontinuityStats {
    fn merge(&mut self, other: Self) {
        self.heads += other.heads;
        self.bastards += other.bastards;
        self.relations.merge(other.relations);
        for (relation, examples) in other.examples {
            let kept = self.examples.entry(relation).or_default();
            kept.extend(examples);
            keep_shortest(kept);
        }
    }
}

/// Share of dependents following their head
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct HeadInitiality {
    pub all_total: u64,
    pub all_right: u64,
    pub vo_total: u64,
    pub vo_right: u64,
}

impl HeadInitiality {
    pub fn record(&mut self, is_object: bool, is_right: bool) {
        self.all_total += 1;
        self.all_right += u64::from(is_right);
        if is_object {
            self.vo_total += 1;
            self.vo_right += u64::from(is_right);
        }
    }

    /// Fraction of object dependents after the verb
    pub fn vo_score(&self) -> Option<f64> {
        (self.vo_total > 0).then(|| self.vo_right as f64 / self.vo_total as f64)
    }

    /// Fraction of all dependents after the verb
    pub fn hi_score(&self) -> Option<f64> {
        (self.all_total > 0).then(|| self.all_right as f64 / self.all_total as f64)
    }
}

impl Merge for HeadInitiality {
    fn merge(&mut self, other: Self) {
        self.all_total += other.all_total;
        self.all_right += other.all_right;
        self.vo_total += other.vo_total;
        self.vo_right += other.vo_right;
    }
}

/// Everything accumulated for one language (or one shard of it)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LanguageStats {
    pub sizes: SizeAccumulator,
    pub ordering: OrderingAccumulator,
    pub distributions: SizeDistributions,
    pub discontinuity: DiscontinuityStats,
    pub head_initiality: HeadInitiality,
    pub trees: u64,
    pub malformed_trees: u64,
    /// Heads whose dependents were measured
    pub heads: u64,
}

impl Merge for LanguageStats {
    fn merge(&mut self, other: Self) {
        self.sizes.merge(other.sizes);
        self.ordering.merge(other.ordering);
        self.distributions.merge(other.distributions);
        self.discontinuity.merge(other.discontinuity);
        self.head_initiality.merge(other.head_initiality);
        self.trees += other.trees;
        self.malformed_trees += other.malformed_trees;
        self.heads += other.heads;
    }
}
