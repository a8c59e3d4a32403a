//! Serializable run output
//!
//! Map keys use the legacy key strings, so a report reads the same as the
//! tables downstream tooling already expects.

use crate::accumulator::{BastardExample, HeadInitiality, LanguageStats, OrderingCounts};
use crate::disorder::{DEFAULT_MAX_TOTAL, DisorderSummary};
use crate::keys::{PairKey, PositionKey, RowKey};
use crate::reducer::Totals;
use crate::shard::Diagnostic;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiscontinuityReport {
    pub heads: u64,
    pub bastards: u64,
    pub relations: BTreeMap<String, u64>,
    pub examples: BTreeMap<String, Vec<BastardExample>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeadInitialityReport {
    #[serde(flatten)]
    pub counts: HeadInitiality,
    pub vo_score: Option<f64>,
    pub hi_score: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LanguageReport {
    pub trees: u64,
    pub malformed_trees: u64,
    pub heads: u64,
    /// Keys observed at least `min_count` times
    pub geometric_means: BTreeMap<PositionKey, f64>,
    pub char_geometric_means: BTreeMap<PositionKey, f64>,
    pub counts: BTreeMap<PositionKey, u64>,
    pub log_sums: BTreeMap<PositionKey, f64>,
    /// Mean aggregate length by number of right dependents
    pub mal: BTreeMap<usize, f64>,
    pub ordering: BTreeMap<PairKey, OrderingCounts>,
    pub row_totals: BTreeMap<RowKey, u64>,
    /// Size tuple (e.g. `"[2, 3]"`) → frequency, by `average_*` key
    pub distributions: BTreeMap<PositionKey, BTreeMap<String, u64>>,
    pub discontinuity: DiscontinuityReport,
    pub head_initiality: HeadInitialityReport,
}

impl LanguageReport {
    /// Means and MAL leave out keys seen fewer than `min_count` times; raw
    /// counts and log sums are always complete
    pub fn new(stats: &LanguageStats, min_count: u64) -> Self {
        let sizes = &stats.sizes;
        let ordering = &stats.ordering;

        let mut row_totals: BTreeMap<RowKey, u64> =
            ordering.rows().map(|(row, &n)| (*row, n)).collect();
        for (pair, _) in ordering.pairs() {
            let row = pair.row();
            if let Some(total) = ordering.row_total(&row) {
                row_totals.entry(row).or_insert(total);
            }
        }

        Self {
            trees: stats.trees,
            malformed_trees: stats.malformed_trees,
            heads: stats.heads,
            geometric_means: sizes.geometric_means_min(min_count),
            char_geometric_means: sizes.char_geometric_means_min(min_count),
            counts: sizes.iter().map(|(k, s)| (*k, s.count)).collect(),
            log_sums: sizes.iter().map(|(k, s)| (*k, s.log_sum)).collect(),
            mal: sizes.mean_aggregate_lengths(min_count),
            ordering: ordering.pairs().map(|(k, c)| (*k, *c)).collect(),
            row_totals,
            distributions: stats
                .distributions
                .iter()
                .map(|(key, tuples)| {
                    let tuples = tuples
                        .iter()
                        .map(|(sizes, &n)| (format!("{sizes:?}"), n))
                        .collect();
                    (*key, tuples)
                })
                .collect(),
            discontinuity: DiscontinuityReport {
                heads: stats.discontinuity.heads,
                bastards: stats.discontinuity.bastards,
                relations: stats
                    .discontinuity
                    .relations
                    .iter()
                    .map(|(rel, &n)| (rel.clone(), n))
                    .collect(),
                examples: stats
                    .discontinuity
                    .examples
                    .iter()
                    .map(|(rel, kept)| (rel.clone(), kept.iter().cloned().collect()))
                    .collect(),
            },
            head_initiality: HeadInitialityReport {
                counts: stats.head_initiality,
                vo_score: stats.head_initiality.vo_score(),
                hi_score: stats.head_initiality.hi_score(),
            },
        }
    }
}

/// How a [`RunReport`] summarizes the totals
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportOptions {
    /// Largest dependent count in the disorder table
    pub max_total: usize,
    pub min_count: u64,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            max_total: DEFAULT_MAX_TOTAL,
            min_count: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub shards: usize,
    pub min_count: u64,
    pub languages: BTreeMap<String, LanguageReport>,
    pub disorder: DisorderSummary,
    pub diagnostics: Vec<Diagnostic>,
}

impl RunReport {
    pub fn new(totals: &Totals, options: &ReportOptions) -> Self {
        let languages: BTreeMap<String, LanguageReport> = totals
            .languages
            .iter()
            .map(|(language, stats)| {
                (language.clone(), LanguageReport::new(stats, options.min_count))
            })
            .collect();
        let disorder = DisorderSummary::new(
            languages
                .iter()
                .map(|(language, report)| (language.as_str(), &report.geometric_means)),
            options.max_total,
        );

        Self {
            shards: totals.shards,
            min_count: options.min_count,
            languages,
            disorder,
            diagnostics: totals.diagnostics.clone(),
        }
    }

    pub fn to_json(&self, pretty: bool) -> serde_json::Result<String> {
        if pretty {
            serde_json::to_string_pretty(self)
        } else {
            serde_json::to_string(self)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::Extractor;
    use crate::shard::ShardOutcome;
    use serde_json::Value;

    const TEXT: &str = "1\tsaw\tsee\tVERB\t_\t_\t0\troot\t_\t_
2\tthe\tthe\tDET\t_\t_\t3\tdet\t_\t_
3\tdog\tdog\tNOUN\t_\t_\t1\tobj\t_\t_
4\tin\tin\tADP\t_\t_\t6\tcase\t_\t_
5\tthe\tthe\tDET\t_\t_\t6\tdet\t_\t_
6\tpark\tpark\tNOUN\t_\t_\t1\tobl\t_\t_
7\ttoday\ttoday\tNOUN\t_\t_\t1\tobl:tmod\t_\t_

";

    fn totals() -> Totals {
        let stats = Extractor::default().accumulate_str(TEXT).unwrap();
        crate::reducer::reduce([ShardOutcome {
            language: "en".to_string(),
            stats,
            diagnostic: None,
        }])
    }

    #[test]
    fn test_language_report_keys() {
        let report = RunReport::new(&totals(), &ReportOptions::default());
        let json: Value = serde_json::from_str(&report.to_json(false).unwrap()).unwrap();
        let en = &json["languages"]["en"];

        assert_eq!(en["counts"]["right_1_totright_3"], 1);
        assert_eq!(en["geometric_means"]["right_3_totright_3"], 1.0);
        assert_eq!(en["ordering"]["right_3_0"]["eq"], 0);
        assert_eq!(en["ordering"]["right_3_0"]["lt"], 1);
        assert_eq!(en["ordering"]["right_3_1"]["gt"], 1);
        assert_eq!(en["row_totals"]["right_3_total"], 1);
        assert_eq!(en["distributions"]["average_totright_3"]["[2, 3, 1]"], 1);
        assert_eq!(en["head_initiality"]["vo_total"], 1);
        assert_eq!(en["head_initiality"]["hi_score"], 1.0);
        assert_eq!(json["disorder"]["languages"]["en"]["right_3_total"], true);
        assert_eq!(json["shards"], 1);
    }

    #[test]
    fn test_floats_round_trip() {
        let report = RunReport::new(&totals(), &ReportOptions::default());
        let json: Value = serde_json::from_str(&report.to_json(true).unwrap()).unwrap();
        let gm = json["languages"]["en"]["geometric_means"]["right_2_totright_3"]
            .as_f64()
            .unwrap();
        let key: PositionKey = "right_2_totright_3".parse().unwrap();
        assert_eq!(gm, report.languages["en"].geometric_means[&key]);
    }

    #[test]
    fn test_min_count_drops_rare_keys() {
        let mut text = String::new();
        for _ in 0..3 {
            text.push_str(TEXT);
        }
        // one sentence with a single right dependent
        text.push_str("1\tate\teat\tVERB\t_\t_\t0\troot\t_\t_\n2\tit\tit\tPRON\t_\t_\t1\tobj\t_\t_\n\n");
        let stats = Extractor::default().accumulate_str(&text).unwrap();
        let totals = crate::reducer::reduce([ShardOutcome {
            language: "en".to_string(),
            stats,
            diagnostic: None,
        }]);

        let options = ReportOptions {
            min_count: 3,
            ..ReportOptions::default()
        };
        let report = RunReport::new(&totals, &options);
        let en = &report.languages["en"];
        let single: PositionKey = "right_1_totright_1".parse().unwrap();
        let third: PositionKey = "right_3_totright_3".parse().unwrap();

        assert!(!en.geometric_means.contains_key(&single));
        assert_eq!(en.counts[&single], 1);
        assert!((en.geometric_means[&third] - 1.0).abs() < 1e-12);
        assert_eq!(en.mal.keys().copied().collect::<Vec<_>>(), vec![3]);
        // sizes 2, 3, 1 on every sentence
        assert!((en.mal[&3] - 6f64.cbrt()).abs() < 1e-12);
        assert_eq!(report.disorder.languages["en"][&RowKey::new(crate::keys::Side::Right, 3)], true);

        let all = RunReport::new(&totals, &ReportOptions::default());
        assert!(all.languages["en"].geometric_means.contains_key(&single));
        assert_eq!(all.languages["en"].mal.keys().copied().collect::<Vec<_>>(), vec![1, 3]);
    }

    #[test]
    fn test_bastard_examples_reported() {
        let text = "# text = he met a guy on Friday night who seemed really nice.
1\the\the\tPRON\t_\t_\t2\tnsubj\t_\t_
2\tmet\tmeet\tVERB\t_\t_\t0\troot\t_\t_
3\ta\ta\tDET\t_\t_\t4\tdet\t_\t_
4\tguy\tguy\tNOUN\t_\t_\t2\tobj\t_\t_
5\ton\ton\tADP\t_\t_\t6\tcase\t_\t_
6\tFriday\tFriday\tPROPN\t_\t_\t2\tobl\t_\t_
7\tnight\tnight\tNOUN\t_\t_\t6\tflat\t_\t_
8\twho\twho\tPRON\t_\t_\t9\tnsubj\t_\t_
9\tseemed\tseem\tVERB\t_\t_\t4\tacl:relcl\t_\t_
10\treally\treally\tADV\t_\t_\t11\tadvmod\t_\t_
11\tnice\tnice\tADJ\t_\t_\t9\txcomp\t_\t_
12\t.\t.\tPUNCT\t_\t_\t2\tpunct\t_\t_

";
        let stats = Extractor::default().accumulate_str(text).unwrap();
        let report = LanguageReport::new(&stats, 1);
        let json = serde_json::to_value(&report).unwrap();

        let example = &json["discontinuity"]["examples"]["acl"][0];
        assert_eq!(example["sentence"], "he met a guy on Friday night who seemed really nice.");
        assert_eq!(example["bastard"], 9);
        assert_eq!(json["discontinuity"]["relations"]["acl"], 1);
    }
}
