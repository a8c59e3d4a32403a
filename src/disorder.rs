//! Cross-language orderedness summary
//!
//! A row `(side, tot)` of a language's geometric-mean table is ordered when
//! the contextual means grow strictly with distance from the head. On the
//! right that is strictly increasing left to right; on the left it is
//! strictly decreasing left to right.

use crate::keys::{PositionKey, RowKey, Side};
use serde::Serialize;
use std::collections::BTreeMap;

pub const DEFAULT_MAX_TOTAL: usize = 4;

/// Whether head-outward means `[offset 1, offset 2, ...]` strictly increase
pub fn is_ordered(outward: &[f64]) -> bool {
    outward.windows(2).all(|w| w[0] < w[1])
}

/// Head-outward contextual means of one row, if every offset is present
pub fn row_means(gms: &BTreeMap<PositionKey, f64>, side: Side, total: usize) -> Option<Vec<f64>> {
    (1..=total)
        .map(|offset| {
            gms.get(&PositionKey::InContext {
                side,
                offset,
                total,
            })
            .copied()
        })
        .collect()
}

/// `true` = disordered, for rows `2..=max_total` with complete data
pub fn language_disorder(gms: &BTreeMap<PositionKey, f64>, max_total: usize) -> BTreeMap<RowKey, bool> {
    let mut rows = BTreeMap::new();
    for side in Side::BOTH {
        for total in 2..=max_total {
            if let Some(means) = row_means(gms, side, total) {
                rows.insert(RowKey::new(side, total), !is_ordered(&means));
            }
        }
    }
    rows
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DisorderSummary {
    /// Per language, per row: disordered?
    pub languages: BTreeMap<String, BTreeMap<RowKey, bool>>,
    /// Per row: percentage of languages with data that are disordered
    pub percentages: BTreeMap<RowKey, f64>,
}

impl DisorderSummary {
    pub fn new<'a, I>(languages: I, max_total: usize) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a BTreeMap<PositionKey, f64>)>,
    {
        let languages: BTreeMap<String, BTreeMap<RowKey, bool>> = languages
            .into_iter()
            .map(|(language, gms)| (language.to_string(), language_disorder(gms, max_total)))
            .collect();

        let mut tally: BTreeMap<RowKey, (usize, usize)> = BTreeMap::new();
        for rows in languages.values() {
            for (row, &disordered) in rows {
                let entry = tally.entry(*row).or_default();
                entry.0 += usize::from(disordered);
                entry.1 += 1;
            }
        }
        let percentages = tally
            .into_iter()
            .map(|(row, (disordered, total))| (row, 100.0 * disordered as f64 / total as f64))
            .collect();

        Self {
            languages,
            percentages,
        }
    }
}
