//! Python bindings for depsize
//!
//! This module provides PyO3-based Python bindings for the Rust core.

use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::PyDict;
use std::collections::BTreeMap;
use std::path::Path;

use crate::accumulator::LanguageStats;
use crate::config::ExtractionConfig;
use crate::extract::Extractor;
use crate::reducer::{RunError, run_inputs};

/// Convert RunError to Python exception
impl From<RunError> for PyErr {
    fn from(err: RunError) -> PyErr {
        match err {
            RunError::Glob(e) => PyValueError::new_err(format!("Glob pattern error: {}", e)),
            RunError::ThreadPool(e) => PyRuntimeError::new_err(e.to_string()),
        }
    }
}

fn language_dict<'py>(
    py: Python<'py>,
    stats: &LanguageStats,
    min_count: u64,
) -> PyResult<Bound<'py, PyDict>> {
    let gm: BTreeMap<String, f64> = stats
        .sizes
        .geometric_means_min(min_count)
        .into_iter()
        .map(|(key, gm)| (key.to_string(), gm))
        .collect();
    let counts: BTreeMap<String, u64> = stats
        .sizes
        .iter()
        .map(|(key, stat)| (key.to_string(), stat.count))
        .collect();
    let ordering: BTreeMap<String, (u64, u64, u64)> = stats
        .ordering
        .pairs()
        .map(|(key, c)| (key.to_string(), (c.lt, c.eq, c.gt)))
        .collect();
    let totals: BTreeMap<String, u64> = stats
        .ordering
        .rows()
        .map(|(key, &n)| (key.to_string(), n))
        .collect();

    let dict = PyDict::new(py);
    dict.set_item("gm", gm)?;
    dict.set_item("counts", counts)?;
    dict.set_item("ordering", ordering)?;
    dict.set_item("totals", totals)?;
    dict.set_item("mal", stats.sizes.mean_aggregate_lengths(min_count))?;
    dict.set_item("trees", stats.trees)?;
    dict.set_item("heads", stats.heads)?;
    Ok(dict)
}

/// Compute dependent-size statistics for CoNLL-U files.
///
/// Args:
///     paths: File paths or glob patterns (e.g., "short/*.conllu")
///     include_bastards: If True (default), discontinuous dependents are
///         reattached and sizes use direct spans
///     workers: Number of worker threads (default: one per core)
///     min_count: Keys seen fewer times are left out of "gm" and "mal"
///
/// Returns:
///     Dict mapping language to {"gm", "counts", "ordering", "totals", "mal",
///     "trees", "heads"}; ordering values are (lt, eq, gt) tuples
///
/// Raises:
///     ValueError: If a glob pattern is invalid
#[pyfunction]
#[pyo3(signature = (paths, include_bastards=true, workers=None, min_count=1))]
fn compute_stats<'py>(
    py: Python<'py>,
    paths: Vec<String>,
    include_bastards: bool,
    workers: Option<usize>,
    min_count: u64,
) -> PyResult<Bound<'py, PyDict>> {
    let extractor = Extractor::new(ExtractionConfig::default().with_bastards(include_bastards));
    let totals = py.detach(|| run_inputs(&paths, &extractor, workers))?;

    let result = PyDict::new(py);
    for (language, stats) in &totals.languages {
        result.set_item(language, language_dict(py, stats, min_count)?)?;
    }
    Ok(result)
}

/// Language code of a treebank file name (the prefix before the first "_").
#[pyfunction]
fn language_of(path: &str) -> String {
    crate::treebank::language_of(Path::new(path))
}

#[pyfunction]
fn __version__() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[pymodule]
fn depsize(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(compute_stats, m)?)?;
    m.add_function(wrap_pyfunction!(language_of, m)?)?;
    m.add_function(wrap_pyfunction!(__version__, m)?)?;

    Ok(())
}
