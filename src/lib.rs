//! Depsize: verb-dependent size and ordering statistics
//!
//! Measures how large the dependents of verbs are, by side, distance from
//! the verb and number of co-dependents, across dependency treebanks in
//! many languages. Core implementation in Rust with Python bindings.

// Tree provider
pub mod conllu; // CoNLL-U file parsing
pub mod tree; // Tree data structures and span computation
pub mod treebank; // Shard files and language tags

// Statistics engine
pub mod accumulator; // Mergeable size/ordering accumulators
pub mod config; // Extraction settings
pub mod extract; // Per-tree measurement
pub mod keys; // Position and ordering keys
pub mod reducer; // Parallel shard reduction
pub mod resolver; // Discontinuous dependent resolution
pub mod selector; // Qualifying dependent selection
pub mod shard; // One file → one set of accumulators

// Output
pub mod disorder;
pub mod report;

// Python bindings
#[cfg(feature = "pyo3")]
pub mod python;

// Re-exports for convenience
pub use accumulator::{LanguageStats, Merge, OrderingAccumulator, OrderingCounts, SizeAccumulator};
pub use config::ExtractionConfig;
pub use conllu::{ParseError, TreeIterator};
pub use extract::Extractor;
pub use keys::{PairKey, PositionKey, RowKey, Side};
pub use reducer::{RunError, Totals, run, run_inputs};
pub use report::{ReportOptions, RunReport};
pub use shard::{Diagnostic, process_shard};
pub use tree::{Tree, Word};
pub use treebank::{Shard, Treebank, language_of};
