//! depsize command-line interface
//!
//! Reads CoNLL-U treebanks, one language per file-name prefix, and writes
//! the per-language statistics as JSON.

use anyhow::{Context, Result};
use clap::Parser;
use depsize::disorder::DEFAULT_MAX_TOTAL;
use depsize::{ExtractionConfig, Extractor, ReportOptions, RunReport, Treebank};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Parser)]
#[command(
    name = "depsize",
    version = env!("CARGO_PKG_VERSION"),
    about = "Verb-dependent size and ordering statistics over dependency treebanks"
)]
struct Cli {
    /// CoNLL-U files or glob patterns (e.g. "short/*.conllu")
    #[arg(required = true)]
    inputs: Vec<String>,

    /// TOML file with extraction settings
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Worker threads (default: one per core)
    #[arg(short, long)]
    workers: Option<usize>,

    /// Measure full spans without reattaching discontinuous dependents
    #[arg(long)]
    no_bastards: bool,

    /// Largest dependent count summarized in the disorder table
    #[arg(long, default_value_t = DEFAULT_MAX_TOTAL)]
    max_total: usize,

    /// Leave keys seen fewer times out of the reported means (overrides the config)
    #[arg(long)]
    min_count: Option<u64>,

    /// Write the JSON report here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Pretty-print the JSON report
    #[arg(long)]
    pretty: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = match &cli.config {
        Some(path) => ExtractionConfig::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => ExtractionConfig::default(),
    };
    if cli.no_bastards {
        config.include_bastards = false;
    }
    if let Some(min_count) = cli.min_count {
        config.min_count = min_count;
    }
    let options = ReportOptions {
        max_total: cli.max_total,
        min_count: config.min_count,
    };

    let treebank = Treebank::from_globs(&cli.inputs).context("Invalid input pattern")?;
    for (language, paths) in treebank.languages() {
        info!(%language, files = paths.len(), "queued");
    }

    let extractor = Extractor::new(config);
    let totals = depsize::run(treebank.shards(), &extractor, cli.workers)
        .context("Failed to process treebank")?;
    for diagnostic in &totals.diagnostics {
        warn!(path = %diagnostic.path.display(), "{}", diagnostic.message);
    }

    let report = RunReport::new(&totals, &options);
    let json = report
        .to_json(cli.pretty)
        .context("Failed to serialize report")?;

    match &cli.output {
        Some(path) => {
            std::fs::write(path, json)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!(path = %path.display(), "report written");
        }
        None => println!("{json}"),
    }

    Ok(())
}
