//! EstLab CLI: collection and dataset management commands.
//!
//! Commands:
//! - `collect`: fetch analyst estimates and merge them into a stored dataset
//! - `status`: report stored datasets and their sidecar metadata
//! - `export`: render a stored dataset as CSV

use anyhow::{bail, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use estlab_core::data::{
    CircuitBreaker, DatasetStore, StdoutProgress, Universe, YahooAnalysisProvider,
};
use estlab_core::export::export_csv;
use estlab_core::pipeline::{run_pipeline, PipelineId, RunReport};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "estlab", about = "EstLab CLI: analyst estimate collection pipelines")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Collect analyst estimates and merge them into the stored dataset.
    Collect {
        /// Symbols to collect (e.g., AAPL MSFT NVDA).
        symbols: Vec<String>,

        /// Universe TOML file to collect instead of listing symbols.
        #[arg(long)]
        universe: Option<PathBuf>,

        /// Dataset suffix; the dataset is named earnings-estimate-{suffix}.
        #[arg(long, default_value = "main")]
        suffix: String,

        /// Username the run is attributed to.
        #[arg(long, default_value = "local")]
        username: String,

        /// Tag date (YYYY-MM-DD). Defaults to today.
        #[arg(long)]
        tag_date: Option<String>,

        /// Store directory. Defaults to ./data.
        #[arg(long, default_value = "data")]
        store_dir: PathBuf,
    },
    /// Report stored datasets and their metadata.
    Status {
        /// Store directory. Defaults to ./data.
        #[arg(long, default_value = "data")]
        store_dir: PathBuf,

        /// Emit machine-readable JSON instead of a table.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Render a stored dataset as CSV.
    Export {
        /// Dataset name (e.g., earnings-estimate-main).
        name: String,

        /// Store directory. Defaults to ./data.
        #[arg(long, default_value = "data")]
        store_dir: PathBuf,

        /// Output file. Defaults to stdout.
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Collect {
            symbols,
            universe,
            suffix,
            username,
            tag_date,
            store_dir,
        } => run_collect(symbols, universe, suffix, username, tag_date, store_dir),
        Commands::Status { store_dir, json } => run_status(&store_dir, json),
        Commands::Export {
            name,
            store_dir,
            output,
        } => run_export(&name, &store_dir, output),
    }
}

fn run_collect(
    symbols: Vec<String>,
    universe: Option<PathBuf>,
    suffix: String,
    username: String,
    tag_date: Option<String>,
    store_dir: PathBuf,
) -> Result<()> {
    // Validate mutually exclusive symbol sources
    if !symbols.is_empty() && universe.is_some() {
        bail!("listed symbols and --universe are mutually exclusive");
    }

    let symbols: Vec<String> = if let Some(path) = universe {
        let u = Universe::from_file(&path)?;
        u.all_symbols().iter().map(|s| s.to_string()).collect()
    } else if symbols.is_empty() {
        bail!("no symbols given (list symbols or pass --universe)");
    } else {
        symbols
    };

    let tag = tag_date
        .as_deref()
        .map(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d"))
        .transpose()?
        .unwrap_or_else(|| chrono::Local::now().date_naive());

    let circuit_breaker = Arc::new(CircuitBreaker::default_provider());
    let provider = YahooAnalysisProvider::new(circuit_breaker);
    let store = DatasetStore::new(store_dir);
    let progress = StdoutProgress;
    let id = PipelineId::new(suffix, username, tag);

    let sym_refs: Vec<&str> = symbols.iter().map(|s| s.as_str()).collect();

    let report = run_pipeline(&provider, &store, &id, &sym_refs, &progress)?;
    print_report(&report);

    Ok(())
}

fn run_status(store_dir: &Path, json: bool) -> Result<()> {
    let store = DatasetStore::new(store_dir);
    let metas = store.list();

    if json {
        println!("{}", serde_json::to_string_pretty(&metas)?);
        return Ok(());
    }

    if metas.is_empty() {
        println!("Store is empty: {}", store_dir.display());
        return Ok(());
    }

    println!("Store: {}", store_dir.display());
    println!("Datasets: {}", metas.len());
    println!();
    println!(
        "{:<32} {:>8} {:>8} {:<12} {:<16}",
        "Name", "Rows", "Symbols", "Tag Date", "Hash"
    );
    println!("{}", "-".repeat(80));
    for m in &metas {
        println!(
            "{:<32} {:>8} {:>8} {:<12} {:<16}",
            m.name,
            m.row_count,
            m.symbol_count,
            m.tag_date.to_string(),
            &m.data_hash[..16.min(m.data_hash.len())],
        );
    }

    Ok(())
}

fn run_export(name: &str, store_dir: &Path, output: Option<PathBuf>) -> Result<()> {
    let store = DatasetStore::new(store_dir);
    let df = store.load(name)?;
    let csv = export_csv(&df)?;

    match output {
        Some(path) => {
            std::fs::write(&path, &csv)?;
            println!("Exported {} rows to {}", df.height(), path.display());
        }
        None => print!("{csv}"),
    }

    Ok(())
}

fn print_report(report: &RunReport) {
    println!();
    println!("=== Collection Result ===");
    println!("Pipeline:       {}", report.pipeline);
    println!("Collected:      {}", report.collected);
    println!("Skipped:        {}", report.skipped);
    if !report.skipped_symbols.is_empty() {
        println!("Skipped syms:   {}", report.skipped_symbols.join(", "));
    }
    println!(
        "Dataset rows:   {} (was {})",
        report.dataset_rows, report.previous_rows
    );
    println!();
}
