//! Batch collection: run one provider pass over a list of symbols.
//!
//! Payload defects (missing or garbled estimate data) are absorbed per
//! symbol so one bad symbol never sinks the batch. Transport and resolution
//! failures abort the whole pass, since every remaining symbol would hit
//! the same wall.

use super::builder::{self, BuildError};
use super::provider::{AnalysisProvider, ProviderError};
use crate::domain::EstimateRecord;
use std::collections::BTreeMap;

/// Progress callback for multi-symbol collection.
pub trait CollectProgress: Send {
    /// Called when starting to fetch a symbol.
    fn on_start(&self, symbol: &str, index: usize, total: usize);

    /// Called when a symbol completes, with the build result.
    fn on_complete(&self, symbol: &str, index: usize, total: usize, result: &Result<(), BuildError>);

    /// Called when the entire batch is done.
    fn on_batch_complete(&self, collected: usize, skipped: usize, total: usize);
}

/// Simple progress reporter that prints to stdout.
pub struct StdoutProgress;

impl CollectProgress for StdoutProgress {
    fn on_start(&self, symbol: &str, index: usize, total: usize) {
        println!("[{}/{}] Fetching {symbol}...", index + 1, total);
    }

    fn on_complete(
        &self,
        symbol: &str,
        _index: usize,
        _total: usize,
        result: &Result<(), BuildError>,
    ) {
        match result {
            Ok(()) => println!("  OK: {symbol}"),
            Err(e) => println!("  SKIP: {symbol}: {e}"),
        }
    }

    fn on_batch_complete(&self, collected: usize, skipped: usize, total: usize) {
        println!("\nCollection complete: {collected}/{total} collected, {skipped} skipped");
    }
}

/// Outcome of one collection pass.
///
/// Every requested symbol appears exactly once: skipped symbols map to
/// `None`. Requesting a symbol twice keeps the later result.
#[derive(Debug)]
pub struct CollectionOutcome {
    pub results: BTreeMap<String, Option<EstimateRecord>>,
}

impl CollectionOutcome {
    /// The records that were actually collected, in symbol order.
    pub fn records(&self) -> Vec<&EstimateRecord> {
        self.results.values().filter_map(|r| r.as_ref()).collect()
    }

    pub fn collected(&self) -> usize {
        self.results.values().filter(|r| r.is_some()).count()
    }

    pub fn skipped(&self) -> usize {
        self.results.values().filter(|r| r.is_none()).count()
    }

    pub fn skipped_symbols(&self) -> Vec<&str> {
        self.results
            .iter()
            .filter(|(_, r)| r.is_none())
            .map(|(s, _)| s.as_str())
            .collect()
    }

    pub fn total(&self) -> usize {
        self.results.len()
    }

    pub fn all_collected(&self) -> bool {
        self.skipped() == 0
    }
}

/// Collect estimate records for a list of symbols.
///
/// Build failures are logged with the pipeline name and recorded as skips.
/// Provider failures (resolution, transport, rate limiting) propagate and
/// abort the pass.
pub fn collect_symbols(
    provider: &dyn AnalysisProvider,
    pipeline: &str,
    symbols: &[&str],
    progress: &dyn CollectProgress,
) -> Result<CollectionOutcome, ProviderError> {
    let total = symbols.len();
    let mut results: BTreeMap<String, Option<EstimateRecord>> = BTreeMap::new();

    for (i, symbol) in symbols.iter().enumerate() {
        progress.on_start(symbol, i, total);

        let ticker = provider.resolve(symbol)?;
        let payload = provider.fetch_analysis(&ticker)?;

        match builder::build_record(symbol, &payload) {
            Ok(record) => {
                results.insert(symbol.to_string(), Some(record));
                progress.on_complete(symbol, i, total, &Ok(()));
            }
            Err(e) => {
                eprintln!("Error for {pipeline}: {symbol}: {e}");
                results.insert(symbol.to_string(), None);
                progress.on_complete(symbol, i, total, &Err(e));
            }
        }
    }

    let outcome = CollectionOutcome { results };
    progress.on_batch_complete(outcome.collected(), outcome.skipped(), total);
    Ok(outcome)
}
