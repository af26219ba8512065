//! Pipeline identity and the collect, merge, save run.
//!
//! A pipeline is identified by its dataset name, derived from a suffix,
//! plus the username and tag date it runs under. One run is a single
//! synchronous pass: collect all symbols, merge into the stored dataset,
//! save the result.

use crate::data::collect::{self, CollectProgress};
use crate::data::merge::{self, MergeError};
use crate::data::provider::{AnalysisProvider, ProviderError};
use crate::data::store::{DatasetStore, StoreError};
use chrono::NaiveDate;
use thiserror::Error;

/// Identity of one collection pipeline.
#[derive(Debug, Clone)]
pub struct PipelineId {
    suffix: String,
    username: String,
    tag_date: NaiveDate,
}

impl PipelineId {
    pub fn new(
        suffix: impl Into<String>,
        username: impl Into<String>,
        tag_date: NaiveDate,
    ) -> Self {
        Self {
            suffix: suffix.into(),
            username: username.into(),
            tag_date,
        }
    }

    /// Dataset name: `earnings-estimate-{suffix}`.
    pub fn name(&self) -> String {
        format!("earnings-estimate-{}", self.suffix)
    }

    /// Fully qualified name: `{username}/{name}`.
    pub fn qualified(&self) -> String {
        format!("{}/{}", self.username, self.name())
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn tag_date(&self) -> NaiveDate {
        self.tag_date
    }
}

/// Errors that abort a pipeline run.
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Merge(#[from] MergeError),
}

/// Report of one pipeline run.
#[derive(Debug)]
pub struct RunReport {
    pub pipeline: String,
    pub collected: usize,
    pub skipped: usize,
    pub skipped_symbols: Vec<String>,
    pub previous_rows: usize,
    pub dataset_rows: usize,
}

/// Run one collection pass and merge it into the stored dataset.
///
/// Skipped symbols are reported, not fatal. Provider, merge, and store
/// failures abort the run and leave the stored dataset untouched.
pub fn run_pipeline(
    provider: &dyn AnalysisProvider,
    store: &DatasetStore,
    id: &PipelineId,
    symbols: &[&str],
    progress: &dyn CollectProgress,
) -> Result<RunReport, RunError> {
    let name = id.name();
    let outcome = collect::collect_symbols(provider, &name, symbols, progress)?;

    let existing = if store.exists(&name) {
        Some(store.load(&name)?)
    } else {
        None
    };
    let previous_rows = existing.as_ref().map_or(0, |df| df.height());

    let dataset = merge::merge_dataset(&outcome, existing)?;
    store.save(&name, &dataset, id.tag_date())?;

    Ok(RunReport {
        pipeline: name,
        collected: outcome.collected(),
        skipped: outcome.skipped(),
        skipped_symbols: outcome
            .skipped_symbols()
            .iter()
            .map(|s| s.to_string())
            .collect(),
        previous_rows,
        dataset_rows: dataset.height(),
    })
}
