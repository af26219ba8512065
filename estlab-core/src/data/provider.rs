//! Analysis provider trait and structured error types.
//!
//! The AnalysisProvider trait abstracts over estimate sources (Yahoo Finance,
//! canned payloads in tests) so implementations can be swapped and mocked.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Provider-native ticker produced by symbol resolution.
///
/// Input symbols use exchange notation ("BRK.B"); providers have their own
/// ("BRK-B"). Fetch paths take a `Ticker`, never a raw symbol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticker(pub String);

impl Ticker {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Raw textual analysis snapshot for one symbol, before any typing.
///
/// Values are carried as the provider rendered them, missing figures as the
/// "N/A" sentinel. The record builder and formatter do the typing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisPayload {
    /// Date the snapshot was taken; becomes the record's date.
    pub as_of: NaiveDate,
    pub tables: Vec<AnalysisTable>,
}

/// One named table in the analysis snapshot, e.g. "Earnings Estimate".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisTable {
    pub name: String,
    /// Column headers after the metric column: the fiscal periods, in
    /// current-quarter, next-quarter, current-year, next-year order.
    pub period_labels: Vec<String>,
    pub rows: Vec<MetricRow>,
}

/// One metric row: a label and its per-period raw values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricRow {
    pub metric: String,
    pub values: Vec<String>,
}

impl AnalysisTable {
    pub fn row(&self, metric: &str) -> Option<&MetricRow> {
        self.rows.iter().find(|r| r.metric == metric)
    }
}

/// Structured error types for provider operations.
///
/// Any of these aborts a collection run; per-symbol recovery applies only to
/// record-building failures, never to transport.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("rate limited by provider (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("authentication required: {0}")]
    AuthenticationRequired(String),

    #[error("symbol not found: {symbol}")]
    SymbolNotFound { symbol: String },

    #[error("hard stop: provider has blocked requests (circuit breaker tripped)")]
    CircuitBreakerTripped,

    #[error("provider error: {0}")]
    Other(String),
}

/// Trait for analysis providers (Yahoo Finance, test fixtures).
///
/// Implementations own transport concerns, including retries. The collector
/// above this trait never retries, so an error that escapes a provider is
/// final for the whole batch.
pub trait AnalysisProvider: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// Resolve an input symbol to the provider's native ticker.
    fn resolve(&self, symbol: &str) -> Result<Ticker, ProviderError>;

    /// Fetch the raw analysis snapshot for a resolved ticker.
    fn fetch_analysis(&self, ticker: &Ticker) -> Result<AnalysisPayload, ProviderError>;

    /// Check if the provider is currently available (not rate-limited, not blocked).
    fn is_available(&self) -> bool;
}
