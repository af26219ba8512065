//! Yahoo Finance analysis provider.
//!
//! Fetches analyst earnings estimates from Yahoo's v10 quoteSummary API
//! (`earningsTrend` module). Handles rate limiting, retries with exponential
//! backoff, response parsing, and the circuit breaker.
//!
//! Yahoo Finance has no official API and is subject to unannounced format
//! changes. The wire structs below only name the fields we consume, and the
//! payload hands every figure on as raw text; typing happens downstream in
//! the formatter.

use super::circuit_breaker::CircuitBreaker;
use super::provider::{AnalysisPayload, AnalysisProvider, AnalysisTable, MetricRow, ProviderError, Ticker};
use crate::format::MISSING_SENTINEL;
use chrono::{Datelike, NaiveDate};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

/// Yahoo Finance v10 quoteSummary response.
#[derive(Debug, Deserialize)]
struct QuoteSummaryResponse {
    #[serde(rename = "quoteSummary")]
    quote_summary: QuoteSummary,
}

#[derive(Debug, Deserialize)]
struct QuoteSummary {
    result: Option<Vec<SummaryResult>>,
    error: Option<SummaryError>,
}

#[derive(Debug, Deserialize)]
struct SummaryError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct SummaryResult {
    #[serde(rename = "earningsTrend")]
    earnings_trend: Option<EarningsTrend>,
}

#[derive(Debug, Deserialize)]
struct EarningsTrend {
    trend: Vec<TrendPoint>,
}

#[derive(Debug, Deserialize)]
struct TrendPoint {
    /// Relative period code: "0q", "+1q", "0y", "+1y" (plus others we skip).
    period: String,
    #[serde(rename = "endDate")]
    end_date: Option<String>,
    #[serde(rename = "earningsEstimate")]
    earnings_estimate: Option<EstimateBlock>,
}

#[derive(Debug, Deserialize)]
struct EstimateBlock {
    avg: Option<RawFigure>,
    low: Option<RawFigure>,
    high: Option<RawFigure>,
    #[serde(rename = "yearAgoEps")]
    year_ago_eps: Option<RawFigure>,
    #[serde(rename = "numberOfAnalysts")]
    number_of_analysts: Option<RawFigure>,
}

/// A figure as Yahoo reports it. Unreported figures come as empty objects.
#[derive(Debug, Default, Deserialize)]
struct RawFigure {
    raw: Option<f64>,
    fmt: Option<String>,
}

/// The trend periods that map onto the dataset's four fiscal columns,
/// in schema order.
const WANTED_PERIODS: [&str; 4] = ["0q", "+1q", "0y", "+1y"];

/// Yahoo Finance analysis provider.
pub struct YahooAnalysisProvider {
    client: reqwest::blocking::Client,
    circuit_breaker: Arc<CircuitBreaker>,
    max_retries: u32,
    base_delay: Duration,
}

impl YahooAnalysisProvider {
    pub fn new(circuit_breaker: Arc<CircuitBreaker>) -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
            .build()
            .expect("failed to build HTTP client");

        Self {
            client,
            circuit_breaker,
            max_retries: 3,
            base_delay: Duration::from_millis(500),
        }
    }

    /// Build the quoteSummary URL for a ticker.
    fn summary_url(ticker: &Ticker) -> String {
        format!(
            "https://query2.finance.yahoo.com/v10/finance/quoteSummary/{}\
             ?modules=earningsTrend",
            ticker.as_str()
        )
    }

    /// Parse the quoteSummary response into a raw analysis payload.
    ///
    /// A symbol that resolves but carries no earningsTrend module yields a
    /// payload with no tables; judging that shape is the record builder's
    /// job, not the transport's.
    fn parse_response(
        symbol: &str,
        as_of: NaiveDate,
        resp: QuoteSummaryResponse,
    ) -> Result<AnalysisPayload, ProviderError> {
        let result = resp.quote_summary.result.ok_or_else(|| {
            if let Some(err) = resp.quote_summary.error {
                if err.code == "Not Found" {
                    ProviderError::SymbolNotFound {
                        symbol: symbol.to_string(),
                    }
                } else {
                    ProviderError::ResponseFormatChanged(format!("{}: {}", err.code, err.description))
                }
            } else {
                ProviderError::ResponseFormatChanged("empty result with no error".into())
            }
        })?;

        let summary = result
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::ResponseFormatChanged("result array is empty".into()))?;

        let mut tables = Vec::new();
        if let Some(trend) = summary.earnings_trend {
            if let Some(table) = estimate_table(&trend.trend) {
                tables.push(table);
            }
        }

        Ok(AnalysisPayload { as_of, tables })
    }

    /// Execute the HTTP request with retry and circuit breaker logic.
    fn fetch_with_retry(&self, ticker: &Ticker) -> Result<AnalysisPayload, ProviderError> {
        if !self.circuit_breaker.is_allowed() {
            return Err(ProviderError::CircuitBreakerTripped);
        }

        let url = Self::summary_url(ticker);
        let symbol = ticker.as_str();
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = self.base_delay * 2u32.pow(attempt - 1);
                std::thread::sleep(delay);
            }

            if !self.circuit_breaker.is_allowed() {
                return Err(ProviderError::CircuitBreakerTripped);
            }

            match self.client.get(&url).send() {
                Ok(resp) => {
                    let status = resp.status();

                    if status == reqwest::StatusCode::FORBIDDEN {
                        // IP ban: trip the breaker and stop immediately
                        self.circuit_breaker.trip();
                        return Err(ProviderError::CircuitBreakerTripped);
                    }

                    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                        self.circuit_breaker.record_failure();
                        let retry_after = resp
                            .headers()
                            .get("retry-after")
                            .and_then(|v| v.to_str().ok())
                            .and_then(|v| v.parse::<u64>().ok())
                            .unwrap_or(60);
                        last_error = Some(ProviderError::RateLimited {
                            retry_after_secs: retry_after,
                        });
                        continue;
                    }

                    if status == reqwest::StatusCode::UNAUTHORIZED {
                        return Err(ProviderError::AuthenticationRequired(
                            "Yahoo Finance requires authentication".into(),
                        ));
                    }

                    if status == reqwest::StatusCode::NOT_FOUND {
                        return Err(ProviderError::SymbolNotFound {
                            symbol: symbol.to_string(),
                        });
                    }

                    if !status.is_success() {
                        self.circuit_breaker.record_failure();
                        last_error = Some(ProviderError::Other(format!("HTTP {status} for {symbol}")));
                        continue;
                    }

                    let summary: QuoteSummaryResponse = resp.json().map_err(|e| {
                        ProviderError::ResponseFormatChanged(format!(
                            "failed to parse response for {symbol}: {e}"
                        ))
                    })?;

                    let as_of = chrono::Local::now().date_naive();
                    let payload = Self::parse_response(symbol, as_of, summary)?;
                    self.circuit_breaker.record_success();
                    return Ok(payload);
                }
                Err(e) => {
                    if e.is_connect() || e.is_timeout() {
                        last_error = Some(ProviderError::NetworkUnreachable(e.to_string()));
                        continue;
                    }
                    return Err(ProviderError::NetworkUnreachable(e.to_string()));
                }
            }
        }

        Err(last_error.unwrap_or_else(|| ProviderError::Other("max retries exceeded".into())))
    }
}

impl AnalysisProvider for YahooAnalysisProvider {
    fn name(&self) -> &str {
        "yahoo_finance"
    }

    fn resolve(&self, symbol: &str) -> Result<Ticker, ProviderError> {
        let trimmed = symbol.trim();
        if trimmed.is_empty() {
            return Err(ProviderError::SymbolNotFound {
                symbol: symbol.to_string(),
            });
        }
        // Share classes use dots on the exchange, dashes on Yahoo (BRK.B -> BRK-B)
        Ok(Ticker(trimmed.to_uppercase().replace('.', "-")))
    }

    fn fetch_analysis(&self, ticker: &Ticker) -> Result<AnalysisPayload, ProviderError> {
        self.fetch_with_retry(ticker)
    }

    fn is_available(&self) -> bool {
        self.circuit_breaker.is_allowed()
    }
}

// ── Payload rendering ────────────────────────────────────────────────

/// Assemble the "Earnings Estimate" table from the trend points.
///
/// Only the wanted periods are kept, in schema order. Missing periods
/// shorten the table, which the record builder rejects as malformed.
fn estimate_table(trend: &[TrendPoint]) -> Option<AnalysisTable> {
    let points: Vec<&TrendPoint> = WANTED_PERIODS
        .iter()
        .filter_map(|wanted| trend.iter().find(|p| p.period == *wanted))
        .collect();

    if points.is_empty() {
        return None;
    }

    let period_labels = points.iter().map(|p| period_label(p)).collect();

    let rows = vec![
        metric_row("No. of Analysts", &points, |b| b.number_of_analysts.as_ref()),
        metric_row("Avg. Estimate", &points, |b| b.avg.as_ref()),
        metric_row("Low Estimate", &points, |b| b.low.as_ref()),
        metric_row("High Estimate", &points, |b| b.high.as_ref()),
        metric_row("Year Ago EPS", &points, |b| b.year_ago_eps.as_ref()),
    ];

    Some(AnalysisTable {
        name: "Earnings Estimate".to_string(),
        period_labels,
        rows,
    })
}

fn metric_row(
    label: &str,
    points: &[&TrendPoint],
    select: impl Fn(&EstimateBlock) -> Option<&RawFigure>,
) -> MetricRow {
    MetricRow {
        metric: label.to_string(),
        values: points
            .iter()
            .map(|p| render_figure(p.earnings_estimate.as_ref().and_then(|b| select(b))))
            .collect(),
    }
}

/// Render a figure the way the analysis page shows it, preferring Yahoo's
/// formatted string over the raw number. Unreported figures render as the
/// sentinel.
fn render_figure(figure: Option<&RawFigure>) -> String {
    match figure {
        Some(RawFigure { fmt: Some(fmt), .. }) => fmt.clone(),
        Some(RawFigure { raw: Some(raw), .. }) => raw.to_string(),
        _ => MISSING_SENTINEL.to_string(),
    }
}

/// Human label for a trend period: "1Q2025" for quarters, "2025" for years.
/// Falls back to the raw period code when the end date is missing or odd.
fn period_label(point: &TrendPoint) -> String {
    let end_date = point
        .end_date
        .as_deref()
        .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok());

    match (point.period.as_str(), end_date) {
        ("0q" | "+1q", Some(date)) => format!("{}Q{}", date.month0() / 3 + 1, date.year()),
        ("0y" | "+1y", Some(date)) => date.year().to_string(),
        _ => point.period.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL_RESPONSE: &str = r#"{
        "quoteSummary": {
            "result": [{
                "earningsTrend": {
                    "trend": [
                        {
                            "period": "0q",
                            "endDate": "2025-03-31",
                            "earningsEstimate": {
                                "avg": {"raw": 2.35, "fmt": "2.35"},
                                "low": {"raw": 2.18, "fmt": "2.18"},
                                "high": {"raw": 2.5, "fmt": "2.5"},
                                "yearAgoEps": {"raw": 1.88, "fmt": "1.88"},
                                "numberOfAnalysts": {"raw": 24, "fmt": "24"}
                            }
                        },
                        {
                            "period": "+1q",
                            "endDate": "2025-06-30",
                            "earningsEstimate": {
                                "avg": {},
                                "low": {},
                                "high": {},
                                "yearAgoEps": {"raw": 1.2, "fmt": "1.2"},
                                "numberOfAnalysts": {"raw": 21, "fmt": "21"}
                            }
                        },
                        {
                            "period": "0y",
                            "endDate": "2025-12-31",
                            "earningsEstimate": {
                                "avg": {"raw": 9.8, "fmt": "9.8"},
                                "low": {"raw": 9.1, "fmt": "9.1"},
                                "high": {"raw": 10.4, "fmt": "10.4"},
                                "yearAgoEps": {"raw": 8.05, "fmt": "8.05"},
                                "numberOfAnalysts": {"raw": 30, "fmt": "30"}
                            }
                        },
                        {
                            "period": "+1y",
                            "endDate": "2026-12-31",
                            "earningsEstimate": {
                                "avg": {"raw": 11.2, "fmt": "11.2"},
                                "low": {"raw": 10.0, "fmt": "10"},
                                "high": {"raw": 12.6, "fmt": "12.6"},
                                "yearAgoEps": {"raw": 9.8, "fmt": "9.8"},
                                "numberOfAnalysts": {"raw": 28, "fmt": "28"}
                            }
                        },
                        {
                            "period": "+5y",
                            "endDate": null,
                            "earningsEstimate": null
                        }
                    ]
                }
            }],
            "error": null
        }
    }"#;

    fn as_of() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 2, 14).unwrap()
    }

    #[test]
    fn parses_full_response_into_estimate_table() {
        let resp: QuoteSummaryResponse = serde_json::from_str(FULL_RESPONSE).unwrap();
        let payload = YahooAnalysisProvider::parse_response("AAPL", as_of(), resp).unwrap();

        assert_eq!(payload.as_of, as_of());
        assert_eq!(payload.tables.len(), 1);

        let table = &payload.tables[0];
        assert_eq!(table.name, "Earnings Estimate");
        assert_eq!(table.period_labels, vec!["1Q2025", "2Q2025", "2025", "2026"]);
        assert_eq!(table.rows.len(), 5);

        let analysts = table.row("No. of Analysts").unwrap();
        assert_eq!(analysts.values, vec!["24", "21", "30", "28"]);

        // Empty figure objects render as the sentinel
        let avg = table.row("Avg. Estimate").unwrap();
        assert_eq!(avg.values, vec!["2.35", "N/A", "9.8", "11.2"]);
    }

    #[test]
    fn missing_module_yields_payload_without_tables() {
        let json = r#"{"quoteSummary": {"result": [{"earningsTrend": null}], "error": null}}"#;
        let resp: QuoteSummaryResponse = serde_json::from_str(json).unwrap();
        let payload = YahooAnalysisProvider::parse_response("AAPL", as_of(), resp).unwrap();

        assert!(payload.tables.is_empty());
    }

    #[test]
    fn not_found_error_maps_to_symbol_not_found() {
        let json = r#"{
            "quoteSummary": {
                "result": null,
                "error": {"code": "Not Found", "description": "Quote not found for ticker symbol: BADSYM"}
            }
        }"#;
        let resp: QuoteSummaryResponse = serde_json::from_str(json).unwrap();
        let err = YahooAnalysisProvider::parse_response("BADSYM", as_of(), resp).unwrap_err();

        match err {
            ProviderError::SymbolNotFound { symbol } => assert_eq!(symbol, "BADSYM"),
            other => panic!("expected SymbolNotFound, got: {other:?}"),
        }
    }

    #[test]
    fn other_error_maps_to_format_change() {
        let json = r#"{
            "quoteSummary": {
                "result": null,
                "error": {"code": "Internal", "description": "boom"}
            }
        }"#;
        let resp: QuoteSummaryResponse = serde_json::from_str(json).unwrap();
        let err = YahooAnalysisProvider::parse_response("AAPL", as_of(), resp).unwrap_err();
        assert!(matches!(err, ProviderError::ResponseFormatChanged(_)));
    }

    #[test]
    fn quarter_labels_follow_calendar_quarters() {
        let point = TrendPoint {
            period: "0q".into(),
            end_date: Some("2025-09-30".into()),
            earnings_estimate: None,
        };
        assert_eq!(period_label(&point), "3Q2025");
    }

    #[test]
    fn missing_end_date_falls_back_to_period_code() {
        let point = TrendPoint {
            period: "+1y".into(),
            end_date: None,
            earnings_estimate: None,
        };
        assert_eq!(period_label(&point), "+1y");
    }

    #[test]
    fn short_trend_produces_short_table() {
        let json = r#"{
            "quoteSummary": {
                "result": [{
                    "earningsTrend": {
                        "trend": [
                            {"period": "0q", "endDate": "2025-03-31", "earningsEstimate": null}
                        ]
                    }
                }],
                "error": null
            }
        }"#;
        let resp: QuoteSummaryResponse = serde_json::from_str(json).unwrap();
        let payload = YahooAnalysisProvider::parse_response("AAPL", as_of(), resp).unwrap();

        // One wanted period present: one label, sentinel cells everywhere
        let table = &payload.tables[0];
        assert_eq!(table.period_labels.len(), 1);
        assert_eq!(table.row("Avg. Estimate").unwrap().values, vec!["N/A"]);
    }

    #[test]
    fn resolve_maps_share_class_dots_to_dashes() {
        let provider = YahooAnalysisProvider::new(Arc::new(CircuitBreaker::default_provider()));
        assert_eq!(provider.resolve("brk.b").unwrap(), Ticker("BRK-B".into()));
        assert_eq!(provider.resolve(" AAPL ").unwrap(), Ticker("AAPL".into()));
        assert!(matches!(
            provider.resolve("  "),
            Err(ProviderError::SymbolNotFound { .. })
        ));
    }
}
