//! Record builder: turns one symbol's raw analysis payload into a typed
//! estimate record.
//!
//! The builder owns the mapping between schema field names and payload
//! cells. Period fields take their value from the table's column labels;
//! every other field addresses a metric row by label and a column by its
//! period suffix. All typing goes through the field formatter.

use super::provider::{AnalysisPayload, AnalysisTable};
use crate::domain::EstimateRecord;
use crate::format::{self, FormatError};
use crate::schema;
use thiserror::Error;

/// The payload table the estimate dataset is built from.
const ESTIMATE_TABLE: &str = "Earnings Estimate";

/// Period column suffixes, in provider column order.
const PERIOD_SUFFIXES: [&str; 4] = ["current_qtr", "next_qtr", "current_year", "next_year"];

/// Schema field prefix paired with the payload row that feeds it.
const METRIC_ROWS: [(&str, &str); 5] = [
    ("no_of_analysts", "No. of Analysts"),
    ("avg_estimate", "Avg. Estimate"),
    ("low_estimate", "Low Estimate"),
    ("high_estimate", "High Estimate"),
    ("year_ago_eps", "Year Ago EPS"),
];

/// Errors from assembling a record out of a payload.
///
/// All variants describe a defect in one symbol's payload. Batch collection
/// treats them as recoverable and moves on to the next symbol.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("missing section '{0}' in analysis payload")]
    MissingSection(&'static str),

    #[error("malformed section '{section}': {detail}")]
    MalformedSection {
        section: &'static str,
        detail: String,
    },

    #[error(transparent)]
    Format(#[from] FormatError),
}

/// Build the estimate record for one symbol from its analysis payload.
///
/// The record's date is the payload's as-of date. Values land in schema
/// field order.
pub fn build_record(symbol: &str, payload: &AnalysisPayload) -> Result<EstimateRecord, BuildError> {
    let table = payload
        .tables
        .iter()
        .find(|t| t.name == ESTIMATE_TABLE)
        .ok_or(BuildError::MissingSection(ESTIMATE_TABLE))?;

    if table.period_labels.len() != PERIOD_SUFFIXES.len() {
        return Err(BuildError::MalformedSection {
            section: ESTIMATE_TABLE,
            detail: format!(
                "expected {} period columns, found {}",
                PERIOD_SUFFIXES.len(),
                table.period_labels.len()
            ),
        });
    }

    let mut values = Vec::with_capacity(schema::DATA_FIELDS.len());
    for field in schema::DATA_FIELDS {
        let raw = cell(table, field.name)?;
        values.push(format::format_value(field.name, raw)?);
    }

    Ok(EstimateRecord::new(symbol, payload.as_of, values))
}

/// Locate the raw cell that feeds a schema field.
fn cell<'a>(table: &'a AnalysisTable, field: &str) -> Result<&'a str, BuildError> {
    // The four period fields carry the column labels themselves
    if let Some(idx) = PERIOD_SUFFIXES.iter().position(|s| *s == field) {
        return Ok(&table.period_labels[idx]);
    }

    for (prefix, label) in METRIC_ROWS {
        let Some(rest) = field.strip_prefix(prefix) else {
            continue;
        };
        let Some(suffix) = rest.strip_prefix('_') else {
            continue;
        };
        let Some(idx) = PERIOD_SUFFIXES.iter().position(|s| *s == suffix) else {
            continue;
        };

        let row = table
            .row(label)
            .ok_or_else(|| BuildError::MalformedSection {
                section: ESTIMATE_TABLE,
                detail: format!("missing row '{label}'"),
            })?;

        return row
            .values
            .get(idx)
            .map(String::as_str)
            .ok_or_else(|| BuildError::MalformedSection {
                section: ESTIMATE_TABLE,
                detail: format!(
                    "row '{label}' has {} cells, need {}",
                    row.values.len(),
                    idx + 1
                ),
            });
    }

    Err(BuildError::MalformedSection {
        section: ESTIMATE_TABLE,
        detail: format!("field '{field}' has no source cell"),
    })
}
