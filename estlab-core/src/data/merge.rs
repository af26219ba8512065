//! Dataset merge: stack a collection pass onto the stored dataset and
//! canonicalize the result.
//!
//! Fresh rows are stacked above the previous dataset, so the stable
//! first-keep dedup resolves every (symbol, date) collision in favor of
//! the fresh row.

use super::collect::CollectionOutcome;
use crate::domain::{EstimateRecord, FieldValue};
use crate::schema::{self, FieldKind, SchemaError};
use chrono::NaiveDate;
use polars::prelude::*;
use thiserror::Error;

/// Errors from frame construction and merging.
#[derive(Debug, Error)]
pub enum MergeError {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error("frame error: {0}")]
    Frame(String),
}

/// Build a conforming DataFrame from collected records.
///
/// Absent values become nulls. An empty record list still yields a frame
/// with the full typed schema.
pub fn records_to_frame(records: &[&EstimateRecord]) -> Result<DataFrame, MergeError> {
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap();

    let symbols: Vec<String> = records.iter().map(|r| r.symbol().to_string()).collect();
    let dates: Vec<i32> = records
        .iter()
        .map(|r| (r.date() - epoch).num_days() as i32)
        .collect();

    let mut columns: Vec<Column> = Vec::with_capacity(2 + schema::DATA_FIELDS.len());
    columns.push(Column::new("symbol".into(), symbols));
    columns.push(
        Column::new("date".into(), dates)
            .cast(&DataType::Date)
            .map_err(|e| MergeError::Frame(format!("date cast: {e}")))?,
    );

    for field in schema::DATA_FIELDS {
        let column = match field.kind {
            FieldKind::AnalystCount | FieldKind::FiscalYear => {
                let vals: Vec<Option<i64>> = records
                    .iter()
                    .map(|r| r.get(field.name).and_then(FieldValue::as_i64))
                    .collect();
                Column::new(field.name.into(), vals)
            }
            FieldKind::EpsValue => {
                let vals: Vec<Option<f64>> = records
                    .iter()
                    .map(|r| r.get(field.name).and_then(FieldValue::as_f64))
                    .collect();
                Column::new(field.name.into(), vals)
            }
            FieldKind::PeriodLabel => {
                let vals: Vec<Option<String>> = records
                    .iter()
                    .map(|r| {
                        r.get(field.name)
                            .and_then(FieldValue::as_str)
                            .map(str::to_string)
                    })
                    .collect();
                Column::new(field.name.into(), vals)
            }
        };
        columns.push(column);
    }

    DataFrame::new(columns).map_err(|e| MergeError::Frame(format!("dataframe creation: {e}")))
}

/// Merge a collection pass into the dataset.
///
/// The previous dataset, when given, is validated, reordered to canonical
/// column order, and stacked below the fresh rows before canonicalization.
pub fn merge_dataset(
    outcome: &CollectionOutcome,
    existing: Option<DataFrame>,
) -> Result<DataFrame, MergeError> {
    let mut stacked = records_to_frame(&outcome.records())?;

    if let Some(previous) = existing {
        schema::validate(&previous)?;
        let previous = previous
            .select(schema::column_names())
            .map_err(|e| MergeError::Frame(format!("column order: {e}")))?;
        stacked
            .vstack_mut(&previous)
            .map_err(|e| MergeError::Frame(format!("stack previous data: {e}")))?;
    }

    canonicalize(stacked.lazy())
        .collect()
        .map_err(|e| MergeError::Frame(format!("canonicalize: {e}")))
}

/// Canonicalize a dataset: sort ascending by (symbol, date), then drop
/// key duplicates keeping the first occurrence.
pub fn canonicalize(df: LazyFrame) -> LazyFrame {
    df.sort(
        ["symbol", "date"],
        SortMultipleOptions::default()
            .with_order_descending_multi([false, false])
            .with_maintain_order(true),
    )
    .unique_stable(
        Some(vec!["symbol".into(), "date".into()]),
        UniqueKeepStrategy::First,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 2, d).unwrap()
    }

    fn record(symbol: &str, date: NaiveDate, analysts: i64, avg: Option<f64>) -> EstimateRecord {
        let values = schema::DATA_FIELDS
            .iter()
            .map(|f| match f.kind {
                FieldKind::AnalystCount => FieldValue::Int(analysts),
                FieldKind::EpsValue => match avg {
                    Some(x) => FieldValue::Float(x),
                    None => FieldValue::Absent,
                },
                FieldKind::PeriodLabel => FieldValue::Text("1Q2025".into()),
                FieldKind::FiscalYear => FieldValue::Int(2025),
            })
            .collect();
        EstimateRecord::new(symbol, date, values)
    }

    fn outcome_of(records: Vec<EstimateRecord>) -> CollectionOutcome {
        let results: BTreeMap<String, Option<EstimateRecord>> = records
            .into_iter()
            .map(|r| (r.symbol().to_string(), Some(r)))
            .collect();
        CollectionOutcome { results }
    }

    fn analysts_at(df: &DataFrame, idx: usize) -> Option<i64> {
        df.column("no_of_analysts_current_qtr")
            .unwrap()
            .i64()
            .unwrap()
            .get(idx)
    }

    #[test]
    fn frame_conforms_to_schema() {
        let a = record("AAPL", day(14), 24, Some(2.35));
        let b = record("MSFT", day(14), 30, Some(3.1));
        let df = records_to_frame(&[&a, &b]).unwrap();

        assert_eq!(df.height(), 2);
        schema::validate(&df).unwrap();
    }

    #[test]
    fn empty_outcome_still_yields_typed_frame() {
        let df = records_to_frame(&[]).unwrap();
        assert_eq!(df.height(), 0);
        schema::validate(&df).unwrap();
    }

    #[test]
    fn absent_values_become_nulls() {
        let a = record("AAPL", day(14), 24, None);
        let df = records_to_frame(&[&a]).unwrap();

        let avg = df.column("avg_estimate_current_qtr").unwrap().f64().unwrap();
        assert_eq!(avg.get(0), None);
    }

    #[test]
    fn merge_sorts_by_symbol_then_date() {
        let outcome = outcome_of(vec![
            record("MSFT", day(14), 30, Some(3.1)),
            record("AAPL", day(14), 24, Some(2.35)),
        ]);
        let merged = merge_dataset(&outcome, None).unwrap();

        let symbols = merged.column("symbol").unwrap().str().unwrap();
        assert_eq!(symbols.get(0), Some("AAPL"));
        assert_eq!(symbols.get(1), Some("MSFT"));
    }

    #[test]
    fn merge_prefers_fresh_rows_on_key_collision() {
        let old = outcome_of(vec![record("AAPL", day(14), 5, Some(1.0))]);
        let previous = merge_dataset(&old, None).unwrap();

        let fresh = outcome_of(vec![record("AAPL", day(14), 24, Some(2.35))]);
        let merged = merge_dataset(&fresh, Some(previous)).unwrap();

        assert_eq!(merged.height(), 1);
        assert_eq!(analysts_at(&merged, 0), Some(24));
    }

    #[test]
    fn merge_keeps_rows_with_distinct_dates() {
        let old = outcome_of(vec![record("AAPL", day(10), 20, Some(2.0))]);
        let previous = merge_dataset(&old, None).unwrap();

        let fresh = outcome_of(vec![record("AAPL", day(14), 24, Some(2.35))]);
        let merged = merge_dataset(&fresh, Some(previous)).unwrap();

        assert_eq!(merged.height(), 2);
        // Ascending by date within the symbol
        assert_eq!(analysts_at(&merged, 0), Some(20));
        assert_eq!(analysts_at(&merged, 1), Some(24));
    }

    #[test]
    fn merge_rejects_nonconforming_previous_data() {
        let bad = df!("symbol" => &["AAPL"]).unwrap();
        let outcome = outcome_of(vec![record("AAPL", day(14), 24, Some(2.35))]);

        let err = merge_dataset(&outcome, Some(bad)).unwrap_err();
        assert!(matches!(err, MergeError::Schema(SchemaError::MissingColumn(_))));
    }

    #[test]
    fn merge_with_skips_only_keeps_previous_rows() {
        let old = outcome_of(vec![record("AAPL", day(10), 20, Some(2.0))]);
        let previous = merge_dataset(&old, None).unwrap();

        let skipped_only = CollectionOutcome {
            results: BTreeMap::from([("BADSYM".to_string(), None)]),
        };
        let merged = merge_dataset(&skipped_only, Some(previous)).unwrap();

        assert_eq!(merged.height(), 1);
        assert_eq!(analysts_at(&merged, 0), Some(20));
    }
}
