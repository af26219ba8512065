//! CSV export for stored datasets.
//!
//! Columns come out in canonical schema order. Nulls render as empty
//! cells, matching how the dataset looks in spreadsheet tools.

use crate::schema::{self, FieldKind, SchemaError};
use chrono::{Duration, NaiveDate};
use polars::prelude::*;
use thiserror::Error;

/// Errors from rendering a dataset as CSV.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error("csv error: {0}")]
    Csv(String),

    #[error("frame error: {0}")]
    Frame(String),
}

/// Render a dataset as CSV with a header row.
pub fn export_csv(df: &DataFrame) -> Result<String, ExportError> {
    schema::validate(df)?;

    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(schema::column_names())
        .map_err(|e| ExportError::Csv(e.to_string()))?;

    let frame_err = |e: PolarsError| ExportError::Frame(format!("column read: {e}"));

    // Render column by column, then emit row-wise
    let mut cells: Vec<Vec<String>> = Vec::with_capacity(2 + schema::DATA_FIELDS.len());

    let symbols = df.column("symbol").map_err(frame_err)?.str().map_err(frame_err)?;
    cells.push(symbols.iter().map(|s| s.unwrap_or("").to_string()).collect());

    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap();
    let dates = df.column("date").map_err(frame_err)?.date().map_err(frame_err)?;
    cells.push(
        dates
            .iter()
            .map(|d| match d {
                Some(days) => (epoch + Duration::days(days as i64)).to_string(),
                None => String::new(),
            })
            .collect(),
    );

    for field in schema::DATA_FIELDS {
        let column = df.column(field.name).map_err(frame_err)?;
        let rendered: Vec<String> = match field.kind {
            FieldKind::AnalystCount | FieldKind::FiscalYear => column
                .i64()
                .map_err(frame_err)?
                .iter()
                .map(|v| v.map(|x| x.to_string()).unwrap_or_default())
                .collect(),
            FieldKind::EpsValue => column
                .f64()
                .map_err(frame_err)?
                .iter()
                .map(|v| v.map(|x| x.to_string()).unwrap_or_default())
                .collect(),
            FieldKind::PeriodLabel => column
                .str()
                .map_err(frame_err)?
                .iter()
                .map(|v| v.unwrap_or("").to_string())
                .collect(),
        };
        cells.push(rendered);
    }

    for i in 0..df.height() {
        let row: Vec<&str> = cells.iter().map(|c| c[i].as_str()).collect();
        wtr.write_record(row)
            .map_err(|e| ExportError::Csv(e.to_string()))?;
    }

    let data = wtr
        .into_inner()
        .map_err(|e| ExportError::Csv(e.to_string()))?;
    String::from_utf8(data).map_err(|e| ExportError::Csv(e.to_string()))
}
