//! Field formatting: raw provider text to typed values.
//!
//! Pure and table-driven: the sentinel check comes first, then the field name
//! picks a typing rule from the schema. A field no rule matches is an error,
//! which is where a renamed provider column surfaces.

use crate::domain::FieldValue;
use crate::schema::{self, FieldKind};
use thiserror::Error;

/// The provider's marker for a figure it does not report.
pub const MISSING_SENTINEL: &str = "N/A";

#[derive(Debug, Error)]
pub enum FormatError {
    #[error("unrecognized field: {0}")]
    UnrecognizedField(String),

    #[error("malformed value for {field}: '{raw}'")]
    MalformedValue { field: String, raw: String },
}

/// Convert one raw cell into its typed value.
///
/// The sentinel wins over field classification: "N/A" maps to Absent even
/// under a header the schema does not recognize.
pub fn format_value(field: &str, raw: &str) -> Result<FieldValue, FormatError> {
    if raw == MISSING_SENTINEL {
        return Ok(FieldValue::Absent);
    }

    let kind = schema::classify(field)
        .ok_or_else(|| FormatError::UnrecognizedField(field.to_string()))?;

    match kind {
        FieldKind::AnalystCount | FieldKind::FiscalYear => raw
            .parse::<i64>()
            .map(FieldValue::Int)
            .map_err(|_| malformed(field, raw)),
        FieldKind::EpsValue => raw
            .parse::<f64>()
            .map(FieldValue::Float)
            .map_err(|_| malformed(field, raw)),
        FieldKind::PeriodLabel => Ok(FieldValue::Text(raw.to_string())),
    }
}

fn malformed(field: &str, raw: &str) -> FormatError {
    FormatError::MalformedValue {
        field: field.to_string(),
        raw: raw.to_string(),
    }
}
