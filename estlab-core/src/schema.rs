//! Dataset schema contract: the fixed column set every estimate table conforms to.
//!
//! Defines the exact column names, their order, the typing rule that governs
//! each data field, and the Polars dtypes the persisted table must carry.
//! Used for validation when loading or merging datasets.

use polars::prelude::*;
use thiserror::Error;

/// Key columns present in every dataset, ahead of the data fields.
pub const KEY_COLUMNS: [&str; 2] = ["symbol", "date"];

/// How a data field's raw text is typed, and which dtype its column carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Analyst headcounts, stored as integers.
    AnalystCount,
    /// Estimate and year-ago EPS figures, stored as floats.
    EpsValue,
    /// Fiscal quarter labels like "1Q2025", passed through as text.
    PeriodLabel,
    /// Fiscal years like "2025", stored as integers.
    FiscalYear,
}

impl FieldKind {
    /// Polars dtype for a column of this kind. All data columns are nullable.
    pub fn dtype(self) -> DataType {
        match self {
            FieldKind::AnalystCount | FieldKind::FiscalYear => DataType::Int64,
            FieldKind::EpsValue => DataType::Float64,
            FieldKind::PeriodLabel => DataType::String,
        }
    }
}

/// A single data field in the dataset schema.
#[derive(Debug, Clone)]
pub struct SchemaField {
    pub name: &'static str,
    pub kind: FieldKind,
}

/// The data fields of the dataset, in canonical column order.
///
/// Together with [`KEY_COLUMNS`] this is the full table contract:
/// - Columns: symbol, date, then these 24 fields
/// - Sort order: ascending by (symbol, date)
/// - Keys: no two rows share a (symbol, date) pair
pub const DATA_FIELDS: &[SchemaField] = &[
    SchemaField { name: "current_qtr", kind: FieldKind::PeriodLabel },
    SchemaField { name: "no_of_analysts_current_qtr", kind: FieldKind::AnalystCount },
    SchemaField { name: "next_qtr", kind: FieldKind::PeriodLabel },
    SchemaField { name: "no_of_analysts_next_qtr", kind: FieldKind::AnalystCount },
    SchemaField { name: "current_year", kind: FieldKind::FiscalYear },
    SchemaField { name: "no_of_analysts_current_year", kind: FieldKind::AnalystCount },
    SchemaField { name: "next_year", kind: FieldKind::FiscalYear },
    SchemaField { name: "no_of_analysts_next_year", kind: FieldKind::AnalystCount },
    SchemaField { name: "avg_estimate_current_qtr", kind: FieldKind::EpsValue },
    SchemaField { name: "avg_estimate_next_qtr", kind: FieldKind::EpsValue },
    SchemaField { name: "avg_estimate_current_year", kind: FieldKind::EpsValue },
    SchemaField { name: "avg_estimate_next_year", kind: FieldKind::EpsValue },
    SchemaField { name: "low_estimate_current_qtr", kind: FieldKind::EpsValue },
    SchemaField { name: "low_estimate_next_qtr", kind: FieldKind::EpsValue },
    SchemaField { name: "low_estimate_current_year", kind: FieldKind::EpsValue },
    SchemaField { name: "low_estimate_next_year", kind: FieldKind::EpsValue },
    SchemaField { name: "high_estimate_current_qtr", kind: FieldKind::EpsValue },
    SchemaField { name: "high_estimate_next_qtr", kind: FieldKind::EpsValue },
    SchemaField { name: "high_estimate_current_year", kind: FieldKind::EpsValue },
    SchemaField { name: "high_estimate_next_year", kind: FieldKind::EpsValue },
    SchemaField { name: "year_ago_eps_current_qtr", kind: FieldKind::EpsValue },
    SchemaField { name: "year_ago_eps_next_qtr", kind: FieldKind::EpsValue },
    SchemaField { name: "year_ago_eps_current_year", kind: FieldKind::EpsValue },
    SchemaField { name: "year_ago_eps_next_year", kind: FieldKind::EpsValue },
];

/// Field classification rule: prefix families first, then exact labels.
enum Matcher {
    Prefix(&'static str),
    Exact(&'static str),
}

/// Typing rules for data fields, checked in order. First match wins.
const FIELD_RULES: &[(Matcher, FieldKind)] = &[
    (Matcher::Prefix("no_of_analysts"), FieldKind::AnalystCount),
    (Matcher::Prefix("avg_estimate"), FieldKind::EpsValue),
    (Matcher::Prefix("low_estimate"), FieldKind::EpsValue),
    (Matcher::Prefix("high_estimate"), FieldKind::EpsValue),
    (Matcher::Prefix("year_ago_eps"), FieldKind::EpsValue),
    (Matcher::Exact("current_qtr"), FieldKind::PeriodLabel),
    (Matcher::Exact("next_qtr"), FieldKind::PeriodLabel),
    (Matcher::Exact("current_year"), FieldKind::FiscalYear),
    (Matcher::Exact("next_year"), FieldKind::FiscalYear),
];

/// Classify a field name against the typing rules.
///
/// Returns None for a field the schema does not recognize; the formatter
/// turns that into a hard error.
pub fn classify(field: &str) -> Option<FieldKind> {
    FIELD_RULES.iter().find_map(|(matcher, kind)| match matcher {
        Matcher::Prefix(prefix) if field.starts_with(prefix) => Some(*kind),
        Matcher::Exact(exact) if field == *exact => Some(*kind),
        _ => None,
    })
}

/// All column names in canonical order: symbol, date, then data fields.
pub fn column_names() -> Vec<&'static str> {
    KEY_COLUMNS
        .iter()
        .copied()
        .chain(DATA_FIELDS.iter().map(|f| f.name))
        .collect()
}

/// Position of a data field within [`DATA_FIELDS`].
pub fn field_position(name: &str) -> Option<usize> {
    DATA_FIELDS.iter().position(|f| f.name == name)
}

/// The canonical Polars schema for a persisted dataset.
pub fn polars_schema() -> Schema {
    let mut fields = vec![
        Field::new("symbol".into(), DataType::String),
        Field::new("date".into(), DataType::Date),
    ];
    for f in DATA_FIELDS {
        fields.push(Field::new(f.name.into(), f.kind.dtype()));
    }
    Schema::from_iter(fields)
}

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("missing required column: {0}")]
    MissingColumn(String),

    #[error("type mismatch in column {column}: expected {expected:?}, got {actual:?}")]
    TypeMismatch {
        column: String,
        expected: DataType,
        actual: DataType,
    },
}

/// Validate a DataFrame against the dataset schema.
///
/// Every expected column must be present with the expected dtype. Extra
/// columns are tolerated here; the merger drops them when it reorders
/// columns into canonical order.
pub fn validate(df: &DataFrame) -> Result<(), SchemaError> {
    let expected = polars_schema();
    let actual = df.schema();

    for field in expected.iter_fields() {
        let actual_dtype = actual
            .get(field.name())
            .ok_or_else(|| SchemaError::MissingColumn(field.name().to_string()))?;
        if actual_dtype != field.dtype() {
            return Err(SchemaError::TypeMismatch {
                column: field.name().to_string(),
                expected: field.dtype().clone(),
                actual: actual_dtype.clone(),
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_has_26_columns() {
        assert_eq!(column_names().len(), 26);
        assert_eq!(DATA_FIELDS.len(), 24);
    }

    #[test]
    fn key_columns_come_first() {
        let names = column_names();
        assert_eq!(names[0], "symbol");
        assert_eq!(names[1], "date");
        assert_eq!(names[2], "current_qtr");
        assert_eq!(names[25], "year_ago_eps_next_year");
    }

    #[test]
    fn declared_kinds_agree_with_rules() {
        for field in DATA_FIELDS {
            assert_eq!(
                classify(field.name),
                Some(field.kind),
                "rule mismatch for {}",
                field.name
            );
        }
    }

    #[test]
    fn classify_rejects_unknown_fields() {
        assert_eq!(classify("revenue_estimate_current_qtr"), None);
        assert_eq!(classify("symbol"), None);
        assert_eq!(classify(""), None);
    }

    #[test]
    fn classify_matches_prefix_families() {
        assert_eq!(classify("no_of_analysts_next_year"), Some(FieldKind::AnalystCount));
        assert_eq!(classify("avg_estimate_current_qtr"), Some(FieldKind::EpsValue));
        assert_eq!(classify("year_ago_eps_next_qtr"), Some(FieldKind::EpsValue));
        assert_eq!(classify("current_qtr"), Some(FieldKind::PeriodLabel));
        assert_eq!(classify("next_year"), Some(FieldKind::FiscalYear));
    }

    #[test]
    fn validate_accepts_conforming_frame() {
        let mut columns = vec![
            Column::new("symbol".into(), Vec::<String>::new()),
            Column::new("date".into(), Vec::<i32>::new())
                .cast(&DataType::Date)
                .unwrap(),
        ];
        for f in DATA_FIELDS {
            let col = match f.kind {
                FieldKind::AnalystCount | FieldKind::FiscalYear => {
                    Column::new(f.name.into(), Vec::<Option<i64>>::new())
                }
                FieldKind::EpsValue => Column::new(f.name.into(), Vec::<Option<f64>>::new()),
                FieldKind::PeriodLabel => Column::new(f.name.into(), Vec::<Option<String>>::new()),
            };
            columns.push(col);
        }
        let df = DataFrame::new(columns).unwrap();

        assert!(validate(&df).is_ok());
    }

    #[test]
    fn validate_rejects_missing_column() {
        let df = df!(
            "symbol" => &["AAPL"],
            "current_qtr" => &["1Q2025"],
        )
        .unwrap();

        let err = validate(&df).unwrap_err();
        assert!(matches!(err, SchemaError::MissingColumn(_)));
    }

    #[test]
    fn validate_rejects_wrong_dtype() {
        let mut columns = vec![
            Column::new("symbol".into(), Vec::<String>::new()),
            Column::new("date".into(), Vec::<i32>::new())
                .cast(&DataType::Date)
                .unwrap(),
        ];
        for f in DATA_FIELDS {
            // Everything as text: numeric columns now carry the wrong dtype.
            columns.push(Column::new(f.name.into(), Vec::<Option<String>>::new()));
        }
        let df = DataFrame::new(columns).unwrap();

        let err = validate(&df).unwrap_err();
        assert!(matches!(err, SchemaError::TypeMismatch { .. }));
    }
}
