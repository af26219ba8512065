//! Estimate records: one symbol's normalized analysis snapshot.

use super::FieldValue;
use crate::schema;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One normalized dataset row: a symbol, the snapshot date, and a typed value
/// for every data column, held in [`schema::DATA_FIELDS`] order.
///
/// Lookups go through [`EstimateRecord::get`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EstimateRecord {
    symbol: String,
    date: NaiveDate,
    values: Vec<FieldValue>,
}

impl EstimateRecord {
    /// Build a record from values aligned to [`schema::DATA_FIELDS`] order.
    pub fn new(symbol: impl Into<String>, date: NaiveDate, values: Vec<FieldValue>) -> Self {
        debug_assert_eq!(values.len(), schema::DATA_FIELDS.len());
        Self {
            symbol: symbol.into(),
            date,
            values,
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    /// Look up a data field by its schema name.
    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.values.get(schema::field_position(field)?)
    }

    /// Iterate (field name, value) pairs in schema order.
    pub fn fields(&self) -> impl Iterator<Item = (&'static str, &FieldValue)> {
        schema::DATA_FIELDS
            .iter()
            .map(|f| f.name)
            .zip(self.values.iter())
    }
}
