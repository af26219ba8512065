//! Domain types: typed cell values and estimate records.

pub mod record;
pub mod value;

pub use record::EstimateRecord;
pub use value::FieldValue;
