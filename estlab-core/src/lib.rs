//! EstLab Core: analyst estimate collection, typing, merging, and storage.
//!
//! This crate contains the whole collection pipeline:
//! - Dataset schema contract (column names, field kinds, dtypes)
//! - Field formatter turning raw provider text into typed values
//! - Record builder assembling one typed record per symbol
//! - Batch collector with per-symbol failure isolation
//! - Dataset merger (stack, dedup, sort) and the Parquet store
//! - Yahoo Finance analysis provider with retry and circuit breaking

pub mod data;
pub mod domain;
pub mod export;
pub mod format;
pub mod pipeline;
pub mod schema;
