//! Parquet dataset store.
//!
//! Layout: `{root}/{name}.parquet` with a `{name}.meta.json` sidecar
//! carrying row counts, the tag date, and a content hash.
//!
//! Writes are atomic (write to .tmp, rename into place). Loads validate
//! the frame against the dataset schema before handing it out.

use crate::schema::{self, SchemaError};
use chrono::NaiveDate;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors from dataset persistence.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no dataset named '{name}' (run `collect` first)")]
    NoDataset { name: String },

    #[error("store I/O error: {0}")]
    Io(String),

    #[error("parquet error: {0}")]
    Parquet(String),

    #[error(transparent)]
    Schema(#[from] SchemaError),
}

/// Metadata sidecar for a stored dataset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetMeta {
    pub name: String,
    pub row_count: usize,
    pub symbol_count: usize,
    pub tag_date: NaiveDate,
    pub data_hash: String,
    pub saved_at: chrono::NaiveDateTime,
}

/// The dataset store.
pub struct DatasetStore {
    root: PathBuf,
}

impl DatasetStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory of the store.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path to the Parquet file for a dataset.
    fn dataset_path(&self, name: &str) -> PathBuf {
        self.root.join(format!("{name}.parquet"))
    }

    /// Path to the metadata sidecar for a dataset.
    fn meta_path(&self, name: &str) -> PathBuf {
        self.root.join(format!("{name}.meta.json"))
    }

    pub fn exists(&self, name: &str) -> bool {
        self.dataset_path(name).exists()
    }

    /// Persist a dataset, replacing any previous version.
    pub fn save(
        &self,
        name: &str,
        df: &DataFrame,
        tag_date: NaiveDate,
    ) -> Result<DatasetMeta, StoreError> {
        schema::validate(df)?;

        fs::create_dir_all(&self.root)
            .map_err(|e| StoreError::Io(format!("failed to create dir: {e}")))?;

        let path = self.dataset_path(name);
        let tmp_path = path.with_extension("parquet.tmp");

        write_parquet(df, &tmp_path)?;

        // Atomic rename
        fs::rename(&tmp_path, &path).map_err(|e| {
            // Clean up temp file on rename failure
            let _ = fs::remove_file(&tmp_path);
            StoreError::Io(format!("atomic rename failed: {e}"))
        })?;

        let bytes = fs::read(&path).map_err(|e| StoreError::Io(format!("hash read: {e}")))?;
        let symbol_count = df
            .column("symbol")
            .and_then(|c| c.str())
            .and_then(|ca| ca.n_unique())
            .map_err(|e| StoreError::Parquet(format!("symbol count: {e}")))?;

        let meta = DatasetMeta {
            name: name.to_string(),
            row_count: df.height(),
            symbol_count,
            tag_date,
            data_hash: blake3::hash(&bytes).to_hex().to_string(),
            saved_at: chrono::Local::now().naive_local(),
        };
        let meta_json = serde_json::to_string_pretty(&meta)
            .map_err(|e| StoreError::Io(format!("meta serialization: {e}")))?;
        fs::write(self.meta_path(name), meta_json)
            .map_err(|e| StoreError::Io(format!("meta write: {e}")))?;

        Ok(meta)
    }

    /// Load a dataset and validate it against the schema.
    pub fn load(&self, name: &str) -> Result<DataFrame, StoreError> {
        let path = self.dataset_path(name);
        if !path.exists() {
            return Err(StoreError::NoDataset {
                name: name.to_string(),
            });
        }

        let file = fs::File::open(&path).map_err(|e| StoreError::Io(format!("open: {e}")))?;
        let df = ParquetReader::new(file)
            .finish()
            .map_err(|e| StoreError::Parquet(format!("read parquet: {e}")))?;

        schema::validate(&df)?;
        Ok(df)
    }

    /// Read the metadata sidecar for a dataset, if present and parseable.
    pub fn meta(&self, name: &str) -> Option<DatasetMeta> {
        let content = fs::read_to_string(self.meta_path(name)).ok()?;
        serde_json::from_str(&content).ok()
    }

    /// List all stored datasets by their sidecars, sorted by name.
    pub fn list(&self) -> Vec<DatasetMeta> {
        let Ok(entries) = fs::read_dir(&self.root) else {
            return Vec::new();
        };

        let mut metas: Vec<DatasetMeta> = entries
            .filter_map(|entry| {
                let path = entry.ok()?.path();
                let name = path.file_name()?.to_str()?;
                if !name.ends_with(".meta.json") {
                    return None;
                }
                let content = fs::read_to_string(&path).ok()?;
                serde_json::from_str(&content).ok()
            })
            .collect();

        metas.sort_by(|a, b| a.name.cmp(&b.name));
        metas
    }
}

/// Write a DataFrame to a Parquet file.
fn write_parquet(df: &DataFrame, path: &Path) -> Result<(), StoreError> {
    let file =
        fs::File::create(path).map_err(|e| StoreError::Io(format!("create file: {e}")))?;
    ParquetWriter::new(file)
        .finish(&mut df.clone())
        .map_err(|e| StoreError::Parquet(format!("write parquet: {e}")))?;
    Ok(())
}
