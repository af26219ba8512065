//! Universe configuration: grouped symbol lists.
//!
//! A universe is a TOML file of named groups and their member symbols.
//! Groups are organizational only; collection flattens them into one
//! deduplicated symbol list.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use thiserror::Error;

/// Errors from loading a universe file.
#[derive(Debug, Error)]
pub enum UniverseError {
    #[error("read universe file: {0}")]
    Read(String),

    #[error("parse universe TOML: {0}")]
    Parse(String),
}

/// The complete universe configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Universe {
    pub groups: BTreeMap<String, Vec<String>>,
}

impl Universe {
    /// Load a universe from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, UniverseError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| UniverseError::Read(e.to_string()))?;
        Self::from_toml(&content)
    }

    /// Parse a universe from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, UniverseError> {
        toml::from_str(content).map_err(|e| UniverseError::Parse(e.to_string()))
    }

    /// All symbols across all groups, first occurrence kept.
    pub fn all_symbols(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.groups
            .values()
            .flat_map(|symbols| symbols.iter().map(|s| s.as_str()))
            .filter(|s| seen.insert(*s))
            .collect()
    }

    /// Symbols for a specific group.
    pub fn group(&self, name: &str) -> Option<&[String]> {
        self.groups.get(name).map(|v| v.as_slice())
    }

    /// The list of group names.
    pub fn group_names(&self) -> Vec<&str> {
        self.groups.keys().map(|s| s.as_str()).collect()
    }

    /// Number of distinct symbols.
    pub fn symbol_count(&self) -> usize {
        self.all_symbols().len()
    }
}
