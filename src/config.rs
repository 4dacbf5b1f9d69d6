// ABOUTME: Transfer configuration loaded from TOML and merged with CLI flags
// ABOUTME: Controls reserved table prefixes, table selection, and verification depth

use crate::error::MigrationError;
use crate::filters::TableFilter;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Prefix of the schema-history tables written by Flyway
pub const DEFAULT_RESERVED_PREFIX: &str = "flyway_";

/// Settings for one transfer run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TransferConfig {
    /// Tables whose names start with any of these are never planned
    pub reserved_prefixes: Vec<String>,
    /// When set, only these tables are planned
    pub include_tables: Option<Vec<String>>,
    /// Tables left out of the plan
    pub exclude_tables: Vec<String>,
    /// Compare content digests in addition to row counts
    pub checksum: bool,
    /// Treat the overwrite confirmation as already given
    pub assume_yes: bool,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            reserved_prefixes: vec![DEFAULT_RESERVED_PREFIX.to_string()],
            include_tables: None,
            exclude_tables: Vec::new(),
            checksum: false,
            assume_yes: false,
        }
    }
}

impl TransferConfig {
    /// Table filter described by the include/exclude lists
    pub fn filter(&self) -> Result<TableFilter, MigrationError> {
        let exclude = if self.exclude_tables.is_empty() {
            None
        } else {
            Some(self.exclude_tables.clone())
        };
        TableFilter::new(self.include_tables.clone(), exclude)
    }
}

/// Load a [`TransferConfig`] from a TOML file
///
/// Missing keys fall back to their defaults; unknown keys are rejected.
///
/// # Examples
///
/// ```toml
/// reserved_prefixes = ["flyway_", "schema_history"]
/// exclude_tables = ["audit_log"]
/// checksum = true
/// ```
pub fn load_config_from_file(path: impl AsRef<Path>) -> Result<TransferConfig> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
    parse_config(&contents)
        .with_context(|| format!("Failed to parse config file '{}'", path.display()))
}

fn parse_config(contents: &str) -> Result<TransferConfig> {
    let config: TransferConfig = toml::from_str(contents)?;
    Ok(config)
}
