// ABOUTME: Table selection filter applied when building a migration plan
// ABOUTME: Supports include-only and exclude lists of table names

use crate::error::MigrationError;
use std::collections::BTreeSet;

/// Include/exclude rules for which source tables enter the plan
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableFilter {
    include: Option<BTreeSet<String>>,
    exclude: BTreeSet<String>,
}

impl TableFilter {
    /// Build a filter from optional include and exclude lists
    ///
    /// # Errors
    ///
    /// Returns [`MigrationError::Config`] if a list contains an empty name,
    /// the include list is empty, or a table appears in both lists.
    pub fn new(
        include: Option<Vec<String>>,
        exclude: Option<Vec<String>>,
    ) -> Result<Self, MigrationError> {
        let include = match include {
            Some(names) => {
                let set = normalize(names, "include")?;
                if set.is_empty() {
                    return Err(MigrationError::Config(
                        "include list cannot be empty".to_string(),
                    ));
                }
                Some(set)
            }
            None => None,
        };
        let exclude = normalize(exclude.unwrap_or_default(), "exclude")?;

        if let Some(include) = &include {
            let overlap: Vec<&str> = include.intersection(&exclude).map(String::as_str).collect();
            if !overlap.is_empty() {
                return Err(MigrationError::Config(format!(
                    "tables both included and excluded: {}",
                    overlap.join(", ")
                )));
            }
        }

        Ok(Self { include, exclude })
    }

    /// Whether `table` should be migrated
    pub fn should_migrate(&self, table: &str) -> bool {
        if self.exclude.contains(table) {
            return false;
        }
        match &self.include {
            Some(include) => include.contains(table),
            None => true,
        }
    }

    /// Included table names that are not among `available`
    pub fn unknown_includes<'a>(&'a self, available: &[String]) -> Vec<&'a str> {
        match &self.include {
            Some(include) => include
                .iter()
                .filter(|name| !available.iter().any(|t| t == *name))
                .map(String::as_str)
                .collect(),
            None => Vec::new(),
        }
    }
}

fn normalize(names: Vec<String>, list: &str) -> Result<BTreeSet<String>, MigrationError> {
    let mut set = BTreeSet::new();
    for name in names {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(MigrationError::Config(format!(
                "{} list contains an empty table name",
                list
            )));
        }
        set.insert(trimmed.to_string());
    }
    Ok(set)
}
