// ABOUTME: Schema introspection utilities for migration planning
// ABOUTME: Discovers tables and columns, builds the plan, and detects schema mismatches

use crate::config::TransferConfig;
use crate::error::MigrationError;
use crate::store::Store;
use crate::utils::sanitize_identifier;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;

/// A table name with its live column list
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableDescriptor {
    pub name: String,
    pub columns: Vec<String>,
}

impl TableDescriptor {
    pub fn column_set(&self) -> BTreeSet<&str> {
        self.columns.iter().map(String::as_str).collect()
    }

    /// A table with no columns does not exist in the store
    pub fn exists(&self) -> bool {
        !self.columns.is_empty()
    }
}

/// Column-set difference for one table between source and destination
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemaMismatch {
    pub table: String,
    /// Source columns the destination lacks
    pub missing_in_destination: Vec<String>,
    /// Destination columns the source lacks
    pub extra_in_destination: Vec<String>,
    pub destination_missing_table: bool,
}

impl SchemaMismatch {
    /// Symmetric difference of the two column sets, sorted
    pub fn difference(&self) -> Vec<&str> {
        let mut diff: Vec<&str> = self
            .missing_in_destination
            .iter()
            .chain(self.extra_in_destination.iter())
            .map(String::as_str)
            .collect();
        diff.sort_unstable();
        diff
    }
}

impl fmt::Display for SchemaMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let table = sanitize_identifier(&self.table);
        if self.destination_missing_table {
            return write!(f, "table '{}' does not exist in destination", table);
        }
        write!(f, "table '{}' differs by {{{}}}", table, self.difference().join(", "))?;
        if !self.missing_in_destination.is_empty() {
            write!(
                f,
                " (missing in destination: {})",
                self.missing_in_destination.join(", ")
            )?;
        }
        if !self.extra_in_destination.is_empty() {
            write!(
                f,
                " (only in destination: {})",
                self.extra_in_destination.join(", ")
            )?;
        }
        Ok(())
    }
}

/// The fixed, ordered list of tables processed by one run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct MigrationPlan {
    tables: Vec<String>,
}

impl MigrationPlan {
    pub fn new(tables: Vec<String>) -> Self {
        Self { tables }
    }

    pub fn tables(&self) -> &[String] {
        &self.tables
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.tables.iter().map(String::as_str)
    }
}

/// List migratable tables in catalog order
///
/// The store already omits its internal tables; this additionally drops any
/// table carrying one of `reserved_prefixes` (schema-history tables).
pub fn list_tables(
    store: &dyn Store,
    reserved_prefixes: &[String],
) -> Result<Vec<String>, MigrationError> {
    let tables = store
        .list_tables()
        .map_err(|e| MigrationError::store(None, e))?;

    Ok(tables
        .into_iter()
        .filter(|name| {
            let reserved = has_reserved_prefix(name, reserved_prefixes);
            if reserved {
                tracing::debug!("Skipping reserved table '{}'", sanitize_identifier(name));
            }
            !reserved
        })
        .collect())
}

/// Whether `table` starts with any of `prefixes`
fn has_reserved_prefix(table: &str, prefixes: &[String]) -> bool {
    prefixes.iter().any(|prefix| table.starts_with(prefix.as_str()))
}

/// Fetch the live column list of `table`; empty when the table is absent
pub fn get_columns(store: &dyn Store, table: &str) -> Result<TableDescriptor, MigrationError> {
    let columns = store
        .column_names(table)
        .map_err(|e| MigrationError::store(Some(table), e))?;
    Ok(TableDescriptor {
        name: table.to_string(),
        columns,
    })
}

/// Compare two descriptors by column set; `None` when compatible
///
/// Column order is irrelevant here: rows are always inserted with an explicit
/// column list.
pub fn compare(source: &TableDescriptor, dest: &TableDescriptor) -> Option<SchemaMismatch> {
    let source_set = source.column_set();
    let dest_set = dest.column_set();
    if source_set == dest_set {
        return None;
    }

    Some(SchemaMismatch {
        table: source.name.clone(),
        missing_in_destination: source_set
            .difference(&dest_set)
            .map(|c| c.to_string())
            .collect(),
        extra_in_destination: dest_set
            .difference(&source_set)
            .map(|c| c.to_string())
            .collect(),
        destination_missing_table: !dest.exists(),
    })
}

/// Derive the migration plan from the source catalog
///
/// # Errors
///
/// Returns [`MigrationError::Config`] if the filter is invalid or names a
/// table the source does not have.
pub fn build_plan(
    source: &dyn Store,
    config: &TransferConfig,
) -> Result<MigrationPlan, MigrationError> {
    let filter = config.filter()?;
    let tables = list_tables(source, &config.reserved_prefixes)?;

    let unknown = filter.unknown_includes(&tables);
    if !unknown.is_empty() {
        return Err(MigrationError::Config(format!(
            "included tables not found in source: {}",
            unknown.join(", ")
        )));
    }

    let planned: Vec<String> = tables
        .into_iter()
        .filter(|name| filter.should_migrate(name))
        .collect();

    Ok(MigrationPlan::new(planned))
}

/// Check every planned table and report all mismatches at once
///
/// Returns the source descriptors, in plan order, when every table matches.
pub fn check_schemas(
    source: &dyn Store,
    dest: &dyn Store,
    plan: &MigrationPlan,
) -> Result<Vec<TableDescriptor>, MigrationError> {
    let mut descriptors = Vec::with_capacity(plan.len());
    let mut mismatches = Vec::new();

    for table in plan.iter() {
        let source_desc = get_columns(source, table)?;
        let dest_desc = get_columns(dest, table)?;

        match compare(&source_desc, &dest_desc) {
            Some(mismatch) => {
                tracing::error!("  ✗ Schema mismatch: {}", mismatch);
                tracing::error!("    [source] columns: {:?}", sorted(&source_desc.columns));
                tracing::error!("    [destination] columns: {:?}", sorted(&dest_desc.columns));
                mismatches.push(mismatch);
            }
            None => {
                tracing::info!(
                    "  ✓ Schema of '{}' matches ({} columns)",
                    sanitize_identifier(table),
                    source_desc.columns.len()
                );
                descriptors.push(source_desc);
            }
        }
    }

    if !mismatches.is_empty() {
        return Err(MigrationError::SchemaMismatch(mismatches));
    }
    Ok(descriptors)
}

fn sorted(columns: &[String]) -> Vec<&str> {
    let mut v: Vec<&str> = columns.iter().map(String::as_str).collect();
    v.sort_unstable();
    v
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{Side, SqliteStore};
    use rusqlite::Connection;

    fn store(side: Side, ddl: &str) -> SqliteStore {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(ddl).unwrap();
        SqliteStore::from_connection(side, ":memory:", conn)
    }

    fn descriptor(name: &str, columns: &[&str]) -> TableDescriptor {
        TableDescriptor {
            name: name.to_string(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
        }
    }

    #[test]
    fn test_compare_ignores_column_order() {
        let a = descriptor("wallet", &["id", "name", "balance"]);
        let b = descriptor("wallet", &["balance", "id", "name"]);
        assert_eq!(compare(&a, &b), None);
    }

    #[test]
    fn test_compare_reports_symmetric_difference() {
        let a = descriptor("wallet", &["id", "name", "balance"]);
        let b = descriptor("wallet", &["id", "name", "currency"]);
        let mismatch = compare(&a, &b).unwrap();
        assert_eq!(mismatch.missing_in_destination, vec!["balance"]);
        assert_eq!(mismatch.extra_in_destination, vec!["currency"]);
        assert_eq!(mismatch.difference(), vec!["balance", "currency"]);
        assert!(!mismatch.destination_missing_table);
    }

    #[test]
    fn test_compare_missing_destination_table() {
        let a = descriptor("goal", &["wallet_id", "target_balance"]);
        let b = descriptor("goal", &[]);
        let mismatch = compare(&a, &b).unwrap();
        assert!(mismatch.destination_missing_table);
        assert_eq!(
            mismatch.to_string(),
            "table 'goal' does not exist in destination"
        );
    }

    #[test]
    fn test_mismatch_display_names_difference() {
        let a = descriptor("wallet", &["id", "name", "balance"]);
        let b = descriptor("wallet", &["id", "name"]);
        let text = compare(&a, &b).unwrap().to_string();
        assert_eq!(
            text,
            "table 'wallet' differs by {balance} (missing in destination: balance)"
        );
    }

    #[test]
    fn test_list_tables_skips_reserved_prefixes() {
        let source = store(
            Side::Source,
            "CREATE TABLE flyway_schema_history (installed_rank INTEGER);
             CREATE TABLE wallet (id INTEGER PRIMARY KEY);
             CREATE TABLE goal (wallet_id INTEGER);",
        );
        let tables = list_tables(&source, &["flyway_".to_string()]).unwrap();
        assert_eq!(tables, vec!["wallet", "goal"]);
    }

    #[test]
    fn test_build_plan_applies_filter_in_catalog_order() {
        let source = store(
            Side::Source,
            "CREATE TABLE wallet (id INTEGER);
             CREATE TABLE category (id INTEGER);
             CREATE TABLE goal (id INTEGER);",
        );
        let config = TransferConfig {
            exclude_tables: vec!["category".to_string()],
            ..TransferConfig::default()
        };
        let plan = build_plan(&source, &config).unwrap();
        assert_eq!(plan.tables(), ["wallet", "goal"]);
    }

    #[test]
    fn test_build_plan_rejects_unknown_include() {
        let source = store(Side::Source, "CREATE TABLE wallet (id INTEGER);");
        let config = TransferConfig {
            include_tables: Some(vec!["ghost".to_string()]),
            ..TransferConfig::default()
        };
        assert!(matches!(
            build_plan(&source, &config),
            Err(MigrationError::Config(_))
        ));
    }

    #[test]
    fn test_check_schemas_collects_all_mismatches() {
        let source = store(
            Side::Source,
            "CREATE TABLE wallet (id INTEGER, name TEXT, balance REAL);
             CREATE TABLE goal (wallet_id INTEGER, target_balance REAL);
             CREATE TABLE category (id INTEGER, name TEXT);",
        );
        let dest = store(
            Side::Destination,
            "CREATE TABLE wallet (id INTEGER, name TEXT);
             CREATE TABLE category (name TEXT, id INTEGER);",
        );
        let plan = MigrationPlan::new(vec![
            "wallet".to_string(),
            "goal".to_string(),
            "category".to_string(),
        ]);

        match check_schemas(&source, &dest, &plan) {
            Err(MigrationError::SchemaMismatch(mismatches)) => {
                let tables: Vec<&str> = mismatches.iter().map(|m| m.table.as_str()).collect();
                assert_eq!(tables, vec!["wallet", "goal"]);
                assert_eq!(mismatches[0].difference(), vec!["balance"]);
                assert!(mismatches[1].destination_missing_table);
            }
            other => panic!("expected schema mismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_check_schemas_returns_source_descriptors() {
        let source = store(Side::Source, "CREATE TABLE wallet (id INTEGER, name TEXT);");
        let dest = store(Side::Destination, "CREATE TABLE wallet (name TEXT, id INTEGER);");
        let plan = MigrationPlan::new(vec!["wallet".to_string()]);

        let descriptors = check_schemas(&source, &dest, &plan).unwrap();
        assert_eq!(descriptors, vec![descriptor("wallet", &["id", "name"])]);
    }
}
