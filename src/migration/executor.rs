// ABOUTME: Transactional clear-and-copy of every planned table
// ABOUTME: One destination transaction spans the whole plan; any failure rolls back all of it

use super::schema::{compare, get_columns, MigrationPlan};
use crate::error::{MigrationError, StoreError};
use crate::store::Store;
use crate::utils::sanitize_identifier;
use indicatif::ProgressBar;
use serde::Serialize;

/// Outcome of copying one table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableTransfer {
    pub table: String,
    /// Destination rows removed before copying
    pub rows_cleared: u64,
    /// Rows read from the source
    pub rows_read: u64,
    /// Rows the destination reports as written
    pub rows_copied: u64,
}

/// Per-table copy counts for a committed run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MigrationReport {
    pub tables: Vec<TableTransfer>,
}

impl MigrationReport {
    pub fn get(&self, table: &str) -> Option<&TableTransfer> {
        self.tables.iter().find(|t| t.table == table)
    }

    pub fn total_rows_copied(&self) -> u64 {
        self.tables.iter().map(|t| t.rows_copied).sum()
    }
}

/// Copy every planned table from `source` into `dest` inside one transaction
///
/// For each table, in plan order:
/// 1. Re-checks that both column sets are equal
/// 2. Deletes all destination rows
/// 3. Resets the destination auto-increment counter
/// 4. Reads every source row in source column order
/// 5. Skips insertion for an empty source table
/// 6. Inserts the rows with identity values copied verbatim
/// 7. Records the number of rows the destination actually wrote
///
/// The transaction commits after the last table. Any error rolls back the
/// whole transaction, so no table is ever left partially migrated.
///
/// # Errors
///
/// Returns [`MigrationError::SchemaMismatch`] if a table's columns differ, or
/// [`MigrationError::Store`] naming the table whose operation failed.
pub fn migrate(
    source: &dyn Store,
    dest: &dyn Store,
    plan: &MigrationPlan,
    progress: &ProgressBar,
) -> Result<MigrationReport, MigrationError> {
    dest.begin().map_err(|e| MigrationError::store(None, e))?;
    tracing::debug!("Transaction opened on destination '{}'", dest.location());

    let result = copy_tables(source, dest, plan, progress)
        .and_then(|report| {
            dest.commit()
                .map_err(|e| MigrationError::store(None, e))
                .map(|()| report)
        });

    match result {
        Ok(report) => {
            tracing::info!("Transaction committed");
            Ok(report)
        }
        Err(err) => {
            rollback(dest);
            Err(err)
        }
    }
}

fn copy_tables(
    source: &dyn Store,
    dest: &dyn Store,
    plan: &MigrationPlan,
    progress: &ProgressBar,
) -> Result<MigrationReport, MigrationError> {
    let mut report = MigrationReport::default();

    for table in plan.iter() {
        progress.set_message(format!("Copying {}", sanitize_identifier(table)));
        let transfer = copy_table(source, dest, table)?;
        report.tables.push(transfer);
        progress.inc(1);
    }

    Ok(report)
}

fn copy_table(
    source: &dyn Store,
    dest: &dyn Store,
    table: &str,
) -> Result<TableTransfer, MigrationError> {
    let shown = sanitize_identifier(table);
    tracing::info!("Processing table '{}'...", shown);

    let source_desc = get_columns(source, table)?;
    let dest_desc = get_columns(dest, table)?;
    if let Some(mismatch) = compare(&source_desc, &dest_desc) {
        tracing::error!("  ✗ {}", mismatch);
        return Err(MigrationError::SchemaMismatch(vec![mismatch]));
    }

    let store_err = |e: StoreError| MigrationError::store(Some(table), e);

    let rows_cleared = dest.delete_all(table).map_err(store_err)?;
    dest.reset_sequence(table).map_err(store_err)?;
    tracing::info!("  -> Cleared {} existing row(s) from '{}'", rows_cleared, shown);

    let rows = source
        .read_rows(table, &source_desc.columns)
        .map_err(store_err)?;
    let rows_read = rows.len() as u64;

    if rows.is_empty() {
        tracing::info!("  -> Table '{}' is empty in source, skipping insertion", shown);
        return Ok(TableTransfer {
            table: table.to_string(),
            rows_cleared,
            rows_read,
            rows_copied: 0,
        });
    }

    let rows_copied = dest
        .bulk_insert(table, &source_desc.columns, &rows)
        .map_err(store_err)?;

    if rows_copied == rows_read {
        tracing::info!("  -> {} row(s) copied to '{}'", rows_copied, shown);
    } else {
        tracing::warn!(
            "  ⚠ '{}': read {} row(s) but destination wrote {}",
            shown,
            rows_read,
            rows_copied
        );
    }

    Ok(TableTransfer {
        table: table.to_string(),
        rows_cleared,
        rows_read,
        rows_copied,
    })
}

fn rollback(dest: &dyn Store) {
    match dest.rollback() {
        Ok(()) => tracing::error!("Rollback executed: no changes were saved to the destination"),
        Err(e) => tracing::error!("Rollback failed after migration error: {}", e),
    }
}
