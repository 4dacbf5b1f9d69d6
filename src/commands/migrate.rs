// ABOUTME: Transfer command implementation - clear and copy every planned table
// ABOUTME: Opens both databases, runs the migration pipeline, and prints the transcript

use crate::config::TransferConfig;
use crate::error::MigrationError;
use crate::interactive::ConfirmationProvider;
use crate::migration::{self, print_verification_table, MigrationReport, RunOutcome};
use crate::store::{Side, SqliteStore, Store};
use crate::utils::sanitize_identifier;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;

/// Copy all planned tables from the source database into the destination
///
/// Steps:
/// 1. Opens the source (read-only) and destination databases
/// 2. Plans tables from the source catalog and checks every schema
/// 3. Asks `confirm` before overwriting a non-empty destination
/// 4. Clears and copies all tables inside one destination transaction
/// 5. Verifies row counts (and checksums if configured) after commit
///
/// Both databases are closed on every exit path.
///
/// # Errors
///
/// This function will return an error if:
/// - Either database file is missing or cannot be opened
/// - Any planned table has a different column set on the two sides
/// - A store operation fails (the transaction is rolled back)
/// - The confirmation prompt cannot read input
///
/// A declined confirmation is not an error: it returns [`RunOutcome::Declined`].
///
/// # Examples
///
/// ```no_run
/// # use table_transfer::commands::migrate;
/// # use table_transfer::config::TransferConfig;
/// # use table_transfer::interactive::AssumeYes;
/// # use std::path::Path;
/// # fn example() -> Result<(), table_transfer::error::MigrationError> {
/// let outcome = migrate(
///     Path::new("old.db"),
///     Path::new("new.db"),
///     &TransferConfig::default(),
///     &mut AssumeYes,
/// )?;
/// println!("{}", outcome.label());
/// # Ok(())
/// # }
/// ```
pub fn migrate(
    source_path: &Path,
    dest_path: &Path,
    config: &TransferConfig,
    confirm: &mut dyn ConfirmationProvider,
) -> Result<RunOutcome, MigrationError> {
    tracing::info!("Starting data transfer...");

    tracing::info!("Opening source database...");
    let mut source = SqliteStore::open(Side::Source, source_path)?;
    tracing::info!("✓ Opened source '{}'", source.location());

    tracing::info!("Opening destination database...");
    let mut dest = SqliteStore::open(Side::Destination, dest_path)?;
    tracing::info!("✓ Opened destination '{}'", dest.location());

    let progress = copy_progress_bar();
    let result = migration::run(&source, &dest, config, confirm, &progress);

    source.close();
    dest.close();

    match &result {
        Ok(outcome) => {
            if let Some(summary) = outcome.summary() {
                print_transfer_table(&summary.transfers);
                print_verification_table(&summary.verification);
            }
        }
        Err(e) => {
            tracing::error!("ERROR DURING MIGRATION: {}", e);
            if matches!(e, MigrationError::Store { .. } | MigrationError::SchemaMismatch(_)) {
                tracing::error!("No changes were saved to the destination database");
            }
        }
    }

    result
}

fn copy_progress_bar() -> ProgressBar {
    let progress = ProgressBar::new(0);
    let style = ProgressStyle::with_template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")
        .map(|s| s.progress_chars("##-"))
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    progress.set_style(style);
    progress
}

/// Print per-table copy counts to stdout
fn print_transfer_table(report: &MigrationReport) {
    println!();
    println!(
        "{:<30} {:>12} {:>12} {:>12}",
        "Table", "Cleared", "Read", "Copied"
    );
    println!("{}", "─".repeat(69));
    for transfer in &report.tables {
        println!(
            "{:<30} {:>12} {:>12} {:>12}",
            sanitize_identifier(&transfer.table),
            transfer.rows_cleared,
            transfer.rows_read,
            transfer.rows_copied
        );
    }
    println!("{}", "─".repeat(69));
    println!("Total copied: {} row(s)", report.total_rows_copied());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interactive::AssumeYes;

    #[test]
    fn test_missing_source_is_unreachable() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("new.db");
        rusqlite::Connection::open(&dest)
            .unwrap()
            .execute_batch("CREATE TABLE wallet (id INTEGER)")
            .unwrap();

        let result = migrate(
            &dir.path().join("old.db"),
            &dest,
            &TransferConfig::default(),
            &mut AssumeYes,
        );
        assert!(matches!(
            result,
            Err(MigrationError::Unreachable {
                side: Side::Source,
                ..
            })
        ));
    }

    #[test]
    fn test_missing_destination_is_unreachable() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("old.db");
        rusqlite::Connection::open(&source)
            .unwrap()
            .execute_batch("CREATE TABLE wallet (id INTEGER)")
            .unwrap();

        let result = migrate(
            &source,
            &dir.path().join("new.db"),
            &TransferConfig::default(),
            &mut AssumeYes,
        );
        assert!(matches!(
            result,
            Err(MigrationError::Unreachable {
                side: Side::Destination,
                ..
            })
        ));
        // The destination must not have been created as a side effect
        assert!(!dir.path().join("new.db").exists());
    }
}
