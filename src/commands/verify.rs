// ABOUTME: Verify command implementation - audit data without copying
// ABOUTME: Compares row counts (and optional checksums) between source and destination

use crate::config::TransferConfig;
use crate::error::MigrationError;
use crate::migration::{self, MigrationPlan, VerificationResult, VerifyOptions};
use crate::store::{Side, SqliteStore, Store};
use std::path::Path;

/// Audit the destination against the source without changing either
///
/// Plans tables from the source catalog exactly as a transfer would, then
/// compares each table's row count (and content digest when
/// `config.checksum` is set). Tables that cannot be queried are reported as
/// unmatched rather than aborting the audit.
///
/// # Errors
///
/// Unreachable databases and configuration errors.
pub fn verify(
    source_path: &Path,
    dest_path: &Path,
    config: &TransferConfig,
) -> Result<(MigrationPlan, Vec<VerificationResult>), MigrationError> {
    tracing::info!("Starting data integrity verification...");

    let mut source = SqliteStore::open(Side::Source, source_path)?;
    let mut dest = SqliteStore::open(Side::Destination, dest_path)?;

    let result = audit(&source, &dest, config);
    source.close();
    dest.close();

    let (plan, results) = result?;
    migration::print_verification_table(&results);

    if migration::all_matched(&results) {
        tracing::info!("✓ ALL TABLES VERIFIED SUCCESSFULLY ({} tables)", results.len());
    } else {
        let mismatches = results.iter().filter(|r| !r.matched).count();
        tracing::error!("⚠ DATA INTEGRITY ISSUES DETECTED in {} table(s)", mismatches);
    }

    Ok((plan, results))
}

fn audit(
    source: &dyn Store,
    dest: &dyn Store,
    config: &TransferConfig,
) -> Result<(MigrationPlan, Vec<VerificationResult>), MigrationError> {
    let plan = migration::build_plan(source, config)?;
    if plan.is_empty() {
        tracing::warn!("⚠ No tables found to verify");
    }

    let results = migration::verify(
        source,
        dest,
        &plan,
        VerifyOptions {
            checksum: config.checksum,
        },
    );
    Ok((plan, results))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verify_reports_out_of_sync_table() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("old.db");
        let dest = dir.path().join("new.db");
        rusqlite::Connection::open(&source)
            .unwrap()
            .execute_batch(
                "CREATE TABLE wallet (id INTEGER); INSERT INTO wallet VALUES (1), (2);
                 CREATE TABLE goal (id INTEGER);",
            )
            .unwrap();
        rusqlite::Connection::open(&dest)
            .unwrap()
            .execute_batch(
                "CREATE TABLE wallet (id INTEGER); INSERT INTO wallet VALUES (1);
                 CREATE TABLE goal (id INTEGER);",
            )
            .unwrap();

        let (plan, results) = verify(&source, &dest, &TransferConfig::default()).unwrap();
        assert_eq!(plan.tables(), ["wallet", "goal"]);
        assert!(!results[0].matched);
        assert!(results[1].matched);
    }
}
