// ABOUTME: Post-commit verification of migrated tables
// ABOUTME: Re-counts rows on both stores and optionally compares content checksums

use super::checksum::table_checksum;
use super::schema::{get_columns, MigrationPlan};
use crate::error::{MigrationError, StoreError};
use crate::store::Store;
use crate::utils::sanitize_identifier;
use serde::Serialize;

/// Verification depth
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VerifyOptions {
    /// Also compare content digests of every table
    pub checksum: bool,
}

/// Result of auditing one table after commit
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerificationResult {
    pub table: String,
    pub source_count: u64,
    pub dest_count: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_checksum: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dest_checksum: Option<String>,
    /// Set when the table could not be audited
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub matched: bool,
}

impl VerificationResult {
    fn failed(table: &str, error: String) -> Self {
        Self {
            table: table.to_string(),
            source_count: 0,
            dest_count: 0,
            source_checksum: None,
            dest_checksum: None,
            error: Some(error),
            matched: false,
        }
    }
}

/// Audit every planned table with fresh queries against both stores
///
/// Read-only: discrepancies are reported, never repaired. A table whose
/// queries fail is reported as unmatched with the failure attached, and the
/// audit continues with the next table.
pub fn verify(
    source: &dyn Store,
    dest: &dyn Store,
    plan: &MigrationPlan,
    options: VerifyOptions,
) -> Vec<VerificationResult> {
    plan.iter()
        .map(|table| match verify_table(source, dest, table, options) {
            Ok(result) => result,
            Err(e) => {
                tracing::error!(
                    "  ✗ Could not verify '{}': {}",
                    sanitize_identifier(table),
                    e
                );
                VerificationResult::failed(table, e.to_string())
            }
        })
        .collect()
}

fn verify_table(
    source: &dyn Store,
    dest: &dyn Store,
    table: &str,
    options: VerifyOptions,
) -> Result<VerificationResult, MigrationError> {
    let store_err = |e: StoreError| MigrationError::store(Some(table), e);
    let shown = sanitize_identifier(table);

    let source_count = source.count_rows(table).map_err(store_err)?;
    let dest_count = dest.count_rows(table).map_err(store_err)?;

    let (source_checksum, dest_checksum) = if options.checksum {
        // Same column order on both sides so the digests are comparable
        let columns = get_columns(source, table)?.columns;
        (
            Some(table_checksum(source, table, &columns).map_err(store_err)?),
            Some(table_checksum(dest, table, &columns).map_err(store_err)?),
        )
    } else {
        (None, None)
    };

    let matched = source_count == dest_count && source_checksum == dest_checksum;

    if matched {
        tracing::info!(
            "  ✓ Verification OK for '{}' ({}/{} rows)",
            shown,
            dest_count,
            source_count
        );
    } else if source_count != dest_count {
        tracing::warn!(
            "  ✗ Verification ERROR for '{}': expected {} rows, found {}",
            shown,
            source_count,
            dest_count
        );
    } else {
        tracing::warn!(
            "  ✗ Verification ERROR for '{}': row counts match ({}) but content differs",
            shown,
            source_count
        );
    }

    Ok(VerificationResult {
        table: table.to_string(),
        source_count,
        dest_count,
        source_checksum,
        dest_checksum,
        error: None,
        matched,
    })
}

/// True when every table matched
pub fn all_matched(results: &[VerificationResult]) -> bool {
    results.iter().all(|r| r.matched)
}

/// Print the verification table to stdout
pub fn print_verification_table(results: &[VerificationResult]) {
    println!();
    println!(
        "{:<30} {:>12} {:>12} {:<8}",
        "Table", "Source", "Destination", "Status"
    );
    println!("{}", "─".repeat(65));

    for result in results {
        let status = match (&result.error, result.matched) {
            (Some(_), _) => "ERROR",
            (None, true) => "OK",
            (None, false) => "MISMATCH",
        };
        println!(
            "{:<30} {:>12} {:>12} {:<8}",
            sanitize_identifier(&result.table),
            result.source_count,
            result.dest_count,
            status
        );
    }

    println!("{}", "─".repeat(65));
    let mismatched = results.iter().filter(|r| !r.matched).count();
    println!(
        "{} table(s) verified, {} with discrepancies",
        results.len(),
        mismatched
    );
    println!();
}
