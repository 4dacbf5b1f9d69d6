// ABOUTME: Dry-run command for migration readiness
// ABOUTME: Plans tables, checks schemas, and counts destination rows without mutating anything

use crate::config::TransferConfig;
use crate::error::MigrationError;
use crate::migration::{self, DestinationOccupancy, MigrationPlan};
use crate::store::{Side, SqliteStore, Store};
use crate::utils::sanitize_identifier;
use std::path::Path;

/// What a real run would do
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationReport {
    pub plan: MigrationPlan,
    pub occupancy: DestinationOccupancy,
}

impl ValidationReport {
    /// Whether a real run would stop for confirmation
    pub fn requires_confirmation(&self) -> bool {
        !self.occupancy.is_empty()
    }
}

/// Check that a transfer could run, without changing either database
///
/// # Errors
///
/// Unreachable databases, configuration errors, and schema mismatches (every
/// mismatching table is reported).
pub fn validate(
    source_path: &Path,
    dest_path: &Path,
    config: &TransferConfig,
) -> Result<ValidationReport, MigrationError> {
    tracing::info!("Starting validation (dry run)...");

    let mut source = SqliteStore::open(Side::Source, source_path)?;
    tracing::info!("✓ Opened source '{}'", source.location());
    let mut dest = SqliteStore::open(Side::Destination, dest_path)?;
    tracing::info!("✓ Opened destination '{}'", dest.location());

    let result = inspect(&source, &dest, config);
    source.close();
    dest.close();

    let report = result?;
    tracing::info!(
        "✅ Validation complete - {} table(s) ready for transfer",
        report.plan.len()
    );
    if report.requires_confirmation() {
        tracing::warn!(
            "⚠ Destination is not empty: {} row(s) would be deleted",
            report.occupancy.total_rows
        );
        for table in report.occupancy.occupied() {
            tracing::warn!("  - {}: {} row(s)", sanitize_identifier(&table.table), table.rows);
        }
    }
    Ok(report)
}

fn inspect(
    source: &dyn Store,
    dest: &dyn Store,
    config: &TransferConfig,
) -> Result<ValidationReport, MigrationError> {
    let plan = migration::build_plan(source, config)?;
    tracing::info!("Tables found for migration: {:?}", plan.tables());

    tracing::info!("Checking schemas...");
    migration::check_schemas(source, dest, &plan)?;

    let occupancy = migration::destination_occupancy(dest, &plan)?;
    Ok(ValidationReport { plan, occupancy })
}
