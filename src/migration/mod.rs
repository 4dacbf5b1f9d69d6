// ABOUTME: Migration engine: schema inspection, transactional copy, and verification
// ABOUTME: Exposes the full run pipeline over any pair of Store handles

pub mod checksum;
pub mod executor;
pub mod preflight;
pub mod schema;
pub mod verify;

pub use checksum::{rows_checksum, table_checksum};
pub use executor::{migrate, MigrationReport, TableTransfer};
pub use preflight::{destination_occupancy, DestinationOccupancy, TableOccupancy};
pub use schema::{
    build_plan, check_schemas, compare, get_columns, list_tables, MigrationPlan, SchemaMismatch,
    TableDescriptor,
};
pub use verify::{all_matched, print_verification_table, verify, VerificationResult, VerifyOptions};

use crate::config::TransferConfig;
use crate::error::MigrationError;
use crate::interactive::ConfirmationProvider;
use crate::store::Store;
use indicatif::ProgressBar;
use serde::Serialize;

/// What a committed run copied and what the audit found
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub plan: MigrationPlan,
    pub transfers: MigrationReport,
    pub verification: Vec<VerificationResult>,
}

/// Terminal state of a run that did not fail
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Committed and every table passed verification
    Verified(RunSummary),
    /// Committed, but verification found discrepancies
    VerifiedWithDiscrepancies(RunSummary),
    /// The operator declined the overwrite; nothing was changed
    Declined,
}

impl RunOutcome {
    pub fn summary(&self) -> Option<&RunSummary> {
        match self {
            RunOutcome::Verified(summary) | RunOutcome::VerifiedWithDiscrepancies(summary) => {
                Some(summary)
            }
            RunOutcome::Declined => None,
        }
    }

    /// Short machine-friendly label
    pub fn label(&self) -> &'static str {
        match self {
            RunOutcome::Verified(_) => "verified",
            RunOutcome::VerifiedWithDiscrepancies(_) => "verified_with_discrepancies",
            RunOutcome::Declined => "declined",
        }
    }
}

/// Run a full migration between two open stores
///
/// 1. Builds the plan from the source catalog
/// 2. Checks the schema of every planned table, reporting all mismatches
/// 3. Counts existing destination rows and asks `confirm` if there are any
/// 4. Clears and copies every table in one transaction
/// 5. Audits both stores after commit
///
/// The stores are not closed here; callers own the handles.
///
/// # Errors
///
/// Schema mismatches, store failures, configuration errors, and prompt I/O
/// failures. A declined confirmation is [`RunOutcome::Declined`], not an error.
pub fn run(
    source: &dyn Store,
    dest: &dyn Store,
    config: &TransferConfig,
    confirm: &mut dyn ConfirmationProvider,
    progress: &ProgressBar,
) -> Result<RunOutcome, MigrationError> {
    let plan = build_plan(source, config)?;
    if plan.is_empty() {
        tracing::warn!("⚠ No tables found to migrate in '{}'", source.location());
    } else {
        tracing::info!("Tables found for migration: {:?}", plan.tables());
    }

    tracing::info!("Checking schemas...");
    check_schemas(source, dest, &plan)?;

    let occupancy = destination_occupancy(dest, &plan)?;
    if !occupancy.is_empty() {
        if !confirm.confirm_overwrite(dest.location(), &occupancy)? {
            tracing::warn!("Migration aborted by operator; no changes were made");
            return Ok(RunOutcome::Declined);
        }
        tracing::info!("Confirmed. Proceeding with data deletion...");
    }

    progress.set_length(plan.len() as u64);
    let transfers = migrate(source, dest, &plan, progress);
    progress.finish_and_clear();
    let transfers = transfers?;

    tracing::info!("Data migration complete. Starting verification...");
    let verification = verify(
        source,
        dest,
        &plan,
        VerifyOptions {
            checksum: config.checksum,
        },
    );

    let summary = RunSummary {
        plan,
        transfers,
        verification,
    };

    if all_matched(&summary.verification) {
        tracing::info!("✓ Verification complete: all data appears to be migrated correctly");
        Ok(RunOutcome::Verified(summary))
    } else {
        tracing::warn!("⚠ Post-migration verification found inconsistencies");
        Ok(RunOutcome::VerifiedWithDiscrepancies(summary))
    }
}
