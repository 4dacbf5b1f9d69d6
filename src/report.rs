// ABOUTME: JSON run report written on request after a transfer, dry run, or audit
// ABOUTME: Mirrors the stdout transcript in a machine-readable form

use crate::error::MigrationError;
use crate::migration::{
    DestinationOccupancy, MigrationPlan, MigrationReport, RunOutcome, VerificationResult,
};
use serde::Serialize;
use std::path::Path;

/// Serializable record of one invocation
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub outcome: String,
    pub source: String,
    pub destination: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan: Option<MigrationPlan>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub occupancy: Option<DestinationOccupancy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transfers: Option<MigrationReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verification: Option<Vec<VerificationResult>>,
}

impl RunReport {
    fn new(outcome: &str, source: &Path, destination: &Path) -> Self {
        Self {
            outcome: outcome.to_string(),
            source: source.display().to_string(),
            destination: destination.display().to_string(),
            plan: None,
            occupancy: None,
            transfers: None,
            verification: None,
        }
    }

    /// Report for a full transfer run
    pub fn from_outcome(outcome: &RunOutcome, source: &Path, destination: &Path) -> Self {
        let mut report = Self::new(outcome.label(), source, destination);
        if let Some(summary) = outcome.summary() {
            report.plan = Some(summary.plan.clone());
            report.transfers = Some(summary.transfers.clone());
            report.verification = Some(summary.verification.clone());
        }
        report
    }

    /// Report for a dry run
    pub fn from_dry_run(
        plan: &MigrationPlan,
        occupancy: &DestinationOccupancy,
        source: &Path,
        destination: &Path,
    ) -> Self {
        let mut report = Self::new("dry_run", source, destination);
        report.plan = Some(plan.clone());
        report.occupancy = Some(occupancy.clone());
        report
    }

    /// Report for a verification-only audit
    pub fn from_audit(
        plan: &MigrationPlan,
        results: &[VerificationResult],
        source: &Path,
        destination: &Path,
    ) -> Self {
        let outcome = if crate::migration::all_matched(results) {
            "audit_matched"
        } else {
            "audit_discrepancies"
        };
        let mut report = Self::new(outcome, source, destination);
        report.plan = Some(plan.clone());
        report.verification = Some(results.to_vec());
        report
    }

    /// Write the report as pretty-printed JSON
    pub fn write_to(&self, path: &Path) -> Result<(), MigrationError> {
        let report_err = |message: String| MigrationError::Report {
            path: path.display().to_string(),
            message,
        };

        let json = serde_json::to_string_pretty(self).map_err(|e| report_err(e.to_string()))?;
        std::fs::write(path, json).map_err(|e| report_err(e.to_string()))?;

        tracing::info!("Report written to '{}'", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declined_report_has_no_transfers() {
        let report = RunReport::from_outcome(
            &RunOutcome::Declined,
            Path::new("old.db"),
            Path::new("new.db"),
        );
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["outcome"], "declined");
        assert_eq!(json["source"], "old.db");
        assert!(json.get("transfers").is_none());
    }

    #[test]
    fn test_dry_run_report_round_trips_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        let plan = MigrationPlan::new(vec!["wallet".to_string()]);
        let occupancy = DestinationOccupancy::default();

        RunReport::from_dry_run(&plan, &occupancy, Path::new("a.db"), Path::new("b.db"))
            .write_to(&path)
            .unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["outcome"], "dry_run");
        assert_eq!(json["plan"], serde_json::json!(["wallet"]));
        assert_eq!(json["occupancy"]["total_rows"], 0);
    }

    #[test]
    fn test_unwritable_report_path_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let report = RunReport::from_outcome(&RunOutcome::Declined, dir.path(), dir.path());
        let err = report.write_to(dir.path()).unwrap_err();
        assert!(matches!(err, MigrationError::Report { .. }));
    }
}
