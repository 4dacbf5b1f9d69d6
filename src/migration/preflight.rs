// ABOUTME: Pre-flight inspection of the destination before any mutation
// ABOUTME: Counts existing destination rows to decide whether confirmation is required

use super::schema::MigrationPlan;
use crate::error::MigrationError;
use crate::store::Store;
use serde::Serialize;

/// Rows already present in one destination table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableOccupancy {
    pub table: String,
    pub rows: u64,
}

/// Existing destination rows across the planned tables
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DestinationOccupancy {
    pub tables: Vec<TableOccupancy>,
    pub total_rows: u64,
}

impl DestinationOccupancy {
    pub fn is_empty(&self) -> bool {
        self.total_rows == 0
    }

    /// Tables that would lose data
    pub fn occupied(&self) -> impl Iterator<Item = &TableOccupancy> {
        self.tables.iter().filter(|t| t.rows > 0)
    }
}

/// Count the rows the run would delete from the destination
///
/// Runs after the schema check, so every planned table exists on the
/// destination; a failing count is a store error, never treated as zero.
pub fn destination_occupancy(
    dest: &dyn Store,
    plan: &MigrationPlan,
) -> Result<DestinationOccupancy, MigrationError> {
    let mut occupancy = DestinationOccupancy::default();

    for table in plan.iter() {
        let rows = dest
            .count_rows(table)
            .map_err(|e| MigrationError::store(Some(table), e))?;
        occupancy.total_rows += rows;
        occupancy.tables.push(TableOccupancy {
            table: table.to_string(),
            rows,
        });
    }

    tracing::debug!(
        "Destination holds {} row(s) across {} planned table(s)",
        occupancy.total_rows,
        plan.len()
    );
    Ok(occupancy)
}
