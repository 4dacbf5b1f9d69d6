// ABOUTME: Error types for store access and migration runs
// ABOUTME: Separates unreachable stores, schema mismatches, and driver failures

use crate::migration::schema::SchemaMismatch;
use crate::store::Side;
use thiserror::Error;

/// Failure raised by a [`Store`](crate::store::Store) implementation.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The handle was already closed when an operation was attempted
    #[error("{side} store is already closed")]
    Closed { side: Side },

    /// The underlying driver rejected an operation
    #[error("{operation}: {source}")]
    Driver {
        operation: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl StoreError {
    /// Wrap a driver error with a short description of what was attempted
    pub fn driver(
        operation: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        StoreError::Driver {
            operation: operation.into(),
            source: source.into(),
        }
    }
}

/// Main error type for a migration run.
#[derive(Error, Debug)]
pub enum MigrationError {
    /// A store location could not be opened; nothing was started
    #[error("{side} database at '{location}' is unreachable: {reason}")]
    Unreachable {
        side: Side,
        location: String,
        reason: String,
    },

    /// Column sets differ for one or more planned tables
    #[error("schema mismatch in {} table(s): {}", .0.len(), describe_mismatches(.0))]
    SchemaMismatch(Vec<SchemaMismatch>),

    /// A store operation failed; any open transaction was rolled back
    #[error("store operation failed{}: {source}", table_suffix(.table))]
    Store {
        table: Option<String>,
        #[source]
        source: StoreError,
    },

    /// The confirmation prompt could not read operator input
    #[error("failed to read confirmation: {0}")]
    Prompt(String),

    /// Invalid table selection or configuration
    #[error("configuration error: {0}")]
    Config(String),

    /// The JSON run report could not be written
    #[error("failed to write report to '{path}': {message}")]
    Report { path: String, message: String },
}

impl MigrationError {
    /// Attach the offending table (if any) to a store failure
    pub fn store(table: Option<&str>, source: StoreError) -> Self {
        MigrationError::Store {
            table: table.map(str::to_string),
            source,
        }
    }

    /// Table named by a store failure, if the failure was table-scoped
    pub fn table(&self) -> Option<&str> {
        match self {
            MigrationError::Store { table, .. } => table.as_deref(),
            _ => None,
        }
    }
}

fn table_suffix(table: &Option<String>) -> String {
    match table {
        Some(name) => format!(" on table '{}'", name),
        None => String::new(),
    }
}

fn describe_mismatches(mismatches: &[SchemaMismatch]) -> String {
    mismatches
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_names_table() {
        let err = MigrationError::store(
            Some("wallet"),
            StoreError::driver("delete rows", "disk I/O error"),
        );
        assert_eq!(err.table(), Some("wallet"));
        assert_eq!(
            err.to_string(),
            "store operation failed on table 'wallet': delete rows: disk I/O error"
        );
    }

    #[test]
    fn test_store_error_without_table() {
        let err = MigrationError::store(None, StoreError::Closed { side: Side::Source });
        assert_eq!(err.table(), None);
        assert_eq!(
            err.to_string(),
            "store operation failed: source store is already closed"
        );
    }

    #[test]
    fn test_schema_mismatch_lists_every_table() {
        let err = MigrationError::SchemaMismatch(vec![
            SchemaMismatch {
                table: "wallet".to_string(),
                missing_in_destination: vec!["balance".to_string()],
                extra_in_destination: vec![],
                destination_missing_table: false,
            },
            SchemaMismatch {
                table: "goal".to_string(),
                missing_in_destination: vec![],
                extra_in_destination: vec!["note".to_string()],
                destination_missing_table: false,
            },
        ]);
        let message = err.to_string();
        assert!(message.starts_with("schema mismatch in 2 table(s)"));
        assert!(message.contains("'wallet'"));
        assert!(message.contains("'goal'"));
    }
}
