// ABOUTME: Store capability consumed by the migration engine
// ABOUTME: Defines store sides, the row value model, and the Store trait

pub mod sqlite;

pub use sqlite::SqliteStore;

use crate::error::StoreError;
use serde::Serialize;
use std::fmt;

/// Which end of the transfer a store handle represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Source,
    Destination,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Source => f.write_str("source"),
            Side::Destination => f.write_str("destination"),
        }
    }
}

/// A single opaque column value as stored by the database
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

/// One table row, positionally aligned with the column list it was read with
pub type Row = Vec<Value>;

/// Relational store operations needed to migrate and audit table data.
///
/// Every call reflects the live state of the store; implementations must not
/// cache catalog or schema answers between calls. Mutating operations are only
/// issued against the destination, between [`Store::begin`] and either
/// [`Store::commit`] or [`Store::rollback`].
pub trait Store {
    /// Side this handle was opened for
    fn side(&self) -> Side;

    /// Location the handle was opened from, for diagnostics
    fn location(&self) -> &str;

    /// User tables in catalog order, excluding the engine's internal tables
    fn list_tables(&self) -> Result<Vec<String>, StoreError>;

    /// Column names of `table` in declaration order; empty if the table does not exist
    fn column_names(&self, table: &str) -> Result<Vec<String>, StoreError>;

    /// Current number of rows in `table`
    fn count_rows(&self, table: &str) -> Result<u64, StoreError>;

    /// Full scan of `table`, each row ordered as `columns`
    fn read_rows(&self, table: &str, columns: &[String]) -> Result<Vec<Row>, StoreError>;

    /// Open a write transaction
    fn begin(&self) -> Result<(), StoreError>;

    /// Commit the open transaction
    fn commit(&self) -> Result<(), StoreError>;

    /// Roll back the open transaction; a no-op when none is open
    fn rollback(&self) -> Result<(), StoreError>;

    /// Remove every row of `table`, returning how many were removed
    fn delete_all(&self, table: &str) -> Result<u64, StoreError>;

    /// Return the auto-increment counter of `table` to its unset state
    fn reset_sequence(&self, table: &str) -> Result<(), StoreError>;

    /// Insert `rows` using the given column order, returning rows actually written
    fn bulk_insert(&self, table: &str, columns: &[String], rows: &[Row])
        -> Result<u64, StoreError>;

    /// Release the handle. Idempotent and infallible: failures are logged only.
    fn close(&mut self);
}
