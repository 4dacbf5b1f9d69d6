// ABOUTME: Content digests for comparing table data between stores
// ABOUTME: Computes an order-independent SHA-256 over every row of a table

use crate::error::StoreError;
use crate::store::{Row, Store, Value};
use sha2::{Digest, Sha256};

/// Digest of an empty table
pub const EMPTY_CHECKSUM: &str = "empty";

/// Compute a content digest for `table`, reading `columns` in the given order
///
/// Each row is hashed on its own, row digests are sorted, and the sorted list
/// is hashed again, so the result does not depend on the order rows come back
/// in. Values are tagged by kind, so `Integer(1)` and `Text("1")` differ.
///
/// Both sides of a comparison must pass the same column list.
pub fn table_checksum(
    store: &dyn Store,
    table: &str,
    columns: &[String],
) -> Result<String, StoreError> {
    tracing::debug!("Computing checksum for '{}' on {}", table, store.side());

    let rows = store.read_rows(table, columns)?;
    Ok(rows_checksum(&rows))
}

/// Order-independent digest of a set of rows
pub fn rows_checksum(rows: &[Row]) -> String {
    if rows.is_empty() {
        return EMPTY_CHECKSUM.to_string();
    }

    let mut row_digests: Vec<[u8; 32]> = rows.iter().map(row_digest).collect();
    row_digests.sort_unstable();

    let mut hasher = Sha256::new();
    for digest in &row_digests {
        hasher.update(digest);
    }
    format!("{:x}", hasher.finalize())
}

fn row_digest(row: &Row) -> [u8; 32] {
    let mut hasher = Sha256::new();
    for value in row {
        match value {
            Value::Null => hasher.update([0u8]),
            Value::Integer(i) => {
                hasher.update([1u8]);
                hasher.update(i.to_be_bytes());
            }
            Value::Real(f) => {
                hasher.update([2u8]);
                hasher.update(f.to_bits().to_be_bytes());
            }
            Value::Text(s) => {
                hasher.update([3u8]);
                hasher.update((s.len() as u64).to_be_bytes());
                hasher.update(s.as_bytes());
            }
            Value::Blob(b) => {
                hasher.update([4u8]);
                hasher.update((b.len() as u64).to_be_bytes());
                hasher.update(b);
            }
        }
    }
    let mut digest = [0u8; 32];
    digest.copy_from_slice(&hasher.finalize());
    digest
}
