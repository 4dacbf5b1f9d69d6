// ABOUTME: Utility functions for validation and identifier handling
// ABOUTME: Provides store path checks, SQL identifier quoting, and display sanitizing

use crate::error::MigrationError;
use crate::store::Side;
use std::path::Path;

/// Validate that a store location points at an existing regular file
///
/// Checks, in order:
/// - The path is not empty
/// - Something exists at the path
/// - It is a file, not a directory
///
/// # Errors
///
/// Returns [`MigrationError::Unreachable`] naming the side and the reason.
///
/// # Examples
///
/// ```
/// # use table_transfer::utils::validate_store_path;
/// # use table_transfer::store::Side;
/// # use std::path::Path;
/// assert!(validate_store_path(Side::Source, Path::new("")).is_err());
/// assert!(validate_store_path(Side::Source, Path::new("/definitely/not/here.db")).is_err());
/// ```
pub fn validate_store_path(side: Side, path: &Path) -> Result<(), MigrationError> {
    let unreachable = |reason: &str| MigrationError::Unreachable {
        side,
        location: path.display().to_string(),
        reason: reason.to_string(),
    };

    if path.as_os_str().is_empty() {
        return Err(unreachable("location cannot be empty"));
    }
    if !path.exists() {
        return Err(unreachable("database file not found"));
    }
    if path.is_dir() {
        return Err(unreachable("location is a directory, expected a database file"));
    }

    Ok(())
}

/// Quote an identifier for use in SQL text
///
/// Wraps the name in double quotes and doubles any embedded quote, so table
/// and column names taken from the catalog can never break out of the
/// identifier position.
///
/// # Examples
///
/// ```
/// # use table_transfer::utils::quote_identifier;
/// assert_eq!(quote_identifier("wallet"), "\"wallet\"");
/// assert_eq!(quote_identifier("odd\"name"), "\"odd\"\"name\"");
/// ```
pub fn quote_identifier(identifier: &str) -> String {
    format!("\"{}\"", identifier.replace('"', "\"\""))
}

/// Sanitize an identifier (table or column name) for display
///
/// Removes control characters and limits length to prevent log injection and
/// keep the transcript readable. Display only: SQL text always goes through
/// [`quote_identifier`].
///
/// # Examples
///
/// ```
/// # use table_transfer::utils::sanitize_identifier;
/// assert_eq!(sanitize_identifier("normal_table"), "normal_table");
/// assert_eq!(sanitize_identifier("table\nname"), "tablename");
/// ```
pub fn sanitize_identifier(identifier: &str) -> String {
    identifier
        .chars()
        .filter(|c| !c.is_control())
        .take(100)
        .collect()
}
