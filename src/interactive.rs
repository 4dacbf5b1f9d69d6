// ABOUTME: Operator confirmation before destructive overwrites of the destination
// ABOUTME: Provides the injectable ConfirmationProvider and its terminal implementation

use crate::error::MigrationError;
use crate::migration::DestinationOccupancy;
use crate::utils::sanitize_identifier;
use dialoguer::{theme::ColorfulTheme, Input};
use std::io::{self, IsTerminal, Write};

/// Word the operator must type to allow the overwrite
pub const CONFIRMATION_WORD: &str = "yes";

/// Decides whether a non-empty destination may be overwritten.
///
/// Only consulted when the destination already holds rows in at least one
/// planned table. Returning `Ok(false)` aborts the run cleanly with no changes.
pub trait ConfirmationProvider {
    fn confirm_overwrite(
        &mut self,
        destination: &str,
        occupancy: &DestinationOccupancy,
    ) -> Result<bool, MigrationError>;
}

/// Blocking prompt that requires the operator to type `yes`
///
/// Uses an interactive dialoguer prompt on a terminal and a plain line read
/// when stdin is piped. End of input counts as a decline.
///
/// # Examples
///
/// ```no_run
/// # use table_transfer::interactive::TerminalConfirmation;
/// # use table_transfer::migration;
/// # use table_transfer::config::TransferConfig;
/// # use table_transfer::store::{Side, SqliteStore};
/// # use std::path::Path;
/// # fn example() -> Result<(), table_transfer::error::MigrationError> {
/// let source = SqliteStore::open(Side::Source, Path::new("old.db"))?;
/// let dest = SqliteStore::open(Side::Destination, Path::new("new.db"))?;
/// let outcome = migration::run(
///     &source,
///     &dest,
///     &TransferConfig::default(),
///     &mut TerminalConfirmation,
///     &indicatif::ProgressBar::hidden(),
/// )?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalConfirmation;

impl ConfirmationProvider for TerminalConfirmation {
    fn confirm_overwrite(
        &mut self,
        destination: &str,
        occupancy: &DestinationOccupancy,
    ) -> Result<bool, MigrationError> {
        print_overwrite_warning(destination, occupancy);

        let prompt = format!(
            "Are you sure you want to proceed? (Type '{}' to continue)",
            CONFIRMATION_WORD
        );

        let answer = if io::stdin().is_terminal() {
            Input::<String>::with_theme(&ColorfulTheme::default())
                .with_prompt(prompt)
                .allow_empty(true)
                .interact_text()
                .map_err(|e| MigrationError::Prompt(e.to_string()))?
        } else {
            // Piped input: read one line so scripted answers work
            print!("{}: ", prompt);
            io::stdout()
                .flush()
                .map_err(|e| MigrationError::Prompt(e.to_string()))?;
            let mut line = String::new();
            io::stdin()
                .read_line(&mut line)
                .map_err(|e| MigrationError::Prompt(e.to_string()))?;
            println!();
            line
        };

        Ok(is_affirmative(&answer))
    }
}

/// Confirmation already given up front (`--yes`)
#[derive(Debug, Default, Clone, Copy)]
pub struct AssumeYes;

impl ConfirmationProvider for AssumeYes {
    fn confirm_overwrite(
        &mut self,
        destination: &str,
        occupancy: &DestinationOccupancy,
    ) -> Result<bool, MigrationError> {
        tracing::warn!(
            "⚠ Overwriting {} existing row(s) in '{}' (confirmation given up front)",
            occupancy.total_rows,
            destination
        );
        Ok(true)
    }
}

/// Whether a typed answer counts as confirmation
pub fn is_affirmative(answer: &str) -> bool {
    answer.trim().eq_ignore_ascii_case(CONFIRMATION_WORD)
}

fn print_overwrite_warning(destination: &str, occupancy: &DestinationOccupancy) {
    println!();
    println!("{}", "!".repeat(30) + " WARNING " + &"!".repeat(30));
    println!("The destination database at '{}' is NOT empty.", destination);
    println!("Continuing will DELETE ALL existing data in these tables:");
    println!();
    println!("{:<30} {:>12}", "Table", "Rows");
    println!("{}", "─".repeat(43));
    for table in occupancy.occupied() {
        println!(
            "{:<30} {:>12}",
            sanitize_identifier(&table.table),
            table.rows
        );
    }
    println!("{}", "─".repeat(43));
    println!("Total: {} row(s)", occupancy.total_rows);
    println!("{}", "!".repeat(69));
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_affirmative() {
        assert!(is_affirmative("yes"));
        assert!(is_affirmative("  YES \n"));
        assert!(!is_affirmative("y"));
        assert!(!is_affirmative(""));
        assert!(!is_affirmative("no"));
    }

    #[test]
    fn test_assume_yes_always_confirms() {
        let occupancy = DestinationOccupancy {
            tables: vec![],
            total_rows: 12,
        };
        assert!(AssumeYes.confirm_overwrite("new.db", &occupancy).unwrap());
    }
}
