// ABOUTME: CLI entry point for table-transfer
// ABOUTME: Parses arguments, merges configuration, and maps run outcomes to exit codes

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use table_transfer::commands;
use table_transfer::config::{load_config_from_file, TransferConfig};
use table_transfer::interactive::{AssumeYes, ConfirmationProvider, TerminalConfirmation};
use table_transfer::migration::{self, RunOutcome};
use table_transfer::report::RunReport;

#[derive(Parser)]
#[command(name = "table-transfer")]
#[command(
    about = "Copy every table of one SQLite database into another with an identical schema, then verify the copy",
    long_about = None
)]
#[command(version)]
struct Cli {
    /// Path to the source (old) SQLite database file
    source: PathBuf,
    /// Path to the destination (new) SQLite database file
    destination: PathBuf,
    /// Skip the overwrite confirmation prompt
    #[arg(short = 'y', long)]
    yes: bool,
    /// Check schemas and report what would be overwritten, without changing anything
    #[arg(long, conflicts_with = "verify_only")]
    dry_run: bool,
    /// Only compare the two databases; do not copy
    #[arg(long)]
    verify_only: bool,
    /// Also compare content checksums during verification
    #[arg(long)]
    checksum: bool,
    /// Migrate only these tables (comma-separated, repeatable)
    #[arg(long = "include-table", value_delimiter = ',')]
    include_tables: Option<Vec<String>>,
    /// Leave these tables out (comma-separated, repeatable)
    #[arg(long = "exclude-table", value_delimiter = ',')]
    exclude_tables: Option<Vec<String>>,
    /// Path to a TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,
    /// Write a JSON report of the run to this path
    #[arg(long)]
    report: Option<PathBuf>,
}

fn main() -> ExitCode {
    // Initialize logging - default to INFO level if RUST_LOG not set
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<u8> {
    let config = build_config(&cli)?;

    if cli.dry_run {
        let validation = commands::validate(&cli.source, &cli.destination, &config)?;
        if let Some(path) = &cli.report {
            RunReport::from_dry_run(
                &validation.plan,
                &validation.occupancy,
                &cli.source,
                &cli.destination,
            )
            .write_to(path)?;
        }
        return Ok(0);
    }

    if cli.verify_only {
        let (plan, results) = commands::verify(&cli.source, &cli.destination, &config)?;
        if let Some(path) = &cli.report {
            RunReport::from_audit(&plan, &results, &cli.source, &cli.destination).write_to(path)?;
        }
        return Ok(if migration::all_matched(&results) { 0 } else { 1 });
    }

    let mut confirm: Box<dyn ConfirmationProvider> = if config.assume_yes {
        Box::new(AssumeYes)
    } else {
        Box::new(TerminalConfirmation)
    };

    let outcome = commands::migrate(&cli.source, &cli.destination, &config, confirm.as_mut())?;

    match &outcome {
        RunOutcome::Verified(_) => {
            println!("Verification complete. All data appears to be migrated correctly!");
        }
        RunOutcome::VerifiedWithDiscrepancies(_) => {
            println!("WARNING: migration committed, but post-migration verification found inconsistencies.");
        }
        RunOutcome::Declined => {
            println!("Migration aborted by user. No changes were made.");
        }
    }

    if let Some(path) = &cli.report {
        RunReport::from_outcome(&outcome, &cli.source, &cli.destination).write_to(path)?;
    }

    // Committed runs exit 0 even with discrepancies; the transcript carries the warning
    Ok(0)
}

/// Defaults, then the config file, then CLI flags
fn build_config(cli: &Cli) -> Result<TransferConfig> {
    let mut config = match &cli.config {
        Some(path) => load_config_from_file(path)?,
        None => TransferConfig::default(),
    };

    if let Some(include) = &cli.include_tables {
        config.include_tables = Some(include.clone());
    }
    if let Some(exclude) = &cli.exclude_tables {
        config.exclude_tables.extend(exclude.iter().cloned());
    }
    config.checksum |= cli.checksum;
    config.assume_yes |= cli.yes;

    // Surface filter mistakes before touching either database
    config.filter()?;
    Ok(config)
}
