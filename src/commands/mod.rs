// ABOUTME: Command implementations behind the CLI
// ABOUTME: Exports the transfer, dry-run validation, and verification-only commands

pub mod migrate;
pub mod validate;
pub mod verify;

pub use migrate::migrate;
pub use validate::{validate, ValidationReport};
pub use verify::verify;
