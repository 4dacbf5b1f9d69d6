// ABOUTME: Library module for table-transfer
// ABOUTME: Exports all core functionality for use in binary and tests

pub mod commands;
pub mod config;
pub mod error;
pub mod filters;
pub mod interactive;
pub mod migration;
pub mod report;
pub mod store;
pub mod utils;
