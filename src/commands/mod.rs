//! CLI command implementations for lru-gen-driver.
//!
//! This module provides implementations for all CLI subcommands:
//! - `scan`: One classifier snapshot
//! - `ledger`: Generation ledger and planned directives
//! - `cycle`: One full reclaim/age cycle
//! - `config`: Configuration file generation
//! - `check`: System validation
//! - `generate-testdata`: Synthetic flag table and ledger

pub mod check;
pub mod config;
pub mod cycle;
pub mod generate;
pub mod ledger;
pub mod scan;

// Re-export command functions
pub use check::command_check;
pub use config::command_config;
pub use cycle::command_cycle;
pub use generate::command_generate_testdata;
pub use ledger::command_ledger;
pub use scan::command_scan;
