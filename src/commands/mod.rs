//! CLI command implementations for herakles-traffic-agent.
//!
//! This module provides implementations for all CLI subcommands:
//! - `check`: Configuration validation and target listing
//! - `test`: One-off polling of every target with converted output

pub mod check;

// Re-export command functions
pub use check::command_check;
pub use test::command_test;
