//! Scenario runner for the phost registry.
//!
//! Stands in for the wallet, RPC and test-harness glue around the registry:
//! a scenario file opens ledger accounts, creates a registry, and replays
//! purchases, withdrawals and reads, producing a JSON [`Report`].
//!
//! # Modules
//!
//! - [`config`] - Scenario configuration with environment variable expansion
//! - [`scenario`] - Replay engine and report types

pub mod config;
pub mod scenario;

pub use config::{ConfigError, SimConfig, Step};
pub use scenario::{EventLog, Report, SimError, Simulation, StepOutcome};
