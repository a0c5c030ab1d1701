//! Command line interface module
//!
//! Argument parsing and the runner that drives a migration from the command
//! line.

pub mod args;
pub mod runner;

pub use args::Args;
pub use runner::{Runner, migrate};
