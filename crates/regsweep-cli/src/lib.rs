//! RegSweep CLI library.
//!
//! Exposes the command definitions, configuration loading and context
//! resolution so they can be exercised in tests.

pub mod commands;
pub mod config;
pub mod context;

pub use commands::{Cli, Commands};
