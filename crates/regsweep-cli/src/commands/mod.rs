//! CLI command implementations.
//!
//! This module contains all the command handlers for the RegSweep CLI:
//!
//! - `plan`: compute and print the retention plan (dry run)
//! - `apply`: compute the plan and delete everything past the keep window
//! - `version`: show version information

use clap::{Args, Parser, Subcommand, ValueEnum};
use regsweep_core::RecencyPolicy;
use std::path::PathBuf;

pub mod apply;
pub mod plan;
pub mod version;

/// RegSweep - retention planning for registry image tags
#[derive(Parser)]
#[command(name = "regsweep")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Path to an additional configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(long, global = true, default_value = "table")]
    pub format: OutputFormat,

    /// Enable debug output
    #[arg(long, global = true)]
    pub debug: bool,
}

/// Output format for command results.
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Compute and print the retention plan (dry run, never deletes)
    Plan(plan::PlanArgs),

    /// Compute the retention plan and delete everything past the keep window
    Apply(apply::ApplyArgs),

    /// Show version information
    Version,
}

/// Target and policy overrides shared by plan and apply.
#[derive(Args)]
pub struct TargetArgs {
    /// Repository to operate on (e.g. team/app)
    #[arg(long, short = 'r')]
    pub repository: Option<String>,

    /// Registry hostname or base URL (e.g. ghcr.io)
    #[arg(long)]
    pub registry: Option<String>,

    /// Registry username
    #[arg(long)]
    pub username: Option<String>,

    /// Registry password or token
    #[arg(long)]
    pub password: Option<String>,

    /// Tag convention pattern (named capture groups)
    #[arg(long)]
    pub pattern: Option<String>,

    /// Number of images to keep per group (0 empties every group)
    #[arg(long)]
    pub keep: Option<usize>,

    /// Recency source ordering each group: tag-timestamp or push-time
    #[arg(long)]
    pub recency: Option<RecencyPolicy>,
}
