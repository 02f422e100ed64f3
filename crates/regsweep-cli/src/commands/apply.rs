//! Apply command implementation.
//!
//! Computes the same plan as `plan`, then executes its delete set. The
//! destructive step is gated behind `--yes`: without it the command prints
//! the plan and refuses, keeping dry-run the default path.

use anyhow::{bail, Result};
use clap::Args;
use regsweep_core::plan_retention;

use crate::commands::plan::{format_is_table, print_plan};
use crate::commands::{OutputFormat, TargetArgs};
use crate::config::Config;
use crate::context::PlanContext;

/// Arguments for the apply command.
#[derive(Args)]
pub struct ApplyArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Confirm deletion; without this flag the plan is printed and nothing
    /// is deleted
    #[arg(long)]
    pub yes: bool,
}

/// Executes the apply command.
pub async fn execute(args: ApplyArgs, config: &Config, format: OutputFormat) -> Result<()> {
    let ctx = PlanContext::resolve(&args.target, config)?;

    let records = ctx
        .client
        .list_images(&ctx.repository, ctx.needs_push_time())
        .await?;
    let plan = plan_retention(&ctx.convention, &records, &ctx.policy)?;

    print_plan(&plan, format)?;

    let digests = plan.digests_to_delete();
    if digests.is_empty() {
        if format_is_table(format) {
            println!();
            println!("Nothing to delete.");
        }
        return Ok(());
    }

    if !args.yes {
        bail!(
            "refusing to delete {} image(s) without --yes; the plan above has not been applied",
            digests.len()
        );
    }

    let outcome = ctx.client.delete_images(&ctx.repository, &digests).await?;

    println!();
    for digest in &outcome.deleted {
        println!("Deleted: {digest}");
    }
    for failure in &outcome.failures {
        eprintln!("Error deleting {}: {}", failure.digest, failure.error);
    }

    if outcome.has_failures() {
        bail!(
            "{} of {} deletion(s) failed; the plan is unchanged and can be re-applied",
            outcome.failures.len(),
            digests.len()
        );
    }

    println!("Deleted {} image(s).", outcome.deleted.len());
    Ok(())
}
