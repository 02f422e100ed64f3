//! Plan command implementation.

use anyhow::Result;
use clap::Args;
use regsweep_core::{plan_retention, RetentionPlan};

use crate::commands::{OutputFormat, TargetArgs};
use crate::config::Config;
use crate::context::PlanContext;

/// Arguments for the plan command.
#[derive(Args)]
pub struct PlanArgs {
    #[command(flatten)]
    pub target: TargetArgs,
}

/// Executes the plan command.
pub async fn execute(args: PlanArgs, config: &Config, format: OutputFormat) -> Result<()> {
    let ctx = PlanContext::resolve(&args.target, config)?;

    let records = ctx
        .client
        .list_images(&ctx.repository, ctx.needs_push_time())
        .await?;
    let plan = plan_retention(&ctx.convention, &records, &ctx.policy)?;

    print_plan(&plan, format)?;

    if format_is_table(format) {
        println!();
        if plan.is_noop() {
            println!("Nothing to delete.");
        } else {
            println!(
                "{} image(s) past the keep window, {} unique digest(s) deletable.",
                plan.delete_count(),
                plan.digests_to_delete().len()
            );
            println!("This was a dry run. Use `regsweep apply --yes` to delete them.");
        }
    }

    Ok(())
}

/// Prints the dry-run report: every group with its keep and delete lists,
/// then the tags that failed convention parsing.
pub fn print_plan(plan: &RetentionPlan, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(plan)?),
        OutputFormat::Table => {
            for group in &plan.groups {
                println!(
                    "{} (total {}, keep {}, delete {})",
                    group.key,
                    group.len(),
                    group.keep.len(),
                    group.delete.len()
                );
                for image in &group.keep {
                    println!("  keep    {:<55} {}", image.tag, short_digest(&image.digest));
                }
                for image in &group.delete {
                    println!("  delete  {:<55} {}", image.tag, short_digest(&image.digest));
                }
            }

            if !plan.rejected.is_empty() {
                println!();
                println!(
                    "Tags not matching the convention ({}), left untouched:",
                    plan.rejected.len()
                );
                for reject in &plan.rejected {
                    println!("  {:<55} {}", reject.tag, reject.reason);
                }
            }
        }
    }

    Ok(())
}

/// Returns true for the table format.
pub const fn format_is_table(format: OutputFormat) -> bool {
    matches!(format, OutputFormat::Table)
}

/// Extracts short digest (12 chars after sha256: prefix).
fn short_digest(digest: &str) -> &str {
    let s = digest.strip_prefix("sha256:").unwrap_or(digest);
    &s[..12.min(s.len())]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_digest() {
        assert_eq!(
            short_digest("sha256:0123456789abcdef0123456789abcdef"),
            "0123456789ab"
        );
        assert_eq!(short_digest("abc"), "abc");
    }
}
