//! Uninstall command - remove a package from the project.

use anyhow::Result;
use clap::Args;

use crate::context::{Context, GlobalArgs};

#[derive(Args, Debug)]
pub struct UninstallArgs {
    /// Package to remove
    #[arg(value_name = "PACKAGE")]
    pub package: String,
}

pub fn execute(args: UninstallArgs, global: &GlobalArgs) -> Result<i32> {
    let ctx = Context::load(global)?;
    let report = ctx.installer().uninstall(&args.package)?;

    if report.removed_entry.is_none() {
        ctx.output
            .verbose(&format!("{} was not listed in qpm.json", args.package));
    }
    if let Some(dir) = report.removed_dir {
        ctx.output.verbose(&format!("Removed {}", dir.display()));
    }

    ctx.output.success(&format!("Uninstalled {}", args.package));
    Ok(0)
}
