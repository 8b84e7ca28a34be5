//! Install command - fetch packages into the vendor directory.

use anyhow::Result;
use clap::Args;
use std::cell::RefCell;

use crate::context::{Context, GlobalArgs};
use crate::prompt::{self, Interrupted};

#[derive(Args, Debug)]
pub struct InstallArgs {
    /// Packages to install (name or name@version); defaults to the dependencies in qpm.json
    #[arg(value_name = "PACKAGES")]
    pub packages: Vec<String>,

    /// Answer yes to every registry prompt
    #[arg(short = 'y', long)]
    pub yes: bool,
}

pub async fn execute(args: InstallArgs, global: &GlobalArgs) -> Result<i32> {
    let ctx = Context::load(global)?;
    let installer = ctx.installer();

    let prompt_error = RefCell::new(None);
    let confirm = |advisory: &qpx_pm::registry::Advisory| {
        if args.yes {
            return true;
        }
        match prompt::confirm(&format!("{} Continue?", advisory.title)) {
            Ok(answer) => answer,
            Err(e) => {
                *prompt_error.borrow_mut() = Some(e);
                false
            }
        }
    };

    let result = installer.install(&args.packages, confirm).await;
    if let Some(e) = prompt_error.into_inner() {
        if e.is::<Interrupted>() {
            return Err(e);
        }
    }
    let report = result?;

    for package in &report.installed {
        ctx.output.list_item(
            "-",
            &format!(
                "{}@{} ({})",
                package.manifest.name, package.manifest.version.label, package.manifest.version.revision
            ),
        );
    }

    if let Some(path) = report.manifest_path {
        ctx.output.success(&format!(
            "Installed {} package(s), updated {}",
            report.installed.len(),
            path.display()
        ));
    }

    Ok(0)
}
