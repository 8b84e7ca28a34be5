//! Verify command - check a package tree against its qpm.asc.

use anyhow::{Context as _, Result};
use clap::Args;
use std::path::{Path, PathBuf};

use qpx_pm::integrity::{verify_package, Keyring};
use qpx_pm::package::namespace_path;

use crate::context::{Context, GlobalArgs};

#[derive(Args, Debug)]
pub struct VerifyArgs {
    /// Installed package to verify; defaults to the working directory
    #[arg(value_name = "PACKAGE")]
    pub package: Option<String>,
}

/// Vendor directory of an installed package
fn installed_dir(vendor_dir: &Path, name: &str) -> Result<PathBuf> {
    Ok(vendor_dir.join(namespace_path(&name.trim().to_lowercase())?))
}

pub fn execute(args: VerifyArgs, global: &GlobalArgs) -> Result<i32> {
    let ctx = Context::load(global)?;

    let dir = match &args.package {
        Some(name) => installed_dir(&ctx.working_dir.join(ctx.config.get_vendor_dir()), name)?,
        None => ctx.working_dir.clone(),
    };

    let public = Keyring::public(&ctx.config)?;
    let manifest = verify_package(&dir, &public)
        .with_context(|| format!("Verification of {} failed", dir.display()))?;

    ctx.output.success(&format!(
        "Signature of {}@{} is valid",
        manifest.name, manifest.version.label
    ));
    Ok(0)
}
