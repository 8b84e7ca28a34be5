//! Sign command - write qpm.asc for the package in the working directory.

use anyhow::{bail, Result};
use clap::Args;

use qpx_pm::integrity::{digest_file_list, sign_package, Keyring};
use qpx_pm::Manifest;

use crate::context::{Context, GlobalArgs};
use crate::prompt::{self, Interrupted};

#[derive(Args, Debug)]
pub struct SignArgs {}

pub async fn execute(_args: SignArgs, global: &GlobalArgs) -> Result<i32> {
    let ctx = Context::load(global)?;
    let manifest = Manifest::load(&ctx.working_dir)?;

    if manifest.version.fingerprint.trim().is_empty() {
        bail!("No version.fingerprint set in qpm.json");
    }

    let publisher = ctx
        .selector()
        .create_publisher(&manifest.repository, &ctx.working_dir)
        .await?;
    let files = publisher.repository_file_list().await?;

    ctx.output.info(&format!(
        "Package SHA-256: {}",
        digest_file_list(&ctx.working_dir, &files)?
    ));

    let secret = Keyring::secret(&ctx.config)?;
    let public = Keyring::public(&ctx.config)?;

    let mut interrupted = false;
    let signed = sign_package(
        &ctx.working_dir,
        &manifest,
        &files,
        &secret,
        &public,
        prompt::passphrase_source(&mut interrupted),
    );
    if interrupted {
        return Err(Interrupted.into());
    }

    let path = signed?;
    ctx.output.success(&format!("Created {}", path.display()));
    Ok(0)
}
