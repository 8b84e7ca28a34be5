//! Publish command - register the current revision of a package.

use anyhow::{Context as _, Result};
use clap::Args;

use qpx_pm::integrity::{verify_package, Keyring};
use qpx_pm::vcs::CommitInfo;
use qpx_pm::Manifest;

use crate::context::{Context, GlobalArgs};
use crate::prompt;

#[derive(Args, Debug)]
pub struct PublishArgs {
    /// Do not tag the published revision
    #[arg(long)]
    pub no_tag: bool,
}

/// Name of the tag marking a published version
fn release_tag(label: &str) -> String {
    format!("qpm/{}", label)
}

/// Fill what the checkout knows and the manifest leaves blank; the revision
/// always comes from the checkout.
fn fill_from_checkout(manifest: &mut Manifest, commit: &CommitInfo, remote_url: Option<String>) {
    if manifest.repository.url.is_empty() {
        if let Some(url) = remote_url {
            manifest.repository.url = url;
        }
    }
    if manifest.author.name.is_empty() {
        manifest.author.name = commit.author_name.clone();
    }
    if manifest.author.email.is_empty() {
        manifest.author.email = commit.author_email.clone();
    }
    manifest.version.revision = commit.revision.clone();
}

pub async fn execute(args: PublishArgs, global: &GlobalArgs) -> Result<i32> {
    let ctx = Context::load(global)?;
    let mut manifest = Manifest::load(&ctx.working_dir)?;

    let publisher = ctx
        .selector()
        .create_publisher(&manifest.repository, &ctx.working_dir)
        .await?;

    let commit = publisher.last_commit().await?;
    publisher
        .validate_commit(&commit.revision)
        .await
        .context("Push your changes before publishing")?;

    manifest.repository = manifest.repository.resolve_auto(&ctx.working_dir)?;
    let remote_url = if manifest.repository.url.is_empty() {
        Some(publisher.repository_url().await?)
    } else {
        None
    };
    fill_from_checkout(&mut manifest, &commit, remote_url);
    manifest.validate()?;

    if !manifest.version.fingerprint.trim().is_empty() {
        verify_package(&ctx.working_dir, &Keyring::public(&ctx.config)?)
            .context("The package signature does not match, run `qpx sign` first")?;
        ctx.output.verbose("Signature verified");
    }

    let token = match &ctx.config.token {
        Some(token) => token.clone(),
        None => prompt::secret("Registry token")?,
    };

    ctx.output.info(&format!("Publishing {}@{}", manifest.name, manifest.version.label));
    ctx.registry().publish(&token, &manifest).await?;

    if !args.no_tag {
        let tag = release_tag(&manifest.version.label);
        publisher.create_tag(&tag).await?;
        ctx.output.verbose(&format!("Tagged {} as {}", commit.revision, tag));
    }

    ctx.output.success(&format!("Published {}@{}", manifest.name, manifest.version.label));
    Ok(0)
}
