//! Mercurial provider built on the `hg` command line.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::cli::ProgressManager;
use crate::error::{QpxError, Result};
use crate::package::{RepositoryDescriptor, VersionPin};
use super::driver::{self, CommitInfo, InstalledPackage, Installer, ProviderKind, Publisher};
use super::git::short_revision;
use super::process::ProcessRunner;

const LAST_COMMIT_TEMPLATE: &str = "{node}|{author|person}|{author|email}";

pub struct MercurialProvider {
    runner: ProcessRunner,
    working_dir: PathBuf,
    progress: Option<Arc<ProgressManager>>,
}

impl MercurialProvider {
    pub fn new(binary: impl Into<String>, timeout: Duration) -> Self {
        Self {
            runner: ProcessRunner::new(binary, timeout).with_env("HGPLAIN", "1"),
            working_dir: PathBuf::from("."),
            progress: None,
        }
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = dir.into();
        self
    }

    pub fn with_progress(mut self, progress: Arc<ProgressManager>) -> Self {
        self.progress = Some(progress);
        self
    }

    async fn hg(&self, args: &[&str]) -> Result<String> {
        self.runner.run(args, Some(&self.working_dir)).await
    }
}

fn parse_last_commit(output: &str) -> Result<CommitInfo> {
    let mut fields = output.trim().splitn(3, '|');
    match (fields.next(), fields.next(), fields.next()) {
        (Some(revision), Some(name), Some(email)) if !revision.is_empty() => Ok(CommitInfo {
            revision: revision.to_string(),
            author_name: name.to_string(),
            author_email: email.to_string(),
        }),
        _ => Err(QpxError::VcsCommand {
            command: "hg log".to_string(),
            stderr: format!("unexpected output {:?}", output),
        }),
    }
}

#[async_trait]
impl Installer for MercurialProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Mercurial
    }

    async fn install(
        &self,
        repository: &RepositoryDescriptor,
        version: &VersionPin,
        vendor_dir: &Path,
    ) -> Result<InstalledPackage> {
        let staging = driver::staging_dir(vendor_dir)?;
        let checkout = staging.path().join("checkout");
        let checkout_arg = checkout.to_string_lossy();

        let mut args = vec!["clone", "--quiet"];
        if !version.revision.is_empty() {
            args.extend(["-r", version.revision.as_str()]);
        }
        args.extend([repository.url.as_str(), checkout_arg.as_ref()]);

        let spinner = self
            .progress
            .as_ref()
            .map(|p| p.create_spinner(&format!("Cloning {}", repository.url)));
        let cloned = self.runner.run(&args, None).await;
        if let Some(pb) = spinner {
            pb.finish_and_clear();
        }
        cloned?;

        driver::finish_install(&checkout, vendor_dir, version)
    }
}

#[async_trait]
impl Publisher for MercurialProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Mercurial
    }

    async fn test(&self) -> Result<()> {
        self.runner.probe().await
    }

    async fn repository_url(&self) -> Result<String> {
        self.hg(&["paths", "default"]).await
    }

    async fn repository_file_list(&self) -> Result<Vec<String>> {
        let output = self.hg(&["locate"]).await?;
        Ok(output.lines().filter(|l| !l.is_empty()).map(str::to_string).collect())
    }

    async fn last_commit(&self) -> Result<CommitInfo> {
        let output = self
            .hg(&["log", "--limit", "1", "--template", LAST_COMMIT_TEMPLATE])
            .await?;
        parse_last_commit(&output)
    }

    async fn create_tag(&self, name: &str) -> Result<()> {
        self.hg(&["tag", name]).await.map(|_| ())
    }

    async fn validate_commit(&self, revision: &str) -> Result<()> {
        let remote = self.repository_url().await?;

        // identify exits non-zero when the remote does not know the revision
        if self
            .runner
            .succeeds(&["identify", &remote, "-r", revision], Some(&self.working_dir))
            .await?
        {
            Ok(())
        } else {
            Err(QpxError::NotPublished {
                revision: short_revision(revision),
            })
        }
    }
}
