//! Git provider built on the `git` command line.

use async_trait::async_trait;
use indexmap::IndexMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::cli::ProgressManager;
use crate::error::{QpxError, Result};
use crate::package::{RepositoryDescriptor, VersionPin};
use super::driver::{self, CommitInfo, InstalledPackage, Installer, ProviderKind, Publisher};
use super::process::ProcessRunner;

pub struct GitProvider {
    runner: ProcessRunner,
    working_dir: PathBuf,
    progress: Option<Arc<ProgressManager>>,
}

impl GitProvider {
    pub fn new(binary: impl Into<String>, timeout: Duration) -> Self {
        Self {
            runner: ProcessRunner::new(binary, timeout).with_env("GIT_TERMINAL_PROMPT", "0"),
            working_dir: PathBuf::from("."),
            progress: None,
        }
    }

    /// Checkout the publisher operations run in
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = dir.into();
        self
    }

    pub fn with_progress(mut self, progress: Arc<ProgressManager>) -> Self {
        self.progress = Some(progress);
        self
    }

    async fn git(&self, args: &[&str]) -> Result<String> {
        self.runner.run(args, Some(&self.working_dir)).await
    }

    /// Remote refs as reported by `git ls-remote`, keyed by ref name
    pub async fn remote_heads(&self) -> Result<IndexMap<String, String>> {
        let output = self.git(&["ls-remote"]).await?;
        Ok(parse_ls_remote(&output))
    }
}

fn parse_ls_remote(output: &str) -> IndexMap<String, String> {
    output
        .lines()
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            let sha = fields.next()?;
            let reference = fields.next()?;
            Some((reference.to_string(), sha.to_string()))
        })
        .collect()
}

pub(crate) fn short_revision(revision: &str) -> String {
    revision.chars().take(8).collect()
}

#[async_trait]
impl Installer for GitProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Git
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

        let spinner = self
            .progress
            .as_ref()
            .map(|p| p.create_spinner(&format!("Cloning {}", repository.url)));

        let cloned = async {
            self.runner
                .run(&["clone", "--quiet", &repository.url, &checkout_arg], None)
                .await?;

            if !version.revision.is_empty() {
                self.runner
                    .run(&["checkout", "--quiet", &version.revision], Some(&checkout))
                    .await?;
            }
            Ok::<_, QpxError>(())
        }
        .await;

        if let Some(pb) = spinner {
            pb.finish_and_clear();
        }
        cloned?;

        driver::finish_install(&checkout, vendor_dir, version)
    }
}

#[async_trait]
impl Publisher for GitProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Git
    }

    async fn test(&self) -> Result<()> {
        self.runner.probe().await
    }

    async fn repository_url(&self) -> Result<String> {
        self.git(&["config", "remote.origin.url"]).await
    }

    async fn repository_file_list(&self) -> Result<Vec<String>> {
        let output = self.git(&["ls-files"]).await?;
        Ok(output.lines().filter(|l| !l.is_empty()).map(str::to_string).collect())
    }

    async fn last_commit(&self) -> Result<CommitInfo> {
        Ok(CommitInfo {
            revision: self.last_commit_revision().await?,
            author_name: self.last_commit_author_name().await?,
            author_email: self.last_commit_email().await?,
        })
    }

    async fn last_commit_revision(&self) -> Result<String> {
        self.git(&["rev-parse", "HEAD"]).await
    }

    async fn last_commit_author_name(&self) -> Result<String> {
        self.git(&["log", "-1", "--format=%an"]).await
    }

    async fn last_commit_email(&self) -> Result<String> {
        self.git(&["log", "-1", "--format=%ae"]).await
    }

    async fn create_tag(&self, name: &str) -> Result<()> {
        self.git(&["tag", name]).await.map(|_| ())
    }

    async fn validate_commit(&self, revision: &str) -> Result<()> {
        let heads = self.remote_heads().await?;

        for (reference, sha) in &heads {
            // Exits non-zero when the head is unknown locally or not a descendant
            if self
                .runner
                .succeeds(&["merge-base", "--is-ancestor", revision, sha], Some(&self.working_dir))
                .await?
            {
                log::debug!("{} is contained in {}", revision, reference);
                return Ok(());
            }
        }

        Err(QpxError::NotPublished {
            revision: short_revision(revision),
        })
    }
}
