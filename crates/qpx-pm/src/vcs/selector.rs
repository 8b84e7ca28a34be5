//! Picks the provider for a repository descriptor.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::cli::ProgressManager;
use crate::config::Config;
use crate::error::{QpxError, Result};
use crate::http::HttpClient;
use crate::package::{RepoKind, RepositoryDescriptor};
use super::driver::{Installer, Publisher};
use super::git::GitProvider;
use super::github::TarballProvider;
use super::mercurial::MercurialProvider;
use super::process::ProcessRunner;

pub struct ProviderSelector {
    git_binary: String,
    hg_binary: String,
    timeout: Duration,
    github_api_url: String,
    http_client: Arc<HttpClient>,
    progress: Option<Arc<ProgressManager>>,
}

impl ProviderSelector {
    pub fn new(config: &Config, http_client: Arc<HttpClient>) -> Self {
        Self {
            git_binary: config.git_binary.clone(),
            hg_binary: config.hg_binary.clone(),
            timeout: config.process_timeout_duration(),
            github_api_url: config.github_api_url.clone(),
            http_client,
            progress: None,
        }
    }

    pub fn with_progress(mut self, progress: Arc<ProgressManager>) -> Self {
        self.progress = Some(progress);
        self
    }

    fn git(&self) -> GitProvider {
        let provider = GitProvider::new(&self.git_binary, self.timeout);
        match &self.progress {
            Some(progress) => provider.with_progress(progress.clone()),
            None => provider,
        }
    }

    fn mercurial(&self) -> MercurialProvider {
        let provider = MercurialProvider::new(&self.hg_binary, self.timeout);
        match &self.progress {
            Some(progress) => provider.with_progress(progress.clone()),
            None => provider,
        }
    }

    fn tarball(&self) -> TarballProvider {
        let provider = TarballProvider::new(self.http_client.clone(), &self.github_api_url);
        match &self.progress {
            Some(progress) => provider.with_progress(progress.clone()),
            None => provider,
        }
    }

    async fn available(&self, binary: &str) -> Result<()> {
        ProcessRunner::new(binary, self.timeout).probe().await
    }

    /// The provider that fetches packages from `repository`.
    ///
    /// Git repositories fall back to the GitHub tarball endpoint when `git`
    /// cannot be run; Mercurial has no fallback.
    pub async fn create_installer(&self, repository: &RepositoryDescriptor) -> Result<Box<dyn Installer>> {
        match repository.kind {
            RepoKind::Git => match self.available(&self.git_binary).await {
                Ok(()) => Ok(Box::new(self.git())),
                Err(e) => {
                    log::warn!("{}; downloading {} as a tarball instead", e, repository.url);
                    Ok(Box::new(self.tarball()))
                }
            },
            RepoKind::GitHub => Ok(Box::new(self.tarball())),
            RepoKind::Mercurial => {
                self.available(&self.hg_binary).await?;
                Ok(Box::new(self.mercurial()))
            }
            RepoKind::Auto => Err(QpxError::UnsupportedRepository(repository.kind.to_string())),
        }
    }

    /// The provider that inspects and tags the checkout in `working_dir`
    pub async fn create_publisher(
        &self,
        repository: &RepositoryDescriptor,
        working_dir: &Path,
    ) -> Result<Box<dyn Publisher>> {
        match repository.resolve_auto(working_dir)?.kind {
            RepoKind::Git | RepoKind::GitHub => {
                let provider = self.git().with_working_dir(working_dir);
                Publisher::test(&provider).await?;
                Ok(Box::new(provider))
            }
            RepoKind::Mercurial => {
                let provider = self.mercurial().with_working_dir(working_dir);
                Publisher::test(&provider).await?;
                Ok(Box::new(provider))
            }
            RepoKind::Auto => Err(QpxError::UnsupportedRepository(repository.kind.to_string())),
        }
    }

    /// Resolve an `Auto` descriptor by probing `dir`
    pub fn resolve_auto(&self, repository: &RepositoryDescriptor, dir: &Path) -> Result<RepositoryDescriptor> {
        repository.resolve_auto(dir)
    }
}
