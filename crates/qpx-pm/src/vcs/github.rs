//! Tarball provider: installs GitHub repositories without any VCS tool.

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

use crate::cli::ProgressManager;
use crate::downloader::FileDownloader;
use crate::error::{QpxError, Result};
use crate::http::HttpClient;
use crate::package::{RepositoryDescriptor, VersionPin};
use super::driver::{self, parse_github_url, InstalledPackage, Installer, ProviderKind};

pub struct TarballProvider {
    api_url: String,
    downloader: FileDownloader,
}

impl TarballProvider {
    /// `api_url` is the repos endpoint, e.g. `https://api.github.com/repos`
    pub fn new(http_client: Arc<HttpClient>, api_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into().trim_end_matches('/').to_string(),
            downloader: FileDownloader::new(http_client),
        }
    }

    pub fn with_progress(mut self, progress: Arc<ProgressManager>) -> Self {
        self.downloader = self.downloader.with_progress(progress);
        self
    }

    /// The archive URL of `revision`; the default branch when it is empty
    pub fn tarball_url(&self, repository_url: &str, revision: &str) -> Result<String> {
        let (owner, repo) = parse_github_url(repository_url).ok_or_else(|| {
            QpxError::Config(format!("{} is not a GitHub repository URL", repository_url))
        })?;

        let mut url = format!("{}/{}/{}/tarball", self.api_url, owner, repo);
        if !revision.is_empty() {
            url.push('/');
            url.push_str(revision);
        }
        Ok(url)
    }
}

#[async_trait]
impl Installer for TarballProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Tarball
    }

    async fn install(
        &self,
        repository: &RepositoryDescriptor,
        version: &VersionPin,
        vendor_dir: &Path,
    ) -> Result<InstalledPackage> {
        let url = self.tarball_url(&repository.url, &version.revision)?;
        log::info!("Downloading {}", url);

        let staging = driver::staging_dir(vendor_dir)?;
        let root = self
            .downloader
            .download_and_extract(&url, staging.path(), &repository.url)
            .await?;

        driver::finish_install(&root, vendor_dir, version)
    }
}
