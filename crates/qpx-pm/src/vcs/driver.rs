//! Provider capability traits and the install steps every provider shares.

use async_trait::async_trait;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use crate::error::{QpxError, Result};
use crate::package::{Manifest, RepositoryDescriptor, VersionPin};

/// Which back-end a provider talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Git,
    Mercurial,
    Tarball,
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderKind::Git => write!(f, "git"),
            ProviderKind::Mercurial => write!(f, "mercurial"),
            ProviderKind::Tarball => write!(f, "github tarball"),
        }
    }
}

/// A package that landed in the vendor tree
#[derive(Debug, Clone)]
pub struct InstalledPackage {
    /// Manifest as loaded from the package, revision stamped if it had none
    pub manifest: Manifest,
    pub path: PathBuf,
}

/// Tip of the local checkout
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitInfo {
    pub revision: String,
    pub author_name: String,
    pub author_email: String,
}

/// Fetches a pinned revision of a repository into the vendor tree
#[async_trait]
pub trait Installer: Send + Sync {
    fn kind(&self) -> ProviderKind;

    async fn install(
        &self,
        repository: &RepositoryDescriptor,
        version: &VersionPin,
        vendor_dir: &Path,
    ) -> Result<InstalledPackage>;
}

/// Queries and tags the local checkout a package is published from
#[async_trait]
pub trait Publisher: Send + Sync {
    fn kind(&self) -> ProviderKind;

    /// Check the tool is runnable
    async fn test(&self) -> Result<()>;

    async fn repository_url(&self) -> Result<String>;

    /// Tracked files, relative to the working directory
    async fn repository_file_list(&self) -> Result<Vec<String>>;

    async fn last_commit(&self) -> Result<CommitInfo>;

    async fn last_commit_revision(&self) -> Result<String> {
        Ok(self.last_commit().await?.revision)
    }

    async fn last_commit_author_name(&self) -> Result<String> {
        Ok(self.last_commit().await?.author_name)
    }

    async fn last_commit_email(&self) -> Result<String> {
        Ok(self.last_commit().await?.author_email)
    }

    async fn create_tag(&self, name: &str) -> Result<()>;

    /// Fails with [`QpxError::NotPublished`] unless the remote already has `revision`
    async fn validate_commit(&self, revision: &str) -> Result<()>;
}

/// Parse a GitHub URL into owner and repository name
pub fn parse_github_url(url: &str) -> Option<(String, String)> {
    // https://github.com/owner/repo, git@github.com:owner/repo.git, git://github.com/owner/repo
    let url = url.trim().trim_end_matches('/').trim_end_matches(".git");

    let rest = ["https://github.com/", "http://github.com/", "git://github.com/", "git@github.com:", "ssh://git@github.com/"]
        .iter()
        .find_map(|prefix| url.strip_prefix(prefix))?;

    let mut parts = rest.split('/');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(owner), Some(repo), None) if !owner.is_empty() && !repo.is_empty() => {
            Some((owner.to_string(), repo.to_string()))
        }
        _ => None,
    }
}

/// A scratch directory inside the vendor tree, removed when dropped.
///
/// Staging next to the destination keeps the final move a rename on one
/// filesystem.
pub(crate) fn staging_dir(vendor_dir: &Path) -> Result<TempDir> {
    fs::create_dir_all(vendor_dir)?;
    Ok(tempfile::Builder::new().prefix(".qpx-").tempdir_in(vendor_dir)?)
}

/// Load the manifest of a staged checkout and move it to its namespace path,
/// replacing whatever was installed there before.
pub(crate) fn finish_install(staged_root: &Path, vendor_dir: &Path, version: &VersionPin) -> Result<InstalledPackage> {
    let mut manifest = Manifest::load(staged_root)?;

    if manifest.name.trim().is_empty() {
        return Err(QpxError::InvalidManifest {
            message: format!("{} has no package name", staged_root.join(crate::PACKAGE_FILE).display()),
        });
    }

    let target = vendor_dir.join(manifest.namespace_path()?);

    if manifest.version.revision.is_empty() {
        manifest.version.revision = version.revision.clone();
    }

    if target.exists() {
        log::debug!("Removing previous install at {}", target.display());
        fs::remove_dir_all(&target)?;
    }
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)?;
    }

    fs::rename(staged_root, &target)?;
    log::info!("Installed {} into {}", manifest.name, target.display());

    Ok(InstalledPackage { manifest, path: target })
}
