use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

use crate::error::{QpxError, Result};

/// Version-control back-end a package is published from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RepoKind {
    /// Probe the working directory for `.git` / `.hg`
    Auto,
    Git,
    Mercurial,
    #[serde(alias = "GITHUB_TARBALL")]
    #[serde(rename = "GITHUB")]
    GitHub,
}

impl Default for RepoKind {
    fn default() -> Self {
        RepoKind::Auto
    }
}

impl fmt::Display for RepoKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RepoKind::Auto => "AUTO",
            RepoKind::Git => "GIT",
            RepoKind::Mercurial => "MERCURIAL",
            RepoKind::GitHub => "GITHUB",
        };
        f.write_str(name)
    }
}

/// Where a package's sources live
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryDescriptor {
    #[serde(rename = "type", default)]
    pub kind: RepoKind,

    #[serde(default)]
    pub url: String,
}

impl RepositoryDescriptor {
    pub fn new(kind: RepoKind, url: impl Into<String>) -> Self {
        Self {
            kind,
            url: url.into(),
        }
    }

    /// Resolve an `Auto` descriptor against the checkout in `dir`.
    ///
    /// `.git` takes precedence over `.hg` when both exist. Other kinds are
    /// returned unchanged.
    pub fn resolve_auto(&self, dir: &Path) -> Result<Self> {
        if self.kind != RepoKind::Auto {
            return Ok(self.clone());
        }

        let kind = if dir.join(".git").exists() {
            RepoKind::Git
        } else if dir.join(".hg").exists() {
            RepoKind::Mercurial
        } else {
            return Err(QpxError::Config(format!(
                "Cannot detect the repository type of {}: no .git or .hg found",
                dir.display()
            )));
        };

        log::debug!("Detected {} repository in {}", kind, dir.display());

        Ok(Self {
            kind,
            url: self.url.clone(),
        })
    }
}
