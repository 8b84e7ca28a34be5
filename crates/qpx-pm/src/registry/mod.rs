//! Client side of the package registry.
//!
//! The registry resolves package names to a flat list of pinned
//! dependencies; qpx never solves versions itself.

mod http;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::package::{Manifest, RepositoryDescriptor, VersionPin};

pub use http::HttpRegistry;

/// Severity of a message the registry attaches to a response
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AdvisoryKind {
    #[default]
    Info,
    Warning,
    Error,
}

/// A message for the user, e.g. a deprecation notice
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Advisory {
    #[serde(rename = "type", default)]
    pub kind: AdvisoryKind,

    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub body: String,

    /// The user has to confirm before the operation continues
    #[serde(default)]
    pub prompt: bool,
}

/// One resolved package to install
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedDependency {
    pub name: String,

    #[serde(default)]
    pub version: VersionPin,

    #[serde(default)]
    pub repository: RepositoryDescriptor,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DependencyResponse {
    #[serde(default)]
    pub dependencies: Vec<ResolvedDependency>,

    #[serde(default)]
    pub messages: Vec<Advisory>,
}

#[async_trait]
pub trait Registry: Send + Sync {
    /// Resolve `packages` (names or `name@label`) to pinned dependencies
    async fn dependencies(&self, packages: &[String], license: &str) -> Result<DependencyResponse>;

    /// Full text of a license by SPDX identifier
    async fn license(&self, name: &str) -> Result<String>;

    async fn publish(&self, token: &str, manifest: &Manifest) -> Result<()>;
}
