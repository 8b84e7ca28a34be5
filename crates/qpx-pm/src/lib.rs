pub mod cli;
pub mod config;
pub mod downloader;
pub mod error;
pub mod http;
pub mod installer;
pub mod integrity;
pub mod package;
pub mod registry;
pub mod vcs;

#[cfg(test)]
mod test_support;

/// Manifest file at the root of every package
pub const PACKAGE_FILE: &str = "qpm.json";

/// Detached signature written beside the manifest
pub const SIGNATURE_FILE: &str = "qpm.asc";

pub const VENDOR_DIR: &str = "vendor";

pub use config::Config;
pub use error::{QpxError, Result};
pub use installer::{InstallReport, PackageInstaller, UninstallReport};
pub use package::{DependencyEntry, Manifest, RepoKind, RepositoryDescriptor, VersionPin};
pub use registry::{HttpRegistry, Registry};
pub use vcs::{Installer, ProviderSelector, Publisher};
