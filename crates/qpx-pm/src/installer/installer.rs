use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::cli::Output;
use crate::config::Config;
use crate::error::{QpxError, Result};
use crate::package::{merge_dependency, namespace_path, DependencyEntry, Manifest, MergeOutcome, VersionPin};
use crate::registry::{Advisory, AdvisoryKind, Registry, ResolvedDependency};
use crate::vcs::{InstalledPackage, ProviderSelector};
use crate::PACKAGE_FILE;

/// What an install run did
#[derive(Debug, Default)]
pub struct InstallReport {
    pub installed: Vec<InstalledPackage>,
    /// How each installed package was merged into the root manifest
    pub merged: Vec<(DependencyEntry, MergeOutcome)>,
    /// Root manifest written at the end, if anything was installed
    pub manifest_path: Option<PathBuf>,
}

/// What an uninstall removed
#[derive(Debug, Default)]
pub struct UninstallReport {
    pub removed_entry: Option<DependencyEntry>,
    pub removed_dir: Option<PathBuf>,
}

/// Installs registry-resolved packages into the vendor tree and records
/// them in the root `qpm.json`.
pub struct PackageInstaller {
    working_dir: PathBuf,
    vendor_dir: PathBuf,
    registry: Arc<dyn Registry>,
    selector: ProviderSelector,
    output: Output,
}

impl PackageInstaller {
    pub fn new(
        config: &Config,
        working_dir: impl Into<PathBuf>,
        registry: Arc<dyn Registry>,
        selector: ProviderSelector,
    ) -> Self {
        let working_dir = working_dir.into();
        let vendor_dir = working_dir.join(config.get_vendor_dir());

        Self {
            working_dir,
            vendor_dir,
            registry,
            selector,
            output: Output::new(),
        }
    }

    pub fn with_output(mut self, output: Output) -> Self {
        self.output = output;
        self
    }

    pub fn vendor_dir(&self) -> &Path {
        &self.vendor_dir
    }

    /// Directory a package is (or would be) installed at
    pub fn package_dir(&self, name: &str) -> Result<PathBuf> {
        Ok(self.vendor_dir.join(namespace_path(&name.to_lowercase())?))
    }

    /// Install `names`, or every dependency of the root manifest when empty.
    ///
    /// `confirm` is asked about every registry message that requires
    /// confirmation; declining aborts before anything is fetched. Packages
    /// are fetched one at a time in registry order and merged into the root
    /// manifest only after all of them landed.
    pub async fn install<F>(&self, names: &[String], mut confirm: F) -> Result<InstallReport>
    where
        F: FnMut(&Advisory) -> bool,
    {
        let mut manifest = if self.working_dir.join(PACKAGE_FILE).exists() {
            Manifest::load(&self.working_dir)?
        } else if names.is_empty() {
            return Err(QpxError::NotFound(format!(
                "No {} file found in {}",
                PACKAGE_FILE,
                self.working_dir.display()
            )));
        } else {
            Manifest::default()
        };

        let packages: Vec<String> = if names.is_empty() {
            manifest.dependencies.iter().map(|d| d.to_string()).collect()
        } else {
            names.to_vec()
        };

        if packages.is_empty() {
            self.output.info("Nothing to install");
            return Ok(InstallReport::default());
        }

        let license = manifest.license.clone().unwrap_or_default();
        let response = self.registry.dependencies(&packages, &license).await?;

        for advisory in &response.messages {
            self.output.advisory(advisory);

            if advisory.kind == AdvisoryKind::Error {
                return Err(QpxError::Aborted(advisory.title.clone()));
            }
            if advisory.prompt && !confirm(advisory) {
                return Err(QpxError::Aborted(advisory.title.clone()));
            }
        }

        if response.dependencies.is_empty() {
            self.output.info("No package(s) found");
            return Ok(InstallReport::default());
        }

        fs::create_dir_all(&self.vendor_dir)?;

        let mut report = InstallReport::default();
        for dependency in &response.dependencies {
            self.output.info(&format!(
                "Installing {}@{}",
                dependency.name, dependency.version.label
            ));
            report.installed.push(self.install_dependency(dependency).await?);
        }

        for (dependency, installed) in response.dependencies.iter().zip(&report.installed) {
            let entry = dependency_entry(dependency, installed);
            let outcome = merge_dependency(&mut manifest.dependencies, entry.clone());

            if outcome == MergeOutcome::AlreadySatisfied {
                self.output.info(&format!("The package is already a dependency: {}", entry));
            }
            report.merged.push((entry, outcome));
        }

        report.manifest_path = Some(manifest.save(&self.working_dir)?);
        Ok(report)
    }

    /// Fetch a single resolved dependency into the vendor tree
    pub async fn install_dependency(&self, dependency: &ResolvedDependency) -> Result<InstalledPackage> {
        let installer = self.selector.create_installer(&dependency.repository).await?;
        log::debug!("Installing {} with the {} provider", dependency.name, installer.kind());

        installer
            .install(&dependency.repository, &dependency.version, &self.vendor_dir)
            .await
    }

    /// Remove a package from the root manifest and the vendor tree.
    ///
    /// Namespace directories left empty are removed as well, up to the
    /// vendor directory itself.
    pub fn uninstall(&self, name: &str) -> Result<UninstallReport> {
        let name = name.trim().to_lowercase();
        let target = self.package_dir(&name)?;
        let mut report = UninstallReport::default();

        if self.working_dir.join(PACKAGE_FILE).exists() {
            let mut manifest = Manifest::load(&self.working_dir)?;
            if let Some(entry) = manifest.remove_dependency(&name) {
                manifest.save(&self.working_dir)?;
                report.removed_entry = Some(entry);
            }
        }

        if target.is_dir() {
            fs::remove_dir_all(&target)?;
            self.prune_empty_parents(&target)?;
            report.removed_dir = Some(target);
        }

        if report.removed_entry.is_none() && report.removed_dir.is_none() {
            return Err(QpxError::NotFound(format!("Package {} was not found", name)));
        }

        Ok(report)
    }

    fn prune_empty_parents(&self, removed: &Path) -> Result<()> {
        let mut current = removed.parent();

        while let Some(dir) = current {
            if dir == self.vendor_dir || !dir.starts_with(&self.vendor_dir) {
                break;
            }
            if fs::read_dir(dir)?.next().is_some() {
                break;
            }

            log::debug!("Removing empty directory {}", dir.display());
            fs::remove_dir(dir)?;
            current = dir.parent();
        }

        Ok(())
    }
}

/// The root manifest entry for a package that was just installed
fn dependency_entry(dependency: &ResolvedDependency, installed: &InstalledPackage) -> DependencyEntry {
    let name = if installed.manifest.name.is_empty() {
        &dependency.name
    } else {
        &installed.manifest.name
    };
    let label = if installed.manifest.version.label.is_empty() {
        &dependency.version.label
    } else {
        &installed.manifest.version.label
    };

    DependencyEntry::new(name, VersionPin::new(label.as_str(), ""))
}
