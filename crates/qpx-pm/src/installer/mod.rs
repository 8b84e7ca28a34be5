//! Installing and removing packages in the vendor directory.

mod installer;

pub use installer::{InstallReport, PackageInstaller, UninstallReport};
