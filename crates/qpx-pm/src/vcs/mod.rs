//! Source providers for Git, Mercurial and GitHub tarballs.
//!
//! Every provider implements [`Installer`], which lands a pinned revision in
//! the vendor tree. Git and Mercurial also implement [`Publisher`] for the
//! checkout a package is published from. [`ProviderSelector`] chooses between
//! them by repository kind and tool availability.

mod driver;
mod git;
mod github;
mod mercurial;
mod process;
mod selector;

pub use driver::{parse_github_url, CommitInfo, InstalledPackage, Installer, ProviderKind, Publisher};
pub use git::GitProvider;
pub use github::TarballProvider;
pub use mercurial::MercurialProvider;
pub use process::ProcessRunner;
pub use selector::ProviderSelector;
