//! Package model: the `qpm.json` manifest, its `name@label` dependency
//! entries and the repository descriptor it points at.

mod dependency;
mod manifest;
mod repository;

pub use dependency::{merge_dependency, DependencyEntry, MergeOutcome};
pub use manifest::{namespace_path, Author, Manifest, VersionPin};
pub use repository::{RepoKind, RepositoryDescriptor};
