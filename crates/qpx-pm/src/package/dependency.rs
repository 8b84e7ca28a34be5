use serde::{Deserialize, Serialize};
use std::fmt;

use super::manifest::VersionPin;

/// One `name@label` entry of a manifest's dependency list.
///
/// Both parts are lower-cased on parse; the entry is keyed by `name` only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct DependencyEntry {
    pub name: String,
    pub version: VersionPin,
}

impl DependencyEntry {
    pub fn new(name: &str, version: VersionPin) -> Self {
        Self {
            name: name.to_lowercase(),
            version: VersionPin {
                label: version.label.to_lowercase(),
                ..version
            },
        }
    }

    /// Parse `name@label`; a missing `@label` yields an empty label
    pub fn parse(entry: &str) -> Self {
        let (name, label) = match entry.split_once('@') {
            Some((name, label)) => (name, label),
            None => (entry, ""),
        };

        Self::new(name.trim(), VersionPin::new(label.trim(), ""))
    }

    /// Two entries satisfy each other when their labels match
    pub fn same_version(&self, other: &DependencyEntry) -> bool {
        self.version.label == other.version.label
    }
}

impl fmt::Display for DependencyEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.version.label.is_empty() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{}@{}", self.name, self.version.label)
        }
    }
}

impl From<String> for DependencyEntry {
    fn from(entry: String) -> Self {
        Self::parse(&entry)
    }
}

impl From<DependencyEntry> for String {
    fn from(entry: DependencyEntry) -> Self {
        entry.to_string()
    }
}

/// What `merge_dependency` did to the list
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeOutcome {
    Added,
    AlreadySatisfied,
    Replaced { previous: DependencyEntry },
}

/// Merge `incoming` into `existing` with last-write-wins semantics.
///
/// An absent name is appended, an equal version is left alone and a different
/// version replaces the old entry in place with a warning. Applying the same
/// entry twice leaves the list as applying it once.
pub fn merge_dependency(existing: &mut Vec<DependencyEntry>, incoming: DependencyEntry) -> MergeOutcome {
    let incoming = DependencyEntry::new(&incoming.name, incoming.version);

    match existing.iter_mut().find(|d| d.name == incoming.name) {
        None => {
            existing.push(incoming);
            MergeOutcome::Added
        }
        Some(current) if current.same_version(&incoming) => MergeOutcome::AlreadySatisfied,
        Some(current) => {
            log::warn!(
                "{} is already a dependency at {}, replacing it with {}",
                current.name,
                current.version.label,
                incoming.version.label
            );
            let previous = std::mem::replace(current, incoming);
            MergeOutcome::Replaced { previous }
        }
    }
}
