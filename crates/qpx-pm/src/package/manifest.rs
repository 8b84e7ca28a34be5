use indexmap::IndexMap;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Component, Path, PathBuf};

use crate::error::{QpxError, Result};
use crate::PACKAGE_FILE;
use super::dependency::DependencyEntry;
use super::repository::RepositoryDescriptor;

lazy_static! {
    static ref PACKAGE_NAME_RE: Regex = Regex::new(
        r"^[a-zA-Z]{2,}\.[a-zA-Z0-9][a-zA-Z0-9\-]{0,61}[a-zA-Z0-9]?(\.[a-zA-Z0-9][a-zA-Z0-9\-]{0,61}[a-zA-Z0-9]?)+$"
    ).unwrap();
    static ref VERSION_LABEL_RE: Regex = Regex::new(r"[0-9]\.[0-9]\.[0-9]*").unwrap();
    static ref AUTHOR_NAME_RE: Regex = Regex::new(r"^[\p{L}\s'.-]+$").unwrap();
    static ref AUTHOR_EMAIL_RE: Regex = Regex::new(r".+@.+\..+").unwrap();
}

/// A pinned version of a package
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionPin {
    #[serde(default)]
    pub label: String,

    /// VCS commit / changeset id or tag
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub revision: String,

    /// Hex-encoded 20-byte OpenPGP fingerprint of the signing key
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub fingerprint: String,
}

impl VersionPin {
    pub fn new(label: impl Into<String>, revision: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            revision: revision.into(),
            fingerprint: String::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub email: String,
}

/// Contents of a `qpm.json` file.
///
/// Fields this crate does not know about are kept in `extra` and written back
/// unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,

    #[serde(default)]
    pub version: VersionPin,

    #[serde(default)]
    pub author: Author,

    #[serde(default)]
    pub dependencies: Vec<DependencyEntry>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,

    #[serde(default)]
    pub repository: RepositoryDescriptor,

    #[serde(rename = "priFilename", alias = "pri_filename", default, skip_serializing_if = "String::is_empty")]
    pub pri_filename: String,

    #[serde(flatten)]
    pub extra: IndexMap<String, serde_json::Value>,
}

impl Manifest {
    /// Load `qpm.json` from a package directory
    pub fn load(dir: &Path) -> Result<Self> {
        Self::load_file(&dir.join(PACKAGE_FILE))
    }

    pub fn load_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                QpxError::NotFound(format!("{} does not exist", path.display()))
            } else {
                QpxError::Io(e)
            }
        })?;

        Self::parse(&content).map_err(|e| QpxError::InvalidManifest {
            message: format!("{}: {}", path.display(), e),
        })
    }

    pub fn parse(content: &str) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_str(content)
    }

    /// Write the manifest as `qpm.json` into `dir`, indented with two spaces
    pub fn save(&self, dir: &Path) -> Result<PathBuf> {
        let path = dir.join(PACKAGE_FILE);
        let mut content = serde_json::to_string_pretty(self)?;
        content.push('\n');
        fs::write(&path, content)?;
        Ok(path)
    }

    /// Check the fields a publishable package must carry
    pub fn validate(&self) -> Result<()> {
        let required = |field: &str| QpxError::InvalidManifest {
            message: format!("{} is a required field", field),
        };
        let formatted = |field: &str| QpxError::InvalidManifest {
            message: format!("{} requires a specific format", field),
        };

        if self.name.is_empty() {
            return Err(required("name"));
        }
        if !PACKAGE_NAME_RE.is_match(&self.name) {
            return Err(formatted("name"));
        }
        if !VERSION_LABEL_RE.is_match(&self.version.label) {
            return Err(formatted("version label"));
        }
        if self.version.revision.is_empty() {
            return Err(required("version revision"));
        }
        if !AUTHOR_NAME_RE.is_match(&self.author.name) {
            return Err(formatted("author name"));
        }
        if !AUTHOR_EMAIL_RE.is_match(&self.author.email) {
            return Err(formatted("author email"));
        }

        Ok(())
    }

    /// Relative vendor path of this package: `com.example.foo` -> `com/example/foo`
    pub fn namespace_path(&self) -> Result<PathBuf> {
        namespace_path(&self.name)
    }

    /// Drop the entry for `name`, returning it if it was present
    pub fn remove_dependency(&mut self, name: &str) -> Option<DependencyEntry> {
        let name = name.to_lowercase();
        let index = self.dependencies.iter().position(|d| d.name == name)?;
        Some(self.dependencies.remove(index))
    }
}

/// Map a dotted package name to its vendor sub-path.
///
/// Every segment must be a single plain path component, so the result is
/// always a relative path below the vendor directory.
pub fn namespace_path(name: &str) -> Result<PathBuf> {
    let invalid = || QpxError::InvalidManifest {
        message: format!("'{}' is not a valid package name", name),
    };

    let mut path = PathBuf::new();
    for segment in name.split('.') {
        if segment.is_empty() || segment.contains(['/', '\\']) {
            return Err(invalid());
        }
        let mut components = Path::new(segment).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(part)), None) => path.push(part),
            _ => return Err(invalid()),
        }
    }

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::package::RepoKind;
    use tempfile::TempDir;

    const FULL: &str = r#"{
  "name": "com.example.foo",
  "description": "A foo",
  "version": {
    "label": "1.0.0",
    "revision": "abc123",
    "fingerprint": "0123"
  },
  "author": {
    "name": "Jane Doe",
    "email": "jane@example.com"
  },
  "dependencies": ["com.example.bar@2.0.0"],
  "license": "MIT",
  "repository": {
    "type": "GITHUB",
    "url": "https://github.com/example/foo.git"
  },
  "priFilename": "foo.pri",
  "webpage": "https://example.com"
}"#;

    fn valid_manifest() -> Manifest {
        Manifest::parse(FULL).unwrap()
    }

    #[test]
    fn test_parse_full() {
        let manifest = valid_manifest();
        assert_eq!(manifest.name, "com.example.foo");
        assert_eq!(manifest.version.revision, "abc123");
        assert_eq!(manifest.author.email, "jane@example.com");
        assert_eq!(manifest.dependencies.len(), 1);
        assert_eq!(manifest.dependencies[0].name, "com.example.bar");
        assert_eq!(manifest.repository.kind, RepoKind::GitHub);
        assert_eq!(manifest.pri_filename, "foo.pri");
        assert_eq!(manifest.extra.get("webpage").and_then(|v| v.as_str()), Some("https://example.com"));
    }

    #[test]
    fn test_save_preserves_unknown_fields() {
        let temp = TempDir::new().unwrap();
        valid_manifest().save(temp.path()).unwrap();

        let reloaded = Manifest::load(temp.path()).unwrap();
        assert_eq!(reloaded.extra.get("webpage").and_then(|v| v.as_str()), Some("https://example.com"));
        assert_eq!(reloaded.dependencies, valid_manifest().dependencies);
    }

    #[test]
    fn test_load_missing_file() {
        let temp = TempDir::new().unwrap();
        assert!(matches!(Manifest::load(temp.path()), Err(QpxError::NotFound(_))));
    }

    #[test]
    fn test_load_invalid_json() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join(PACKAGE_FILE), "{").unwrap();
        assert!(matches!(Manifest::load(temp.path()), Err(QpxError::InvalidManifest { .. })));
    }

    #[test]
    fn test_validate() {
        assert!(valid_manifest().validate().is_ok());

        let mut manifest = valid_manifest();
        manifest.name = "foo".to_string();
        assert!(manifest.validate().is_err());

        let mut manifest = valid_manifest();
        manifest.version.revision.clear();
        let err = manifest.validate().unwrap_err();
        assert!(err.to_string().contains("version revision"));

        let mut manifest = valid_manifest();
        manifest.author.email = "nobody".to_string();
        assert!(manifest.validate().is_err());
    }

    #[test]
    fn test_namespace_path() {
        assert_eq!(valid_manifest().namespace_path().unwrap(), PathBuf::from("com/example/foo"));
        assert_eq!(namespace_path("io.qpm.x").unwrap(), Path::new("io").join("qpm").join("x"));
    }

    #[test]
    fn test_namespace_path_stays_below_vendor() {
        for name in ["", ".", "..", "/tmp/victim", "com..foo", "com.example.", "com/../..", "com.ex\\ample"] {
            assert!(
                matches!(namespace_path(name), Err(QpxError::InvalidManifest { .. })),
                "{} was accepted",
                name
            );
        }
    }

    #[test]
    fn test_remove_dependency() {
        let mut manifest = valid_manifest();
        let removed = manifest.remove_dependency("COM.example.bar").unwrap();
        assert_eq!(removed.version.label, "2.0.0");
        assert!(manifest.dependencies.is_empty());
        assert!(manifest.remove_dependency("com.example.bar").is_none());
    }
}
