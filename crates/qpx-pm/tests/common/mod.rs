//! Fixtures shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use qpx_pm::registry::{DependencyResponse, Registry, ResolvedDependency};
use qpx_pm::{Manifest, RepoKind, RepositoryDescriptor, Result, VersionPin};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Mutex;

pub fn git(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git").args(args).current_dir(dir).output().unwrap();
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

/// A committed git checkout of a package with the given manifest and files
pub fn create_package_repo(dir: &Path, manifest: serde_json::Value, files: &[(&str, &str)]) -> PathBuf {
    fs::create_dir_all(dir).unwrap();

    git(dir, &["init", "--quiet"]);
    git(dir, &["config", "user.email", "test@test.com"]);
    git(dir, &["config", "user.name", "Test"]);
    git(dir, &["config", "commit.gpgsign", "false"]);

    fs::write(dir.join("qpm.json"), serde_json::to_string_pretty(&manifest).unwrap()).unwrap();
    for (path, content) in files {
        let path = dir.join(path);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    git(dir, &["add", "."]);
    git(dir, &["commit", "--quiet", "-m", "Initial commit"]);
    dir.to_path_buf()
}

pub fn head(dir: &Path) -> String {
    git(dir, &["rev-parse", "HEAD"])
}

pub fn resolved(name: &str, label: &str, revision: &str, repo: &Path) -> ResolvedDependency {
    ResolvedDependency {
        name: name.to_string(),
        version: VersionPin::new(label, revision),
        repository: RepositoryDescriptor::new(RepoKind::Git, repo.to_str().unwrap()),
    }
}

/// Registry answering every dependency query with a canned response
pub struct StaticRegistry {
    pub response: Mutex<DependencyResponse>,
    pub queries: Mutex<Vec<Vec<String>>>,
}

impl StaticRegistry {
    pub fn new(dependencies: Vec<ResolvedDependency>) -> Self {
        Self {
            response: Mutex::new(DependencyResponse {
                dependencies,
                messages: Vec::new(),
            }),
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn answer(&self, dependencies: Vec<ResolvedDependency>) {
        self.response.lock().unwrap().dependencies = dependencies;
    }
}

#[async_trait]
impl Registry for StaticRegistry {
    async fn dependencies(&self, packages: &[String], _license: &str) -> Result<DependencyResponse> {
        self.queries.lock().unwrap().push(packages.to_vec());
        Ok(self.response.lock().unwrap().clone())
    }

    async fn license(&self, name: &str) -> Result<String> {
        Ok(format!("{} license text", name))
    }

    async fn publish(&self, _token: &str, _manifest: &Manifest) -> Result<()> {
        Ok(())
    }
}
