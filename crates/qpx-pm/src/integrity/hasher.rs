//! Deterministic content digest over a package tree.
//!
//! Every file is hashed on its own with SHA-256 and the per-file digests are
//! fed, in sorted path order, into a master SHA-256. The result only depends
//! on which files are present and what they contain.

use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::error::Result;
use crate::SIGNATURE_FILE;

/// Directories never considered part of a package's content
const VCS_METADATA_DIRS: &[&str] = &[".git", ".hg"];

/// Digest a set of files.
///
/// Paths are sorted on their string form with `\` normalised to `/`, so the
/// caller's enumeration order and the platform's separator do not matter.
/// Directories and files named `qpm.asc` are skipped.
pub fn digest_paths<P: AsRef<Path>>(files: &[P]) -> Result<String> {
    let mut sorted: Vec<(String, &Path)> = files
        .iter()
        .map(|p| {
            let path = p.as_ref();
            (path.to_string_lossy().replace('\\', "/"), path)
        })
        .collect();
    sorted.sort_by(|a, b| a.0.cmp(&b.0));

    let mut master = Sha256::new();

    for (_, path) in sorted {
        if fs::metadata(path)?.is_dir() {
            continue;
        }
        if path.file_name().map_or(false, |name| name == SIGNATURE_FILE) {
            continue;
        }

        let mut file = File::open(path)?;
        let mut hasher = Sha256::new();
        io::copy(&mut file, &mut hasher)?;
        master.update(hasher.finalize());
    }

    Ok(format!("{:x}", master.finalize()))
}

/// Digest files given relative to `root`, as returned by a publisher's file list
pub fn digest_file_list<S: AsRef<str>>(root: &Path, relative_paths: &[S]) -> Result<String> {
    let files: Vec<PathBuf> = relative_paths
        .iter()
        .map(|p| root.join(p.as_ref()))
        .collect();
    digest_paths(&files)
}

/// Every regular file below `root`, skipping `.git` and `.hg` directories
pub fn collect_tree(root: &Path) -> Result<Vec<PathBuf>> {
    let walker = WalkDir::new(root).into_iter().filter_entry(|entry| {
        !(entry.file_type().is_dir()
            && entry
                .file_name()
                .to_str()
                .map_or(false, |name| VCS_METADATA_DIRS.contains(&name)))
    });

    let mut files = Vec::new();
    for entry in walker {
        let entry = entry.map_err(|e| {
            let message = e.to_string();
            e.into_io_error()
                .unwrap_or_else(|| io::Error::new(io::ErrorKind::Other, message))
        })?;

        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }

    Ok(files)
}

/// Digest a whole checkout as found on disk
pub fn digest_tree(root: &Path) -> Result<String> {
    let files = collect_tree(root)?;
    log::debug!("Hashing {} files below {}", files.len(), root.display());
    digest_paths(&files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &str) -> PathBuf {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_empty_set() {
        let empty: [&Path; 0] = [];
        // SHA-256 of no input
        assert_eq!(
            digest_paths(&empty).unwrap(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_order_independent() {
        let temp = TempDir::new().unwrap();
        let a = write(temp.path(), "a.qml", "A");
        let b = write(temp.path(), "sub/b.qml", "B");
        let c = write(temp.path(), "c.js", "C");

        let forward = digest_paths(&[a.clone(), b.clone(), c.clone()]).unwrap();
        let backward = digest_paths(&[c, b, a]).unwrap();
        assert_eq!(forward, backward);
        assert_eq!(forward.len(), 64);
    }

    #[test]
    fn test_hash_of_hashes() {
        let temp = TempDir::new().unwrap();
        let a = write(temp.path(), "a", "hello");

        let mut master = Sha256::new();
        master.update(Sha256::digest(b"hello"));
        let expected = format!("{:x}", master.finalize());

        assert_eq!(digest_paths(&[a]).unwrap(), expected);
    }

    #[test]
    fn test_skips_signature_and_directories() {
        let temp = TempDir::new().unwrap();
        let a = write(temp.path(), "a.qml", "A");
        let sig = write(temp.path(), "qpm.asc", "-----BEGIN PGP SIGNATURE-----");
        let dir = temp.path().join("sub");
        fs::create_dir(&dir).unwrap();

        assert_eq!(
            digest_paths(&[a.clone(), sig, dir]).unwrap(),
            digest_paths(&[a]).unwrap()
        );
    }

    #[test]
    fn test_content_change_changes_digest() {
        let temp = TempDir::new().unwrap();
        let a = write(temp.path(), "a.qml", "A");
        let before = digest_paths(&[&a]).unwrap();

        fs::write(&a, "B").unwrap();
        assert_ne!(before, digest_paths(&[&a]).unwrap());
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let temp = TempDir::new().unwrap();
        let err = digest_paths(&[temp.path().join("nope")]).unwrap_err();
        assert!(matches!(err, crate::error::QpxError::Io(_)));
    }

    #[test]
    fn test_collect_tree_skips_vcs_metadata() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "qpm.json", "{}");
        write(temp.path(), ".git/HEAD", "ref: refs/heads/master");
        write(temp.path(), ".hg/store/data", "x");
        write(temp.path(), ".github/workflows/ci.yml", "on: push");

        let mut files: Vec<String> = collect_tree(temp.path())
            .unwrap()
            .iter()
            .map(|p| p.strip_prefix(temp.path()).unwrap().to_string_lossy().replace('\\', "/"))
            .collect();
        files.sort();

        assert_eq!(files, vec![".github/workflows/ci.yml", "qpm.json"]);
    }

    #[test]
    fn test_tree_matches_file_list() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "qpm.json", "{}");
        write(temp.path(), "src/Foo.qml", "Item {}");
        write(temp.path(), "qpm.asc", "sig");

        let listed = digest_file_list(temp.path(), &["src/Foo.qml", "qpm.json"]).unwrap();
        assert_eq!(digest_tree(temp.path()).unwrap(), listed);
    }
}
