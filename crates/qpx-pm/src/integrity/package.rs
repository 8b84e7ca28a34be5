use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{QpxError, Result};
use crate::package::Manifest;
use crate::SIGNATURE_FILE;
use super::hasher;
use super::keyring::Keyring;
use super::signature;

/// Sign the files of a package checkout and write `qpm.asc` beside its manifest.
///
/// `files` are relative to `dir`, as listed by the repository's publisher.
/// The fresh signature is checked against `public` before returning, so a
/// mismatched key pair never leaves a signature behind.
pub fn sign_package<S, F>(
    dir: &Path,
    manifest: &Manifest,
    files: &[S],
    secret: &Keyring,
    public: &Keyring,
    passphrase: F,
) -> Result<PathBuf>
where
    S: AsRef<str>,
    F: FnMut(&str, u32) -> Option<String>,
{
    let fingerprint = &manifest.version.fingerprint;
    let cert = secret.find(fingerprint)?;

    let digest = hasher::digest_file_list(dir, files)?;
    log::info!("Signing content digest {} of {}", digest, manifest.name);

    let armored = signature::sign(&digest, cert, passphrase)?;
    signature::verify(&digest, &armored, public.find(fingerprint)?)?;

    let path = dir.join(SIGNATURE_FILE);
    fs::write(&path, &armored)?;
    Ok(path)
}

/// Verify an installed or checked-out package tree against its `qpm.asc`
pub fn verify_package(dir: &Path, public: &Keyring) -> Result<Manifest> {
    let manifest = Manifest::load(dir)?;
    let cert = public.find(&manifest.version.fingerprint)?;

    let signature_path = dir.join(SIGNATURE_FILE);
    let armored = fs::read(&signature_path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            QpxError::NotFound(format!("{} does not exist", signature_path.display()))
        } else {
            QpxError::Io(e)
        }
    })?;

    let digest = hasher::digest_tree(dir)?;
    log::debug!("Content digest of {} is {}", dir.display(), digest);

    signature::verify(&digest, &armored, cert)?;
    Ok(manifest)
}
