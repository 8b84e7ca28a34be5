use sequoia_openpgp as openpgp;
use openpgp::cert::CertParser;
use openpgp::parse::Parse;
use openpgp::Cert;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::error::{QpxError, Result};

/// Length of a v4 OpenPGP fingerprint in bytes
pub const FINGERPRINT_LEN: usize = 20;

/// Decode a hex fingerprint as written in `qpm.json`.
///
/// Whitespace is ignored. Anything that is not exactly 20 bytes of hex is a
/// configuration error rather than a missing key.
pub fn parse_fingerprint(fingerprint: &str) -> Result<Vec<u8>> {
    let compact: String = fingerprint.chars().filter(|c| !c.is_whitespace()).collect();

    if compact.is_empty() {
        return Err(QpxError::Config(
            "The package has no version.fingerprint to sign or verify with".to_string(),
        ));
    }

    let bytes = openpgp::fmt::hex::decode(&compact)
        .map_err(|e| QpxError::Config(format!("Invalid fingerprint {}: {}", fingerprint, e)))?;

    if bytes.len() != FINGERPRINT_LEN {
        return Err(QpxError::Config(format!(
            "Invalid fingerprint {}: expected {} bytes, got {}",
            fingerprint,
            FINGERPRINT_LEN,
            bytes.len()
        )));
    }

    Ok(bytes)
}

/// A keyring file (`pubring.gpg` / `secring.gpg`) loaded into memory
#[derive(Debug)]
pub struct Keyring {
    path: PathBuf,
    certs: Vec<Cert>,
}

impl Keyring {
    /// Read every certificate from a binary or armored keyring file
    pub fn open(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(QpxError::Config(format!("Keyring {} does not exist", path.display())));
        }

        let parser = CertParser::from_file(path)
            .map_err(|e| QpxError::Key(format!("Cannot read keyring {}: {}", path.display(), e)))?;

        let mut certs = Vec::new();
        for cert in parser {
            match cert {
                Ok(cert) => certs.push(cert),
                Err(e) => log::warn!("Skipping unreadable key in {}: {}", path.display(), e),
            }
        }

        log::debug!("Loaded {} keys from {}", certs.len(), path.display());

        Ok(Self {
            path: path.to_path_buf(),
            certs,
        })
    }

    /// The public keyring named by the configuration
    pub fn public(config: &Config) -> Result<Self> {
        Self::open(&config.public_keyring_path()?)
    }

    /// The secret keyring named by the configuration
    pub fn secret(config: &Config) -> Result<Self> {
        Self::open(&config.secret_keyring_path()?)
    }

    pub fn from_certs(path: impl Into<PathBuf>, certs: Vec<Cert>) -> Self {
        Self {
            path: path.into(),
            certs,
        }
    }

    /// Find the certificate whose primary key has the given fingerprint
    pub fn find(&self, fingerprint: &str) -> Result<&Cert> {
        let wanted = parse_fingerprint(fingerprint)?;

        self.certs
            .iter()
            .find(|cert| cert.fingerprint().as_bytes() == wanted.as_slice())
            .ok_or_else(|| QpxError::KeyNotFound {
                fingerprint: fingerprint.to_string(),
                keyring: self.path.display().to_string(),
            })
    }
}
