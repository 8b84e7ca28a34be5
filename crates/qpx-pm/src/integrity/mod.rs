//! Content digests and OpenPGP signatures for packages.
//!
//! A package is signed by hashing its tracked files into a single hex digest
//! ([`hasher`]) and creating a detached signature over that digest string
//! ([`signature`]) with the key whose fingerprint the manifest records
//! ([`keyring`]).

pub mod hasher;
pub mod keyring;
mod package;
pub mod signature;

pub use hasher::{collect_tree, digest_file_list, digest_paths, digest_tree};
pub use keyring::{parse_fingerprint, Keyring};
pub use package::{sign_package, verify_package};
pub use signature::{sign, verify, MAX_PASSPHRASE_ATTEMPTS};
