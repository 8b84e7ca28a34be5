//! Detached OpenPGP signatures over a payload string.
//!
//! The payload is the hex content digest of a package. Signatures are
//! ASCII-armored, of type "binary document" and hashed with SHA-256.

use sequoia_openpgp as openpgp;
use openpgp::armor;
use openpgp::crypto::{KeyPair, Password};
use openpgp::packet::Signature;
use openpgp::parse::Parse;
use openpgp::policy::StandardPolicy;
use openpgp::serialize::stream::{Armorer, Message, Signer};
use openpgp::types::{HashAlgorithm, SignatureType};
use openpgp::{Cert, Packet, PacketPile};
use std::io::Write;

use crate::error::{QpxError, Result};

/// How many passphrases are asked for before giving up on an encrypted key
pub const MAX_PASSPHRASE_ATTEMPTS: u32 = 3;

/// Create an armored detached signature of `payload` with `cert`'s signing key.
///
/// An encrypted secret key is unlocked with passphrases from `passphrase`,
/// which receives a description of the key and the 1-based attempt number.
/// Returning `None` aborts signing.
pub fn sign<F>(payload: &str, cert: &Cert, mut passphrase: F) -> Result<Vec<u8>>
where
    F: FnMut(&str, u32) -> Option<String>,
{
    let policy = StandardPolicy::new();

    let key = cert
        .keys()
        .with_policy(&policy, None)
        .alive()
        .revoked(false)
        .for_signing()
        .secret()
        .next()
        .map(|ka| ka.key().clone())
        .ok_or_else(|| {
            QpxError::Key(format!("{} has no usable secret signing key", cert.fingerprint()))
        })?;

    let keypair: KeyPair = if key.has_unencrypted_secret() {
        key.into_keypair().map_err(|e| QpxError::Key(e.to_string()))?
    } else {
        let description = format!("{} ({})", key.fingerprint(), primary_user_id(cert));
        let mut unlocked = None;

        for attempt in 1..=MAX_PASSPHRASE_ATTEMPTS {
            let secret = passphrase(&description, attempt).ok_or_else(|| {
                QpxError::Key(format!("No passphrase given for {}", description))
            })?;

            match key.clone().decrypt_secret(&Password::from(secret)) {
                Ok(decrypted) => {
                    unlocked = Some(decrypted);
                    break;
                }
                Err(e) => log::warn!("Cannot unlock {}: {}", description, e),
            }
        }

        unlocked
            .ok_or_else(|| QpxError::Key(format!("Cannot unlock {}", description)))?
            .into_keypair()
            .map_err(|e| QpxError::Key(e.to_string()))?
    };

    let mut sink = Vec::new();
    {
        let message = Message::new(&mut sink);
        let message = Armorer::new(message)
            .kind(armor::Kind::Signature)
            .build()
            .map_err(|e| QpxError::Key(e.to_string()))?;
        let mut signer = Signer::new(message, keypair)
            .detached()
            .hash_algo(HashAlgorithm::SHA256)
            .map_err(|e| QpxError::Key(e.to_string()))?
            .build()
            .map_err(|e| QpxError::Key(e.to_string()))?;

        signer.write_all(payload.as_bytes())?;
        signer.finalize().map_err(|e| QpxError::Key(e.to_string()))?;
    }

    Ok(sink)
}

/// Check an armored detached signature of `payload` against `cert`.
///
/// The rules are applied in order: the data must hold exactly one signature
/// packet, hashed with SHA-256 or SHA-512, of type binary document, made by
/// one of `cert`'s signing keys over exactly `payload`.
pub fn verify(payload: &str, signature: &[u8], cert: &Cert) -> Result<()> {
    let sig = parse_signature(signature)?;

    match sig.hash_algo() {
        HashAlgorithm::SHA256 | HashAlgorithm::SHA512 => {}
        other => return Err(QpxError::UnsupportedHashAlgorithm(other.to_string())),
    }

    if sig.typ() != SignatureType::Binary {
        return Err(QpxError::UnsupportedSignatureType(sig.typ().to_string()));
    }

    let policy = StandardPolicy::new();
    for ka in cert.keys().with_policy(&policy, None).for_signing() {
        let mut candidate = sig.clone();
        if candidate.verify_message(ka.key(), payload.as_bytes()).is_ok() {
            log::debug!("Signature made by {}", ka.key().fingerprint());
            return Ok(());
        }
    }

    Err(QpxError::SignatureMismatch)
}

/// Decode signature bytes (armored or binary) into the single signature packet
fn parse_signature(signature: &[u8]) -> Result<Signature> {
    let pile = PacketPile::from_bytes(signature)
        .map_err(|e| QpxError::MalformedSignature(e.to_string()))?;

    let mut packets = pile.into_children();
    let packet = packets
        .next()
        .ok_or_else(|| QpxError::MalformedSignature("no packets found".to_string()))?;

    if packets.next().is_some() {
        return Err(QpxError::MalformedSignature(
            "expected exactly one signature packet".to_string(),
        ));
    }

    match packet {
        Packet::Signature(sig) => Ok(sig),
        other => Err(QpxError::MalformedSignature(format!(
            "expected a signature packet, found {}",
            other.tag()
        ))),
    }
}

fn primary_user_id(cert: &Cert) -> String {
    cert.userids()
        .next()
        .map(|uid| String::from_utf8_lossy(uid.userid().value()).into_owned())
        .unwrap_or_else(|| "no user id".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use openpgp::cert::CertBuilder;
    use openpgp::packet::signature::SignatureBuilder;
    use openpgp::packet::UserID;
    use openpgp::serialize::SerializeInto;

    const PAYLOAD: &str = "9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08";

    fn generate() -> (Cert, Signature) {
        CertBuilder::new()
            .add_userid("Jane Doe <jane@example.com>")
            .add_signing_subkey()
            .generate()
            .unwrap()
    }

    fn signing_keypair(cert: &Cert) -> KeyPair {
        let policy = StandardPolicy::new();
        cert.keys()
            .unencrypted_secret()
            .with_policy(&policy, None)
            .for_signing()
            .next()
            .unwrap()
            .key()
            .clone()
            .into_keypair()
            .unwrap()
    }

    fn no_passphrase(_: &str, _: u32) -> Option<String> {
        None
    }

    #[test]
    fn test_sign_then_verify() {
        let (cert, _) = generate();
        let signature = sign(PAYLOAD, &cert, no_passphrase).unwrap();

        assert!(signature.starts_with(b"-----BEGIN PGP SIGNATURE-----"));
        verify(PAYLOAD, &signature, &cert).unwrap();
    }

    #[test]
    fn test_verify_with_public_part_only() {
        let (cert, _) = generate();
        let signature = sign(PAYLOAD, &cert, no_passphrase).unwrap();

        let public = Cert::from_bytes(&cert.to_vec().unwrap()).unwrap();
        assert!(!public.is_tsk());
        verify(PAYLOAD, &signature, &public).unwrap();
    }

    #[test]
    fn test_single_bit_mutation_is_mismatch() {
        let (cert, _) = generate();
        let signature = sign(PAYLOAD, &cert, no_passphrase).unwrap();

        let mut mutated = PAYLOAD.as_bytes().to_vec();
        mutated[10] ^= 0x01;
        let mutated = String::from_utf8(mutated).unwrap();

        assert!(matches!(verify(&mutated, &signature, &cert), Err(QpxError::SignatureMismatch)));
    }

    #[test]
    fn test_other_key_is_mismatch() {
        let (cert, _) = generate();
        let (other, _) = generate();
        let signature = sign(PAYLOAD, &cert, no_passphrase).unwrap();

        assert!(matches!(verify(PAYLOAD, &signature, &other), Err(QpxError::SignatureMismatch)));
    }

    #[test]
    fn test_text_signature_rejected() {
        let (cert, _) = generate();
        let mut keypair = signing_keypair(&cert);
        let sig = SignatureBuilder::new(SignatureType::Text)
            .set_hash_algo(HashAlgorithm::SHA256)
            .sign_message(&mut keypair, PAYLOAD)
            .unwrap();
        let bytes = Packet::from(sig).to_vec().unwrap();

        assert!(matches!(
            verify(PAYLOAD, &bytes, &cert),
            Err(QpxError::UnsupportedSignatureType(_))
        ));
    }

    #[test]
    fn test_unsupported_hash_rejected() {
        let (cert, _) = generate();
        let mut keypair = signing_keypair(&cert);
        let sig = SignatureBuilder::new(SignatureType::Binary)
            .set_hash_algo(HashAlgorithm::SHA384)
            .sign_message(&mut keypair, PAYLOAD)
            .unwrap();
        let bytes = Packet::from(sig).to_vec().unwrap();

        assert!(matches!(
            verify(PAYLOAD, &bytes, &cert),
            Err(QpxError::UnsupportedHashAlgorithm(_))
        ));
    }

    #[test]
    fn test_sha512_accepted() {
        let (cert, _) = generate();
        let mut keypair = signing_keypair(&cert);
        let sig = SignatureBuilder::new(SignatureType::Binary)
            .set_hash_algo(HashAlgorithm::SHA512)
            .sign_message(&mut keypair, PAYLOAD)
            .unwrap();
        let bytes = Packet::from(sig).to_vec().unwrap();

        verify(PAYLOAD, &bytes, &cert).unwrap();
    }

    #[test]
    fn test_key_signature_rejected() {
        let (cert, revocation) = generate();
        let bytes = Packet::from(revocation).to_vec().unwrap();

        let err = verify(PAYLOAD, &bytes, &cert).unwrap_err();
        assert!(matches!(err, QpxError::UnsupportedSignatureType(_)));
    }

    #[test]
    fn test_non_signature_packet_is_malformed() {
        let (cert, _) = generate();
        let bytes = Packet::from(UserID::from("Jane Doe")).to_vec().unwrap();

        assert!(matches!(
            verify(PAYLOAD, &bytes, &cert),
            Err(QpxError::MalformedSignature(_))
        ));
        assert!(matches!(
            verify(PAYLOAD, b"not a signature", &cert),
            Err(QpxError::MalformedSignature(_))
        ));
    }

    #[test]
    fn test_two_signatures_are_malformed() {
        let (cert, _) = generate();
        let mut keypair = signing_keypair(&cert);
        let mut bytes = Vec::new();
        for _ in 0..2 {
            let sig = SignatureBuilder::new(SignatureType::Binary)
                .sign_message(&mut keypair, PAYLOAD)
                .unwrap();
            bytes.extend(Packet::from(sig).to_vec().unwrap());
        }

        assert!(matches!(
            verify(PAYLOAD, &bytes, &cert),
            Err(QpxError::MalformedSignature(_))
        ));
    }

    #[test]
    fn test_encrypted_key_retries_passphrase() {
        let (cert, _) = CertBuilder::new()
            .add_userid("Jane Doe <jane@example.com>")
            .add_signing_subkey()
            .set_password(Some("correct horse".into()))
            .generate()
            .unwrap();

        let mut attempts = Vec::new();
        let signature = sign(PAYLOAD, &cert, |_, attempt| {
            attempts.push(attempt);
            Some(if attempt < 2 { "wrong" } else { "correct horse" }.to_string())
        })
        .unwrap();

        assert_eq!(attempts, vec![1, 2]);
        verify(PAYLOAD, &signature, &cert).unwrap();
    }

    #[test]
    fn test_encrypted_key_gives_up() {
        let (cert, _) = CertBuilder::new()
            .add_signing_subkey()
            .set_password(Some("secret".into()))
            .generate()
            .unwrap();

        let mut count = 0;
        let err = sign(PAYLOAD, &cert, |_, _| {
            count += 1;
            Some("wrong".to_string())
        })
        .unwrap_err();
        assert!(matches!(err, QpxError::Key(_)));
        assert_eq!(count, MAX_PASSPHRASE_ATTEMPTS);

        assert!(matches!(sign(PAYLOAD, &cert, no_passphrase), Err(QpxError::Key(_))));
    }
}
