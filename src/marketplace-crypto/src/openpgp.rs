//! OpenPGP detached signature verification.
//!
//! Signatures are ASCII-armored (`.asc`). Only signatures made with a
//! SHA-2 digest of 256 bits or more are accepted, whatever the key.

use std::io::Cursor;

use pgp::crypto::hash::HashAlgorithm;
use pgp::{Deserializable, SignedPublicKey, StandaloneSignature};
use tracing::{debug, error};

use crate::error::CryptoError;
use crate::types::SignatureScheme;
use crate::verifier::{any_key_matches, DocumentVerifier};

/// Digest algorithms a signature may declare.
pub const ALLOWED_HASH_ALGORITHMS: [HashAlgorithm; 3] = [
    HashAlgorithm::SHA2_256,
    HashAlgorithm::SHA2_384,
    HashAlgorithm::SHA2_512,
];

/// OpenPGP verifier trusting one or more armored public keys.
pub struct PgpVerifier {
    keys: Vec<SignedPublicKey>,
}

impl PgpVerifier {
    /// Create a verifier from ASCII-armored public key blocks.
    ///
    /// Each key's self-signatures are checked here so that a corrupted key
    /// fails at startup instead of rejecting every document later.
    pub fn new<S: AsRef<str>>(armored_keys: &[S]) -> Result<Self, CryptoError> {
        if armored_keys.is_empty() {
            return Err(CryptoError::NoTrustedKeys {
                scheme: SignatureScheme::Pgp,
            });
        }

        let keys = armored_keys
            .iter()
            .map(|armored| parse_public_key(armored.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { keys })
    }

    /// Number of trusted keys.
    #[must_use]
    pub fn key_count(&self) -> usize {
        self.keys.len()
    }
}

impl DocumentVerifier for PgpVerifier {
    fn scheme(&self) -> SignatureScheme {
        SignatureScheme::Pgp
    }

    fn try_verify(&self, data: &[u8], signature: &[u8]) -> Result<bool, CryptoError> {
        let (signature, _headers) = StandaloneSignature::from_armor_single(Cursor::new(signature))
            .map_err(|e| CryptoError::invalid_signature(e.to_string()))?;

        let hash_alg = signature.signature.config.hash_alg;
        if !ALLOWED_HASH_ALGORITHMS.contains(&hash_alg) {
            error!(hash_algorithm = ?hash_alg, "Incorrect signature hash algorithm used");
            return Ok(false);
        }

        Ok(any_key_matches(self.scheme(), &self.keys, |key| {
            signed_by(key, &signature, data)
        }))
    }

    fn trusted_key_count(&self) -> usize {
        self.key_count()
    }
}

/// Whether the primary key or any public subkey of `key` made `signature`.
fn signed_by(key: &SignedPublicKey, signature: &StandaloneSignature, data: &[u8]) -> bool {
    if signature.verify(&key.primary_key, data).is_ok() {
        return true;
    }

    key.public_subkeys.iter().any(|subkey| {
        let ok = signature.verify(&subkey.key, data).is_ok();
        if ok {
            debug!("Signature made by subkey");
        }
        ok
    })
}

fn parse_public_key(armored: &str) -> Result<SignedPublicKey, CryptoError> {
    let (key, _headers) = SignedPublicKey::from_armor_single(Cursor::new(armored.as_bytes()))
        .map_err(|e| CryptoError::invalid_public_key(e.to_string()))?;

    key.verify()
        .map_err(|e| CryptoError::invalid_public_key(format!("bad self-signature: {}", e)))?;

    Ok(key)
}
