//! The verification capability shared by every signature scheme.
//!
//! A verifier is built once from a scheme tag and a non-empty list of
//! trusted public keys and is immutable afterwards, so a single instance
//! can be shared across concurrent traversal tasks.
//!
//! Trust is "any-of-N": a signature is accepted as soon as one configured
//! key validates it.

use tracing::{debug, error, warn};

use crate::error::CryptoError;
use crate::openpgp::PgpVerifier;
use crate::rsa_sha256::{RsaSha256Verifier, SignatureEncoding};
use crate::tink::TinkVerifier;
use crate::types::SignatureScheme;

/// Verifies detached signatures over raw document bytes.
pub trait DocumentVerifier: Send + Sync {
    /// The scheme implemented by this verifier.
    fn scheme(&self) -> SignatureScheme;

    /// Check `signature` against `data`.
    ///
    /// Returns `Ok(false)` when the signature is well formed but no trusted
    /// key validates it, and an error when the signature cannot be decoded.
    fn try_verify(&self, data: &[u8], signature: &[u8]) -> Result<bool, CryptoError>;

    /// Number of trusted keys configured.
    fn trusted_key_count(&self) -> usize {
        1
    }

    /// Check `signature` against `data`, folding decode errors into `false`.
    ///
    /// Decode errors are logged at `warn` with a single key and at `debug`
    /// when several keys are configured.
    fn verify(&self, data: &[u8], signature: &[u8]) -> bool {
        match self.try_verify(data, signature) {
            Ok(valid) => valid,
            Err(e) => {
                if self.trusted_key_count() > 1 {
                    debug!(scheme = %self.scheme(), error = %e, "Unreadable signature");
                } else {
                    warn!(scheme = %self.scheme(), error = %e, "Unreadable signature");
                }
                false
            },
        }
    }

    /// Suffix appended (after a dot) to a document URL to locate its signature.
    fn signature_suffix(&self) -> &'static str {
        self.scheme().signature_suffix()
    }
}

/// Try each key in order and stop at the first match.
///
/// A mismatch is only reported loudly when exactly one key is configured;
/// with several keys a non-matching key is the normal key-rotation case.
pub(crate) fn any_key_matches<K>(
    scheme: SignatureScheme,
    keys: &[K],
    mut matches: impl FnMut(&K) -> bool,
) -> bool {
    for (index, key) in keys.iter().enumerate() {
        if matches(key) {
            debug!(scheme = %scheme, key_index = index, "Signature verified");
            return true;
        }
    }

    if keys.len() == 1 {
        error!(scheme = %scheme, "Signature verification failed");
    } else {
        debug!(
            scheme = %scheme,
            key_count = keys.len(),
            "Signature did not match any configured key"
        );
    }
    false
}

/// A verifier for one of the supported schemes.
///
/// Constructed through [`SignatureVerifier::build`]; each variant owns the
/// key material type of its scheme.
pub enum SignatureVerifier {
    /// SHA256withRSA, Base64 or raw signature encoding.
    Rsa(RsaSha256Verifier),
    /// OpenPGP detached signatures.
    Pgp(PgpVerifier),
    /// Tink ECDSA signatures.
    Tink(TinkVerifier),
}

impl SignatureVerifier {
    /// Build a verifier for `scheme` trusting every key in `public_keys`.
    ///
    /// Key formats per scheme:
    /// - RSA: SPKI PEM (`BEGIN PUBLIC KEY`), PKCS#1 PEM, or bare Base64 SPKI
    /// - PGP: ASCII-armored public key block
    /// - Tink: JSON public keyset
    ///
    /// # Errors
    ///
    /// Fails if no key is given or any key cannot be parsed. This is a
    /// configuration error and is never deferred to verification time.
    pub fn build<S: AsRef<str>>(
        scheme: SignatureScheme,
        public_keys: &[S],
    ) -> Result<Self, CryptoError> {
        if public_keys.is_empty() {
            return Err(CryptoError::NoTrustedKeys { scheme });
        }

        let verifier = match scheme {
            SignatureScheme::RsaBase64 => {
                Self::Rsa(RsaSha256Verifier::new(SignatureEncoding::Base64, public_keys)?)
            },
            SignatureScheme::RsaRaw => {
                Self::Rsa(RsaSha256Verifier::new(SignatureEncoding::Raw, public_keys)?)
            },
            SignatureScheme::Pgp => Self::Pgp(PgpVerifier::new(public_keys)?),
            SignatureScheme::Tink => Self::Tink(TinkVerifier::new(public_keys)?),
        };

        debug!(
            scheme = %scheme,
            key_count = public_keys.len(),
            "Signature verifier initialized"
        );
        Ok(verifier)
    }

    /// Number of trusted keys.
    #[must_use]
    pub fn key_count(&self) -> usize {
        match self {
            Self::Rsa(v) => v.key_count(),
            Self::Pgp(v) => v.key_count(),
            Self::Tink(v) => v.key_count(),
        }
    }
}

impl DocumentVerifier for SignatureVerifier {
    fn scheme(&self) -> SignatureScheme {
        match self {
            Self::Rsa(v) => v.scheme(),
            Self::Pgp(v) => v.scheme(),
            Self::Tink(v) => v.scheme(),
        }
    }

    fn try_verify(&self, data: &[u8], signature: &[u8]) -> Result<bool, CryptoError> {
        match self {
            Self::Rsa(v) => v.try_verify(data, signature),
            Self::Pgp(v) => v.try_verify(data, signature),
            Self::Tink(v) => v.try_verify(data, signature),
        }
    }

    fn trusted_key_count(&self) -> usize {
        self.key_count()
    }
}

impl std::fmt::Debug for SignatureVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignatureVerifier")
            .field("scheme", &self.scheme())
            .field("key_count", &self.key_count())
            .finish()
    }
}
