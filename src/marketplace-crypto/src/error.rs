//! Cryptographic error types.

use thiserror::Error;

use crate::types::SignatureScheme;

/// Errors that can occur while building verifiers or checking signatures.
///
/// Key-material errors are raised at construction time and are fatal
/// configuration errors. Signature errors are per-call and are reported
/// by [`DocumentVerifier::verify`](crate::DocumentVerifier::verify) as a
/// plain `false`.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Invalid signature format or encoding.
    #[error("Invalid signature: {reason}")]
    InvalidSignature {
        /// Reason the signature is invalid.
        reason: String,
    },

    /// Invalid public key format or content.
    #[error("Invalid public key: {reason}")]
    InvalidPublicKey {
        /// Reason the key is invalid.
        reason: String,
    },

    /// A verifier was requested without any trusted key.
    #[error("No trusted public keys configured for {scheme}")]
    NoTrustedKeys {
        /// The scheme the verifier was requested for.
        scheme: SignatureScheme,
    },

    /// Algorithm or parameter set not supported.
    #[error("Algorithm not supported: {algorithm}")]
    UnsupportedAlgorithm {
        /// The unsupported algorithm.
        algorithm: String,
    },

    /// Unknown signature scheme name.
    #[error("Unknown signature scheme: {name}")]
    UnknownScheme {
        /// The name that failed to parse.
        name: String,
    },
}

impl CryptoError {
    /// Create an invalid signature error.
    #[must_use]
    pub fn invalid_signature(reason: impl Into<String>) -> Self {
        Self::InvalidSignature {
            reason: reason.into(),
        }
    }

    /// Create an invalid public key error.
    #[must_use]
    pub fn invalid_public_key(reason: impl Into<String>) -> Self {
        Self::InvalidPublicKey {
            reason: reason.into(),
        }
    }

    /// Create an unsupported algorithm error.
    #[must_use]
    pub fn unsupported(algorithm: impl Into<String>) -> Self {
        Self::UnsupportedAlgorithm {
            algorithm: algorithm.into(),
        }
    }

    /// Whether this error comes from key material or scheme selection,
    /// as opposed to a single malformed signature.
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        !matches!(self, Self::InvalidSignature { .. })
    }
}
