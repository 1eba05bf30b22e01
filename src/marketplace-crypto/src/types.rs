//! Signature scheme identifiers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CryptoError;

/// Signature scheme used by a vendor to sign its repository documents.
///
/// The scheme fixes both the verification algorithm and the file suffix
/// of the detached signature: the signature for a document at `U` lives
/// at `U + "." + suffix`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignatureScheme {
    /// SHA256withRSA, Base64 encoded signature (`.sha256.sign`).
    #[default]
    RsaBase64,

    /// SHA256withRSA, raw binary signature (`.sig`).
    RsaRaw,

    /// OpenPGP ASCII-armored detached signature (`.asc`).
    Pgp,

    /// Tink ECDSA P-256 signature, hex encoded (`.tink`).
    Tink,
}

impl SignatureScheme {
    /// All supported schemes.
    pub const ALL: [SignatureScheme; 4] = [Self::RsaBase64, Self::RsaRaw, Self::Pgp, Self::Tink];

    /// File suffix of the detached signature, without the leading dot.
    #[must_use]
    pub const fn signature_suffix(&self) -> &'static str {
        match self {
            Self::RsaBase64 => "sha256.sign",
            Self::RsaRaw => "sig",
            Self::Pgp => "asc",
            Self::Tink => "tink",
        }
    }

    /// Canonical configuration name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::RsaBase64 => "RSA_BASE64",
            Self::RsaRaw => "RSA_RAW",
            Self::Pgp => "PGP",
            Self::Tink => "TINK",
        }
    }
}

impl fmt::Display for SignatureScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SignatureScheme {
    type Err = CryptoError;

    /// Accepts the canonical names plus the legacy `BASE64_ENCODED` and `SIG`
    /// aliases, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().replace('-', "_").as_str() {
            "RSA_BASE64" | "BASE64_ENCODED" => Ok(Self::RsaBase64),
            "RSA_RAW" | "SIG" => Ok(Self::RsaRaw),
            "PGP" | "GPG" => Ok(Self::Pgp),
            "TINK" => Ok(Self::Tink),
            _ => Err(CryptoError::UnknownScheme { name: s.to_string() }),
        }
    }
}
