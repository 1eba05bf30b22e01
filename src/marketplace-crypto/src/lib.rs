//! # marketplace-crypto
//!
//! Detached-signature verification for signed release repositories.
//!
//! Every document in a repository is published next to a detached
//! signature. The scheme decides both the algorithm and where the
//! signature lives:
//!
//! ```text
//! RSA_BASE64  SHA256withRSA, Base64 text     <document>.sha256.sign
//! RSA_RAW     SHA256withRSA, raw bytes       <document>.sig
//! PGP         OpenPGP armored signature      <document>.asc
//! TINK        Tink ECDSA P-256, hex          <document>.tink
//! ```
//!
//! A verifier trusts a non-empty list of keys and accepts a signature if
//! any of them validates it, which lets vendors rotate keys without a
//! flag day:
//!
//! ```rust,ignore
//! let verifier = SignatureVerifier::build(SignatureScheme::RsaBase64, &[old_key, new_key])?;
//! assert!(verifier.verify(document, signature));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

mod error;
mod types;
mod verifier;

pub mod openpgp;
pub mod rsa_sha256;
pub mod tink;

pub use error::CryptoError;
pub use openpgp::PgpVerifier;
pub use rsa_sha256::{normalize_pem, RsaSha256Verifier, SignatureEncoding};
pub use tink::TinkVerifier;
pub use types::SignatureScheme;
pub use verifier::{DocumentVerifier, SignatureVerifier};

/// Constant-time byte comparison.
///
/// Length is compared first and may leak; contents are compared with
/// `subtle::ConstantTimeEq`.
#[must_use]
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    use subtle::ConstantTimeEq;

    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}
