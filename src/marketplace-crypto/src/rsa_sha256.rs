//! SHA256withRSA (PKCS#1 v1.5) signature verification.
//!
//! Two vendors' conventions share this verifier and differ only in how the
//! detached signature file is encoded:
//!
//! - `.sha256.sign`: Base64 text, possibly wrapped across several lines
//! - `.sig`: the raw signature bytes

use base64::Engine;
use rsa::pkcs1::DecodeRsaPublicKey;
use rsa::pkcs1v15::{Signature, VerifyingKey};
use rsa::pkcs8::DecodePublicKey;
use rsa::signature::Verifier;
use rsa::RsaPublicKey;
use sha2::Sha256;

use crate::error::CryptoError;
use crate::types::SignatureScheme;
use crate::verifier::{any_key_matches, DocumentVerifier};

const PEM_HEADER: &str = "-----BEGIN PUBLIC KEY-----";
const PEM_FOOTER: &str = "-----END PUBLIC KEY-----";

/// How the detached signature file is encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureEncoding {
    /// Base64 text; embedded line breaks are ignored.
    Base64,
    /// Raw signature bytes.
    Raw,
}

/// SHA256withRSA verifier trusting one or more RSA public keys.
pub struct RsaSha256Verifier {
    keys: Vec<VerifyingKey<Sha256>>,
    encoding: SignatureEncoding,
}

impl RsaSha256Verifier {
    /// Create a verifier from PEM (or bare Base64 SPKI) encoded public keys.
    pub fn new<S: AsRef<str>>(
        encoding: SignatureEncoding,
        public_keys: &[S],
    ) -> Result<Self, CryptoError> {
        let scheme = scheme_for(encoding);
        if public_keys.is_empty() {
            return Err(CryptoError::NoTrustedKeys { scheme });
        }

        let keys = public_keys
            .iter()
            .map(|pem| parse_public_key(pem.as_ref()).map(VerifyingKey::<Sha256>::new))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { keys, encoding })
    }

    /// Create a verifier for Base64 encoded signatures.
    pub fn base64<S: AsRef<str>>(public_keys: &[S]) -> Result<Self, CryptoError> {
        Self::new(SignatureEncoding::Base64, public_keys)
    }

    /// Create a verifier for raw binary signatures.
    pub fn raw<S: AsRef<str>>(public_keys: &[S]) -> Result<Self, CryptoError> {
        Self::new(SignatureEncoding::Raw, public_keys)
    }

    /// Number of trusted keys.
    #[must_use]
    pub fn key_count(&self) -> usize {
        self.keys.len()
    }

    /// Signature encoding expected by this verifier.
    #[must_use]
    pub fn encoding(&self) -> SignatureEncoding {
        self.encoding
    }

    fn decode_signature(&self, signature: &[u8]) -> Result<Signature, CryptoError> {
        let bytes = match self.encoding {
            SignatureEncoding::Raw => signature.to_vec(),
            SignatureEncoding::Base64 => {
                let compact: Vec<u8> = signature
                    .iter()
                    .copied()
                    .filter(|b| !b.is_ascii_whitespace())
                    .collect();
                base64::engine::general_purpose::STANDARD
                    .decode(compact)
                    .map_err(|e| CryptoError::invalid_signature(format!("bad base64: {}", e)))?
            },
        };

        Signature::try_from(bytes.as_slice())
            .map_err(|e| CryptoError::invalid_signature(e.to_string()))
    }
}

impl DocumentVerifier for RsaSha256Verifier {
    fn scheme(&self) -> SignatureScheme {
        scheme_for(self.encoding)
    }

    fn try_verify(&self, data: &[u8], signature: &[u8]) -> Result<bool, CryptoError> {
        let signature = self.decode_signature(signature)?;
        Ok(any_key_matches(self.scheme(), &self.keys, |key| {
            key.verify(data, &signature).is_ok()
        }))
    }

    fn trusted_key_count(&self) -> usize {
        self.key_count()
    }
}

fn scheme_for(encoding: SignatureEncoding) -> SignatureScheme {
    match encoding {
        SignatureEncoding::Base64 => SignatureScheme::RsaBase64,
        SignatureEncoding::Raw => SignatureScheme::RsaRaw,
    }
}

/// Parse an RSA public key.
///
/// Accepts SPKI PEM, PKCS#1 PEM (`BEGIN RSA PUBLIC KEY`), or the bare
/// Base64 body of an SPKI key, which is wrapped in PEM armor first.
pub fn parse_public_key(key: &str) -> Result<RsaPublicKey, CryptoError> {
    let pem = normalize_pem(key)?;

    if pem.contains("BEGIN RSA PUBLIC KEY") {
        RsaPublicKey::from_pkcs1_pem(&pem).map_err(|e| CryptoError::invalid_public_key(e.to_string()))
    } else {
        RsaPublicKey::from_public_key_pem(&pem)
            .map_err(|e| CryptoError::invalid_public_key(e.to_string()))
    }
}

/// Wrap a bare Base64 key body in SPKI PEM armor.
///
/// Keys that already carry a PEM header are returned trimmed but otherwise
/// untouched. The body is re-wrapped at 64 columns.
pub fn normalize_pem(key: &str) -> Result<String, CryptoError> {
    let key = key.trim();
    if key.contains("-----BEGIN") {
        return Ok(format!("{}\n", key));
    }

    let body: String = key.chars().filter(|c| !c.is_whitespace()).collect();
    if body.is_empty() || !body.is_ascii() {
        return Err(CryptoError::invalid_public_key("key is neither PEM nor Base64"));
    }

    let mut pem = String::with_capacity(body.len() + 64);
    pem.push_str(PEM_HEADER);
    pem.push('\n');
    // ASCII was checked above, so byte chunks are valid char boundaries.
    for start in (0..body.len()).step_by(64) {
        let end = (start + 64).min(body.len());
        pem.push_str(&body[start..end]);
        pem.push('\n');
    }
    pem.push_str(PEM_FOOTER);
    pem.push('\n');
    Ok(pem)
}
