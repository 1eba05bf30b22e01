//! Tink ECDSA public-key verification.
//!
//! Keys are Tink JSON public keysets (as written by
//! `CleartextKeysetHandle.write(.., JsonKeysetWriter)`); signatures are the
//! Tink wire signature, hex encoded in the `.tink` file.
//!
//! Only ENABLED `EcdsaPublicKey` entries on NIST P-256 with SHA-256 are
//! supported. The output prefix of each key decides how the signature is
//! framed:
//!
//! ```text
//! TINK:     0x01 || key_id (BE u32) || signature
//! LEGACY:   0x00 || key_id (BE u32) || signature   (data || 0x00 is signed)
//! CRUNCHY:  0x00 || key_id (BE u32) || signature
//! RAW:      signature
//! ```

use base64::Engine;
use p256::ecdsa::signature::Verifier;
use p256::ecdsa::{Signature, VerifyingKey};
use prost::Message;
use serde::Deserialize;
use tracing::debug;

use crate::error::CryptoError;
use crate::types::SignatureScheme;
use crate::verifier::{any_key_matches, DocumentVerifier};

/// Type URL of the only supported key type.
pub const ECDSA_PUBLIC_KEY_TYPE_URL: &str = "type.googleapis.com/google.crypto.tink.EcdsaPublicKey";

/// Protobuf messages of the Tink ECDSA key format.
pub mod proto {
    /// Hash function used by the signature.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
    #[repr(i32)]
    pub enum HashType {
        /// Unset.
        UnknownHash = 0,
        /// SHA-1.
        Sha1 = 1,
        /// SHA-384.
        Sha384 = 2,
        /// SHA-256.
        Sha256 = 3,
        /// SHA-512.
        Sha512 = 4,
        /// SHA-224.
        Sha224 = 5,
    }

    /// Curve of the key.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
    #[repr(i32)]
    pub enum EllipticCurveType {
        /// Unset.
        UnknownCurve = 0,
        /// NIST P-256.
        NistP256 = 2,
        /// NIST P-384.
        NistP384 = 3,
        /// NIST P-521.
        NistP521 = 4,
        /// Curve25519.
        Curve25519 = 5,
    }

    /// Signature serialization.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
    #[repr(i32)]
    pub enum EcdsaSignatureEncoding {
        /// Unset.
        UnknownEncoding = 0,
        /// Fixed-size `r || s`.
        IeeeP1363 = 1,
        /// ASN.1 DER.
        Der = 2,
    }

    /// `google.crypto.tink.EcdsaParams`.
    #[derive(Clone, PartialEq, prost::Message)]
    pub struct EcdsaParams {
        /// Hash function.
        #[prost(enumeration = "HashType", tag = "1")]
        pub hash_type: i32,
        /// Curve.
        #[prost(enumeration = "EllipticCurveType", tag = "2")]
        pub curve: i32,
        /// Signature encoding.
        #[prost(enumeration = "EcdsaSignatureEncoding", tag = "3")]
        pub encoding: i32,
    }

    /// `google.crypto.tink.EcdsaPublicKey`.
    #[derive(Clone, PartialEq, prost::Message)]
    pub struct EcdsaPublicKey {
        /// Key format version.
        #[prost(uint32, tag = "1")]
        pub version: u32,
        /// Parameters.
        #[prost(message, optional, tag = "2")]
        pub params: Option<EcdsaParams>,
        /// Affine x coordinate, big endian, possibly with a leading zero byte.
        #[prost(bytes = "vec", tag = "3")]
        pub x: Vec<u8>,
        /// Affine y coordinate, big endian, possibly with a leading zero byte.
        #[prost(bytes = "vec", tag = "4")]
        pub y: Vec<u8>,
    }
}

use proto::{EcdsaPublicKey, EcdsaSignatureEncoding, EllipticCurveType, HashType};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JsonKeyset {
    #[serde(default)]
    primary_key_id: Option<u32>,
    #[serde(default)]
    key: Vec<JsonKey>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JsonKey {
    key_data: JsonKeyData,
    status: String,
    key_id: u32,
    output_prefix_type: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JsonKeyData {
    type_url: String,
    value: String,
    #[serde(default)]
    key_material_type: Option<String>,
}

/// How a key frames its signatures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputPrefix {
    /// `0x01 || key_id`.
    Tink,
    /// `0x00 || key_id`, data is suffixed with a zero byte before signing.
    Legacy,
    /// `0x00 || key_id`.
    Crunchy,
    /// No prefix.
    Raw,
}

impl OutputPrefix {
    fn parse(name: &str) -> Result<Self, CryptoError> {
        match name {
            "TINK" => Ok(Self::Tink),
            "LEGACY" => Ok(Self::Legacy),
            "CRUNCHY" => Ok(Self::Crunchy),
            "RAW" => Ok(Self::Raw),
            other => Err(CryptoError::unsupported(format!("Tink output prefix {}", other))),
        }
    }

    fn bytes(self, key_id: u32) -> Vec<u8> {
        let marker = match self {
            Self::Tink => 0x01,
            Self::Legacy | Self::Crunchy => 0x00,
            Self::Raw => return Vec::new(),
        };
        let mut prefix = Vec::with_capacity(5);
        prefix.push(marker);
        prefix.extend_from_slice(&key_id.to_be_bytes());
        prefix
    }
}

/// One usable key of a keyset.
struct TinkKey {
    key_id: u32,
    prefix: Vec<u8>,
    output_prefix: OutputPrefix,
    encoding: EcdsaSignatureEncoding,
    verifying_key: VerifyingKey,
}

impl TinkKey {
    fn verify(&self, data: &[u8], signature: &[u8]) -> bool {
        if signature.len() < self.prefix.len()
            || !crate::constant_time_eq(&signature[..self.prefix.len()], &self.prefix)
        {
            return false;
        }
        let body = &signature[self.prefix.len()..];

        let parsed = match self.encoding {
            EcdsaSignatureEncoding::Der => Signature::from_der(body),
            _ => Signature::from_slice(body),
        };
        let Ok(parsed) = parsed else {
            return false;
        };

        if self.output_prefix == OutputPrefix::Legacy {
            let mut message = Vec::with_capacity(data.len() + 1);
            message.extend_from_slice(data);
            message.push(0x00);
            self.verifying_key.verify(&message, &parsed).is_ok()
        } else {
            self.verifying_key.verify(data, &parsed).is_ok()
        }
    }
}

/// Tink ECDSA verifier trusting the enabled keys of one or more keysets.
pub struct TinkVerifier {
    keys: Vec<TinkKey>,
    keyset_count: usize,
}

impl TinkVerifier {
    /// Create a verifier from JSON public keysets.
    pub fn new<S: AsRef<str>>(keysets: &[S]) -> Result<Self, CryptoError> {
        if keysets.is_empty() {
            return Err(CryptoError::NoTrustedKeys {
                scheme: SignatureScheme::Tink,
            });
        }

        let mut keys = Vec::new();
        for keyset in keysets {
            keys.extend(parse_keyset(keyset.as_ref())?);
        }

        Ok(Self {
            keys,
            keyset_count: keysets.len(),
        })
    }

    /// Number of trusted keysets.
    #[must_use]
    pub fn key_count(&self) -> usize {
        self.keyset_count
    }

    /// Ids of the enabled keys across all keysets.
    #[must_use]
    pub fn key_ids(&self) -> Vec<u32> {
        self.keys.iter().map(|k| k.key_id).collect()
    }
}

impl DocumentVerifier for TinkVerifier {
    fn scheme(&self) -> SignatureScheme {
        SignatureScheme::Tink
    }

    fn try_verify(&self, data: &[u8], signature: &[u8]) -> Result<bool, CryptoError> {
        let text = std::str::from_utf8(signature)
            .map_err(|_| CryptoError::invalid_signature("signature is not hex text"))?;
        let signature = hex::decode(text.trim())
            .map_err(|e| CryptoError::invalid_signature(format!("bad hex: {}", e)))?;

        Ok(any_key_matches(self.scheme(), &self.keys, |key| {
            key.verify(data, &signature)
        }))
    }

    fn trusted_key_count(&self) -> usize {
        self.key_count()
    }
}

fn parse_keyset(json: &str) -> Result<Vec<TinkKey>, CryptoError> {
    let keyset: JsonKeyset = serde_json::from_str(json)
        .map_err(|e| CryptoError::invalid_public_key(format!("bad Tink keyset: {}", e)))?;

    let mut keys = Vec::new();
    for entry in keyset.key {
        if entry.status != "ENABLED" {
            debug!(key_id = entry.key_id, status = %entry.status, "Skipping Tink key");
            continue;
        }
        keys.push(parse_key(&entry)?);
    }

    if keys.is_empty() {
        return Err(CryptoError::invalid_public_key("Tink keyset has no enabled keys"));
    }

    debug!(
        primary_key_id = ?keyset.primary_key_id,
        enabled_keys = keys.len(),
        "Loaded Tink keyset"
    );
    Ok(keys)
}

fn parse_key(entry: &JsonKey) -> Result<TinkKey, CryptoError> {
    if entry.key_data.type_url != ECDSA_PUBLIC_KEY_TYPE_URL {
        return Err(CryptoError::unsupported(entry.key_data.type_url.clone()));
    }
    if let Some(material) = entry.key_data.key_material_type.as_deref() {
        if material != "ASYMMETRIC_PUBLIC" {
            return Err(CryptoError::invalid_public_key(format!(
                "expected public key material, got {}",
                material
            )));
        }
    }

    let value = base64::engine::general_purpose::STANDARD
        .decode(entry.key_data.value.trim())
        .map_err(|e| CryptoError::invalid_public_key(format!("bad key value: {}", e)))?;
    let key = EcdsaPublicKey::decode(value.as_slice())
        .map_err(|e| CryptoError::invalid_public_key(format!("bad EcdsaPublicKey: {}", e)))?;

    let params = key
        .params
        .as_ref()
        .ok_or_else(|| CryptoError::invalid_public_key("EcdsaPublicKey without params"))?;

    if !matches!(EllipticCurveType::try_from(params.curve), Ok(EllipticCurveType::NistP256)) {
        return Err(CryptoError::unsupported(format!("Tink curve {}", params.curve)));
    }
    if !matches!(HashType::try_from(params.hash_type), Ok(HashType::Sha256)) {
        return Err(CryptoError::unsupported(format!("Tink hash {}", params.hash_type)));
    }
    let encoding = match EcdsaSignatureEncoding::try_from(params.encoding) {
        Ok(EcdsaSignatureEncoding::Der) => EcdsaSignatureEncoding::Der,
        Ok(EcdsaSignatureEncoding::IeeeP1363) => EcdsaSignatureEncoding::IeeeP1363,
        _ => {
            return Err(CryptoError::unsupported(format!(
                "Tink signature encoding {}",
                params.encoding
            )))
        },
    };

    let mut sec1 = Vec::with_capacity(65);
    sec1.push(0x04);
    sec1.extend_from_slice(&coordinate(&key.x)?);
    sec1.extend_from_slice(&coordinate(&key.y)?);
    let verifying_key = VerifyingKey::from_sec1_bytes(&sec1)
        .map_err(|e| CryptoError::invalid_public_key(e.to_string()))?;

    let output_prefix = OutputPrefix::parse(&entry.output_prefix_type)?;

    Ok(TinkKey {
        key_id: entry.key_id,
        prefix: output_prefix.bytes(entry.key_id),
        output_prefix,
        encoding,
        verifying_key,
    })
}

/// Left-pad a big-endian coordinate to 32 bytes, dropping sign padding.
fn coordinate(bytes: &[u8]) -> Result<[u8; 32], CryptoError> {
    let start = bytes.iter().position(|&b| b != 0).unwrap_or(bytes.len());
    let trimmed = &bytes[start..];
    if trimmed.len() > 32 {
        return Err(CryptoError::invalid_public_key("P-256 coordinate longer than 32 bytes"));
    }
    let mut out = [0u8; 32];
    out[32 - trimmed.len()..].copy_from_slice(trimmed);
    Ok(out)
}
