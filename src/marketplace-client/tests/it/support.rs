//! Signed repository fixtures.

use base64::Engine;
use rsa::pkcs1v15::SigningKey;
use rsa::pkcs8::DecodePrivateKey;
use rsa::signature::{SignatureEncoding, Signer};
use rsa::RsaPrivateKey;
use sha2::Sha256;

pub const PRIVATE_KEY: &str = include_str!("../fixtures/keys/private.pem");
pub const PUBLIC_KEY: &str = include_str!("../fixtures/keys/public.pem");
pub const OTHER_PRIVATE_KEY: &str = include_str!("../fixtures/keys/other_private.pem");
pub const OTHER_PUBLIC_KEY: &str = include_str!("../fixtures/keys/other_public.pem");

/// Base64 SHA256withRSA signature, as published in `.sha256.sign` files.
pub fn sign_base64(private_key: &str, data: &[u8]) -> String {
    let key = RsaPrivateKey::from_pkcs8_pem(private_key).unwrap();
    let signature = SigningKey::<Sha256>::new(key).sign(data).to_vec();
    base64::engine::general_purpose::STANDARD.encode(signature)
}

/// A release-list document with one record per name.
pub fn release_list(names: &[&str]) -> String {
    let releases: Vec<serde_json::Value> = names
        .iter()
        .map(|name| {
            serde_json::json!({
                "release_name": name,
                "release_link": format!("https://github.com/adoptium/temurin8-binaries/releases/tag/{}", name),
                "timestamp": "2021-07-29T12:00:00Z",
                "vendor": "adoptium",
                "binaries": [],
            })
        })
        .collect();
    serde_json::json!({ "releases": releases }).to_string()
}

/// Sorted release names.
pub fn names(releases: &[marketplace_client::Release]) -> Vec<String> {
    let mut names: Vec<String> = releases.iter().map(|r| r.release_name.clone()).collect();
    names.sort();
    names
}
