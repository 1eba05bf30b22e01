//! Client configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use marketplace_crypto::{normalize_pem, SignatureScheme};
use tracing::{debug, warn};

use crate::error::ClientError;

/// Environment variable that enables `file:` repository URLs.
pub const ALLOW_FILE_BASED_URL_ENV: &str = "ALLOW_FILE_BASED_URL";

/// Environment variable naming a directory of key files.
pub const KEY_DIR_ENV: &str = "KEY_DIR";

/// Configuration for a [`MarketplaceClient`](crate::MarketplaceClient).
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Root of the repository, with or without a trailing `index.json`.
    pub repository_url: String,
    /// Scheme used by the vendor to sign every document.
    pub signature_scheme: SignatureScheme,
    /// Trusted public keys; a document is accepted if any of them signed it.
    pub public_keys: Vec<String>,
    /// Total timeout of a single request.
    pub timeout: Duration,
    /// TCP connect timeout.
    pub connect_timeout: Duration,
    /// Maximum index nesting below the root.
    pub max_depth: usize,
    /// Maximum requests in flight during one repository walk.
    pub max_concurrent_fetches: usize,
    /// Whether `file:` URLs are read from the local filesystem.
    pub allow_file_urls: bool,
    /// `User-Agent` header sent with every request.
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            repository_url: String::new(),
            signature_scheme: SignatureScheme::default(),
            public_keys: Vec::new(),
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(5),
            max_depth: 16,
            max_concurrent_fetches: 8,
            allow_file_urls: false,
            user_agent: format!("marketplace-client/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl ClientConfig {
    /// Configuration for `repository_url` trusting `public_keys` under `scheme`.
    pub fn new<S: Into<String>>(
        repository_url: impl Into<String>,
        signature_scheme: SignatureScheme,
        public_keys: impl IntoIterator<Item = S>,
    ) -> Self {
        Self {
            repository_url: repository_url.into(),
            signature_scheme,
            public_keys: public_keys.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Enable `file:` URLs if `ALLOW_FILE_BASED_URL` is set, whatever its value.
    #[must_use]
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|name| std::env::var_os(name).is_some())
    }

    /// Apply environment overrides with an explicit presence check.
    #[must_use]
    pub fn with_overrides_from<F>(mut self, is_set: F) -> Self
    where
        F: Fn(&str) -> bool,
    {
        if is_set(ALLOW_FILE_BASED_URL_ENV) {
            self.allow_file_urls = true;
        }
        self
    }

    /// Check values that would otherwise only fail at traversal time.
    pub fn validate(&self) -> Result<(), ClientError> {
        if self.public_keys.is_empty() {
            return Err(ClientError::configuration("at least one public key is required"));
        }
        if self.max_concurrent_fetches == 0 {
            return Err(ClientError::configuration("max_concurrent_fetches must be at least 1"));
        }
        Ok(())
    }
}

/// A vendor's repository settings, resolved from the environment.
///
/// For vendor `adoptium` the following variables are read:
///
/// - `ADOPTIUM_URL`: repository address (required)
/// - `ADOPTIUM_KEY`: public key (required); the value may itself name an
///   environment variable, a file under `KEY_DIR`, or a file path, whose
///   contents are then used
/// - `ADOPTIUM_SIGNATURE_TYPE`: signature scheme; unknown values fall back
///   to the default scheme
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VendorConfig {
    /// Vendor name as given.
    pub vendor: String,
    /// Repository address.
    pub repository_url: String,
    /// Public key material.
    pub public_key: String,
    /// Signature scheme.
    pub signature_scheme: SignatureScheme,
}

impl VendorConfig {
    /// Resolve `vendor` from the process environment.
    pub fn from_env(vendor: &str) -> Result<Self, ClientError> {
        let key_dir = std::env::var_os(KEY_DIR_ENV).map(PathBuf::from);
        Self::resolve(vendor, |name| std::env::var(name).ok(), key_dir.as_deref())
    }

    /// Resolve `vendor` with an explicit variable lookup.
    pub fn resolve<F>(vendor: &str, lookup: F, key_dir: Option<&Path>) -> Result<Self, ClientError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let prefix = env_prefix(vendor);
        if prefix.is_empty() {
            return Err(ClientError::configuration("vendor name is empty"));
        }

        let url_var = format!("{}_URL", prefix);
        let repository_url = lookup(&url_var)
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty())
            .ok_or_else(|| ClientError::configuration(format!("{} is not set", url_var)))?;

        let signature_scheme = match lookup(&format!("{}_SIGNATURE_TYPE", prefix)) {
            Some(name) => name.parse().unwrap_or_else(|e| {
                warn!(vendor = %vendor, error = %e, "Falling back to default signature scheme");
                SignatureScheme::default()
            }),
            None => SignatureScheme::default(),
        };

        let key_var = format!("{}_KEY", prefix);
        let reference = lookup(&key_var)
            .ok_or_else(|| ClientError::configuration(format!("{} is not set", key_var)))?;
        let key = config_value(&reference, &lookup, key_dir).unwrap_or(reference);
        if key.trim().is_empty() {
            return Err(ClientError::configuration(format!("{} is empty", key_var)));
        }

        let public_key = match signature_scheme {
            SignatureScheme::RsaBase64 | SignatureScheme::RsaRaw => normalize_pem(&key)?,
            SignatureScheme::Pgp | SignatureScheme::Tink => key,
        };

        debug!(vendor = %vendor, url = %repository_url, scheme = %signature_scheme, "Resolved vendor configuration");

        Ok(Self {
            vendor: vendor.to_string(),
            repository_url,
            public_key,
            signature_scheme,
        })
    }

    /// Client configuration for this vendor's repository.
    pub fn into_client_config(self) -> ClientConfig {
        ClientConfig::new(self.repository_url, self.signature_scheme, [self.public_key]).with_env_overrides()
    }
}

fn env_prefix(vendor: &str) -> String {
    vendor.trim().to_ascii_uppercase().replace('-', "_")
}

/// Dereference a configuration value that may name a variable or a file.
fn config_value<F>(name: &str, lookup: &F, key_dir: Option<&Path>) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(value) = lookup(name) {
        return Some(value);
    }

    // Literal PEM or Base64 keys are not file names.
    if name.contains('\n') || name.contains("-----BEGIN") {
        return None;
    }

    let candidates = key_dir
        .map(|dir| dir.join(name))
        .into_iter()
        .chain(std::iter::once(PathBuf::from(name)));

    for path in candidates {
        if path.is_file() {
            match std::fs::read_to_string(&path) {
                Ok(contents) => return Some(contents),
                Err(e) => warn!(path = %path.display(), error = %e, "Failed to read key file"),
            }
        }
    }
    None
}
