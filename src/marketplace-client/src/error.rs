//! Error types for repository traversal.

use marketplace_crypto::CryptoError;
use thiserror::Error;

/// Why a single repository node could not be consumed.
///
/// Below the root of a repository these are logged and skipped; at the
/// root they are wrapped in [`ClientError::FailedToPullData`].
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    /// The document or its signature could not be fetched.
    #[error("Failed to pull {url}: {reason}")]
    Unreachable {
        /// URL that could not be fetched.
        url: String,
        /// Transport-level cause (status code, I/O error, timeout).
        reason: String,
    },

    /// The signature did not validate against any trusted key.
    #[error("Failed to validate signature for {url} {signature_url}")]
    Untrusted {
        /// Document URL.
        url: String,
        /// URL of the detached signature that was checked.
        signature_url: String,
    },

    /// The document was trusted but is not the expected shape, or the
    /// tree around it is not traversable.
    #[error("Malformed document at {url}: {reason}")]
    Malformed {
        /// Document URL.
        url: String,
        /// What was wrong with it.
        reason: String,
    },
}

impl FetchError {
    /// Create an unreachable error.
    #[must_use]
    pub fn unreachable(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Unreachable {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Create a malformed document error.
    #[must_use]
    pub fn malformed(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Malformed {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// URL the error refers to.
    pub fn url(&self) -> &str {
        match self {
            Self::Unreachable { url, .. } | Self::Untrusted { url, .. } | Self::Malformed { url, .. } => url,
        }
    }

    /// Short machine-readable name of the failure kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Unreachable { .. } => "unreachable",
            Self::Untrusted { .. } => "untrusted",
            Self::Malformed { .. } => "malformed",
        }
    }
}

/// Errors surfaced to callers of the client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The root index of a repository could not be fetched, verified or
    /// parsed. No partial data is returned.
    #[error("Failed to pull data from {url}")]
    FailedToPullData {
        /// Root index URL.
        url: String,
        /// Underlying node failure.
        #[source]
        source: FetchError,
    },

    /// Invalid client configuration.
    #[error("Configuration error: {message}")]
    Configuration {
        /// Error message.
        message: String,
    },

    /// Invalid key material or scheme.
    #[error(transparent)]
    Crypto(#[from] CryptoError),
}

impl ClientError {
    /// Create a configuration error.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Whether this error was raised before any network access.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration { .. } | Self::Crypto(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_error_accessors() {
        let err = FetchError::unreachable("http://host/index.json", "HTTP 404");
        assert_eq!(err.url(), "http://host/index.json");
        assert_eq!(err.kind(), "unreachable");
        assert_eq!(err.to_string(), "Failed to pull http://host/index.json: HTTP 404");

        let err = FetchError::Untrusted {
            url: "http://host/a.json".into(),
            signature_url: "http://host/a.json.sig".into(),
        };
        assert_eq!(err.url(), "http://host/a.json");
        assert_eq!(err.kind(), "untrusted");
    }

    #[test]
    fn test_root_failure_keeps_source() {
        use std::error::Error as _;

        let err = ClientError::FailedToPullData {
            url: "http://host/index.json".into(),
            source: FetchError::malformed("http://host/index.json", "expected object"),
        };
        assert!(!err.is_configuration());
        assert!(err.source().is_some());
        assert!(ClientError::configuration("no url").is_configuration());
    }
}
