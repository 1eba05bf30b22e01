//! Fetch a document together with its detached signature.

use marketplace_crypto::DocumentVerifier;
use tracing::{debug, instrument};

use crate::error::FetchError;
use crate::fetch::DocumentFetcher;

/// Result of fetching and verifying one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationOutcome {
    /// The signature validated; the body can be parsed.
    Trusted(Vec<u8>),
    /// Both files were fetched but no trusted key signed the body.
    Untrusted {
        /// URL of the signature that failed to validate.
        signature_url: String,
    },
    /// The document or its signature could not be fetched.
    Unreachable {
        /// URL that failed.
        url: String,
        /// Transport-level cause.
        reason: String,
    },
}

impl VerificationOutcome {
    /// Whether the body is trusted.
    pub fn is_trusted(&self) -> bool {
        matches!(self, Self::Trusted(_))
    }

    /// Convert into the trusted body or the matching [`FetchError`] for `url`.
    pub fn into_result(self, url: &str) -> Result<Vec<u8>, FetchError> {
        match self {
            Self::Trusted(body) => Ok(body),
            Self::Untrusted { signature_url } => Err(FetchError::Untrusted {
                url: url.to_string(),
                signature_url,
            }),
            Self::Unreachable { url, reason } => Err(FetchError::Unreachable { url, reason }),
        }
    }
}

/// A fetcher paired with the verifier for its repository.
pub struct VerifiedFetcher<F> {
    fetcher: F,
    verifier: Box<dyn DocumentVerifier>,
}

impl<F: DocumentFetcher> VerifiedFetcher<F> {
    /// Pair `fetcher` with `verifier`.
    pub fn new(fetcher: F, verifier: impl DocumentVerifier + 'static) -> Self {
        Self {
            fetcher,
            verifier: Box::new(verifier),
        }
    }

    /// URL of the detached signature for `url`.
    pub fn signature_url(&self, url: &str) -> String {
        format!("{}.{}", url, self.verifier.signature_suffix())
    }

    /// The underlying fetcher.
    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// The verifier.
    pub fn verifier(&self) -> &dyn DocumentVerifier {
        self.verifier.as_ref()
    }

    /// Fetch `url` and its signature and check the signature.
    ///
    /// Each URL is requested exactly once.
    #[instrument(skip(self))]
    pub async fn fetch_verified(&self, url: &str) -> VerificationOutcome {
        let signature_url = self.signature_url(url);

        let fetched = futures::future::try_join(
            self.fetcher.fetch(url),
            self.fetcher.fetch(&signature_url),
        )
        .await;

        let (body, signature) = match fetched {
            Ok(pair) => pair,
            Err(FetchError::Unreachable { url, reason }) => {
                return VerificationOutcome::Unreachable { url, reason };
            },
            Err(e) => {
                return VerificationOutcome::Unreachable {
                    url: e.url().to_string(),
                    reason: e.to_string(),
                };
            },
        };

        if self.verifier.verify(&body, &signature) {
            debug!(bytes = body.len(), "Document signature verified");
            VerificationOutcome::Trusted(body)
        } else {
            VerificationOutcome::Untrusted { signature_url }
        }
    }

    /// Fetch and verify `url`, returning the trusted body.
    pub async fn pull_and_verify(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        self.fetch_verified(url).await.into_result(url)
    }
}

#[cfg(test)]
mod tests {
    use marketplace_crypto::{CryptoError, SignatureScheme};

    use super::*;
    use crate::fetch::MemoryFetcher;

    /// Accepts a signature equal to `b"signed:" || data`.
    struct PrefixVerifier;

    impl DocumentVerifier for PrefixVerifier {
        fn scheme(&self) -> SignatureScheme {
            SignatureScheme::RsaRaw
        }

        fn try_verify(&self, data: &[u8], signature: &[u8]) -> Result<bool, CryptoError> {
            Ok(signature.strip_prefix(b"signed:".as_slice()) == Some(data))
        }
    }

    fn fetcher(docs: &[(&str, &str)]) -> VerifiedFetcher<MemoryFetcher> {
        let mut memory = MemoryFetcher::new();
        for (url, body) in docs {
            memory.insert(*url, *body);
        }
        VerifiedFetcher::new(memory, PrefixVerifier)
    }

    #[tokio::test]
    async fn test_trusted_document() {
        let fetcher = fetcher(&[("http://h/a.json", "{}"), ("http://h/a.json.sig", "signed:{}")]);
        assert_eq!(fetcher.pull_and_verify("http://h/a.json").await.unwrap(), b"{}");

        let mut requests = fetcher.fetcher().requests();
        requests.sort();
        assert_eq!(requests, vec!["http://h/a.json", "http://h/a.json.sig"]);
    }

    #[tokio::test]
    async fn test_bad_signature_is_untrusted() {
        let fetcher = fetcher(&[("http://h/a.json", "{}"), ("http://h/a.json.sig", "signed:[]")]);
        let outcome = fetcher.fetch_verified("http://h/a.json").await;
        assert_eq!(
            outcome,
            VerificationOutcome::Untrusted {
                signature_url: "http://h/a.json.sig".into()
            }
        );
        let err = outcome.into_result("http://h/a.json").unwrap_err();
        assert!(matches!(err, FetchError::Untrusted { .. }));
    }

    #[tokio::test]
    async fn test_missing_signature_is_unreachable() {
        let fetcher = fetcher(&[("http://h/a.json", "{}")]);
        let outcome = fetcher.fetch_verified("http://h/a.json").await;
        assert!(!outcome.is_trusted());
        match outcome {
            VerificationOutcome::Unreachable { url, .. } => assert_eq!(url, "http://h/a.json.sig"),
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_document_is_unreachable() {
        let fetcher = fetcher(&[("http://h/a.json.sig", "signed:{}")]);
        let err = fetcher.pull_and_verify("http://h/a.json").await.unwrap_err();
        assert!(matches!(err, FetchError::Unreachable { .. }));
    }
}
