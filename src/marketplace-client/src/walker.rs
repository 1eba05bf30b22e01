//! Repository traversal.
//!
//! A repository is a tree of signed documents rooted at `index.json`.
//! The walker verifies every document before reading it and flattens the
//! release lists it finds into one collection.
//!
//! Failure policy:
//!
//! - the root index must be fetched, verified and parsed, or the whole
//!   call fails with [`ClientError::FailedToPullData`]
//! - any other node that fails is logged, recorded as a [`SkippedNode`],
//!   and contributes nothing; its siblings are still read

use std::fmt;

use futures::future::BoxFuture;
use futures::stream::{self, StreamExt};
use marketplace_crypto::{DocumentVerifier, SignatureVerifier};
use serde::de::DeserializeOwned;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::config::ClientConfig;
use crate::document::{parse_index, parse_release_list, Release};
use crate::error::{ClientError, FetchError};
use crate::fetch::{DocumentFetcher, HttpFetcher, LimitedFetcher};
use crate::url_path::{append_url, index_url, remove_index_file};
use crate::verified::VerifiedFetcher;

/// Kind of repository node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// An `index.json` document.
    Index,
    /// A release-list document.
    ReleaseList,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Index => f.write_str("index"),
            Self::ReleaseList => f.write_str("release list"),
        }
    }
}

/// A node that was left out of the result.
#[derive(Debug, Clone)]
pub struct SkippedNode {
    /// Document URL.
    pub url: String,
    /// What the document was expected to be.
    pub kind: NodeKind,
    /// Why it was skipped.
    pub error: FetchError,
}

/// Releases read from a repository plus the nodes that were skipped.
#[derive(Debug, Clone)]
pub struct RepositoryReport<R = Release> {
    /// Verified releases.
    pub releases: Vec<R>,
    /// Nodes below the root that could not be read.
    pub skipped: Vec<SkippedNode>,
}

impl<R> RepositoryReport<R> {
    fn empty() -> Self {
        Self {
            releases: Vec::new(),
            skipped: Vec::new(),
        }
    }

    fn skip(url: String, kind: NodeKind, error: FetchError) -> Self {
        warn!(url = %url, kind = %kind, error = %error, "Skipping repository node");
        Self {
            releases: Vec::new(),
            skipped: vec![SkippedNode { url, kind, error }],
        }
    }

    fn merge(&mut self, other: Self) {
        self.releases.extend(other.releases);
        self.skipped.extend(other.skipped);
    }

    /// Whether every node of the tree was read.
    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty()
    }
}

enum Child {
    Index(String),
    ReleaseList(String),
}

/// Reads signed release repositories.
///
/// ```rust,ignore
/// let config = ClientConfig::new("https://vendor.example/repo", SignatureScheme::RsaBase64, [public_key]);
/// let client = MarketplaceClient::new(config)?;
/// let releases = client.read_repository().await?;
/// ```
pub struct MarketplaceClient<F = HttpFetcher> {
    fetcher: VerifiedFetcher<LimitedFetcher<F>>,
    repository_url: String,
    max_depth: usize,
    max_concurrent_fetches: usize,
}

impl MarketplaceClient<HttpFetcher> {
    /// Build a client fetching over HTTP with a verifier for the configured
    /// scheme and keys.
    ///
    /// Invalid key material fails here, before any request is made.
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        config.validate()?;
        let verifier = SignatureVerifier::build(config.signature_scheme, &config.public_keys)?;
        let fetcher = HttpFetcher::new(&config)?;
        Ok(Self::with_parts(fetcher, verifier, &config))
    }
}

impl<F: DocumentFetcher> MarketplaceClient<F> {
    /// Build a client from an explicit fetcher and verifier.
    ///
    /// Only the repository URL and traversal limits are taken from `config`.
    /// `max_concurrent_fetches` bounds the requests in flight across the
    /// whole walk.
    pub fn with_parts(fetcher: F, verifier: impl DocumentVerifier + 'static, config: &ClientConfig) -> Self {
        let fetcher = LimitedFetcher::new(fetcher, config.max_concurrent_fetches);
        Self {
            fetcher: VerifiedFetcher::new(fetcher, verifier),
            repository_url: config.repository_url.clone(),
            max_depth: config.max_depth,
            max_concurrent_fetches: config.max_concurrent_fetches.max(1),
        }
    }

    /// The verified fetcher used for every node.
    pub fn fetcher(&self) -> &VerifiedFetcher<LimitedFetcher<F>> {
        &self.fetcher
    }

    /// The transport documents are fetched with.
    pub fn transport(&self) -> &F {
        self.fetcher.fetcher().inner()
    }

    /// Read the configured repository.
    pub async fn read_repository(&self) -> Result<Vec<Release>, ClientError> {
        if self.repository_url.is_empty() {
            return Err(ClientError::configuration("no repository URL configured"));
        }
        self.read_repository_data(&self.repository_url).await
    }

    /// Read every verified release below `root_url`.
    ///
    /// Fails only if the root index cannot be read.
    pub async fn read_repository_data<R>(&self, root_url: &str) -> Result<Vec<R>, ClientError>
    where
        R: DeserializeOwned + Send,
    {
        Ok(self.read_repository_report(root_url).await?.releases)
    }

    /// Like [`read_repository_data`](Self::read_repository_data), but also
    /// reports which nodes were skipped.
    #[instrument(skip(self))]
    pub async fn read_repository_report<R>(&self, root_url: &str) -> Result<RepositoryReport<R>, ClientError>
    where
        R: DeserializeOwned + Send,
    {
        let report = self
            .walk_index(root_url.to_string(), Vec::new())
            .await
            .map_err(|source| ClientError::FailedToPullData {
                url: index_url(root_url),
                source,
            })?;

        info!(
            releases = report.releases.len(),
            skipped = report.skipped.len(),
            "Read repository"
        );
        Ok(report)
    }

    /// Read the index below `url` and everything it references.
    ///
    /// `ancestors` holds the directory of every index on the path from the
    /// root, used to stop cycles and runaway nesting.
    fn walk_index<'a, R>(
        &'a self,
        url: String,
        ancestors: Vec<String>,
    ) -> BoxFuture<'a, Result<RepositoryReport<R>, FetchError>>
    where
        R: DeserializeOwned + Send + 'a,
    {
        Box::pin(async move {
            let base = canonical_base(&url);
            let index_url = index_url(&base);

            if ancestors.len() > self.max_depth {
                return Err(FetchError::malformed(
                    index_url,
                    format!("index nesting exceeds {} levels", self.max_depth),
                ));
            }
            if ancestors.contains(&base) {
                return Err(FetchError::malformed(index_url, "index refers back to an ancestor"));
            }

            let body = self.fetcher.pull_and_verify(&index_url).await?;
            let index = parse_index(&index_url, &body)?;
            debug!(
                url = %index_url,
                indexes = index.indexes.len(),
                releases = index.releases.len(),
                "Read index"
            );

            let children = index
                .releases
                .iter()
                .map(|path| Child::ReleaseList(append_url(&base, path)))
                .chain(index.indexes.iter().map(|path| Child::Index(append_url(&base, path))))
                .collect::<Vec<_>>();

            let mut path = ancestors;
            path.push(base);
            let path = &path;

            let mut report = RepositoryReport::empty();
            let mut results = stream::iter(children)
                .map(|child| self.read_child(child, path))
                .buffered(self.max_concurrent_fetches);
            while let Some(contribution) = results.next().await {
                report.merge(contribution);
            }
            Ok(report)
        })
    }

    async fn read_child<R>(&self, child: Child, ancestors: &[String]) -> RepositoryReport<R>
    where
        R: DeserializeOwned + Send,
    {
        match child {
            Child::Index(url) => match self.walk_index(url.clone(), ancestors.to_vec()).await {
                Ok(report) => report,
                Err(e) => RepositoryReport::skip(url, NodeKind::Index, e),
            },
            Child::ReleaseList(url) => match self.read_release_list(&url).await {
                Ok(releases) => RepositoryReport {
                    releases,
                    skipped: Vec::new(),
                },
                Err(e) => RepositoryReport::skip(url, NodeKind::ReleaseList, e),
            },
        }
    }

    async fn read_release_list<R: DeserializeOwned>(&self, url: &str) -> Result<Vec<R>, FetchError> {
        let body = self.fetcher.pull_and_verify(url).await?;
        let releases = parse_release_list(url, &body)?;
        debug!(url = %url, releases = releases.len(), "Read release list");
        Ok(releases)
    }
}

/// Directory form of `url` with dot segments resolved, used to compare
/// positions in the tree.
fn canonical_base(url: &str) -> String {
    let base = remove_index_file(url);
    match Url::parse(base) {
        Ok(parsed) if parsed.path() == "/" => parsed.to_string(),
        Ok(parsed) => parsed.as_str().trim_end_matches('/').to_string(),
        Err(_) => base.trim_end_matches('/').to_string(),
    }
}
