//! # marketplace-client
//!
//! Reads vendor release repositories: trees of JSON documents in which
//! every document is published next to a detached signature.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                   MarketplaceClient                      │
//! │          (recursive walk, skip-and-continue)             │
//! │                          │                               │
//! │                          ▼                               │
//! │  ┌────────────────────────────────────────────────┐      │
//! │  │               VerifiedFetcher                  │      │
//! │  │   document + document.<suffix> → verify        │      │
//! │  └────────────────────────────────────────────────┘      │
//! │          │                              │                │
//! │          ▼                              ▼                │
//! │  ┌────────────────┐           ┌──────────────────┐       │
//! │  │ DocumentFetcher│           │ SignatureVerifier│       │
//! │  │ (HTTP / file:) │           │ (RSA, PGP, Tink) │       │
//! │  └────────────────┘           └──────────────────┘       │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! Only the root index is mandatory. Any other unreachable, forged or
//! malformed document is logged and left out of the result.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]

pub mod config;
pub mod document;
pub mod error;
pub mod fetch;
pub mod url_path;
pub mod verified;
pub mod walker;

pub use config::{ClientConfig, VendorConfig};
pub use document::{IndexFile, Release, ReleaseList};
pub use error::{ClientError, FetchError};
pub use fetch::{DocumentFetcher, HttpFetcher, LimitedFetcher, MemoryFetcher};
pub use verified::{VerificationOutcome, VerifiedFetcher};
pub use walker::{MarketplaceClient, NodeKind, RepositoryReport, SkippedNode};

pub use marketplace_crypto::{DocumentVerifier, SignatureScheme, SignatureVerifier};
