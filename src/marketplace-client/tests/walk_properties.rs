//! Property-based tests for repository addressing and traversal.
//!
//! Joining paths must not depend on how many slashes surround them, and a
//! walk must keep exactly the signed release lists, in document order, no
//! matter which siblings are forged or missing.

use proptest::prelude::*;
use serde_json::Value;

use marketplace_client::url_path::{append_url, index_url};
use marketplace_client::{
    ClientConfig, DocumentVerifier, MarketplaceClient, MemoryFetcher, RepositoryReport, SignatureScheme,
};
use marketplace_crypto::CryptoError;

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

#[derive(Debug, Clone, Copy)]
enum Node {
    Signed,
    Forged,
    Missing,
}

fn node() -> impl Strategy<Value = Node> {
    prop_oneof![
        3 => Just(Node::Signed),
        1 => Just(Node::Forged),
        1 => Just(Node::Missing),
    ]
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

fn serve(fetcher: &mut MemoryFetcher, url: &str, body: &str, node: Node) {
    match node {
        Node::Signed => {
            fetcher.insert(url, body);
            fetcher.insert(format!("{}.sig", url), format!("signed:{}", body));
        },
        Node::Forged => {
            fetcher.insert(url, body);
            fetcher.insert(format!("{}.sig", url), "signed:tampered");
        },
        Node::Missing => {},
    }
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        max_shrink_iters: 1000,
        ..ProptestConfig::default()
    })]

    /// Surrounding slashes never change the joined address.
    #[test]
    fn append_url_ignores_surrounding_slashes(
        base in "https?://[a-z]{1,8}(/[a-z0-9]{1,6}){0,3}",
        child in "[a-z0-9]{1,6}(/[a-z0-9]{1,6}){0,2}(\\.json)?",
        trailing in 0usize..4,
        leading in 0usize..4,
    ) {
        let joined = append_url(&format!("{}{}", base, "/".repeat(trailing)), &format!("{}{}", "/".repeat(leading), child));
        prop_assert_eq!(joined, format!("{}/{}", base, child));
    }

    /// The index address is the same with or without `index.json` and slashes.
    #[test]
    fn index_url_is_idempotent(
        base in "https?://[a-z]{1,8}(/[a-z0-9]{1,6}){0,3}",
        trailing in 0usize..3,
    ) {
        let url = index_url(&format!("{}{}", base, "/".repeat(trailing)));
        prop_assert_eq!(&url, &format!("{}/index.json", base));
        prop_assert_eq!(index_url(&url), url);
    }

    /// Only signed release lists below signed indexes contribute, in order,
    /// and every other node is reported once.
    #[test]
    fn walk_keeps_exactly_the_signed_documents(
        lists in prop::collection::vec(node(), 0..6),
        children in prop::collection::vec((node(), prop::collection::vec(node(), 0..4)), 0..4),
    ) {
        let mut fetcher = MemoryFetcher::new();
        let mut expected = Vec::new();
        let mut expected_skips = 0;

        let list_paths: Vec<String> = (0..lists.len()).map(|i| format!("{}.json", i)).collect();
        let child_paths: Vec<String> = (0..children.len()).map(|i| format!("c{}", i)).collect();
        let root = serde_json::json!({ "indexes": child_paths, "releases": list_paths }).to_string();
        serve(&mut fetcher, "http://h/index.json", &root, Node::Signed);

        for (i, list) in lists.iter().enumerate() {
            let name = format!("r{}", i);
            let body = serde_json::json!({ "releases": [{ "name": name }] }).to_string();
            serve(&mut fetcher, &format!("http://h/{}.json", i), &body, *list);
            match list {
                Node::Signed => expected.push(name),
                _ => expected_skips += 1,
            }
        }

        for (i, (index, nested)) in children.iter().enumerate() {
            let paths: Vec<String> = (0..nested.len()).map(|j| format!("{}.json", j)).collect();
            let body = serde_json::json!({ "releases": paths }).to_string();
            serve(&mut fetcher, &format!("http://h/c{}/index.json", i), &body, *index);
            if !matches!(index, Node::Signed) {
                expected_skips += 1;
            }

            for (j, list) in nested.iter().enumerate() {
                let name = format!("c{}r{}", i, j);
                let body = serde_json::json!({ "releases": [{ "name": name }] }).to_string();
                serve(&mut fetcher, &format!("http://h/c{}/{}.json", i, j), &body, *list);
                if matches!(index, Node::Signed) {
                    match list {
                        Node::Signed => expected.push(name),
                        _ => expected_skips += 1,
                    }
                }
            }
        }

        let client = MarketplaceClient::with_parts(fetcher, PrefixVerifier, &ClientConfig::default());
        let rt = runtime();
        let first: RepositoryReport<Value> = rt.block_on(client.read_repository_report("http://h")).unwrap();
        let second: RepositoryReport<Value> = rt.block_on(client.read_repository_report("http://h")).unwrap();

        let names: Vec<String> = first
            .releases
            .iter()
            .filter_map(|r| r["name"].as_str().map(String::from))
            .collect();
        prop_assert_eq!(names, expected);
        prop_assert_eq!(first.skipped.len(), expected_skips);
        prop_assert_eq!(first.releases, second.releases);
    }
}
