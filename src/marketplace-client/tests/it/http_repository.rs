//! Repositories served over HTTP.

use httpmock::prelude::*;
use marketplace_client::{
    ClientConfig, ClientError, FetchError, MarketplaceClient, NodeKind, Release, RepositoryReport,
    SignatureScheme,
};

use crate::support::{
    names, release_list, sign_base64, OTHER_PRIVATE_KEY, OTHER_PUBLIC_KEY, PRIVATE_KEY, PUBLIC_KEY,
};

/// Serve `body` at `path` with a signature made by `private_key`.
async fn serve_signed(server: &MockServer, path: &str, body: &str, private_key: &str) {
    let signature = sign_base64(private_key, body.as_bytes());
    let body = body.to_string();
    server
        .mock_async(|when, then| {
            when.method(GET).path(path.to_string());
            then.status(200).body(body);
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path(format!("{}.sha256.sign", path));
            then.status(200).body(signature);
        })
        .await;
}

fn client(keys: &[&str]) -> MarketplaceClient {
    MarketplaceClient::new(ClientConfig::new("", SignatureScheme::RsaBase64, keys.iter().copied())).unwrap()
}

#[tokio::test]
async fn bad_signature_release_is_skipped() {
    let server = MockServer::start_async().await;
    serve_signed(
        &server,
        "/repo/index.json",
        r#"{"releases":["8/jdk8u302-b08.json","8/jdk8u292-b10.json"]}"#,
        PRIVATE_KEY,
    )
    .await;
    serve_signed(&server, "/repo/8/jdk8u302-b08.json", &release_list(&["jdk8u302-b08"]), PRIVATE_KEY).await;
    serve_signed(&server, "/repo/8/jdk8u292-b10.json", &release_list(&["jdk8u292-b10"]), OTHER_PRIVATE_KEY).await;

    let client = client(&[PUBLIC_KEY]);
    let releases: Vec<Release> = client.read_repository_data(&server.url("/repo")).await.unwrap();

    assert_eq!(releases.len(), 1);
    assert_eq!(releases[0].release_name, "jdk8u302-b08");
}

#[tokio::test]
async fn rotated_keys_accept_both_signers() {
    let server = MockServer::start_async().await;
    serve_signed(
        &server,
        "/repo/index.json",
        r#"{"releases":["a.json","b.json"]}"#,
        PRIVATE_KEY,
    )
    .await;
    serve_signed(&server, "/repo/a.json", &release_list(&["a"]), PRIVATE_KEY).await;
    serve_signed(&server, "/repo/b.json", &release_list(&["b"]), OTHER_PRIVATE_KEY).await;

    let client = client(&[OTHER_PUBLIC_KEY, PUBLIC_KEY]);
    let releases: Vec<Release> = client.read_repository_data(&server.url("/repo/")).await.unwrap();
    assert_eq!(names(&releases), vec!["a", "b"]);
}

#[tokio::test]
async fn missing_child_index_is_skipped() {
    let server = MockServer::start_async().await;
    serve_signed(
        &server,
        "/repo/index.json",
        r#"{"indexes":["8/index.json","17/index.json"]}"#,
        PRIVATE_KEY,
    )
    .await;
    serve_signed(&server, "/repo/8/index.json", r#"{"releases":["jdk8.json"]}"#, PRIVATE_KEY).await;
    serve_signed(&server, "/repo/8/jdk8.json", &release_list(&["jdk8u302-b08"]), PRIVATE_KEY).await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/repo/17/index.json");
            then.status(404);
        })
        .await;

    let client = client(&[PUBLIC_KEY]);
    let report: RepositoryReport = client.read_repository_report(&server.url("/repo/index.json")).await.unwrap();

    assert_eq!(names(&report.releases), vec!["jdk8u302-b08"]);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].kind, NodeKind::Index);
    assert!(report.skipped[0].url.ends_with("/repo/17/index.json"));
    assert!(matches!(report.skipped[0].error, FetchError::Unreachable { .. }));
}

#[tokio::test]
async fn missing_root_index_fails() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/repo/index.json");
            then.status(404);
        })
        .await;

    let client = client(&[PUBLIC_KEY]);
    let err = client.read_repository_data::<Release>(&server.url("/repo")).await.unwrap_err();
    match err {
        ClientError::FailedToPullData { url, source } => {
            assert_eq!(url, server.url("/repo/index.json"));
            assert!(matches!(source, FetchError::Unreachable { .. }));
        },
        other => panic!("unexpected error {:?}", other),
    }
}

#[tokio::test]
async fn repeated_reads_are_identical_and_fetch_each_document_once() {
    let server = MockServer::start_async().await;
    let index = r#"{"indexes":["11"],"releases":["8.json"]}"#;
    let index_signature = sign_base64(PRIVATE_KEY, index.as_bytes());
    let index_mock = server
        .mock_async(|when, then| {
            when.method(GET).path("/index.json");
            then.status(200).body(index);
        })
        .await;
    let index_signature_mock = server
        .mock_async(|when, then| {
            when.method(GET).path("/index.json.sha256.sign");
            then.status(200).body(index_signature);
        })
        .await;
    serve_signed(&server, "/8.json", &release_list(&["jdk8u302-b08", "jdk8u292-b10"]), PRIVATE_KEY).await;
    serve_signed(&server, "/11/index.json", r#"{"releases":["11.json"]}"#, PRIVATE_KEY).await;
    serve_signed(&server, "/11/11.json", &release_list(&["jdk-11.0.12+7"]), PRIVATE_KEY).await;

    let client = client(&[PUBLIC_KEY]);
    let first: Vec<Release> = client.read_repository_data(&server.base_url()).await.unwrap();
    let second: Vec<Release> = client.read_repository_data(&server.base_url()).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(names(&first), vec!["jdk-11.0.12+7", "jdk8u292-b10", "jdk8u302-b08"]);
    index_mock.assert_hits_async(2).await;
    index_signature_mock.assert_hits_async(2).await;
}

#[tokio::test]
async fn server_error_on_signature_skips_document() {
    let server = MockServer::start_async().await;
    serve_signed(&server, "/index.json", r#"{"releases":["a.json","b.json"]}"#, PRIVATE_KEY).await;
    serve_signed(&server, "/a.json", &release_list(&["a"]), PRIVATE_KEY).await;
    let body = release_list(&["b"]);
    server
        .mock_async(|when, then| {
            when.method(GET).path("/b.json");
            then.status(200).body(body);
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/b.json.sha256.sign");
            then.status(500);
        })
        .await;

    let client = client(&[PUBLIC_KEY]);
    let report: RepositoryReport = client.read_repository_report(&server.base_url()).await.unwrap();
    assert_eq!(names(&report.releases), vec!["a"]);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].kind, NodeKind::ReleaseList);
}

#[tokio::test]
async fn forged_root_index_fails() {
    let server = MockServer::start_async().await;
    serve_signed(&server, "/index.json", r#"{"releases":["a.json"]}"#, OTHER_PRIVATE_KEY).await;
    serve_signed(&server, "/a.json", &release_list(&["a"]), PRIVATE_KEY).await;

    let client = client(&[PUBLIC_KEY]);
    let err = client.read_repository_data::<Release>(&server.base_url()).await.unwrap_err();
    assert!(matches!(
        err,
        ClientError::FailedToPullData {
            source: FetchError::Untrusted { .. },
            ..
        }
    ));
}
