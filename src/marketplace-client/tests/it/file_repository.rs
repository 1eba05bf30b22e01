//! Repositories read from the local filesystem through `file:` URLs.

use std::path::Path;

use marketplace_client::{ClientConfig, MarketplaceClient, Release, SignatureScheme};
use url::Url;

use crate::support::{names, release_list, sign_base64, PRIVATE_KEY, PUBLIC_KEY};

fn write_signed(root: &Path, path: &str, body: &str) {
    let file = root.join(path);
    std::fs::create_dir_all(file.parent().unwrap()).unwrap();
    std::fs::write(&file, body).unwrap();
    std::fs::write(
        root.join(format!("{}.sha256.sign", path)),
        sign_base64(PRIVATE_KEY, body.as_bytes()),
    )
    .unwrap();
}

fn repository() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    write_signed(dir.path(), "index.json", r#"{"indexes":["8/index.json"],"releases":["latest.json"]}"#);
    write_signed(dir.path(), "latest.json", &release_list(&["jdk-17.0.1+12"]));
    write_signed(dir.path(), "8/index.json", r#"{"releases":["jdk8u302-b08.json"]}"#);
    write_signed(dir.path(), "8/jdk8u302-b08.json", &release_list(&["jdk8u302-b08"]));
    dir
}

#[tokio::test]
async fn reads_file_repository_when_enabled() {
    let dir = repository();
    let url = Url::from_directory_path(dir.path()).unwrap().to_string();

    let config = ClientConfig {
        allow_file_urls: true,
        ..ClientConfig::new(url, SignatureScheme::RsaBase64, [PUBLIC_KEY])
    };
    let client = MarketplaceClient::new(config).unwrap();
    let releases: Vec<Release> = client.read_repository().await.unwrap();

    assert_eq!(names(&releases), vec!["jdk-17.0.1+12", "jdk8u302-b08"]);
}

#[tokio::test]
async fn file_repository_rejected_when_disabled() {
    let dir = repository();
    let url = Url::from_directory_path(dir.path()).unwrap().to_string();

    let client = MarketplaceClient::new(ClientConfig::new(url, SignatureScheme::RsaBase64, [PUBLIC_KEY])).unwrap();
    assert!(client.read_repository().await.is_err());
}
