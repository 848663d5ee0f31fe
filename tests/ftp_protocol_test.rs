//! End-to-end scenarios driven against the in-process mock server in
//! `support/mod.rs`: connect/list/disconnect, upload-then-verify-size,
//! throttled download, rename+existence, and passive-mode retry.

#[path = "support/mod.rs"]
mod support;

use ftp_rs::{FileKind, FtpClient, FtpConfig};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use support::{MockServer, MockServerConfig};

fn plain_config(port: u16) -> Arc<FtpConfig> {
    Arc::new(FtpConfig::new("127.0.0.1", port, false, "tester", "secret"))
}

#[tokio::test]
async fn connect_list_disconnect() {
    let listing = "\
-rw-r--r--   1 owner    group         1024 Jan 15 12:30 report.txt\r\n\
drwxr-xr-x   2 owner    group         4096 Jan 15 12:30 archive\r\n";
    let server = MockServer::start(MockServerConfig {
        listing_body: listing.to_string(),
        ..Default::default()
    })
    .await;

    let mut client = FtpClient::connect(plain_config(server.port)).await.expect("connect");
    client.login().await.expect("login");

    let entries = client.list(None, false).await.expect("list");
    assert_eq!(entries.len(), 2);
    assert!(entries.iter().any(|e| e.name == "report.txt" && e.kind == FileKind::File));
    assert!(entries.iter().any(|e| e.name == "archive" && e.kind == FileKind::Directory));

    client.disconnect().await.expect("disconnect");
}

#[tokio::test]
async fn upload_then_verify_size() {
    let mut sizes = HashMap::new();
    sizes.insert("/incoming/payload.bin".to_string(), 4u64);
    let server = MockServer::start(MockServerConfig { sizes, ..Default::default() }).await;
    let uploads = Arc::clone(&server.uploads);

    let mut client = FtpClient::connect(plain_config(server.port)).await.expect("connect");
    client.login().await.expect("login");

    let ok = client.put(vec![1u8, 2, 3, 4], "/incoming/payload.bin").await.expect("put");
    assert!(ok);

    let recorded = uploads.lock().unwrap();
    assert_eq!(recorded.len(), 1);
    assert_eq!(recorded[0].0, "/incoming/payload.bin");
    assert_eq!(recorded[0].1, vec![1, 2, 3, 4]);
    drop(recorded);

    let size = client.size("/incoming/payload.bin").await.expect("size");
    assert_eq!(size, 4);

    client.disconnect().await.expect("disconnect");
}

#[tokio::test]
async fn throttled_download_is_paced() {
    let body = vec![0xABu8; 8 * 1024];
    let server = MockServer::start(MockServerConfig { retr_body: body.clone(), ..Default::default() }).await;

    let config = FtpConfig::new("127.0.0.1", server.port, false, "tester", "secret")
        .with_limit_download(Some(4 * 1024));
    let mut client = FtpClient::connect(Arc::new(config)).await.expect("connect");
    client.login().await.expect("login");

    let started = Instant::now();
    let got = client.get("/pub/bigfile.bin").await.expect("get");
    let elapsed = started.elapsed();

    assert_eq!(got, body);
    assert!(elapsed >= Duration::from_millis(900), "expected throttling to pace the transfer, took {elapsed:?}");

    client.disconnect().await.expect("disconnect");
}

#[tokio::test]
async fn rename_and_exists() {
    let mut sizes = HashMap::new();
    sizes.insert("/pub/new-name.txt".to_string(), 10u64);
    let server = MockServer::start(MockServerConfig { sizes, ..Default::default() }).await;

    let mut client = FtpClient::connect(plain_config(server.port)).await.expect("connect");
    client.login().await.expect("login");

    client.rename("/pub/old-name.txt", "/pub/new-name.txt").await.expect("rename");

    assert!(client.file_exists("/pub/new-name.txt").await.expect("exists"));
    assert!(!client.file_exists("/pub/missing.txt").await.expect("exists"));

    client.disconnect().await.expect("disconnect");
}

#[tokio::test]
async fn passive_retry_recovers_from_malformed_replies() {
    let listing = "-rw-r--r--   1 owner    group          512 Jan 15 12:30 one.txt\r\n";
    let server = MockServer::start(MockServerConfig {
        listing_body: listing.to_string(),
        pasv_failures: 2,
        ..Default::default()
    })
    .await;

    let mut config = FtpConfig::new("127.0.0.1", server.port, false, "tester", "secret");
    config.max_passive_retries = 3;
    let mut client = FtpClient::connect(Arc::new(config)).await.expect("connect");
    client.login().await.expect("login");

    let entries = client.list(None, false).await.expect("list should succeed after PASV retries");
    assert_eq!(entries.len(), 1);

    client.disconnect().await.expect("disconnect");
}

#[tokio::test]
async fn passive_retries_exhausted_surfaces_error() {
    let server = MockServer::start(MockServerConfig { pasv_failures: 10, ..Default::default() }).await;

    let mut config = FtpConfig::new("127.0.0.1", server.port, false, "tester", "secret");
    config.max_passive_retries = 2;
    let mut client = FtpClient::connect(Arc::new(config)).await.expect("connect");
    client.login().await.expect("login");

    let result = client.list(None, false).await;
    assert!(result.is_err(), "expected PASV negotiation to be exhausted");

    client.disconnect().await.expect("disconnect");
}

#[tokio::test]
async fn dead_transport_marks_connection_broken_and_rejects_further_commands() {
    let server = MockServer::start(MockServerConfig {
        drop_connection_on: Some("PWD".to_string()),
        ..Default::default()
    })
    .await;

    let mut client = FtpClient::connect(plain_config(server.port)).await.expect("connect");
    client.login().await.expect("login");

    assert!(!client.is_broken());
    let result = client.pwd().await;
    assert!(result.is_err(), "expected the dropped connection to surface an error");
    assert!(client.is_broken(), "control-channel closure should mark the client broken");

    let next = client.pwd().await;
    assert!(matches!(next, Err(ftp_rs::FtpError::NotConnected)));
}

#[tokio::test]
async fn put_from_missing_path_fails_as_invalid_input() {
    let server = MockServer::start(MockServerConfig::default()).await;
    let mut client = FtpClient::connect(plain_config(server.port)).await.expect("connect");
    client.login().await.expect("login");

    let result = client.put("/no/such/local/file.bin", "/incoming/payload.bin").await;
    assert!(matches!(result, Err(ftp_rs::FtpError::InvalidInput(_))));

    client.disconnect().await.expect("disconnect");
}

#[tokio::test]
async fn mkdir_and_rmdir_via_site_extensions() {
    let server = MockServer::start(MockServerConfig::default()).await;
    let mut client = FtpClient::connect(plain_config(server.port)).await.expect("connect");
    client.login().await.expect("login");

    client.mkdir("/pub/new-tree", true).await.expect("mkdir -p");
    client.rmdir("/pub/new-tree", true).await.expect("rmdir recursive");

    client.disconnect().await.expect("disconnect");
}
