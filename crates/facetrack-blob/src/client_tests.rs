//! Tests for blob client operations against a mock storage service.

use std::time::Duration;

use wiremock::matchers::{
    body_bytes, body_string, header, header_exists, method, path, query_param,
    query_param_is_missing,
};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::client::{BlobClient, BlobConfig, BlobCredentials};
use crate::error::BlobError;

const ACCOUNT_KEY: &str = "ZmFjZXRyYWNrLXRlc3QtYWNjb3VudC1rZXk=";

fn config(server: &MockServer, block_size: usize) -> BlobConfig {
    BlobConfig {
        block_size,
        timeout: Duration::from_secs(5),
        ..BlobConfig::new(server.uri())
    }
}

fn sas_client(server: &MockServer, block_size: usize) -> BlobClient {
    BlobClient::new(
        config(server, block_size),
        BlobCredentials::sas("?sv=2019-12-12&sr=c&sig=abc"),
    )
    .unwrap()
}

fn key_client(server: &MockServer) -> BlobClient {
    BlobClient::new(
        config(server, 1024),
        BlobCredentials::shared_key("facetrackstore", ACCOUNT_KEY).unwrap(),
    )
    .unwrap()
}

// =============================================================================
// Upload Tests
// =============================================================================

#[tokio::test]
async fn test_small_file_uploaded_in_one_put() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let video = dir.path().join("clip.mp4");
    std::fs::write(&video, b"tiny video").unwrap();

    Mock::given(method("PUT"))
        .and(path("/asset-1/clip.mp4"))
        .and(query_param("sig", "abc"))
        .and(header("x-ms-blob-type", "BlockBlob"))
        .and(header("content-type", "video/mp4"))
        .and(header("x-ms-version", "2019-12-12"))
        .and(body_bytes(b"tiny video".to_vec()))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let size = sas_client(&server, 1024)
        .upload_file(&video, "asset-1", "clip.mp4", "video/mp4")
        .await
        .unwrap();

    assert_eq!(size, 10);
}

#[tokio::test]
async fn test_large_file_uploaded_in_blocks() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let video = dir.path().join("clip.mp4");
    std::fs::write(&video, b"0123456789").unwrap();

    Mock::given(method("PUT"))
        .and(path("/asset-1/clip.mp4"))
        .and(query_param("comp", "block"))
        .and(query_param("sig", "abc"))
        .respond_with(ResponseTemplate::new(201))
        .expect(3)
        .mount(&server)
        .await;

    Mock::given(method("PUT"))
        .and(path("/asset-1/clip.mp4"))
        .and(query_param("comp", "blocklist"))
        .and(header("x-ms-blob-content-type", "video/mp4"))
        .and(body_string(concat!(
            "<?xml version=\"1.0\" encoding=\"utf-8\"?><BlockList>",
            "<Latest>YmxvY2stMDAwMDAw</Latest>",
            "<Latest>YmxvY2stMDAwMDAx</Latest>",
            "<Latest>YmxvY2stMDAwMDAy</Latest>",
            "</BlockList>"
        )))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let size = sas_client(&server, 4)
        .upload_file(&video, "asset-1", "clip.mp4", "video/mp4")
        .await
        .unwrap();

    assert_eq!(size, 10);

    let requests = server.received_requests().await.unwrap();
    let block_ids: Vec<String> = requests
        .iter()
        .filter_map(|r| {
            r.url
                .query_pairs()
                .find(|(k, _)| k == "blockid")
                .map(|(_, v)| v.into_owned())
        })
        .collect();
    assert_eq!(
        block_ids,
        vec!["YmxvY2stMDAwMDAw", "YmxvY2stMDAwMDAx", "YmxvY2stMDAwMDAy"]
    );
}

#[tokio::test]
async fn test_upload_failure_reports_status() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let video = dir.path().join("clip.mp4");
    std::fs::write(&video, b"abc").unwrap();

    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(403).set_body_string(
            "<?xml version=\"1.0\" encoding=\"utf-8\"?><Error><Code>AuthenticationFailed</Code><Message>Signature did not match</Message></Error>",
        ))
        .mount(&server)
        .await;

    let err = sas_client(&server, 1024)
        .upload_file(&video, "asset-1", "clip.mp4", "video/mp4")
        .await
        .unwrap_err();

    assert_eq!(err.http_status(), Some(403));
    assert!(err.to_string().contains("AuthenticationFailed"));
}

#[tokio::test]
async fn test_missing_file_is_io_error() {
    let server = MockServer::start().await;

    let err = sas_client(&server, 1024)
        .upload_file("/nonexistent/clip.mp4", "asset-1", "clip.mp4", "video/mp4")
        .await
        .unwrap_err();

    assert!(matches!(err, BlobError::Io(_)));
    assert!(server.received_requests().await.unwrap().is_empty());
}

// =============================================================================
// List and Download Tests
// =============================================================================

#[tokio::test]
async fn test_list_follows_next_marker() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/asset-out"))
        .and(query_param("restype", "container"))
        .and(query_param("comp", "list"))
        .and(query_param_is_missing("marker"))
        .and(header_exists("authorization"))
        .and(header_exists("x-ms-date"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "<EnumerationResults><Blobs><Blob><Name>face.json</Name></Blob></Blobs><NextMarker>2!8!abc</NextMarker></EnumerationResults>",
        ))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/asset-out"))
        .and(query_param("marker", "2!8!abc"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "<EnumerationResults><Blobs><Blob><Name>thumb.jpg</Name></Blob></Blobs><NextMarker/></EnumerationResults>",
        ))
        .expect(1)
        .mount(&server)
        .await;

    let blobs = key_client(&server).list_blobs("asset-out").await.unwrap();
    let names: Vec<&str> = blobs.iter().map(|b| b.name.as_str()).collect();
    assert_eq!(names, vec!["face.json", "thumb.jpg"]);

    let requests = server.received_requests().await.unwrap();
    let auth = requests[0].headers.get("authorization").unwrap().to_str().unwrap();
    assert!(auth.starts_with("SharedKey facetrackstore:"));
}

#[tokio::test]
async fn test_download_to_path_creates_parents() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("output").join("face.json.json");

    Mock::given(method("GET"))
        .and(path("/asset-out/face.json"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"fragments":[]}"#))
        .expect(1)
        .mount(&server)
        .await;

    let written = key_client(&server)
        .download_to_path("asset-out", "face.json", &target)
        .await
        .unwrap();

    assert_eq!(written, 16);
    assert_eq!(std::fs::read_to_string(&target).unwrap(), r#"{"fragments":[]}"#);
}

#[tokio::test]
async fn test_download_missing_blob() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404).set_body_string(
            "<Error><Code>BlobNotFound</Code><Message>The specified blob does not exist.</Message></Error>",
        ))
        .mount(&server)
        .await;

    let err = key_client(&server)
        .download_bytes("asset-out", "missing.json")
        .await
        .unwrap_err();

    assert!(matches!(err, BlobError::RequestFailed { status: 404, .. }));
    assert!(!err.is_retryable());
}
