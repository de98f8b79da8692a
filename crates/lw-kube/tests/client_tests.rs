//! KubeLeaseClient Unit Tests
//!
//! Tests for:
//! - Request paths and auth headers against the coordination API
//! - Strategic merge patch content type on renewals
//! - HTTP status mapping (409, 404, 5xx)
//! - Timeout and connection error classification

use std::time::Duration;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use chrono::{TimeZone, Utc};
use lw_common::{LeaderIdentity, Retryable};
use lw_kube::{
    KubeApiError, KubeClientConfig, KubeLeaseClient, Lease, LeasePatch, LeaseRepository,
};

const LEASES_PATH: &str = "/apis/coordination.k8s.io/v1/namespaces/prod/leases";

fn create_test_client(uri: &str) -> KubeLeaseClient {
    let config = KubeClientConfig::new(uri.to_string(), "test-token".to_string())
        .with_request_timeout(Duration::from_secs(2));
    KubeLeaseClient::new(config).unwrap()
}

fn create_test_claim() -> Lease {
    let identity = LeaderIdentity::new("pod-a".to_string(), "uid-a".to_string());
    let now = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
    Lease::new_claim("jobs", "prod", &identity, now, Duration::from_secs(30))
}

#[tokio::test]
async fn test_create_posts_to_coordination_endpoint() {
    let mock_server = MockServer::start().await;
    let claim = create_test_claim();

    let mut stored = claim.clone();
    stored.metadata.resource_version = Some("41".to_string());

    Mock::given(method("POST"))
        .and(path(LEASES_PATH))
        .and(header("Authorization", "Bearer test-token"))
        .and(body_json(&claim))
        .respond_with(ResponseTemplate::new(201).set_body_json(&stored))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server.uri());
    let created = client.create(&claim).await.unwrap();

    assert_eq!(created.holder(), Some("pod-a"));
    assert_eq!(created.metadata.resource_version.as_deref(), Some("41"));
}

#[tokio::test]
async fn test_create_conflict_maps_to_conflict() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(LEASES_PATH))
        .respond_with(ResponseTemplate::new(409).set_body_json(serde_json::json!({
            "kind": "Status",
            "status": "Failure",
            "reason": "AlreadyExists",
            "message": "leases.coordination.k8s.io \"jobs\" already exists"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server.uri());
    let err = client.create(&create_test_claim()).await.unwrap_err();

    assert!(err.is_conflict());
}

#[tokio::test]
async fn test_get_fetches_named_lease() {
    let mock_server = MockServer::start().await;
    let stored = create_test_claim();

    Mock::given(method("GET"))
        .and(path(format!("{}/jobs", LEASES_PATH)))
        .and(header("Authorization", "Bearer test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&stored))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server.uri());
    let lease = client.get("jobs", "prod").await.unwrap();

    assert_eq!(lease.holder(), Some("pod-a"));
    assert_eq!(lease.spec.lease_duration_seconds, Some(60));
}

#[tokio::test]
async fn test_get_missing_lease_maps_to_not_found() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("{}/jobs", LEASES_PATH)))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server.uri());
    let err = client.get("jobs", "prod").await.unwrap_err();

    assert!(matches!(err, KubeApiError::NotFound));
    assert!(!err.is_transient());
}

#[tokio::test]
async fn test_renew_patch_uses_strategic_merge_content_type() {
    let mock_server = MockServer::start().await;
    let renewed_at = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 30).unwrap();

    let mut stored = create_test_claim();
    stored.spec.renew_time = Some(renewed_at);

    Mock::given(method("PATCH"))
        .and(path(format!("{}/jobs", LEASES_PATH)))
        .and(header("Content-Type", "application/strategic-merge-patch+json"))
        .and(body_json(&serde_json::json!({
            "spec": {"renewTime": "2024-03-01T12:00:30.000000Z"}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(&stored))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server.uri());
    let lease = client
        .patch("jobs", "prod", &LeasePatch::renew(renewed_at))
        .await
        .unwrap();

    assert_eq!(lease.renew_time(), Some(renewed_at));
}

#[tokio::test]
async fn test_delete_removes_named_lease() {
    let mock_server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path(format!("{}/jobs", LEASES_PATH)))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "kind": "Status",
            "status": "Success"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server.uri());
    client.delete("jobs", "prod").await.unwrap();
}

#[tokio::test]
async fn test_delete_missing_lease_maps_to_not_found() {
    let mock_server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path(format!("{}/jobs", LEASES_PATH)))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server.uri());
    let err = client.delete("jobs", "prod").await.unwrap_err();

    assert!(matches!(err, KubeApiError::NotFound));
}

#[tokio::test]
async fn test_server_error_carries_status_and_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("{}/jobs", LEASES_PATH)))
        .respond_with(
            ResponseTemplate::new(503).set_body_string("etcdserver: request timed out"),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server.uri());
    let err = client.get("jobs", "prod").await.unwrap_err();

    match err {
        KubeApiError::Status { status, message } => {
            assert_eq!(status, 503);
            assert!(message.contains("etcdserver"));
        }
        other => panic!("expected Status error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_slow_server_classified_as_timeout() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("{}/jobs", LEASES_PATH)))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(10)))
        .mount(&mock_server)
        .await;

    let config = KubeClientConfig::new(mock_server.uri(), "test-token".to_string())
        .with_request_timeout(Duration::from_millis(100));
    let client = KubeLeaseClient::new(config).unwrap();

    let err = client.get("jobs", "prod").await.unwrap_err();

    assert!(matches!(err, KubeApiError::Timeout));
    assert!(err.is_transient());
}

#[tokio::test]
async fn test_unreachable_server_classified_as_connection_error() {
    // Use a port that's definitely not listening
    let client = create_test_client("http://127.0.0.1:59999");

    let err = client.get("jobs", "prod").await.unwrap_err();

    assert!(matches!(err, KubeApiError::Connection(_)));
    assert!(err.is_transient());
}

#[tokio::test]
async fn test_trailing_slash_in_api_url_is_trimmed() {
    let mock_server = MockServer::start().await;
    let stored = create_test_claim();

    Mock::given(method("GET"))
        .and(path(format!("{}/jobs", LEASES_PATH)))
        .respond_with(ResponseTemplate::new(200).set_body_json(&stored))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = create_test_client(&format!("{}/", mock_server.uri()));
    let lease = client.get("jobs", "prod").await.unwrap();

    assert_eq!(lease.holder(), Some("pod-a"));
}
