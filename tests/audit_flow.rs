//! Integration tests for the audit report workflow using wiremock.
//!
//! These tests mock the Skyvault API to verify the three-step report
//! lifecycle against the wire contract:
//!
//! - POST /pubapi/v1/audit/logins | /files — submission (with local
//!   validation before any network traffic)
//! - GET  /pubapi/v1/audit/jobs/{id}       — structural status check
//! - GET  /pubapi/v1/audit/json/{id}       — paginated typed results

use chrono::{TimeZone, Utc};
use skyvault_api::audit::*;
use skyvault_api::client::{default_http_client, SkyvaultClient};
use skyvault_api::error::SkyvaultError;
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn mock_client(server: &MockServer) -> SkyvaultClient {
    SkyvaultClient::with_base_url(default_http_client(), &server.uri())
}

fn login_request() -> LoginReportRequest {
    LoginReportRequest {
        format: ReportFormat::Json,
        date_start: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
        date_end: Utc.with_ymd_and_hms(2026, 1, 31, 0, 0, 0).unwrap(),
        events: vec!["login_failed".to_string()],
        access_points: vec![],
        users: vec![],
    }
}

// ── Submission ─────────────────────────────────────────────────────────

#[tokio::test]
async fn submit_login_report_posts_body_and_returns_handle() {
    let server = MockServer::start().await;
    let client = mock_client(&server);

    Mock::given(method("POST"))
        .and(path("/pubapi/v1/audit/logins"))
        .and(body_json(serde_json::json!({
            "format": "json",
            "date_start": "2026-01-01T00:00:00Z",
            "date_end": "2026-01-31T00:00:00Z",
            "events": ["login_failed"]
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({"id": "abc123"})))
        .expect(1)
        .mount(&server)
        .await;

    let report = submit_login_report(&client, &login_request()).await.unwrap();
    assert_eq!(report.kind(), ReportKind::Login);
    assert_eq!(report.id(), "abc123");
}

#[tokio::test]
async fn submit_login_report_with_no_events_is_rejected_locally() {
    let server = MockServer::start().await;
    let client = mock_client(&server);

    let mut request = login_request();
    request.events.clear();

    let err = submit_login_report(&client, &request).await.unwrap_err();
    assert!(
        matches!(err, SkyvaultError::Validation { .. }),
        "empty event list must fail validation, got {err:?}"
    );
    assert!(
        server.received_requests().await.unwrap().is_empty(),
        "validation failure must not produce any network traffic"
    );
}

#[tokio::test]
async fn submit_file_report_posts_folders_and_returns_handle() {
    let server = MockServer::start().await;
    let client = mock_client(&server);

    Mock::given(method("POST"))
        .and(path("/pubapi/v1/audit/files"))
        .and(body_json(serde_json::json!({
            "format": "json",
            "date_start": "2026-02-01T00:00:00Z",
            "date_end": "2026-02-28T00:00:00Z",
            "folders": ["/Shared/Docs"],
            "transaction_type": ["upload"]
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({"id": "f-9"})))
        .expect(1)
        .mount(&server)
        .await;

    let request = FileReportRequest {
        format: ReportFormat::Json,
        date_start: Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap(),
        date_end: Utc.with_ymd_and_hms(2026, 2, 28, 0, 0, 0).unwrap(),
        folders: vec!["/Shared/Docs".to_string()],
        file: None,
        users: vec![],
        transaction_types: vec!["upload".to_string()],
    };
    let report = submit_file_report(&client, &request).await.unwrap();
    assert_eq!(report.kind(), ReportKind::File);
    assert_eq!(report.id(), "f-9");
}

#[tokio::test]
async fn submit_file_report_without_file_or_folders_is_rejected_locally() {
    let server = MockServer::start().await;
    let client = mock_client(&server);

    let request = FileReportRequest {
        format: ReportFormat::Json,
        date_start: Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap(),
        date_end: Utc.with_ymd_and_hms(2026, 2, 28, 0, 0, 0).unwrap(),
        folders: vec![],
        file: None,
        users: vec![],
        transaction_types: vec![],
    };

    let err = submit_file_report(&client, &request).await.unwrap_err();
    assert!(matches!(err, SkyvaultError::Validation { .. }));
    assert!(
        server.received_requests().await.unwrap().is_empty(),
        "validation failure must not produce any network traffic"
    );
}

// ── Status checks ──────────────────────────────────────────────────────

#[tokio::test]
async fn status_only_body_reports_pending_with_raw_status() {
    let server = MockServer::start().await;
    let client = mock_client(&server);
    let report = AuditReport::from_parts("login", "abc123").unwrap();

    Mock::given(method("GET"))
        .and(path("/pubapi/v1/audit/jobs/abc123"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"status":"queued"}"#))
        .mount(&server)
        .await;

    match check_report_status(&client, &report).await.unwrap() {
        ReportStatus::Pending(status) => assert_eq!(status, "queued"),
        other => panic!("expected Pending, got {other:?}"),
    }
}

#[tokio::test]
async fn full_result_body_reports_completed_with_decoded_events() {
    let server = MockServer::start().await;
    let client = mock_client(&server);
    let report = AuditReport::from_parts("login", "abc123").unwrap();

    Mock::given(method("GET"))
        .and(path("/pubapi/v1/audit/jobs/abc123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "total_count": 1,
            "offset": 0,
            "count": 1,
            "events": [{
                "username": "J. Smith",
                "user_id": 42,
                "access": "Web UI",
                "time": "2026-01-15T09:31:22Z",
                "event": "login_failed",
                "ip_address": "203.0.113.7"
            }]
        })))
        .mount(&server)
        .await;

    match check_report_status(&client, &report).await.unwrap() {
        ReportStatus::Completed(ReportResults::Login(page)) => {
            assert_eq!(page.total_count, 1);
            assert_eq!(page.events[0].event, "login_failed");
        }
        other => panic!("expected completed login results, got {other:?}"),
    }
}

// ── Result retrieval ───────────────────────────────────────────────────

#[tokio::test]
async fn retrieve_results_appends_offset_and_count() {
    let server = MockServer::start().await;
    let client = mock_client(&server);
    let report = AuditReport::from_parts("login", "abc123").unwrap();

    Mock::given(method("GET"))
        .and(path("/pubapi/v1/audit/json/abc123"))
        .and(query_param("offset", "50"))
        .and(query_param("count", "25"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "total_count": 100,
            "offset": 50,
            "count": 25,
            "events": []
        })))
        .expect(1)
        .mount(&server)
        .await;

    let results = retrieve_report_results(&client, &report, Some(50), Some(25))
        .await
        .unwrap();
    match results {
        ReportResults::Login(page) => {
            assert_eq!(page.offset, 50);
            assert_eq!(page.count, 25);
        }
        other => panic!("expected login results, got {other:?}"),
    }

    // The query must be exactly the two supplied bounds.
    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests[0].url.query(), Some("offset=50&count=25"));
}

#[tokio::test]
async fn retrieve_results_without_bounds_sends_no_query() {
    let server = MockServer::start().await;
    let client = mock_client(&server);
    let report = AuditReport::from_parts("file", "f-9").unwrap();

    Mock::given(method("GET"))
        .and(path("/pubapi/v1/audit/json/f-9"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "total_count": 1,
            "offset": 0,
            "count": 1,
            "events": [{
                "username": "J. Smith",
                "user_id": 42,
                "access": "Web UI",
                "time": "2026-02-03T10:00:00Z",
                "file/folder": "/Shared/old.txt",
                "target_path": "/Archive/old.txt",
                "transaction": "Moved"
            }]
        })))
        .mount(&server)
        .await;

    let results = retrieve_report_results(&client, &report, None, None)
        .await
        .unwrap();
    match results {
        ReportResults::File(page) => {
            assert_eq!(page.events[0].current_path(), "/Archive/old.txt");
        }
        other => panic!("expected file results, got {other:?}"),
    }

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests[0].url.query(), None, "no bounds, no query string");
}

#[tokio::test]
async fn retrieve_results_surfaces_api_error_with_body() {
    let server = MockServer::start().await;
    let client = mock_client(&server);
    let report = AuditReport::from_parts("login", "expired").unwrap();

    Mock::given(method("GET"))
        .and(path("/pubapi/v1/audit/json/expired"))
        .respond_with(ResponseTemplate::new(410).set_body_string("report expired"))
        .mount(&server)
        .await;

    let err = retrieve_report_results(&client, &report, None, None)
        .await
        .unwrap_err();
    match err {
        SkyvaultError::Api { status, body } => {
            assert_eq!(status.as_u16(), 410);
            assert_eq!(body, "report expired");
        }
        other => panic!("expected Api error, got {other:?}"),
    }
}

// ── End to end ─────────────────────────────────────────────────────────

#[tokio::test]
async fn login_report_lifecycle_submit_poll_retrieve() {
    let server = MockServer::start().await;
    let client = mock_client(&server);

    // Submit.
    Mock::given(method("POST"))
        .and(path("/pubapi/v1/audit/logins"))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({"id": "abc123"})))
        .mount(&server)
        .await;

    // First status check answers pending, the second the finished report.
    Mock::given(method("GET"))
        .and(path("/pubapi/v1/audit/jobs/abc123"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"status":"running"}"#))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/pubapi/v1/audit/jobs/abc123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "total_count": 1,
            "offset": 0,
            "count": 1,
            "events": []
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/pubapi/v1/audit/json/abc123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "total_count": 1,
            "offset": 0,
            "count": 1,
            "events": [{
                "username": "J. Smith",
                "user_id": 42,
                "access": "Web UI",
                "time": "2026-01-15T09:31:22Z",
                "event": "login_failed",
                "ip_address": "203.0.113.7"
            }]
        })))
        .mount(&server)
        .await;

    let report = submit_login_report(&client, &login_request()).await.unwrap();
    assert_eq!(report.id(), "abc123");

    // Caller-driven polling: first check pending, second completed.
    match check_report_status(&client, &report).await.unwrap() {
        ReportStatus::Pending(status) => assert_eq!(status, "running"),
        other => panic!("expected Pending first, got {other:?}"),
    }
    match check_report_status(&client, &report).await.unwrap() {
        ReportStatus::Completed(_) => {}
        other => panic!("expected Completed second, got {other:?}"),
    }

    let results = retrieve_report_results(&client, &report, None, None)
        .await
        .unwrap();
    match results {
        ReportResults::Login(page) => {
            assert_eq!(page.events.len(), 1);
            assert_eq!(page.events[0].event, "login_failed");
            assert_eq!(page.events[0].ip_address, "203.0.113.7");
        }
        other => panic!("expected login results, got {other:?}"),
    }
}
