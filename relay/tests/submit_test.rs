use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::connect_info::ConnectInfo;
use axum::Router;
use http::{header, Request, StatusCode};
use http_body_util::BodyExt;
use petition_relay::mail::MemoryMailer;
use petition_relay::{router, DeliveryPolicy, Envelope, Notifier, RouterOptions, UploadStore};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

const BOUNDARY: &str = "relay-test-boundary";

enum Part<'a> {
    Text(&'a str, &'a str),
    Proof(&'a str, &'a [u8]),
}

struct Harness {
    app: Router,
    mailer: MemoryMailer,
    uploads: TempDir,
}

fn harness(policy: DeliveryPolicy) -> Harness {
    let uploads = tempfile::tempdir().unwrap();
    let mailer = MemoryMailer::new();
    let notifier = Notifier::new(
        UploadStore::new(uploads.path()),
        Arc::new(mailer.clone()),
        Envelope {
            from: "relay@example.com".into(),
            to: "legal@example.com".into(),
        },
        policy,
    );
    let app = router(notifier, RouterOptions { test_email: true });

    Harness {
        app,
        mailer,
        uploads,
    }
}

fn multipart_body(parts: &[Part]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part {
            Part::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n").as_bytes(),
                );
            }
            Part::Proof(filename, content) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"proof\"; filename=\"{filename}\"\r\n\
                         Content-Type: application/octet-stream\r\n\r\n"
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(content);
                body.extend_from_slice(b"\r\n");
            }
        }
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn submit_request(parts: &[Part]) -> Request<Body> {
    let mut request = Request::builder()
        .method("POST")
        .uri("/submit")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(multipart_body(parts)))
        .unwrap();
    let peer: SocketAddr = "198.51.100.7:41000".parse().unwrap();
    request.extensions_mut().insert(ConnectInfo(peer));
    request
}

fn required_fields() -> Vec<Part<'static>> {
    vec![
        Part::Text("full_name", "Jane Doe"),
        Part::Text("email", "jane@x.com"),
        Part::Text("phone", "5551234"),
        Part::Text("payment_date", "2025-01-01"),
    ]
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap())
}

fn stored_files(dir: &Path) -> Vec<(String, Vec<u8>)> {
    let mut files: Vec<_> = std::fs::read_dir(dir)
        .unwrap()
        .map(|entry| {
            let entry = entry.unwrap();
            let name = entry.file_name().to_string_lossy().into_owned();
            (name, std::fs::read(entry.path()).unwrap())
        })
        .collect();
    files.sort();
    files
}

#[tokio::test]
async fn jane_doe_submission_is_stored_and_relayed() {
    let h = harness(DeliveryPolicy::default());
    let content = b"%PDF-1.4...";

    let mut parts = required_fields();
    parts.push(Part::Proof("receipt.pdf", content));
    let (status, body) = send(&h.app, submit_request(&parts)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"success": true}));

    let stored = stored_files(h.uploads.path());
    assert_eq!(stored.len(), 1);
    let (name, bytes) = &stored[0];
    let (timestamp, original) = name.split_once('_').unwrap();
    assert!(timestamp.parse::<i64>().is_ok(), "unexpected name {name}");
    assert_eq!(original, "receipt.pdf");
    assert_eq!(bytes, content);

    let sent = h.mailer.sent().await;
    assert_eq!(sent.len(), 1);
    let email = &sent[0];
    assert!(email.subject.contains("NEW PETITION SUBMISSION"));
    assert_eq!(email.to, vec!["legal@example.com"]);
    assert_eq!(email.attachments.len(), 1);
    assert_eq!(email.attachments[0].filename, "receipt.pdf");
    assert_eq!(email.attachments[0].content, content);
    assert!(email.text.contains("Full Name: Jane Doe"));
    assert!(email.text.contains("IP Address: 198.51.100.7"));
    assert!(email.text.contains("Account Name Paid Into: Not provided"));
    assert!(email.text.contains("Account Number Paid Into: Not provided"));
}

#[tokio::test]
async fn optional_account_fields_are_rendered_when_given() {
    let h = harness(DeliveryPolicy::default());

    let mut parts = required_fields();
    parts.push(Part::Text("account_name", "TMT Travels"));
    parts.push(Part::Text("account_number", "0123456789"));
    parts.push(Part::Proof("receipt.pdf", b"x"));
    let (status, _) = send(&h.app, submit_request(&parts)).await;

    assert_eq!(status, StatusCode::OK);
    let email = &h.mailer.sent().await[0];
    assert!(email.text.contains("Account Name Paid Into: TMT Travels"));
    assert!(email.text.contains("Account Number Paid Into: 0123456789"));
}

#[tokio::test]
async fn each_missing_required_field_is_rejected() {
    for missing in ["full_name", "email", "phone", "payment_date"] {
        let h = harness(DeliveryPolicy::default());

        let mut parts: Vec<_> = required_fields()
            .into_iter()
            .filter(|p| !matches!(p, Part::Text(name, _) if *name == missing))
            .collect();
        parts.push(Part::Proof("receipt.pdf", b"x"));
        let (status, body) = send(&h.app, submit_request(&parts)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST, "{missing}");
        assert_eq!(body, json!({"success": false, "error": "Missing required fields"}));
        assert!(stored_files(h.uploads.path()).is_empty());
        assert!(h.mailer.sent().await.is_empty());
    }
}

#[tokio::test]
async fn empty_required_field_is_rejected() {
    let h = harness(DeliveryPolicy::default());

    let parts = vec![
        Part::Text("full_name", ""),
        Part::Text("email", "jane@x.com"),
        Part::Text("phone", "5551234"),
        Part::Text("payment_date", "2025-01-01"),
        Part::Proof("receipt.pdf", b"x"),
    ];
    let (status, body) = send(&h.app, submit_request(&parts)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], json!(false));
}

#[tokio::test]
async fn submission_without_proof_is_rejected() {
    let h = harness(DeliveryPolicy::default());

    let (status, body) = send(&h.app, submit_request(&required_fields())).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"success": false, "error": "Missing required fields"}));
    assert!(h.mailer.sent().await.is_empty());
}

#[tokio::test]
async fn only_blank_named_proofs_is_rejected() {
    let h = harness(DeliveryPolicy::default());

    let mut parts = required_fields();
    parts.push(Part::Proof("", b"nameless"));
    parts.push(Part::Proof("   ", b"blank"));
    let (status, body) = send(&h.app, submit_request(&parts)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], json!(false));
    assert!(stored_files(h.uploads.path()).is_empty());
}

#[tokio::test]
async fn blank_named_proofs_are_skipped() {
    let h = harness(DeliveryPolicy::default());

    let mut parts = required_fields();
    parts.push(Part::Proof("", b"nameless"));
    parts.push(Part::Proof("transfer.png", b"png-bytes"));
    parts.push(Part::Proof("  ", b"blank"));
    let (status, _) = send(&h.app, submit_request(&parts)).await;

    assert_eq!(status, StatusCode::OK);

    let stored = stored_files(h.uploads.path());
    assert_eq!(stored.len(), 1);
    assert!(stored[0].0.ends_with("_transfer.png"));
    assert_eq!(stored[0].1, b"png-bytes");

    let email = &h.mailer.sent().await[0];
    let names: Vec<_> = email.attachments.iter().map(|a| a.filename.as_str()).collect();
    assert_eq!(names, ["transfer.png"]);
}

#[tokio::test]
async fn every_proof_is_stored_and_attached() {
    let h = harness(DeliveryPolicy::default());

    let mut parts = required_fields();
    parts.push(Part::Proof("receipt.pdf", b"first"));
    parts.push(Part::Proof("receipt.pdf", b"second"));
    parts.push(Part::Proof("statement.jpg", b"third"));
    let (status, _) = send(&h.app, submit_request(&parts)).await;

    assert_eq!(status, StatusCode::OK);

    let mut contents: Vec<_> = stored_files(h.uploads.path()).into_iter().map(|(_, c)| c).collect();
    contents.sort();
    assert_eq!(contents, [b"first".to_vec(), b"second".to_vec(), b"third".to_vec()]);

    let email = &h.mailer.sent().await[0];
    assert_eq!(email.attachments.len(), 3);
    assert_eq!(email.attachments[1].filename, "receipt.pdf");
    assert_eq!(email.attachments[1].content, b"second");
}

#[tokio::test]
async fn mail_failure_is_generic_server_error_and_keeps_uploads() {
    let h = harness(DeliveryPolicy::default());
    h.mailer.fail_with("535 5.7.8 Username and Password not accepted").await;

    let mut parts = required_fields();
    parts.push(Part::Proof("receipt.pdf", b"%PDF-1.4..."));
    let (status, body) = send(&h.app, submit_request(&parts)).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({"success": false}));

    let stored = stored_files(h.uploads.path());
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].1, b"%PDF-1.4...");
}

#[tokio::test]
async fn mail_failure_with_cleanup_removes_uploads() {
    let h = harness(DeliveryPolicy {
        cleanup_on_failure: true,
    });
    h.mailer.fail_with("connection refused").await;

    let mut parts = required_fields();
    parts.push(Part::Proof("receipt.pdf", b"x"));
    let (status, body) = send(&h.app, submit_request(&parts)).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({"success": false}));
    assert!(stored_files(h.uploads.path()).is_empty());
}

#[tokio::test]
async fn non_multipart_body_is_rejected() {
    let h = harness(DeliveryPolicy::default());

    let request = Request::builder()
        .method("POST")
        .uri("/submit")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(
            "full_name=Jane+Doe&email=jane%40x.com&phone=5551234&payment_date=2025-01-01",
        ))
        .unwrap();
    let (status, body) = send(&h.app, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"success": false, "error": "Missing required fields"}));
    assert!(h.mailer.sent().await.is_empty());
    assert!(stored_files(h.uploads.path()).is_empty());
}

#[tokio::test]
async fn truncated_multipart_body_is_rejected() {
    let h = harness(DeliveryPolicy::default());

    let mut parts = required_fields();
    parts.push(Part::Proof("receipt.pdf", b"x"));
    let mut body = multipart_body(&parts);
    // Cut off inside the proof part
    body.truncate(body.len() - BOUNDARY.len() - 8);
    let mut request = submit_request(&parts);
    *request.body_mut() = Body::from(body);
    let (status, body) = send(&h.app, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"success": false, "error": "Missing required fields"}));
    assert!(h.mailer.sent().await.is_empty());
}

#[tokio::test]
async fn missing_peer_address_renders_unknown() {
    let h = harness(DeliveryPolicy::default());

    let mut parts = required_fields();
    parts.push(Part::Proof("receipt.pdf", b"x"));
    let mut request = submit_request(&parts);
    request.extensions_mut().remove::<ConnectInfo<SocketAddr>>();
    let (status, _) = send(&h.app, request).await;

    assert_eq!(status, StatusCode::OK);
    assert!(h.mailer.sent().await[0].text.contains("IP Address: unknown"));
}

#[tokio::test]
async fn test_email_endpoint_sends_sample() {
    let h = harness(DeliveryPolicy::default());

    let request = Request::builder().uri("/test-email").body(Body::empty()).unwrap();
    let response = h.app.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&bytes[..], b"Test email sent successfully");

    let sent = h.mailer.sent().await;
    assert_eq!(sent.len(), 1);
    assert!(sent[0].attachments.is_empty());
}

#[tokio::test]
async fn test_email_endpoint_is_off_by_default() {
    let uploads = tempfile::tempdir().unwrap();
    let notifier = Notifier::new(
        UploadStore::new(uploads.path()),
        Arc::new(MemoryMailer::new()),
        Envelope {
            from: "relay@example.com".into(),
            to: "legal@example.com".into(),
        },
        DeliveryPolicy::default(),
    );
    let app = router(notifier, RouterOptions::default());

    let request = Request::builder().uri("/test-email").body(Body::empty()).unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn cors_preflight_allows_any_origin() {
    let h = harness(DeliveryPolicy::default());

    let request = Request::builder()
        .method("OPTIONS")
        .uri("/submit")
        .header(header::ORIGIN, "https://petition.example.org")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .body(Body::empty())
        .unwrap();
    let response = h.app.clone().oneshot(request).await.unwrap();

    assert!(response.status().is_success());
    assert_eq!(
        response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
        "*"
    );
}
